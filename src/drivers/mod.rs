//! Device drivers subsystem
//!
//! Organized by device class:
//! - `mmio`: register access over a PCI memory BAR
//! - `poll`: bounded busy-wait helper shared by register handshakes
//! - `net`: network device drivers

pub mod mmio;
pub mod net;
pub mod poll;
