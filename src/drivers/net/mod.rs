//! Network device drivers and abstractions

pub mod ethernet;
pub mod netdev;

// Re-export SimpleNetwork trait for convenience
pub use netdev::*;
