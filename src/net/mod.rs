//! Networking types shared by the driver and the stack above it

pub mod ethernet;
pub mod interface;
