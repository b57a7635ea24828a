//! MinnowBoard boot-time Ethernet driver core
//!
//! Drives the PCH GbE MAC and its external RGMII PHY for the firmware network
//! stack: PHY management over MIIM, link training as a timer-driven state
//! machine, and bounce-buffered receive/transmit descriptor rings carved from
//! one bus-master DMA buffer.
//!
//! The host environment (timers, events, DMA allocation and mapping, stalls)
//! is reached only through [`platform::Platform`], and device registers only
//! through [`drivers::mmio::RegisterAccess`].

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod drivers;
pub mod net;
pub mod platform;

pub use config::DriverConfig;
pub use drivers::net::ethernet::intel::pch_gbe::{EthernetDevice, LinkState};
pub use drivers::net::netdev::{EthernetError, SimpleNetwork};
pub use net::interface::GbeDevice;
