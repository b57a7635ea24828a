//! Intel Ethernet controllers

pub mod pch_gbe;
