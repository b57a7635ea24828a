//! Network Device Abstraction
//!
//! This module provides the interface the firmware network stack uses to
//! drive an Ethernet controller. It mirrors the UEFI Simple Network Protocol:
//! a device is started, initialized (DMA resources allocated), used for
//! frame I/O, then shut down and stopped.
//!
//! ## Error taxonomy
//!
//! - **Transient**: [`EthernetError::NotReady`] - no frame yet, ring full,
//!   link still training. Retry later.
//! - **Caller input**: [`EthernetError::BufferTooSmall`],
//!   [`EthernetError::InvalidParameter`] - fix the request.
//! - **Resource exhaustion**: [`EthernetError::OutOfResources`],
//!   [`EthernetError::PartialMapping`] - fatal to `initialize()`; call
//!   `shutdown()` to release whatever was acquired.
//! - **Protocol state**: [`EthernetError::NotStarted`],
//!   [`EthernetError::AlreadyStarted`], [`EthernetError::DeviceError`].
//!
//! Hardware anomalies (bad PHY reads, errored frames) never show up here:
//! they land in the statistics counters and the link state machine's own
//! retry cycle.
//!
//! ## Example Usage
//!
//! ```ignore
//! use minnowboard_gbe::{EthernetError, SimpleNetwork};
//!
//! netdev.start()?;
//! netdev.initialize()?;
//!
//! let mut buffer = [0u8; 1536];
//! match netdev.receive(&mut buffer) {
//!     Ok(frame) => { /* frame.length bytes in buffer */ }
//!     Err(EthernetError::NotReady) => { /* poll again later */ }
//!     Err(EthernetError::BufferTooSmall { required }) => { /* grow and retry */ }
//!     Err(e) => return Err(e),
//! }
//! ```

use crate::net::ethernet::{MacAddress, ReceivedFrame, TransmitHeader};
use alloc::vec::Vec;
use core::fmt;
use core::net::IpAddr;

use super::ethernet::intel::pch_gbe::{
    DeviceStatus, EthernetStatistics, ModeSnapshot, ReceiveFilters,
};

/// Errors that can occur during network device operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EthernetError {
    /// Nothing to do yet: no frame pending, transmit ring full or link down
    NotReady,

    /// Caller's buffer cannot hold the frame
    BufferTooSmall { required: usize },

    /// Invalid filter bits, address or frame length
    InvalidParameter,

    /// DMA memory could not be allocated or mapped
    OutOfResources,

    /// The host mapped fewer bytes than requested
    PartialMapping { requested: usize, mapped: usize },

    /// Operation not allowed in the current protocol state
    DeviceError,

    /// Device has not been started
    NotStarted,

    /// Device is already started
    AlreadyStarted,
}

impl fmt::Display for EthernetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EthernetError::NotReady => write!(f, "Not ready"),
            EthernetError::BufferTooSmall { required } => {
                write!(f, "Buffer too small ({} bytes required)", required)
            }
            EthernetError::InvalidParameter => write!(f, "Invalid parameter"),
            EthernetError::OutOfResources => write!(f, "Out of DMA resources"),
            EthernetError::PartialMapping { requested, mapped } => write!(
                f,
                "DMA mapping incomplete ({} of {} bytes)",
                mapped, requested
            ),
            EthernetError::DeviceError => write!(f, "Device error"),
            EthernetError::NotStarted => write!(f, "Device not started"),
            EthernetError::AlreadyStarted => write!(f, "Device already started"),
        }
    }
}

/// A transmit request the driver refused.
///
/// Ownership of the frame goes back to the caller together with the reason,
/// so a `NotReady` frame can be resubmitted unchanged.
#[derive(Debug, PartialEq, Eq)]
pub struct TransmitRejected {
    pub error: EthernetError,
    pub frame: Vec<u8>,
}

impl fmt::Display for TransmitRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transmit rejected: {}", self.error)
    }
}

/// Simple network abstraction trait
///
/// The operations a boot network stack needs from an Ethernet controller.
///
/// # Thread Safety
///
/// Implementations serialize every call internally (single-owner lock), so a
/// shared reference is enough; callers never see concurrent execution inside
/// the driver.
pub trait SimpleNetwork {
    /// Power on the controller and arm its periodic maintenance.
    fn start(&self) -> Result<(), EthernetError>;

    /// Cancel periodic maintenance and power the controller down.
    fn stop(&self) -> Result<(), EthernetError>;

    /// Allocate DMA resources and begin link training.
    ///
    /// On `Err`, call [`SimpleNetwork::shutdown`] to release whatever was
    /// acquired.
    #[must_use = "initialize() failure must be handled - call shutdown() to release resources"]
    fn initialize(&self) -> Result<(), EthernetError>;

    /// Stop DMA and release every DMA resource.
    fn shutdown(&self) -> Result<(), EthernetError>;

    /// Return to the post-initialize state: permanent station address,
    /// no receive filters, link retrained.
    fn reset(&self) -> Result<(), EthernetError>;

    /// Queue a frame. Rejected frames are handed back.
    fn transmit(
        &self,
        frame: Vec<u8>,
        header: Option<&TransmitHeader>,
    ) -> Result<(), TransmitRejected>;

    /// Copy the next good frame into `buffer`.
    fn receive(&self, buffer: &mut [u8]) -> Result<ReceivedFrame, EthernetError>;

    /// Interrupt bits, one completed transmit buffer and media state.
    fn get_status(&self) -> Result<DeviceStatus, EthernetError>;

    /// Enable/disable receive filters and replace or reset the multicast list.
    fn receive_filters(
        &self,
        enable: ReceiveFilters,
        disable: ReceiveFilters,
        reset_multicast: bool,
        multicast: Option<&[MacAddress]>,
    ) -> Result<(), EthernetError>;

    /// Set the station address, or restore the permanent one with `None`.
    fn station_address(&self, address: Option<MacAddress>) -> Result<(), EthernetError>;

    /// Snapshot the counters, optionally zeroing them afterwards.
    fn statistics(&self, reset: bool) -> Result<EthernetStatistics, EthernetError>;

    /// Map a multicast IP address to its multicast MAC address.
    fn mcast_ip_to_mac(&self, ip: IpAddr) -> Result<MacAddress, EthernetError>;

    /// Current mode: protocol state, addresses, filters, media.
    fn mode(&self) -> ModeSnapshot;
}
