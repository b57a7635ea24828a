//! Intel Platform Controller Hub GbE Driver
//!
//! Driver for the EG20T "PCH GbE" MAC found on the MinnowBoard, wired over
//! RGMII to an external PHY (an Atheros AR8031 on production boards).
//!
//! ## Hardware Overview
//!
//! - PCI function with one 512-byte register BAR
//! - MIIM register for clause 22 PHY management
//! - 16 MAC address slots behind an ADDR_MASK handshake
//! - Receive and transmit descriptor rings of 16-byte descriptors, handed
//!   back and forth through soft (software) and hard (hardware) pointers
//!
//! ## Driver Structure
//!
//! [`EthernetContext`] holds all state for one controller. [`EthernetDevice`]
//! owns it behind a lock and exposes the [`SimpleNetwork`] operations plus
//! the two host callbacks: the ~1 ms maintenance tick that drives the link
//! state machine, and the wait-for-packet notification.
//!
//! ```text
//!  start -> Started -> initialize -> Initialized -> shutdown -> Started -> stop
//!                                       |  tick: link state machine
//!                                       |  transmit / receive / filters
//! ```
//!
//! ## References
//!
//! - Intel Platform Controller Hub EG20T datasheet, Gigabit Ethernet MAC
//! - Linux: drivers/net/ethernet/oki-semi/pch_gbe/

use alloc::vec::Vec;
use core::net::IpAddr;

use log::{debug, info};
use spin::Mutex;

use crate::config::DriverConfig;
use crate::drivers::mmio::RegisterAccess;
use crate::drivers::net::netdev::{EthernetError, SimpleNetwork, TransmitRejected};
use crate::net::ethernet::{EthernetHeader, MacAddress, ReceivedFrame, TransmitHeader};
use crate::platform::Platform;

pub mod descriptor;
pub mod dma;
pub mod filter;
pub mod fixup;
pub mod frame_io;
pub mod link;
pub mod mac;
pub mod phy;
pub mod regs;
pub mod ring;
pub mod stats;

#[cfg(test)]
pub(crate) mod sim;

pub use dma::{DmaArena, ReceiveRing, TransmitRing};
pub use filter::{mcast_ip_to_mac, FilterState, ReceiveFilters, MAX_MULTICAST_FILTERS};
pub use frame_io::InterruptStatus;
pub use link::LinkState;
pub use phy::{LinkStatus, PhyRegisters};
pub use ring::RingIndex;
pub use stats::EthernetStatistics;

use regs::*;

/// Upward protocol lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolState {
    #[default]
    Stopped,
    Started,
    Initialized,
}

/// Result of [`SimpleNetwork::get_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub interrupts: InterruptStatus,
    /// A transmitted frame handed back to its owner
    pub transmitted: Option<Vec<u8>>,
    pub media_present: bool,
}

/// Result of [`SimpleNetwork::mode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSnapshot {
    pub state: ProtocolState,
    pub link_state: LinkState,
    pub media_present: bool,
    pub permanent_address: MacAddress,
    pub current_address: MacAddress,
    pub broadcast_address: MacAddress,
    pub receive_filters: ReceiveFilters,
    pub receive_filter_mask: ReceiveFilters,
    pub multicast: Vec<MacAddress>,
    pub max_multicast: usize,
    pub media_header_size: usize,
    pub max_packet_size: usize,
    pub link: Option<LinkStatus>,
    /// Frames `transmit` accepts before reporting the ring busy
    pub transmit_slots: usize,
}

/// All state for one controller.
pub struct EthernetContext<R: RegisterAccess, P: Platform> {
    registers: R,
    platform: P,
    config: DriverConfig,

    protocol_state: ProtocolState,
    link_state: LinkState,
    /// Ticks left on the current link state's dwell or timeout
    link_timer: u32,

    phy_address: Option<u8>,
    phy_identifier: u32,
    phy_registers: PhyRegisters,
    link_status: Option<LinkStatus>,

    arena: DmaArena<P>,
    rx_ring: ReceiveRing,
    tx_ring: TransmitRing,

    interrupt_status: InterruptStatus,
    statistics: EthernetStatistics,
    filters: FilterState,
}

impl<R: RegisterAccess, P: Platform> EthernetContext<R, P> {
    /// Attach to a controller. The permanent address is whatever firmware
    /// left in address slot 0.
    pub fn new(mut registers: R, platform: P, config: DriverConfig) -> Self {
        let permanent = mac::read_address_slot(&mut registers, 0);
        info!("[PCH_GBE] attached, MAC {}", permanent);

        Self {
            registers,
            platform,
            config,
            protocol_state: ProtocolState::Stopped,
            link_state: LinkState::Unknown,
            link_timer: 0,
            phy_address: None,
            phy_identifier: 0,
            phy_registers: PhyRegisters::default(),
            link_status: None,
            arena: DmaArena::new(),
            rx_ring: ReceiveRing::new(),
            tx_ring: TransmitRing::new(),
            interrupt_status: InterruptStatus::empty(),
            statistics: EthernetStatistics::default(),
            filters: FilterState::new(permanent),
        }
    }

    pub fn link_state(&self) -> LinkState {
        self.link_state
    }

    pub fn protocol_state(&self) -> ProtocolState {
        self.protocol_state
    }

    fn start(&mut self) -> Result<(), EthernetError> {
        if self.protocol_state != ProtocolState::Stopped {
            return Err(EthernetError::AlreadyStarted);
        }
        self.registers.write32(SRST, SRST_RELEASE);
        self.platform.start_periodic_timer(self.config.timer_period_us)?;
        self.protocol_state = ProtocolState::Started;
        debug!("[PCH_GBE] started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EthernetError> {
        match self.protocol_state {
            ProtocolState::Stopped => return Err(EthernetError::NotStarted),
            ProtocolState::Initialized => self.shutdown()?,
            ProtocolState::Started => {}
        }
        self.platform.cancel_periodic_timer();
        self.registers.write32(SRST, SRST_ASSERT);
        self.protocol_state = ProtocolState::Stopped;
        debug!("[PCH_GBE] stopped");
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), EthernetError> {
        match self.protocol_state {
            ProtocolState::Stopped => return Err(EthernetError::NotStarted),
            ProtocolState::Initialized => return Err(EthernetError::DeviceError),
            ProtocolState::Started => {}
        }

        if self.arena.is_held() {
            debug!("[PCH_GBE] releasing DMA arena from failed initialize");
            self.arena.free(&mut self.platform);
        }
        self.arena.allocate(&mut self.platform)?;

        self.filters.reset();
        self.interrupt_status = InterruptStatus::empty();
        self.link_state = LinkState::Unknown;
        self.link_timer = 0;
        self.registers.write32(INT_EN, INT_RECEIVE_MASK | INT_TRANSMIT_MASK);
        self.protocol_state = ProtocolState::Initialized;
        info!("[PCH_GBE] initialized");
        Ok(())
    }

    /// Stop DMA and release the arena. Also valid after a failed
    /// `initialize`, to release what it acquired.
    fn shutdown(&mut self) -> Result<(), EthernetError> {
        if self.protocol_state == ProtocolState::Stopped {
            return Err(EthernetError::NotStarted);
        }

        self.disable_receiver();
        self.registers.and32(DMA_CTRL, !DMA_CTRL_TX_EN);
        self.registers.write32(INT_EN, 0);

        let dropped = self.tx_ring.clear();
        self.statistics.tx_total_frames += dropped as u64;
        self.statistics.tx_dropped_frames += dropped as u64;
        self.rx_ring = ReceiveRing::new();
        self.arena.free(&mut self.platform);

        self.interrupt_status = InterruptStatus::empty();
        self.link_state = LinkState::Unknown;
        self.link_status = None;
        self.link_timer = 0;
        self.protocol_state = ProtocolState::Started;
        debug!("[PCH_GBE] shut down");
        Ok(())
    }

    fn reset(&mut self) -> Result<(), EthernetError> {
        self.require_initialized()?;
        self.disable_receiver();
        self.filters.reset();
        self.program_filters();
        self.link_status = None;
        self.link_timer = 0;
        self.link_state = LinkState::Down;
        debug!("[PCH_GBE] reset");
        Ok(())
    }

    fn get_status(&mut self) -> Result<DeviceStatus, EthernetError> {
        self.require_initialized()?;
        self.ethernet_interrupts();
        let interrupts = self.interrupt_status;
        let transmitted = self.transmit_complete();
        Ok(DeviceStatus {
            interrupts,
            transmitted,
            media_present: self.link_state == LinkState::Up,
        })
    }

    fn statistics(&mut self, reset: bool) -> Result<EthernetStatistics, EthernetError> {
        self.require_initialized()?;
        Ok(self.statistics.snapshot(reset))
    }

    fn mode(&self) -> ModeSnapshot {
        ModeSnapshot {
            state: self.protocol_state,
            link_state: self.link_state,
            media_present: self.link_state == LinkState::Up,
            permanent_address: self.filters.permanent_address,
            current_address: self.filters.current_address,
            broadcast_address: MacAddress::broadcast(),
            receive_filters: self.filters.enabled,
            receive_filter_mask: ReceiveFilters::all(),
            multicast: self.filters.multicast.clone(),
            max_multicast: MAX_MULTICAST_FILTERS,
            media_header_size: EthernetHeader::SIZE,
            max_packet_size: EthernetHeader::MAX_FRAME_SIZE - EthernetHeader::SIZE,
            link: self.link_status,
            transmit_slots: self.tx_ring.free_slots(),
        }
    }

    fn on_timer_tick(&mut self) {
        if self.protocol_state == ProtocolState::Initialized {
            self.link_tick();
        }
    }

    fn on_wait_for_packet(&mut self) {
        if self.protocol_state != ProtocolState::Initialized {
            return;
        }
        let signalled = self.ethernet_interrupts();
        if !signalled && self.interrupt_status.contains(InterruptStatus::RECEIVE) {
            self.platform.signal_wait_for_packet();
        }
    }
}

impl<R: RegisterAccess, P: Platform> Drop for EthernetContext<R, P> {
    fn drop(&mut self) {
        if self.protocol_state != ProtocolState::Stopped {
            // stop() only fails when already stopped
            let _ = self.stop();
        }
        self.arena.free(&mut self.platform);
    }
}

/// One controller, shared between API callers and host callbacks.
///
/// Every entry point runs with the context locked, start to finish.
pub struct EthernetDevice<R: RegisterAccess, P: Platform> {
    context: Mutex<EthernetContext<R, P>>,
}

impl<R: RegisterAccess, P: Platform> EthernetDevice<R, P> {
    pub fn new(registers: R, platform: P, config: DriverConfig) -> Self {
        Self {
            context: Mutex::new(EthernetContext::new(registers, platform, config)),
        }
    }

    /// Periodic maintenance callback.
    ///
    /// Skipped when an API call holds the context; the link timers then lose
    /// one tick.
    pub fn on_timer_tick(&self) {
        if let Some(mut context) = self.context.try_lock() {
            context.on_timer_tick();
        }
    }

    /// Wait-for-packet notification callback.
    pub fn on_wait_for_packet(&self) {
        if let Some(mut context) = self.context.try_lock() {
            context.on_wait_for_packet();
        }
    }

    pub fn link_state(&self) -> LinkState {
        self.context.lock().link_state()
    }

    #[cfg(test)]
    pub(crate) fn with_context<T>(&self, f: impl FnOnce(&mut EthernetContext<R, P>) -> T) -> T {
        f(&mut self.context.lock())
    }
}

impl<R: RegisterAccess, P: Platform> SimpleNetwork for EthernetDevice<R, P> {
    fn start(&self) -> Result<(), EthernetError> {
        self.context.lock().start()
    }

    fn stop(&self) -> Result<(), EthernetError> {
        self.context.lock().stop()
    }

    fn initialize(&self) -> Result<(), EthernetError> {
        self.context.lock().initialize()
    }

    fn shutdown(&self) -> Result<(), EthernetError> {
        self.context.lock().shutdown()
    }

    fn reset(&self) -> Result<(), EthernetError> {
        self.context.lock().reset()
    }

    fn transmit(
        &self,
        frame: Vec<u8>,
        header: Option<&TransmitHeader>,
    ) -> Result<(), TransmitRejected> {
        let mut context = self.context.lock();
        if let Err(error) = context.require_initialized() {
            return Err(TransmitRejected { error, frame });
        }
        context.transmit_frame(frame, header)
    }

    fn receive(&self, buffer: &mut [u8]) -> Result<ReceivedFrame, EthernetError> {
        let mut context = self.context.lock();
        context.require_initialized()?;
        context.receive_frame(buffer)
    }

    fn get_status(&self) -> Result<DeviceStatus, EthernetError> {
        self.context.lock().get_status()
    }

    fn receive_filters(
        &self,
        enable: ReceiveFilters,
        disable: ReceiveFilters,
        reset_multicast: bool,
        multicast: Option<&[MacAddress]>,
    ) -> Result<(), EthernetError> {
        self.context
            .lock()
            .set_receive_filters(enable, disable, reset_multicast, multicast)
    }

    fn station_address(&self, address: Option<MacAddress>) -> Result<(), EthernetError> {
        self.context.lock().set_station_address(address)
    }

    fn statistics(&self, reset: bool) -> Result<EthernetStatistics, EthernetError> {
        self.context.lock().statistics(reset)
    }

    fn mcast_ip_to_mac(&self, ip: IpAddr) -> Result<MacAddress, EthernetError> {
        mcast_ip_to_mac(ip)
    }

    fn mode(&self) -> ModeSnapshot {
        self.context.lock().mode()
    }
}
