//! Receive filters and station address
//!
//! Address slot 0 always holds the current station address. Slots 1..=15
//! hold the multicast list; unused slots stay masked. Unicast and multicast
//! matching is done by the controller; broadcast frames always pass the
//! hardware and are filtered in software on receive.

use alloc::vec::Vec;
use core::net::IpAddr;

use bitflags::bitflags;
use log::debug;

use crate::drivers::mmio::RegisterAccess;
use crate::drivers::net::netdev::EthernetError;
use crate::drivers::poll::BoundedPoll;
use crate::net::ethernet::MacAddress;
use crate::platform::Platform;

use super::mac::{disable_address_slot, write_address_slot};
use super::regs::*;
use super::stats::AddressClass;
use super::{EthernetContext, ProtocolState};

bitflags! {
    /// Receive filter settings.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ReceiveFilters: u32 {
        /// Frames addressed to the station address.
        const UNICAST = 0x01;
        /// Frames addressed to an address on the multicast list.
        const MULTICAST = 0x02;
        const BROADCAST = 0x04;
        /// Every frame regardless of destination.
        const PROMISCUOUS = 0x08;
        /// Every multicast frame.
        const PROMISCUOUS_MULTICAST = 0x10;
    }
}

/// Address slots available to the multicast list (slot 0 is the station)
pub const MAX_MULTICAST_FILTERS: usize = MAC_ADR_SLOTS - 1;

/// Addresses and filter bits for one controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub enabled: ReceiveFilters,
    pub multicast: Vec<MacAddress>,
    pub permanent_address: MacAddress,
    pub current_address: MacAddress,
}

impl FilterState {
    pub fn new(permanent_address: MacAddress) -> Self {
        Self {
            enabled: ReceiveFilters::empty(),
            multicast: Vec::new(),
            permanent_address,
            current_address: permanent_address,
        }
    }

    /// Back to permanent address, no filters, empty multicast list.
    pub fn reset(&mut self) {
        *self = Self::new(self.permanent_address);
    }

    /// Whether a good frame of `class` reaches the caller.
    pub fn accepts(&self, class: AddressClass) -> bool {
        if self.enabled.contains(ReceiveFilters::PROMISCUOUS) {
            return true;
        }
        match class {
            AddressClass::Unicast => true,
            AddressClass::Broadcast => self.enabled.contains(ReceiveFilters::BROADCAST),
            AddressClass::Multicast => self
                .enabled
                .intersects(ReceiveFilters::MULTICAST | ReceiveFilters::PROMISCUOUS_MULTICAST),
        }
    }

    /// RX_MODE value for the current filter bits.
    pub fn rx_mode(&self) -> u32 {
        let mut mode = RX_MODE_FIFO_DEFAULT;
        if !self.enabled.contains(ReceiveFilters::PROMISCUOUS) {
            mode |= RX_MODE_ADDRESS_FILTER_EN;
            if !self.enabled.contains(ReceiveFilters::PROMISCUOUS_MULTICAST) {
                mode |= RX_MODE_MULTICAST_FILTER_EN;
            }
        }
        mode
    }

    /// Write the address slots and RX_MODE.
    pub fn program<R: RegisterAccess, P: Platform>(
        &self,
        registers: &mut R,
        platform: &P,
        poll: BoundedPoll,
    ) {
        write_address_slot(registers, platform, poll, 0, &self.current_address);
        for slot in 1..MAC_ADR_SLOTS {
            match self.multicast.get(slot - 1) {
                Some(mac) => write_address_slot(registers, platform, poll, slot, mac),
                None => disable_address_slot(registers, platform, poll, slot),
            }
        }
        registers.write32(RX_MODE, self.rx_mode());
    }
}

/// Multicast MAC address for a multicast IP address.
///
/// IPv4 maps the low 23 bits under 01:00:5E, IPv6 the low 32 bits under
/// 33:33.
pub fn mcast_ip_to_mac(ip: IpAddr) -> Result<MacAddress, EthernetError> {
    match ip {
        IpAddr::V4(v4) if v4.is_multicast() => {
            let o = v4.octets();
            Ok(MacAddress::new([0x01, 0x00, 0x5E, o[1] & 0x7F, o[2], o[3]]))
        }
        IpAddr::V6(v6) if v6.is_multicast() => {
            let o = v6.octets();
            Ok(MacAddress::new([0x33, 0x33, o[12], o[13], o[14], o[15]]))
        }
        _ => Err(EthernetError::InvalidParameter),
    }
}

impl<R: RegisterAccess, P: Platform> EthernetContext<R, P> {
    pub(crate) fn program_filters(&mut self) {
        self.filters.program(&mut self.registers, &self.platform, self.config.address_mask_poll);
    }

    pub(crate) fn set_receive_filters(
        &mut self,
        enable: ReceiveFilters,
        disable: ReceiveFilters,
        reset_multicast: bool,
        multicast: Option<&[MacAddress]>,
    ) -> Result<(), EthernetError> {
        self.require_initialized()?;

        if ReceiveFilters::from_bits(enable.bits()).is_none()
            || ReceiveFilters::from_bits(disable.bits()).is_none()
        {
            return Err(EthernetError::InvalidParameter);
        }

        let replacement = match multicast {
            Some(list) if !reset_multicast => {
                if list.len() > MAX_MULTICAST_FILTERS
                    || list.iter().any(|mac| !mac.is_multicast())
                {
                    return Err(EthernetError::InvalidParameter);
                }
                if !list.is_empty() && !enable.contains(ReceiveFilters::MULTICAST) {
                    return Err(EthernetError::InvalidParameter);
                }
                Some(list)
            }
            _ => None,
        };

        self.filters.enabled = (self.filters.enabled | enable) & !disable;
        if reset_multicast || !self.filters.enabled.contains(ReceiveFilters::MULTICAST) {
            self.filters.multicast.clear();
        } else if let Some(list) = replacement {
            self.filters.multicast = list.to_vec();
        }

        debug!(
            "[PCH_GBE] receive filters {:?}, {} multicast",
            self.filters.enabled,
            self.filters.multicast.len()
        );
        self.program_filters();
        Ok(())
    }

    pub(crate) fn set_station_address(
        &mut self,
        address: Option<MacAddress>,
    ) -> Result<(), EthernetError> {
        self.require_initialized()?;
        let address = match address {
            Some(mac) if mac.is_multicast() => return Err(EthernetError::InvalidParameter),
            Some(mac) => mac,
            None => self.filters.permanent_address,
        };
        self.filters.current_address = address;
        debug!("[PCH_GBE] station address {}", address);
        self.program_filters();
        Ok(())
    }

    pub(crate) fn require_initialized(&self) -> Result<(), EthernetError> {
        match self.protocol_state {
            ProtocolState::Stopped => Err(EthernetError::NotStarted),
            ProtocolState::Started => Err(EthernetError::DeviceError),
            ProtocolState::Initialized => Ok(()),
        }
    }
}
