//! Statistics counters
//!
//! Software-maintained counters in the layout of the firmware network
//! statistics record. The controller has no MIB block, so every counter is
//! bumped by the receive and transmit-complete paths.

use crate::net::ethernet::MacAddress;

/// Frame counters, monotonic until reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EthernetStatistics {
    pub rx_total_frames: u64,
    pub rx_good_frames: u64,
    /// Frames shorter than the 64 byte minimum
    pub rx_undersize_frames: u64,
    /// Frames longer than the maximum frame size
    pub rx_oversize_frames: u64,
    pub rx_dropped_frames: u64,
    pub rx_unicast_frames: u64,
    pub rx_broadcast_frames: u64,
    pub rx_multicast_frames: u64,
    pub rx_crc_error_frames: u64,
    pub rx_alignment_error_frames: u64,
    pub rx_total_bytes: u64,

    pub tx_total_frames: u64,
    pub tx_good_frames: u64,
    pub tx_dropped_frames: u64,
    pub tx_unicast_frames: u64,
    pub tx_broadcast_frames: u64,
    pub tx_multicast_frames: u64,
    pub tx_total_bytes: u64,
    /// Frames sent after exactly one collision
    pub tx_single_collision_frames: u64,
    /// Frames sent after more than one collision
    pub tx_multiple_collision_frames: u64,
    /// Frames abandoned after excessive collisions
    pub tx_excessive_collision_frames: u64,
    pub collisions: u64,
}

/// Destination class of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    Unicast,
    Multicast,
    Broadcast,
}

impl AddressClass {
    /// Classify by destination address bits.
    pub fn of(destination: &MacAddress) -> Self {
        if destination.is_broadcast() {
            AddressClass::Broadcast
        } else if destination.is_multicast() {
            AddressClass::Multicast
        } else {
            AddressClass::Unicast
        }
    }
}

impl EthernetStatistics {
    pub fn count_rx_good(&mut self, class: AddressClass, bytes: usize) {
        self.rx_good_frames += 1;
        self.rx_total_bytes += bytes as u64;
        match class {
            AddressClass::Unicast => self.rx_unicast_frames += 1,
            AddressClass::Multicast => self.rx_multicast_frames += 1,
            AddressClass::Broadcast => self.rx_broadcast_frames += 1,
        }
    }

    pub fn count_tx_good(&mut self, class: AddressClass, bytes: usize) {
        self.tx_good_frames += 1;
        self.tx_total_bytes += bytes as u64;
        match class {
            AddressClass::Unicast => self.tx_unicast_frames += 1,
            AddressClass::Multicast => self.tx_multicast_frames += 1,
            AddressClass::Broadcast => self.tx_broadcast_frames += 1,
        }
    }

    /// Collisions reported by a completed transmit descriptor.
    pub fn count_tx_collisions(
        &mut self,
        single: bool,
        multiple: bool,
        excessive: bool,
        retries: u16,
    ) {
        if excessive {
            self.tx_excessive_collision_frames += 1;
        } else if multiple {
            self.tx_multiple_collision_frames += 1;
        } else if single {
            self.tx_single_collision_frames += 1;
        }
        self.collisions += u64::from(retries);
    }

    /// Snapshot, optionally zeroing the live counters.
    pub fn snapshot(&mut self, reset: bool) -> Self {
        let copy = *self;
        if reset {
            *self = Self::default();
        }
        copy
    }
}
