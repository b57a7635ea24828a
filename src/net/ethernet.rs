//! Ethernet frame handling
//!
//! Provides data structures and utilities for working with Ethernet II frames:
//! MAC address representation, header parsing and construction, and the
//! negotiated link parameters shared by the PHY and MAC engines.

use core::fmt;

/// 48-bit MAC (Media Access Control) address
///
/// Format: 6 bytes, typically displayed as XX:XX:XX:XX:XX:XX in hexadecimal.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// Create a new MAC address from 6 bytes
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Broadcast MAC address (FF:FF:FF:FF:FF:FF)
    pub const fn broadcast() -> Self {
        Self([0xFF; 6])
    }

    /// Check if this is a broadcast address
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xFF; 6]
    }

    /// Check if this is a multicast address (bit 0 of first byte is 1)
    pub fn is_multicast(&self) -> bool {
        (self.0[0] & 0x01) != 0
    }

    /// Get the bytes of this MAC address
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Read the address from the first 6 bytes of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(bytes.get(..6)?);
        Some(Self(mac))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl From<MacAddress> for smoltcp::wire::EthernetAddress {
    fn from(mac: MacAddress) -> Self {
        smoltcp::wire::EthernetAddress(mac.0)
    }
}

/// Negotiated or advertised line rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LinkSpeed {
    Speed10,
    Speed100,
    Speed1000,
}

impl LinkSpeed {
    pub const fn mbps(self) -> u32 {
        match self {
            LinkSpeed::Speed10 => 10,
            LinkSpeed::Speed100 => 100,
            LinkSpeed::Speed1000 => 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplex {
    Half,
    Full,
}

impl fmt::Display for Duplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Duplex::Half => write!(f, "half"),
            Duplex::Full => write!(f, "full"),
        }
    }
}

/// Ethernet II header
///
/// Standard Ethernet frame format:
/// - Destination MAC (6 bytes)
/// - Source MAC (6 bytes)
/// - EtherType (2 bytes, big-endian)
/// - Payload (46-1500 bytes)
/// - CRC (4 bytes, handled by hardware)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub destination: MacAddress,
    pub source: MacAddress,
    pub ethertype: u16,
}

impl EthernetHeader {
    /// Ethernet header size: dest MAC (6) + src MAC (6) + ethertype (2)
    pub const SIZE: usize = 14;

    /// Minimum frame size (excluding CRC): 14 byte header + 46 byte min payload
    pub const MIN_FRAME_SIZE: usize = 60;

    /// Maximum frame size (excluding CRC): 14 byte header + 1500 byte max payload
    pub const MAX_FRAME_SIZE: usize = 1514;

    /// Length of the frame check sequence appended by the MAC
    pub const FCS_SIZE: usize = 4;

    /// Parse the header at the start of `buffer`.
    ///
    /// Returns None if the buffer is shorter than a header.
    pub fn parse(buffer: &[u8]) -> Option<Self> {
        if buffer.len() < Self::SIZE {
            return None;
        }

        Some(Self {
            destination: MacAddress::from_slice(&buffer[0..6])?,
            source: MacAddress::from_slice(&buffer[6..12])?,
            ethertype: u16::from_be_bytes([buffer[12], buffer[13]]),
        })
    }

    /// Write this header to the start of `buffer`.
    ///
    /// Returns None if the buffer is too small.
    pub fn write_to(&self, buffer: &mut [u8]) -> Option<usize> {
        if buffer.len() < Self::SIZE {
            return None;
        }

        buffer[0..6].copy_from_slice(&self.destination.0);
        buffer[6..12].copy_from_slice(&self.source.0);
        buffer[12..14].copy_from_slice(&self.ethertype.to_be_bytes());

        Some(Self::SIZE)
    }
}

/// Header fields the driver fills in on transmit.
///
/// `source` defaults to the device's current station address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmitHeader {
    pub destination: MacAddress,
    pub source: Option<MacAddress>,
    pub ethertype: u16,
}

/// Result of a successful receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedFrame {
    /// Bytes copied into the caller's buffer (FCS excluded)
    pub length: usize,
    /// Size of the media header at the start of the frame
    pub header_size: usize,
    /// Parsed header, if the frame is long enough to carry one
    pub header: Option<EthernetHeader>,
}

// EtherType constants
// Source: IEEE 802 Numbers
// <https://www.iana.org/assignments/ieee-802-numbers/ieee-802-numbers.xhtml>

/// IPv4 protocol
pub const ETHERTYPE_IPV4: u16 = 0x0800;
