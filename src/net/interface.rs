//! smoltcp glue
//!
//! [`GbeDevice`] lets a smoltcp `Interface` run directly on any
//! [`SimpleNetwork`] device. Received frames are copied into an owned buffer
//! for the RX token; transmit tokens build the frame in a fresh `Vec` and hand
//! it to the driver, which keeps it until the descriptor retires.
//!
//! Completed transmit buffers are collected through `get_status` before each
//! new transmit token is handed out. No token is handed out while the
//! transmit ring is full, so smoltcp keeps the packet and retries.

use alloc::vec;
use alloc::vec::Vec;

use log::{debug, trace};
use smoltcp::phy::{self, DeviceCapabilities, Medium};
use smoltcp::time::Instant;

use crate::drivers::net::ethernet::intel::pch_gbe::dma::TX_RING_DEPTH;
use crate::drivers::net::netdev::{EthernetError, SimpleNetwork};
use crate::net::ethernet::EthernetHeader;

/// Receive buffer size: one maximum frame plus FCS, rounded up
const RX_BUFFER_SIZE: usize = 1536;

/// Adapter from a [`SimpleNetwork`] device to [`smoltcp::phy::Device`].
pub struct GbeDevice<'a, N: SimpleNetwork> {
    device: &'a N,
    rx_buffer: Vec<u8>,
}

impl<'a, N: SimpleNetwork> GbeDevice<'a, N> {
    pub fn new(device: &'a N) -> Self {
        Self {
            device,
            rx_buffer: vec![0; RX_BUFFER_SIZE],
        }
    }

    /// Take back every transmit buffer the driver has finished with.
    fn reclaim(&self) -> usize {
        let mut reclaimed = 0;
        while reclaimed < TX_RING_DEPTH {
            match self.device.get_status() {
                Ok(status) if status.transmitted.is_some() => reclaimed += 1,
                _ => break,
            }
        }
        reclaimed
    }
}

impl<N: SimpleNetwork> phy::Device for GbeDevice<'_, N> {
    type RxToken<'a> = GbeRxToken where Self: 'a;
    type TxToken<'a> = GbeTxToken<'a, N> where Self: 'a;

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        let frame = loop {
            match self.device.receive(&mut self.rx_buffer) {
                Ok(frame) => break frame,
                Err(EthernetError::BufferTooSmall { required }) => {
                    debug!("[NET] growing receive buffer to {} bytes", required);
                    self.rx_buffer.resize(required, 0);
                }
                Err(EthernetError::NotReady) => return None,
                Err(e) => {
                    trace!("[NET] receive failed: {}", e);
                    return None;
                }
            }
        };

        let rx = GbeRxToken {
            frame: self.rx_buffer[..frame.length].to_vec(),
        };
        let tx = GbeTxToken {
            device: self.device,
        };
        Some((rx, tx))
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        self.reclaim();
        let mode = self.device.mode();
        if !mode.media_present || mode.transmit_slots == 0 {
            return None;
        }
        Some(GbeTxToken {
            device: self.device,
        })
    }

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.medium = Medium::Ethernet;
        caps.max_transmission_unit = EthernetHeader::MAX_FRAME_SIZE;
        // One transmit descriptor always stays empty
        caps.max_burst_size = Some(TX_RING_DEPTH - 1);
        caps
    }
}

pub struct GbeRxToken {
    frame: Vec<u8>,
}

impl phy::RxToken for GbeRxToken {
    fn consume<R, F>(mut self, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        f(&mut self.frame)
    }
}

pub struct GbeTxToken<'a, N: SimpleNetwork> {
    device: &'a N,
}

impl<N: SimpleNetwork> phy::TxToken for GbeTxToken<'_, N> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let mut frame = vec![0; len];
        let result = f(&mut frame);
        if let Err(rejected) = self.device.transmit(frame, None) {
            // smoltcp retransmits at its own layer
            debug!("[NET] frame dropped: {}", rejected);
        }
        result
    }
}
