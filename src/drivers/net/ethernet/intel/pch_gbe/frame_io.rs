//! Frame I/O
//!
//! `ethernet_interrupts` is the only code that reads INT_ST. Everything else
//! works from the sticky [`InterruptStatus`] it maintains.
//!
//! Receive copies out of the ring's DMA buffers; transmit bounce-copies the
//! caller's frame into the slot's DMA buffer and parks the caller's `Vec`
//! until the descriptor retires.

use alloc::vec::Vec;
use core::sync::atomic::{fence, Ordering};

use bitflags::bitflags;
use log::trace;

use crate::drivers::mmio::RegisterAccess;
use crate::drivers::net::netdev::{EthernetError, TransmitRejected};
use crate::net::ethernet::{EthernetHeader, MacAddress, ReceivedFrame, TransmitHeader};
use crate::platform::Platform;

use super::descriptor::*;
use super::dma::BUFFER_SIZE;
use super::regs::*;
use super::stats::AddressClass;
use super::{EthernetContext, LinkState};

bitflags! {
    /// Pending work reported to the caller.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InterruptStatus: u32 {
        /// At least one received frame is waiting in the ring.
        const RECEIVE = 0x01;
        /// At least one transmit descriptor may have retired.
        const TRANSMIT = 0x02;
    }
}

impl InterruptStatus {
    /// Translate INT_ST bits.
    pub fn from_hardware(status: u32) -> Self {
        let mut bits = Self::empty();
        if status & INT_RECEIVE_MASK != 0 {
            bits |= Self::RECEIVE;
        }
        if status & INT_TRANSMIT_MASK != 0 {
            bits |= Self::TRANSMIT;
        }
        bits
    }
}

impl<R: RegisterAccess, P: Platform> EthernetContext<R, P> {
    /// Poll the controller's interrupt status into the sticky bits.
    ///
    /// Signals the wait-for-packet event when work appears on an idle device,
    /// and returns whether it did.
    pub(crate) fn ethernet_interrupts(&mut self) -> bool {
        let status = self.registers.read32(INT_ST);
        let pending = InterruptStatus::from_hardware(status);
        if pending.is_empty() {
            return false;
        }

        let was_idle = self.interrupt_status.is_empty();
        self.interrupt_status |= pending;
        if was_idle {
            self.platform.signal_wait_for_packet();
        }
        was_idle
    }

    /// Copy the next frame into `buffer`.
    ///
    /// Errored frames, and broadcast frames while broadcast reception is off,
    /// are counted and retired; the call then reports `NotReady` and the
    /// caller polls again for the next one. A frame that does not fit stays
    /// in the ring.
    pub(crate) fn receive_frame(
        &mut self,
        buffer: &mut [u8],
    ) -> Result<ReceivedFrame, EthernetError> {
        if self.link_state != LinkState::Up {
            return Err(EthernetError::NotReady);
        }
        self.ethernet_interrupts();
        if !self.interrupt_status.contains(InterruptStatus::RECEIVE) {
            return Err(EthernetError::NotReady);
        }

        let next = self.rx_ring.next_index();
        let hard = self.receive_hard_index();
        if hard == next {
            self.interrupt_status.remove(InterruptStatus::RECEIVE);
            return Err(EthernetError::NotReady);
        }

        let Some(mut view) = self.arena.view() else {
            return Err(EthernetError::NotReady);
        };
        let descriptor = view.rx_descriptor(next);
        let gmac = descriptor.gmac_status.read();
        let length = usize::from(descriptor.length.read()).saturating_sub(EthernetHeader::FCS_SIZE);

        let verdict = if gmac & RX_GMAC_CRCERR != 0 {
            self.statistics.rx_crc_error_frames += 1;
            Err("CRC error")
        } else if gmac & RX_GMAC_ALIGNMENT_ERROR != 0 {
            self.statistics.rx_alignment_error_frames += 1;
            Err("alignment error")
        } else if gmac & RX_GMAC_TSHRT != 0 || length < EthernetHeader::SIZE {
            self.statistics.rx_undersize_frames += 1;
            Err("runt")
        } else if gmac & RX_GMAC_TLONG != 0 || length > BUFFER_SIZE {
            self.statistics.rx_oversize_frames += 1;
            Err("oversize")
        } else {
            let class = if gmac & RX_GMAC_MARBR != 0 {
                AddressClass::Broadcast
            } else if gmac & RX_GMAC_MARMLT != 0 {
                AddressClass::Multicast
            } else {
                AddressClass::Unicast
            };
            if self.filters.accepts(class) {
                Ok(class)
            } else {
                self.statistics.rx_dropped_frames += 1;
                Err("filtered")
            }
        };

        let class = match verdict {
            Ok(class) => class,
            Err(reason) => {
                trace!("[PCH_GBE] RX slot {} dropped: {}", next.get(), reason);
                self.statistics.rx_total_frames += 1;
                self.retire_receive();
                return Err(EthernetError::NotReady);
            }
        };

        if buffer.len() < length {
            return Err(EthernetError::BufferTooSmall { required: length });
        }

        let frame = &view.rx_buffer(next)[..length];
        buffer[..length].copy_from_slice(frame);
        let header = EthernetHeader::parse(frame);

        self.statistics.rx_total_frames += 1;
        self.statistics.count_rx_good(class, length);
        self.retire_receive();

        trace!("[PCH_GBE] RX slot {}: {} bytes", next.get(), length);
        Ok(ReceivedFrame {
            length,
            header_size: EthernetHeader::SIZE,
            header,
        })
    }

    /// Hand the next receive descriptor back to the controller.
    fn retire_receive(&mut self) {
        let next = self.rx_ring.next_index();
        let Some(mut view) = self.arena.view() else {
            return;
        };
        let address = view.rx_buffer_address(next);
        view.rx_descriptor(next).post(address);
        fence(Ordering::SeqCst);

        self.rx_ring.receive_index = next;
        self.registers.write32(RX_DSC_SW_P, view.rx_descriptor_address(next));

        if self.receive_hard_index() == self.rx_ring.next_index() {
            self.interrupt_status.remove(InterruptStatus::RECEIVE);
        }
    }

    /// Queue `frame` for transmission.
    pub(crate) fn transmit_frame(
        &mut self,
        mut frame: Vec<u8>,
        header: Option<&TransmitHeader>,
    ) -> Result<(), TransmitRejected> {
        let reject = |error, frame| Err(TransmitRejected { error, frame });

        if self.link_state != LinkState::Up {
            return reject(EthernetError::NotReady, frame);
        }
        if frame.is_empty() || frame.len() > BUFFER_SIZE {
            return reject(EthernetError::InvalidParameter, frame);
        }
        if self.tx_ring.is_full() {
            return reject(EthernetError::NotReady, frame);
        }
        if let Some(header) = header {
            let fill = EthernetHeader {
                destination: header.destination,
                source: header.source.unwrap_or(self.filters.current_address),
                ethertype: header.ethertype,
            };
            if fill.write_to(&mut frame).is_none() {
                return reject(
                    EthernetError::BufferTooSmall {
                        required: EthernetHeader::SIZE,
                    },
                    frame,
                );
            }
        }
        let Some(mut view) = self.arena.view() else {
            return reject(EthernetError::NotReady, frame);
        };

        let index = self.tx_ring.transmit_index;
        let length = frame.len();
        view.tx_buffer_mut(index)[..length].copy_from_slice(&frame);

        let mut control = 0;
        if length < EthernetHeader::MIN_FRAME_SIZE {
            control |= TX_FRAME_APAD;
        }
        let address = view.tx_buffer_address(index);
        view.tx_descriptor(index).fill(address, length as u16, control);

        self.tx_ring.park(index, frame);
        self.tx_ring.transmit_index = index.next();

        // Descriptor and buffer must be visible before the soft pointer moves
        fence(Ordering::SeqCst);
        self.registers.write32(
            TX_DSC_SW_P,
            view.tx_descriptor_address(self.tx_ring.transmit_index),
        );

        trace!("[PCH_GBE] TX slot {}: {} bytes", index.get(), length);
        Ok(())
    }

    /// Retire the oldest transmitted descriptor and return its frame.
    pub(crate) fn transmit_complete(&mut self) -> Option<Vec<u8>> {
        if !self.interrupt_status.contains(InterruptStatus::TRANSMIT) {
            return None;
        }
        if self.tx_ring.is_empty() {
            self.interrupt_status.remove(InterruptStatus::TRANSMIT);
            return None;
        }

        let index = self.tx_ring.complete_index;
        let mut view = self.arena.view()?;
        let descriptor = view.tx_descriptor(index);
        let gmac = descriptor.gmac_status.read();
        if gmac & TX_GMAC_CMPLT == 0 {
            return None;
        }
        descriptor.clear();

        let frame = self.tx_ring.take(index);
        self.tx_ring.complete_index = index.next();
        if self.tx_ring.is_empty() {
            self.interrupt_status.remove(InterruptStatus::TRANSMIT);
        }

        let length = frame.as_ref().map_or(0, Vec::len);
        let class = frame
            .as_deref()
            .and_then(MacAddress::from_slice)
            .map_or(AddressClass::Unicast, |destination| AddressClass::of(&destination));

        self.statistics.tx_total_frames += 1;
        self.statistics.count_tx_collisions(
            gmac & TX_GMAC_SNGCOL != 0,
            gmac & TX_GMAC_MLTCOL != 0,
            gmac & TX_GMAC_EXCOL != 0,
            gmac & TX_GMAC_RTYCNT_MASK,
        );
        if gmac & (TX_GMAC_ABT | TX_GMAC_EXCOL) != 0 {
            self.statistics.tx_dropped_frames += 1;
        } else {
            self.statistics.count_tx_good(class, length);
        }

        trace!("[PCH_GBE] TX slot {} complete ({:#06x})", index.get(), gmac);
        frame
    }
}
