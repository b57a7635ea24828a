//! Host environment interface
//!
//! Everything the driver needs from the boot-services environment: a
//! microsecond stall, the periodic maintenance timer, the wait-for-packet
//! event, and bus-master DMA memory. The driver never allocates DMA memory
//! or touches events any other way.

use crate::drivers::net::netdev::EthernetError;

/// Size of one DMA page.
pub const PAGE_SIZE: usize = 4096;

/// Number of pages needed to hold `bytes`.
pub const fn pages_for(bytes: usize) -> usize {
    bytes.div_ceil(PAGE_SIZE)
}

/// Memory returned by [`Platform::allocate_buffer`].
///
/// The start must be page aligned and the memory must stay at the same
/// address until the buffer is handed back to [`Platform::free_buffer`].
pub trait DmaBuffer {
    /// CPU-visible start of the buffer
    fn as_mut_ptr(&mut self) -> *mut u8;

    /// Length in bytes
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of mapping a buffer for bus-master common-buffer access.
#[derive(Debug)]
pub struct DmaMapping<T> {
    /// Address the controller uses for the first byte of the buffer
    pub device_address: u64,
    /// Bytes the host actually mapped; may be less than requested
    pub mapped_bytes: usize,
    /// Opaque token handed back to [`Platform::unmap`]
    pub token: T,
}

/// Services provided by the host environment.
pub trait Platform {
    type Buffer: DmaBuffer;
    type MapToken;

    /// Busy-wait for at least `microseconds`.
    fn stall(&self, microseconds: u32);

    /// Allocate `pages` of memory suitable for common-buffer DMA.
    fn allocate_buffer(&mut self, pages: usize) -> Result<Self::Buffer, EthernetError>;

    /// Release memory obtained from [`Platform::allocate_buffer`].
    fn free_buffer(&mut self, buffer: Self::Buffer);

    /// Map the first `bytes` of `buffer` for bus-master common-buffer use.
    fn map(
        &mut self,
        buffer: &mut Self::Buffer,
        bytes: usize,
    ) -> Result<DmaMapping<Self::MapToken>, EthernetError>;

    /// Undo [`Platform::map`].
    fn unmap(&mut self, token: Self::MapToken);

    /// Arm the periodic maintenance timer. The host calls
    /// `EthernetDevice::on_timer_tick` on every expiry.
    fn start_periodic_timer(&mut self, period_us: u32) -> Result<(), EthernetError>;

    /// Cancel the periodic maintenance timer.
    fn cancel_periodic_timer(&mut self);

    /// Signal the wait-for-packet event.
    fn signal_wait_for_packet(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_for() {
        assert_eq!(pages_for(0), 0);
        assert_eq!(pages_for(1), 1);
        assert_eq!(pages_for(PAGE_SIZE), 1);
        assert_eq!(pages_for(PAGE_SIZE + 1), 2);
        assert_eq!(pages_for(64 * 16 * 1024), 256);
    }
}
