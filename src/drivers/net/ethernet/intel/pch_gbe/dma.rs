//! DMA ring engine
//!
//! One common buffer, allocated and mapped once per `initialize()`, is carved
//! into four page-aligned regions:
//!
//! ```text
//! +----------------+----------------------+----------------+----------------------+
//! | RX descriptors | RX buffers (64 x 16K)| TX descriptors | TX buffers (8 x 16K) |
//! +----------------+----------------------+----------------+----------------------+
//! ```
//!
//! Each region's device address is the mapping's device address plus the
//! region offset, so CPU and device addresses differ by the same amount
//! everywhere in the buffer. Software only touches a descriptor between
//! "completion observed" and "re-posted"; the soft/hard pointer registers
//! carry the ownership handoff.

use alloc::vec::Vec;
use core::sync::atomic::{fence, Ordering};

use log::{debug, warn};

use crate::drivers::mmio::RegisterAccess;
use crate::drivers::net::netdev::EthernetError;
use crate::platform::{pages_for, DmaBuffer, Platform, PAGE_SIZE};

use super::descriptor::{RxDescriptor, TxDescriptor, DESCRIPTOR_SIZE};
use super::frame_io::InterruptStatus;
use super::regs::*;
use super::ring::RingIndex;
use super::EthernetContext;

/// Receive descriptors (and buffers)
pub const RX_RING_DEPTH: usize = 64;
/// Transmit descriptors (and buffers)
pub const TX_RING_DEPTH: usize = 8;
/// Bytes per receive or transmit buffer
pub const BUFFER_SIZE: usize = 16 * 1024;

pub type RxIndex = RingIndex<RX_RING_DEPTH>;
pub type TxIndex = RingIndex<TX_RING_DEPTH>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    RxDescriptors = 0,
    RxBuffers = 1,
    TxDescriptors = 2,
    TxBuffers = 3,
}

const REGIONS: [Region; 4] = [
    Region::RxDescriptors,
    Region::RxBuffers,
    Region::TxDescriptors,
    Region::TxBuffers,
];

impl Region {
    pub const fn bytes(self) -> usize {
        match self {
            Region::RxDescriptors => RX_RING_DEPTH * DESCRIPTOR_SIZE,
            Region::RxBuffers => RX_RING_DEPTH * BUFFER_SIZE,
            Region::TxDescriptors => TX_RING_DEPTH * DESCRIPTOR_SIZE,
            Region::TxBuffers => TX_RING_DEPTH * BUFFER_SIZE,
        }
    }

    /// Offset of the region from the start of the common buffer.
    pub const fn offset(self) -> usize {
        let mut offset = 0;
        let mut i = 0;
        while i < self as usize {
            offset += pages_for(REGIONS[i].bytes()) * PAGE_SIZE;
            i += 1;
        }
        offset
    }
}

/// Pages covering all four regions.
pub const ARENA_PAGES: usize = Region::TxBuffers.offset() / PAGE_SIZE
    + pages_for(Region::TxBuffers.bytes());

/// Bytes requested from the mapping.
pub const ARENA_BYTES: usize = ARENA_PAGES * PAGE_SIZE;

/// The common DMA buffer and its mapping.
///
/// Each half of the lifecycle is tracked separately so a failed allocation
/// can be undone piecewise by [`DmaArena::free`].
pub struct DmaArena<P: Platform> {
    buffer: Option<P::Buffer>,
    mapping: Option<P::MapToken>,
    cpu_base: usize,
    device_base: u32,
    mapped: bool,
}

impl<P: Platform> DmaArena<P> {
    pub const fn new() -> Self {
        Self {
            buffer: None,
            mapping: None,
            cpu_base: 0,
            device_base: 0,
            mapped: false,
        }
    }

    /// Buffer allocated and fully mapped.
    pub fn is_ready(&self) -> bool {
        self.mapped
    }

    /// Anything left to release.
    pub fn is_held(&self) -> bool {
        self.buffer.is_some() || self.mapping.is_some()
    }

    /// Allocate and map the common buffer.
    ///
    /// On error whatever was acquired stays recorded; call [`DmaArena::free`].
    pub fn allocate(&mut self, platform: &mut P) -> Result<(), EthernetError> {
        debug_assert!(!self.is_held(), "DMA arena allocated twice");
        let buffer = self.buffer.insert(platform.allocate_buffer(ARENA_PAGES)?);
        if buffer.len() < ARENA_BYTES {
            return Err(EthernetError::OutOfResources);
        }
        self.cpu_base = buffer.as_mut_ptr() as usize;

        let mapping = platform.map(buffer, ARENA_BYTES)?;
        self.mapping = Some(mapping.token);
        if mapping.mapped_bytes != ARENA_BYTES {
            warn!(
                "[PCH_GBE] DMA mapping short: {} of {} bytes",
                mapping.mapped_bytes, ARENA_BYTES
            );
            return Err(EthernetError::PartialMapping {
                requested: ARENA_BYTES,
                mapped: mapping.mapped_bytes,
            });
        }

        // Descriptors carry 32-bit buffer addresses
        let end = mapping.device_address + ARENA_BYTES as u64;
        if end > u64::from(u32::MAX) + 1 {
            warn!(
                "[PCH_GBE] DMA mapping {:#x} beyond 32-bit reach",
                mapping.device_address
            );
            return Err(EthernetError::OutOfResources);
        }
        self.device_base = mapping.device_address as u32;
        self.mapped = true;

        debug!(
            "[PCH_GBE] DMA arena: {} pages, device {:#010x}",
            ARENA_PAGES, self.device_base
        );
        Ok(())
    }

    /// Unmap then free, each only if present. Safe to call repeatedly.
    pub fn free(&mut self, platform: &mut P) {
        self.mapped = false;
        if let Some(token) = self.mapping.take() {
            platform.unmap(token);
        }
        if let Some(buffer) = self.buffer.take() {
            platform.free_buffer(buffer);
        }
        self.cpu_base = 0;
        self.device_base = 0;
    }

    /// Typed access to the regions, while mapped.
    pub fn view(&mut self) -> Option<ArenaView<'_>> {
        if !self.mapped {
            return None;
        }
        Some(ArenaView {
            cpu_base: self.cpu_base,
            device_base: self.device_base,
            _arena: core::marker::PhantomData,
        })
    }
}

impl<P: Platform> Default for DmaArena<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowed view of a mapped arena.
pub struct ArenaView<'a> {
    cpu_base: usize,
    device_base: u32,
    _arena: core::marker::PhantomData<&'a mut ()>,
}

impl ArenaView<'_> {
    /// Device address of `offset` bytes into `region`.
    pub fn device_address(&self, region: Region, offset: usize) -> u32 {
        self.device_base + (region.offset() + offset) as u32
    }

    fn cpu_pointer(&self, region: Region, offset: usize) -> *mut u8 {
        debug_assert!(offset < region.bytes());
        (self.cpu_base + region.offset() + offset) as *mut u8
    }

    pub fn rx_descriptor(&mut self, index: RxIndex) -> &mut RxDescriptor {
        let ptr = self.cpu_pointer(Region::RxDescriptors, index.get() * DESCRIPTOR_SIZE);
        // SAFETY: the arena is mapped for the view's lifetime, the offset is
        // inside the region, and the region start is page aligned.
        unsafe { &mut *(ptr as *mut RxDescriptor) }
    }

    pub fn tx_descriptor(&mut self, index: TxIndex) -> &mut TxDescriptor {
        let ptr = self.cpu_pointer(Region::TxDescriptors, index.get() * DESCRIPTOR_SIZE);
        // SAFETY: as for rx_descriptor
        unsafe { &mut *(ptr as *mut TxDescriptor) }
    }

    pub fn rx_descriptor_address(&self, index: RxIndex) -> u32 {
        self.device_address(Region::RxDescriptors, index.get() * DESCRIPTOR_SIZE)
    }

    pub fn tx_descriptor_address(&self, index: TxIndex) -> u32 {
        self.device_address(Region::TxDescriptors, index.get() * DESCRIPTOR_SIZE)
    }

    pub fn rx_buffer_address(&self, index: RxIndex) -> u32 {
        self.device_address(Region::RxBuffers, index.get() * BUFFER_SIZE)
    }

    pub fn tx_buffer_address(&self, index: TxIndex) -> u32 {
        self.device_address(Region::TxBuffers, index.get() * BUFFER_SIZE)
    }

    pub fn rx_buffer(&self, index: RxIndex) -> &[u8] {
        let ptr = self.cpu_pointer(Region::RxBuffers, index.get() * BUFFER_SIZE);
        // SAFETY: BUFFER_SIZE bytes from ptr lie inside the RX buffer region
        unsafe { core::slice::from_raw_parts(ptr, BUFFER_SIZE) }
    }

    pub fn rx_buffer_mut(&mut self, index: RxIndex) -> &mut [u8] {
        let ptr = self.cpu_pointer(Region::RxBuffers, index.get() * BUFFER_SIZE);
        // SAFETY: as for rx_buffer, and the view is borrowed mutably
        unsafe { core::slice::from_raw_parts_mut(ptr, BUFFER_SIZE) }
    }

    pub fn tx_buffer(&self, index: TxIndex) -> &[u8] {
        let ptr = self.cpu_pointer(Region::TxBuffers, index.get() * BUFFER_SIZE);
        // SAFETY: BUFFER_SIZE bytes from ptr lie inside the TX buffer region
        unsafe { core::slice::from_raw_parts(ptr, BUFFER_SIZE) }
    }

    pub fn tx_buffer_mut(&mut self, index: TxIndex) -> &mut [u8] {
        let ptr = self.cpu_pointer(Region::TxBuffers, index.get() * BUFFER_SIZE);
        // SAFETY: as for tx_buffer, and the view is borrowed mutably
        unsafe { core::slice::from_raw_parts_mut(ptr, BUFFER_SIZE) }
    }
}

// ============================================================================
// Ring State
// ============================================================================

/// Receive ring bookkeeping.
#[derive(Debug)]
pub struct ReceiveRing {
    /// Last descriptor handed back to the controller
    pub receive_index: RxIndex,
}

impl ReceiveRing {
    pub const fn new() -> Self {
        Self {
            receive_index: RxIndex::last(),
        }
    }

    /// Descriptor software reads next.
    pub const fn next_index(&self) -> RxIndex {
        self.receive_index.next()
    }
}

/// Transmit ring bookkeeping: a single-producer, single-consumer queue.
#[derive(Debug)]
pub struct TransmitRing {
    /// Next free slot
    pub transmit_index: TxIndex,
    /// Oldest slot not yet retired
    pub complete_index: TxIndex,
    owners: [Option<Vec<u8>>; TX_RING_DEPTH],
}

impl TransmitRing {
    pub const fn new() -> Self {
        Self {
            transmit_index: TxIndex::new(0),
            complete_index: TxIndex::new(0),
            owners: [const { None }; TX_RING_DEPTH],
        }
    }

    pub fn is_full(&self) -> bool {
        self.transmit_index.next() == self.complete_index
    }

    pub fn is_empty(&self) -> bool {
        self.transmit_index == self.complete_index
    }

    pub fn in_flight(&self) -> usize {
        self.complete_index.distance_to(self.transmit_index)
    }

    /// Descriptors still free; one always stays empty.
    pub fn free_slots(&self) -> usize {
        TX_RING_DEPTH - 1 - self.in_flight()
    }

    /// Park the caller's buffer in `index` until its descriptor retires.
    pub fn park(&mut self, index: TxIndex, frame: Vec<u8>) {
        self.owners[index.get()] = Some(frame);
    }

    pub fn take(&mut self, index: TxIndex) -> Option<Vec<u8>> {
        self.owners[index.get()].take()
    }

    /// Forget every in-flight frame. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.owners.iter_mut().filter_map(Option::take).count();
        self.transmit_index = TxIndex::new(0);
        self.complete_index = TxIndex::new(0);
        dropped
    }
}

// ============================================================================
// Ring Initialization
// ============================================================================

/// Value of a descriptor ring SIZE register: ring bytes minus one descriptor.
pub const fn ring_size_register(depth: usize) -> u32 {
    (depth * DESCRIPTOR_SIZE - DESCRIPTOR_SIZE) as u32
}

impl<R: RegisterAccess, P: Platform> EthernetContext<R, P> {
    /// Post every receive descriptor, clear the transmit ring and point the
    /// controller at both rings.
    ///
    /// Frames still queued for transmit are dropped and counted.
    pub(crate) fn init_rings(&mut self) {
        let dropped = self.tx_ring.clear();
        if dropped != 0 {
            warn!("[PCH_GBE] dropped {} in-flight transmit frames", dropped);
            self.statistics.tx_total_frames += dropped as u64;
            self.statistics.tx_dropped_frames += dropped as u64;
        }
        self.rx_ring = ReceiveRing::new();
        self.interrupt_status.remove(InterruptStatus::RECEIVE | InterruptStatus::TRANSMIT);

        let Some(mut view) = self.arena.view() else {
            return;
        };

        for i in 0..RX_RING_DEPTH {
            let index = RxIndex::new(i);
            let address = view.rx_buffer_address(index);
            view.rx_descriptor(index).post(address);
        }
        for i in 0..TX_RING_DEPTH {
            view.tx_descriptor(TxIndex::new(i)).clear();
        }
        fence(Ordering::SeqCst);

        let rx_base = view.rx_descriptor_address(RxIndex::new(0));
        self.registers.write32(RX_DSC_BASE, rx_base);
        self.registers.write32(RX_DSC_SIZE, ring_size_register(RX_RING_DEPTH));
        self.registers.write32(RX_DSC_HW_P, rx_base);
        self.registers.write32(
            RX_DSC_SW_P,
            view.rx_descriptor_address(self.rx_ring.receive_index),
        );

        let tx_base = view.tx_descriptor_address(TxIndex::new(0));
        self.registers.write32(TX_DSC_BASE, tx_base);
        self.registers.write32(TX_DSC_SIZE, ring_size_register(TX_RING_DEPTH));
        self.registers.write32(TX_DSC_HW_P, tx_base);
        self.registers.write32(TX_DSC_SW_P, tx_base);
    }

    /// Index of the receive descriptor the controller fills next.
    pub(crate) fn receive_hard_index(&mut self) -> RxIndex {
        let base = self.registers.read32(RX_DSC_BASE);
        let hard = self.registers.read32(RX_DSC_HW_P);
        let slot = (hard.wrapping_sub(base) as usize) / DESCRIPTOR_SIZE;
        debug_assert!(slot < RX_RING_DEPTH, "RX hard pointer outside ring");
        RxIndex::new(slot)
    }
}
