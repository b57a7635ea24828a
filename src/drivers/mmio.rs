//! Register access layer
//!
//! The controller's registers live in a PCI memory BAR. Drivers only see the
//! [`RegisterAccess`] trait, so the same driver code runs against the real
//! BAR ([`MmioRegisters`]) and against a simulated register file in tests.

use volatile::Volatile;

/// 32-bit register access by byte offset from the start of the BAR.
pub trait RegisterAccess {
    fn read32(&mut self, offset: usize) -> u32;

    fn write32(&mut self, offset: usize, value: u32);

    /// Read-modify-write: set `bits`. Returns the value written.
    fn or32(&mut self, offset: usize, bits: u32) -> u32 {
        let value = self.read32(offset) | bits;
        self.write32(offset, value);
        value
    }

    /// Read-modify-write: keep only `mask`. Returns the value written.
    fn and32(&mut self, offset: usize, mask: u32) -> u32 {
        let value = self.read32(offset) & mask;
        self.write32(offset, value);
        value
    }
}

/// Memory-mapped registers at a fixed virtual address.
pub struct MmioRegisters {
    base: usize,
    size: usize,
}

impl MmioRegisters {
    /// Wrap a mapped BAR.
    ///
    /// # Safety
    /// `base..base + size` must be a mapping of the device's register BAR,
    /// 4-byte aligned, and must stay mapped for the lifetime of the value.
    pub const unsafe fn new(base: usize, size: usize) -> Self {
        Self { base, size }
    }

    #[inline]
    fn register(&mut self, offset: usize) -> &mut Volatile<u32> {
        assert!(
            offset % 4 == 0 && offset + 4 <= self.size,
            "register offset {:#x} outside BAR",
            offset
        );
        // SAFETY: `new` guarantees the BAR is mapped and aligned, and the
        // assertion keeps the access inside it. Volatile<u32> is a
        // transparent wrapper, so the cast preserves layout.
        unsafe { &mut *((self.base + offset) as *mut Volatile<u32>) }
    }
}

impl RegisterAccess for MmioRegisters {
    #[inline]
    fn read32(&mut self, offset: usize) -> u32 {
        self.register(offset).read()
    }

    #[inline]
    fn write32(&mut self, offset: usize, value: u32) {
        self.register(offset).write(value)
    }
}
