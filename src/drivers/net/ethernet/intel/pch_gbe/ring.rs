//! Power-of-two ring index arithmetic
//!
//! Ring positions wrap with a mask instead of a modulo. The depth is a const
//! generic so a ring that is not a power of two fails to build:
//!
//! ```compile_fail
//! use minnowboard_gbe::drivers::net::ethernet::intel::pch_gbe::RingIndex;
//!
//! let _ = RingIndex::<12>::new(0);
//! ```

/// Position inside a ring of `N` descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RingIndex<const N: usize>(usize);

impl<const N: usize> RingIndex<N> {
    /// `N - 1`; evaluating it rejects a depth that is not a power of two.
    pub const MASK: usize = {
        assert!(N.is_power_of_two(), "ring depth must be a power of two");
        N - 1
    };

    pub const DEPTH: usize = N;

    pub const fn new(index: usize) -> Self {
        Self(index & Self::MASK)
    }

    /// The last slot of the ring.
    pub const fn last() -> Self {
        Self(Self::MASK)
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn next(self) -> Self {
        Self((self.0 + 1) & Self::MASK)
    }

    /// Slots from `self` forward to `other`.
    #[inline]
    pub const fn distance_to(self, other: Self) -> usize {
        other.0.wrapping_sub(self.0) & Self::MASK
    }
}
