//! Bounded busy-wait
//!
//! Hardware handshakes (MIIM operation complete, MAC address slot busy) are
//! polled a fixed number of times with a short stall in between. They never
//! block indefinitely, so shutdown is never held up by a wedged PHY.

use crate::platform::Platform;

/// A bounded retry-with-delay policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedPoll {
    attempts: u32,
    delay_us: u32,
}

impl BoundedPoll {
    pub const fn new(attempts: u32, delay_us: u32) -> Self {
        Self { attempts, delay_us }
    }

    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    pub const fn delay_us(&self) -> u32 {
        self.delay_us
    }

    /// Call `read` until `done` accepts its value.
    ///
    /// Returns `Ok(value)` with the accepted value, or `Err(last)` with the
    /// last value read once the attempts are exhausted. The stall happens
    /// only between attempts.
    pub fn until<P, F, D>(&self, platform: &P, mut read: F, done: D) -> Result<u32, u32>
    where
        P: Platform + ?Sized,
        F: FnMut() -> u32,
        D: Fn(u32) -> bool,
    {
        let mut value = 0;
        for attempt in 0..self.attempts {
            if attempt != 0 {
                platform.stall(self.delay_us);
            }
            value = read();
            if done(value) {
                return Ok(value);
            }
        }
        Err(value)
    }
}
