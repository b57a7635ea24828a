//! Driver configuration
//!
//! Timing defaults reproduce the controller's hardware-compatible behavior:
//! MIIM and address-mask handshakes poll 20 times with a short stall, and the
//! link state machine counts in ticks of the ~1 ms periodic timer.

use crate::drivers::poll::BoundedPoll;
use crate::net::ethernet::{Duplex, LinkSpeed};

/// Attempts made by every MIIM busy-wait before giving up.
pub const MDIO_POLL_ATTEMPTS: u32 = 20;

/// Stall between MIIM busy-wait attempts, in microseconds.
pub const MDIO_POLL_DELAY_US: u32 = 10;

/// Attempts made while waiting for the address-mask BUSY bit to clear.
pub const ADDRESS_MASK_POLL_ATTEMPTS: u32 = 20;

/// Stall between address-mask busy-wait attempts, in microseconds.
pub const ADDRESS_MASK_POLL_DELAY_US: u32 = 10;

/// Period of the link maintenance timer, in microseconds.
pub const TIMER_PERIOD_US: u32 = 1_000;

/// Ticks the MAC and PHY are held after a reset is issued.
pub const RESET_DWELL_TICKS: u32 = 10;

/// Ticks allowed for the PHY to recover from reset before it is scanned.
pub const RESET_RECOVERY_TICKS: u32 = 40;

/// Ticks allowed for the PHY to report link after being configured.
pub const LINK_ESTABLISH_TICKS: u32 = 5_000;

/// Ticks allowed for autonegotiation to settle once link was seen.
pub const NEGOTIATE_TICKS: u32 = 5_000;

/// Tunables for one controller instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// MIIM (PHY management) busy-wait
    pub mdio_poll: BoundedPoll,
    /// MAC address slot busy-wait
    pub address_mask_poll: BoundedPoll,
    /// Period requested from the host for the maintenance timer
    pub timer_period_us: u32,
    pub reset_dwell_ticks: u32,
    pub reset_recovery_ticks: u32,
    pub link_establish_ticks: u32,
    pub negotiate_ticks: u32,
    /// Highest speed advertised to the link partner
    pub advertised_speed: LinkSpeed,
    /// Duplex advertised to the link partner
    pub advertised_duplex: Duplex,
    /// Apply board-specific PHY fixups once the PHY is identified
    pub phy_fixups: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            mdio_poll: BoundedPoll::new(MDIO_POLL_ATTEMPTS, MDIO_POLL_DELAY_US),
            address_mask_poll: BoundedPoll::new(
                ADDRESS_MASK_POLL_ATTEMPTS,
                ADDRESS_MASK_POLL_DELAY_US,
            ),
            timer_period_us: TIMER_PERIOD_US,
            reset_dwell_ticks: RESET_DWELL_TICKS,
            reset_recovery_ticks: RESET_RECOVERY_TICKS,
            link_establish_ticks: LINK_ESTABLISH_TICKS,
            negotiate_ticks: NEGOTIATE_TICKS,
            advertised_speed: LinkSpeed::Speed1000,
            advertised_duplex: Duplex::Full,
            phy_fixups: true,
        }
    }
}

impl DriverConfig {
    /// Worst-case ticks for one Down → ... → Down cycle with a silent PHY.
    ///
    /// Includes the `Down` tick itself, since the reset broadcast runs on
    /// the tick after a timeout routes back to `Down`.
    pub fn link_cycle_ticks(&self) -> u32 {
        1 + self.reset_dwell_ticks + self.reset_recovery_ticks + self.link_establish_ticks
    }
}
