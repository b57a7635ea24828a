//! Board PHY fixups
//!
//! The MinnowBoard routes RGMII to an Atheros AR8031 without PCB clock skew,
//! so the PHY must add the transmit clock delay itself. AR8031 debug
//! registers are reached indirectly: write the index to 0x1D, then access
//! the value through 0x1E.

use log::debug;

use crate::drivers::mmio::RegisterAccess;
use crate::platform::Platform;

use super::phy::PhyBus;

/// Identifier of the AR8031 family, revision nibble masked off
pub const AR8031_PHY_ID: u32 = 0x004D_D070;
pub const PHY_ID_REVISION_MASK: u32 = 0xFFFF_FFF0;

/// Debug port index register
pub const AR8031_DEBUG_ADDRESS: u8 = 0x1D;
/// Debug port data register
pub const AR8031_DEBUG_DATA: u8 = 0x1E;

/// SerDes test and system mode control
pub const AR8031_DEBUG_SYSTEM_MODE: u16 = 0x05;
/// RGMII transmit clock delay enable
pub const AR8031_TX_CLOCK_DELAY: u16 = 0x0100;

/// Apply the fixups for the PHY with `identifier` at `address`.
///
/// Returns true when a fixup was applied.
pub fn apply_phy_fixups<R: RegisterAccess, P: Platform>(
    bus: &mut PhyBus<'_, R, P>,
    address: u8,
    identifier: u32,
) -> bool {
    match identifier & PHY_ID_REVISION_MASK {
        AR8031_PHY_ID => {
            bus.write(address, AR8031_DEBUG_ADDRESS, AR8031_DEBUG_SYSTEM_MODE);
            let value = bus.read(address, AR8031_DEBUG_DATA);
            bus.write(address, AR8031_DEBUG_DATA, value | AR8031_TX_CLOCK_DELAY);
            debug!("[PCH_GBE] AR8031: RGMII TX clock delay enabled");
            true
        }
        _ => false,
    }
}
