//! MAC configuration engine
//!
//! Speed and duplex reach the MAC through two registers: MODE selects the
//! GMII/MII datapath and duplex, RGMII_CTRL selects the RGMII clock.
//! The 16 unicast/multicast address slots sit behind the ADDR_MASK
//! handshake: a slot must be masked while it is rewritten, and the BUSY bit
//! must clear before and after.

use log::warn;

use crate::drivers::mmio::RegisterAccess;
use crate::drivers::poll::BoundedPoll;
use crate::net::ethernet::{Duplex, LinkSpeed, MacAddress};
use crate::platform::Platform;

use super::regs::*;

/// Compute MODE and RGMII_CTRL for a negotiated link.
///
/// Bits outside the speed/duplex fields are preserved.
pub fn mac_configure(
    mode: u32,
    rgmii_control: u32,
    speed: LinkSpeed,
    duplex: Duplex,
) -> (u32, u32) {
    let mut mode = mode & !(MODE_GMII_ETHER | MODE_FULL_DUPLEX);
    let mut rgmii = rgmii_control & !(RGMII_RATE_MASK | RGMII_CRS_SEL);

    match speed {
        LinkSpeed::Speed1000 => {
            mode |= MODE_GMII_ETHER;
            rgmii |= RGMII_RATE_125M;
        }
        LinkSpeed::Speed100 => {
            mode |= MODE_MII_ETHER;
            rgmii |= RGMII_RATE_25M;
        }
        LinkSpeed::Speed10 => {
            mode |= MODE_MII_ETHER;
            // The controller needs carrier sense disabled at 10 Mb
            rgmii |= RGMII_RATE_2_5M | RGMII_CRS_SEL;
        }
    }

    if duplex == Duplex::Full {
        mode |= MODE_FULL_DUPLEX;
    }
    rgmii |= RGMII_MODE_RGMII;

    (mode, rgmii)
}

/// Reset the whole MAC. The bit self-clears; callers dwell before touching
/// the MAC again.
pub fn mac_reset<R: RegisterAccess>(registers: &mut R) {
    registers.write32(RESET, RESET_ALL);
}

fn wait_address_mask<R: RegisterAccess, P: Platform>(
    registers: &mut R,
    platform: &P,
    poll: BoundedPoll,
) {
    if poll
        .until(platform, || registers.read32(ADDR_MASK), |v| v & ADDR_MASK_BUSY == 0)
        .is_err()
    {
        warn!("[PCH_GBE] ADDR_MASK busy timeout");
    }
}

/// Program `mac` into address slot `slot` and enable the slot.
pub fn write_address_slot<R: RegisterAccess, P: Platform>(
    registers: &mut R,
    platform: &P,
    poll: BoundedPoll,
    slot: usize,
    mac: &MacAddress,
) {
    debug_assert!(slot < MAC_ADR_SLOTS);
    let b = mac.as_bytes();
    let high = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
    let low = u32::from_le_bytes([b[4], b[5], 0, 0]);

    registers.or32(ADDR_MASK, 1 << slot);
    wait_address_mask(registers, platform, poll);

    registers.write32(mac_adr_high(slot), high);
    registers.write32(mac_adr_low(slot), low);

    registers.and32(ADDR_MASK, !(1 << slot));
    wait_address_mask(registers, platform, poll);
}

/// Mask address slot `slot` so it no longer matches.
pub fn disable_address_slot<R: RegisterAccess, P: Platform>(
    registers: &mut R,
    platform: &P,
    poll: BoundedPoll,
    slot: usize,
) {
    debug_assert!(slot < MAC_ADR_SLOTS);
    registers.or32(ADDR_MASK, 1 << slot);
    wait_address_mask(registers, platform, poll);
}

pub fn read_address_slot<R: RegisterAccess>(registers: &mut R, slot: usize) -> MacAddress {
    let high = registers.read32(mac_adr_high(slot)).to_le_bytes();
    let low = registers.read32(mac_adr_low(slot)).to_le_bytes();
    MacAddress::new([high[0], high[1], high[2], high[3], low[0], low[1]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::net::ethernet::intel::pch_gbe::sim::{SimPlatform, SimRegisters};

    #[test]
    fn test_configure_speed_tiers() {
        let (mode, rgmii) = mac_configure(0, 0, LinkSpeed::Speed1000, Duplex::Full);
        assert_eq!(mode, MODE_GMII_ETHER | MODE_FULL_DUPLEX);
        assert_eq!(rgmii, RGMII_RATE_125M | RGMII_MODE_RGMII);

        let (mode, rgmii) = mac_configure(0, 0, LinkSpeed::Speed100, Duplex::Half);
        assert_eq!(mode, MODE_MII_ETHER);
        assert_eq!(rgmii, RGMII_RATE_25M | RGMII_MODE_RGMII);

        let (mode, rgmii) = mac_configure(0, 0, LinkSpeed::Speed10, Duplex::Full);
        assert_eq!(mode, MODE_FULL_DUPLEX);
        assert_eq!(rgmii, RGMII_RATE_2_5M | RGMII_CRS_SEL | RGMII_MODE_RGMII);
    }

    #[test]
    fn test_configure_clears_previous_speed() {
        let (mode, rgmii) = mac_configure(0, 0, LinkSpeed::Speed10, Duplex::Full);
        let (mode, rgmii) =
            mac_configure(mode | MODE_FR_BST, rgmii, LinkSpeed::Speed1000, Duplex::Half);
        assert_eq!(mode, MODE_GMII_ETHER | MODE_FR_BST);
        assert_eq!(rgmii & RGMII_CRS_SEL, 0);
        assert_eq!(rgmii & RGMII_RATE_MASK, RGMII_RATE_125M);
    }

    #[test]
    fn test_address_slot_round_trip() {
        let mut registers = SimRegisters::new();
        let platform = SimPlatform::new();
        let mac = MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);

        write_address_slot(&mut registers, &platform, BoundedPoll::new(20, 10), 3, &mac);
        assert_eq!(read_address_slot(&mut registers, 3), mac);
        assert_eq!(registers.reg(mac_adr_high(3)), 0x3322_1100);
        assert_eq!(registers.reg(mac_adr_low(3)), 0x0000_5544);
        assert!(registers.slot_enabled(3));

        disable_address_slot(&mut registers, &platform, BoundedPoll::new(20, 10), 3);
        assert!(!registers.slot_enabled(3));
    }

    #[test]
    fn test_mac_reset() {
        let mut registers = SimRegisters::new();
        mac_reset(&mut registers);
        assert_eq!(registers.mac_resets(), 1);
        assert_eq!(registers.reg(RESET), 0);
    }
}
