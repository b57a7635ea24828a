//! PHY transaction engine
//!
//! The PHY is reached through the MAC's MIIM register: one 32-bit write
//! carries the opcode, PHY address, register number and (for writes) data,
//! and the READY bit reports completion. Standard IEEE 802.3 clause 22
//! registers only; vendor registers are handled in `fixup`.

use log::{debug, warn};

use crate::drivers::mmio::RegisterAccess;
use crate::drivers::poll::BoundedPoll;
use crate::net::ethernet::{Duplex, LinkSpeed};
use crate::platform::Platform;

use super::regs::*;

// ============================================================================
// MII Register Numbers
// ============================================================================

pub const MII_BMCR: u8 = 0x00;
pub const MII_BMSR: u8 = 0x01;
pub const MII_PHYSID1: u8 = 0x02;
pub const MII_PHYSID2: u8 = 0x03;
pub const MII_ADVERTISE: u8 = 0x04;
pub const MII_LPA: u8 = 0x05;
pub const MII_CTRL1000: u8 = 0x09;
pub const MII_STAT1000: u8 = 0x0A;

/// Highest PHY address on the management bus
pub const PHY_MAX_ADDRESS: u8 = 31;

// BMCR bits
pub const BMCR_RESET: u16 = 0x8000;
pub const BMCR_SPEED100: u16 = 0x2000;
pub const BMCR_ANENABLE: u16 = 0x1000;
pub const BMCR_ANRESTART: u16 = 0x0200;
pub const BMCR_FULLDPLX: u16 = 0x0100;
pub const BMCR_SPEED1000: u16 = 0x0040;

// BMSR bits
pub const BMSR_LSTATUS: u16 = 0x0004;
pub const BMSR_ANEGCOMPLETE: u16 = 0x0020;

// ADVERTISE / LPA bits (same layout in both registers)
pub const ADVERTISE_CSMA: u16 = 0x0001;
pub const ADVERTISE_10HALF: u16 = 0x0020;
pub const ADVERTISE_10FULL: u16 = 0x0040;
pub const ADVERTISE_100HALF: u16 = 0x0080;
pub const ADVERTISE_100FULL: u16 = 0x0100;
pub const ADVERTISE_PAUSE: u16 = 0x0400;

// CTRL1000 bits
pub const ADVERTISE_1000HALF: u16 = 0x0100;
pub const ADVERTISE_1000FULL: u16 = 0x0200;
/// Multiport device: prefer master during master/slave resolution
pub const CTRL1000_PREFER_MASTER: u16 = 0x0400;
pub const CTRL1000_AS_MASTER: u16 = 0x0800;
pub const CTRL1000_ENABLE_MASTER: u16 = 0x1000;

// STAT1000 bits: partner abilities sit two bits above CTRL1000's
pub const LPA_1000HALF: u16 = 0x0400;
pub const LPA_1000FULL: u16 = 0x0800;
pub const STAT1000_PARTNER_SHIFT: u32 = 2;

// ============================================================================
// Pure encode/decode
// ============================================================================

/// Control register values that request a given advertisement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhyControl {
    pub control: u16,
    pub advertisement: u16,
    pub gigabit_control: u16,
}

/// Cached PHY register snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhyRegisters {
    pub control: u16,
    pub status: u16,
    pub advertisement: u16,
    pub partner: u16,
    pub gigabit_control: u16,
    pub gigabit_status: u16,
}

/// Link parameters decoded from a register snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStatus {
    pub link_up: bool,
    pub speed: LinkSpeed,
    pub duplex: Duplex,
}

/// Build the autonegotiation advertisement for `speed`/`duplex`.
///
/// Every tier up to `speed` is advertised. Full duplex advertises both half
/// and full abilities of each tier, half duplex only the half abilities.
pub fn phy_configure(speed: LinkSpeed, duplex: Duplex) -> PhyControl {
    let full = duplex == Duplex::Full;

    let mut advertisement = ADVERTISE_CSMA | ADVERTISE_10HALF;
    if full {
        advertisement |= ADVERTISE_10FULL;
    }
    if speed >= LinkSpeed::Speed100 {
        advertisement |= ADVERTISE_100HALF;
        if full {
            advertisement |= ADVERTISE_100FULL;
        }
    }

    let mut gigabit_control = 0;
    if speed == LinkSpeed::Speed1000 {
        gigabit_control = CTRL1000_PREFER_MASTER | ADVERTISE_1000HALF;
        if full {
            gigabit_control |= ADVERTISE_1000FULL;
        }
    }

    // Forced-mode bits mirror the request so the PHY lands on the same
    // parameters if autonegotiation is ever turned off.
    let mut control = BMCR_ANENABLE | BMCR_ANRESTART;
    match speed {
        LinkSpeed::Speed1000 => control |= BMCR_SPEED1000,
        LinkSpeed::Speed100 => control |= BMCR_SPEED100,
        LinkSpeed::Speed10 => {}
    }
    if full {
        control |= BMCR_FULLDPLX;
    }

    PhyControl {
        control,
        advertisement,
        gigabit_control,
    }
}

/// Decode the negotiated link from a register snapshot.
///
/// Resolution order is 1000 Mb (autonegotiation complete and a common
/// 1000BASE-T ability), then 100 Mb, then 10 Mb.
pub fn phy_decode(registers: &PhyRegisters) -> LinkStatus {
    let link_up = registers.status & BMSR_LSTATUS != 0;

    if registers.control & BMCR_ANENABLE == 0 {
        let speed = if registers.control & BMCR_SPEED1000 != 0 {
            LinkSpeed::Speed1000
        } else if registers.control & BMCR_SPEED100 != 0 {
            LinkSpeed::Speed100
        } else {
            LinkSpeed::Speed10
        };
        let duplex = if registers.control & BMCR_FULLDPLX != 0 {
            Duplex::Full
        } else {
            Duplex::Half
        };
        return LinkStatus {
            link_up,
            speed,
            duplex,
        };
    }

    let gigabit = (registers.gigabit_control << STAT1000_PARTNER_SHIFT) & registers.gigabit_status;
    let common = registers.advertisement & registers.partner;

    let (speed, duplex) = if registers.status & BMSR_ANEGCOMPLETE != 0
        && gigabit & (LPA_1000FULL | LPA_1000HALF) != 0
    {
        (LinkSpeed::Speed1000, full_if(gigabit & LPA_1000FULL))
    } else if common & (ADVERTISE_100FULL | ADVERTISE_100HALF) != 0 {
        (LinkSpeed::Speed100, full_if(common & ADVERTISE_100FULL))
    } else {
        (LinkSpeed::Speed10, full_if(common & ADVERTISE_10FULL))
    };

    LinkStatus {
        link_up,
        speed,
        duplex,
    }
}

fn full_if(bits: u16) -> Duplex {
    if bits != 0 { Duplex::Full } else { Duplex::Half }
}

// ============================================================================
// MIIM transactions
// ============================================================================

/// Management bus access through the MAC's MIIM register.
pub struct PhyBus<'a, R: RegisterAccess, P: Platform> {
    registers: &'a mut R,
    platform: &'a P,
    poll: BoundedPoll,
}

impl<'a, R: RegisterAccess, P: Platform> PhyBus<'a, R, P> {
    pub fn new(registers: &'a mut R, platform: &'a P, poll: BoundedPoll) -> Self {
        Self {
            registers,
            platform,
            poll,
        }
    }

    fn command(address: u8, register: u8) -> u32 {
        ((u32::from(address) & MIIM_PHY_ADDR_MASK) << MIIM_PHY_ADDR_SHIFT)
            | ((u32::from(register) & MIIM_REG_ADDR_MASK) << MIIM_REG_ADDR_SHIFT)
    }

    fn wait_ready(&mut self) -> Result<u32, u32> {
        let registers = &mut *self.registers;
        self.poll.until(
            self.platform,
            || registers.read32(MIIM),
            |value| value & MIIM_OPER_READY != 0,
        )
    }

    /// Read a PHY register.
    ///
    /// Best effort: if the controller never reports completion the low 16
    /// bits of the last MIIM value are returned anyway.
    pub fn read(&mut self, address: u8, register: u8) -> u16 {
        self.registers.write32(MIIM, Self::command(address, register) | MIIM_OPER_READ);

        let value = match self.wait_ready() {
            Ok(value) => value,
            Err(stale) => {
                warn!(
                    "[PCH_GBE] MIIM read timeout (phy {}, reg {:#04x})",
                    address, register
                );
                stale
            }
        };
        (value & MIIM_DATA_MASK) as u16
    }

    /// Write a PHY register once any previous operation has finished.
    pub fn write(&mut self, address: u8, register: u8, value: u16) {
        if self.wait_ready().is_err() {
            warn!(
                "[PCH_GBE] MIIM busy before write (phy {}, reg {:#04x})",
                address, register
            );
        }
        self.registers.write32(
            MIIM,
            Self::command(address, register) | MIIM_OPER_WRITE | u32::from(value),
        );
    }

    /// Reset every PHY on the bus; the address is not known yet.
    pub fn reset_all(&mut self) {
        for address in 0..=PHY_MAX_ADDRESS {
            self.write(address, MII_BMCR, BMCR_RESET);
        }
    }

    /// 32-bit identifier at `address`, or None when nothing answers.
    pub fn identifier(&mut self, address: u8) -> Option<u32> {
        let high = u32::from(self.read(address, MII_PHYSID1));
        let low = u32::from(self.read(address, MII_PHYSID2));
        match (high << 16) | low {
            0 | 0xFFFF_FFFF => None,
            id => Some(id),
        }
    }

    fn scan(&mut self) -> Option<(u8, u32)> {
        (0..=PHY_MAX_ADDRESS).find_map(|address| Some((address, self.identifier(address)?)))
    }

    /// Find the PHY. Two full scans must agree on address and identifier.
    pub fn find(&mut self) -> Option<(u8, u32)> {
        let first = self.scan()?;
        let second = self.scan()?;
        if first != second {
            debug!(
                "[PCH_GBE] PHY scan disagreed: {:?} then {:?}",
                first, second
            );
            return None;
        }
        Some(first)
    }

    /// Program the advertisement and restart autonegotiation.
    pub fn apply(&mut self, address: u8, control: &PhyControl) {
        self.write(address, MII_ADVERTISE, control.advertisement);
        self.write(address, MII_CTRL1000, control.gigabit_control);
        self.write(address, MII_BMCR, control.control);
    }

    pub fn link_up(&mut self, address: u8) -> bool {
        self.read(address, MII_BMSR) & BMSR_LSTATUS != 0
    }

    pub fn snapshot(&mut self, address: u8) -> PhyRegisters {
        PhyRegisters {
            control: self.read(address, MII_BMCR),
            status: self.read(address, MII_BMSR),
            advertisement: self.read(address, MII_ADVERTISE),
            partner: self.read(address, MII_LPA),
            gigabit_control: self.read(address, MII_CTRL1000),
            gigabit_status: self.read(address, MII_STAT1000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::net::ethernet::intel::pch_gbe::sim::{SimPlatform, SimRegisters};

    const ALL_MODES: [(LinkSpeed, Duplex); 6] = [
        (LinkSpeed::Speed10, Duplex::Half),
        (LinkSpeed::Speed10, Duplex::Full),
        (LinkSpeed::Speed100, Duplex::Half),
        (LinkSpeed::Speed100, Duplex::Full),
        (LinkSpeed::Speed1000, Duplex::Half),
        (LinkSpeed::Speed1000, Duplex::Full),
    ];

    /// A link partner that advertises exactly what we advertise.
    fn mirror(control: PhyControl) -> PhyRegisters {
        PhyRegisters {
            control: control.control,
            status: BMSR_LSTATUS | BMSR_ANEGCOMPLETE,
            advertisement: control.advertisement,
            partner: control.advertisement,
            gigabit_control: control.gigabit_control,
            gigabit_status: control.gigabit_control << STAT1000_PARTNER_SHIFT,
        }
    }

    #[test]
    fn test_configure_decode_round_trip() {
        for (speed, duplex) in ALL_MODES {
            let status = phy_decode(&mirror(phy_configure(speed, duplex)));
            assert!(status.link_up);
            assert_eq!((status.speed, status.duplex), (speed, duplex));
        }
    }

    #[test]
    fn test_configure_bit_selection() {
        let c = phy_configure(LinkSpeed::Speed100, Duplex::Full);
        assert_eq!(
            c.advertisement,
            ADVERTISE_CSMA
                | ADVERTISE_10HALF
                | ADVERTISE_10FULL
                | ADVERTISE_100HALF
                | ADVERTISE_100FULL
        );
        assert_eq!(c.gigabit_control, 0);
        assert_eq!(c.control, BMCR_ANENABLE | BMCR_ANRESTART | BMCR_SPEED100 | BMCR_FULLDPLX);

        let c = phy_configure(LinkSpeed::Speed1000, Duplex::Half);
        assert_eq!(c.advertisement, ADVERTISE_CSMA | ADVERTISE_10HALF | ADVERTISE_100HALF);
        assert_eq!(c.gigabit_control, CTRL1000_PREFER_MASTER | ADVERTISE_1000HALF);
        assert_eq!(c.control & BMCR_FULLDPLX, 0);
    }

    #[test]
    fn test_decode_gigabit_requires_autoneg_complete() {
        let mut regs = mirror(phy_configure(LinkSpeed::Speed1000, Duplex::Full));
        regs.status &= !BMSR_ANEGCOMPLETE;
        let status = phy_decode(&regs);
        assert_eq!(status.speed, LinkSpeed::Speed100);
        assert_eq!(status.duplex, Duplex::Full);
    }

    #[test]
    fn test_decode_falls_back_to_10() {
        let regs = PhyRegisters {
            control: BMCR_ANENABLE,
            status: BMSR_LSTATUS | BMSR_ANEGCOMPLETE,
            advertisement: ADVERTISE_10HALF | ADVERTISE_100FULL,
            partner: ADVERTISE_10HALF,
            ..Default::default()
        };
        let status = phy_decode(&regs);
        assert_eq!((status.speed, status.duplex), (LinkSpeed::Speed10, Duplex::Half));
    }

    #[test]
    fn test_decode_forced_mode() {
        let regs = PhyRegisters {
            control: BMCR_SPEED100 | BMCR_FULLDPLX,
            ..Default::default()
        };
        let status = phy_decode(&regs);
        assert!(!status.link_up);
        assert_eq!((status.speed, status.duplex), (LinkSpeed::Speed100, Duplex::Full));
    }

    #[test]
    fn test_read_write_through_miim() {
        let mut registers = SimRegisters::new();
        let platform = SimPlatform::new();
        registers.attach_phy(7, 0x004D_D074);

        let mut bus = PhyBus::new(&mut registers, &platform, BoundedPoll::new(20, 10));
        bus.write(7, MII_ADVERTISE, 0x01E1);
        assert_eq!(bus.read(7, MII_ADVERTISE), 0x01E1);
        assert_eq!(bus.identifier(7), Some(0x004D_D074));
        assert_eq!(bus.identifier(3), None);
        assert_eq!(platform.stalled_us(), 0);
    }

    #[test]
    fn test_read_timeout_returns_stale_value() {
        let mut registers = SimRegisters::new();
        let platform = SimPlatform::new();
        registers.attach_phy(1, 0x004D_D074);
        registers.set_miim_stuck(true);

        let mut bus = PhyBus::new(&mut registers, &platform, BoundedPoll::new(20, 10));
        let value = bus.read(1, MII_PHYSID1);
        // The stuck MIIM never completes, so the command word comes back.
        assert_eq!(value, 0);
        assert_eq!(platform.stalled_us(), 19 * 10);
    }

    #[test]
    fn test_find_scans_twice() {
        let mut registers = SimRegisters::new();
        let platform = SimPlatform::new();
        registers.attach_phy(5, 0x004D_D074);

        let mut bus = PhyBus::new(&mut registers, &platform, BoundedPoll::new(20, 10));
        assert_eq!(bus.find(), Some((5, 0x004D_D074)));
        // Two scans over addresses 0..=5, two identifier reads each
        assert_eq!(registers.miim_reads(), 2 * 6 * 2);
    }

    #[test]
    fn test_find_without_phy() {
        let mut registers = SimRegisters::new();
        let platform = SimPlatform::new();
        let mut bus = PhyBus::new(&mut registers, &platform, BoundedPoll::new(20, 10));
        assert_eq!(bus.find(), None);
    }

    #[test]
    fn test_reset_all_hits_every_address() {
        let mut registers = SimRegisters::new();
        let platform = SimPlatform::new();
        registers.attach_phy(9, 0x004D_D074);

        let mut bus = PhyBus::new(&mut registers, &platform, BoundedPoll::new(20, 10));
        bus.reset_all();
        assert_eq!(registers.miim_writes(), 32);
        assert_eq!(registers.phy_resets(), 1);
    }
}
