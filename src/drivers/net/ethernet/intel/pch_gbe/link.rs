//! Link state machine
//!
//! Advanced once per maintenance tick. Every wait has a countdown in
//! `link_timer`; when it runs out without success the machine goes back to
//! `Down` and starts over from a full reset. Nothing is retried in place.
//!
//! ```text
//! Unknown -> Down -> Resetting -> Reset -> PhyReset -> ConfigurePhy -> AutoNegotiating -> Up
//!              ^                    |          |                             |              |
//!              +--------------------+----------+-----------------------------+--------------+
//! ```

use core::fmt;

use log::{debug, info, warn};

use crate::drivers::mmio::RegisterAccess;
use crate::platform::Platform;

use super::fixup::apply_phy_fixups;
use super::mac::{mac_configure, mac_reset};
use super::phy::{phy_configure, phy_decode, PhyBus};
use super::regs::*;
use super::EthernetContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Not yet ticked since initialize
    #[default]
    Unknown,
    /// Idle; a full reset is issued on the next tick
    Down,
    /// MAC and PHY held in reset
    Resetting,
    /// PHY recovering from reset
    Reset,
    /// Advertisement programmed, waiting for link
    PhyReset,
    ConfigurePhy,
    /// MAC configured, waiting for the link to settle
    AutoNegotiating,
    Up,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Unknown => "unknown",
            LinkState::Down => "down",
            LinkState::Resetting => "resetting",
            LinkState::Reset => "reset",
            LinkState::PhyReset => "phy-reset",
            LinkState::ConfigurePhy => "configure-phy",
            LinkState::AutoNegotiating => "autonegotiating",
            LinkState::Up => "up",
        };
        f.write_str(name)
    }
}

impl<R: RegisterAccess, P: Platform> EthernetContext<R, P> {
    fn phy_bus(&mut self) -> PhyBus<'_, R, P> {
        PhyBus::new(&mut self.registers, &self.platform, self.config.mdio_poll)
    }

    fn enter(&mut self, state: LinkState) {
        debug!("[PCH_GBE] link {} -> {}", self.link_state, state);
        self.link_state = state;
    }

    fn phy_link_up(&mut self) -> bool {
        match self.phy_address {
            Some(address) => self.phy_bus().link_up(address),
            None => false,
        }
    }

    /// Stop receiving: MAC receiver off, receive DMA off.
    pub(crate) fn disable_receiver(&mut self) {
        self.registers.and32(MAC_RX_EN, !MAC_RX_ENABLE);
        self.registers.and32(DMA_CTRL, !DMA_CTRL_RX_EN);
    }

    /// Advance the link state machine by one tick.
    pub(crate) fn link_tick(&mut self) {
        if self.link_timer != 0 {
            self.link_timer -= 1;
        }

        // First tick after initialize behaves exactly like Down
        if self.link_state == LinkState::Unknown {
            self.enter(LinkState::Down);
        }

        match self.link_state {
            LinkState::Unknown | LinkState::Down => {
                self.phy_bus().reset_all();
                mac_reset(&mut self.registers);
                self.link_timer = self.config.reset_dwell_ticks;
                self.enter(LinkState::Resetting);
            }

            LinkState::Resetting => {
                if self.link_timer == 0 {
                    self.link_timer = self.config.reset_recovery_ticks;
                    self.enter(LinkState::Reset);
                }
            }

            LinkState::Reset => {
                if self.link_timer != 0 {
                    return;
                }
                let Some((address, identifier)) = self.phy_bus().find() else {
                    warn!("[PCH_GBE] no PHY found, restarting link");
                    self.phy_address = None;
                    self.enter(LinkState::Down);
                    return;
                };
                if self.phy_identifier != identifier || self.phy_address != Some(address) {
                    info!("[PCH_GBE] PHY {:#010x} at address {}", identifier, address);
                }
                self.phy_address = Some(address);
                self.phy_identifier = identifier;

                let control =
                    phy_configure(self.config.advertised_speed, self.config.advertised_duplex);
                self.phy_bus().apply(address, &control);

                self.init_rings();
                self.program_filters();
                self.registers.write32(TX_MODE, TX_MODE_DEFAULT);

                self.link_timer = self.config.link_establish_ticks;
                self.enter(LinkState::PhyReset);
            }

            LinkState::PhyReset => {
                if self.phy_link_up() {
                    self.enter(LinkState::ConfigurePhy);
                } else if self.link_timer == 0 {
                    warn!("[PCH_GBE] no link, restarting");
                    self.enter(LinkState::Down);
                }
            }

            LinkState::ConfigurePhy => {
                let Some(address) = self.phy_address else {
                    self.enter(LinkState::Down);
                    return;
                };
                self.phy_registers = self.phy_bus().snapshot(address);
                let status = phy_decode(&self.phy_registers);
                self.link_status = Some(status);

                let mode = self.registers.read32(MODE);
                let rgmii = self.registers.read32(RGMII_CTRL);
                let (mode, rgmii) = mac_configure(mode, rgmii, status.speed, status.duplex);
                self.registers.write32(MODE, mode);
                self.registers.write32(RGMII_CTRL, rgmii);

                if self.config.phy_fixups {
                    let identifier = self.phy_identifier;
                    apply_phy_fixups(&mut self.phy_bus(), address, identifier);
                }

                self.link_timer = self.config.negotiate_ticks;
                self.enter(LinkState::AutoNegotiating);
            }

            LinkState::AutoNegotiating => {
                if self.phy_link_up() {
                    self.registers.or32(DMA_CTRL, DMA_CTRL_RX_EN | DMA_CTRL_TX_EN);
                    self.registers.write32(MAC_RX_EN, MAC_RX_ENABLE);
                    if let Some(status) = self.link_status {
                        info!(
                            "[PCH_GBE] link up: {} Mb/s {} duplex",
                            status.speed.mbps(),
                            status.duplex
                        );
                    }
                    self.enter(LinkState::Up);
                } else if self.link_timer == 0 {
                    warn!("[PCH_GBE] autonegotiation timed out, restarting");
                    self.enter(LinkState::Down);
                }
            }

            LinkState::Up => {
                if self.phy_link_up() {
                    self.ethernet_interrupts();
                } else {
                    info!("[PCH_GBE] link down");
                    self.disable_receiver();
                    self.link_status = None;
                    self.enter(LinkState::Down);
                }
            }
        }
    }
}
