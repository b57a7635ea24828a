//! PCH GbE register map
//!
//! Offsets are bytes from the start of the register BAR.
//! Source: Intel Platform Controller Hub EG20T datasheet, GbE chapter;
//! Linux: drivers/net/ethernet/oki-semi/pch_gbe/pch_gbe.h

#![allow(dead_code)] // Complete register map; not every bit is driven

// ============================================================================
// Interrupt and Mode Registers
// ============================================================================

/// Interrupt status (read clears)
pub const INT_ST: usize = 0x00;
pub const INT_EN: usize = 0x04;
pub const MODE: usize = 0x08;
pub const RESET: usize = 0x0C;
pub const TCPIP_ACC: usize = 0x10;
pub const EX_LIST: usize = 0x14;
pub const INT_ST_HOLD: usize = 0x18;
pub const PHY_INT_CTRL: usize = 0x1C;

// INT_ST / INT_EN bits
pub const INT_RX_DMA_CMPLT: u32 = 0x0000_0001;
pub const INT_RX_VALID: u32 = 0x0000_0002;
pub const INT_RX_FRAME_ERR: u32 = 0x0000_0004;
pub const INT_RX_FIFO_ERR: u32 = 0x0000_0008;
pub const INT_RX_DMA_ERR: u32 = 0x0000_0010;
pub const INT_RX_DSC_EMP: u32 = 0x0000_0020;
pub const INT_TX_CMPLT: u32 = 0x0000_0100;
pub const INT_TX_DMA_CMPLT: u32 = 0x0000_0200;
pub const INT_TX_FIFO_ERR: u32 = 0x0000_0400;
pub const INT_TX_DMA_ERR: u32 = 0x0000_0800;
pub const INT_PAUSE_CMPLT: u32 = 0x0000_1000;
pub const INT_MIIM_CMPLT: u32 = 0x0001_0000;
pub const INT_PHY_INT: u32 = 0x0010_0000;
pub const INT_WOL_DET: u32 = 0x0100_0000;
pub const INT_TCPIP_ERR: u32 = 0x1000_0000;

/// Status bits that mean "a receive descriptor was filled"
pub const INT_RECEIVE_MASK: u32 = INT_RX_DMA_CMPLT | INT_RX_VALID;
/// Status bits that mean "a transmit descriptor was retired"
pub const INT_TRANSMIT_MASK: u32 = INT_TX_CMPLT | INT_TX_DMA_CMPLT;

// MODE bits
pub const MODE_MII_ETHER: u32 = 0x0000_0000;
pub const MODE_GMII_ETHER: u32 = 0x8000_0000;
pub const MODE_HALF_DUPLEX: u32 = 0x0000_0000;
pub const MODE_FULL_DUPLEX: u32 = 0x4000_0000;
pub const MODE_FR_BST: u32 = 0x0400_0000;

// RESET bits (self clearing)
pub const RESET_ALL: u32 = 0x8000_0000;
pub const RESET_TX: u32 = 0x0000_8000;
pub const RESET_RX: u32 = 0x0000_4000;

// TCPIP_ACC bits
pub const TCPIP_EX_LIST_EN: u32 = 0x0000_0008;
pub const TCPIP_RX_ACC_OFF: u32 = 0x0000_0004;
pub const TCPIP_TX_ACC_EN: u32 = 0x0000_0002;
pub const TCPIP_RX_ACC_EN: u32 = 0x0000_0001;

// ============================================================================
// MAC Receive/Transmit Control
// ============================================================================

pub const MAC_RX_EN: usize = 0x20;
pub const RX_FCTRL: usize = 0x24;
pub const PAUSE_REQ: usize = 0x28;
pub const RX_MODE: usize = 0x2C;
pub const TX_MODE: usize = 0x30;
pub const RX_FIFO_ST: usize = 0x34;
pub const TX_FIFO_ST: usize = 0x38;
pub const TX_FID: usize = 0x3C;
pub const TX_RESULT: usize = 0x40;

// MAC_RX_EN bits
pub const MAC_RX_ENABLE: u32 = 0x0000_0001;

// RX_FCTRL bits
pub const RX_FLOW_CONTROL_EN: u32 = 0x8000_0000;

// RX_MODE bits
pub const RX_MODE_ADDRESS_FILTER_EN: u32 = 0x8000_0000;
pub const RX_MODE_MULTICAST_FILTER_EN: u32 = 0x4000_0000;
pub const RX_MODE_ALMOST_EMPTY_4: u32 = 0x0000_0000;
pub const RX_MODE_ALMOST_FULL_4: u32 = 0x0000_0000;
pub const RX_MODE_READ_TRIGGER_64: u32 = 0x0000_0008;

/// FIFO thresholds programmed together with the filter bits
pub const RX_MODE_FIFO_DEFAULT: u32 =
    RX_MODE_ALMOST_EMPTY_4 | RX_MODE_ALMOST_FULL_4 | RX_MODE_READ_TRIGGER_64;

// TX_MODE bits
pub const TX_MODE_LONG_PKT: u32 = 0x8000_0000;
pub const TX_MODE_STORE_AND_FORWARD: u32 = 0x4000_0000;
pub const TX_MODE_SHORT_PKT: u32 = 0x2000_0000;
pub const TX_MODE_LATE_COLLISION_RETX: u32 = 0x1000_0000;
pub const TX_MODE_START_THRESHOLD_16: u32 = 0x0000_0000;
pub const TX_MODE_ALMOST_EMPTY_4: u32 = 0x0000_0000;

pub const TX_MODE_DEFAULT: u32 = TX_MODE_LONG_PKT
    | TX_MODE_STORE_AND_FORWARD
    | TX_MODE_SHORT_PKT
    | TX_MODE_LATE_COLLISION_RETX
    | TX_MODE_START_THRESHOLD_16
    | TX_MODE_ALMOST_EMPTY_4;

// ============================================================================
// MAC Address Slots
// ============================================================================

/// First of 16 {high, low} address slot pairs
pub const MAC_ADR: usize = 0x60;
pub const MAC_ADR_SLOT_STRIDE: usize = 0x08;
pub const MAC_ADR_SLOTS: usize = 16;

/// Bit N set masks (disables) address slot N
pub const ADDR_MASK: usize = 0xE0;
pub const ADDR_MASK_BUSY: u32 = 0x8000_0000;
/// Mask value with every slot disabled
pub const ADDR_MASK_ALL_SLOTS: u32 = (1 << MAC_ADR_SLOTS) - 1;

pub const fn mac_adr_high(slot: usize) -> usize {
    MAC_ADR + slot * MAC_ADR_SLOT_STRIDE
}

pub const fn mac_adr_low(slot: usize) -> usize {
    MAC_ADR + slot * MAC_ADR_SLOT_STRIDE + 0x04
}

// ============================================================================
// MIIM (PHY Management) and RGMII
// ============================================================================

pub const MIIM: usize = 0xE4;
pub const MAC_ADDR_LOAD: usize = 0xE8;
pub const RGMII_ST: usize = 0xEC;
pub const RGMII_CTRL: usize = 0xF0;

// MIIM bits
/// Written: operation is a write. Read back: previous operation finished.
pub const MIIM_OPER_WRITE: u32 = 0x0400_0000;
pub const MIIM_OPER_READ: u32 = 0x0000_0000;
pub const MIIM_OPER_READY: u32 = 0x0400_0000;
pub const MIIM_PHY_ADDR_SHIFT: u32 = 21;
pub const MIIM_REG_ADDR_SHIFT: u32 = 16;
pub const MIIM_PHY_ADDR_MASK: u32 = 0x1F;
pub const MIIM_REG_ADDR_MASK: u32 = 0x1F;
pub const MIIM_DATA_MASK: u32 = 0x0000_FFFF;

// RGMII_CTRL bits
/// Carrier sense select; set for 10 Mb operation
pub const RGMII_CRS_SEL: u32 = 0x0000_0010;
pub const RGMII_RATE_125M: u32 = 0x0000_0000;
pub const RGMII_RATE_25M: u32 = 0x0000_0008;
pub const RGMII_RATE_2_5M: u32 = 0x0000_000C;
pub const RGMII_RATE_MASK: u32 = 0x0000_000C;
pub const RGMII_MODE_GMII: u32 = 0x0000_0000;
pub const RGMII_MODE_RGMII: u32 = 0x0000_0002;
pub const RGMII_CHIP_TYPE_EXTERNAL: u32 = 0x0000_0000;
pub const RGMII_CHIP_TYPE_INTERNAL: u32 = 0x0000_0001;

// ============================================================================
// DMA Registers
// ============================================================================

pub const DMA_CTRL: usize = 0x100;
pub const DMA_CTRL_TX_EN: u32 = 0x0000_0001;
pub const DMA_CTRL_RX_EN: u32 = 0x0000_0002;

pub const RX_DSC_BASE: usize = 0x110;
pub const RX_DSC_SIZE: usize = 0x114;
/// Hard pointer: next receive descriptor the controller will fill
pub const RX_DSC_HW_P: usize = 0x118;
pub const RX_DSC_HW_P_HLD: usize = 0x11C;
/// Soft pointer: last receive descriptor posted by software
pub const RX_DSC_SW_P: usize = 0x120;

pub const TX_DSC_BASE: usize = 0x130;
pub const TX_DSC_SIZE: usize = 0x134;
/// Hard pointer: next transmit descriptor the controller will send
pub const TX_DSC_HW_P: usize = 0x138;
pub const TX_DSC_HW_P_HLD: usize = 0x13C;
/// Soft pointer: one past the last transmit descriptor posted by software
pub const TX_DSC_SW_P: usize = 0x140;

pub const RX_DMA_ST: usize = 0x150;
pub const TX_DMA_ST: usize = 0x154;

// ============================================================================
// Wake-on-LAN and Soft Reset
// ============================================================================

pub const WOL_ST: usize = 0x160;
pub const WOL_CTRL: usize = 0x164;
pub const WOL_ADDR_MASK: usize = 0x168;

pub const SRST: usize = 0x1FC;
pub const SRST_ASSERT: u32 = 0x0000_0001;
pub const SRST_RELEASE: u32 = 0x0000_0000;

/// Size of the register BAR
pub const REGISTER_SPACE: usize = 0x200;
