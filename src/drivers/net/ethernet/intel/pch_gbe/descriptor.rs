//! Hardware DMA descriptor layouts
//!
//! Both descriptor kinds are 16 bytes and live in the DMA arena, where the
//! controller reads and writes them behind the CPU's back. Every field is
//! therefore wrapped in `Volatile`.

#![allow(dead_code)] // Status bit catalogue

use volatile::Volatile;

/// Size of one descriptor in bytes, both directions.
pub const DESCRIPTOR_SIZE: usize = 16;

/// GMAC status written into a receive descriptor when it is posted
pub const DSC_INIT16: u16 = 0xC000;

// Receive descriptor GMAC status bits
pub const RX_GMAC_PAUSE: u16 = 0x0200;
/// Destination matched the broadcast address
pub const RX_GMAC_MARBR: u16 = 0x0100;
/// Destination matched a multicast address
pub const RX_GMAC_MARMLT: u16 = 0x0080;
/// Destination matched an individual address slot
pub const RX_GMAC_MARIND: u16 = 0x0040;
pub const RX_GMAC_MARNOTMT: u16 = 0x0020;
pub const RX_GMAC_TLONG: u16 = 0x0010;
pub const RX_GMAC_TSHRT: u16 = 0x0008;
pub const RX_GMAC_NOTOCTAL: u16 = 0x0004;
pub const RX_GMAC_NBLERR: u16 = 0x0002;
pub const RX_GMAC_CRCERR: u16 = 0x0001;

/// Either bit means the frame did not end on an octet boundary
pub const RX_GMAC_ALIGNMENT_ERROR: u16 = RX_GMAC_NBLERR | RX_GMAC_NOTOCTAL;

// Transmit descriptor frame control bits
pub const TX_FRAME_TCPIP_ACC_OFF: u16 = 0x0008;
pub const TX_FRAME_ITAG: u16 = 0x0004;
pub const TX_FRAME_ICRC: u16 = 0x0002;
/// Controller pads the frame to the 60 byte minimum
pub const TX_FRAME_APAD: u16 = 0x0001;

// Transmit descriptor GMAC status bits
pub const TX_GMAC_CMPLT: u16 = 0x2000;
pub const TX_GMAC_ABT: u16 = 0x1000;
pub const TX_GMAC_EXCOL: u16 = 0x0800;
pub const TX_GMAC_SNGCOL: u16 = 0x0400;
pub const TX_GMAC_MLTCOL: u16 = 0x0200;
pub const TX_GMAC_CRSER: u16 = 0x0100;
pub const TX_GMAC_TLNG: u16 = 0x0080;
pub const TX_GMAC_TSHRT: u16 = 0x0040;
pub const TX_GMAC_LTCOL: u16 = 0x0020;
pub const TX_GMAC_UNDRFLW: u16 = 0x0010;
pub const TX_GMAC_RTYCNT_MASK: u16 = 0x000F;

/// Receive descriptor
///
/// Layout:
/// - 0x00: buffer device address
/// - 0x04: TCP/IP accelerator status
/// - 0x08: received length including FCS
/// - 0x0A: GMAC status
/// - 0x0C: DMA status
#[repr(C)]
pub struct RxDescriptor {
    pub buffer_address: Volatile<u32>,
    pub accelerator_status: Volatile<u32>,
    pub length: Volatile<u16>,
    pub gmac_status: Volatile<u16>,
    pub dma_status: Volatile<u8>,
    reserved1: Volatile<u8>,
    reserved2: Volatile<u16>,
}

impl RxDescriptor {
    /// Hand the descriptor (back) to the controller.
    pub fn post(&mut self, buffer_address: u32) {
        self.buffer_address.write(buffer_address);
        self.accelerator_status.write(0);
        self.length.write(0);
        self.dma_status.write(0);
        self.gmac_status.write(DSC_INIT16);
    }
}

/// Transmit descriptor
///
/// Layout:
/// - 0x00: buffer device address
/// - 0x04: frame length
/// - 0x08: length in words plus end-of-buffer marker
/// - 0x0A: frame control
/// - 0x0C: DMA status
/// - 0x0E: GMAC status written back on completion
#[repr(C)]
pub struct TxDescriptor {
    pub buffer_address: Volatile<u32>,
    pub length: Volatile<u16>,
    reserved1: Volatile<u16>,
    pub words_eob: Volatile<u16>,
    pub frame_control: Volatile<u16>,
    pub dma_status: Volatile<u8>,
    reserved2: Volatile<u8>,
    pub gmac_status: Volatile<u16>,
}

impl TxDescriptor {
    pub fn clear(&mut self) {
        self.buffer_address.write(0);
        self.length.write(0);
        self.words_eob.write(0);
        self.frame_control.write(0);
        self.dma_status.write(0);
        self.gmac_status.write(0);
    }

    /// Fill the descriptor for a frame of `length` bytes at `buffer_address`.
    pub fn fill(&mut self, buffer_address: u32, length: u16, frame_control: u16) {
        self.buffer_address.write(buffer_address);
        self.length.write(length);
        self.words_eob.write(length + 3);
        self.frame_control.write(frame_control);
        self.dma_status.write(0);
        self.gmac_status.write(0);
    }
}

const _: () = assert!(core::mem::size_of::<RxDescriptor>() == DESCRIPTOR_SIZE);
const _: () = assert!(core::mem::size_of::<TxDescriptor>() == DESCRIPTOR_SIZE);
