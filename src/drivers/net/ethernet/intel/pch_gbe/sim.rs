//! Simulated controller for host tests
//!
//! `SimRegisters` is a register file with the few behaviors the driver
//! depends on: read-to-clear interrupt status, a self-clearing MAC reset, the
//! address-mask busy bit and a PHY answering on the MIIM register.
//! `SimPlatform` hands out page-aligned heap memory as DMA memory.
//! Clones share state, so a test keeps a handle while the device owns the
//! other one.

use alloc::alloc::{alloc_zeroed, dealloc, Layout};
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use crate::drivers::mmio::RegisterAccess;
use crate::drivers::net::netdev::EthernetError;
use crate::net::ethernet::MacAddress;
use crate::platform::{DmaBuffer, DmaMapping, Platform, PAGE_SIZE};

use super::descriptor::{DESCRIPTOR_SIZE, TX_GMAC_CMPLT};
use super::dma::{RxIndex, TxIndex};
use super::fixup::{AR8031_DEBUG_ADDRESS, AR8031_DEBUG_DATA};
use super::phy::*;
use super::regs::*;
use super::EthernetContext;

/// AR8031 identifier, revision 4
pub const AR8031_ID: u32 = 0x004D_D074;

struct SimPhy {
    address: u8,
    registers: [u16; 32],
    debug: [u16; 0x40],
    link_up: bool,
    resets: u32,
}

impl SimPhy {
    fn read(&self, register: u8) -> u16 {
        match register {
            MII_BMSR if self.link_up => {
                self.registers[usize::from(register)] | BMSR_LSTATUS | BMSR_ANEGCOMPLETE
            }
            MII_LPA if self.link_up => self.registers[usize::from(MII_ADVERTISE)],
            MII_STAT1000 if self.link_up => {
                (self.registers[usize::from(MII_CTRL1000)]
                    & (ADVERTISE_1000HALF | ADVERTISE_1000FULL))
                    << STAT1000_PARTNER_SHIFT
            }
            AR8031_DEBUG_DATA => {
                let index = usize::from(self.registers[usize::from(AR8031_DEBUG_ADDRESS)]);
                self.debug[index % self.debug.len()]
            }
            _ => self.registers[usize::from(register)],
        }
    }

    fn write(&mut self, register: u8, value: u16) {
        match register {
            MII_BMCR => {
                if value & BMCR_RESET != 0 {
                    self.resets += 1;
                }
                self.registers[usize::from(MII_BMCR)] = value & !(BMCR_RESET | BMCR_ANRESTART);
            }
            AR8031_DEBUG_DATA => {
                let index = usize::from(self.registers[usize::from(AR8031_DEBUG_ADDRESS)]);
                let len = self.debug.len();
                self.debug[index % len] = value;
            }
            _ => self.registers[usize::from(register)] = value,
        }
    }
}

struct SimState {
    file: [u32; REGISTER_SPACE / 4],
    pending_interrupts: u32,
    phy: Option<SimPhy>,
    miim_stuck: bool,
    miim_reads: u32,
    miim_writes: u32,
    mac_resets: u32,
}

/// Register file standing in for the controller BAR.
#[derive(Clone)]
pub struct SimRegisters {
    state: Rc<RefCell<SimState>>,
}

impl SimRegisters {
    pub fn new() -> Self {
        let mut file = [0u32; REGISTER_SPACE / 4];
        file[MIIM / 4] = MIIM_OPER_READY;
        Self {
            state: Rc::new(RefCell::new(SimState {
                file,
                pending_interrupts: 0,
                phy: None,
                miim_stuck: false,
                miim_reads: 0,
                miim_writes: 0,
                mac_resets: 0,
            })),
        }
    }

    /// Registers with the factory address in slot 0, as firmware leaves it.
    pub fn with_address(mac: MacAddress) -> Self {
        let registers = Self::new();
        let b = mac.0;
        registers.set_reg(
            mac_adr_high(0),
            u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        );
        registers.set_reg(mac_adr_low(0), u32::from_le_bytes([b[4], b[5], 0, 0]));
        registers
    }

    /// Peek at a register without side effects.
    pub fn reg(&self, offset: usize) -> u32 {
        self.state.borrow().file[offset / 4]
    }

    pub fn set_reg(&self, offset: usize, value: u32) {
        self.state.borrow_mut().file[offset / 4] = value;
    }

    /// Latch interrupt status bits for the next INT_ST read.
    pub fn raise_interrupt(&self, bits: u32) {
        self.state.borrow_mut().pending_interrupts |= bits;
    }

    pub fn attach_phy(&self, address: u8, identifier: u32) {
        let mut registers = [0u16; 32];
        registers[usize::from(MII_BMSR)] = 0x7949;
        registers[usize::from(MII_PHYSID1)] = (identifier >> 16) as u16;
        registers[usize::from(MII_PHYSID2)] = identifier as u16;
        self.state.borrow_mut().phy = Some(SimPhy {
            address,
            registers,
            debug: [0; 0x40],
            link_up: false,
            resets: 0,
        });
    }

    pub fn set_link(&self, up: bool) {
        if let Some(phy) = self.state.borrow_mut().phy.as_mut() {
            phy.link_up = up;
        }
    }

    pub fn set_miim_stuck(&self, stuck: bool) {
        self.state.borrow_mut().miim_stuck = stuck;
    }

    pub fn phy_register(&self, register: u8) -> u16 {
        self.state
            .borrow()
            .phy
            .as_ref()
            .map_or(0xFFFF, |phy| phy.registers[usize::from(register)])
    }

    pub fn phy_debug(&self, index: usize) -> u16 {
        self.state.borrow().phy.as_ref().map_or(0, |phy| phy.debug[index])
    }

    pub fn phy_resets(&self) -> u32 {
        self.state.borrow().phy.as_ref().map_or(0, |phy| phy.resets)
    }

    pub fn miim_reads(&self) -> u32 {
        self.state.borrow().miim_reads
    }

    pub fn miim_writes(&self) -> u32 {
        self.state.borrow().miim_writes
    }

    pub fn mac_resets(&self) -> u32 {
        self.state.borrow().mac_resets
    }

    /// Address programmed into a MAC address slot.
    pub fn address_slot(&self, slot: usize) -> MacAddress {
        let high = self.reg(mac_adr_high(slot)).to_le_bytes();
        let low = self.reg(mac_adr_low(slot)).to_le_bytes();
        MacAddress::new([high[0], high[1], high[2], high[3], low[0], low[1]])
    }

    pub fn slot_enabled(&self, slot: usize) -> bool {
        self.reg(ADDR_MASK) & (1 << slot) == 0
    }

    fn miim_command(state: &mut SimState, command: u32) {
        let address = ((command >> MIIM_PHY_ADDR_SHIFT) & MIIM_PHY_ADDR_MASK) as u8;
        let register = ((command >> MIIM_REG_ADDR_SHIFT) & MIIM_REG_ADDR_MASK) as u8;
        let write = command & MIIM_OPER_WRITE != 0;

        if state.miim_stuck {
            state.file[MIIM / 4] = command & !MIIM_OPER_READY;
            return;
        }

        let phy = state.phy.as_mut().filter(|phy| phy.address == address);
        let data = if write {
            state.miim_writes += 1;
            if let Some(phy) = phy {
                phy.write(register, command as u16);
            }
            command & MIIM_DATA_MASK
        } else {
            state.miim_reads += 1;
            // Nothing drives the bus: the line floats high
            phy.map_or(0xFFFF, |phy| u32::from(phy.read(register)))
        };

        state.file[MIIM / 4] = (command & !MIIM_DATA_MASK) | MIIM_OPER_READY | data;
    }
}

impl RegisterAccess for SimRegisters {
    fn read32(&mut self, offset: usize) -> u32 {
        let mut state = self.state.borrow_mut();
        match offset {
            INT_ST => {
                let value = state.file[INT_ST / 4] | state.pending_interrupts;
                state.pending_interrupts = 0;
                state.file[INT_ST / 4] = 0;
                value
            }
            _ => state.file[offset / 4],
        }
    }

    fn write32(&mut self, offset: usize, value: u32) {
        let mut state = self.state.borrow_mut();
        match offset {
            MIIM => Self::miim_command(&mut state, value),
            RESET => {
                if value & RESET_ALL != 0 {
                    state.mac_resets += 1;
                }
                state.file[RESET / 4] = 0;
            }
            ADDR_MASK => state.file[ADDR_MASK / 4] = value & !ADDR_MASK_BUSY,
            _ => state.file[offset / 4] = value,
        }
    }
}

// ============================================================================
// Platform
// ============================================================================

/// Fake device address of every allocation
pub const SIM_DEVICE_BASE: u64 = 0x4000_0000;

pub struct SimBuffer {
    ptr: *mut u8,
    len: usize,
}

impl DmaBuffer for SimBuffer {
    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[derive(Default)]
struct PlatformState {
    stalled_us: Cell<u64>,
    allocations: Cell<u32>,
    frees: Cell<u32>,
    maps: Cell<u32>,
    unmaps: Cell<u32>,
    map_shortfall: Cell<usize>,
    fail_allocation: Cell<bool>,
    timer_period: Cell<Option<u32>>,
    timer_cancels: Cell<u32>,
    wait_signals: Cell<u32>,
}

#[derive(Clone, Default)]
pub struct SimPlatform {
    state: Rc<PlatformState>,
}

impl SimPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stalled_us(&self) -> u64 {
        self.state.stalled_us.get()
    }

    pub fn allocations(&self) -> u32 {
        self.state.allocations.get()
    }

    pub fn frees(&self) -> u32 {
        self.state.frees.get()
    }

    pub fn maps(&self) -> u32 {
        self.state.maps.get()
    }

    pub fn unmaps(&self) -> u32 {
        self.state.unmaps.get()
    }

    /// Map this many bytes fewer than requested.
    pub fn set_map_shortfall(&self, bytes: usize) {
        self.state.map_shortfall.set(bytes);
    }

    pub fn set_fail_allocation(&self, fail: bool) {
        self.state.fail_allocation.set(fail);
    }

    pub fn timer_period(&self) -> Option<u32> {
        self.state.timer_period.get()
    }

    pub fn timer_cancels(&self) -> u32 {
        self.state.timer_cancels.get()
    }

    pub fn wait_signals(&self) -> u32 {
        self.state.wait_signals.get()
    }
}

impl Platform for SimPlatform {
    type Buffer = SimBuffer;
    type MapToken = u64;

    fn stall(&self, microseconds: u32) {
        let state = &self.state.stalled_us;
        state.set(state.get() + u64::from(microseconds));
    }

    fn allocate_buffer(&mut self, pages: usize) -> Result<SimBuffer, EthernetError> {
        if self.state.fail_allocation.get() || pages == 0 {
            return Err(EthernetError::OutOfResources);
        }
        let len = pages * PAGE_SIZE;
        let layout =
            Layout::from_size_align(len, PAGE_SIZE).map_err(|_| EthernetError::OutOfResources)?;
        // SAFETY: layout has a nonzero size
        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            return Err(EthernetError::OutOfResources);
        }
        self.state.allocations.set(self.state.allocations.get() + 1);
        Ok(SimBuffer { ptr, len })
    }

    fn free_buffer(&mut self, buffer: SimBuffer) {
        // SAFETY: the buffer came from allocate_buffer with this layout
        unsafe {
            dealloc(
                buffer.ptr,
                Layout::from_size_align_unchecked(buffer.len, PAGE_SIZE),
            )
        };
        self.state.frees.set(self.state.frees.get() + 1);
    }

    fn map(
        &mut self,
        buffer: &mut SimBuffer,
        bytes: usize,
    ) -> Result<DmaMapping<u64>, EthernetError> {
        self.state.maps.set(self.state.maps.get() + 1);
        let mapped_bytes = bytes
            .min(buffer.len)
            .saturating_sub(self.state.map_shortfall.get());
        Ok(DmaMapping {
            device_address: SIM_DEVICE_BASE,
            mapped_bytes,
            token: SIM_DEVICE_BASE,
        })
    }

    fn unmap(&mut self, _token: u64) {
        self.state.unmaps.set(self.state.unmaps.get() + 1);
    }

    fn start_periodic_timer(&mut self, period_us: u32) -> Result<(), EthernetError> {
        self.state.timer_period.set(Some(period_us));
        Ok(())
    }

    fn cancel_periodic_timer(&mut self) {
        self.state.timer_period.set(None);
        self.state.timer_cancels.set(self.state.timer_cancels.get() + 1);
    }

    fn signal_wait_for_packet(&mut self) {
        self.state.wait_signals.set(self.state.wait_signals.get() + 1);
    }
}

// ============================================================================
// Hardware-side DMA behavior
// ============================================================================

pub type SimContext = EthernetContext<SimRegisters, SimPlatform>;

impl SimContext {
    /// Fill the descriptor at the receive hard pointer the way the
    /// controller does, then advance the hard pointer.
    pub fn sim_deliver(&mut self, frame: &[u8], gmac_status: u16) {
        let registers = self.registers.clone();
        let base = registers.reg(RX_DSC_BASE);
        let hard = registers.reg(RX_DSC_HW_P);
        let slot = RxIndex::new(((hard - base) as usize) / DESCRIPTOR_SIZE);

        let mut view = self.arena.view().expect("DMA arena not mapped");
        view.rx_buffer_mut(slot)[..frame.len()].copy_from_slice(frame);
        let descriptor = view.rx_descriptor(slot);
        descriptor.length.write((frame.len() + 4) as u16);
        descriptor.gmac_status.write(gmac_status);

        let next = slot.next().get() * DESCRIPTOR_SIZE;
        registers.set_reg(RX_DSC_HW_P, base + next as u32);
        registers.raise_interrupt(INT_RX_DMA_CMPLT);
    }

    /// Complete the descriptor at the transmit hard pointer.
    pub fn sim_complete_transmit(&mut self, gmac_status: u16) {
        let registers = self.registers.clone();
        let base = registers.reg(TX_DSC_BASE);
        let hard = registers.reg(TX_DSC_HW_P);
        let slot = TxIndex::new(((hard - base) as usize) / DESCRIPTOR_SIZE);

        let mut view = self.arena.view().expect("DMA arena not mapped");
        view.tx_descriptor(slot)
            .gmac_status
            .write(TX_GMAC_CMPLT | gmac_status);

        let next = slot.next().get() * DESCRIPTOR_SIZE;
        registers.set_reg(TX_DSC_HW_P, base + next as u32);
        registers.raise_interrupt(INT_TX_CMPLT);
    }

    /// Bytes the controller would send from the transmit slot `index`.
    pub fn sim_transmitted(&mut self, index: usize) -> alloc::vec::Vec<u8> {
        let slot = TxIndex::new(index);
        let mut view = self.arena.view().expect("DMA arena not mapped");
        let length = usize::from(view.tx_descriptor(slot).length.read());
        view.tx_buffer(slot)[..length].to_vec()
    }
}
