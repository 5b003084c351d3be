//! System Control: IE/IF/IME, WAITCNT, HALTCNT/POSTFLG.
//!
//! This is the piece the rest of the core calls into whenever something wants
//! to raise an interrupt line or look up how many wait states a bus access
//! costs. [`SystemControl::request_interrupt`] is the single entry point every
//! peripheral (timers, DMA, PPU, keypad, serial) uses; it is the "unified
//! recovery path" the CPU relies on to unhalt and eventually take the IRQ
//! vector.
//!
//! # Interrupt Registers
//!
//! | Register | Address       | Description                                    |
//! |----------|---------------|------------------------------------------------|
//! | IE       | `0x0400_0200` | Interrupt Enable - which IRQs can fire         |
//! | IF       | `0x0400_0202` | Interrupt Request Flags - pending interrupts   |
//! | IME      | `0x0400_0208` | Interrupt Master Enable - global on/off        |
//!
//! | Bit | Source  | Bit | Source |
//! |-----|---------|-----|--------|
//! | 0   | VBlank  | 8-11| DMA 0-3 |
//! | 1   | HBlank  | 12  | Keypad |
//! | 2   | VCount  | 13  | GamePak |
//! | 3-6 | Timer 0-3 | 7 | Serial |
//!
//! Writing IF acknowledges: bits written as 1 clear the corresponding pending flag.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::scheduler::{EventKind, Scheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrqSource {
    VBlank = 0,
    HBlank = 1,
    VCount = 2,
    Timer0 = 3,
    Timer1 = 4,
    Timer2 = 5,
    Timer3 = 6,
    Serial = 7,
    Dma0 = 8,
    Dma1 = 9,
    Dma2 = 10,
    Dma3 = 11,
    Keypad = 12,
    Gamepak = 13,
}

/// Wait-state cycle counts for one GamePak ROM window, in halfword units.
#[derive(Debug, Clone, Copy)]
struct WaitStateTiming {
    non_sequential: u8,
    sequential: u8,
}

const SRAM_WAIT_TABLE: [u8; 4] = [4, 3, 2, 8];
const ROM_NON_SEQ_TABLE: [u8; 4] = [4, 3, 2, 8];
const ROM0_SEQ_TABLE: [u8; 2] = [2, 1];
const ROM1_SEQ_TABLE: [u8; 2] = [4, 1];
const ROM2_SEQ_TABLE: [u8; 2] = [8, 1];

#[derive(Default, Serialize, Deserialize)]
pub struct SystemControl {
    pub interrupt_enable: u16,
    pub interrupt_request: u16,
    pub wait_state_control: u16,
    pub interrupt_master_enable: u16,
    pub post_boot_flag: u8,
    pub power_down_control: u8,
    pub purpose_unknown: u8,
    pub internal_memory_control: u32,
    pub halted: bool,
}

impl SystemControl {
    /// Sets the IF bit for `source`. If IE∧IF∧IME becomes non-zero: unhalts the
    /// CPU immediately if it was halted, and schedules the IRQ-line-asserted
    /// event one cycle out so the CPU takes it at a deterministic fetch
    /// boundary rather than mid-instruction.
    pub fn request_interrupt(&mut self, source: IrqSource, scheduler: &mut Scheduler) {
        self.interrupt_request.set_bit_on(source as u8);
        if self.irq_pending() {
            self.halted = false;
            if !scheduler.is_scheduled(EventKind::HaltIrqWake) {
                scheduler.schedule(EventKind::HaltIrqWake, 1);
            }
        }
    }

    #[must_use]
    pub const fn irq_pending(&self) -> bool {
        self.interrupt_master_enable & 0x1 != 0
            && (self.interrupt_enable & self.interrupt_request) != 0
    }

    /// Writing IF acknowledges: written bits clear the corresponding request bits.
    pub fn write_if(&mut self, value: u16) {
        self.interrupt_request &= !value;
    }

    pub const fn halt(&mut self) {
        self.halted = true;
    }

    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Cycle cost for a GamePak ROM access in `window` (0, 1 or 2), given
    /// whether it's the first (non-sequential) access or a sequential
    /// follow-up, and the transfer width in bytes. A word access to the
    /// 16-bit-bus ROM costs twice the halfword timing.
    #[must_use]
    pub fn rom_access_cycles(&self, window: u8, sequential: bool, width_bytes: u8) -> u32 {
        let timing = self.rom_timing(window);
        let halfword_cost = if sequential {
            timing.sequential
        } else {
            timing.non_sequential
        };
        if width_bytes == 4 {
            u32::from(halfword_cost) * 2
        } else {
            u32::from(halfword_cost)
        }
    }

    fn rom_timing(&self, window: u8) -> WaitStateTiming {
        let non_sequential = ROM_NON_SEQ_TABLE[usize::from(self.wait_state_non_seq_bits(window))];
        let sequential = match window {
            0 => ROM0_SEQ_TABLE[usize::from(self.wait_state_seq_bit(window))],
            1 => ROM1_SEQ_TABLE[usize::from(self.wait_state_seq_bit(window))],
            _ => ROM2_SEQ_TABLE[usize::from(self.wait_state_seq_bit(window))],
        };
        WaitStateTiming {
            non_sequential,
            sequential,
        }
    }

    fn wait_state_non_seq_bits(&self, window: u8) -> u8 {
        let shift = 2 + window * 3;
        self.wait_state_control.get_bits(shift..=shift + 1) as u8
    }

    fn wait_state_seq_bit(&self, window: u8) -> u8 {
        let shift = 4 + window * 3;
        u8::from(self.wait_state_control.get_bit(shift))
    }

    #[must_use]
    pub fn sram_access_cycles(&self) -> u32 {
        u32::from(SRAM_WAIT_TABLE[usize::from(self.wait_state_control.get_bits(0..=1))])
    }

    #[must_use]
    pub const fn prefetch_buffer_enabled(&self) -> bool {
        self.wait_state_control & 0x4000 != 0
    }
}
