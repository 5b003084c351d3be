//! The CPSR/SPSR layout: condition flags in the top nibble, control bits
//! (mode, state, interrupt masks) in the bottom byte.
//!
//! ```text
//! 31 30 29 28 27 26      8 7 6 5 4   0
//! ┌──┬──┬──┬──┬──┬────────┬─┬─┬─┬─────┐
//! │N │Z │C │V │Q │Reserved│I│F│T│Mode │
//! └──┴──┴──┴──┴──┴────────┴─┴─┴─┴─────┘
//! ```
//!
//! [`condition`](super::condition) tests the N/Z/C/V flags against a
//! [`Condition`]; `cpu_modes` defines the Mode field's values. Every
//! exception mode banks its own SPSR copy of CPSR, restored on return —
//! see `register_bank`.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::arm::alu_instruction::ArithmeticOpResult;
use crate::cpu::{condition::Condition, cpu_modes::Mode};

const BIT_SIGN: u8 = 31;
const BIT_ZERO: u8 = 30;
const BIT_CARRY: u8 = 29;
const BIT_OVERFLOW: u8 = 28;
const BIT_STICKY_OVERFLOW: u8 = 27;
const BIT_IRQ_DISABLE: u8 = 7;
const BIT_FIQ_DISABLE: u8 = 6;
const BIT_STATE: u8 = 5;
const MODE_FIELD_MASK: u32 = 0b1_1111;

/// A 32-bit CPSR or SPSR value with typed accessors for each field.
///
/// ```
/// use emu::cpu::psr::Psr;
///
/// let mut cpsr = Psr::default();
/// cpsr.set_zero_flag(true);
/// assert!(cpsr.zero_flag());
/// ```
#[derive(Default, Clone, Copy, Serialize, Deserialize)]
pub struct Psr(u32);

impl Psr {
    /// Evaluates an ARM condition code against this PSR's N/Z/C/V flags.
    pub(crate) fn can_execute(self, cond: Condition) -> bool {
        match cond {
            Condition::EQ => self.zero_flag(),
            Condition::NE => !self.zero_flag(),
            Condition::CS => self.carry_flag(),
            Condition::CC => !self.carry_flag(),
            Condition::MI => self.sign_flag(),
            Condition::PL => !self.sign_flag(),
            Condition::VS => self.overflow_flag(),
            Condition::VC => !self.overflow_flag(),
            Condition::HI => self.carry_flag() && !self.zero_flag(),
            Condition::LS => !self.carry_flag() || self.zero_flag(),
            Condition::GE => self.sign_flag() == self.overflow_flag(),
            Condition::LT => self.sign_flag() != self.overflow_flag(),
            Condition::GT => !self.zero_flag() && self.sign_flag() == self.overflow_flag(),
            Condition::LE => self.zero_flag() || self.sign_flag() != self.overflow_flag(),
            Condition::AL => true,
            Condition::NV => false,
        }
    }

    #[must_use]
    pub fn sign_flag(self) -> bool {
        self.0.get_bit(BIT_SIGN)
    }

    #[must_use]
    pub fn zero_flag(self) -> bool {
        self.0.get_bit(BIT_ZERO)
    }

    #[must_use]
    pub fn carry_flag(self) -> bool {
        self.0.get_bit(BIT_CARRY)
    }

    #[must_use]
    pub fn overflow_flag(self) -> bool {
        self.0.get_bit(BIT_OVERFLOW)
    }

    /// Sticky overflow, `ARMv5TE`+ only; set by saturating arithmetic
    /// (`QADD`/`QSUB`/...), cleared only via MSR.
    #[must_use]
    pub fn sticky_overflow(self) -> bool {
        self.0.get_bit(BIT_STICKY_OVERFLOW)
    }

    /// Bits 26-8 carry no defined meaning on this core; reported as set so
    /// callers relying on "reserved bits read back as written" see a
    /// stable value.
    #[must_use]
    pub const fn reserved_bits() -> bool {
        true
    }

    #[must_use]
    pub fn irq_disable(self) -> bool {
        self.0.get_bit(BIT_IRQ_DISABLE)
    }

    #[must_use]
    pub fn fiq_disable(self) -> bool {
        self.0.get_bit(BIT_FIQ_DISABLE)
    }

    /// T bit: false selects ARM state, true selects Thumb. Only ever
    /// flipped through [`Psr::set_cpu_state`]/a mode-changing exception —
    /// writing it directly from emulated code does not actually switch
    /// decode state.
    #[must_use]
    pub fn state_bit(self) -> bool {
        self.0.get_bit(BIT_STATE)
    }

    /// Decodes the M4-M0 mode field, falling back to Supervisor for the
    /// invalid values the BIOS is known to write transiently to SPSR.
    #[must_use]
    pub fn mode(self) -> Mode {
        let mode_bits = self.0 & MODE_FIELD_MASK;
        Mode::try_from(mode_bits).unwrap_or_else(|_| {
            tracing::debug!(
                "invalid mode bits 0b{mode_bits:05b} in PSR=0x{:08X}, defaulting to Supervisor",
                self.0
            );
            Mode::Supervisor
        })
    }

    pub fn set_sign_flag(&mut self, value: bool) {
        self.0.set_bit(BIT_SIGN, value);
    }

    pub fn set_zero_flag(&mut self, value: bool) {
        self.0.set_bit(BIT_ZERO, value);
    }

    pub fn set_carry_flag(&mut self, value: bool) {
        self.0.set_bit(BIT_CARRY, value);
    }

    pub fn set_overflow_flag(&mut self, value: bool) {
        self.0.set_bit(BIT_OVERFLOW, value);
    }

    /// Applies all four flags from an ALU result at once.
    pub fn set_flags(&mut self, op_result: &ArithmeticOpResult) {
        self.set_carry_flag(op_result.carry);
        self.set_zero_flag(op_result.zero);
        self.set_sign_flag(op_result.sign);
        self.set_overflow_flag(op_result.overflow);
    }

    /// Q-flag, settable only by saturating multiply/add/subtract
    /// instructions and resettable only by MSR.
    #[cfg(test)]
    pub fn set_sticky_overflow(&mut self, value: bool) {
        self.0.set_bit(BIT_STICKY_OVERFLOW, value);
    }

    pub fn set_irq_disable(&mut self, value: bool) {
        self.0.set_bit(BIT_IRQ_DISABLE, value);
    }

    pub fn set_fiq_disable(&mut self, value: bool) {
        self.0.set_bit(BIT_FIQ_DISABLE, value);
    }

    pub fn set_state_bit(&mut self, value: bool) {
        self.0.set_bit(BIT_STATE, value);
    }

    pub const fn set_mode_raw(&mut self, m: u32) {
        self.0 &= !MODE_FIELD_MASK;
        self.0 |= m & MODE_FIELD_MASK;
    }

    pub const fn set_mode(&mut self, m: Mode) {
        self.0 &= !MODE_FIELD_MASK;
        self.0 |= m as u32;
    }

    #[must_use]
    pub fn cpu_state(self) -> CpuState {
        self.state_bit().into()
    }

    pub fn set_cpu_state(&mut self, state: CpuState) {
        self.set_state_bit(state.into());
    }
}

impl From<Mode> for Psr {
    fn from(m: Mode) -> Self {
        let mut psr = Self(0);
        psr.set_mode(m);
        psr
    }
}

impl From<Psr> for u32 {
    fn from(p: Psr) -> Self {
        p.0
    }
}

/// Which instruction set the CPU is currently decoding, mirrored by the T
/// bit. Switched via `BX`/`BLX` to a target address whose bit 0 selects
/// the new state.
#[derive(PartialEq, Eq)]
pub enum CpuState {
    Thumb,
    Arm,
}

impl From<CpuState> for bool {
    fn from(state: CpuState) -> Self {
        match state {
            CpuState::Arm => false,
            CpuState::Thumb => true,
        }
    }
}

impl From<bool> for CpuState {
    fn from(state: bool) -> Self {
        if state { Self::Thumb } else { Self::Arm }
    }
}
