//! The 16 general-purpose registers visible to the currently active mode.
//!
//! R0-R12 are general purpose, R13 is the stack pointer by convention, R14
//! holds the return address after a `BL`/`BLX`, and R15 is the program
//! counter: reading it yields the address of the current instruction plus
//! the pipeline depth (8 in ARM state, 4 in Thumb state), and writing it
//! triggers a pipeline flush.
//!
//! Register banking across modes lives in [`register_bank`](super::register_bank);
//! Thumb's restricted access to R8-R15 lives in [`thumb`](super::thumb).

use serde::{Deserialize, Serialize};

pub const REG_SP: usize = 0xD;
pub const REG_LR: usize = 0xE;
pub const REG_PROGRAM_COUNTER: u32 = 0xF;

const REGISTER_COUNT: usize = 16;

/// Currently-visible register file. Banked registers (swapped in on a mode
/// change) live separately in [`RegisterBank`](super::register_bank::RegisterBank).
#[derive(Default, Serialize, Deserialize)]
pub struct Registers([u32; REGISTER_COUNT]);

impl Registers {
    #[must_use]
    pub fn program_counter(&self) -> usize {
        self.register_at(usize::try_from(REG_PROGRAM_COUNTER).unwrap())
            .try_into()
            .unwrap()
    }

    pub const fn set_program_counter(&mut self, new_value: u32) {
        self.0[15] = new_value;
    }

    pub const fn advance_program_counter(&mut self, bytes: u32) {
        self.0[15] = self.0[15].wrapping_add(bytes);
    }

    pub fn set_register_at(&mut self, reg: usize, new_value: u32) {
        assert!(reg < REGISTER_COUNT, "register index out of range: {reg}");
        self.0[reg] = new_value;
    }

    #[must_use]
    pub const fn register_at(&self, reg: usize) -> u32 {
        self.0[reg]
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<u32> {
        self.0.to_vec()
    }
}
