//! The Thumb (16-bit) instruction set: denser encodings over the same ARM
//! register file and ALU, trading the barrel shifter and full R0-R15 access
//! (R8-R15 need `HiRegisterOpBX`) for half the instruction size. BL
//! (long branch with link) is split across two 16-bit halves to reach a
//! ±4MB range that doesn't fit in one.
//!
//! [`instruction`] decodes raw opcodes, [`operations`] executes them,
//! [`alu_instructions`] covers the ALU op subset, [`mode`] the addressing
//! mode variants.

pub mod alu_instructions;

pub mod instruction;
pub mod mode;

pub mod operations;
