//! Storage for the registers that get swapped out on a CPU mode change.
//!
//! Every exception mode owns its own SP, LR and SPSR; FIQ additionally owns
//! R8-R12 so an FIQ handler never has to spill the caller's working
//! registers to memory. See [`cpu_modes`](super::cpu_modes) for the mode
//! values this banking keys off of.

use serde::{Deserialize, Serialize};

use crate::cpu::psr::Psr;

/// One slot per banked register across all seven CPU modes.
///
/// On a mode switch the CPU's visible [`Registers`](super::registers::Registers)
/// are swapped against the slots here rather than copied wholesale: R0-R7
/// are shared across every mode, while R8-R12/SP/LR (and SPSR) live in
/// exactly one mode's bank at a time.
#[derive(Default, Serialize, Deserialize)]
pub struct RegisterBank {
    /// R8-R12, SP and LR as last seen outside FIQ mode.
    pub r8_usr: u32,
    pub r9_usr: u32,
    pub r10_usr: u32,
    pub r11_usr: u32,
    pub r12_usr: u32,
    pub sp_usr: u32,
    pub lr_usr: u32,

    /// R8-R12, SP and LR private to FIQ mode.
    pub r8_fiq: u32,
    pub r9_fiq: u32,
    pub r10_fiq: u32,
    pub r11_fiq: u32,
    pub r12_fiq: u32,
    pub sp_fiq: u32,
    pub lr_fiq: u32,

    /// SP/LR private to Supervisor mode: the SWI handler's own stack and
    /// its return address.
    pub sp_svc: u32,
    pub lr_svc: u32,

    /// SP/LR private to Abort mode.
    pub sp_abt: u32,
    pub lr_abt: u32,

    /// SP/LR private to IRQ mode.
    pub sp_irq: u32,
    pub lr_irq: u32,

    /// SP/LR private to Undefined-instruction mode.
    pub sp_und: u32,
    pub lr_und: u32,

    /// CPSR snapshot taken on entry to each exception mode, restored on
    /// return from the handler.
    pub spsr_fiq: Psr,
    pub spsr_svc: Psr,
    pub spsr_abt: Psr,
    pub spsr_irq: Psr,
    pub spsr_und: Psr,
}
