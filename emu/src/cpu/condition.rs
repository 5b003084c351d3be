//! ARM conditional execution: the 4-bit field in bits 31-28 of every ARM
//! instruction that decides whether it runs at all.
//!
//! Unlike most architectures, where only branches are conditional, ARM lets
//! almost any instruction carry a condition, tested against CPSR's N/Z/C/V
//! flags before the instruction is allowed to execute. A `MOVEQ R0, #1`
//! behaves as a no-op unless the previous flag-setting instruction left Z=1.
//! In Thumb state this field collapses to branches only; every other Thumb
//! instruction behaves as if it carried `AL`.
//!
//! | Code | Flags tested   | Meaning                        |
//! |------|----------------|---------------------------------|
//! | EQ   | Z=1            | equal                           |
//! | NE   | Z=0            | not equal                       |
//! | CS   | C=1            | unsigned >=  (a.k.a. HS)        |
//! | CC   | C=0            | unsigned <   (a.k.a. LO)        |
//! | MI   | N=1            | negative                        |
//! | PL   | N=0            | positive or zero                |
//! | VS   | V=1            | signed overflow                 |
//! | VC   | V=0            | no signed overflow              |
//! | HI   | C=1 and Z=0    | unsigned >                      |
//! | LS   | C=0 or Z=1     | unsigned <=                     |
//! | GE   | N=V            | signed >=                       |
//! | LT   | N!=V           | signed <                        |
//! | GT   | Z=0 and N=V    | signed >                        |
//! | LE   | Z=1 or N!=V    | signed <=                       |
//! | AL   | -              | always (the assembler's default)|
//! | NV   | -              | reserved, never emitted         |

use serde::{Deserialize, Serialize};

/// One of the 16 four-bit condition codes an ARM instruction's top nibble
/// can carry. Evaluating one of these against a [`Psr`](super::psr::Psr)'s
/// flags decides whether the instruction executes or is skipped as a NOP.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum Condition {
    EQ = 0x0,
    NE = 0x1,
    CS = 0x2,
    CC = 0x3,
    MI = 0x4,
    PL = 0x5,
    VS = 0x6,
    VC = 0x7,
    HI = 0x8,
    LS = 0x9,
    GE = 0xA,
    LT = 0xB,
    GT = 0xC,
    LE = 0xD,
    /// Unconditional; what plain `MOV` (no suffix) assembles to.
    AL = 0xE,
    /// Reserved since ARMv3; real code never emits this.
    NV = 0xF,
}

impl From<u8> for Condition {
    fn from(item: u8) -> Self {
        const TABLE: [Condition; 16] = [
            Condition::EQ,
            Condition::NE,
            Condition::CS,
            Condition::CC,
            Condition::MI,
            Condition::PL,
            Condition::VS,
            Condition::VC,
            Condition::HI,
            Condition::LS,
            Condition::GE,
            Condition::LT,
            Condition::GT,
            Condition::LE,
            Condition::AL,
            Condition::NV,
        ];
        TABLE[(item & 0xF) as usize]
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let suffix = match self {
            Self::EQ => "EQ",
            Self::NE => "NE",
            Self::CS => "CS",
            Self::CC => "CC",
            Self::MI => "MI",
            Self::PL => "PL",
            Self::VS => "VS",
            Self::VC => "VC",
            Self::HI => "HI",
            Self::LS => "LS",
            Self::GE => "GE",
            Self::LT => "LT",
            Self::GT => "GT",
            Self::LE => "LE",
            Self::AL => return Ok(()),
            Self::NV => "_NEVER",
        };
        f.write_str(suffix)
    }
}
