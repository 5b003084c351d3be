//! Small field/flag types shared by the ARM and Thumb decoders: which side
//! of a load/store pair an opcode names, which barrel-shifter mode it
//! selects, whether an offset is pre- or post-applied, and so on. Each type
//! here corresponds to one or two bits of an instruction word; grouping
//! them as enums instead of raw booleans keeps the decode and execute code
//! from re-deriving "what does bit 22 mean here" at every call site.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

/// Whether a data-processing operand is an embedded immediate or comes
/// from a (possibly shifted) register — usually the instruction's I bit,
/// though a handful of encodings invert the sense of this bit.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum OperandKind {
    Immediate,
    Register,
}

impl From<bool> for OperandKind {
    fn from(b: bool) -> Self {
        if b { Self::Immediate } else { Self::Register }
    }
}

/// The four ops available to Thumb's "move/compare/add/subtract immediate"
/// encoding (Format 3: `001 Op Rd Offset8`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Mov,
    Cmp,
    Add,
    Sub,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mnemonic = match self {
            Self::Mov => "MOV",
            Self::Cmp => "CMP",
            Self::Add => "ADD",
            Self::Sub => "SUB",
        };
        f.write_str(mnemonic)
    }
}

impl From<u16> for Operation {
    fn from(op: u16) -> Self {
        match op {
            0 => Self::Mov,
            1 => Self::Cmp,
            2 => Self::Add,
            3 => Self::Sub,
            _ => unreachable!(),
        }
    }
}

/// Barrel-shifter mode applied to a data-processing operand at no extra
/// cycle cost. `LSR #0`/`ASR #0` are encoded forms of shift-by-32, and
/// `ROR #0` instead means RRX (rotate right through the carry flag by
/// one) — those special cases are handled where the shift is applied, not
/// here.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftKind {
    const fn from_field(op: u32) -> Self {
        match op {
            0 => Self::Lsl,
            1 => Self::Lsr,
            2 => Self::Asr,
            3 => Self::Ror,
            _ => unreachable!(),
        }
    }
}

impl From<u16> for ShiftKind {
    fn from(op: u16) -> Self {
        Self::from_field(u32::from(op))
    }
}

impl From<u32> for ShiftKind {
    fn from(op: u32) -> Self {
        Self::from_field(op)
    }
}

impl std::fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mnemonic = match self {
            Self::Lsl => "LSL",
            Self::Lsr => "LSR",
            Self::Asr => "ASR",
            Self::Ror => "ROR",
        };
        f.write_str(mnemonic)
    }
}

/// Word vs byte access for a load/store, decoded from the B bit. A
/// misaligned word access is rotated rather than trapped, a GBA quirk
/// rather than an ARM architectural rule.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum ReadWriteKind {
    #[default]
    Word,
    Byte,
}

impl From<bool> for ReadWriteKind {
    fn from(value: bool) -> Self {
        if value { Self::Byte } else { Self::Word }
    }
}

impl From<u32> for ReadWriteKind {
    fn from(op_code: u32) -> Self {
        op_code.get_bit(22).into()
    }
}

/// Whether a load/store instruction's L bit names a load (register <-
/// memory) or a store (memory <- register).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum LoadStoreKind {
    Store,
    Load,
}

impl From<bool> for LoadStoreKind {
    fn from(b: bool) -> Self {
        if b { Self::Load } else { Self::Store }
    }
}

impl std::fmt::Display for LoadStoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mnemonic = match self {
            Self::Load => "LDR",
            Self::Store => "STR",
        };
        write!(f, "{mnemonic}")
    }
}

/// Whether the addressing mode's offset is folded into the address before
/// the transfer (Pre) or applied afterward (Post), per the P bit.
/// Post-indexed addressing always writes the new address back to the base
/// register regardless of the W bit; pre-indexed only does so if W is set.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Indexing {
    Post,
    Pre,
}

impl From<bool> for Indexing {
    fn from(state: bool) -> Self {
        if state { Self::Pre } else { Self::Post }
    }
}

/// Direction the offset is applied in indexed addressing, per the U bit:
/// `Up` adds it to the base, `Down` subtracts it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Offsetting {
    Down,
    Up,
}

impl From<bool> for Offsetting {
    fn from(state: bool) -> Self {
        if state { Self::Up } else { Self::Down }
    }
}

/// How a halfword/signed-byte transfer (`LDRH`/`STRH`/`LDRSB`/`LDRSH`)
/// gets its offset: an 8-bit immediate split across bits 11-8 and 3-0, or
/// a register named by the low 4 bits of the instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HalfwordDataTransferOffsetKind {
    Immediate { offset: u32 },
    Register { register: u32 },
}
