//! ARM data processing instruction opcodes and the barrel shifter.
//!
//! A data-processing instruction is `[Cond][00][I][OpCode][S][Rn][Rd][Operand2]`:
//! 16 possible `OpCode`s ([`ArmModeAluInstr`]), an optional set-flags bit (S),
//! and a second operand that's either an 8-bit immediate rotated right by an
//! even amount, or a register optionally run through the barrel shifter
//! ([`shift`]) for free before reaching the ALU.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::flags::ShiftKind;

/// ARM data-processing opcode, encoded in bits 24-21 of the instruction.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum ArmModeAluInstr {
    /// `Rd = Rn AND Op2`
    And = 0x0,
    /// `Rd = Rn XOR Op2`
    Eor = 0x1,
    /// `Rd = Rn - Op2`
    Sub = 0x2,
    /// `Rd = Op2 - Rn`
    Rsb = 0x3,
    /// `Rd = Rn + Op2`
    Add = 0x4,
    /// `Rd = Rn + Op2 + C`
    Adc = 0x5,
    /// `Rd = Rn - Op2 - !C`
    Sbc = 0x6,
    /// `Rd = Op2 - Rn - !C`
    Rsc = 0x7,
    /// `Rn AND Op2`, flags only
    Tst = 0x8,
    /// `Rn XOR Op2`, flags only
    Teq = 0x9,
    /// `Rn - Op2`, flags only
    Cmp = 0xA,
    /// `Rn + Op2`, flags only
    Cmn = 0xB,
    /// `Rd = Rn OR Op2`
    Orr = 0xC,
    /// `Rd = Op2` (Rn ignored)
    Mov = 0xD,
    /// `Rd = Rn AND NOT Op2`
    Bic = 0xE,
    /// `Rd = NOT Op2` (Rn ignored)
    Mvn = 0xF,
}

impl std::fmt::Display for ArmModeAluInstr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Eor => f.write_str("EOR"),
            Self::Sub => f.write_str("SUB"),
            Self::Rsb => f.write_str("RSB"),
            Self::Add => f.write_str("ADD"),
            Self::Adc => f.write_str("ADC"),
            Self::Sbc => f.write_str("SBC"),
            Self::Rsc => f.write_str("RSC"),
            Self::Tst => f.write_str("TST"),
            Self::Teq => f.write_str("TEQ"),
            Self::Cmp => f.write_str("CMP"),
            Self::Cmn => f.write_str("CMN"),
            Self::Orr => f.write_str("ORR"),
            Self::Mov => f.write_str("MOV"),
            Self::Bic => f.write_str("BIC"),
            Self::Mvn => f.write_str("MVN"),
        }
    }
}

/// Whether an ALU op takes its carry-out from the barrel shifter (logical)
/// or from the arithmetic unit itself (arithmetic).
#[derive(Eq, PartialEq, Debug)]
pub enum AIKind {
    Logical,
    Arithmetic,
}

pub trait Kind {
    fn kind(&self) -> AIKind;
}

impl Kind for ArmModeAluInstr {
    fn kind(&self) -> AIKind {
        match &self {
            Self::And
            | Self::Eor
            | Self::Tst
            | Self::Teq
            | Self::Orr
            | Self::Mov
            | Self::Bic
            | Self::Mvn => AIKind::Logical,
            Self::Sub
            | Self::Rsb
            | Self::Add
            | Self::Adc
            | Self::Sbc
            | Self::Rsc
            | Self::Cmp
            | Self::Cmn => AIKind::Arithmetic,
        }
    }
}

impl From<u32> for ArmModeAluInstr {
    fn from(alu_op_code: u32) -> Self {
        match alu_op_code {
            0x0 => Self::And,
            0x1 => Self::Eor,
            0x2 => Self::Sub,
            0x3 => Self::Rsb,
            0x4 => Self::Add,
            0x5 => Self::Adc,
            0x6 => Self::Sbc,
            0x7 => Self::Rsc,
            0x8 => Self::Tst,
            0x9 => Self::Teq,
            0xA => Self::Cmp,
            0xB => Self::Cmn,
            0xC => Self::Orr,
            0xD => Self::Mov,
            0xE => Self::Bic,
            0xF => Self::Mvn,
            _ => unreachable!(),
        }
    }
}

/// Result of an ALU or shift operation, including the flags it would set if
/// the S bit is set. `carry` holds the last bit shifted out for shifts, or
/// unsigned carry-out for arithmetic; `overflow`/`sign`/`zero` are only
/// meaningful for arithmetic results.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Default)]
pub struct ArithmeticOpResult {
    pub result: u32,
    pub carry: bool,
    pub overflow: bool,
    pub sign: bool,
    pub zero: bool,
}

fn shifted_out_bit(value: u32, bit: u32) -> bool {
    value.get_bit(bit.try_into().unwrap())
}

/// Barrel shifter: applies one of LSL/LSR/ASR/ROR to `rm` by `shift_amount`,
/// producing the new carry flag alongside the result (`overflow`/`sign`/`zero`
/// are left at their default). `carry` is the current carry flag, consumed by
/// the ROR#0/RRX encoding.
///
/// Per ARM's encoding, a shift amount of 0 for LSR/ASR/ROR is special-cased
/// to mean 32 (LSR/ASR) or RRX (ROR); LSL#0 is a true no-op.
pub fn shift(kind: ShiftKind, shift_amount: u32, rm: u32, carry: bool) -> ArithmeticOpResult {
    match kind {
        ShiftKind::Lsl => match shift_amount {
            0 => ArithmeticOpResult {
                result: rm,
                carry,
                ..Default::default()
            },
            1..=32 => {
                // Shift in u64 so a shift_amount of 32 doesn't wrap around
                // (Rust shifts are defined modulo the operand's bit width).
                let widened = u64::from(rm);
                ArithmeticOpResult {
                    result: (widened << shift_amount) as u32,
                    carry: shifted_out_bit(rm, 32 - shift_amount),
                    ..Default::default()
                }
            }
            _ => ArithmeticOpResult {
                carry: false,
                ..Default::default()
            },
        },
        ShiftKind::Lsr => match shift_amount {
            0 => ArithmeticOpResult {
                result: 0,
                carry: rm.get_bit(31),
                ..Default::default()
            },
            1..=32 => {
                let rm64 = u64::from(rm);
                ArithmeticOpResult {
                    result: (rm64 >> shift_amount) as u32,
                    carry: shifted_out_bit(rm, shift_amount - 1),
                    ..Default::default()
                }
            }
            _ => ArithmeticOpResult {
                result: 0,
                carry: false,
                ..Default::default()
            },
        },
        ShiftKind::Asr => match shift_amount {
            1..=31 => ArithmeticOpResult {
                result: ((rm as i32) >> shift_amount) as u32,
                carry: shifted_out_bit(rm, shift_amount - 1),
                ..Default::default()
            },
            _ => ArithmeticOpResult {
                result: ((rm as i32) >> 31) as u32,
                carry: rm.get_bit(31),
                ..Default::default()
            },
        },
        ShiftKind::Ror => {
            // ROR by n>32 behaves like ROR by n-32; fold into 1..=32 first.
            let mut new_shift_amount = shift_amount;
            if shift_amount > 32 {
                new_shift_amount %= 32;
                if new_shift_amount == 0 {
                    new_shift_amount = 32;
                }
            }

            match new_shift_amount {
                // ROR#0 encodes RRX: rotate right by 1, bringing in the carry.
                0 => ArithmeticOpResult {
                    result: (rm >> 1) | (u32::from(carry) << 31),
                    carry: rm.get_bit(0),
                    ..Default::default()
                },
                1..=31 => ArithmeticOpResult {
                    result: rm.rotate_right(new_shift_amount),
                    carry: shifted_out_bit(rm, new_shift_amount - 1),
                    ..Default::default()
                },
                32 => ArithmeticOpResult {
                    result: rm,
                    carry: rm.get_bit(31),
                    ..Default::default()
                },
                _ => unreachable!(),
            }
        }
    }
}

/// PSR transfer operation: read CPSR/SPSR into a register (MRS), or write a
/// register or rotated immediate into it, optionally restricted to the
/// fields selected by `field_mask` (bit 3=flags, 2=status, 1=extension,
/// 0=control; only flags and control are implemented on real hardware).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PsrOpKind {
    /// `MRS Rd, CPSR|SPSR`
    Mrs { destination_register: u32 },
    /// `MSR CPSR|SPSR, Rm`
    Msr { source_register: u32 },
    /// `MSR CPSR_<fields>, Rm|#imm`
    MsrFlg {
        operand: AluSecondOperandInfo,
        field_mask: u32,
    },
}

impl TryFrom<u32> for PsrOpKind {
    type Error = String;

    fn try_from(op_code: u32) -> Result<Self, Self::Error> {
        if op_code.get_bits(23..=27) == 0b0_0010
            && op_code.get_bits(16..=21) == 0b00_1111
            && op_code.get_bits(0..=11) == 0b0000_0000_0000
        {
            Ok(Self::Mrs {
                destination_register: op_code.get_bits(12..=15),
            })
        } else if op_code.get_bits(23..=27) == 0b00010
            && op_code.get_bits(12..=21) == 0b10_1001_1111
            && op_code.get_bits(4..=11) == 0b0000_0000
        {
            Ok(Self::Msr {
                source_register: op_code.get_bits(0..=3),
            })
        } else if op_code.get_bits(26..=27) == 0b00
            && op_code.get_bits(23..=24) == 0b10
            && op_code.get_bits(20..=21) == 0b10
            && op_code.get_bits(12..=15) == 0b1111
        {
            // Field-mask MSR: immediate (bit 25=1) or register (bit 25=0) operand.
            Ok(Self::MsrFlg {
                operand: if op_code.get_bit(25) {
                    AluSecondOperandInfo::Immediate {
                        base: op_code.get_bits(0..=7),
                        shift: op_code.get_bits(8..=11) * 2,
                    }
                } else {
                    AluSecondOperandInfo::Register {
                        shift_op: ShiftOperator::Immediate(0),
                        shift_kind: ShiftKind::Lsl,
                        register: op_code.get_bits(0..=3),
                    }
                },
                field_mask: op_code.get_bits(16..=19),
            })
        } else {
            Err(format!(
                "Invalid PSR operation opcode: 0x{:08X}\nBits 23-27: 0b{:05b}, Bits 16-21: 0b{:06b}, Bits 12-21: 0b{:010b}, Bits 0-11: 0b{:012b}",
                op_code,
                op_code.get_bits(23..=27),
                op_code.get_bits(16..=21),
                op_code.get_bits(12..=21),
                op_code.get_bits(0..=11)
            ))
        }
    }
}

/// CPSR is always accessible; SPSR is banked per exception mode and holds
/// the CPSR value from just before the exception.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PsrKind {
    Cpsr,
    Spsr,
}

impl From<bool> for PsrKind {
    fn from(value: bool) -> Self {
        if value { Self::Spsr } else { Self::Cpsr }
    }
}

impl std::fmt::Display for PsrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpsr => write!(f, "CPSR"),
            Self::Spsr => write!(f, "SPSR"),
        }
    }
}

/// How a register-operand shift amount is specified: a 5-bit immediate, or
/// the bottom 8 bits of another register.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ShiftOperator {
    Immediate(u32),
    Register(u32),
}

impl std::fmt::Display for ShiftOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate(value) => write!(f, "#{value}"),
            Self::Register(register) => write!(f, "R{register}"),
        }
    }
}

/// The flexible second operand of a data-processing instruction: a register
/// with an optional barrel-shift, or an 8-bit immediate (`base`) rotated
/// right by `shift` (an even amount, 0-30) — which is how ARM fits constants
/// like 0xFF, 0xFF00, 0xFF0000 into a 12-bit field without covering every
/// 32-bit value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AluSecondOperandInfo {
    Register {
        shift_op: ShiftOperator,
        shift_kind: ShiftKind,
        register: u32,
    },
    Immediate {
        base: u32,
        shift: u32,
    },
}

impl std::fmt::Display for AluSecondOperandInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Register {
                shift_op,
                shift_kind,
                register,
            } => {
                if let ShiftOperator::Immediate(shift) = shift_op
                    && shift == 0
                {
                    return if shift_kind == ShiftKind::Lsl {
                        write!(f, "R{register}")
                    } else if shift_kind == ShiftKind::Ror {
                        write!(f, "R{register}, RRX")
                    } else {
                        write!(f, "R{register}, {shift_kind} #32")
                    };
                }

                write!(f, "R{register}, {shift_kind} {shift_op}")
            }
            Self::Immediate { base, shift } => {
                write!(f, "#{}", base.rotate_right(shift))
            }
        }
    }
}
