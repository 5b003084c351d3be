use crate::cpu::thumb::instruction::ThumbModeInstruction;

/// A decoded Thumb-state opcode together with the raw halfword it came
/// from, kept for trace/disassembly output.
#[derive(Copy, Clone)]
pub struct ThumbModeOpcode {
    pub instruction: ThumbModeInstruction,
    pub raw: u16,
}

impl TryFrom<u16> for ThumbModeOpcode {
    type Error = String;

    fn try_from(op_code: u16) -> Result<Self, Self::Error> {
        Ok(Self {
            instruction: ThumbModeInstruction::from(op_code),
            raw: op_code,
        })
    }
}

impl std::ops::Deref for ThumbModeOpcode {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

const fn encoding_template(instruction: &ThumbModeInstruction) -> &'static str {
    match instruction {
        ThumbModeInstruction::MoveShiftedRegister { .. } => {
            "FMT: |0_0_1|Op_|__Offset_|_Rs__|_Rd__|"
        }
        ThumbModeInstruction::AddSubtract { .. } => "FMT: |0_0_0_1_1|I|O|RnOff|_Rs__|_Rd__|",
        ThumbModeInstruction::MoveCompareAddSubtractImm { .. } => {
            "FMT: |0_0_1|Op_|_Rn__|____Offset_____|"
        }
        ThumbModeInstruction::AluOp { .. } => "FMT: |0_1_0_0_0_0|__Op___|_Rs__|_Rd__|",
        ThumbModeInstruction::HiRegisterOpBX { .. } => "FMT: |0_1_0_0_0_1|_Op|H|H|Rs/Hs|Rd/Hd|",
        ThumbModeInstruction::PCRelativeLoad { .. } => "FMT: |0_1_0_0_1|_Rn__|_____Word8_____|",
        ThumbModeInstruction::LoadStoreRegisterOffset { .. } => {
            "FMT: |0_1_0_1|L|B|0|_Ro__|_Rb__|_Rd__|"
        }
        ThumbModeInstruction::LoadStoreSignExtByteHalfword { .. } => {
            "FMT: |0_1_0_1|H|S|1|_Ro__|_Rb__|_Rd__|"
        }
        ThumbModeInstruction::LoadStoreImmOffset => "FMT: |0_1_1|B|L|_Offset5_|_Rb__|_Rd__|",
        ThumbModeInstruction::LoadStoreHalfword { .. } => "FMT: |1_0_0_0|L|_Offset5_|_Rb__|_Rd__|",
        ThumbModeInstruction::SPRelativeLoadStore { .. } => "FMT: |1_0_0_1|L|_Rd__|_____Word8_____|",
        ThumbModeInstruction::LoadAddress { .. } => "FMT: |1_0_0_1|S|_Rd__|_____Word8_____|",
        ThumbModeInstruction::AddOffsetSP { .. } => "FMT: |1_0_1_1_0_0_0_0|S|____Word7____|",
        ThumbModeInstruction::PushPopReg { .. } => "FMT: |1_0_1_1|L|1_0|R|_____Rlist_____|",
        ThumbModeInstruction::MultipleLoadStore { .. } => "FMT: |1_1_0_0|L|_Rb__|_____Rlist_____|",
        ThumbModeInstruction::CondBranch { .. } => "FMT: |1_1_0_1|_Cond__|_____Offset____|",
        ThumbModeInstruction::Swi => "FMT: |1_1_0_1_1_1_1_1|_____Value8____|",
        ThumbModeInstruction::UncondBranch { .. } => "FMT: |1_1_1_0_0|________Offset11_____|",
        ThumbModeInstruction::LongBranchLink { .. } => "FMT: |1_1_1_1|H|_______Offset________|",
    }
}

fn underscored_bits(raw: u16) -> String {
    format!("{raw:#018b}")
        .chars()
        .skip(2)
        .map(|bit| format!("{bit}_"))
        .collect::<String>()
        .trim_end_matches('_')
        .to_string()
}

impl std::fmt::Display for ThumbModeOpcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const POSITION_RULER_TENS: &str = "POS: |..........1 ..................0|\n";
        const POSITION_RULER_ONES: &str = "     |5_4_3_2_1_0_9_8_7_6_5_4_3_2_1_0|\n";

        writeln!(
            f,
            "INS: {}\n{POSITION_RULER_TENS}{POSITION_RULER_ONES}RAW: |{}|\n{}",
            self.instruction,
            underscored_bits(self.raw),
            encoding_template(&self.instruction),
        )
    }
}
