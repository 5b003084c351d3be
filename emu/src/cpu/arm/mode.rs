use crate::bitwise::Bits;
use crate::cpu::arm::instructions::ArmModeInstruction;
use crate::cpu::condition::Condition;

/// A decoded ARM-state opcode: which instruction it is, the condition
/// gating whether it runs, and the raw 32-bit word it came from (kept
/// around for trace/disassembly output).
pub struct ArmModeOpcode {
    pub instruction: ArmModeInstruction,
    pub condition: Condition,
    pub raw: u32,
}

impl TryFrom<u32> for ArmModeOpcode {
    type Error = String;

    fn try_from(op_code: u32) -> Result<Self, Self::Error> {
        Ok(Self {
            instruction: ArmModeInstruction::from(op_code),
            condition: Condition::from(op_code.get_bits(28..=31) as u8),
            raw: op_code,
        })
    }
}

impl std::ops::Deref for ArmModeOpcode {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Static bitfield template shown under each disassembled instruction,
/// keyed by which encoding class it belongs to.
const fn encoding_template(instruction: &ArmModeInstruction) -> &'static str {
    match instruction {
        ArmModeInstruction::DataProcessing { .. } => {
            "FMT: |_Cond__|0_0|I|_code__|S|__Rn___|__Rd___|_______operand2________|"
        }
        ArmModeInstruction::BranchAndExchange { .. } => {
            "FMT: |_Cond__|0_0_0_1|0_0_1_0|1_1_1_1|1_1_1_1|1_1_1_1|0_0_0_1|__Rn___|"
        }
        ArmModeInstruction::HalfwordDataTransferRegisterOffset => {
            "FMT: |_Cond__|0_0_0|P|U|0|W|L|__Rn___|__Rd___|0_0_0_0|1|S|H|1|__Rm___|"
        }
        ArmModeInstruction::HalfwordDataTransferImmediateOffset => {
            "FMT: |_Cond__|0_0_0|P|U|1|W|L|__Rn___|__Rd___|_Offset|1|S|H|1|_Offset|"
        }
        ArmModeInstruction::SingleDataTransfer { .. } => {
            "FMT: |_Cond__|0_1|I|P|U|B|W|L|__Rn___|__Rd___|________Offset_________|"
        }
        ArmModeInstruction::BlockDataTransfer { .. } => {
            "FMT: |_Cond__|1_0_0|P|U|S|W|L|__Rn___|_____________Reg_List__________|"
        }
        ArmModeInstruction::Branch { .. } => {
            "FMT: |_Cond__|1_0_1|L|______________________Offset___________________|"
        }
        ArmModeInstruction::CoprocessorDataTransfer { .. } => {
            "FMT: |_Cond__|1_1_0|P|U|N|W|L|__Rn___|__CRd__|__Cp#__|____Offset_____|"
        }
        ArmModeInstruction::Multiply
        | ArmModeInstruction::MultiplyLong
        | ArmModeInstruction::SingleDataSwap
        | ArmModeInstruction::Undefined
        | ArmModeInstruction::CoprocessorDataOperation
        | ArmModeInstruction::CoprocessorRegisterTransfer
        | ArmModeInstruction::SoftwareInterrupt => "FMT: |_Cond__|",
    }
}

/// Renders a 32-bit word as `1_0_9_..._0`-style underscore-separated bits,
/// matching the bit-position ruler printed above it.
fn underscored_bits(raw: u32) -> String {
    format!("{raw:#034b}")
        .chars()
        .skip(2)
        .map(|bit| format!("{bit}_"))
        .collect::<String>()
        .trim_end_matches('_')
        .to_string()
}

impl std::fmt::Display for ArmModeOpcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const POSITION_RULER_TENS: &str =
            "POS: |..3 ..................2 ..................1 ..................0|\n";
        const POSITION_RULER_ONES: &str =
            "     |1_0_9_8_7_6_5_4_3_2_1_0_9_8_7_6_5_4_3_2_1_0_9_8_7_6_5_4_3_2_1_0|\n";

        writeln!(
            f,
            "INS: {}\n{POSITION_RULER_TENS}{POSITION_RULER_ONES}RAW: |{}|\n{}",
            self.instruction,
            underscored_bits(self.raw),
            encoding_template(&self.instruction),
        )
    }
}
