//! BG1: the other always-text background layer, available in video modes 0
//! and 1. Identical in capability to [`layer_0`](super::layer_0); see
//! [`layers`](super) for the shared rendering algorithm.

use crate::cpu::hardware::lcd::memory::Memory;
use crate::cpu::hardware::lcd::registers::Registers;
use crate::cpu::hardware::lcd::PixelInfo;

use super::{render_text_bg, Layer, TextBgConfig};
use serde::{Deserialize, Serialize};

#[derive(Default, Serialize, Deserialize)]
pub struct Layer1;

impl TextBgConfig for Layer1 {
    fn layer_id(&self) -> u8 {
        1
    }

    fn get_scroll(&self, reg: &Registers) -> (u16, u16) {
        (reg.bg1hofs, reg.bg1vofs)
    }

    fn get_screen_size(&self, reg: &Registers) -> (usize, usize) {
        reg.get_bg1_screen_size()
    }

    fn get_screen_base_block(&self, reg: &Registers) -> u8 {
        reg.get_bg1_screen_base_block()
    }

    fn get_char_base_block(&self, reg: &Registers) -> u8 {
        reg.get_bg1_character_base_block()
    }

    fn get_color_mode(&self, reg: &Registers) -> bool {
        reg.get_bg1_color_mode()
    }

    fn get_priority(&self, reg: &Registers) -> u8 {
        reg.get_bg1_priority()
    }
}

impl Layer for Layer1 {
    fn layer_id(&self) -> u8 {
        1
    }

    fn render(
        &self,
        x: usize,
        y: usize,
        memory: &Memory,
        registers: &Registers,
    ) -> Option<PixelInfo> {
        render_text_bg(self, x, y, memory, registers)
    }
}
