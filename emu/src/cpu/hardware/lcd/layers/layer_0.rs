//! BG0: one of the four text-mode background layers, available in video
//! modes 0 and 1 (it's disabled in the affine/bitmap modes 2-5). Rendering
//! goes through [`render_text_bg`], shared with BG1-BG3's text-mode paths —
//! see [`layers`](super) for the tile/tilemap format.

use crate::cpu::hardware::lcd::memory::Memory;
use crate::cpu::hardware::lcd::registers::Registers;
use crate::cpu::hardware::lcd::PixelInfo;

use super::{render_text_bg, Layer, TextBgConfig};
use serde::{Deserialize, Serialize};

#[derive(Default, Serialize, Deserialize)]
pub struct Layer0;

impl TextBgConfig for Layer0 {
    fn layer_id(&self) -> u8 {
        0
    }

    fn get_scroll(&self, reg: &Registers) -> (u16, u16) {
        (reg.bg0hofs, reg.bg0vofs)
    }

    fn get_screen_size(&self, reg: &Registers) -> (usize, usize) {
        reg.get_bg0_screen_size()
    }

    fn get_screen_base_block(&self, reg: &Registers) -> u8 {
        reg.get_bg0_screen_base_block()
    }

    fn get_char_base_block(&self, reg: &Registers) -> u8 {
        reg.get_bg0_character_base_block()
    }

    fn get_color_mode(&self, reg: &Registers) -> bool {
        reg.get_bg0_color_mode()
    }

    fn get_priority(&self, reg: &Registers) -> u8 {
        reg.get_bg0_priority()
    }
}

impl Layer for Layer0 {
    fn layer_id(&self) -> u8 {
        0
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
