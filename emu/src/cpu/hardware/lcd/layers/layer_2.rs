//! BG2: the only layer available in every video mode. Text-mode in modes
//! 0-1, affine in mode 2 (2x2 matrix + reference point, see
//! [`layers`](super)), and in modes 3-5 a raw VRAM bitmap framebuffer with
//! no tiles at all — mode 3 is a full-screen 15-bit direct-color buffer,
//! mode 4 page-flips between two 8bpp indexed buffers, mode 5 page-flips
//! two smaller (160x128) direct-color buffers and reads transparent outside
//! that rectangle.

use crate::cpu::hardware::lcd::memory::Memory;
use crate::cpu::hardware::lcd::registers::Registers;
use crate::cpu::hardware::lcd::{Color, PixelInfo};

use super::{render_affine_bg, render_text_bg, AffineBgConfig, Layer, TextBgConfig};
use serde::{Deserialize, Serialize};

#[derive(Default, Serialize, Deserialize)]
pub struct Layer2;

impl TextBgConfig for Layer2 {
    fn layer_id(&self) -> u8 {
        2
    }

    fn get_scroll(&self, reg: &Registers) -> (u16, u16) {
        (reg.bg2hofs, reg.bg2vofs)
    }

    fn get_screen_size(&self, reg: &Registers) -> (usize, usize) {
        reg.get_bg2_screen_size()
    }

    fn get_screen_base_block(&self, reg: &Registers) -> u8 {
        reg.get_bg2_screen_base_block()
    }

    fn get_char_base_block(&self, reg: &Registers) -> u8 {
        reg.get_bg2_character_base_block()
    }

    fn get_color_mode(&self, reg: &Registers) -> bool {
        reg.get_bg2_color_mode()
    }

    fn get_priority(&self, reg: &Registers) -> u8 {
        reg.get_bg2_priority()
    }
}

impl AffineBgConfig for Layer2 {
    fn layer_id(&self) -> u8 {
        2
    }

    #[allow(clippy::cast_possible_wrap)]
    fn get_affine_params(&self, reg: &Registers) -> (i16, i16, i16, i16) {
        (reg.bg2pa as i16, reg.bg2pb as i16, reg.bg2pc as i16, reg.bg2pd as i16)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn get_reference_point(&self, reg: &Registers) -> (i32, i32) {
        (reg.bg2x as i32, reg.bg2y as i32)
    }

    fn get_bg_control(&self, reg: &Registers) -> u16 {
        reg.bg2cnt
    }
}

impl Layer for Layer2 {
    fn layer_id(&self) -> u8 {
        2
    }

    fn render(
        &self,
        x: usize,
        y: usize,
        memory: &Memory,
        registers: &Registers,
    ) -> Option<PixelInfo> {
        match registers.get_bg_mode() {
            0 | 1 => render_text_bg(self, x, y, memory, registers),
            2 => render_affine_bg(self, x, y, memory, registers),
            3 => direct_color_bitmap(memory, x, y, 240, 2),
            4 => indexed_bitmap(memory, registers, x, y),
            5 => direct_color_bitmap(memory, x, y, 160, 2).filter(|_| x < 160 && y < 128),
            _ => None,
        }
    }
}

fn read_u16_le(memory: &Memory, offset: usize) -> Option<u16> {
    memory
        .video_ram
        .get(offset..offset + 2)
        .map(|bytes| u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Mode 3 (stride 240) and mode 5 (stride 160, caller bounds-checks the
/// smaller visible rectangle): a flat 15-bit-color framebuffer, 2 bytes/px.
fn direct_color_bitmap(memory: &Memory, x: usize, y: usize, stride: usize, bytes_per_px: usize) -> Option<PixelInfo> {
    let offset = (y * stride + x) * bytes_per_px;
    let color = read_u16_le(memory, offset)?;
    Some(PixelInfo {
        color: Color::from_palette_color(color),
        priority: 0,
        layer: 2,
    })
}

/// Mode 4: 240x160 8bpp indexed, page-flipped via DISPCNT bit 4.
fn indexed_bitmap(memory: &Memory, registers: &Registers, x: usize, y: usize) -> Option<PixelInfo> {
    use crate::bitwise::Bits;

    let frame_offset = if registers.dispcnt.get_bit(4) { 0xA000 } else { 0 };
    let offset = frame_offset + y * 240 + x;
    let palette_index = *memory.video_ram.get(offset)? as usize;
    if palette_index == 0 {
        return None;
    }

    let color = u16::from_le_bytes([
        memory.bg_palette_ram[palette_index * 2],
        memory.bg_palette_ram[palette_index * 2 + 1],
    ]);
    Some(PixelInfo {
        color: Color::from_palette_color(color),
        priority: 0,
        layer: 2,
    })
}
