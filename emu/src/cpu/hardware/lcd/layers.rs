#![allow(clippy::cast_possible_truncation)]

//! Background layer rendering shared by BG0-BG3: the text-mode (tiled,
//! scrolled) and affine-mode (tiled, rotated/scaled) pixel pipelines.
//! [`layer_obj`] renders sprites separately since OAM has its own format.
//!
//! # Modes
//!
//! DISPCNT bits 0-2 pick one of six background modes. Modes 0-2 are tiled:
//! mode 0 is four text layers, mode 1 swaps BG2 for an affine layer, mode 2
//! drops to two affine layers (BG2/BG3). Modes 3-5 give BG2 a raw bitmap
//! framebuffer instead of tiles — mode 3 is 240x160 direct 15-bit color in
//! one buffer, modes 4/5 are page-flipped (8bpp indexed at full size, or
//! direct color at 160x128) and handled directly by the compositor rather
//! than through this module's traits. Sprites (OBJ) render in every mode.
//!
//! Text layers scroll by an integer (HOFS, VOFS) and read 16-bit tilemap
//! entries (tile index + H/V flip + palette bank) from a map that can span
//! up to four 2KB screen blocks; affine layers instead map screen
//! coordinates through a 2x2 matrix plus a reference point, index a flat
//! 8-bit tilemap (no flip, no palette — always 8bpp), and either wrap or
//! clip at the map edge depending on BGxCNT bit 13. Both feed into the same
//! `Some(PixelInfo)`/`None`-for-transparent contract consumed by the PPU's
//! per-scanline priority sort; palette index 0 is always transparent.

use super::{memory::Memory, registers::Registers, Color, PixelInfo};
use crate::bitwise::Bits;

pub mod layer_0;
pub mod layer_1;
pub mod layer_2;
pub mod layer_3;
pub mod layer_obj;

/// Per-layer register access needed to render a text-mode background; the
/// shared [`render_text_bg`] algorithm is generic over this so BG0-BG3
/// don't each reimplement the tile lookup.
pub trait TextBgConfig {
    fn layer_id(&self) -> u8;
    fn get_scroll(&self, reg: &Registers) -> (u16, u16);
    fn get_screen_size(&self, reg: &Registers) -> (usize, usize);
    fn get_screen_base_block(&self, reg: &Registers) -> u8;
    fn get_char_base_block(&self, reg: &Registers) -> u8;
    /// `true` for 8bpp/256-color, `false` for 4bpp/16-color.
    fn get_color_mode(&self, reg: &Registers) -> bool;
    fn get_priority(&self, reg: &Registers) -> u8;
}

struct TilemapEntry {
    tile_number: usize,
    horizontal_flip: bool,
    vertical_flip: bool,
    palette_bank: usize,
}

/// Resolves `(map-local x, map-local y)` to the tilemap entry's address,
/// accounting for maps wider/taller than one 256px (32-tile) screen block.
fn text_tilemap_addr(
    screen_base: usize,
    map_width: usize,
    map_height: usize,
    tile_x: usize,
    tile_y: usize,
) -> usize {
    let (screen_block_x, local_tile_x) = (tile_x / 32, tile_x % 32);
    let (screen_block_y, local_tile_y) = (tile_y / 32, tile_y % 32);

    // Block layout: a 512px dimension holds two 256px blocks side by side
    // (or stacked); 512x512 is a 2x2 grid indexed row-major.
    let screen_block_offset = match (map_width > 256, map_height > 256) {
        (true, true) => (screen_block_y * 2 + screen_block_x) * 0x800,
        (true, false) => screen_block_x * 0x800,
        (false, true) => screen_block_y * 0x800,
        (false, false) => 0,
    };

    let tilemap_index = local_tile_y * 32 + local_tile_x;
    screen_base + screen_block_offset + tilemap_index * 2
}

fn decode_tilemap_entry(memory: &Memory, addr: usize) -> TilemapEntry {
    let raw = u16::from_le_bytes([memory.video_ram[addr], memory.video_ram[addr + 1]]);
    TilemapEntry {
        tile_number: raw.get_bits(0..=9) as usize,
        horizontal_flip: raw.get_bit(10),
        vertical_flip: raw.get_bit(11),
        palette_bank: raw.get_bits(12..=15) as usize,
    }
}

/// Palette index of one pixel within a tile, 4bpp or 8bpp.
fn tile_palette_index(
    memory: &Memory,
    char_base: usize,
    tile_number: usize,
    is_8bpp: bool,
    px: usize,
    py: usize,
) -> usize {
    if is_8bpp {
        memory.video_ram[char_base + tile_number * 64 + py * 8 + px] as usize
    } else {
        let byte = memory.video_ram[char_base + tile_number * 32 + py * 4 + px / 2];
        if px % 2 == 0 {
            (byte & 0x0F) as usize
        } else {
            (byte >> 4) as usize
        }
    }
}

fn bg_color_at(memory: &Memory, palette_index: usize) -> Color {
    Color::from_palette_color(u16::from_le_bytes([
        memory.bg_palette_ram[palette_index * 2],
        memory.bg_palette_ram[palette_index * 2 + 1],
    ]))
}

/// Renders one pixel of a text-mode background (BG0-BG3 in modes 0-1),
/// generic over the layer's own register layout via [`TextBgConfig`].
pub fn render_text_bg<T: TextBgConfig>(
    config: &T,
    x: usize,
    y: usize,
    memory: &Memory,
    registers: &Registers,
) -> Option<PixelInfo> {
    let (map_width, map_height) = config.get_screen_size(registers);
    let (hofs, vofs) = config.get_scroll(registers);

    let scroll_x = (x + hofs as usize) % map_width;
    let scroll_y = (y + vofs as usize) % map_height;
    let (tile_x, tile_y) = (scroll_x / 8, scroll_y / 8);
    let (pixel_in_tile_x, pixel_in_tile_y) = (scroll_x % 8, scroll_y % 8);

    let screen_base = config.get_screen_base_block(registers) as usize * 0x800;
    let addr = text_tilemap_addr(screen_base, map_width, map_height, tile_x, tile_y);
    let entry = decode_tilemap_entry(memory, addr);

    let final_pixel_x = if entry.horizontal_flip { 7 - pixel_in_tile_x } else { pixel_in_tile_x };
    let final_pixel_y = if entry.vertical_flip { 7 - pixel_in_tile_y } else { pixel_in_tile_y };

    let char_base = config.get_char_base_block(registers) as usize * 0x4000;
    let is_8bpp = config.get_color_mode(registers);
    let palette_index = tile_palette_index(
        memory,
        char_base,
        entry.tile_number,
        is_8bpp,
        final_pixel_x,
        final_pixel_y,
    );
    if palette_index == 0 {
        return None;
    }

    let final_palette_index = if is_8bpp {
        palette_index
    } else {
        entry.palette_bank * 16 + palette_index
    };

    Some(PixelInfo {
        color: bg_color_at(memory, final_palette_index),
        priority: config.get_priority(registers),
        layer: config.layer_id(),
    })
}

/// Per-layer register access needed to render an affine background; only
/// BG2/BG3 implement this (mode 1's BG2, or mode 2's BG2 and BG3).
pub trait AffineBgConfig {
    fn layer_id(&self) -> u8;
    /// PA, PB, PC, PD — 8.8 fixed point.
    fn get_affine_params(&self, reg: &Registers) -> (i16, i16, i16, i16);
    /// Reference point X, Y — 20.8 fixed point.
    fn get_reference_point(&self, reg: &Registers) -> (i32, i32);
    fn get_bg_control(&self, reg: &Registers) -> u16;
}

fn affine_map_size(size_bits: u16) -> i32 {
    match size_bits {
        0 => 128,
        1 => 256,
        2 => 512,
        3 => 1024,
        _ => unreachable!(),
    }
}

/// Wraps or clips an affine texture coordinate to the map, per BGxCNT's
/// wraparound bit. `None` means the pixel is outside a non-wrapping map.
fn affine_wrap_or_clip(coord: i32, map_size: i32, wraparound: bool) -> Option<i32> {
    if wraparound {
        Some(coord.rem_euclid(map_size))
    } else if coord < 0 || coord >= map_size {
        None
    } else {
        Some(coord)
    }
}

/// Renders one pixel of an affine background (BG2/BG3 in modes 1-2).
pub fn render_affine_bg<T: AffineBgConfig>(
    config: &T,
    screen_x: usize,
    screen_y: usize,
    memory: &Memory,
    registers: &Registers,
) -> Option<PixelInfo> {
    let (pa, pb, pc, pd) = config.get_affine_params(registers);
    let (ref_x, ref_y) = config.get_reference_point(registers);

    #[allow(clippy::cast_possible_wrap)] // screen coords 0-239/0-159 always fit i32
    let (sx, sy) = (screen_x as i32, screen_y as i32);
    let texture_x = (i32::from(pa) * sx) + (i32::from(pb) * sy) + ref_x;
    let texture_y = (i32::from(pc) * sx) + (i32::from(pd) * sy) + ref_y;
    let (tex_x, tex_y) = (texture_x >> 8, texture_y >> 8);

    let bgcnt = config.get_bg_control(registers);
    let map_size = affine_map_size(bgcnt.get_bits(14..=15));
    let wraparound = bgcnt.get_bit(13);

    let final_x = affine_wrap_or_clip(tex_x, map_size, wraparound)?;
    let final_y = affine_wrap_or_clip(tex_y, map_size, wraparound)?;

    #[allow(clippy::cast_sign_loss)] // final_x/y are non-negative after the wrap/clip check
    let (tile_x, tile_y, pixel_x, pixel_y) = (
        (final_x / 8) as usize,
        (final_y / 8) as usize,
        (final_x % 8) as usize,
        (final_y % 8) as usize,
    );
    #[allow(clippy::cast_sign_loss)]
    let tiles_per_row = (map_size / 8) as usize;

    let screen_base = bgcnt.get_bits(8..=12) as usize * 0x800;
    let tile_index_addr = screen_base + tile_y * tiles_per_row + tile_x;
    if tile_index_addr >= memory.video_ram.len() {
        return None;
    }
    let tile_index = memory.video_ram[tile_index_addr] as usize;

    // Affine tiles are always 8bpp.
    let char_base = bgcnt.get_bits(2..=3) as usize * 0x4000;
    let pixel_offset = char_base + tile_index * 64 + pixel_y * 8 + pixel_x;
    if pixel_offset >= memory.video_ram.len() {
        return None;
    }
    let palette_index = memory.video_ram[pixel_offset] as usize;
    if palette_index == 0 {
        return None;
    }

    let palette_addr = palette_index * 2;
    if palette_addr + 1 >= memory.bg_palette_ram.len() {
        return None;
    }

    Some(PixelInfo {
        color: bg_color_at(memory, palette_index),
        priority: bgcnt.get_bits(0..=1) as u8,
        layer: config.layer_id(),
    })
}

/// A compositable display layer: four backgrounds plus the sprite layer.
pub trait Layer {
    /// 0-3 for BG0-BG3, 4 for OBJ.
    fn layer_id(&self) -> u8;

    /// Renders the pixel at `(x, y)`, or `None` if it's transparent
    /// (palette index 0, or out of bounds for an affine/bitmap layer).
    fn render(
        &self,
        x: usize,
        y: usize,
        memory: &Memory,
        registers: &Registers,
    ) -> Option<PixelInfo>;
}
