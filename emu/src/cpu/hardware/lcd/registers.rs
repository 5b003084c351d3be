#![allow(clippy::cast_possible_truncation)]

//! DISPCNT/DISPSTAT/VCOUNT, the four BGxCNT + scroll/affine register
//! groups, the window system, and the blend unit — everything mapped at
//! `0x0400_0000`-`0x0400_0057` that feeds the PPU's per-scanline decisions.
//!
//! Background mode (DISPCNT bits 0-2) selects which of BG0-BG3 are text,
//! affine, or bitmap layers; see [`layers`](super::layers) for what each
//! mode actually draws. Windows (WIN0, WIN1, WINOBJ) independently gate
//! layer/effect visibility within a rectangle, in that priority order, with
//! WINOUT covering everything outside all three; window bounds wrap around
//! the screen edge when `right < left` or `bottom < top`.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

use super::ObjMappingKind;

/// Layer enable flags as read from WININ/WINOUT: (BG0, BG1, BG2, BG3, OBJ,
/// color special effects).
pub(super) type LayerEnables = (bool, bool, bool, bool, bool, bool);

/// Raw LCD I/O register file, `0x0400_0000`-`0x0400_0057`.
#[derive(Default, Serialize, Deserialize)]
pub struct Registers {
    pub dispcnt: u16,
    /// Undocumented.
    pub green_swap: u16,
    pub dispstat: u16,
    pub vcount: u16,
    pub bg0cnt: u16,
    pub bg1cnt: u16,
    pub bg2cnt: u16,
    pub bg3cnt: u16,
    pub bg0hofs: u16,
    pub bg0vofs: u16,
    pub bg1hofs: u16,
    pub bg1vofs: u16,
    pub bg2hofs: u16,
    pub bg2vofs: u16,
    pub bg3hofs: u16,
    pub bg3vofs: u16,
    pub bg2pa: u16,
    pub bg2pb: u16,
    pub bg2pc: u16,
    pub bg2pd: u16,
    pub bg2x: u32,
    pub bg2y: u32,
    pub bg3pa: u16,
    pub bg3pb: u16,
    pub bg3pc: u16,
    pub bg3pd: u16,
    pub bg3x: u32,
    pub bg3y: u32,
    pub win0h: u16,
    pub win1h: u16,
    pub win0v: u16,
    pub win1v: u16,
    pub winin: u16,
    pub winout: u16,
    pub mosaic: u16,
    pub bldcnt: u16,
    pub bldalpha: u16,
    pub bldy: u16,
}

/// Decodes a BGxCNT value: the four background control registers share one
/// bit layout, differing only in which raw `u16` backs them.
fn bg_screen_size(bgcnt: u16) -> (usize, usize) {
    match bgcnt.get_bits(14..=15) {
        0 => (256, 256),
        1 => (512, 256),
        2 => (256, 512),
        3 => (512, 512),
        _ => unreachable!(),
    }
}

impl Registers {
    pub(super) fn get_bg0_enabled(&self) -> bool {
        self.dispcnt.get_bit(8)
    }

    pub(super) fn get_bg1_enabled(&self) -> bool {
        self.dispcnt.get_bit(9)
    }

    pub(super) fn get_bg2_enabled(&self) -> bool {
        self.dispcnt.get_bit(10)
    }

    pub(super) fn get_bg3_enabled(&self) -> bool {
        self.dispcnt.get_bit(11)
    }

    pub(super) fn get_obj_enabled(&self) -> bool {
        self.dispcnt.get_bit(12)
    }

    pub(super) fn get_bg_mode(&self) -> u8 {
        self.dispcnt.get_bits(0..=2).try_into().unwrap()
    }

    pub(super) fn get_obj_character_vram_mapping(&self) -> ObjMappingKind {
        self.dispcnt.get_bit(6).into()
    }

    pub(super) fn get_vcount_setting(&self) -> u8 {
        self.dispstat.get_byte(1)
    }

    pub(super) fn get_vblank_irq_enable(&self) -> bool {
        self.dispstat.get_bit(3)
    }

    pub(super) fn get_hblank_irq_enable(&self) -> bool {
        self.dispstat.get_bit(4)
    }

    pub(super) fn get_vcounter_irq_enable(&self) -> bool {
        self.dispstat.get_bit(5)
    }

    pub(super) fn set_vblank_flag(&mut self, value: bool) {
        self.dispstat.set_bit(0, value);
    }

    pub(super) fn set_hblank_flag(&mut self, value: bool) {
        self.dispstat.set_bit(1, value);
    }

    pub(super) fn set_vcounter_flag(&mut self, value: bool) {
        self.dispstat.set_bit(2, value);
    }

    pub(super) fn get_bg0_priority(&self) -> u8 {
        self.bg0cnt.get_bits(0..=1) as u8
    }

    pub(super) fn get_bg0_character_base_block(&self) -> u8 {
        self.bg0cnt.get_bits(2..=3) as u8
    }

    pub(super) fn get_bg0_screen_base_block(&self) -> u8 {
        self.bg0cnt.get_bits(8..=12) as u8
    }

    pub(super) fn get_bg0_color_mode(&self) -> bool {
        self.bg0cnt.get_bit(7)
    }

    /// Text-mode pixel span for BG0, derived from its size field: 0 = one
    /// 32x32-tile block, 1/2 = two blocks side by side or stacked, 3 = a
    /// 2x2 grid of blocks.
    pub(super) fn get_bg0_screen_size(&self) -> (usize, usize) {
        bg_screen_size(self.bg0cnt)
    }

    pub(super) fn get_bg1_priority(&self) -> u8 {
        self.bg1cnt.get_bits(0..=1) as u8
    }

    pub(super) fn get_bg1_character_base_block(&self) -> u8 {
        self.bg1cnt.get_bits(2..=3) as u8
    }

    pub(super) fn get_bg1_screen_base_block(&self) -> u8 {
        self.bg1cnt.get_bits(8..=12) as u8
    }

    pub(super) fn get_bg1_color_mode(&self) -> bool {
        self.bg1cnt.get_bit(7)
    }

    pub(super) fn get_bg1_screen_size(&self) -> (usize, usize) {
        bg_screen_size(self.bg1cnt)
    }

    pub(super) fn get_bg2_priority(&self) -> u8 {
        self.bg2cnt.get_bits(0..=1) as u8
    }

    pub(super) fn get_bg2_character_base_block(&self) -> u8 {
        self.bg2cnt.get_bits(2..=3) as u8
    }

    pub(super) fn get_bg2_screen_base_block(&self) -> u8 {
        self.bg2cnt.get_bits(8..=12) as u8
    }

    pub(super) fn get_bg2_color_mode(&self) -> bool {
        self.bg2cnt.get_bit(7)
    }

    /// Note: in affine modes 1-2 BG2's size bits mean something different
    /// from text mode (a single affine map, not a multi-block grid) —
    /// callers in affine modes don't use this accessor.
    pub(super) fn get_bg2_screen_size(&self) -> (usize, usize) {
        bg_screen_size(self.bg2cnt)
    }

    pub(super) fn get_bg3_priority(&self) -> u8 {
        self.bg3cnt.get_bits(0..=1) as u8
    }

    pub(super) fn get_bg3_character_base_block(&self) -> u8 {
        self.bg3cnt.get_bits(2..=3) as u8
    }

    pub(super) fn get_bg3_screen_base_block(&self) -> u8 {
        self.bg3cnt.get_bits(8..=12) as u8
    }

    pub(super) fn get_bg3_color_mode(&self) -> bool {
        self.bg3cnt.get_bit(7)
    }

    pub(super) fn get_bg3_screen_size(&self) -> (usize, usize) {
        bg_screen_size(self.bg3cnt)
    }

    pub(super) fn get_win0_enabled(&self) -> bool {
        self.dispcnt.get_bit(13)
    }

    pub(super) fn get_win1_enabled(&self) -> bool {
        self.dispcnt.get_bit(14)
    }

    pub(super) fn get_winobj_enabled(&self) -> bool {
        self.dispcnt.get_bit(15)
    }

    fn get_win0_left(&self) -> u8 {
        self.win0h.get_byte(1)
    }
    fn get_win0_right(&self) -> u8 {
        self.win0h.get_byte(0)
    }
    fn get_win0_top(&self) -> u8 {
        self.win0v.get_byte(1)
    }
    fn get_win0_bottom(&self) -> u8 {
        self.win0v.get_byte(0)
    }

    fn get_win1_left(&self) -> u8 {
        self.win1h.get_byte(1)
    }
    fn get_win1_right(&self) -> u8 {
        self.win1h.get_byte(0)
    }
    fn get_win1_top(&self) -> u8 {
        self.win1v.get_byte(1)
    }
    fn get_win1_bottom(&self) -> u8 {
        self.win1v.get_byte(0)
    }

    /// Decodes a WININ/WINOUT half (bits 0-5 or 8-13) into layer enables.
    fn layer_enables(raw: u16, shift: u8) -> LayerEnables {
        (
            raw.get_bit(shift),
            raw.get_bit(shift + 1),
            raw.get_bit(shift + 2),
            raw.get_bit(shift + 3),
            raw.get_bit(shift + 4),
            raw.get_bit(shift + 5),
        )
    }

    pub(super) fn get_win0_enables(&self) -> LayerEnables {
        Self::layer_enables(self.winin, 0)
    }

    pub(super) fn get_win1_enables(&self) -> LayerEnables {
        Self::layer_enables(self.winin, 8)
    }

    pub(super) fn get_winout_enables(&self) -> LayerEnables {
        Self::layer_enables(self.winout, 0)
    }

    /// WINOBJ applies to pixels covered by a sprite in `GfxMode::ObjectWindow`.
    pub(super) fn get_winobj_enables(&self) -> LayerEnables {
        Self::layer_enables(self.winout, 8)
    }

    pub(super) fn is_in_win0(&self, x: u8, y: u8) -> bool {
        in_horizontal_range(self.get_win0_left(), self.get_win0_right(), x)
            && in_vertical_range(self.get_win0_top(), self.get_win0_bottom(), y)
    }

    pub(super) fn is_in_win1(&self, x: u8, y: u8) -> bool {
        in_horizontal_range(self.get_win1_left(), self.get_win1_right(), x)
            && in_vertical_range(self.get_win1_top(), self.get_win1_bottom(), y)
    }

    /// BLDCNT bits 6-7: 0 off, 1 alpha blend, 2 brighten toward white, 3
    /// darken toward black.
    pub(super) fn get_blend_mode(&self) -> u8 {
        self.bldcnt.get_bits(6..=7) as u8
    }

    /// BLDCNT bits 0-5: which layers (BG0-3, OBJ, backdrop) participate as
    /// the first blend target.
    pub(super) fn get_blend_target1(&self) -> LayerEnables {
        Self::layer_enables(self.bldcnt, 0)
    }

    /// BLDCNT bits 8-13: second blend target set, only meaningful in alpha
    /// blend mode.
    pub(super) fn get_blend_target2(&self) -> LayerEnables {
        Self::layer_enables(self.bldcnt, 8)
    }

    /// EVA/EVB alpha blend coefficients from BLDALPHA, each clamped to 0-16
    /// sixteenths.
    pub(super) fn get_blend_alpha(&self) -> (u8, u8) {
        let eva = (self.bldalpha.get_bits(0..=4) as u8).min(16);
        let evb = (self.bldalpha.get_bits(8..=12) as u8).min(16);
        (eva, evb)
    }

    /// EVY brightness coefficient from BLDY, clamped to 0-16 sixteenths.
    pub(super) fn get_blend_brightness(&self) -> u8 {
        (self.bldy.get_bits(0..=4) as u8).min(16)
    }
}

/// Is `x` in `[left, right)`, wrapping around the screen edge when
/// `right < left`? Equal bounds denote an empty window.
fn in_horizontal_range(left: u8, right: u8, x: u8) -> bool {
    match right.cmp(&left) {
        std::cmp::Ordering::Greater => x >= left && x < right,
        std::cmp::Ordering::Less => x >= left || x < right,
        std::cmp::Ordering::Equal => false,
    }
}

/// Is `y` in `[top, bottom)`, wrapping around the screen edge when
/// `bottom < top`? Equal bounds denote an empty window.
fn in_vertical_range(top: u8, bottom: u8, y: u8) -> bool {
    match bottom.cmp(&top) {
        std::cmp::Ordering::Greater => y >= top && y < bottom,
        std::cmp::Ordering::Less => y >= top || y < bottom,
        std::cmp::Ordering::Equal => false,
    }
}
