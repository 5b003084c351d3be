#![allow(clippy::cast_possible_truncation)]

//! LCD controller (PPU): composites backgrounds and sprites into a 240x160,
//! 15-bit-color framebuffer.
//!
//! A frame is 228 scanlines of 308 dots each (280,896 cycles total, ~59.73Hz):
//! lines 0-159 are VDraw (dots 0-239 visible, 240-307 HBlank), lines 160-227
//! are VBlank. [`Lcd::step`] advances by one dot and reports the IRQ/DMA
//! triggers ([`LcdStepOutput`]) the rest of the system needs to react to.
//!
//! DISPCNT bits 0-2 select one of six background modes, each enabling a
//! different mix of [`layers`]: modes 0-2 are tiled/affine BG layers, modes
//! 3-5 repurpose BG2 as a raw bitmap framebuffer. Up to four BG layers plus
//! the OBJ (sprite) layer render independently and are combined here by
//! priority, with window clipping and alpha/brightness blending applied at
//! the end of the pipeline.
use serde::Deserialize;
use serde::Serialize;
use serde_with::serde_as;

use crate::bitwise::Bits;
use crate::cpu::hardware::lcd::layers::Layer;

use self::layers::layer_0::Layer0;
use self::layers::layer_1::Layer1;
use self::layers::layer_2::Layer2;
use self::layers::layer_3::Layer3;
use self::layers::layer_obj::LayerObj;
use self::memory::Memory;
use self::registers::Registers;

mod layers;
mod memory;
mod object_attributes;
mod point;
mod registers;

/// GBA display width
const LCD_WIDTH: usize = 240;

/// GBA display height
const LCD_HEIGHT: usize = 160;

const WORLD_HEIGHT: u16 = 256;

const DOTS_PER_LINE: u32 = 308;
const LINES_PER_FRAME: u16 = 228;

#[derive(Default, Clone, Copy, Serialize, Deserialize)]
pub struct Color(pub u16);

impl Color {
    #[must_use]
    pub const fn from_palette_color(value: u16) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        let red: u16 = red.into();
        let green: u16 = green.into();
        let blue: u16 = blue.into();

        Self((blue << 10) + (green << 5) + red)
    }

    #[must_use]
    pub fn red(&self) -> u8 {
        self.0.get_bits(0..=4) as u8
    }

    #[must_use]
    pub fn green(&self) -> u8 {
        self.0.get_bits(5..=9) as u8
    }

    #[must_use]
    pub fn blue(&self) -> u8 {
        self.0.get_bits(10..=14) as u8
    }
}

#[derive(Debug, Serialize, Deserialize)]
enum ObjMappingKind {
    TwoDimensional,
    OneDimensional,
}

impl From<bool> for ObjMappingKind {
    fn from(value: bool) -> Self {
        if value {
            Self::OneDimensional
        } else {
            Self::TwoDimensional
        }
    }
}

#[derive(Copy, Clone, Default, Serialize, Deserialize)]
struct PixelInfo {
    color: Color,
    priority: u8,
    /// Tie-break key at equal priority: 0-3 for BG0-BG3, 4 for OBJ. OBJ wins
    /// ties against BGs; among BGs the lower number wins.
    layer: u8,
}

/// Per-pixel visibility flags resolved from the window system: (bg0, bg1,
/// bg2, bg3, obj, blend effects).
type LayerVisibility = (bool, bool, bool, bool, bool, bool);

#[serde_as]
#[allow(clippy::large_stack_frames)]
#[derive(Serialize, Deserialize)]
pub struct Lcd {
    pub(crate) registers: Registers,
    pub(crate) memory: Memory,

    #[serde_as(as = "[[_; 240]; 160]")]
    pub buffer: [[Color; LCD_WIDTH]; LCD_HEIGHT],

    pixel_index: u32,
    should_draw: bool,

    layer_0: Layer0,
    layer_1: Layer1,
    layer_2: Layer2,
    layer_3: Layer3,
    layer_obj: LayerObj,
}

impl Default for Lcd {
    #[allow(clippy::large_stack_arrays)]
    fn default() -> Self {
        Self {
            registers: Registers::default(),
            memory: Memory::default(),
            pixel_index: 0,
            buffer: [[Color::default(); LCD_WIDTH]; LCD_HEIGHT],
            should_draw: false,
            layer_0: Layer0,
            layer_1: Layer1,
            layer_2: Layer2,
            layer_3: Layer3,
            layer_obj: LayerObj::default(),
        }
    }
}

#[derive(Default)]
pub struct LcdStepOutput {
    pub request_vblank_irq: bool,
    pub request_hblank_irq: bool,
    pub request_vcount_irq: bool,
    /// Set on the cycle the display enters HBlank, regardless of whether the
    /// HBlank IRQ is enabled. DMA channels in HBlank mode trigger off this.
    pub entered_hblank: bool,
    /// Set on the cycle the display enters VBlank, regardless of IRQ enable.
    pub entered_vblank: bool,
}

impl Lcd {
    pub fn step(&mut self) -> LcdStepOutput {
        let mut output = LcdStepOutput::default();

        self.handle_line_edges(&mut output);

        if self.should_draw {
            self.render_pixel();
        }

        self.pixel_index += 1;
        if self.pixel_index == DOTS_PER_LINE {
            self.pixel_index = 0;
            self.registers.vcount += 1;
            if self.registers.vcount == LINES_PER_FRAME {
                self.registers.vcount = 0;
            }
        }

        self.update_vcounter_flag(&mut output);

        output
    }

    /// Handles the VDraw/HBlank/VBlank transitions at the start of each
    /// relevant dot, updating DISPSTAT flags and requesting IRQs.
    fn handle_line_edges(&mut self, output: &mut LcdStepOutput) {
        if self.registers.vcount < 160 {
            if self.pixel_index == 0 {
                self.registers.set_hblank_flag(false);
                self.registers.set_vblank_flag(false);
                self.should_draw = true;

                self.layer_obj
                    .handle_enter_vdraw(&self.memory, &self.registers);
            } else if self.pixel_index == 240 {
                self.registers.set_hblank_flag(true);
                output.entered_hblank = true;

                if self.registers.get_hblank_irq_enable() {
                    output.request_hblank_irq = true;
                }

                self.should_draw = false;
            }
        } else if self.registers.vcount == 160 && self.pixel_index == 0 {
            self.registers.set_vblank_flag(true);
            output.entered_vblank = true;

            if self.registers.get_vblank_irq_enable() {
                output.request_vblank_irq = true;
            }

            self.should_draw = false;
        }
    }

    fn update_vcounter_flag(&self, output: &mut LcdStepOutput) {
        self.registers.set_vcounter_flag(false);

        if self.registers.vcount.get_byte(0) == self.registers.get_vcount_setting() {
            self.registers.set_vcounter_flag(true);

            if self.registers.get_vcounter_irq_enable() {
                output.request_vcount_irq = true;
            }
        }
    }

    /// Renders and composites the current dot into [`Self::buffer`].
    fn render_pixel(&mut self) {
        let pixel_y = self.registers.vcount;
        let pixel_x = self.pixel_index;

        // Forced blank (DISPCNT bit 7): white screen, layers not consulted.
        if self.registers.dispcnt.get_bit(7) {
            self.buffer[pixel_y as usize][pixel_x as usize] = Color::from_rgb(31, 31, 31);
            return;
        }

        let visibility = self.get_window_layer_visibility(pixel_x as u8, pixel_y as u8);

        let mut layers_with_pixel = self
            .get_enabled_layers()
            .into_iter()
            .filter_map(|layer| {
                if !Self::layer_is_visible(&visibility, layer.layer_id()) {
                    return None;
                }

                layer.render(
                    pixel_x as usize,
                    pixel_y as usize,
                    &self.memory,
                    &self.registers,
                )
            })
            .collect::<Vec<PixelInfo>>();

        // Sort by priority, then OBJ-before-BG, then lower BG number first,
        // by mapping OBJ(4)->0 and BG(n)->n+1 as the tie-break key.
        layers_with_pixel.sort_unstable_by_key(|pixel| {
            let layer_order = if pixel.layer == 4 { 0 } else { pixel.layer + 1 };
            (pixel.priority, layer_order)
        });

        let backdrop_color = Color::from_palette_color(u16::from_le_bytes([
            self.memory.bg_palette_ram[0],
            self.memory.bg_palette_ram[1],
        ]));

        let (top_color, top_layer) = layers_with_pixel
            .first()
            .map_or((backdrop_color, 5_u8), |info| (info.color, info.layer));

        let final_color = if visibility.5 {
            self.apply_blend_effect(top_color, top_layer, &layers_with_pixel, backdrop_color)
        } else {
            top_color
        };

        self.buffer[pixel_y as usize][pixel_x as usize] = final_color;
    }

    fn layer_is_visible(visibility: &LayerVisibility, layer_id: u8) -> bool {
        match layer_id {
            0 => visibility.0,
            1 => visibility.1,
            2 => visibility.2,
            3 => visibility.3,
            4 => visibility.4,
            _ => true,
        }
    }

    fn get_enabled_layers(&self) -> Vec<&dyn Layer> {
        let mut result: Vec<&dyn Layer> = Vec::new();

        let current_mode = self.registers.get_bg_mode();

        if matches!(current_mode, 0 | 1) && self.registers.get_bg0_enabled() {
            result.push(&self.layer_0);
        }

        if matches!(current_mode, 0 | 1) && self.registers.get_bg1_enabled() {
            result.push(&self.layer_1);
        }

        // BG2 is available in every mode
        if self.registers.get_bg2_enabled() {
            result.push(&self.layer_2);
        }

        if matches!(current_mode, 0 | 2) && self.registers.get_bg3_enabled() {
            result.push(&self.layer_3);
        }

        if self.registers.get_obj_enabled() {
            result.push(&self.layer_obj);
        }

        result
    }

    /// Applies BLDCNT/BLDALPHA/BLDY color blending to the top composited
    /// pixel, if the top layer is configured as a blend target.
    fn apply_blend_effect(
        &self,
        top_color: Color,
        top_layer: u8,
        layers: &[PixelInfo],
        backdrop_color: Color,
    ) -> Color {
        let blend_mode = self.registers.get_blend_mode();
        if blend_mode == 0 {
            return top_color;
        }

        if !Self::is_blend_target(self.registers.get_blend_target1(), top_layer) {
            return top_color;
        }

        match blend_mode {
            1 => {
                let target2 = self.registers.get_blend_target2();
                let second_layer = layers
                    .iter()
                    .skip(1)
                    .find(|p| Self::is_blend_target(target2, p.layer));

                let second_color = if let Some(layer) = second_layer {
                    layer.color
                } else if target2.5 {
                    backdrop_color
                } else {
                    return top_color;
                };

                let (eva, evb) = self.registers.get_blend_alpha();
                Self::alpha_blend(top_color, second_color, eva, evb)
            }
            2 => Self::brightness_increase(top_color, self.registers.get_blend_brightness()),
            3 => Self::brightness_decrease(top_color, self.registers.get_blend_brightness()),
            _ => top_color,
        }
    }

    fn is_blend_target(targets: LayerVisibility, layer: u8) -> bool {
        match layer {
            0 => targets.0,
            1 => targets.1,
            2 => targets.2,
            3 => targets.3,
            4 => targets.4,
            5 => targets.5,
            _ => false,
        }
    }

    /// result = (color1 * eva + color2 * evb) / 16, per channel, clamped to 31.
    fn alpha_blend(color1: Color, color2: Color, eva: u8, evb: u8) -> Color {
        let blend_component = |c1: u8, c2: u8| -> u8 {
            let result = (u16::from(c1) * u16::from(eva) + u16::from(c2) * u16::from(evb)) / 16;
            result.min(31) as u8
        };

        Color::from_rgb(
            blend_component(color1.red(), color2.red()),
            blend_component(color1.green(), color2.green()),
            blend_component(color1.blue(), color2.blue()),
        )
    }

    /// Fade to white: result = color + (31 - color) * evy / 16.
    fn brightness_increase(color: Color, evy: u8) -> Color {
        let brighten = |c: u8| -> u8 {
            let result = u16::from(c) + (u16::from(31 - c) * u16::from(evy)) / 16;
            result.min(31) as u8
        };

        Color::from_rgb(
            brighten(color.red()),
            brighten(color.green()),
            brighten(color.blue()),
        )
    }

    /// Fade to black: result = color - color * evy / 16.
    fn brightness_decrease(color: Color, evy: u8) -> Color {
        let darken = |c: u8| -> u8 {
            let result = u16::from(c) - (u16::from(c) * u16::from(evy)) / 16;
            result as u8
        };

        Color::from_rgb(
            darken(color.red()),
            darken(color.green()),
            darken(color.blue()),
        )
    }

    /// Resolves per-layer visibility and blend-effect enable at this pixel
    /// from the window system, checked in WIN0 > WIN1 > WINOBJ > WINOUT
    /// priority order. With no windows enabled, everything is visible.
    fn get_window_layer_visibility(&self, x: u8, y: u8) -> LayerVisibility {
        let win0_enabled = self.registers.get_win0_enabled();
        let win1_enabled = self.registers.get_win1_enabled();
        let winobj_enabled = self.registers.get_winobj_enabled();

        if !win0_enabled && !win1_enabled && !winobj_enabled {
            return (true, true, true, true, true, true);
        }

        if win0_enabled && self.registers.is_in_win0(x, y) {
            return self.registers.get_win0_enables();
        }

        if win1_enabled && self.registers.is_in_win1(x, y) {
            return self.registers.get_win1_enables();
        }

        // TODO: WINOBJ visibility requires checking whether this pixel is
        // covered by an OBJ configured as a window source; not yet wired up.

        self.registers.get_winout_enables()
    }
}
