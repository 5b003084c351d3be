#![allow(clippy::cast_possible_truncation)]

//! Sprite (OBJ) rendering, the one layer not rendered pixel-by-pixel:
//! [`handle_enter_vdraw`](LayerObj::handle_enter_vdraw) walks all 128 OAM
//! entries once per scanline into a `sprite_pixels_scanline` buffer (lower
//! OAM index wins ties at equal priority), and [`Layer::render`] just reads
//! it back. A second pass over the `ObjectWindow`-mode sprites builds the
//! WINOBJ mask used for effects like the flashlight in Pokemon's dark
//! caves, which gate layer visibility by sprite coverage rather than by a
//! rectangle — see [`object_attributes`] for the OAM layout both passes
//! decode and [`layers`](super) for how `layer_2`'s affine math is reused
//! for `RotationScaling`-mode sprites.
//!
//! Sprite tiles live in VRAM from `0x0601_0000`; [`ObjMappingKind`](lcd::ObjMappingKind)
//! picks whether a multi-tile sprite's tiles are consecutive (1D) or laid
//! out in a 32-tile-wide grid shared with the background character data
//! (2D, DISPCNT bit 6).

use crate::cpu::hardware::lcd;
use crate::cpu::hardware::lcd::memory::Memory;
use crate::cpu::hardware::lcd::object_attributes::{
    self, ObjAttributes, ObjMode, ObjShape, ObjSize, TransformationKind,
};
use crate::cpu::hardware::lcd::point::Point;
use crate::cpu::hardware::lcd::registers::Registers;
use crate::cpu::hardware::lcd::Color;
use crate::cpu::hardware::lcd::{PixelInfo, LCD_WIDTH, WORLD_HEIGHT};

use super::Layer;
use serde::Deserialize;
use serde::Serialize;
use serde_with::serde_as;

#[serde_as]
#[derive(Serialize, Deserialize)]
pub struct LayerObj {
    #[serde_as(as = "[_; 128]")]
    obj_attributes_arr: [ObjAttributes; 128],

    #[serde_as(as = "[_; 32]")]
    rotation_scaling_params: [object_attributes::RotationScaling; 32],

    #[serde_as(as = "[_; 240]")]
    sprite_pixels_scanline: [Option<PixelInfo>; LCD_WIDTH],

    /// Set where a `GfxMode::ObjectWindow` sprite is opaque, recomputed
    /// every scanline and not worth persisting across a save state.
    #[serde(skip, default = "default_winobj_mask")]
    winobj_mask: [bool; LCD_WIDTH],
}

const fn default_winobj_mask() -> [bool; LCD_WIDTH] {
    [false; LCD_WIDTH]
}

impl Default for LayerObj {
    fn default() -> Self {
        Self {
            obj_attributes_arr: [ObjAttributes::default(); 128],
            rotation_scaling_params: [object_attributes::RotationScaling::default(); 32],
            sprite_pixels_scanline: [None; LCD_WIDTH],
            winobj_mask: [false; LCD_WIDTH],
        }
    }
}

impl Layer for LayerObj {
    fn layer_id(&self) -> u8 {
        4
    }

    fn render(
        &self,
        x: usize,
        _y: usize,
        _memory: &Memory,
        _registers: &Registers,
    ) -> Option<PixelInfo> {
        self.sprite_pixels_scanline[x]
    }
}

/// Shape + size selects pixel dimensions from a fixed 4x4 table — see
/// `object_attributes` for the GBATEK layout this encodes.
const fn sprite_dimensions(shape: ObjShape, size: ObjSize) -> (u8, u8) {
    match (shape, size) {
        (ObjShape::Square, ObjSize::Size0) => (8, 8),
        (ObjShape::Horizontal, ObjSize::Size0) => (16, 8),
        (ObjShape::Vertical, ObjSize::Size0) => (8, 16),
        (ObjShape::Square, ObjSize::Size1) => (16, 16),
        (ObjShape::Horizontal, ObjSize::Size1) => (32, 8),
        (ObjShape::Vertical, ObjSize::Size1) => (8, 32),
        (ObjShape::Square, ObjSize::Size2) => (32, 32),
        (ObjShape::Horizontal, ObjSize::Size2) => (32, 16),
        (ObjShape::Vertical, ObjSize::Size2) => (16, 32),
        (ObjShape::Square, ObjSize::Size3) => (64, 64),
        (ObjShape::Horizontal, ObjSize::Size3) => (64, 32),
        (ObjShape::Vertical, ObjSize::Size3) => (32, 64),
    }
}

impl LayerObj {
    const fn read_color_from_obj_palette(color_idx: usize, obj_palette_ram: &[u8]) -> Color {
        let byte_offset = color_idx * 2;
        let low_byte = obj_palette_ram[byte_offset] as u16;
        let high_byte = obj_palette_ram[byte_offset + 1] as u16;
        Color::from_palette_color((high_byte << 8) | low_byte)
    }

    /// Maps a pixel from screen space (origin at the sprite's top-left, or
    /// top-left of its doubled bounding box for `AffineDouble`) into
    /// texture space, applying whichever of flip/rotation-scaling/nothing
    /// the sprite uses.
    fn get_texture_space_point(
        &self,
        sprite_size: Point<u16>,
        pixel_screen_sprite_origin: Point<u16>,
        transformation_kind: TransformationKind,
        obj_mode: ObjMode,
    ) -> Point<f64> {
        match transformation_kind {
            TransformationKind::RotationScaling {
                rotation_scaling_parameter,
            } => {
                // f64 throughout: recentering on the sprite's middle can go
                // negative before the transform is applied.
                let rotscale_params = self.rotation_scaling_params[rotation_scaling_parameter as usize];
                let sprite_size = sprite_size.map(f64::from);

                let pixel_screen_sprite_center = pixel_screen_sprite_origin.map(f64::from)
                    - match obj_mode {
                        ObjMode::Affine => sprite_size / 2.0,
                        ObjMode::AffineDouble => sprite_size,
                        _ => unreachable!(),
                    };

                let pixel_texture_sprite_center = pixel_screen_sprite_center * rotscale_params;
                pixel_texture_sprite_center + sprite_size / 2.0
            }
            TransformationKind::Flip {
                horizontal_flip,
                vertical_flip,
            } => {
                let mut pixel_x = f64::from(pixel_screen_sprite_origin.x);
                let mut pixel_y = f64::from(pixel_screen_sprite_origin.y);
                if horizontal_flip {
                    pixel_x = f64::from(sprite_size.x) - 1.0 - pixel_x;
                }
                if vertical_flip {
                    pixel_y = f64::from(sprite_size.y) - 1.0 - pixel_y;
                }
                Point::new(pixel_x, pixel_y)
            }
        }
    }

    /// True if the current scanline `y` falls inside a sprite spanning
    /// `[y_start, y_start + height)` in the 256-row (`WORLD_HEIGHT`)
    /// sprite coordinate space, wrapping past the bottom edge.
    fn scanline_in_sprite(y: u16, y_start: u16, height: u16) -> bool {
        let y_end = (y_start + height) % WORLD_HEIGHT;
        if y_end > y_start {
            y >= y_start && y < y_end
        } else {
            y >= y_start || y < y_end
        }
    }

    /// Resolves one sprite column's tile data address and palette index,
    /// shared by both the 4bpp and 8bpp layouts; returns `None` for a
    /// transparent (index-0) pixel.
    fn tile_color_index(
        obj: &ObjAttributes,
        obj_character_vram_mapping: lcd::ObjMappingKind,
        sprite_size_tile: Point<u16>,
        pixel_texture_tile: Point<u16>,
        x_tile_idx: u16,
        y_tile_idx: u16,
        memory: &Memory,
    ) -> Option<u8> {
        match obj.attribute0.color_mode {
            object_attributes::ColorMode::Palette8bpp => {
                // Each 8bpp (d-)tile occupies two s-tile slots, hence the *2.
                let tile_offset = match obj_character_vram_mapping {
                    lcd::ObjMappingKind::OneDimensional => {
                        pixel_texture_tile.y * sprite_size_tile.x * 2 + pixel_texture_tile.x * 2
                    }
                    lcd::ObjMappingKind::TwoDimensional => {
                        pixel_texture_tile.y * 32 + pixel_texture_tile.x * 2
                    }
                };
                let tile_number = obj.attribute2.tile_number + tile_offset;
                let tile_data_offset = (tile_number << 5) + (y_tile_idx << 3) + x_tile_idx;
                let color_idx = memory.video_ram[0x10000 + tile_data_offset as usize];
                (color_idx != 0).then_some(color_idx)
            }
            object_attributes::ColorMode::Palette4bpp => {
                let tile_offset = match obj_character_vram_mapping {
                    lcd::ObjMappingKind::OneDimensional => {
                        pixel_texture_tile.y * sprite_size_tile.x + pixel_texture_tile.x
                    }
                    lcd::ObjMappingKind::TwoDimensional => {
                        pixel_texture_tile.y * 32 + pixel_texture_tile.x
                    }
                };
                let tile_number = obj.attribute2.tile_number + tile_offset;
                // 32 bytes/tile, 2 pixels/byte.
                let tile_data_offset = (tile_number << 5) + (y_tile_idx << 2) + (x_tile_idx >> 1);
                let pixel_byte = memory.video_ram[0x10000 + tile_data_offset as usize];
                let nibble = if (x_tile_idx & 1) != 0 {
                    pixel_byte >> 4
                } else {
                    pixel_byte & 0x0F
                };
                // Bank is folded in by the caller that wants a palette
                // address; the WINOBJ pass only cares about opacity.
                (nibble != 0).then_some((obj.attribute2.palette_number << 4) | nibble)
            }
        }
    }

    /// Walks every opaque screen column of `obj` on scanline `y`, invoking
    /// `on_opaque_pixel(x_screen, color_index)` for each. `color_index` is
    /// already resolved to an absolute OBJ-palette index for 4bpp sprites;
    /// 8bpp callers that need priority-aware compositing read it directly.
    fn scan_sprite_pixels(
        &self,
        obj: &ObjAttributes,
        y: u16,
        registers: &Registers,
        memory: &Memory,
        mut on_opaque_pixel: impl FnMut(u16, u8),
    ) {
        let (sprite_width, sprite_height) = sprite_dimensions(obj.attribute0.obj_shape, obj.attribute1.obj_size);
        let sprite_size = Point::new(u16::from(sprite_width), u16::from(sprite_height));
        let sprite_size_tile = sprite_size / 8;
        let sprite_position = Point::new(obj.attribute1.x_coordinate, u16::from(obj.attribute0.y_coordinate));

        let is_affine_double = matches!(obj.attribute0.obj_mode, ObjMode::AffineDouble);
        let sprite_screen_size = sprite_size * if is_affine_double { 2 } else { 1 };

        if !Self::scanline_in_sprite(y, sprite_position.y, sprite_screen_size.y) {
            return;
        }

        let obj_character_vram_mapping = registers.get_obj_character_vram_mapping();

        for idx in 0..sprite_screen_size.x {
            let pixel_screen_sprite_origin =
                Point::new(idx, (y + WORLD_HEIGHT - sprite_position.y) % WORLD_HEIGHT);

            if pixel_screen_sprite_origin.x > sprite_screen_size.x
                || pixel_screen_sprite_origin.y > sprite_screen_size.y
            {
                continue;
            }

            let pixel_texture_sprite_origin = self.get_texture_space_point(
                sprite_size,
                pixel_screen_sprite_origin,
                obj.attribute1.transformation_kind,
                obj.attribute0.obj_mode,
            );

            if pixel_texture_sprite_origin.x < 0.0
                || pixel_texture_sprite_origin.y < 0.0
                || pixel_texture_sprite_origin.x >= f64::from(sprite_size.x)
                || pixel_texture_sprite_origin.y >= f64::from(sprite_size.y)
            {
                continue;
            }

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let pixel_texture_sprite_origin = pixel_texture_sprite_origin.map(|el| el as u16);
            let pixel_texture_tile = pixel_texture_sprite_origin / 8;
            let y_tile_idx = pixel_texture_sprite_origin.y % 8;
            let x_tile_idx = pixel_texture_sprite_origin.x % 8;

            // Sprites use a 512-wide virtual X coordinate space; a sprite
            // near the right edge can wrap to appear at the screen's left.
            let x_screen = sprite_position.x.wrapping_add(idx) % 512;
            if x_screen >= self.sprite_pixels_scanline.len() as u16 {
                continue;
            }

            if let Some(color_index) = Self::tile_color_index(
                obj,
                obj_character_vram_mapping,
                sprite_size_tile,
                pixel_texture_tile,
                x_tile_idx,
                y_tile_idx,
                memory,
            ) {
                on_opaque_pixel(x_screen, color_index);
            }
        }
    }

    fn process_sprites_scanline(&mut self, registers: &Registers, memory: &Memory) {
        let y = registers.vcount;
        let mut scanline = [None; LCD_WIDTH];

        for obj in self.obj_attributes_arr {
            if matches!(obj.attribute0.obj_mode, ObjMode::Disabled)
                || matches!(obj.attribute0.gfx_mode, object_attributes::GfxMode::ObjectWindow)
            {
                continue;
            }

            let priority = obj.attribute2.priority;
            self.scan_sprite_pixels(&obj, y, registers, memory, |x_screen, color_index| {
                let pixel = PixelInfo {
                    color: Self::read_color_from_obj_palette(color_index as usize, memory.obj_palette_ram.as_slice()),
                    priority,
                    layer: 4,
                };
                let slot = &mut scanline[x_screen as usize];
                // Equal priority: lower OAM index (processed first) wins, so
                // only a strictly lower priority number replaces it.
                match slot {
                    Some(current) if current.priority <= priority => {}
                    _ => *slot = Some(pixel),
                }
            });
        }

        self.sprite_pixels_scanline = scanline;
    }

    /// Sprites in `GfxMode::ObjectWindow` render nothing themselves;
    /// instead their opaque pixels mark where WINOBJ's layer enables apply
    /// (the flashlight effect in Pokemon's dark caves, for instance).
    fn process_winobj_sprites_scanline(&mut self, registers: &Registers, memory: &Memory) {
        let y = registers.vcount;
        let mut mask = [false; LCD_WIDTH];

        for obj in self.obj_attributes_arr {
            if matches!(obj.attribute0.obj_mode, ObjMode::Disabled)
                || !matches!(obj.attribute0.gfx_mode, object_attributes::GfxMode::ObjectWindow)
            {
                continue;
            }

            self.scan_sprite_pixels(&obj, y, registers, memory, |x_screen, _color_index| {
                if x_screen < LCD_WIDTH as u16 {
                    mask[x_screen as usize] = true;
                }
            });
        }

        self.winobj_mask = mask;
    }

    pub const fn is_in_winobj(&self, x: u8) -> bool {
        self.winobj_mask[x as usize]
    }

    pub fn handle_enter_vdraw(&mut self, memory: &Memory, registers: &Registers) {
        (self.obj_attributes_arr, self.rotation_scaling_params) =
            object_attributes::get_attributes(memory.obj_attributes.as_slice());

        self.process_sprites_scanline(registers, memory);
        self.process_winobj_sprites_scanline(registers, memory);
    }
}
