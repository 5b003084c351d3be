#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]

//! OAM parsing: turning the raw 1 KiB object attribute table into the 128
//! sprite descriptors and 32 affine parameter sets the compositor reads.
//!
//! OAM packs 128 eight-byte entries. The first three 16-bit words are
//! Attribute 0 (Y, object/graphics mode, mosaic, color depth, shape),
//! Attribute 1 (X, flip-or-affine-index, size) and Attribute 2 (tile,
//! priority, palette bank); the fourth word is unused by the sprite itself
//! and instead holds one quarter of a rotation/scaling parameter set,
//! spread across four consecutive entries (entry `4*g + k` holds parameter
//! `k` of affine group `g`). Shape and [`ObjSize`] together pick the
//! sprite's pixel dimensions — see GBATEK's OAM attribute tables for the
//! full 4x4 size grid this encodes.
//!
//! References: TONC <https://www.coranac.com/tonc/text/regobj.htm>,
//! GBATEK <https://problemkaputt.de/gbatek.htm#lcdobjoamattributes>.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

/// Attribute 0 bits 8-9: whether/how affine transforms apply.
#[derive(Default, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum ObjMode {
    #[default]
    Normal,
    Affine,
    Disabled,
    /// Affine with a doubled bounding box, so the transformed sprite isn't
    /// clipped by its own untransformed extents.
    AffineDouble,
}

impl From<u16> for ObjMode {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Normal,
            1 => Self::Affine,
            2 => Self::Disabled,
            3 => Self::AffineDouble,
            _ => unreachable!(),
        }
    }
}

/// Attribute 0 bits 10-11: special compositing behavior for this sprite.
#[derive(Default, Clone, Copy, Serialize, Deserialize)]
pub enum GfxMode {
    #[default]
    Normal,
    AlphaBlending,
    /// Sprite contributes no pixels itself; covered pixels gate the OBJ
    /// window instead.
    ObjectWindow,
}

impl TryFrom<u16> for GfxMode {
    type Error = &'static str;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Normal),
            1 => Ok(Self::AlphaBlending),
            2 => Ok(Self::ObjectWindow),
            4 => Err("Forbidden GfxMode"),
            _ => unreachable!(),
        }
    }
}

/// Attribute 0 bit 13: tile color depth.
#[derive(Default, Clone, Copy, Serialize, Deserialize)]
pub enum ColorMode {
    /// 32-byte tiles, 16-color palette bank selected per sprite.
    #[default]
    Palette4bpp,
    /// 64-byte tiles, full 256-color OBJ palette.
    Palette8bpp,
}

impl From<bool> for ColorMode {
    fn from(value: bool) -> Self {
        if value {
            Self::Palette8bpp
        } else {
            Self::Palette4bpp
        }
    }
}

/// Attribute 0 bits 14-15, paired with [`ObjSize`] to pick pixel dimensions.
#[derive(Default, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum ObjShape {
    #[default]
    Square,
    Horizontal,
    Vertical,
}

impl TryFrom<u16> for ObjShape {
    type Error = &'static str;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Square),
            1 => Ok(Self::Horizontal),
            2 => Ok(Self::Vertical),
            3 => Err("Prohibited ObjShape"),
            _ => unreachable!(),
        }
    }
}

/// Attribute 1 bits 14-15, the other half of the shape/size pair.
#[derive(Default, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum ObjSize {
    #[default]
    Size0,
    Size1,
    Size2,
    Size3,
}

impl From<u16> for ObjSize {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Size0,
            1 => Self::Size1,
            2 => Self::Size2,
            3 => Self::Size3,
            _ => unreachable!(),
        }
    }
}

/// First 16-bit word of an OAM entry.
#[derive(Default, Clone, Copy, Serialize, Deserialize)]
pub struct ObjAttribute0 {
    /// 0-255; values at or above 160 denote a sprite wrapped in from the
    /// bottom and actually visible at the top of the screen.
    pub y_coordinate: u8,
    pub obj_mode: ObjMode,
    pub gfx_mode: GfxMode,
    obj_mosaic: bool,
    pub color_mode: ColorMode,
    pub obj_shape: ObjShape,
}

impl TryFrom<u16> for ObjAttribute0 {
    type Error = &'static str;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(Self {
            y_coordinate: value.get_bits(0..=7) as u8,
            obj_mode: value.get_bits(8..=9).into(),
            gfx_mode: value.get_bits(10..=11).try_into().unwrap(),
            obj_mosaic: value.get_bit(12),
            color_mode: value.get_bit(13).into(),
            obj_shape: value.get_bits(14..=15).try_into().unwrap(),
        })
    }
}

/// What bits 9-13 of Attribute 1 mean, which depends on [`ObjMode`]:
/// an affine parameter-set index for affine sprites, or a flip pair for
/// normal ones.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub enum TransformationKind {
    RotationScaling { rotation_scaling_parameter: u8 },
    Flip { horizontal_flip: bool, vertical_flip: bool },
}

impl Default for TransformationKind {
    fn default() -> Self {
        Self::Flip {
            horizontal_flip: false,
            vertical_flip: false,
        }
    }
}

/// Second 16-bit word of an OAM entry.
#[derive(Default, Clone, Copy, Serialize, Deserialize)]
pub struct ObjAttribute1 {
    /// 0-511; values at or above 240 wrap in from the left edge.
    pub x_coordinate: u16,
    pub transformation_kind: TransformationKind,
    pub obj_size: ObjSize,
}

impl ObjAttribute1 {
    fn from_value(value: u16, obj_mode: ObjMode) -> Self {
        Self {
            x_coordinate: value.get_bits(0..=8),
            transformation_kind: match obj_mode {
                ObjMode::Affine | ObjMode::AffineDouble => TransformationKind::RotationScaling {
                    rotation_scaling_parameter: value.get_bits(9..=13) as u8,
                },
                ObjMode::Normal | ObjMode::Disabled => TransformationKind::Flip {
                    horizontal_flip: value.get_bit(12),
                    vertical_flip: value.get_bit(13),
                },
            },
            obj_size: value.get_bits(14..=15).into(),
        }
    }
}

/// Third 16-bit word of an OAM entry.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct ObjAttribute2 {
    /// Base tile index into OBJ character data (`0x0601_0000`+); further
    /// tiles follow per the size and the 1D/2D mapping mode in DISPCNT.
    pub tile_number: u16,
    /// 0 (drawn on top) to 3; ties against other sprites go to the lower
    /// OAM index.
    pub priority: u8,
    /// 4bpp palette bank, 0-15; ignored for 8bpp sprites.
    pub palette_number: u8,
}

impl Default for ObjAttribute2 {
    fn default() -> Self {
        Self {
            tile_number: 0,
            priority: 3,
            palette_number: 0,
        }
    }
}

impl From<u16> for ObjAttribute2 {
    fn from(value: u16) -> Self {
        Self {
            tile_number: value.get_bits(0..=9),
            priority: value.get_bits(10..=11) as u8,
            palette_number: value.get_bits(12..=15) as u8,
        }
    }
}

#[derive(Default, Clone, Copy, Serialize, Deserialize)]
pub struct ObjAttributes {
    pub attribute0: ObjAttribute0,
    pub attribute1: ObjAttribute1,
    pub attribute2: ObjAttribute2,
}

impl TryFrom<[u16; 3]> for ObjAttributes {
    type Error = &'static str;
    fn try_from(value: [u16; 3]) -> Result<Self, Self::Error> {
        let attribute0: ObjAttribute0 = value[0].try_into().unwrap();

        Ok(Self {
            attribute0,
            attribute1: ObjAttribute1::from_value(value[1], attribute0.obj_mode),
            attribute2: value[2].into(),
        })
    }
}

/// One 2x2 affine transform `[[pa, pb], [pc, pd]]`, stored as signed 8.8
/// fixed point and shared by up to 128 sprites that reference its group.
#[derive(Default, Copy, Clone, Debug, Serialize, Deserialize)]
pub struct RotationScaling {
    pub pa: u16,
    pub pb: u16,
    pub pc: u16,
    pub pd: u16,
}

impl RotationScaling {
    /// Maps a point through this sprite's transform matrix: `P * (x, y)`.
    #[allow(clippy::many_single_char_names)]
    pub fn apply(self, x: f64, y: f64) -> (f64, f64) {
        let a = Self::fixed_to_float(self.pa);
        let b = Self::fixed_to_float(self.pb);
        let c = Self::fixed_to_float(self.pc);
        let d = Self::fixed_to_float(self.pd);

        (x.mul_add(a, y * b), x.mul_add(c, y * d))
    }

    fn fixed_to_float(value: u16) -> f64 {
        #[allow(clippy::cast_possible_wrap)]
        let signed = value as i16;
        f64::from(signed) / 256.0
    }
}

impl Index<usize> for RotationScaling {
    type Output = u16;
    fn index(&self, index: usize) -> &Self::Output {
        match index {
            0 => &self.pa,
            1 => &self.pb,
            2 => &self.pc,
            3 => &self.pd,
            _ => panic!("Index out of bound"),
        }
    }
}

impl IndexMut<usize> for RotationScaling {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        match index {
            0 => &mut self.pa,
            1 => &mut self.pb,
            2 => &mut self.pc,
            3 => &mut self.pd,
            _ => panic!("Index out of bound"),
        }
    }
}

fn le16(lo: u8, hi: u8) -> u16 {
    u16::from_le_bytes([lo, hi])
}

/// Decodes OAM's 128 sprite entries and the 32 affine parameter sets woven
/// through their unused fourth words.
pub fn get_attributes(oam_memory: &[u8]) -> ([ObjAttributes; 128], [RotationScaling; 32]) {
    let mut obj_attributes = [ObjAttributes::default(); 128];
    let mut rotation_scalings = [RotationScaling::default(); 32];

    for (idx, entry) in oam_memory.chunks_exact(8).enumerate() {
        let words = [
            le16(entry[0], entry[1]),
            le16(entry[2], entry[3]),
            le16(entry[4], entry[5]),
        ];
        obj_attributes[idx] = words.try_into().unwrap();
        rotation_scalings[idx / 4][idx % 4] = le16(entry[6], entry[7]);
    }

    (obj_attributes, rotation_scalings)
}
