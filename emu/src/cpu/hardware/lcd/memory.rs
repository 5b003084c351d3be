//! The memory regions the PPU draws from: palette RAM, VRAM, and OAM.
//! These live outside the general address space's main-RAM/ROM regions
//! and are mapped directly by [`Bus`](crate::bus::Bus) at
//! `0x0500_0000`/`0x0600_0000`/`0x0700_0000`.
//!
//! Both palette RAM banks hold 256 RGB555 colors (512 bytes each); in
//! 4bpp tile modes each is further split into 16 banks of 16 colors, with
//! color/index 0 always transparent. VRAM (96 KiB) holds tile pixel data
//! and tilemaps in modes 0-2, or a raw bitmap framebuffer in modes 3-5 —
//! see [`layers`](super::layers) for how each mode's layout is consumed.
//! OAM (1 KiB) holds 128 sprites' attributes plus 32 affine
//! rotation/scaling parameter sets; see
//! [`object_attributes`](super::object_attributes) for its layout.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

const BG_PALETTE_SIZE: usize = 0x200;
const OBJ_PALETTE_SIZE: usize = 0x200;
const VRAM_SIZE: usize = 0x1_8000;
const OAM_SIZE: usize = 0x400;

/// The PPU's dedicated memory: palette RAM, VRAM, and OAM, boxed to keep
/// roughly 98 KiB off the stack.
#[serde_as]
#[derive(Serialize, Deserialize)]
pub struct Memory {
    /// Background palette, `0x0500_0000`-`0x0500_01FF`.
    #[serde_as(as = "Box<[_; BG_PALETTE_SIZE]>")]
    pub bg_palette_ram: Box<[u8; BG_PALETTE_SIZE]>,

    /// Sprite palette, `0x0500_0200`-`0x0500_03FF`.
    #[serde_as(as = "Box<[_; OBJ_PALETTE_SIZE]>")]
    pub obj_palette_ram: Box<[u8; OBJ_PALETTE_SIZE]>,

    /// Tile/tilemap/bitmap storage, `0x0600_0000`-`0x0601_7FFF`.
    #[serde_as(as = "Box<[_; VRAM_SIZE]>")]
    pub video_ram: Box<[u8; VRAM_SIZE]>,

    /// Sprite attributes and affine parameters, `0x0700_0000`-`0x0700_03FF`.
    #[serde_as(as = "Box<[_; OAM_SIZE]>")]
    pub obj_attributes: Box<[u8; OAM_SIZE]>,
}

impl Default for Memory {
    #[allow(clippy::large_stack_arrays)]
    fn default() -> Self {
        Self {
            bg_palette_ram: Box::new([0; BG_PALETTE_SIZE]),
            obj_palette_ram: Box::new([8; OBJ_PALETTE_SIZE]),
            video_ram: Box::new([0; VRAM_SIZE]),
            obj_attributes: Box::new([0; OAM_SIZE]),
        }
    }
}
