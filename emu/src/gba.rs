//! # GBA System
//!
//! This module contains the [`Gba`] struct which represents the entire
//! Game Boy Advance system and ties together all components.
//!
//! ## System Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                        Game Boy Advance System                              │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │                                                                             │
//! │  ┌─────────────────────────────────────────────────────────────────────┐   │
//! │  │                         ARM7TDMI CPU                                 │   │
//! │  │   ┌─────────┐  ┌─────────┐  ┌─────────┐  ┌─────────┐               │   │
//! │  │   │Registers│  │  CPSR   │  │Pipeline │  │  ALU    │               │   │
//! │  │   │ R0-R15  │  │  SPSR   │  │ 3-stage │  │Shifter  │               │   │
//! │  │   └─────────┘  └─────────┘  └─────────┘  └─────────┘               │   │
//! │  └────────────────────────────────┬────────────────────────────────────┘   │
//! │                                   │                                        │
//! │                                   ▼                                        │
//! │  ┌─────────────────────────────────────────────────────────────────────┐   │
//! │  │                           Memory Bus                                │   │
//! │  └───┬─────────┬─────────┬─────────┬─────────┬─────────┬─────────┬────┘   │
//! │      │         │         │         │         │         │         │        │
//! │      ▼         ▼         ▼         ▼         ▼         ▼         ▼        │
//! │  ┌───────┐ ┌───────┐ ┌───────┐ ┌───────┐ ┌───────┐ ┌───────┐ ┌───────┐   │
//! │  │ BIOS  │ │ EWRAM │ │ IWRAM │ │  I/O  │ │Palette│ │ VRAM  │ │  ROM  │   │
//! │  │ 16KB  │ │ 256KB │ │ 32KB  │ │  Regs │ │  1KB  │ │ 96KB  │ │ 32MB  │   │
//! │  │0x0000 │ │0x0200 │ │0x0300 │ │0x0400 │ │0x0500 │ │0x0600 │ │0x0800 │   │
//! │  └───────┘ └───────┘ └───────┘ └───────┘ └───────┘ └───────┘ └───────┘   │
//! │                          │                                                │
//! │                          ▼                                                │
//! │  ┌─────────────────────────────────────────────────────────────────────┐   │
//! │  │                      I/O Registers (0x04000000)                     │   │
//! │  │  ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐   │   │
//! │  │  │ LCD  │ │Sound │ │ DMA  │ │Timers│ │Serial│ │Keypad│ │  IRQ │   │   │
//! │  │  └──────┘ └──────┘ └──────┘ └──────┘ └──────┘ └──────┘ └──────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────────┘   │
//! │                                                                             │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Map
//!
//! | Address Range       | Size  | Description                    |
//! |---------------------|-------|--------------------------------|
//! | 0x00000000-0x00003FFF | 16KB  | BIOS (read-only, protected)    |
//! | 0x02000000-0x0203FFFF | 256KB | EWRAM (External Work RAM)      |
//! | 0x03000000-0x03007FFF | 32KB  | IWRAM (Internal Work RAM)      |
//! | 0x04000000-0x040003FF | 1KB   | I/O Registers                  |
//! | 0x05000000-0x050003FF | 1KB   | Palette RAM                    |
//! | 0x06000000-0x06017FFF | 96KB  | VRAM (Video RAM)               |
//! | 0x07000000-0x070003FF | 1KB   | OAM (Object Attribute Memory)  |
//! | 0x08000000-0x09FFFFFF | 32MB  | ROM (Game Pak)                 |

use crate::bus::AudioSample;
use crate::cartridge_header::CartridgeHeader;
use crate::cpu::arm7tdmi::Arm7tdmi;
use crate::cpu::hardware::internal_memory::InternalMemory;
use crate::cpu::hardware::lcd::Color;
use crate::cpu::{DISASM_BUFFER_CAPACITY, DisasmEntry};
use crate::error::GbaResult;

/// Keys as exposed on `KEYINPUT`/`KEYCNT`. The register itself is active-low
/// (a set bit means "not pressed"); [`Gba::update_keypad`] takes the
/// pressed-is-true convention callers expect and flips it at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    A,
    B,
    Select,
    Start,
    Right,
    Left,
    Up,
    Down,
    R,
    L,
}

impl Key {
    const fn bit(self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::Select => 2,
            Self::Start => 3,
            Self::Right => 4,
            Self::Left => 5,
            Self::Up => 6,
            Self::Down => 7,
            Self::R => 8,
            Self::L => 9,
        }
    }
}

/// Audio ring buffer capacity, in stereo frames. At the GBA's ~32768Hz PSG
/// sample rate this holds roughly a third of a second.
const AUDIO_BUFFER_CAPACITY: usize = 8192;

/// The complete Game Boy Advance system: CPU, bus, and all peripherals reachable
/// through it, plus the host-facing surface ([`Gba::run_frame`], [`Gba::get_frame_buffer`],
/// [`Gba::fill_audio_buffer`], [`Gba::update_keypad`]) a frontend drives it through.
pub struct Gba {
    pub cpu: Arm7tdmi,

    /// Parsed cartridge header with game metadata.
    pub cartridge_header: CartridgeHeader,

    /// Consumer for the lock-free disassembler channel.
    pub disasm_rx: Option<rtrb::Consumer<DisasmEntry>>,

    audio_rx: rtrb::Consumer<AudioSample>,
    audio_tx: rtrb::Producer<AudioSample>,

    powered_on: bool,
    frame_count: u64,
}

impl Gba {
    /// Creates a new GBA system with the given BIOS and cartridge ROM. The CPU
    /// is left ready to execute the BIOS boot sequence; call [`Gba::run_frame`]
    /// in a loop to run the emulator.
    pub fn new(bios: [u8; 0x0000_4000], cartridge: &[u8]) -> GbaResult<Self> {
        let cartridge_header = CartridgeHeader::new(cartridge)?;

        let memory = InternalMemory::new(bios, cartridge);
        let bus = crate::bus::Bus::with_memory(memory);
        let mut cpu = Arm7tdmi::new(bus);

        let (disasm_tx, disasm_rx) = rtrb::RingBuffer::new(DISASM_BUFFER_CAPACITY);
        cpu.disasm_tx = Some(disasm_tx);

        let (audio_tx, audio_rx) = rtrb::RingBuffer::new(AUDIO_BUFFER_CAPACITY);

        Ok(Self {
            cpu,
            cartridge_header,
            disasm_rx: Some(disasm_rx),
            audio_rx,
            audio_tx,
            powered_on: true,
            frame_count: 0,
        })
    }

    /// Re-creates the system from BIOS and cartridge images, equivalent to a
    /// hardware power cycle. Keeps the same disassembler/audio wiring pattern
    /// as [`Gba::new`].
    pub fn initialize(&mut self, bios: [u8; 0x0000_4000], cartridge: &[u8]) -> GbaResult<()> {
        *self = Self::new(bios, cartridge)?;
        Ok(())
    }

    /// Stops the CPU loop. [`Gba::run_frame`] becomes a no-op until the next
    /// [`Gba::initialize`].
    pub const fn power_off(&mut self) {
        self.powered_on = false;
    }

    #[must_use]
    pub const fn is_powered_on(&self) -> bool {
        self.powered_on
    }

    /// Runs the CPU until a VBlank boundary is crossed (a full frame has been
    /// rendered), or does nothing if the system is powered off. Audio samples
    /// produced along the way are pushed to the internal ring buffer; drain
    /// them with [`Gba::fill_audio_buffer`].
    pub fn run_frame(&mut self) {
        if !self.powered_on {
            return;
        }
        loop {
            let vblank = self.cpu.step();
            if let Some(sample) = self.cpu.bus.take_pending_audio_sample() {
                let _ = self.audio_tx.push(sample);
            }
            if vblank {
                self.frame_count += 1;
                break;
            }
        }
    }

    /// Executes a single CPU instruction step without waiting for VBlank.
    /// Used by debug/step-through frontends.
    pub fn step(&mut self) -> bool {
        if !self.powered_on {
            return false;
        }
        let vblank = self.cpu.step();
        if let Some(sample) = self.cpu.bus.take_pending_audio_sample() {
            let _ = self.audio_tx.push(sample);
        }
        if vblank {
            self.frame_count += 1;
        }
        vblank
    }

    /// The most recently rendered 240x160 frame, as the LCD's native 15-bit
    /// BGR colors.
    #[must_use]
    pub fn get_frame_buffer(&self) -> &[[Color; 240]; 160] {
        self.cpu.bus.frame_buffer()
    }

    /// Drains up to `output.len()` stereo samples produced since the last call
    /// into `output`. Returns the number of frames actually written; the
    /// remainder of `output` is left untouched, so callers should fill gaps
    /// with silence to avoid stale data when the producer falls behind.
    pub fn fill_audio_buffer(&mut self, output: &mut [(i16, i16)]) -> usize {
        let mut written = 0;
        while written < output.len() {
            match self.audio_rx.pop() {
                Ok(sample) => {
                    output[written] = (sample.left, sample.right);
                    written += 1;
                }
                Err(_) => break,
            }
        }
        written
    }

    /// Reads the number of frames rendered since the last call to this
    /// method (or since construction, if this is the first call), then
    /// resets the counter to zero. Frontends call this once per second of
    /// wall-clock time to get an FPS reading.
    #[must_use]
    pub fn get_fps_counter(&mut self) -> u64 {
        std::mem::take(&mut self.frame_count)
    }

    /// Sets whether `key` is currently held down.
    pub fn update_keypad(&mut self, key: Key, pressed: bool) {
        let mask = 1u16 << key.bit();
        let current = self.cpu.bus.key_input();
        let next = if pressed {
            current & !mask
        } else {
            current | mask
        };
        self.cpu.bus.set_key_input(next);
    }
}
