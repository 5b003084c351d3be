//! Cartridge backup media: SRAM, Flash (64k/128k) and EEPROM (512B/8k).
//!
//! The GamePak ROM address window `0x0E000000-0x0FFFFFFF` is shared by whichever
//! save medium a cartridge actually carries; only one variant is ever live for a
//! given ROM. [`BackupMedia`] decodes by variant and owns the raw bytes, which are
//! loaded from a save file at power-on and flushed back on shutdown (see the
//! `Backup write failure` policy in the error taxonomy: flush failures are logged,
//! never fatal).
//!
//! EEPROM is unusual: it isn't memory-mapped in the normal sense. The GamePak bus
//! only exposes a single data line to it, so real software talks to it through a
//! bit-serial protocol driven by DMA3 (see [`crate::cpu::hardware::dma`]). This
//! module holds the EEPROM's storage and the tiny state machine that interprets
//! the bitstream; the DMA channel is the one that decides when a transfer is an
//! EEPROM command at all.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// Flash command state machine state.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashState {
    #[default]
    Ready,
    Command1,
    Command2,
    IdMode,
    EraseCommand,
    EraseCommand1,
    EraseCommand2,
    BankSelect,
    WriteCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EepromSize {
    Small512,
    Large8K,
}

impl EepromSize {
    const fn dword_count(self) -> usize {
        match self {
            Self::Small512 => 64,
            Self::Large8K => 1024,
        }
    }
}

/// EEPROM bit-serial interpreter. Storage is an array of 8-byte dwords; the
/// index width (6 or 14 bits) is inferred from the word count of the DMA
/// transfer that first talks to it, per the protocol in §4.4/§4.8.
#[derive(Debug, Serialize, Deserialize)]
pub struct Eeprom {
    dwords: Vec<[u8; 8]>,
    size: Option<EepromSize>,
    read_index: usize,
}

impl Default for Eeprom {
    fn default() -> Self {
        Self {
            dwords: vec![[0xFF; 8]; EepromSize::Large8K.dword_count()],
            size: None,
            read_index: 0,
        }
    }
}

impl Eeprom {
    /// Sets the read index from a 6- or 14-bit serial index, inferred from
    /// whether the DMA word count was 9 (6-bit index) or 17 (14-bit index).
    pub fn set_read_index(&mut self, index: usize, wide: bool) {
        self.lazily_size(wide);
        self.read_index = index % self.dwords.len();
    }

    pub fn write_dword(&mut self, index: usize, wide: bool, dword: [u8; 8]) {
        self.lazily_size(wide);
        let idx = index % self.dwords.len();
        self.dwords[idx] = dword;
    }

    #[must_use]
    pub fn read_dword(&self) -> [u8; 8] {
        self.dwords[self.read_index % self.dwords.len()]
    }

    fn lazily_size(&mut self, wide: bool) {
        if self.size.is_none() {
            self.size = Some(if wide {
                EepromSize::Large8K
            } else {
                EepromSize::Small512
            });
            self.dwords = vec![[0xFF; 8]; self.size.unwrap().dword_count()];
        }
    }

    #[must_use]
    pub fn to_save_bytes(&self) -> Vec<u8> {
        self.dwords.iter().flat_map(|d| d.to_vec()).collect()
    }

    #[must_use]
    pub fn from_save_bytes(bytes: &[u8]) -> Self {
        let size = if bytes.len() <= 512 {
            EepromSize::Small512
        } else {
            EepromSize::Large8K
        };
        let dwords = bytes
            .chunks_exact(8)
            .map(|c| c.try_into().unwrap())
            .collect();
        Self {
            dwords,
            size: Some(size),
            read_index: 0,
        }
    }
}

#[serde_as]
#[derive(Debug, Serialize, Deserialize)]
pub enum BackupMedia {
    None,
    Sram(#[serde_as(as = "Box<[_; 0x8000]>")] Box<[u8; 0x8000]>),
    Flash {
        #[serde_as(as = "Box<[_; 0x20000]>")]
        data: Box<[u8; 0x20000]>,
        banks: u8,
        state: FlashState,
        bank: u8,
    },
    Eeprom(Eeprom),
}

impl Default for BackupMedia {
    fn default() -> Self {
        Self::Flash {
            data: Box::new([0xFF; 0x20000]),
            banks: 2,
            state: FlashState::Ready,
            bank: 0,
        }
    }
}

impl BackupMedia {
    #[must_use]
    pub fn sram() -> Self {
        Self::Sram(Box::new([0xFF; 0x8000]))
    }

    #[must_use]
    pub fn flash_64k() -> Self {
        Self::Flash {
            data: Box::new([0xFF; 0x20000]),
            banks: 1,
            state: FlashState::Ready,
            bank: 0,
        }
    }

    #[must_use]
    pub fn flash_128k() -> Self {
        Self::Flash {
            data: Box::new([0xFF; 0x20000]),
            banks: 2,
            state: FlashState::Ready,
            bank: 0,
        }
    }

    #[must_use]
    pub fn eeprom() -> Self {
        Self::Eeprom(Eeprom::default())
    }

    /// Reloads persisted bytes from a save file read at power-on. Sizing
    /// distinguishes SRAM (32 KiB) from Flash64/Flash128, and EEPROM from
    /// either (EEPROM files are always a multiple of 8 bytes and far smaller).
    #[must_use]
    pub fn from_save_bytes(bytes: &[u8]) -> Self {
        match bytes.len() {
            0x8000 => {
                let mut data = Box::new([0xFF; 0x8000]);
                data.copy_from_slice(bytes);
                Self::Sram(data)
            }
            0x10000 => {
                let mut data = Box::new([0xFF; 0x20000]);
                data[..0x10000].copy_from_slice(bytes);
                Self::Flash {
                    data,
                    banks: 1,
                    state: FlashState::Ready,
                    bank: 0,
                }
            }
            0x20000 => {
                let mut data = Box::new([0xFF; 0x20000]);
                data.copy_from_slice(bytes);
                Self::Flash {
                    data,
                    banks: 2,
                    state: FlashState::Ready,
                    bank: 0,
                }
            }
            512 | 8192 => Self::Eeprom(Eeprom::from_save_bytes(bytes)),
            _ => Self::default(),
        }
    }

    #[must_use]
    pub fn to_save_bytes(&self) -> Vec<u8> {
        match self {
            Self::None => Vec::new(),
            Self::Sram(data) => data.to_vec(),
            Self::Flash { data, banks, .. } => data[..usize::from(*banks) * 0x10000].to_vec(),
            Self::Eeprom(eeprom) => eeprom.to_save_bytes(),
        }
    }

    #[must_use]
    pub fn read(&self, offset: usize) -> u8 {
        match self {
            Self::None => 0xFF,
            Self::Sram(data) => data[offset % data.len()],
            Self::Flash { data, bank, state, .. } => {
                if *state == FlashState::IdMode {
                    return match offset & 0xFFFF {
                        0x0000 => 0x62, // Sanyo manufacturer id
                        0x0001 => 0x13, // LE26FV10N1TS (1Mbit) device id
                        _ => 0xFF,
                    };
                }
                let real_offset = usize::from(*bank) * 0x10000 + (offset & 0xFFFF);
                data[real_offset]
            }
            Self::Eeprom(_) => 0xFF,
        }
    }

    pub fn write(&mut self, offset: usize, value: u8) {
        match self {
            Self::None | Self::Eeprom(_) => {}
            Self::Sram(data) => {
                let len = data.len();
                data[offset % len] = value;
            }
            Self::Flash { data, banks, state, bank } => {
                write_flash(data, banks, state, bank, offset & 0xFFFF, value);
            }
        }
    }

    #[must_use]
    pub const fn is_eeprom(&self) -> bool {
        matches!(self, Self::Eeprom(_))
    }

    /// Panics if this isn't an EEPROM cartridge; callers must check
    /// [`Self::is_eeprom`] (or the address range) first.
    pub fn as_eeprom_mut(&mut self) -> &mut Eeprom {
        match self {
            Self::Eeprom(eeprom) => eeprom,
            _ => panic!("as_eeprom_mut called on non-EEPROM backup media"),
        }
    }
}

#[allow(clippy::too_many_lines)]
fn write_flash(
    data: &mut [u8; 0x20000],
    banks: &u8,
    state: &mut FlashState,
    bank: &mut u8,
    offset: usize,
    value: u8,
) {
    match *state {
        FlashState::Ready => {
            if offset == 0x5555 && value == 0xAA {
                *state = FlashState::Command1;
            }
        }
        FlashState::Command1 => {
            *state = if offset == 0x2AAA && value == 0x55 {
                FlashState::Command2
            } else {
                FlashState::Ready
            };
        }
        FlashState::Command2 => {
            *state = if offset == 0x5555 {
                match value {
                    0x90 => FlashState::IdMode,
                    0x80 => FlashState::EraseCommand,
                    0xA0 => FlashState::WriteCommand,
                    0xB0 if *banks > 1 => FlashState::BankSelect,
                    _ => FlashState::Ready,
                }
            } else {
                FlashState::Ready
            };
        }
        FlashState::IdMode => {
            if value == 0xF0 {
                *state = FlashState::Ready;
            } else if offset == 0x5555 && value == 0xAA {
                *state = FlashState::Command1;
            }
        }
        FlashState::EraseCommand => {
            *state = if offset == 0x5555 && value == 0xAA {
                FlashState::EraseCommand1
            } else {
                FlashState::Ready
            };
        }
        FlashState::EraseCommand1 => {
            *state = if offset == 0x2AAA && value == 0x55 {
                FlashState::EraseCommand2
            } else {
                FlashState::Ready
            };
        }
        FlashState::EraseCommand2 => {
            if value == 0x10 && offset == 0x5555 {
                data.fill(0xFF);
            } else if value == 0x30 {
                let sector_base = usize::from(*bank) * 0x10000 + (offset & 0xF000);
                data[sector_base..sector_base + 0x1000].fill(0xFF);
            }
            *state = FlashState::Ready;
        }
        FlashState::BankSelect => {
            if offset == 0x0000 {
                *bank = value & 0x01;
            }
            *state = FlashState::Ready;
        }
        FlashState::WriteCommand => {
            let real_offset = usize::from(*bank) * 0x10000 + offset;
            data[real_offset] &= value;
            *state = FlashState::Ready;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sram_round_trips() {
        let mut media = BackupMedia::sram();
        media.write(0x1234, 0x42);
        assert_eq!(media.read(0x1234), 0x42);
    }

    #[test]
    fn flash_chip_erase_sets_all_bits() {
        let mut media = BackupMedia::flash_64k();
        media.write(0x5555, 0xAA);
        media.write(0x2AAA, 0x55);
        media.write(0x5555, 0x80);
        media.write(0x5555, 0xAA);
        media.write(0x2AAA, 0x55);
        media.write(0x5555, 0x10);
        assert_eq!(media.read(0x0000), 0xFF);
    }

    #[test]
    fn flash_write_can_only_clear_bits() {
        let mut media = BackupMedia::flash_64k();
        media.write(0x5555, 0xAA);
        media.write(0x2AAA, 0x55);
        media.write(0x5555, 0xA0);
        media.write(0x0010, 0x0F);
        assert_eq!(media.read(0x0010), 0x0F);
    }

    #[test]
    fn eeprom_index_width_selects_size() {
        let mut eeprom = Eeprom::default();
        eeprom.set_read_index(5, false);
        assert_eq!(eeprom.size, Some(EepromSize::Small512));
    }

    #[test]
    fn eeprom_write_then_read_back() {
        let mut eeprom = Eeprom::default();
        eeprom.set_read_index(3, true);
        eeprom.write_dword(3, true, [1, 2, 3, 4, 5, 6, 7, 8]);
        eeprom.set_read_index(3, true);
        assert_eq!(eeprom.read_dword(), [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn backup_round_trips_through_save_bytes() {
        let mut media = BackupMedia::sram();
        media.write(10, 0xAB);
        let saved = media.to_save_bytes();
        let reloaded = BackupMedia::from_save_bytes(&saved);
        assert_eq!(reloaded.read(10), 0xAB);
    }
}
