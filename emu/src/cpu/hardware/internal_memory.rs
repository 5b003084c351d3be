//! Internal memory storage: BIOS, RAM, ROM, and Flash.
//!
//! This module implements the GBA's main memory regions that store code and data.
//! The [`InternalMemory`] struct holds the actual byte arrays for each region.
//!
//! # Memory Regions
//!
//! | Region       | Address Range           | Size   | Description                      |
//! |--------------|-------------------------|--------|----------------------------------|
//! | BIOS         | `0x0000_0000-0000_3FFF` | 16 KB  | System ROM (read-only)           |
//! | WRAM         | `0x0200_0000-0203_FFFF` | 256 KB | Work RAM (mirrored every 256KB)  |
//! | IWRAM        | `0x0300_0000-0300_7FFF` | 32 KB  | Internal Work RAM (fast, mirrored) |
//! | ROM          | `0x0800_0000-0DFF_FFFF` | 32 MB  | Game Pak ROM (3 wait states)     |
//! | SRAM/Flash   | `0x0E00_0000-0E01_FFFF` | 128 KB | Save data storage                |
//!
//! # Address Mirroring
//!
//! RAM regions mirror throughout their address space:
//! - **WRAM**: Mirrors every 256KB (`0x0204_0000` = `0x0200_0000`)
//! - **IWRAM**: Mirrors every 32KB (`0x0300_8000` = `0x0300_0000`)
//!
//! # Backup media
//!
//! `0x0E000000-0x0FFFFFFF` is owned by whatever save medium the cartridge
//! carries; see [`backup`](super::backup) for the SRAM/Flash/EEPROM state
//! machines themselves. This module only routes addresses to it.
//!
//! # GPIO (RTC Support)
//!
//! The module also handles GPIO registers at ROM offset `0xC4-0xC9` used by some
//! games (like Pokemon) for Real-Time Clock communication:
//! - `0xC4`: Data register (pin state)
//! - `0xC6`: Direction register (1=output, 0=input)
//! - `0xC8`: Control register (GPIO enable)
//!
//! # Empty ROM Reads
//!
//! When reading past the end of the loaded ROM, the GBA returns the lower 16 bits
//! of the requested address (due to how the Game Pak bus works). This is emulated
//! in `read_rom`.

#![allow(clippy::unreadable_literal)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::hardware::backup::BackupMedia;

use super::get_unmasked_address;

#[derive(Serialize, Deserialize)]
pub struct InternalMemory {
    /// From 0x00000000 to 0x00003FFF (16 `KBytes`).
    bios_system_rom: Vec<u8>,

    /// From 0x02000000 to 0x0203FFFF (256 `KBytes`).
    working_ram: Vec<u8>,

    /// From 0x03000000 to 0x03007FFF (32kb).
    working_iram: Vec<u8>,

    /// From 0x08000000 to 0x0FFFFFFF.
    /// Basically here you can find different kind of rom loaded.
    // TODO: Not sure if we should split this into
    // 08000000-09FFFFFF Game Pak ROM/FlashROM (max 32MB) - Wait State 0
    // 0A000000-0BFFFFFF Game Pak ROM/FlashROM (max 32MB) - Wait State 1
    // 0C000000-0DFFFFFF Game Pak ROM/FlashROM (max 32MB) - Wait State 2
    // 0E000000-0E00FFFF Game Pak SRAM (max 64 KBytes) - 8bit Bus width
    // 0E010000-0FFFFFFF Not used
    pub rom: Vec<u8>,

    /// Save medium at 0x0E000000-0x0FFFFFFF: SRAM, Flash or EEPROM depending
    /// on what the cartridge actually carries.
    pub backup: BackupMedia,

    /// GPIO registers for RTC/rumble/etc (at ROM offset 0xC4-0xC9)
    /// Register layout: 0xC4=data, 0xC6=direction, 0xC8=control
    gpio_data: u16, // Pin state (4-bit)
    gpio_direction: u16, // Pin direction (4-bit, 1=output, 0=input)
    gpio_control: u16,   // GPIO enable/control (1-bit)

    /// From 0x00004000 to `0x01FF_FFFF`.
    /// From 0x10000000 to `0xFFFF_FFFF`.
    unused_region: HashMap<usize, u8>,
}

impl InternalMemory {
    #[must_use]
    pub fn new(bios: [u8; 0x0000_4000], rom: &[u8]) -> Self {
        Self {
            bios_system_rom: bios.to_vec(),
            working_ram: vec![0; 0x0004_0000],
            working_iram: vec![0; 0x0000_8000],
            rom: rom.to_vec(),
            backup: BackupMedia::default(),
            gpio_data: 0,      // All pins low initially
            gpio_direction: 0, // All pins as inputs initially
            gpio_control: 1,   // GPIO enabled (allow reads)
            unused_region: HashMap::new(),
        }
    }

    /// Swaps in backup media reloaded from a save file, or a freshly detected
    /// variant based on strings found in the ROM body, at power-on.
    pub fn set_backup(&mut self, backup: BackupMedia) {
        self.backup = backup;
    }
}

impl Default for InternalMemory {
    /// Creates an `InternalMemory` with properly-sized memory regions.
    ///
    /// This is primarily used for testing. For actual emulation, use
    /// [`InternalMemory::new`] with real BIOS and ROM data.
    fn default() -> Self {
        Self {
            bios_system_rom: vec![0; 0x0000_4000], // 16 KB BIOS
            working_ram: vec![0; 0x0004_0000],     // 256 KB EWRAM
            working_iram: vec![0; 0x0000_8000],    // 32 KB IWRAM
            rom: vec![0; 0x0200_0000],             // 32 MB ROM (max size)
            backup: BackupMedia::default(),
            gpio_data: 0,
            gpio_direction: 0,
            gpio_control: 1,
            unused_region: HashMap::new(),
        }
    }
}

impl InternalMemory {
    fn read_rom(&self, address: usize) -> u8 {
        // GPIO port region (for RTC in Pokemon Fire Red/Leaf Green)
        // Located at ROM addresses 0xC4-0xC9 (16-bit aligned)
        // 0xC4/0xC5 = Data register (pin state)
        // 0xC6/0xC7 = Direction register
        // 0xC8/0xC9 = Control register
        if (0xC4..=0xC9).contains(&address) {
            let value = match address {
                0xC4 => self.gpio_data.get_byte(0),
                0xC5 => self.gpio_data.get_byte(1),
                0xC6 => self.gpio_direction.get_byte(0),
                0xC7 => self.gpio_direction.get_byte(1),
                0xC8 => self.gpio_control.get_byte(0),
                0xC9 => self.gpio_control.get_byte(1),
                _ => unreachable!(),
            };
            tracing::debug!(
                "GPIO READ: offset 0x{:04X} = 0x{:02X} (data=0x{:04X}, dir=0x{:04X}, ctrl=0x{:04X})",
                address,
                value,
                self.gpio_data,
                self.gpio_direction,
                self.gpio_control
            );
            return value;
        }

        if address < self.rom.len() {
            self.rom[address]
        } else {
            // Preamble:
            // The GamePak ROM is an halfword addressable memory
            // and it uses a 16bits bus to transfer data and a
            // 24bits(32MB halfword addressed) bus to transfer the address to read.
            // So technically we can't just read 1 byte from the ROM, we
            // request the halfword and then we take the upper/lower 8bits
            // depending on the address least significant bit.
            //
            // https://rust-console.github.io/gbatek-gbaonly/#auxgbagamepakbus
            // In GamePak ROM, the 16bits data and the
            // lower 16bits of the address are transferred on the same bus (AD0-15),
            // the higher 8bits of the address (24bits in total, remember halfword addressing)
            // are transferred via A16-23.
            // When requesting an address which is "empty", the GamePak ROM doesn't overwrite the
            // value present in the AD0-15 bus, which then will still contain the lower 16bits of the address.
            // CPU will then use this as if it was the value read from the ROM.
            //
            // Here we get the 24bits address (halfword addressing) by shifting right by 1
            // and we take only the 16 lower bits. We use this as if it was the value read from the ROM
            // and we get the 0 or 1 byte depending on the LSB in the address.
            #[allow(clippy::cast_possible_truncation)]
            {
                (((address >> 1) & 0xFFFF) as u16).get_byte((address & 0b1) as u8)
            }
        }
    }
}

impl InternalMemory {
    #[must_use]
    pub fn read_at(&self, address: usize) -> u8 {
        match address {
            0x0000_0000..=0x0000_3FFF => self.bios_system_rom[address],
            0x0200_0000..=0x02FF_FFFF => {
                self.working_ram
                    [get_unmasked_address(address, 0x00FF_0000, 0xFF00_FFFF, 16, 4) - 0x0200_0000]
            }
            0x0300_0000..=0x03FF_FFFF => {
                let unmasked = get_unmasked_address(address, 0x00FF_F000, 0xFF00_0FFF, 12, 8);
                self.working_iram[unmasked - 0x0300_0000]
            }
            0x0800_0000..=0x09FF_FFFF => self.read_rom(address - 0x0800_0000),
            0x0A00_0000..=0x0BFF_FFFF => self.read_rom(address - 0x0A00_0000),
            0x0C00_0000..=0x0DFF_FFFF => self.read_rom(address - 0x0C00_0000),
            0x0E00_0000..=0x0E01_FFFF => self.backup.read(address - 0x0E00_0000),
            0x0000_4000..=0x01FF_FFFF | 0x1000_0000..=0xFFFF_FFFF => {
                self.unused_region.get(&address).map_or(0, |v| *v)
            }
            _ => unimplemented!("Unimplemented memory region. {address:x}"),
        }
    }

    pub fn write_at(&mut self, address: usize, value: u8) {
        match address {
            0x0000_0000..=0x0000_3FFF => {
                // BIOS is read-only, writes have no effect.
            }
            0x0200_0000..=0x0203_FFFF => self.working_ram[address - 0x0200_0000] = value,
            // Mirror
            0x0204_0000..=0x02FF_FFFF => {
                self.working_ram[get_unmasked_address(address, 0x00FF_0000, 0xFF00_FFFF, 16, 4)
                    - 0x0200_0000] = value;
            }
            0x0300_0000..=0x0300_7FFF => {
                self.working_iram[address - 0x0300_0000] = value;
            }
            // Mirror
            0x0300_8000..=0x03FF_FFFF => {
                let unmasked = get_unmasked_address(address, 0x00FF_F000, 0xFF00_0FFF, 12, 8);
                self.working_iram[unmasked - 0x0300_0000] = value;
            }
            0x0800_0000..=0x0DFF_FFFF => {
                // GPIO port region (RTC on e.g. Pokemon Fire Red/Leaf Green).
                let rom_offset = address & 0x01FFFFFF;
                if (0xC4..=0xC9).contains(&rom_offset) {
                    match rom_offset {
                        0xC4 => self.gpio_data.set_byte(0, value),
                        0xC5 => self.gpio_data.set_byte(1, value),
                        0xC6 => self.gpio_direction.set_byte(0, value),
                        0xC7 => self.gpio_direction.set_byte(1, value),
                        0xC8 => self.gpio_control.set_byte(0, value),
                        0xC9 => self.gpio_control.set_byte(1, value),
                        _ => unreachable!(),
                    }
                }
                // ROM is otherwise read-only.
            }
            0x0E00_0000..=0x0E01_FFFF => self.backup.write(address - 0x0E00_0000, value),
            0x0E02_0000..=0x0FFF_FFFF => {
                // Outside the backup-media window, ignore.
            }
            _ => {
                self.unused_region.insert(address, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_work_ram() {
        let mut im = InternalMemory::default();

        let address = 0x03000005;
        im.write_at(address, 5);

        assert_eq!(im.working_iram[5], 5);
    }

    #[test]
    fn test_last_byte_work_ram() {
        let mut im = InternalMemory::default();

        let address = 0x03007FFF;
        im.write_at(address, 5);

        assert_eq!(im.working_iram[0x7FFF], 5);
    }

    #[test]
    fn test_read_work_ram() {
        let mut im = InternalMemory::default();
        im.working_iram[5] = 10;

        let address = 0x03000005;
        assert_eq!(im.read_at(address), 10);
    }

    #[test]
    fn test_bios_is_read_only() {
        let mut im = InternalMemory::default();
        // BIOS is read-only, writes should be ignored
        let original = im.read_at(0x000001EC);
        im.write_at(0x000001EC, 10);
        // Value should not have changed
        assert_eq!(im.read_at(0x000001EC), original);
    }

    #[test]
    fn test_read_rom() {
        let im = InternalMemory {
            rom: vec![1, 2, 3, 4],
            ..Default::default()
        };
        let address = 0x08000000;
        assert_eq!(im.read_at(address), 1);

        // Testing reading in empty rom
        let address = 0x09FF_FFFF;
        assert_eq!(im.read_at(address), 0xFF);

        let address = 0x09FF_FFEE;
        assert_eq!(im.read_at(address), 0xF7);

        let address = 0x09FF_FFEF;
        assert_eq!(im.read_at(address), 0xFF);
    }

    #[test]
    fn test_mirror_3ffffxx() {
        let mut im = InternalMemory::default();
        im.working_iram[0x7FF0] = 5;

        assert_eq!(im.read_at(0x3FFFFF0), 5);

        im.write_at(0x3FFFFA0, 10);

        assert_eq!(im.working_iram[0x7FA0], 10);
    }

    #[test]
    fn test_mirror_wram() {
        let mut im = InternalMemory::default();
        im.working_ram[0x010003] = 5;

        assert_eq!(im.read_at(0x02010003), 5);
        assert_eq!(im.read_at(0x02050003), 5);
        assert_eq!(im.read_at(0x02350003), 5);
        assert_eq!(im.read_at(0x02F50003), 5);

        im.write_at(0x02010003, 2);
        assert_eq!(im.working_ram[0x010003], 2);

        im.write_at(0x02050003, 1);
        assert_eq!(im.working_ram[0x010003], 1);

        im.write_at(0x02350010, 1);
        assert_eq!(im.working_ram[0x010010], 1);

        im.write_at(0x02F5003F, 1);
        assert_eq!(im.working_ram[0x01003F], 1);
    }

    #[test]
    fn test_mirror_iram() {
        let mut im = InternalMemory::default();
        im.working_iram[0x21FF] = 5;

        assert_eq!(im.read_at(0x030021FF), 5);
        assert_eq!(im.read_at(0x0300A1FF), 5);
        assert_eq!(im.read_at(0x030121FF), 5);
        assert_eq!(im.read_at(0x03FFA1FF), 5);

        im.write_at(0x030021FF, 2);
        assert_eq!(im.working_iram[0x21FF], 2);

        im.write_at(0x0300A1FF, 1);
        assert_eq!(im.working_iram[0x21FF], 1);

        im.write_at(0x030171FF, 10);
        assert_eq!(im.working_iram[0x71FF], 10);

        im.write_at(0x03FFF1FF, 1);
        assert_eq!(im.working_iram[0x71FF], 1);
    }
}
