use crate::error::GbaError;

/// The 192-byte cartridge header every GBA ROM starts with. Most fields
/// here have no runtime effect on this core (they only matter to real
/// hardware / multiboot transfer) and are kept for completeness and for
/// the header checksum validation performed in [`CartridgeHeader::new`].
#[allow(dead_code)]
pub struct CartridgeHeader {
    pub rom_entry_point: [u8; 4],
    pub nintendo_logo: [u8; 156],
    pub game_title: String,
    pub game_code: String,
    pub marker_code: String,
    pub fixed_value: [u8; 1],
    pub main_unit_code: [u8; 1],
    pub device_type: [u8; 1],
    pub reserved_area_1: [u8; 7],
    pub software_version: [u8; 1],
    pub complement_check: u8,
    pub reserved_area_2: [u8; 2],
    pub ram_entry_point: [u8; 4],
    pub boot_mode: [u8; 1],
    pub slave_id_number: [u8; 1],
    pub not_used: [u8; 26],
    pub joybus_mode_entry_point: [u8; 4],
}

fn field<const N: usize>(data: &[u8], start: usize, what: &str) -> [u8; N] {
    data[start..start + N]
        .try_into()
        .unwrap_or_else(|_| panic!("ROM too short to contain {what}"))
}

fn ascii_field(data: &[u8], start: usize, len: usize, what: &str) -> String {
    String::from_utf8(data[start..start + len].to_vec())
        .unwrap_or_else(|_| panic!("{what} is not valid ASCII"))
}

impl CartridgeHeader {
    pub fn new(data: &[u8]) -> Result<Self, GbaError> {
        Ok(Self {
            rom_entry_point: field(data, 0x000, "the ROM entry point"),
            nintendo_logo: field(data, 0x004, "the Nintendo logo bitmap"),
            game_title: ascii_field(data, 0x0A0, 12, "the game title"),
            game_code: ascii_field(data, 0x0AC, 4, "the game code"),
            marker_code: ascii_field(data, 0x0B0, 2, "the maker code"),
            fixed_value: field(data, 0x0B2, "the fixed value byte"),
            main_unit_code: field(data, 0x0B3, "the main unit code"),
            device_type: field(data, 0x0B4, "the device type byte"),
            reserved_area_1: field(data, 0x0B5, "reserved area 1"),
            software_version: field(data, 0x0BC, "the software version byte"),
            complement_check: Self::verify_checksum(data)?,
            reserved_area_2: field(data, 0x0BE, "reserved area 2"),
            ram_entry_point: field(data, 0x0C0, "the RAM entry point"),
            boot_mode: field(data, 0x0C4, "the boot mode byte"),
            slave_id_number: field(data, 0x0C5, "the slave ID byte"),
            not_used: field(data, 0x0C6, "the unused region"),
            joybus_mode_entry_point: field(data, 0x0E0, "the Joybus entry point"),
        })
    }

    /// Verifies the header checksum at offset 0xBD: the one's-complement
    /// sum of bytes 0xA0-0xBC, minus 0x19.
    fn verify_checksum(data: &[u8]) -> Result<u8, GbaError> {
        let expected = data[0xBD];
        let computed = data[0xA0..0xBD]
            .iter()
            .fold(0u8, |acc, &byte| acc.wrapping_sub(byte))
            .wrapping_sub(0x19);

        if computed != expected {
            return Err(GbaError::InvalidCartridgeHeader(format!(
                "header checksum mismatch: expected {expected:#04x}, computed {computed:#04x}"
            )));
        }

        Ok(computed)
    }
}
