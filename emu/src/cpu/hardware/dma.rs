//! The 4-channel DMA controller.
//!
//! Each channel copies `word_count` units (16- or 32-bit) from `source` to
//! `destination`, stepping each address according to its own address-control
//! mode, and can re-arm itself (`repeat`) for the next occurrence of its
//! trigger. Channel 3 additionally doubles as the EEPROM's bit-serial front
//! door: a transfer whose word count is one of the five protocol-defined
//! values (9, 17, 73, 81, 68) and whose address lands in the EEPROM window is
//! not a normal memory copy at all, but a command or reply on the wire.
//!
//! Actually moving bytes is left to the caller via [`DmaChannelBus`], so this
//! module stays free of any dependency on the rest of the memory map.

use serde::{Deserialize, Serialize};

use crate::cpu::hardware::backup::Eeprom;
use crate::cpu::hardware::interrupt_control::{IrqSource, SystemControl};
use crate::scheduler::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressControl {
    Increment,
    Decrement,
    Fixed,
    IncrementReload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaTiming {
    Immediate,
    VBlank,
    HBlank,
    Special,
}

/// Bus access surface a channel needs to actually move data. Implemented by
/// [`crate::bus::Bus`].
pub trait DmaChannelBus {
    fn dma_read_halfword(&mut self, addr: u32) -> u16;
    fn dma_write_halfword(&mut self, addr: u32, value: u16);
    fn dma_read_word(&mut self, addr: u32) -> u32;
    fn dma_write_word(&mut self, addr: u32, value: u32);
    fn is_eeprom_address(&self, addr: u32) -> bool;
    fn eeprom_mut(&mut self) -> &mut Eeprom;
}

#[derive(Default, Serialize, Deserialize)]
pub struct DmaChannel {
    pub source_address: u32,
    pub destination_address: u32,
    pub word_count: u16,
    pub control: u16,
    internal_source: u32,
    internal_destination: u32,
    internal_count: u32,
}

impl DmaChannel {
    const fn dest_control(&self) -> AddressControl {
        match (self.control >> 5) & 0b11 {
            0 => AddressControl::Increment,
            1 => AddressControl::Decrement,
            2 => AddressControl::Fixed,
            _ => AddressControl::IncrementReload,
        }
    }

    const fn src_control(&self) -> AddressControl {
        match (self.control >> 7) & 0b11 {
            0 => AddressControl::Increment,
            1 => AddressControl::Decrement,
            _ => AddressControl::Fixed,
        }
    }

    const fn repeat(&self) -> bool {
        self.control & 0x0200 != 0
    }

    const fn is_32bit(&self) -> bool {
        self.control & 0x0400 != 0
    }

    const fn timing(&self, idx: usize) -> DmaTiming {
        match (self.control >> 12) & 0b11 {
            0 => DmaTiming::Immediate,
            1 => DmaTiming::VBlank,
            2 => DmaTiming::HBlank,
            _ => {
                if idx == 3 {
                    DmaTiming::Special // video capture, not separately modeled
                } else {
                    DmaTiming::Special
                }
            }
        }
    }

    const fn irq_enable(&self) -> bool {
        self.control & 0x4000 != 0
    }

    const fn enabled(&self) -> bool {
        self.control & 0x8000 != 0
    }

    fn effective_word_count(&self, idx: usize) -> u32 {
        if self.word_count == 0 {
            if idx == 3 {
                0x1_0000
            } else {
                0x4000
            }
        } else {
            u32::from(self.word_count)
        }
    }

    fn latch(&mut self, idx: usize) {
        self.internal_source = self.source_address;
        self.internal_destination = self.destination_address;
        self.internal_count = self.effective_word_count(idx);
    }
}

const IRQ_SOURCES: [IrqSource; 4] = [
    IrqSource::Dma0,
    IrqSource::Dma1,
    IrqSource::Dma2,
    IrqSource::Dma3,
];

#[derive(Default, Serialize, Deserialize)]
pub struct DmaManager {
    pub channels: [DmaChannel; 4],
}

impl DmaManager {
    /// Called on a `DMAxCNT_H` write. Latches the source/destination/count
    /// registers and, for `Immediate` timing, runs the transfer right away.
    pub fn write_control(
        &mut self,
        idx: usize,
        value: u16,
        scheduler: &mut Scheduler,
        system: &mut SystemControl,
        bus: &mut impl DmaChannelBus,
    ) {
        let was_enabled = self.channels[idx].enabled();
        self.channels[idx].control = value;
        if !was_enabled && self.channels[idx].enabled() {
            self.channels[idx].latch(idx);
            if self.channels[idx].timing(idx) == DmaTiming::Immediate {
                self.run_channel(idx, scheduler, system, bus);
            }
        }
    }

    /// Returns the indices of channels armed for the VBlank trigger, running
    /// them and clearing `enabled` unless they repeat.
    pub fn notify_vblank(
        &mut self,
        scheduler: &mut Scheduler,
        system: &mut SystemControl,
        bus: &mut impl DmaChannelBus,
    ) {
        self.run_matching(DmaTiming::VBlank, scheduler, system, bus);
    }

    pub fn notify_hblank(
        &mut self,
        scheduler: &mut Scheduler,
        system: &mut SystemControl,
        bus: &mut impl DmaChannelBus,
    ) {
        self.run_matching(DmaTiming::HBlank, scheduler, system, bus);
    }

    /// Channels 1 and 2 in Special mode feed the DMA sound FIFOs; this is
    /// called whenever a timer tick empties one of the two FIFOs.
    pub fn notify_fifo_request(
        &mut self,
        scheduler: &mut Scheduler,
        system: &mut SystemControl,
        bus: &mut impl DmaChannelBus,
    ) {
        for idx in 1..=2 {
            if self.channels[idx].enabled() && self.channels[idx].timing(idx) == DmaTiming::Special
            {
                self.run_channel(idx, scheduler, system, bus);
            }
        }
    }

    fn run_matching(
        &mut self,
        timing: DmaTiming,
        scheduler: &mut Scheduler,
        system: &mut SystemControl,
        bus: &mut impl DmaChannelBus,
    ) {
        for idx in 0..4 {
            if self.channels[idx].enabled() && self.channels[idx].timing(idx) == timing {
                self.run_channel(idx, scheduler, system, bus);
            }
        }
    }

    fn run_channel(
        &mut self,
        idx: usize,
        scheduler: &mut Scheduler,
        system: &mut SystemControl,
        bus: &mut impl DmaChannelBus,
    ) {
        let is_eeprom_transfer = idx == 3
            && (bus.is_eeprom_address(self.channels[idx].internal_source)
                || bus.is_eeprom_address(self.channels[idx].internal_destination));

        if is_eeprom_transfer {
            self.run_eeprom_transfer(idx, bus);
        } else {
            self.run_memory_transfer(idx, bus);
        }

        if self.channels[idx].irq_enable() {
            system.request_interrupt(IRQ_SOURCES[idx], scheduler);
        }

        if self.channels[idx].repeat() {
            if self.channels[idx].dest_control() == AddressControl::IncrementReload {
                self.channels[idx].internal_destination = self.channels[idx].destination_address;
            }
            self.channels[idx].internal_count = self.channels[idx].effective_word_count(idx);
        } else {
            self.channels[idx].control &= !0x8000;
        }
    }

    fn run_memory_transfer(&mut self, idx: usize, bus: &mut impl DmaChannelBus) {
        let channel = &mut self.channels[idx];
        let step: u32 = if channel.is_32bit() { 4 } else { 2 };

        for _ in 0..channel.internal_count {
            if channel.is_32bit() {
                let value = bus.dma_read_word(channel.internal_source);
                bus.dma_write_word(channel.internal_destination, value);
            } else {
                let value = bus.dma_read_halfword(channel.internal_source);
                bus.dma_write_halfword(channel.internal_destination, value);
            }

            match channel.src_control() {
                AddressControl::Increment => channel.internal_source += step,
                AddressControl::Decrement => channel.internal_source -= step,
                AddressControl::Fixed | AddressControl::IncrementReload => {}
            }
            match channel.dest_control() {
                AddressControl::Increment | AddressControl::IncrementReload => {
                    channel.internal_destination += step;
                }
                AddressControl::Decrement => channel.internal_destination -= step,
                AddressControl::Fixed => {}
            }
        }
    }

    fn run_eeprom_transfer(&mut self, idx: usize, bus: &mut impl DmaChannelBus) {
        let channel = &mut self.channels[idx];
        let count = channel.word_count;
        let to_eeprom = bus.is_eeprom_address(channel.internal_destination);

        if to_eeprom {
            let mut bits = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let halfword = bus.dma_read_halfword(channel.internal_source);
                bits.push(halfword & 1);
                channel.internal_source += 2;
            }
            write_eeprom_stream(bus.eeprom_mut(), &bits, count);
        } else {
            let out = read_eeprom_stream(bus.eeprom_mut());
            for bit in out {
                bus.dma_write_halfword(channel.internal_destination, bit);
                channel.internal_destination += 2;
            }
        }
    }
}

/// Interprets a DMA3-to-EEPROM bitstream. `count` alone tells us the shape:
/// 9/17 are read requests (6/14-bit index), 73/81 are writes (6/14-bit index
/// plus 64 data bits). Each element of `bits` carries one serial bit in its
/// low bit, MSB-first within each field, after a 2-bit command header.
fn write_eeprom_stream(eeprom: &mut Eeprom, bits: &[u16], count: u16) {
    let wide = matches!(count, 17 | 81);
    let index_width = if wide { 14 } else { 6 };
    let mut index = 0usize;
    for &bit in &bits[2..2 + index_width] {
        index = (index << 1) | usize::from(bit);
    }

    if matches!(count, 9 | 17) {
        eeprom.set_read_index(index, wide);
        return;
    }

    let data_start = 2 + index_width;
    let mut dword = [0u8; 8];
    for (byte_idx, byte) in dword.iter_mut().enumerate() {
        let mut value = 0u8;
        for bit_idx in 0..8 {
            let bit = bits[data_start + byte_idx * 8 + bit_idx];
            value = (value << 1) | bit as u8;
        }
        *byte = value;
    }
    eeprom.write_dword(index, wide, dword);
}

/// Produces the 68-bit reply stream: 4 leading zero bits followed by the 64
/// data bits of the currently addressed dword, MSB first.
fn read_eeprom_stream(eeprom: &Eeprom) -> [u16; 68] {
    let dword = eeprom.read_dword();
    let mut out = [0u16; 68];
    for (byte_idx, byte) in dword.iter().enumerate() {
        for bit_idx in 0..8 {
            let bit = (byte >> (7 - bit_idx)) & 1;
            out[4 + byte_idx * 8 + bit_idx] = u16::from(bit);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct TestBus {
        memory: HashMap<u32, u16>,
        eeprom: Eeprom,
        eeprom_base: u32,
    }

    impl DmaChannelBus for TestBus {
        fn dma_read_halfword(&mut self, addr: u32) -> u16 {
            *self.memory.get(&addr).unwrap_or(&0)
        }
        fn dma_write_halfword(&mut self, addr: u32, value: u16) {
            self.memory.insert(addr, value);
        }
        fn dma_read_word(&mut self, addr: u32) -> u32 {
            let lo = self.dma_read_halfword(addr) as u32;
            let hi = self.dma_read_halfword(addr + 2) as u32;
            lo | (hi << 16)
        }
        fn dma_write_word(&mut self, addr: u32, value: u32) {
            self.dma_write_halfword(addr, value as u16);
            self.dma_write_halfword(addr + 2, (value >> 16) as u16);
        }
        fn is_eeprom_address(&self, addr: u32) -> bool {
            addr >= self.eeprom_base
        }
        fn eeprom_mut(&mut self) -> &mut Eeprom {
            &mut self.eeprom
        }
    }

    fn test_bus() -> TestBus {
        TestBus {
            memory: HashMap::new(),
            eeprom: Eeprom::default(),
            eeprom_base: 0x0D00_0000,
        }
    }

    #[test]
    fn immediate_transfer_runs_on_control_write() {
        let mut dma = DmaManager::default();
        let mut scheduler = Scheduler::new();
        let mut system = SystemControl::default();
        let mut bus = test_bus();
        bus.memory.insert(0x0200_0000, 0xBEEF);
        dma.channels[0].source_address = 0x0200_0000;
        dma.channels[0].destination_address = 0x0300_0000;
        dma.channels[0].word_count = 1;
        dma.write_control(0, 0x8000, &mut scheduler, &mut system, &mut bus);
        assert_eq!(bus.memory[&0x0300_0000], 0xBEEF);
        assert!(!dma.channels[0].enabled());
    }

    #[test]
    fn repeat_transfer_stays_enabled() {
        let mut dma = DmaManager::default();
        let mut scheduler = Scheduler::new();
        let mut system = SystemControl::default();
        let mut bus = test_bus();
        dma.channels[0].source_address = 0x0200_0000;
        dma.channels[0].destination_address = 0x0300_0000;
        dma.channels[0].word_count = 1;
        dma.write_control(0, 0x8200 | 0x1000, &mut scheduler, &mut system, &mut bus);
        assert!(dma.channels[0].enabled());
    }

    #[test]
    fn decrement_source_steps_backward() {
        let mut dma = DmaManager::default();
        let mut scheduler = Scheduler::new();
        let mut system = SystemControl::default();
        let mut bus = test_bus();
        bus.memory.insert(0x0200_0004, 0x1111);
        bus.memory.insert(0x0200_0002, 0x2222);
        dma.channels[0].source_address = 0x0200_0004;
        dma.channels[0].destination_address = 0x0300_0000;
        dma.channels[0].word_count = 2;
        dma.write_control(0, 0x8000 | 0x0080, &mut scheduler, &mut system, &mut bus);
        assert_eq!(bus.memory[&0x0300_0000], 0x1111);
        assert_eq!(bus.memory[&0x0300_0002], 0x2222);
    }

    #[test]
    fn eeprom_write_then_read_round_trips() {
        let mut eeprom = Eeprom::default();
        let mut bits = vec![1u16, 1u16];
        for b in [0u16, 0, 0, 0, 0, 1] {
            bits.push(b);
        }
        for byte in [0xAAu8; 8] {
            for i in 0..8 {
                bits.push(u16::from((byte >> (7 - i)) & 1));
            }
        }
        bits.push(0);
        write_eeprom_stream(&mut eeprom, &bits, 73);
        eeprom.set_read_index(1, false);
        assert_eq!(eeprom.read_dword(), [0xAA; 8]);
    }
}
