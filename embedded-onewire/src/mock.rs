//! Test doubles for the [`OneWire`] trait.
//!
//! - [`SimulatedBus`] models devices sharing the wired-AND line closely
//!   enough to run the search algorithm against them.
//! - [`ScriptedBus`] replays queued presence results and read bytes, and
//!   records everything written, for device protocol tests.

use core::convert::Infallible;
use std::{collections::VecDeque, vec::Vec};

use crate::{ONEWIRE_SEARCH_CMD, OneWire, OneWireError, OneWireResult, OneWireStatus, Rom};

/// Bus status reported by the test doubles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MockStatus {
    /// Presence pulse detected.
    pub presence: bool,
    /// Short circuit detected.
    pub shortcircuit: bool,
}

impl OneWireStatus for MockStatus {
    fn presence(&self) -> bool {
        self.presence
    }

    fn shortcircuit(&self) -> bool {
        self.shortcircuit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchSlot {
    IdBit,
    Complement,
    Direction,
}

/// A set of devices answering the Search ROM command bit by bit.
///
/// Every device still taking part in a search drives its address bit and
/// then its complement; the line reads 0 if any device pulls it low.
#[derive(Debug, Default)]
pub struct SimulatedBus {
    devices: Vec<Rom>,
    active: Vec<bool>,
    expect_rom_cmd: bool,
    search: Option<(u8, SearchSlot)>,
    operations: usize,
}

impl SimulatedBus {
    /// Creates a bus with the given devices attached.
    pub fn new(devices: Vec<Rom>) -> Self {
        let active = vec![false; devices.len()];
        Self {
            devices,
            active,
            ..Default::default()
        }
    }

    /// Number of bus operations (resets, bytes and bits) performed so far.
    pub fn operations(&self) -> usize {
        self.operations
    }

    fn bit_of(rom: &Rom, bit: u8) -> bool {
        rom.bytes()[(bit / 8) as usize] & (1 << (bit % 8)) != 0
    }

    fn wired_and(&self, bit: u8, complement: bool) -> bool {
        self.devices
            .iter()
            .zip(&self.active)
            .filter(|&(_, &active)| active)
            .all(|(rom, _)| Self::bit_of(rom, bit) != complement)
    }
}

impl OneWire for SimulatedBus {
    type Status = MockStatus;
    type BusError = Infallible;

    fn reset(&mut self) -> OneWireResult<MockStatus, Infallible> {
        self.operations += 1;
        self.active.iter_mut().for_each(|a| *a = true);
        self.expect_rom_cmd = true;
        self.search = None;
        Ok(MockStatus {
            presence: !self.devices.is_empty(),
            shortcircuit: false,
        })
    }

    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Infallible> {
        self.operations += 1;
        if self.expect_rom_cmd && byte == ONEWIRE_SEARCH_CMD {
            self.search = Some((0, SearchSlot::IdBit));
        }
        self.expect_rom_cmd = false;
        Ok(())
    }

    fn read_byte(&mut self) -> OneWireResult<u8, Infallible> {
        self.operations += 1;
        Ok(0xff)
    }

    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Infallible> {
        self.operations += 1;
        if let Some((pos, SearchSlot::Direction)) = self.search {
            for (rom, active) in self.devices.iter().zip(self.active.iter_mut()) {
                if Self::bit_of(rom, pos) != bit {
                    *active = false;
                }
            }
            self.search = (pos < 63).then_some((pos + 1, SearchSlot::IdBit));
        }
        Ok(())
    }

    fn read_bit(&mut self) -> OneWireResult<bool, Infallible> {
        self.operations += 1;
        Ok(match self.search {
            Some((pos, SearchSlot::IdBit)) => {
                self.search = Some((pos, SearchSlot::Complement));
                self.wired_and(pos, false)
            }
            Some((pos, SearchSlot::Complement)) => {
                self.search = Some((pos, SearchSlot::Direction));
                self.wired_and(pos, true)
            }
            _ => true,
        })
    }
}

/// Something that happened on a [`ScriptedBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Bus reset.
    Reset,
    /// Byte written.
    Write(u8),
    /// Byte read.
    Read(u8),
    /// Bit written.
    WriteBit(bool),
    /// Bit read.
    ReadBit(bool),
}

/// A bus replaying scripted answers.
///
/// Resets answer with a presence pulse unless [`push_presence`](ScriptedBus::push_presence)
/// queued otherwise; reads return queued bytes, then `0xff` (an idle line).
#[derive(Debug, Default)]
pub struct ScriptedBus {
    presence: VecDeque<bool>,
    reads: VecDeque<Option<u8>>,
    bits: VecDeque<bool>,
    events: Vec<Event>,
}

impl ScriptedBus {
    /// Creates an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the presence result of the next unscripted reset.
    pub fn push_presence(&mut self, present: bool) -> &mut Self {
        self.presence.push_back(present);
        self
    }

    /// Queues bytes to be read.
    pub fn push_reads(&mut self, bytes: &[u8]) -> &mut Self {
        self.reads.extend(bytes.iter().copied().map(Some));
        self
    }

    /// Queues a read that times out.
    pub fn push_timeout(&mut self) -> &mut Self {
        self.reads.push_back(None);
        self
    }

    /// Queues a bit to be read.
    pub fn push_bit(&mut self, bit: bool) -> &mut Self {
        self.bits.push_back(bit);
        self
    }

    /// Everything that happened on the bus, in order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// All bytes written, in order.
    pub fn written(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Write(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    /// Number of resets performed.
    pub fn resets(&self) -> usize {
        self.events.iter().filter(|e| **e == Event::Reset).count()
    }

    /// Number of scripted reads not consumed yet.
    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }
}

impl OneWire for ScriptedBus {
    type Status = MockStatus;
    type BusError = Infallible;

    fn reset(&mut self) -> OneWireResult<MockStatus, Infallible> {
        self.events.push(Event::Reset);
        Ok(MockStatus {
            presence: self.presence.pop_front().unwrap_or(true),
            shortcircuit: false,
        })
    }

    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Infallible> {
        self.events.push(Event::Write(byte));
        Ok(())
    }

    fn read_byte(&mut self) -> OneWireResult<u8, Infallible> {
        match self.reads.pop_front() {
            Some(None) => Err(OneWireError::LinkTimeout),
            Some(Some(byte)) => {
                self.events.push(Event::Read(byte));
                Ok(byte)
            }
            None => {
                self.events.push(Event::Read(0xff));
                Ok(0xff)
            }
        }
    }

    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Infallible> {
        self.events.push(Event::WriteBit(bit));
        Ok(())
    }

    fn read_bit(&mut self) -> OneWireResult<bool, Infallible> {
        let bit = self.bits.pop_front().unwrap_or(true);
        self.events.push(Event::ReadBit(bit));
        Ok(bit)
    }
}
