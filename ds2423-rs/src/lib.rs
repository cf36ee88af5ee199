#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]
//! # DS2423
//!
//! Readout of the two external 32-bit pulse counters of the DS2423 (family `0x1D`).
//!
//! The counters are read with Read Memory + Counter on the last two memory
//! pages; the transfer ends with the counter value, four zero bytes and an
//! inverted CRC-16 over everything sent and received.

use core::fmt;

use embedded_onewire::{
    Family, MAX_RETRIES, OneWire, OneWireError, OneWireNode, OneWireResult, Reading, Rom,
    check_crc16,
};

const READ_MEMORY_COUNTER: u8 = 0xa5;
// command + address, page data, counter, zero bytes, CRC
const FRAME_LEN: usize = 3 + 32 + 4 + 4 + 2;
const COUNTER_OFFSET: usize = 3 + 32;
const CRC_OFFSET: usize = FRAME_LEN - 2;

/// One of the two counters wired to an input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// Counter of input A, attached to memory page 14.
    A,
    /// Counter of input B, attached to memory page 15.
    B,
}

impl Counter {
    /// Start address of the memory page the counter is attached to.
    pub const fn page_address(self) -> u16 {
        match self {
            Counter::A => 0x01c0,
            Counter::B => 0x01e0,
        }
    }

    /// Index of the counter in [`Reading::Counters`].
    pub const fn index(self) -> usize {
        match self {
            Counter::A => 0,
            Counter::B => 1,
        }
    }
}

impl TryFrom<u8> for Counter {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Counter::A),
            1 => Ok(Counter::B),
            _ => Err(value),
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Counter::A => f.write_str("A"),
            Counter::B => f.write_str("B"),
        }
    }
}

/// Reads one counter once, without retrying.
///
/// # Errors
/// [`OneWireError::InvalidCrc`] if the CRC-16 trailing the transfer does not match.
pub fn read_counter_once<O: OneWire>(
    bus: &mut O,
    rom: &Rom,
    counter: Counter,
) -> OneWireResult<u32, O::BusError> {
    bus.address(Some(rom))?;
    let mut frame = [0; FRAME_LEN];
    let [lo, hi] = counter.page_address().to_le_bytes();
    frame[..3].copy_from_slice(&[READ_MEMORY_COUNTER, lo, hi]);
    bus.write_bytes(&frame[..3])?;
    bus.read_bytes(&mut frame[3..])?;
    bus.reset()?;
    if !check_crc16(
        &frame[..CRC_OFFSET],
        [frame[CRC_OFFSET], frame[CRC_OFFSET + 1]],
        0,
    ) {
        log::warn!("{rom}: counter {counter} CRC mismatch");
        return Err(OneWireError::InvalidCrc);
    }
    let mut value = [0; 4];
    value.copy_from_slice(&frame[COUNTER_OFFSET..COUNTER_OFFSET + 4]);
    let value = u32::from_le_bytes(value);
    log::debug!("{rom}: counter {counter} = {value}");
    Ok(value)
}

/// Reads one counter of `node`, retrying up to [`MAX_RETRIES`] times.
///
/// On success the value is stored in the reading of `node`; the other
/// counter keeps its last value.
pub fn read_counter<O: OneWire>(
    bus: &mut O,
    node: &mut OneWireNode,
    counter: Counter,
) -> OneWireResult<u32, O::BusError> {
    node.expect_family::<O::BusError>(&[Family::Ds2423])?;
    let rom = node.rom();
    let value = node.retry(MAX_RETRIES, |_| read_counter_once(bus, &rom, counter))?;
    let mut counters = match node.reading {
        Reading::Counters(c) => c,
        _ => [0; 2],
    };
    counters[counter.index()] = value;
    node.reading = Reading::Counters(counters);
    Ok(value)
}

/// Reads both counters of `node`.
pub fn read_counters<O: OneWire>(
    bus: &mut O,
    node: &mut OneWireNode,
) -> OneWireResult<[u32; 2], O::BusError> {
    let a = read_counter(bus, node, Counter::A)?;
    let b = read_counter(bus, node, Counter::B)?;
    Ok([a, b])
}

/// Reads the counter with index `index` (0 for A, 1 for B) of `node`.
///
/// # Errors
/// [`OneWireError::InvalidArgument`] for any other index.
pub fn read_counter_by_index<O: OneWire>(
    bus: &mut O,
    node: &mut OneWireNode,
    index: u8,
) -> OneWireResult<u32, O::BusError> {
    let counter = Counter::try_from(index).map_err(|_| OneWireError::InvalidArgument)?;
    read_counter(bus, node, counter)
}
