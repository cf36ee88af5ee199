#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]
//! # DS2408
//!
//! Support for the DS2408 8-channel addressable switch (family `0x29`),
//! typically driving a relay board.
//!
//! Every operation addresses a single device with Match ROM. Writes use the
//! Channel Access Write command, which carries the new state and its
//! complement and is acknowledged by the device; reads fetch the PIO
//! registers with their CRC-16.

use embedded_onewire::{
    Family, MAX_RETRIES, OneWire, OneWireError, OneWireNode, OneWireResult, Reading, Rom,
};

mod registers;

pub use registers::{ControlStatus, PioRegisters};
use registers::{CONTROL_STATUS_ADDR, PIO_LOGIC_STATE_ADDR};

const CHANNEL_ACCESS_WRITE: u8 = 0x5a;
const CHANNEL_ACCESS_ACK: u8 = 0xaa;
const READ_PIO_REGISTERS: u8 = 0xf0;
const WRITE_CONDITIONAL_SEARCH_REGISTER: u8 = 0xcc;
const RESET_TEST_MODE: [u8; 2] = [0x96, 0x3c];

/// Output state applied at start-up: every output transistor off.
pub const STARTUP_STATE: u8 = 0xff;

/// Writes `state` to the output latches of the selected device and returns
/// the PIO pin state sampled right after.
fn channel_access_write<O: OneWire>(
    bus: &mut O,
    rom: &Rom,
    state: u8,
) -> OneWireResult<u8, O::BusError> {
    bus.write_bytes(&[CHANNEL_ACCESS_WRITE, state, !state])?;
    let ack = bus.read_byte()?;
    if ack != CHANNEL_ACCESS_ACK {
        log::warn!("{rom}: channel access not acknowledged ({ack:#04x})");
        return Err(OneWireError::UnexpectedStatus(ack));
    }
    let pins = bus.read_byte()?;
    bus.reset()?;
    log::debug!("{rom}: state {state:#04x}, pins {pins:#04x}");
    Ok(pins)
}

/// Sets the output latches of a switch once, without retrying.
///
/// Returns the PIO pin state sampled after the write.
pub fn set_state_once<O: OneWire>(
    bus: &mut O,
    rom: &Rom,
    state: u8,
) -> OneWireResult<u8, O::BusError> {
    bus.address(Some(rom))?;
    channel_access_write(bus, rom, state)
}

/// Sets the output latches of the switch `node`, retrying up to [`MAX_RETRIES`] times.
///
/// Once the device has been selected, retries re-select it with Resume
/// instead of sending its ROM again. On success the sampled pin state is
/// returned and stored as the reading of `node`.
pub fn set_state<O: OneWire>(
    bus: &mut O,
    node: &mut OneWireNode,
    state: u8,
) -> OneWireResult<u8, O::BusError> {
    node.expect_family::<O::BusError>(&[Family::Ds2408])?;
    let rom = node.rom();
    let mut selected = false;
    let pins = node.retry(MAX_RETRIES, |_| {
        if selected {
            bus.reset_checked()?;
            bus.resume()?;
        } else {
            bus.address(Some(&rom))?;
            selected = true;
        }
        channel_access_write(bus, &rom, state)
    })?;
    node.reading = Reading::Switch(pins);
    Ok(pins)
}

/// Reads the PIO registers of a switch once, checking their CRC.
pub fn read_registers<O: OneWire>(
    bus: &mut O,
    rom: &Rom,
) -> OneWireResult<PioRegisters, O::BusError> {
    bus.address(Some(rom))?;
    let mut frame = [0; 13];
    let [lo, hi] = PIO_LOGIC_STATE_ADDR.to_le_bytes();
    frame[..3].copy_from_slice(&[READ_PIO_REGISTERS, lo, hi]);
    bus.write_bytes(&frame[..3])?;
    bus.read_bytes(&mut frame[3..])?;
    bus.reset()?;
    PioRegisters::from_frame(&frame).ok_or_else(|| {
        log::warn!("{rom}: PIO registers CRC mismatch");
        OneWireError::InvalidCrc
    })
}

/// Reads the PIO pin state of the switch `node`, retrying up to [`MAX_RETRIES`] times.
///
/// On success the state is stored as the reading of `node`.
pub fn get_state<O: OneWire>(
    bus: &mut O,
    node: &mut OneWireNode,
) -> OneWireResult<u8, O::BusError> {
    node.expect_family::<O::BusError>(&[Family::Ds2408])?;
    let rom = node.rom();
    let pins = node.retry(MAX_RETRIES, |_| read_registers(bus, &rom))?.logic_state();
    node.reading = Reading::Switch(pins);
    Ok(pins)
}

/// Configures the RSTZ pin as a strobe output and checks the setting was taken.
pub fn reconfigure<O: OneWire>(
    bus: &mut O,
    rom: &Rom,
) -> OneWireResult<ControlStatus, O::BusError> {
    bus.address(Some(rom))?;
    let [lo, hi] = CONTROL_STATUS_ADDR.to_le_bytes();
    let control = ControlStatus::new().with_ros(true);
    bus.write_bytes(&[WRITE_CONDITIONAL_SEARCH_REGISTER, lo, hi, control.into_bits()])?;
    bus.reset()?;
    let control = read_registers(bus, rom)?.control_status();
    if control.ros() {
        Ok(control)
    } else {
        log::warn!("{rom}: control register not updated ({:#04x})", control.into_bits());
        Err(OneWireError::UnexpectedStatus(control.into_bits()))
    }
}

/// Takes a device out of the test mode it may power up in.
///
/// Devices left in test mode do not drive their outputs.
pub fn exit_test_mode<O: OneWire>(bus: &mut O, rom: &Rom) -> OneWireResult<(), O::BusError> {
    bus.reset()?;
    bus.write_byte(RESET_TEST_MODE[0])?;
    bus.write_bytes(rom.bytes())?;
    bus.write_byte(RESET_TEST_MODE[1])?;
    bus.reset()?;
    Ok(())
}

/// Brings a freshly powered switch into a known state.
///
/// Exits test mode, configures the control register and turns every output off.
pub fn initialize<O: OneWire>(
    bus: &mut O,
    node: &mut OneWireNode,
) -> OneWireResult<u8, O::BusError> {
    node.expect_family::<O::BusError>(&[Family::Ds2408])?;
    let rom = node.rom();
    exit_test_mode(bus, &rom)?;
    node.retry(MAX_RETRIES, |_| reconfigure(bus, &rom))?;
    set_state(bus, node, STARTUP_STATE)
}
