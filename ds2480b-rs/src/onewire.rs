use crate::{
    Ds2480b, Ds2480bError, ResetResponse,
    bridge::{BUS_RESET, COMMAND_MODE, DATA_MODE, PULSE_TERMINATE},
};
use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};
use embedded_onewire::{OneWire, OneWireError, OneWireResult, OneWireStatus};

pub(crate) const WRITE_ONE_BIT: u8 = 0x91; // Single bit time slot, write 1 (read), regular speed
pub(crate) const WRITE_ZERO_BIT: u8 = 0x81; // Single bit time slot, write 0, regular speed
pub(crate) const READ_FILL: u8 = 0xff;

impl<S: Read + Write + ReadReady, D: DelayNs> Ds2480b<S, D> {
    /// Generates a single bit time slot and returns the bit sampled on the bus.
    ///
    /// Writing a `1` leaves the line released, so the sampled bit is the one
    /// driven by the device: this is how bits are read.
    pub fn touch_bit(&mut self, bit: bool) -> OneWireResult<bool, Ds2480bError<S::Error>> {
        self.command_mode()?;
        self.send(&[if bit { WRITE_ONE_BIT } else { WRITE_ZERO_BIT }])?;
        Ok(self.echo()? & 0x01 == 0x01)
    }

    /// Transmits a byte on the bus and returns the byte sampled while doing so.
    pub fn touch_byte(&mut self, byte: u8) -> OneWireResult<u8, Ds2480bError<S::Error>> {
        self.data_mode()?;
        if matches!(byte, DATA_MODE | COMMAND_MODE | PULSE_TERMINATE) {
            // reserved in data mode, doubled to be sent as data
            self.send(&[byte, byte])?;
        } else {
            self.send(&[byte])?;
        }
        self.echo()
    }

    fn echo(&mut self) -> OneWireResult<u8, Ds2480bError<S::Error>> {
        self.read_reply()?.ok_or(OneWireError::LinkTimeout)
    }
}

impl<S: Read + Write + ReadReady, D: DelayNs> OneWire for Ds2480b<S, D> {
    type Status = ResetResponse;

    type BusError = Ds2480bError<S::Error>;

    fn reset(&mut self) -> OneWireResult<Self::Status, Self::BusError> {
        // late replies from a timed out operation would shift every later reply
        let stale = self.drain()?;
        if stale > 0 {
            log::warn!("discarded {stale} stale byte(s) from the DS2480B before reset");
        }
        self.command_mode()?;
        self.send(&[BUS_RESET])?;
        let status = self
            .read_reply()?
            .map(ResetResponse::from_bits)
            .unwrap_or_default();
        if !status.presence() {
            log::debug!("1-Wire reset: no presence pulse ({:#04x})", status.into_bits());
        }
        Ok(status)
    }

    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError> {
        self.touch_byte(byte).map(|_| ())
    }

    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError> {
        self.touch_byte(READ_FILL)
    }

    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError> {
        self.touch_bit(bit).map(|_| ())
    }

    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError> {
        self.touch_bit(true)
    }
}
