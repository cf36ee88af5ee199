use crate::{
    ONEWIRE_MATCH_ROM_CMD, ONEWIRE_READ_POWER_SUPPLY_CMD, ONEWIRE_RESUME_CMD,
    ONEWIRE_SKIP_ROM_CMD, OneWireError, OneWireResult, Rom,
};

/// Status reported by a bus master after a 1-Wire reset.
pub trait OneWireStatus {
    /// Whether at least one device answered the reset with a presence pulse.
    fn presence(&self) -> bool;

    /// Whether the bus master detected a short circuit on the 1-Wire line.
    fn shortcircuit(&self) -> bool;
}

/// Trait for 1-Wire communication.
/// This trait defines the basic operations required for 1-Wire communication, such as resetting the bus,
/// writing and reading bytes, and writing and reading bits.
///
/// The ROM-level helpers ([`select`](OneWire::select), [`skip`](OneWire::skip),
/// [`resume`](OneWire::resume), [`address`](OneWire::address)) have default
/// implementations in terms of the primitives.
///
/// Implementations own the bus for the duration of each call. A caller that
/// shares a bus master between threads must serialize whole transactions
/// (reset to last byte), not individual calls.
pub trait OneWire {
    /// The status type returned by the reset operation.
    /// This type must implement the [OneWireStatus] trait.
    type Status: OneWireStatus;
    /// The error type returned by the operations of this trait.
    /// This type is used to indicate errors in the underlying hardware or communication.
    type BusError;

    /// Resets the 1-Wire bus and returns the status of the bus.
    ///
    /// A missing presence pulse is reported through [`OneWireStatus::presence`],
    /// not as an error.
    ///
    /// # Errors
    /// This method returns an error if the bus master cannot be reached.
    fn reset(&mut self) -> OneWireResult<Self::Status, Self::BusError>;

    /// Writes a byte to the 1-Wire bus.
    /// # Arguments
    /// * `byte` - The byte to write to the bus.
    ///
    /// # Errors
    /// This method returns an error if the write operation fails.
    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError>;

    /// Reads a byte from the 1-Wire bus.
    /// # Returns
    /// Byte read from the bus.
    ///
    /// # Errors
    /// This method returns an error if the read operation fails.
    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError>;

    /// Writes a single bit to the 1-Wire bus.
    /// # Arguments
    /// * `bit` - The bit to write.
    ///
    /// # Errors
    /// This method returns an error if the write operation fails.
    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError>;

    /// Reads a single bit from the 1-Wire bus.
    /// # Returns
    /// The bit read from the bus.
    /// # Errors
    /// This method returns an error if the read operation fails.
    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError>;

    /// Writes all bytes of `bytes` to the bus, in order.
    fn write_bytes(&mut self, bytes: &[u8]) -> OneWireResult<(), Self::BusError> {
        for &b in bytes {
            self.write_byte(b)?;
        }
        Ok(())
    }

    /// Fills `buf` with bytes read from the bus.
    fn read_bytes(&mut self, buf: &mut [u8]) -> OneWireResult<(), Self::BusError> {
        for b in buf.iter_mut() {
            *b = self.read_byte()?;
        }
        Ok(())
    }

    /// Resets the bus and fails unless a device answered with a presence pulse.
    fn reset_checked(&mut self) -> OneWireResult<Self::Status, Self::BusError> {
        let status = self.reset()?;
        if status.shortcircuit() {
            Err(OneWireError::ShortCircuit)
        } else if !status.presence() {
            Err(OneWireError::NoDevicePresent)
        } else {
            Ok(status)
        }
    }

    /// Issues a Match ROM command followed by the 64-bit ROM code.
    ///
    /// Addresses exactly one device until the next reset. The bus must have been reset first.
    fn select(&mut self, rom: &Rom) -> OneWireResult<(), Self::BusError> {
        self.write_byte(ONEWIRE_MATCH_ROM_CMD)?;
        self.write_bytes(rom.bytes())
    }

    /// Issues a Skip ROM command, addressing all devices on the bus simultaneously.
    fn skip(&mut self) -> OneWireResult<(), Self::BusError> {
        self.write_byte(ONEWIRE_SKIP_ROM_CMD)
    }

    /// Issues a Resume command, re-selecting the device addressed last.
    ///
    /// The bus must have been reset first.
    fn resume(&mut self) -> OneWireResult<(), Self::BusError> {
        self.write_byte(ONEWIRE_RESUME_CMD)
    }

    /// Addresses devices on the 1-Wire bus.
    /// The first [`OneWire::read_byte`], [`OneWire::read_bit`], [`OneWire::write_byte`], [`OneWire::write_bit`] operation should be preceded by this method to address devices on the bus.
    /// Note: A [`OneWire::read_byte`] or [`OneWire::read_bit`] call will return garbage data if this method is called without specifying a ROM address on a bus with multiple devices.
    /// # Arguments
    /// * `rom` - The ROM address of the device to address. Pass [`None`] to skip ROM addressing and address all devices on the bus.
    ///
    /// # Errors
    /// [`OneWireError::NoDevicePresent`] if no device answered the reset.
    fn address(&mut self, rom: Option<&Rom>) -> OneWireResult<(), Self::BusError> {
        self.reset_checked()?;
        match rom {
            Some(rom) => self.select(rom),
            None => self.skip(),
        }
    }

    /// Checks whether the device `rom` runs on parasite power (no V<sub>DD</sub> connection).
    ///
    /// The bus is reset after the check, whatever its outcome.
    fn is_parasite_powered(&mut self, rom: &Rom) -> OneWireResult<bool, Self::BusError> {
        let bit = self.address(Some(rom)).and_then(|_| {
            self.write_byte(ONEWIRE_READ_POWER_SUPPLY_CMD)?;
            self.read_bit()
        });
        self.reset()?;
        // parasite-powered devices pull the read slot low
        bit.map(|externally_powered| !externally_powered)
    }
}
