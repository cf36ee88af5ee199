use crate::{Ds2480bError, Ds2480bResult, SetBaudRate};
use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};

pub(crate) const DATA_MODE: u8 = 0xe1; // Switch to data mode
pub(crate) const COMMAND_MODE: u8 = 0xe3; // Switch to command mode
pub(crate) const PULSE_TERMINATE: u8 = 0xf1; // Terminate strong pull-up / programming pulse
pub(crate) const BUS_RESET: u8 = 0xc1; // 1-Wire reset, regular speed
pub(crate) const DEFAULT_BAUD: u32 = 9600;
pub(crate) const MASTER_RESET_BAUD: u32 = 4800;

/// Interpretation of the bytes sent to the DS2480B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Bytes are commands to the chip itself.
    Command,
    /// Bytes are transmitted on the 1-Wire bus.
    Data,
}

/// A DS2480B serial to 1-Wire line driver.
///
/// Takes ownership of a serial port (implementing the [`embedded_io`] `Read`,
/// `Write` and `ReadReady` traits) and a timer implementing the
/// [`DelayNs`](embedded_hal::delay::DelayNs) trait. Create it with
/// [`Ds2480bBuilder`], which master-resets the chip before handing it out.
pub struct Ds2480b<S, D> {
    pub(crate) serial: S,
    pub(crate) delay: D,
    pub(crate) retries: u16,
    pub(crate) poll_interval_us: u32,
    pub(crate) mode: Mode,
}

/// Builder for creating a [`Ds2480b`] instance with custom configuration.
pub struct Ds2480bBuilder {
    pub(crate) retries: u16,
    pub(crate) poll_interval_us: u32,
}

impl Default for Ds2480bBuilder {
    fn default() -> Self {
        Ds2480bBuilder {
            retries: 3000,
            poll_interval_us: 100,
        }
    }
}

impl Ds2480bBuilder {
    /// Sets the number of times the host polls the serial port for a reply
    /// before the operation times out.
    pub fn with_retries(mut self, retries: u16) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the delay between two polls of the serial port, in microseconds.
    pub fn with_poll_interval_us(mut self, poll_interval_us: u32) -> Self {
        self.poll_interval_us = poll_interval_us;
        self
    }

    /// Builds a new `Ds2480b` instance and master-resets the chip.
    ///
    /// After this call the chip is in command mode and the serial port runs
    /// at 9600 baud.
    pub fn build<S, D>(self, serial: S, delay: D) -> Ds2480bResult<Ds2480b<S, D>, S::Error>
    where
        S: Read + Write + ReadReady + SetBaudRate,
        D: DelayNs,
    {
        let mut dev = Ds2480b {
            serial,
            delay,
            retries: self.retries,
            poll_interval_us: self.poll_interval_us,
            mode: Mode::Command,
        };
        dev.begin()?;
        Ok(dev)
    }
}

impl<S, D> Ds2480b<S, D> {
    /// The mode the chip is currently in.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Releases the serial port and the timer.
    pub fn release(self) -> (S, D) {
        (self.serial, self.delay)
    }
}

impl<S: Read + Write + ReadReady + SetBaudRate, D: DelayNs> Ds2480b<S, D> {
    /// Master-resets the chip and lets it calibrate its timing.
    ///
    /// Two NUL characters at half the normal rate hold the receive line low
    /// long enough to reset the chip. The first command afterwards is used
    /// for baud rate calibration and is not answered.
    pub(crate) fn begin(&mut self) -> Ds2480bResult<(), S::Error> {
        self.serial
            .set_baud_rate(MASTER_RESET_BAUD)
            .map_err(Ds2480bError::BaudRate)?;
        self.send(&[0x00, 0x00])?;
        self.serial
            .set_baud_rate(DEFAULT_BAUD)
            .map_err(Ds2480bError::BaudRate)?;
        self.mode = Mode::Command;
        self.delay.delay_ms(1);
        self.send(&[BUS_RESET])?;
        self.delay.delay_ms(1);
        let stale = self.drain()?;
        log::debug!("DS2480B master reset done, discarded {stale} byte(s)");
        Ok(())
    }
}

impl<S: Read + Write + ReadReady, D: DelayNs> Ds2480b<S, D> {
    /// Switches the chip to command mode, unless it already is.
    pub fn command_mode(&mut self) -> Ds2480bResult<(), S::Error> {
        if self.mode != Mode::Command {
            self.send(&[COMMAND_MODE])?;
            self.mode = Mode::Command;
        }
        Ok(())
    }

    /// Switches the chip to data mode, unless it already is.
    pub fn data_mode(&mut self) -> Ds2480bResult<(), S::Error> {
        if self.mode != Mode::Data {
            self.send(&[DATA_MODE])?;
            self.mode = Mode::Data;
        }
        Ok(())
    }

    /// Sends a raw command byte in command mode and waits for its reply.
    ///
    /// Returns [`None`] if the chip did not reply in time. Commands that the
    /// chip does not answer (such as configuration writes with a mismatching
    /// value) simply wait out the full timeout.
    pub fn write_command(&mut self, cmd: u8) -> Ds2480bResult<Option<u8>, S::Error> {
        self.command_mode()?;
        self.send(&[cmd])?;
        self.read_reply()
    }

    /// Prepares the chip for a sequence of data bytes.
    ///
    /// Discards replies left over from earlier, interrupted operations so that
    /// echoes line up with the bytes sent.
    pub fn begin_transaction(&mut self) -> Ds2480bResult<(), S::Error> {
        let stale = self.drain()?;
        if stale > 0 {
            log::warn!("discarded {stale} stale byte(s) from the DS2480B");
        }
        self.data_mode()
    }

    /// Returns the chip to command mode after a sequence of data bytes.
    pub fn end_transaction(&mut self) -> Ds2480bResult<(), S::Error> {
        self.command_mode()
    }

    pub(crate) fn send(&mut self, bytes: &[u8]) -> Ds2480bResult<(), S::Error> {
        self.serial.write_all(bytes)?;
        self.serial.flush()?;
        Ok(())
    }

    /// Waits for one byte from the chip, polling at most `retries + 1` times.
    pub(crate) fn read_reply(&mut self) -> Ds2480bResult<Option<u8>, S::Error> {
        for _ in 0..=self.retries {
            if self.serial.read_ready()? {
                let mut buf = [0; 1];
                if self.serial.read(&mut buf)? == 1 {
                    return Ok(Some(buf[0]));
                }
            }
            self.delay.delay_us(self.poll_interval_us);
        }
        log::trace!("DS2480B reply timed out");
        Ok(None)
    }

    pub(crate) fn drain(&mut self) -> Ds2480bResult<usize, S::Error> {
        let mut count = 0;
        let mut buf = [0; 8];
        while self.serial.read_ready()? {
            match self.serial.read(&mut buf)? {
                0 => break,
                n => count += n,
            }
        }
        Ok(count)
    }
}
