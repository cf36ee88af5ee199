//! A DS2480B stand-in answering on the serial side, for unit tests.

use std::collections::VecDeque;

use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write};

use crate::{
    Ds2480b, Ds2480bBuilder, Mode, SetBaudRate,
    bridge::{BUS_RESET, COMMAND_MODE, DATA_MODE, DEFAULT_BAUD, PULSE_TERMINATE},
    onewire::{READ_FILL, WRITE_ONE_BIT, WRITE_ZERO_BIT},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FakeError;

impl embedded_io::Error for FakeError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug)]
pub(crate) struct FakeChip {
    pub baud: u32,
    pub bauds: Vec<u32>,
    pub refuse_baud: bool,
    pub mode: Mode,
    pub calibrated: bool,
    pub presence: bool,
    pub silent: bool,
    /// Bytes driven by devices in answer to `0xff` read slots.
    pub reads: VecDeque<u8>,
    /// Bits driven by devices in answer to read slots.
    pub bits: VecDeque<bool>,
    /// Bytes waiting to be read by the host.
    pub rx: VecDeque<u8>,
    /// Raw bytes received from the host.
    pub tx: Vec<u8>,
    /// Data bytes put on the 1-Wire bus.
    pub bus: Vec<u8>,
    pub master_resets: usize,
    pub polls: usize,
    pending: Option<u8>,
}

impl FakeChip {
    pub fn new() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            bauds: Vec::new(),
            refuse_baud: false,
            mode: Mode::Command,
            calibrated: false,
            presence: true,
            silent: false,
            reads: VecDeque::new(),
            bits: VecDeque::new(),
            rx: VecDeque::new(),
            tx: Vec::new(),
            bus: Vec::new(),
            master_resets: 0,
            polls: 0,
            pending: None,
        }
    }

    /// A bridge past its master reset, with a short reply timeout and an empty log.
    pub fn ready() -> Ds2480b<FakeChip, NoopDelay> {
        let mut dev = Ds2480bBuilder::default()
            .with_retries(10)
            .build(FakeChip::new(), NoopDelay::new())
            .unwrap();
        dev.serial.tx.clear();
        dev.serial.bauds.clear();
        dev.serial.polls = 0;
        dev
    }

    fn receive(&mut self, byte: u8) {
        self.tx.push(byte);
        if self.baud != DEFAULT_BAUD {
            // a NUL at a lower rate looks like a long break
            if byte == 0x00 {
                self.master_resets += 1;
                self.mode = Mode::Command;
                self.calibrated = false;
                self.pending = None;
            }
            return;
        }
        match self.mode {
            Mode::Command => self.command(byte),
            Mode::Data => self.data(byte),
        }
    }

    fn command(&mut self, byte: u8) {
        if !self.calibrated {
            self.calibrated = true;
            return;
        }
        match byte {
            DATA_MODE => self.mode = Mode::Data,
            BUS_RESET => self.reply(if self.presence { 0xcd } else { 0xcf }),
            WRITE_ONE_BIT => {
                let bit = self.bits.pop_front().unwrap_or(true);
                self.reply(if bit { 0x93 } else { 0x90 });
            }
            WRITE_ZERO_BIT => self.reply(0x80),
            _ => {}
        }
    }

    fn data(&mut self, byte: u8) {
        if let Some(first) = self.pending.take() {
            if first == byte {
                self.on_bus(byte);
                return;
            }
            if first == COMMAND_MODE {
                self.mode = Mode::Command;
                self.command(byte);
                return;
            }
        }
        if matches!(byte, DATA_MODE | COMMAND_MODE | PULSE_TERMINATE) {
            self.pending = Some(byte);
        } else {
            self.on_bus(byte);
        }
    }

    fn on_bus(&mut self, byte: u8) {
        self.bus.push(byte);
        let sampled = if byte == READ_FILL {
            self.reads.pop_front().unwrap_or(0xff)
        } else {
            byte
        };
        self.reply(sampled);
    }

    fn reply(&mut self, byte: u8) {
        if !self.silent {
            self.rx.push_back(byte);
        }
    }
}

impl ErrorType for FakeChip {
    type Error = FakeError;
}

impl Write for FakeChip {
    fn write(&mut self, buf: &[u8]) -> Result<usize, FakeError> {
        buf.iter().for_each(|&b| self.receive(b));
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), FakeError> {
        Ok(())
    }
}

impl Read for FakeChip {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FakeError> {
        let mut n = 0;
        while n < buf.len() {
            match self.rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl ReadReady for FakeChip {
    fn read_ready(&mut self) -> Result<bool, FakeError> {
        self.polls += 1;
        Ok(!self.rx.is_empty())
    }
}

impl SetBaudRate for FakeChip {
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), FakeError> {
        if self.refuse_baud {
            return Err(FakeError);
        }
        self.baud = baud;
        self.bauds.push(baud);
        Ok(())
    }
}
