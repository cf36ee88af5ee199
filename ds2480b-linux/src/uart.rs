use std::{
    io::{self, Read as _, Write as _},
    time::Duration,
};

use ds2480b::SetBaudRate;
use embedded_io::{ErrorType, Read, ReadReady, Write};
use serialport::{ClearBuffer, SerialPort};

/// A serial port driving a DS2480B, exposed through the [`embedded_io`] traits.
pub struct SerialUart {
    port: Box<dyn SerialPort>,
}

impl SerialUart {
    /// Opens `path` at 9600 baud, 8N1, and drops anything pending in its buffers.
    pub fn open(path: &str) -> serialport::Result<Self> {
        let port = serialport::new(path, 9600)
            .timeout(Duration::from_millis(10))
            .open()?;
        port.clear(ClearBuffer::All)?;
        Ok(Self { port })
    }
}

impl ErrorType for SerialUart {
    type Error = io::Error;
}

impl Read for SerialUart {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        match self.port.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            res => res,
        }
    }
}

impl ReadReady for SerialUart {
    fn read_ready(&mut self) -> Result<bool, io::Error> {
        Ok(self.port.bytes_to_read()? > 0)
    }
}

impl Write for SerialUart {
    fn write(&mut self, buf: &[u8]) -> Result<usize, io::Error> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        self.port.flush()
    }
}

impl SetBaudRate for SerialUart {
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), io::Error> {
        // queued bytes must leave at the old rate
        self.port.flush()?;
        SerialPort::set_baud_rate(self.port.as_mut(), baud)?;
        log::trace!("serial port now at {baud} baud");
        Ok(())
    }
}
