/// One wire communication error type.
#[derive(Debug, PartialEq, Eq)]
pub enum OneWireError<E> {
    /// Encapsulates the error type from the underlying hardware.
    Other(E),
    /// Indicates that no device is present on the bus.
    NoDevicePresent,
    /// Indicates that a short circuit was detected on the bus.
    ShortCircuit,
    /// The bus master did not reply within its wait bound.
    LinkTimeout,
    /// Computed CRC of the ROM is invalid.
    InvalidRomCrc,
    /// Computed CRC of the data read from a device does not match the transmitted CRC.
    InvalidCrc,
    /// The device answered, but not with the expected acknowledgement byte.
    UnexpectedStatus(u8),
    /// The operation does not apply to the family of the addressed device.
    WrongFamily {
        /// Family code the operation requires.
        expected: u8,
        /// Family code of the addressed device.
        found: u8,
    },
    /// An argument is out of the range supported by the device.
    InvalidArgument,
}

impl<E> From<E> for OneWireError<E> {
    fn from(other: E) -> Self {
        Self::Other(other)
    }
}

impl<E> OneWireError<E> {
    /// Whether the error came from the data integrity checks.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::InvalidCrc | Self::InvalidRomCrc)
    }
}
