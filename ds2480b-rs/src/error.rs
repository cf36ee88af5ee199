#[derive(Debug, PartialEq, Eq)]
/// DS2480B Hardware Errors
pub enum Ds2480bError<E> {
    /// Serial port errors.
    Serial(E),
    /// The serial port refused to change its baud rate.
    BaudRate(E),
}

impl<E> From<E> for Ds2480bError<E> {
    fn from(value: E) -> Self {
        Self::Serial(value)
    }
}
