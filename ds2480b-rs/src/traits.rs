use embedded_io::ErrorType;

/// Serial ports whose baud rate can be changed at run time.
///
/// The DS2480B is master-reset by holding its receive line low for longer
/// than t<sub>MR</sub>, which is done by sending NUL characters at a lower
/// rate than the one used for communication.
pub trait SetBaudRate: ErrorType {
    /// Change the baud rate of the port. Bytes already queued for
    /// transmission must be sent before the change takes effect.
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), Self::Error>;
}

impl<T: SetBaudRate + ?Sized> SetBaudRate for &mut T {
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), Self::Error> {
        T::set_baud_rate(self, baud)
    }
}
