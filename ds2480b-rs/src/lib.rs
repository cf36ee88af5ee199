#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

/*! # DS2480B
 *
 * Driver for the DS2480B serial to 1-Wire line driver.
 *
 * The chip sits on a UART and interprets the byte stream in one of two
 * modes: in *command mode* bytes are commands (bus reset, single-bit time
 * slots, configuration), in *data mode* every byte is transmitted on the
 * 1-Wire bus and the byte sampled from the bus is echoed back.
 * [`Ds2480b`] keeps track of the mode, switches only when needed, and
 * implements the [`OneWire`] trait on top of it.
 *
 * The serial port must implement the [`embedded_io`] [`Read`](embedded_io::Read),
 * [`Write`](embedded_io::Write) and [`ReadReady`](embedded_io::ReadReady) traits,
 * plus [`SetBaudRate`] for the master reset performed at start-up.
 */

pub use embedded_onewire::{OneWire, OneWireError, OneWireResult};
mod bridge;
mod error;
#[cfg(test)]
mod fake;
mod onewire;
mod status;
mod traits;

pub use bridge::{Ds2480b, Ds2480bBuilder, Mode};
pub use error::Ds2480bError;
pub use status::ResetResponse;
pub use traits::SetBaudRate;

/// Results of DS2480B-specific function calls.
pub type Ds2480bResult<T, E> = Result<T, Ds2480bError<E>>;
