#![cfg_attr(not(any(test, feature = "mock")), no_std)]
#![deny(missing_docs)]
//! # embedded-onewire
//! A no-std implementation of the 1-Wire protocol.
//!
//! This crate provides a trait-based interface for 1-Wire communication, allowing you to implement the protocol on various platforms.
//! [OneWire] trait defines the basic operations required for 1-Wire communication, such as resetting the bus, writing and reading bytes, and writing and reading bits,
//! together with the ROM-level addressing commands built on top of them.
//!
//! The crate also provides
//! - the search algorithm for discovering devices on the 1-Wire bus, implemented in [OneWireSearch],
//! - the Dallas CRC-8 and CRC-16 checks in [OneWireCrc] and [OneWireCrc16],
//! - the 64-bit device address type [Rom] and the supported [Family] codes,
//! - a per-device record, [OneWireNode], carrying the last reading and error counters.
//!
//! Test doubles for the [OneWire] trait live in the `mock` module, behind the `mock` feature.

mod consts;
mod crc;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod node;
mod rom;
mod search;
mod traits;

pub use consts::*;
pub use crc::{OneWireCrc, OneWireCrc16, check_crc16, crc8, crc16};
pub use error::OneWireError;
pub use node::{MAX_RETRIES, OneWireNode, Reading};
pub use rom::{Family, Rom, RomParseError};
pub use search::{Devices, OneWireSearch};
pub use traits::{OneWire, OneWireStatus};

/// Error type for 1-Wire operations.
pub type OneWireResult<T, E> = Result<T, OneWireError<E>>;
