use fixed::types::I12F4;

use crate::{Family, OneWireError, OneWireResult, Rom};

/// Number of retries after a failed attempt, before a device protocol gives up.
pub const MAX_RETRIES: u8 = 3;

/// Last value read from, or written to, a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reading {
    /// Nothing read yet.
    #[default]
    Unset,
    /// Temperature in degrees Celsius.
    Temperature(I12F4),
    /// Sampled PIO pin state of a switch.
    Switch(u8),
    /// Counter values; counters not read yet are zero.
    Counters([u32; 2]),
}

/// A device on the bus, as tracked by the application.
///
/// Device protocols update the reading and the counters; everything else
/// about the device (names, limits, persistence) belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneWireNode {
    rom: Rom,
    /// Last reading.
    pub reading: Reading,
    /// Failed read/write attempts, including the ones recovered by a retry.
    pub errors: u32,
    /// Successful read/write operations.
    pub success: u32,
    /// Operations in a row that failed after exhausting their retries.
    pub failed_in_row: u16,
}

impl OneWireNode {
    /// Creates the record of a newly discovered device.
    pub fn new(rom: Rom) -> Self {
        Self {
            rom,
            reading: Reading::Unset,
            errors: 0,
            success: 0,
            failed_in_row: 0,
        }
    }

    /// Address of the device.
    pub fn rom(&self) -> Rom {
        self.rom
    }

    /// Family code of the device.
    pub fn family_code(&self) -> u8 {
        self.rom.family_code()
    }

    /// Family of the device, if supported.
    pub fn family(&self) -> Option<Family> {
        self.rom.family()
    }

    /// Fails with [`OneWireError::WrongFamily`] unless the device is of one of `families`.
    pub fn expect_family<E>(&self, families: &[Family]) -> OneWireResult<(), E> {
        let found = self.family_code();
        if families.iter().any(|f| f.code() == found) {
            Ok(())
        } else {
            Err(OneWireError::WrongFamily {
                expected: families.first().map_or(0, |f| f.code()),
                found,
            })
        }
    }

    /// Runs `op` until it succeeds, at most `retries + 1` times.
    ///
    /// `op` is passed the attempt number, starting at zero. Every failed
    /// attempt increments [`errors`](OneWireNode::errors); success increments
    /// [`success`](OneWireNode::success) and clears
    /// [`failed_in_row`](OneWireNode::failed_in_row). If every attempt fails,
    /// the last error is returned and `failed_in_row` is incremented.
    pub fn retry<T, E, F>(&mut self, retries: u8, mut op: F) -> OneWireResult<T, E>
    where
        F: FnMut(u8) -> OneWireResult<T, E>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => {
                    self.success = self.success.wrapping_add(1);
                    self.failed_in_row = 0;
                    return Ok(value);
                }
                Err(e) => {
                    self.errors = self.errors.wrapping_add(1);
                    if attempt >= retries {
                        self.failed_in_row = self.failed_in_row.saturating_add(1);
                        return Err(e);
                    }
                    log::debug!("{}: attempt {} failed, retrying", self.rom, attempt + 1);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    fn node() -> OneWireNode {
        OneWireNode::new("29.29E1030000009C".parse().unwrap())
    }

    #[test]
    fn retry_counts_errors_and_success() {
        let mut node = node();
        let res: OneWireResult<u8, Infallible> = node.retry(MAX_RETRIES, |attempt| {
            if attempt < 2 {
                Err(OneWireError::InvalidCrc)
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(res, Ok(2));
        assert_eq!((node.errors, node.success, node.failed_in_row), (2, 1, 0));
    }

    #[test]
    fn retry_gives_up_after_the_bound() {
        let mut node = node();
        let mut calls = 0;
        let res: OneWireResult<(), Infallible> = node.retry(MAX_RETRIES, |_| {
            calls += 1;
            Err(OneWireError::NoDevicePresent)
        });
        assert_eq!(res, Err(OneWireError::NoDevicePresent));
        assert_eq!(calls, MAX_RETRIES as usize + 1);
        assert_eq!((node.errors, node.success, node.failed_in_row), (4, 0, 1));
    }

    #[test]
    fn family_check() {
        let node = node();
        assert_eq!(node.expect_family::<Infallible>(&[Family::Ds2408]), Ok(()));
        assert_eq!(
            node.expect_family::<Infallible>(&[Family::Ds18b20, Family::Ds1822]),
            Err(OneWireError::WrongFamily { expected: 0x28, found: 0x29 })
        );
    }
}
