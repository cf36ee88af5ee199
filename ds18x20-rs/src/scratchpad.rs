use embedded_onewire::{Family, OneWireCrc};
use fixed::types::I12F4;

/// Temperature in degrees Celsius, in 1/16 degree steps.
pub type Temperature = I12F4;

/// Power-on value of the temperature register.
///
/// A sensor that reports it most likely lost power or was never asked to convert.
pub const POWER_ON_TEMPERATURE: Temperature = Temperature::from_bits(85 << 4);

/// Conversion resolution of the DS1822 and DS18B20, as stored in the configuration register.
///
/// The DS18S20 always converts at 9 bits and extends the result using its count registers.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ReadoutResolution {
    /// 0.5 degree steps.
    Resolution9bit = 0x1f,
    /// 0.25 degree steps.
    Resolution10bit = 0x3f,
    /// 0.125 degree steps.
    Resolution11bit = 0x5f,
    /// 0.0625 degree steps.
    #[default]
    Resolution12bit = 0x7f,
}

impl ReadoutResolution {
    /// Maximum conversion time at this resolution, in microseconds.
    pub fn delay_us(&self) -> u32 {
        use ReadoutResolution::*;
        match self {
            Resolution9bit => 93750,
            Resolution10bit => 187500,
            Resolution11bit => 375000,
            Resolution12bit => 750000,
        }
    }

    /// Number of significant bits of a reading.
    pub fn bits(&self) -> u8 {
        use ReadoutResolution::*;
        match self {
            Resolution9bit => 9,
            Resolution10bit => 10,
            Resolution11bit => 11,
            Resolution12bit => 12,
        }
    }

    /// Decodes the resolution select bits (R1, R0) of a configuration register.
    pub fn from_config(config: u8) -> Self {
        use ReadoutResolution::*;
        match config & 0x60 {
            0x00 => Resolution9bit,
            0x20 => Resolution10bit,
            0x40 => Resolution11bit,
            _ => Resolution12bit,
        }
    }

    /// Clears the bits of a raw reading that are undefined at this resolution.
    pub(crate) fn mask(&self, raw: i16) -> i16 {
        use ReadoutResolution::*;
        match self {
            Resolution9bit => raw & !0x07,
            Resolution10bit => raw & !0x03,
            Resolution11bit => raw & !0x01,
            Resolution12bit => raw,
        }
    }
}

impl TryFrom<u8> for ReadoutResolution {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use ReadoutResolution::*;
        match value {
            9 | 0x1f => Ok(Resolution9bit),
            10 | 0x3f => Ok(Resolution10bit),
            11 | 0x5f => Ok(Resolution11bit),
            12 | 0x7f => Ok(Resolution12bit),
            _ => Err(value),
        }
    }
}

/// The nine bytes returned by Read Scratchpad.
///
/// | Byte | DS18S20 | DS1822 / DS18B20 |
/// |------|---------|------------------|
/// | 0-1 | Temperature, 0.5 degree steps | Temperature, 1/16 degree steps |
/// | 2-3 | T<sub>H</sub>, T<sub>L</sub> | T<sub>H</sub>, T<sub>L</sub> |
/// | 4 | Reserved | Configuration |
/// | 5 | Reserved | Reserved |
/// | 6 | COUNT REMAIN | Reserved |
/// | 7 | COUNT PER °C | Reserved |
/// | 8 | CRC-8 of bytes 0-7 | CRC-8 of bytes 0-7 |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scratchpad([u8; 9]);

impl Scratchpad {
    /// Wraps the bytes read from a device, without checking them.
    pub const fn new(bytes: [u8; 9]) -> Self {
        Self(bytes)
    }

    /// The raw bytes.
    pub fn bytes(&self) -> &[u8; 9] {
        &self.0
    }

    /// Whether the last byte is the CRC-8 of the first eight.
    pub fn is_valid(&self) -> bool {
        OneWireCrc::compute(&self.0[..8]) == self.0[8]
    }

    /// Raw temperature register.
    pub fn raw(&self) -> i16 {
        i16::from_le_bytes([self.0[0], self.0[1]])
    }

    /// Upper alarm limit, in whole degrees.
    pub fn alarm_high(&self) -> i8 {
        self.0[2] as i8
    }

    /// Lower alarm limit, in whole degrees.
    pub fn alarm_low(&self) -> i8 {
        self.0[3] as i8
    }

    /// Resolution set in the configuration register (DS1822 / DS18B20 only).
    pub fn resolution(&self) -> ReadoutResolution {
        ReadoutResolution::from_config(self.0[4])
    }

    /// Decodes the temperature as reported by a device of the family `family_code`.
    pub fn temperature(&self, family_code: u8) -> Temperature {
        let raw = self.raw();
        let raw = if family_code == Family::Ds18s20.code() {
            let raw = raw.wrapping_shl(3);
            if self.0[7] == 0x10 {
                // count remain gives the full 12-bit resolution
                (raw & !0x0f)
                    .wrapping_add(12)
                    .wrapping_sub(i16::from(self.0[6]))
            } else {
                raw
            }
        } else {
            self.resolution().mask(raw)
        };
        raw_to_celsius(raw)
    }
}

/// Converts a raw reading in 1/16 degree steps to degrees Celsius.
pub fn raw_to_celsius(raw: i16) -> Temperature {
    Temperature::from_bits(raw)
}
