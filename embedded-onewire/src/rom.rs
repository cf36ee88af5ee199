use core::{fmt, str::FromStr};

use crate::OneWireCrc;

/// 64-bit 1-Wire device address.
///
/// | Byte | Description |
/// |------|-------------|
/// | 0 | Family code (e.g., 0x28 for DS18B20) |
/// | 1-6 | Serial number, least significant byte first |
/// | 7 | CRC-8 of bytes 0-6 |
///
/// Displayed and parsed as `FF.SSSSSSSSSSSSCC`, e.g. `28.EEA89B19160262`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Rom([u8; 8]);

impl Rom {
    /// Create a ROM from its bytes, in bus order.
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Create a ROM from its little-endian `u64` representation.
    pub const fn from_u64(value: u64) -> Self {
        Self(value.to_le_bytes())
    }

    /// The ROM as a little-endian `u64`.
    pub const fn to_u64(&self) -> u64 {
        u64::from_le_bytes(self.0)
    }

    /// The ROM bytes in bus order.
    pub const fn bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Family code of the device.
    pub const fn family_code(&self) -> u8 {
        self.0[0]
    }

    /// Family of the device, if it is one of the supported ones.
    pub fn family(&self) -> Option<Family> {
        Family::try_from(self.0[0]).ok()
    }

    /// Whether the last byte is the CRC-8 of the first seven.
    pub fn is_valid(&self) -> bool {
        OneWireCrc::compute(&self.0[..7]) == self.0[7]
    }
}

impl From<[u8; 8]> for Rom {
    fn from(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}

impl From<Rom> for u64 {
    fn from(rom: Rom) -> Self {
        rom.to_u64()
    }
}

impl fmt::Display for Rom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}.", self.0[0])?;
        for b in &self.0[1..] {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Rom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rom({self})")
    }
}

/// Error returned when parsing a [`Rom`] from a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomParseError {
    /// The string is not 17 characters long, or the separator is missing.
    InvalidFormat,
    /// A character is not a hexadecimal digit.
    InvalidDigit,
}

impl fmt::Display for RomParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat => f.write_str("expected a ROM of the form FF.SSSSSSSSSSSSCC"),
            Self::InvalidDigit => f.write_str("invalid hexadecimal digit in ROM"),
        }
    }
}

impl FromStr for Rom {
    type Err = RomParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.as_bytes();
        if s.len() != 17 || s[2] != b'.' {
            return Err(RomParseError::InvalidFormat);
        }
        let mut bytes = [0; 8];
        let digits = s[..2].iter().chain(&s[3..]);
        let mut hi = None;
        let mut idx = 0;
        for &c in digits {
            let nibble = (c as char)
                .to_digit(16)
                .ok_or(RomParseError::InvalidDigit)? as u8;
            match hi.take() {
                None => hi = Some(nibble),
                Some(h) => {
                    bytes[idx] = (h << 4) | nibble;
                    idx += 1;
                }
            }
        }
        Ok(Self(bytes))
    }
}

/// 1-Wire device families known to this crate.
///
/// See the [owfs device list](https://github.com/owfs/owfs-doc/wiki/1Wire-Device-List).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// 1-channel addressable switch
    Ds2405 = 0x05,
    /// Legacy temperature sensor (DS18S20, DS1820)
    Ds18s20 = 0x10,
    /// 2-channel addressable switch
    Ds2406 = 0x12,
    /// Dual pulse counter with 4 kbit RAM
    Ds2423 = 0x1d,
    /// Quad A/D converter
    Ds2450 = 0x20,
    /// Econo temperature sensor
    Ds1822 = 0x22,
    /// Programmable resolution temperature sensor
    Ds18b20 = 0x28,
    /// 8-channel addressable switch
    Ds2408 = 0x29,
    /// 2-channel addressable switch
    Ds2413 = 0x3a,
}

impl Family {
    /// Family code, the first byte of every [`Rom`] of this family.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Part name of the family.
    pub const fn name(self) -> &'static str {
        use Family::*;
        match self {
            Ds2405 => "DS2405",
            Ds18s20 => "DS18S20",
            Ds2406 => "DS2406",
            Ds2423 => "DS2423",
            Ds2450 => "DS2450",
            Ds1822 => "DS1822",
            Ds18b20 => "DS18B20",
            Ds2408 => "DS2408",
            Ds2413 => "DS2413",
        }
    }

    /// Whether devices of this family are temperature sensors.
    pub const fn is_temperature_sensor(self) -> bool {
        matches!(self, Family::Ds18s20 | Family::Ds1822 | Family::Ds18b20)
    }
}

impl TryFrom<u8> for Family {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Family::*;
        Ok(match value {
            0x05 => Ds2405,
            0x10 => Ds18s20,
            0x12 => Ds2406,
            0x1d => Ds2423,
            0x20 => Ds2450,
            0x22 => Ds1822,
            0x28 => Ds18b20,
            0x29 => Ds2408,
            0x3a => Ds2413,
            other => return Err(other),
        })
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse() {
        let rom = Rom::new([0x28, 0xee, 0xa8, 0x9b, 0x19, 0x16, 0x02, 0x62]);
        assert_eq!(rom.to_string(), "28.EEA89B19160262");
        assert_eq!("28.EEA89B19160262".parse::<Rom>(), Ok(rom));
        assert_eq!("29.29e1030000009c".parse::<Rom>().map(|r| r.family()), Ok(Some(Family::Ds2408)));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!("28EEA89B19160262".parse::<Rom>(), Err(RomParseError::InvalidFormat));
        assert_eq!("28-EEA89B19160262".parse::<Rom>(), Err(RomParseError::InvalidFormat));
        assert_eq!("28.EEA89B1916026G".parse::<Rom>(), Err(RomParseError::InvalidDigit));
    }

    #[test]
    fn integrity() {
        assert!("28.EEA89B19160262".parse::<Rom>().unwrap().is_valid());
        assert!("29.29E1030000009C".parse::<Rom>().unwrap().is_valid());
        assert!(!"29.29E1030000009D".parse::<Rom>().unwrap().is_valid());
    }

    #[test]
    fn u64_is_little_endian() {
        let rom = Rom::from_u64(0x6202_1619_9ba8_ee28);
        assert_eq!(rom.family_code(), 0x28);
        assert_eq!(u64::from(rom), 0x6202_1619_9ba8_ee28);
    }

    #[test]
    fn families() {
        assert_eq!(Family::try_from(0x1d), Ok(Family::Ds2423));
        assert_eq!(Family::try_from(0x42), Err(0x42));
        assert!(Family::Ds1822.is_temperature_sensor());
        assert!(!Family::Ds2408.is_temperature_sensor());
        assert_eq!(Family::Ds18b20.to_string(), "DS18B20");
    }
}
