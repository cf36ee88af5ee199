//! Dallas/Maxim CRC-8 and CRC-16, as described in Maxim Application Note 27.

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Calculate CRC-8 used in 1-Wire communications.
///
/// Polynomial `x^8 + x^5 + x^4 + 1`, LSB first, initial value `0`.
/// Covers the 64-bit ROM code and device scratchpads.
pub struct OneWireCrc(u8);

#[cfg(feature = "crc-table")]
const CRC8_TABLE: [u8; 256] = [
    0x00, 0x5e, 0xbc, 0xe2, 0x61, 0x3f, 0xdd, 0x83, 0xc2, 0x9c, 0x7e, 0x20, 0xa3, 0xfd, 0x1f, 0x41,
    0x9d, 0xc3, 0x21, 0x7f, 0xfc, 0xa2, 0x40, 0x1e, 0x5f, 0x01, 0xe3, 0xbd, 0x3e, 0x60, 0x82, 0xdc,
    0x23, 0x7d, 0x9f, 0xc1, 0x42, 0x1c, 0xfe, 0xa0, 0xe1, 0xbf, 0x5d, 0x03, 0x80, 0xde, 0x3c, 0x62,
    0xbe, 0xe0, 0x02, 0x5c, 0xdf, 0x81, 0x63, 0x3d, 0x7c, 0x22, 0xc0, 0x9e, 0x1d, 0x43, 0xa1, 0xff,
    0x46, 0x18, 0xfa, 0xa4, 0x27, 0x79, 0x9b, 0xc5, 0x84, 0xda, 0x38, 0x66, 0xe5, 0xbb, 0x59, 0x07,
    0xdb, 0x85, 0x67, 0x39, 0xba, 0xe4, 0x06, 0x58, 0x19, 0x47, 0xa5, 0xfb, 0x78, 0x26, 0xc4, 0x9a,
    0x65, 0x3b, 0xd9, 0x87, 0x04, 0x5a, 0xb8, 0xe6, 0xa7, 0xf9, 0x1b, 0x45, 0xc6, 0x98, 0x7a, 0x24,
    0xf8, 0xa6, 0x44, 0x1a, 0x99, 0xc7, 0x25, 0x7b, 0x3a, 0x64, 0x86, 0xd8, 0x5b, 0x05, 0xe7, 0xb9,
    0x8c, 0xd2, 0x30, 0x6e, 0xed, 0xb3, 0x51, 0x0f, 0x4e, 0x10, 0xf2, 0xac, 0x2f, 0x71, 0x93, 0xcd,
    0x11, 0x4f, 0xad, 0xf3, 0x70, 0x2e, 0xcc, 0x92, 0xd3, 0x8d, 0x6f, 0x31, 0xb2, 0xec, 0x0e, 0x50,
    0xaf, 0xf1, 0x13, 0x4d, 0xce, 0x90, 0x72, 0x2c, 0x6d, 0x33, 0xd1, 0x8f, 0x0c, 0x52, 0xb0, 0xee,
    0x32, 0x6c, 0x8e, 0xd0, 0x53, 0x0d, 0xef, 0xb1, 0xf0, 0xae, 0x4c, 0x12, 0x91, 0xcf, 0x2d, 0x73,
    0xca, 0x94, 0x76, 0x28, 0xab, 0xf5, 0x17, 0x49, 0x08, 0x56, 0xb4, 0xea, 0x69, 0x37, 0xd5, 0x8b,
    0x57, 0x09, 0xeb, 0xb5, 0x36, 0x68, 0x8a, 0xd4, 0x95, 0xcb, 0x29, 0x77, 0xf4, 0xaa, 0x48, 0x16,
    0xe9, 0xb7, 0x55, 0x0b, 0x88, 0xd6, 0x34, 0x6a, 0x2b, 0x75, 0x97, 0xc9, 0x4a, 0x14, 0xf6, 0xa8,
    0x74, 0x2a, 0xc8, 0x96, 0x15, 0x4b, 0xa9, 0xf7, 0xb6, 0xe8, 0x0a, 0x54, 0xd7, 0x89, 0x6b, 0x35,
];

impl OneWireCrc {
    /// Create a CRC accumulator with the initial value `0`.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Get the current CRC value
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Update the CRC with the incoming byte.
    #[cfg(feature = "crc-table")]
    pub fn update(&mut self, byte: u8) {
        self.0 = CRC8_TABLE[(self.0 ^ byte) as usize];
    }

    /// Update the CRC with the incoming byte.
    #[cfg(not(feature = "crc-table"))]
    pub fn update(&mut self, byte: u8) {
        let mut crc = self.0 ^ byte; // XOR the byte with the current CRC value
        for _ in 0..8 {
            if crc & 0x1 == 0x1 {
                crc = (crc >> 1) ^ 0x8c; // Polynomial for CRC-8
            } else {
                crc >>= 1;
            }
        }
        self.0 = crc;
    }

    /// Compute the CRC-8 of a sequence of bytes.
    pub fn compute(sequence: &[u8]) -> u8 {
        let mut crc = OneWireCrc::new();
        for &byte in sequence {
            crc.update(byte);
        }
        crc.value()
    }

    /// Validate a sequence of bytes where the last byte is the 1-Wire CRC of
    /// the previous bytes.
    pub fn validate(sequence: &[u8]) -> bool {
        // Running the CRC over data followed by its own CRC yields zero.
        !sequence.is_empty() && Self::compute(sequence) == 0x0
    }
}

const ODD_PARITY: [u8; 16] = [0, 1, 1, 0, 1, 0, 0, 1, 1, 0, 0, 1, 0, 1, 1, 0];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Calculate CRC-16 used by 1-Wire memory and counter devices.
///
/// Polynomial `x^16 + x^15 + x^2 + 1`, LSB first. Devices transmit the
/// result bitwise inverted, least significant byte first.
pub struct OneWireCrc16(u16);

impl OneWireCrc16 {
    /// Create a CRC accumulator starting from `seed`.
    ///
    /// A non-zero seed continues a computation over data that was read in
    /// several chunks.
    pub const fn with_seed(seed: u16) -> Self {
        Self(seed)
    }

    /// Get the current CRC value
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Update the CRC with the incoming byte.
    pub fn update(&mut self, byte: u8) {
        let mut cdata = (byte as u16 ^ self.0) & 0xff;
        self.0 >>= 8;
        if ODD_PARITY[(cdata & 0x0f) as usize] ^ ODD_PARITY[(cdata >> 4) as usize] != 0 {
            self.0 ^= 0xc001;
        }
        cdata <<= 6;
        self.0 ^= cdata;
        cdata <<= 1;
        self.0 ^= cdata;
    }

    /// Compute the CRC-16 of a sequence of bytes, starting from `seed`.
    pub fn compute(sequence: &[u8], seed: u16) -> u16 {
        let mut crc = OneWireCrc16::with_seed(seed);
        for &byte in sequence {
            crc.update(byte);
        }
        crc.value()
    }

    /// Compare the CRC-16 of `sequence` against the two inverted CRC bytes
    /// as received from the bus, in wire order (low byte first).
    pub fn check_inverted(sequence: &[u8], inverted_crc: [u8; 2], seed: u16) -> bool {
        let crc = !Self::compute(sequence, seed);
        crc.to_le_bytes() == inverted_crc
    }
}

/// Dallas CRC-8 of `bytes`.
pub fn crc8(bytes: &[u8]) -> u8 {
    OneWireCrc::compute(bytes)
}

/// Dallas CRC-16 of `bytes`, continuing from `seed`.
pub fn crc16(bytes: &[u8], seed: u16) -> u16 {
    OneWireCrc16::compute(bytes, seed)
}

/// Check `bytes` against the inverted CRC-16 pair received from the bus.
pub fn check_crc16(bytes: &[u8], inverted_crc: [u8; 2], seed: u16) -> bool {
    OneWireCrc16::check_inverted(bytes, inverted_crc, seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc8_reference_vectors() {
        assert_eq!(crc8(b"123456789"), 0xa1);
        assert_eq!(crc8(&[]), 0x00);
        // ROM code 28.EEA89B19160262
        assert_eq!(crc8(&[0x28, 0xee, 0xa8, 0x9b, 0x19, 0x16, 0x02]), 0x62);
        assert!(OneWireCrc::validate(&[0x28, 0xee, 0xa8, 0x9b, 0x19, 0x16, 0x02, 0x62]));
        assert!(!OneWireCrc::validate(&[0x28, 0xee, 0xa8, 0x9b, 0x19, 0x16, 0x02, 0x63]));
    }

    #[test]
    fn crc8_is_deterministic() {
        let data = [0x91, 0x01, 0x4b, 0x46, 0x7f, 0xff, 0x0f, 0x10];
        assert_eq!(crc8(&data), crc8(&data));
        assert_eq!(crc8(&data), 0x25);
    }

    #[test]
    fn crc8_table_matches_polynomial() {
        for byte in 0..=255u8 {
            let mut crc = byte;
            for _ in 0..8 {
                crc = if crc & 1 == 1 { (crc >> 1) ^ 0x8c } else { crc >> 1 };
            }
            assert_eq!(crc8(&[byte]), crc, "byte {byte:#04x}");
        }
    }

    #[test]
    fn crc16_reference_vectors() {
        assert_eq!(crc16(b"123456789", 0), 0xbb3d);
        // seed chains computations across reads
        assert_eq!(crc16(b"6789", crc16(b"12345", 0)), 0xbb3d);
    }

    #[test]
    fn check_crc16_accepts_inverted_crc() {
        let data = [0xf0, 0x88, 0x00, 0x5a, 0xff, 0x00, 0x00, 0x84, 0xff, 0xff, 0xff];
        assert!(check_crc16(&data, [0xe9, 0xc2], 0));
        let inverted = (!crc16(&data, 0x1234)).to_le_bytes();
        assert!(check_crc16(&data, inverted, 0x1234));
    }

    #[test]
    fn check_crc16_rejects_single_bit_flips() {
        let data = *b"1-Wire counter page";
        let inverted = (!crc16(&data, 0)).to_le_bytes();
        for idx in 0..data.len() {
            for bit in 0..8 {
                let mut corrupted = data;
                corrupted[idx] ^= 1 << bit;
                assert!(!check_crc16(&corrupted, inverted, 0));
            }
        }
        for bit in 0..16 {
            let mut crc = inverted;
            crc[bit / 8] ^= 1 << (bit % 8);
            assert!(!check_crc16(&data, crc, 0));
        }
    }
}
