//! CRC-8 checksum used by the PowerMaster serial protocol
//!
//! The meter folds a 256-entry table over the payload bytes (STX and ETX
//! excluded), starting from zero, and sends the bit complement of the
//! result as two uppercase hex digits. The table must match the device
//! exactly, so it is spelled out rather than generated.

use crate::error::FrameError;

/// Lookup table, MSB-first, polynomial 0xB1.
const TABLE: [u8; 256] = [
    0x00, 0xB1, 0xD3, 0x62, 0x17, 0xA6, 0xC4, 0x75, 0x2E, 0x9F, 0xFD, 0x4C, 0x39, 0x88, 0xEA, 0x5B,
    0x5C, 0xED, 0x8F, 0x3E, 0x4B, 0xFA, 0x98, 0x29, 0x72, 0xC3, 0xA1, 0x10, 0x65, 0xD4, 0xB6, 0x07,
    0xB8, 0x09, 0x6B, 0xDA, 0xAF, 0x1E, 0x7C, 0xCD, 0x96, 0x27, 0x45, 0xF4, 0x81, 0x30, 0x52, 0xE3,
    0xE4, 0x55, 0x37, 0x86, 0xF3, 0x42, 0x20, 0x91, 0xCA, 0x7B, 0x19, 0xA8, 0xDD, 0x6C, 0x0E, 0xBF,
    0xC1, 0x70, 0x12, 0xA3, 0xD6, 0x67, 0x05, 0xB4, 0xEF, 0x5E, 0x3C, 0x8D, 0xF8, 0x49, 0x2B, 0x9A,
    0x9D, 0x2C, 0x4E, 0xFF, 0x8A, 0x3B, 0x59, 0xE8, 0xB3, 0x02, 0x60, 0xD1, 0xA4, 0x15, 0x77, 0xC6,
    0x79, 0xC8, 0xAA, 0x1B, 0x6E, 0xDF, 0xBD, 0x0C, 0x57, 0xE6, 0x84, 0x35, 0x40, 0xF1, 0x93, 0x22,
    0x25, 0x94, 0xF6, 0x47, 0x32, 0x83, 0xE1, 0x50, 0x0B, 0xBA, 0xD8, 0x69, 0x1C, 0xAD, 0xCF, 0x7E,
    0x33, 0x82, 0xE0, 0x51, 0x24, 0x95, 0xF7, 0x46, 0x1D, 0xAC, 0xCE, 0x7F, 0x0A, 0xBB, 0xD9, 0x68,
    0x6F, 0xDE, 0xBC, 0x0D, 0x78, 0xC9, 0xAB, 0x1A, 0x41, 0xF0, 0x92, 0x23, 0x56, 0xE7, 0x85, 0x34,
    0x8B, 0x3A, 0x58, 0xE9, 0x9C, 0x2D, 0x4F, 0xFE, 0xA5, 0x14, 0x76, 0xC7, 0xB2, 0x03, 0x61, 0xD0,
    0xD7, 0x66, 0x04, 0xB5, 0xC0, 0x71, 0x13, 0xA2, 0xF9, 0x48, 0x2A, 0x9B, 0xEE, 0x5F, 0x3D, 0x8C,
    0xF2, 0x43, 0x21, 0x90, 0xE5, 0x54, 0x36, 0x87, 0xDC, 0x6D, 0x0F, 0xBE, 0xCB, 0x7A, 0x18, 0xA9,
    0xAE, 0x1F, 0x7D, 0xCC, 0xB9, 0x08, 0x6A, 0xDB, 0x80, 0x31, 0x53, 0xE2, 0x97, 0x26, 0x44, 0xF5,
    0x4A, 0xFB, 0x99, 0x28, 0x5D, 0xEC, 0x8E, 0x3F, 0x64, 0xD5, 0xB7, 0x06, 0x73, 0xC2, 0xA0, 0x11,
    0x16, 0xA7, 0xC5, 0x74, 0x01, 0xB0, 0xD2, 0x63, 0x38, 0x89, 0xEB, 0x5A, 0x2F, 0x9E, 0xFC, 0x4D,
];

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Checksum of `bytes` as the meter computes it.
pub fn compute(bytes: &[u8]) -> u8 {
    let acc = bytes.iter().fold(0u8, |acc, &b| TABLE[(acc ^ b) as usize]);
    !acc
}

/// Check `payload` against the two checksum characters that follow ETX.
///
/// Upper- and lower-case hex digits are accepted. A character that is not
/// a hex digit is reported as [`FrameError::MalformedChecksum`]; a valid
/// but different checksum returns `Ok(false)`.
pub fn verify(payload: &[u8], hex_high: u8, hex_low: u8) -> Result<bool, FrameError> {
    Ok(decode_hex(hex_high, hex_low)? == compute(payload))
}

/// Combine two ASCII hex digits into one byte.
pub fn decode_hex(hex_high: u8, hex_low: u8) -> Result<u8, FrameError> {
    Ok((nibble(hex_high)? << 4) | nibble(hex_low)?)
}

/// Render a checksum as two uppercase ASCII hex digits.
pub fn to_hex(value: u8) -> [u8; 2] {
    [HEX_DIGITS[(value >> 4) as usize], HEX_DIGITS[(value & 0x0F) as usize]]
}

fn nibble(digit: u8) -> Result<u8, FrameError> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        _ => Err(FrameError::MalformedChecksum { digit }),
    }
}
