//! Binary-string formatting at the presentation boundary.
//!
//! Internally every cell is a `u8`. Front ends show and accept the
//! 8-character `0`/`1` form, so conversion lives here and nowhere else.

use thiserror::Error;
use crate::bits::Nibble;

/// Render a byte as 8 binary digits, MSB first.
pub fn format_byte(value: u8) -> String {
    format!("{:08b}", value)
}

/// Render a nibble as 4 binary digits, MSB first.
pub fn format_nibble(value: Nibble) -> String {
    format!("{:04b}", value.value())
}

/// Parse exactly 8 binary digits into a byte.
///
/// Underscores and inner spaces are accepted as group separators, so
/// `"0001 0101"` and `"0001_0101"` both parse.
pub fn parse_byte(s: &str) -> Result<u8, BitsError> {
    parse_bits(s, 8).map(|v| v as u8)
}

/// Parse exactly 4 binary digits into a nibble.
pub fn parse_nibble(s: &str) -> Result<Nibble, BitsError> {
    parse_bits(s, 4).map(|v| Nibble::low(v as u8))
}

fn parse_bits(s: &str, width: usize) -> Result<u16, BitsError> {
    let s = s.trim();
    let s = s.strip_prefix("0b").unwrap_or(s);

    let mut value: u16 = 0;
    let mut digits = 0;
    for c in s.chars() {
        let bit = match c {
            '0' => 0,
            '1' => 1,
            '_' | ' ' => continue,
            _ => return Err(BitsError::InvalidChar(c)),
        };
        value = (value << 1) | bit;
        digits += 1;
        if digits > width {
            break;
        }
    }

    if digits != width {
        return Err(BitsError::WrongLength { expected: width, got: digits });
    }

    Ok(value)
}

/// Errors that can occur when parsing binary strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitsError {
    #[error("expected {expected} binary digits, got {got}")]
    WrongLength { expected: usize, got: usize },

    #[error("invalid binary digit: '{0}' (expected 0 or 1)")]
    InvalidChar(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(format_byte(3), "00000011");
        assert_eq!(format_byte(0xFF), "11111111");
        assert_eq!(format_nibble(Nibble::low(9)), "1001");
    }

    #[test]
    fn test_parse_with_separators() {
        assert_eq!(parse_byte("0001 0101"), Ok(0b0001_0101));
        assert_eq!(parse_byte("0b1111_0000"), Ok(0xF0));
        assert_eq!(parse_nibble("1001").map(Nibble::value), Ok(9));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_byte("0101"), Err(BitsError::WrongLength { expected: 8, got: 4 }));
        assert!(matches!(parse_byte("000000001"), Err(BitsError::WrongLength { .. })));
        assert_eq!(parse_byte("0000002x"), Err(BitsError::InvalidChar('2')));
        assert!(parse_byte("").is_err());
    }
}
