//! 8-bit arithmetic with condition flags.
//!
//! Operands are unsigned bytes. The sum or difference is computed at wider
//! precision and truncated modulo 256. Overflow is judged on the operands'
//! two's-complement reading.

use serde::{Serialize, Deserialize};

const SIGN_BIT: u8 = 0x80;

/// Result of an ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AluResult {
    /// The result truncated to 8 bits.
    pub value: u8,
    /// Result is zero.
    pub zero: bool,
    /// Bit 7 of the result is set.
    pub negative: bool,
    /// Signed 8-bit overflow occurred.
    pub overflow: bool,
}

impl AluResult {
    fn new(value: u8, overflow: bool) -> Self {
        Self {
            value,
            zero: value == 0,
            negative: value & SIGN_BIT != 0,
            overflow,
        }
    }
}

#[inline]
fn sign(v: u8) -> bool {
    v & SIGN_BIT != 0
}

/// `a + b`.
///
/// Overflow when both operands have the same sign and the result's sign
/// differs from theirs.
pub fn add(a: u8, b: u8) -> AluResult {
    let wide = a as i16 + b as i16;
    let result = (wide & 0xFF) as u8;
    let overflow = sign(a) == sign(b) && sign(result) != sign(a);
    AluResult::new(result, overflow)
}

/// `a - b`.
///
/// Overflow when the operands' signs differ and the result's sign does not
/// match `a`'s.
pub fn subtract(a: u8, b: u8) -> AluResult {
    let wide = a as i16 - b as i16;
    let result = (wide & 0xFF) as u8;
    let overflow = sign(a) != sign(b) && sign(result) != sign(a);
    AluResult::new(result, overflow)
}
