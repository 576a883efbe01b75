//! A 4-bit unsigned value.

use std::fmt;
use serde::{Serialize, Deserialize};

/// A 4-bit unsigned value (0-15).
///
/// Used for the opcode and operand halves of an instruction byte and for the
/// instruction address register, which addresses the 16-cell memory.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Nibble(u8);

impl Nibble {
    /// Largest representable value.
    pub const MAX: u8 = 0x0F;

    /// The zero nibble.
    #[inline]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Create a nibble, or `None` if `value` does not fit in 4 bits.
    #[inline]
    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Take the low 4 bits of a byte.
    #[inline]
    pub const fn low(byte: u8) -> Self {
        Self(byte & Self::MAX)
    }

    /// Take the high 4 bits of a byte.
    #[inline]
    pub const fn high(byte: u8) -> Self {
        Self(byte >> 4)
    }

    /// Combine an opcode (high) and operand (low) nibble into a byte.
    #[inline]
    pub const fn join(high: Nibble, low: Nibble) -> u8 {
        (high.0 << 4) | low.0
    }

    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Add one, wrapping from 15 back to 0.
    #[inline]
    pub const fn wrapping_inc(self) -> Self {
        Self((self.0 + 1) & Self::MAX)
    }
}

impl fmt::Debug for Nibble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04b}", self.0)
    }
}

impl fmt::Display for Nibble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04b}", self.0)
    }
}

impl From<Nibble> for u8 {
    fn from(n: Nibble) -> u8 {
        n.0
    }
}
