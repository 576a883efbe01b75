//! Binary primitives for the 8-bit machine.
//!
//! This module provides the small building blocks the CPU is made of:
//! - [`Nibble`] - A 4-bit value (opcode and operand fields, the IAR)
//! - [`format_byte`] / [`parse_byte`] - The 8-character `0`/`1` form used at
//!   the presentation boundary
//! - [`alu`] - 8-bit addition and subtraction with condition flags

mod nibble;
mod binary;
pub mod alu;

pub use nibble::Nibble;
pub use binary::{format_byte, format_nibble, parse_byte, parse_nibble, BitsError};
pub use alu::{AluResult, add, subtract};
