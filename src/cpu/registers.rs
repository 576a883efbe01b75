//! CPU registers and condition flags.
//!
//! The machine has:
//! - A, B: 8-bit general registers (A is also the ALU destination)
//! - IAR: 4-bit instruction address register (program counter)
//! - IR: instruction register, split into opcode and operand nibbles
//! - Z, N, O: zero, negative and overflow flags

use crate::bits::{AluResult, Nibble};
use serde::{Serialize, Deserialize};

/// The instruction register, holding the most recently fetched byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRegister {
    /// High nibble: operation code.
    pub opcode: Nibble,
    /// Low nibble: address, immediate data, or register selector.
    pub operand: Nibble,
}

impl InstructionRegister {
    /// Latch a fetched byte.
    pub fn load(&mut self, raw: u8) {
        self.opcode = Nibble::high(raw);
        self.operand = Nibble::low(raw);
    }

    /// The latched byte.
    pub fn raw(&self) -> u8 {
        Nibble::join(self.opcode, self.operand)
    }
}

/// Condition flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    /// Zero: last result was 0.
    pub z: bool,
    /// Negative: bit 7 of the last result was set.
    pub n: bool,
    /// Overflow: last ALU operation overflowed as signed 8-bit.
    /// Cleared at the start of every execute phase.
    pub o: bool,
}

impl Flags {
    /// Set Z and N from a value, leaving O alone.
    pub fn set_zn(&mut self, value: u8) {
        self.z = value == 0;
        self.n = value & 0x80 != 0;
    }

    /// Take all three flags from an ALU result.
    pub fn set_from_alu(&mut self, result: &AluResult) {
        self.z = result.zero;
        self.n = result.negative;
        self.o = result.overflow;
    }
}

/// The register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// A: 8-bit general register, receives ALU results
    pub a: u8,

    /// B: 8-bit general register, second ALU operand
    pub b: u8,

    /// IAR: 4-bit program counter
    pub iar: Nibble,

    /// IR: current instruction
    pub ir: InstructionRegister,

    /// Condition flags
    pub flags: Flags,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers and flags to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Increment the IAR by 1, wrapping modulo 16.
    /// Returns the old value.
    pub fn advance_iar(&mut self) -> Nibble {
        let old = self.iar;
        self.iar = self.iar.wrapping_inc();
        old
    }

    /// Set the IAR to an absolute address.
    pub fn jump(&mut self, addr: Nibble) {
        self.iar = addr;
    }
}
