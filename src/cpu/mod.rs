//! CPU emulation for the 8-bit educational machine.
//!
//! This module implements the whole machine:
//! - 16 eight-bit memory cells
//! - Registers A and B, the 4-bit IAR, and the split IR
//! - Z, N and O condition flags
//! - An 11-instruction set (plus the optional ADDI), one byte per instruction

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
mod config;

pub use config::CpuConfig;
pub use memory::{Memory, MemoryError, MEMORY_SIZE};
pub use registers::{Flags, InstructionRegister, Registers};
pub use decode::{DecodedInstruction, Instruction, Mnemonic, OperandKind, OPCODE_TABLE};
pub use execute::{Cpu, CpuError, CpuSnapshot, CpuState, Phase};
