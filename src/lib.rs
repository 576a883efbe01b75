//! # cpu8
//!
//! An emulator of a minimal 8-bit educational CPU.
//!
//! The machine has sixteen bytes of memory, two general registers, a 4-bit
//! program counter and three condition flags. Its instruction cycle is
//! exposed one phase at a time (fetch, decode, execute, increment) so that
//! a front end can show exactly what each phase changes.

pub mod bits;
pub mod cpu;
pub mod asm;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use bits::Nibble;
pub use cpu::{Cpu, CpuConfig, CpuError, CpuSnapshot, CpuState, Instruction, Memory, MemoryError, Phase, Registers};
pub use asm::{assemble, disassemble, AssemblerError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
