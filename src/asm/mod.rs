//! Assembler and disassembler for 8-bit programs.
//!
//! This module provides:
//! - A simple two-pass assembler (text → memory image)
//! - A disassembler (memory image → readable text)

pub mod assembler;
pub mod disasm;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, disassemble_instruction};
