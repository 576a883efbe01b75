//! Disassembler for 8-bit programs.
//!
//! Converts memory bytes back to readable assembly.

use crate::bits;
use crate::cpu::CpuConfig;
use crate::cpu::decode::{decode, Instruction};

/// Disassemble a single byte to text.
pub fn disassemble_instruction(raw: u8, config: &CpuConfig) -> String {
    format_instruction(&decode(raw, config), raw)
}

/// Disassemble a memory image, one line per address.
pub fn disassemble(image: &[u8], config: &CpuConfig) -> String {
    let mut output = String::new();
    output.push_str("; cpu8 disassembly\n");
    output.push_str("; -----------------\n\n");

    for (addr, &raw) in image.iter().enumerate() {
        let line = disassemble_instruction(raw, config);
        output.push_str(&format!("{:02}: {:<14} ; {}\n", addr, line, bits::format_byte(raw)));
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction, raw: u8) -> String {
    match instr {
        Instruction::Addi { data } => format!("ADDI #{}", data.value()),
        Instruction::Unknown { .. } => format!("??? {}", bits::format_byte(raw)),
        other => match other.operand() {
            Some(operand) => format!("{} {}", other.mnemonic(), operand),
            None => other.mnemonic().to_string(),
        },
    }
}
