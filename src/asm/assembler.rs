//! Simple assembler for 8-bit programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//! START:          ; Define a label
//!     LOAD_B X    ; Load from the address labelled X
//!     LOAD_A 2    ; Load from address 2
//!     ADD         ; A := A + B (operand field is always 1001)
//!     JUMP_ZERO START
//!     HALT
//!     0000 0000   ; Raw instruction byte, as typed into the control panel
//!
//!     ORG 12      ; Set origin address
//! X:  DAT 5       ; Define data value (0-255)
//! ```
//!
//! The output is a memory image: index `i` holds the byte for address `i`.
//! Cells skipped over by `ORG` are zero.

use crate::bits::{self, Nibble};
use crate::cpu::{CpuConfig, MEMORY_SIZE};
use crate::cpu::decode::{self, encode, info_for, Mnemonic, OperandKind};
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to a memory image.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// What a forward reference patches once its label is known.
#[derive(Debug, Clone, Copy)]
enum Fixup {
    /// The low nibble of an instruction.
    Operand,
    /// A whole data byte.
    Data,
}

/// A reference to a label, resolved in pass 2.
struct Pending {
    addr: usize,
    label: String,
    line: usize,
    fixup: Fixup,
}

/// The assembler state.
struct Assembler {
    /// Current address (origin).
    current_addr: usize,
    /// Symbol table (label -> address).
    symbols: HashMap<String, usize>,
    /// Label references to patch.
    pending: Vec<Pending>,
    /// Memory image.
    output: Vec<u8>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            current_addr: 0,
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        // Pass 1: collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: resolve label references
        self.resolve_references()?;

        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();

        if line.is_empty() {
            return Ok(());
        }

        // Label definition
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if !is_identifier(&label) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label '{}'", label),
                });
            }
            if self.symbols.insert(label.clone(), self.current_addr).is_some() {
                return Err(AssemblerError::DuplicateLabel { line: line_num, label });
            }

            let rest = line[colon_idx + 1..].trim();
            if !rest.is_empty() {
                return self.process_statement(rest, line_num);
            }
            return Ok(());
        }

        self.process_statement(line, line_num)
    }

    fn process_statement(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // A raw byte, e.g. "0001 0101"
        if line.starts_with(|c: char| c.is_ascii_digit()) {
            let raw = bits::parse_byte(line).map_err(|e| AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid raw byte '{}': {}", line, e),
            })?;
            return self.emit(raw, line_num);
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let mnemonic = parts[0].to_uppercase();
        let operand = parts.get(1).copied();

        if parts.len() > 2 {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("unexpected '{}'", parts[2..].join(" ")),
            });
        }

        match mnemonic.as_str() {
            "ORG" => {
                let operand = require_operand(operand, "ORG", line_num)?;
                let addr = self.parse_number(operand, line_num)?;
                if addr > MEMORY_SIZE as u32 {
                    return Err(AssemblerError::AddressOutOfRange { line: line_num, addr: addr as usize });
                }
                self.current_addr = addr as usize;
                Ok(())
            }

            "DAT" | "DATA" => {
                let operand = require_operand(operand, "DAT", line_num)?;
                let value = match self.parse_value(operand, line_num)? {
                    Some(v) if v > u8::MAX as u32 => {
                        return Err(AssemblerError::ValueOutOfRange { line: line_num, value: v });
                    }
                    Some(v) => v as u8,
                    None => {
                        self.defer(operand, line_num, Fixup::Data);
                        0
                    }
                };
                self.emit(value, line_num)
            }

            _ => self.process_instruction(&mnemonic, operand, line_num),
        }
    }

    fn process_instruction(&mut self, name: &str, operand: Option<&str>, line_num: usize)
        -> Result<(), AssemblerError>
    {
        let info = Mnemonic::from_name(name)
            .and_then(info_for)
            .ok_or_else(|| AssemblerError::UnknownMnemonic {
                line: line_num,
                mnemonic: name.to_string(),
            })?;

        let field = match (info.operands, operand) {
            (OperandKind::None | OperandKind::Regs, None) => 0,
            (OperandKind::None | OperandKind::Regs, Some(extra)) => {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("{} takes no operand, found '{}'", info.mnemonic, extra),
                });
            }
            (OperandKind::Addr | OperandKind::Data, None) => {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("{} requires an operand", info.mnemonic),
                });
            }
            (OperandKind::Addr | OperandKind::Data, Some(op)) => {
                match self.parse_value(op, line_num)? {
                    Some(v) if v > Nibble::MAX as u32 => {
                        return Err(AssemblerError::ValueOutOfRange { line: line_num, value: v });
                    }
                    Some(v) => v as u8,
                    None => {
                        self.defer(op, line_num, Fixup::Operand);
                        0
                    }
                }
            }
        };

        // Every opcode in the table decodes once the extensions are enabled.
        let instr = decode::decode_fields(
            Nibble::low(info.opcode),
            Nibble::low(field),
            &CpuConfig::extended(),
        );
        self.emit(encode(&instr), line_num)
    }

    /// Parse a number or return `None` for a label reference.
    fn parse_value(&self, operand: &str, line_num: usize) -> Result<Option<u32>, AssemblerError> {
        if operand.starts_with(|c: char| c.is_ascii_digit()) {
            return self.parse_number(operand, line_num).map(Some);
        }
        if !is_identifier(operand) {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("invalid operand '{}'", operand),
            });
        }
        Ok(None)
    }

    fn parse_number(&self, operand: &str, line_num: usize) -> Result<u32, AssemblerError> {
        let lower = operand.to_ascii_lowercase();
        let parsed = if let Some(bin) = lower.strip_prefix("0b") {
            u32::from_str_radix(bin, 2)
        } else if let Some(hex) = lower.strip_prefix("0x") {
            u32::from_str_radix(hex, 16)
        } else {
            lower.parse::<u32>()
        };

        parsed.map_err(|_| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("invalid number '{}'", operand),
        })
    }

    fn defer(&mut self, label: &str, line_num: usize, fixup: Fixup) {
        self.pending.push(Pending {
            addr: self.current_addr,
            label: label.to_uppercase(),
            line: line_num,
            fixup,
        });
    }

    fn emit(&mut self, byte: u8, line_num: usize) -> Result<(), AssemblerError> {
        if self.current_addr >= MEMORY_SIZE {
            return Err(AssemblerError::AddressOutOfRange { line: line_num, addr: self.current_addr });
        }
        if self.output.len() <= self.current_addr {
            self.output.resize(self.current_addr + 1, 0);
        }
        self.output[self.current_addr] = byte;
        self.current_addr += 1;
        Ok(())
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for pending in &self.pending {
            let addr = *self.symbols.get(&pending.label)
                .ok_or_else(|| AssemblerError::UndefinedLabel {
                    line: pending.line,
                    label: pending.label.clone(),
                })?;

            let cell = &mut self.output[pending.addr];
            match pending.fixup {
                Fixup::Operand => {
                    if addr >= MEMORY_SIZE {
                        return Err(AssemblerError::AddressOutOfRange { line: pending.line, addr });
                    }
                    *cell = Nibble::join(Nibble::high(*cell), Nibble::low(addr as u8));
                }
                Fixup::Data => *cell = addr as u8,
            }
        }
        Ok(())
    }
}

fn require_operand<'a>(operand: Option<&'a str>, directive: &str, line_num: usize)
    -> Result<&'a str, AssemblerError>
{
    operand.ok_or_else(|| AssemblerError::SyntaxError {
        line: line_num,
        message: format!("{} requires a value", directive),
    })
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("label defined twice on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: u32 },

    #[error("address out of range on line {line}: {addr} (memory is 0-15)")]
    AddressOutOfRange { line: usize, addr: usize },
}
