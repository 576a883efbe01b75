//! Instruction decoder.
//!
//! Every instruction is one byte: a 4-bit opcode in the high nibble and a
//! 4-bit operand in the low nibble. How the operand is read depends on the
//! opcode's [`OperandKind`].

use crate::bits::Nibble;
use crate::cpu::CpuConfig;
use serde::{Serialize, Deserialize};
use std::fmt;

/// How the low nibble of an instruction is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandKind {
    /// Ignored.
    None,
    /// A memory address (0-15).
    Addr,
    /// The fixed register pair "B, A" ([`REGS_BA`]); carries no value.
    Regs,
    /// An immediate value (0-15).
    Data,
}

/// Operand pattern for ADD/SUB: register B, register A.
pub const REGS_BA: u8 = 0b1001;

/// Instruction names, including the synthetic `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mnemonic {
    Nop,
    LoadA,
    LoadB,
    StoreA,
    StoreB,
    Add,
    Sub,
    Jump,
    JumpNeg,
    JumpZero,
    Addi,
    Halt,
    Unknown,
}

impl Mnemonic {
    /// Assembly spelling.
    pub fn name(self) -> &'static str {
        match self {
            Mnemonic::Nop => "NOP",
            Mnemonic::LoadA => "LOAD_A",
            Mnemonic::LoadB => "LOAD_B",
            Mnemonic::StoreA => "STORE_A",
            Mnemonic::StoreB => "STORE_B",
            Mnemonic::Add => "ADD",
            Mnemonic::Sub => "SUB",
            Mnemonic::Jump => "JUMP",
            Mnemonic::JumpNeg => "JUMP_NEG",
            Mnemonic::JumpZero => "JUMP_ZERO",
            Mnemonic::Addi => "ADDI",
            Mnemonic::Halt => "HALT",
            Mnemonic::Unknown => "UNKNOWN",
        }
    }

    /// Look a mnemonic up by name (case-insensitive). `UNKNOWN` is not
    /// accepted since it has no encoding.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        OPCODE_TABLE
            .iter()
            .map(|info| info.mnemonic)
            .find(|m| m.name() == upper)
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpcodeInfo {
    pub opcode: u8,
    pub mnemonic: Mnemonic,
    pub operands: OperandKind,
    pub description: &'static str,
}

/// The instruction set. `ADDI` is an optional extension, see
/// [`CpuConfig::addi`].
pub const OPCODE_TABLE: [OpcodeInfo; 12] = [
    OpcodeInfo { opcode: 0b0000, mnemonic: Mnemonic::Nop, operands: OperandKind::None, description: "No operation" },
    OpcodeInfo { opcode: 0b0001, mnemonic: Mnemonic::LoadA, operands: OperandKind::Addr, description: "Load value from RAM[Addr] into Reg A" },
    OpcodeInfo { opcode: 0b0010, mnemonic: Mnemonic::LoadB, operands: OperandKind::Addr, description: "Load value from RAM[Addr] into Reg B" },
    OpcodeInfo { opcode: 0b0011, mnemonic: Mnemonic::StoreA, operands: OperandKind::Addr, description: "Store value from Reg A to RAM[Addr]" },
    OpcodeInfo { opcode: 0b0100, mnemonic: Mnemonic::StoreB, operands: OperandKind::Addr, description: "Store value from Reg B to RAM[Addr]" },
    OpcodeInfo { opcode: 0b0101, mnemonic: Mnemonic::Add, operands: OperandKind::Regs, description: "Reg A = Reg A + Reg B" },
    OpcodeInfo { opcode: 0b0110, mnemonic: Mnemonic::Sub, operands: OperandKind::Regs, description: "Reg A = Reg A - Reg B" },
    OpcodeInfo { opcode: 0b0111, mnemonic: Mnemonic::Jump, operands: OperandKind::Addr, description: "Jump to instruction at RAM[Addr]" },
    OpcodeInfo { opcode: 0b1000, mnemonic: Mnemonic::JumpNeg, operands: OperandKind::Addr, description: "Jump to RAM[Addr] if N flag is set" },
    OpcodeInfo { opcode: 0b1001, mnemonic: Mnemonic::JumpZero, operands: OperandKind::Addr, description: "Jump to RAM[Addr] if Z flag is set" },
    OpcodeInfo { opcode: 0b1010, mnemonic: Mnemonic::Addi, operands: OperandKind::Data, description: "Reg A = Reg A + Data" },
    OpcodeInfo { opcode: 0b1111, mnemonic: Mnemonic::Halt, operands: OperandKind::None, description: "Stop program execution" },
];

/// Find the table row for an opcode, honouring the enabled extensions.
pub fn lookup(opcode: Nibble, config: &CpuConfig) -> Option<&'static OpcodeInfo> {
    OPCODE_TABLE
        .iter()
        .filter(|info| config.addi || info.mnemonic != Mnemonic::Addi)
        .find(|info| info.opcode == opcode.value())
}

/// Find the table row for a mnemonic.
pub fn info_for(mnemonic: Mnemonic) -> Option<&'static OpcodeInfo> {
    OPCODE_TABLE.iter().find(|info| info.mnemonic == mnemonic)
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// No operation
    Nop,

    /// A := [addr]
    LoadA { addr: Nibble },

    /// B := [addr]
    LoadB { addr: Nibble },

    /// [addr] := A
    StoreA { addr: Nibble },

    /// [addr] := B
    StoreB { addr: Nibble },

    /// A := A + B
    Add,

    /// A := A - B
    Sub,

    /// IAR := addr
    Jump { addr: Nibble },

    /// if N then IAR := addr
    JumpNeg { addr: Nibble },

    /// if Z then IAR := addr
    JumpZero { addr: Nibble },

    /// A := A + data (extension)
    Addi { data: Nibble },

    /// Stop the machine
    Halt,

    /// Opcode with no table entry. Executing it stops the machine.
    Unknown { opcode: Nibble },
}

impl Instruction {
    pub fn mnemonic(&self) -> Mnemonic {
        match self {
            Instruction::Nop => Mnemonic::Nop,
            Instruction::LoadA { .. } => Mnemonic::LoadA,
            Instruction::LoadB { .. } => Mnemonic::LoadB,
            Instruction::StoreA { .. } => Mnemonic::StoreA,
            Instruction::StoreB { .. } => Mnemonic::StoreB,
            Instruction::Add => Mnemonic::Add,
            Instruction::Sub => Mnemonic::Sub,
            Instruction::Jump { .. } => Mnemonic::Jump,
            Instruction::JumpNeg { .. } => Mnemonic::JumpNeg,
            Instruction::JumpZero { .. } => Mnemonic::JumpZero,
            Instruction::Addi { .. } => Mnemonic::Addi,
            Instruction::Halt => Mnemonic::Halt,
            Instruction::Unknown { .. } => Mnemonic::Unknown,
        }
    }

    pub fn operand_kind(&self) -> OperandKind {
        info_for(self.mnemonic()).map_or(OperandKind::None, |info| info.operands)
    }

    /// The resolved operand value, if this instruction has one.
    pub fn operand(&self) -> Option<u8> {
        match *self {
            Instruction::LoadA { addr }
            | Instruction::LoadB { addr }
            | Instruction::StoreA { addr }
            | Instruction::StoreB { addr }
            | Instruction::Jump { addr }
            | Instruction::JumpNeg { addr }
            | Instruction::JumpZero { addr } => Some(addr.value()),
            Instruction::Addi { data } => Some(data.value()),
            _ => None,
        }
    }
}

/// The output of the decode phase: the instruction plus the raw opcode it
/// came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedInstruction {
    pub instruction: Instruction,
    pub opcode: Nibble,
}

impl DecodedInstruction {
    pub fn mnemonic(&self) -> Mnemonic {
        self.instruction.mnemonic()
    }

    pub fn operand_kind(&self) -> OperandKind {
        self.instruction.operand_kind()
    }

    pub fn operand(&self) -> Option<u8> {
        self.instruction.operand()
    }
}

/// Decode an opcode/operand pair.
///
/// Never fails: an opcode missing from the table becomes
/// [`Instruction::Unknown`] and is dealt with at execute time.
pub fn decode_fields(opcode: Nibble, operand: Nibble, config: &CpuConfig) -> Instruction {
    let Some(info) = lookup(opcode, config) else {
        return Instruction::Unknown { opcode };
    };

    match info.mnemonic {
        Mnemonic::Nop => Instruction::Nop,
        Mnemonic::LoadA => Instruction::LoadA { addr: operand },
        Mnemonic::LoadB => Instruction::LoadB { addr: operand },
        Mnemonic::StoreA => Instruction::StoreA { addr: operand },
        Mnemonic::StoreB => Instruction::StoreB { addr: operand },
        Mnemonic::Add => Instruction::Add,
        Mnemonic::Sub => Instruction::Sub,
        Mnemonic::Jump => Instruction::Jump { addr: operand },
        Mnemonic::JumpNeg => Instruction::JumpNeg { addr: operand },
        Mnemonic::JumpZero => Instruction::JumpZero { addr: operand },
        Mnemonic::Addi => Instruction::Addi { data: operand },
        Mnemonic::Halt => Instruction::Halt,
        Mnemonic::Unknown => Instruction::Unknown { opcode },
    }
}

/// Decode a raw instruction byte.
pub fn decode(raw: u8, config: &CpuConfig) -> Instruction {
    decode_fields(Nibble::high(raw), Nibble::low(raw), config)
}

/// Encode an instruction back to a byte.
///
/// ADD and SUB are written with the fixed [`REGS_BA`] operand; NOP and HALT
/// with a zero operand.
pub fn encode(instr: &Instruction) -> u8 {
    let opcode = match instr {
        Instruction::Unknown { opcode } => return Nibble::join(*opcode, Nibble::zero()),
        other => info_for(other.mnemonic()).map_or(0, |info| info.opcode),
    };

    let operand = match instr {
        Instruction::Add | Instruction::Sub => REGS_BA,
        other => other.operand().unwrap_or(0),
    };

    Nibble::join(Nibble::low(opcode), Nibble::low(operand))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical() -> CpuConfig {
        CpuConfig::default()
    }

    #[test]
    fn test_decode_load_a() {
        let instr = decode(0b0001_0101, &canonical());
        assert_eq!(instr, Instruction::LoadA { addr: Nibble::low(5) });
        assert_eq!(instr.operand_kind(), OperandKind::Addr);
        assert_eq!(instr.operand(), Some(5));
    }

    #[test]
    fn test_decode_regs_has_no_value() {
        let instr = decode(0b0101_1001, &canonical());
        assert_eq!(instr, Instruction::Add);
        assert_eq!(instr.operand_kind(), OperandKind::Regs);
        assert_eq!(instr.operand(), None);

        // The operand field is not consulted for register-pair instructions.
        assert_eq!(decode(0b0110_0000, &canonical()), Instruction::Sub);
    }

    #[test]
    fn test_decode_unknown() {
        for op in [0b1011, 0b1100, 0b1101, 0b1110] {
            let instr = decode(op << 4, &canonical());
            assert_eq!(instr, Instruction::Unknown { opcode: Nibble::low(op) });
            assert_eq!(instr.mnemonic(), Mnemonic::Unknown);
            assert_eq!(instr.operand(), None);
        }
    }

    #[test]
    fn test_addi_is_gated() {
        let raw = 0b1010_0011;
        assert_eq!(
            decode(raw, &canonical()),
            Instruction::Unknown { opcode: Nibble::low(0b1010) }
        );

        let config = CpuConfig { addi: true, ..CpuConfig::default() };
        let instr = decode(raw, &config);
        assert_eq!(instr, Instruction::Addi { data: Nibble::low(3) });
        assert_eq!(instr.operand_kind(), OperandKind::Data);
    }

    #[test]
    fn test_encode_fixed_operands() {
        assert_eq!(encode(&Instruction::Add), 0b0101_1001);
        assert_eq!(encode(&Instruction::Sub), 0b0110_1001);
        assert_eq!(encode(&Instruction::Halt), 0b1111_0000);
        assert_eq!(encode(&Instruction::Jump { addr: Nibble::low(12) }), 0b0111_1100);
    }

    #[test]
    fn test_table_round_trip() {
        let config = CpuConfig::extended();
        for info in OPCODE_TABLE.iter() {
            let raw = (info.opcode << 4) | 0b0110;
            let instr = decode(raw, &config);
            assert_eq!(instr.mnemonic(), info.mnemonic);
            assert_eq!(decode(encode(&instr), &config), instr);
        }
    }

    #[test]
    fn test_mnemonic_names() {
        assert_eq!(Mnemonic::from_name("jump_zero"), Some(Mnemonic::JumpZero));
        assert_eq!(Mnemonic::from_name("LOAD_A"), Some(Mnemonic::LoadA));
        assert_eq!(Mnemonic::from_name("UNKNOWN"), None);
        assert_eq!(Mnemonic::JumpNeg.to_string(), "JUMP_NEG");
    }
}
