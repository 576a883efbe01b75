//! The instruction-cycle engine.
//!
//! Each cycle is four explicit phases, so a front end can show the machine
//! between any two of them:
//!
//! ```text
//! FETCH -> DECODE -> EXECUTE -> INCREMENT -> FETCH ...
//!                       |
//!                       +-> HALTED / FAULTED (until reset)
//! ```
//!
//! IAR advancement is its own phase so that a taken jump can suppress it.

use crate::bits::{self, Nibble};
use crate::cpu::{CpuConfig, Memory, Registers};
use crate::cpu::decode::{self, DecodedInstruction, Instruction};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::Flags;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed HALT).
    Halted,
    /// CPU executed an unknown opcode and stopped.
    Faulted,
}

/// The phase the engine will perform next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Fetch,
    Decode,
    Execute,
    Increment,
}

/// The CPU.
#[derive(Clone)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instructions executed since the last reset.
    pub cycles: u64,
    config: CpuConfig,
    phase: Phase,
    /// Output of the last decode, consumed by execute.
    decoded: Option<DecodedInstruction>,
    /// Set by a taken jump, consumed by the increment phase.
    jumped: bool,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU with zeroed state and the canonical instruction set.
    pub fn new() -> Self {
        Self::with_config(CpuConfig::default())
    }

    /// Create a new CPU with the given options.
    pub fn with_config(config: CpuConfig) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            config,
            phase: Phase::Fetch,
            decoded: None,
            jumped: false,
            last_instr: None,
        }
    }

    /// Reset the CPU.
    ///
    /// A register reset (`full == false`) keeps the loaded program in
    /// memory; a full reset also zeroes every memory cell.
    pub fn reset(&mut self, full: bool) {
        self.regs.reset();
        if full {
            self.mem.clear();
        }
        self.state = CpuState::Running;
        self.cycles = 0;
        self.phase = Phase::Fetch;
        self.decoded = None;
        self.jumped = false;
        self.last_instr = None;
        log::info!("CPU reset ({})", if full { "full" } else { "registers" });
    }

    pub fn config(&self) -> &CpuConfig {
        &self.config
    }

    /// Load a program image into memory starting at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_program(0, program)?;
        log::info!("loaded {} bytes", program.len());
        Ok(())
    }

    /// Read a memory cell.
    pub fn read_memory(&self, addr: usize) -> Result<u8, MemoryError> {
        self.mem.read(addr)
    }

    /// Write a memory cell.
    pub fn write_memory(&mut self, addr: usize, value: u8) -> Result<(), MemoryError> {
        self.mem.write(addr, value)
    }

    /// Write a memory cell from its 8-character binary form.
    pub fn write_memory_bits(&mut self, addr: usize, bits: &str) -> Result<(), MemoryError> {
        self.mem.write_bits(addr, bits)
    }

    /// Store an instruction byte and report what it decodes to.
    ///
    /// Only memory changes; the decoded instruction is returned for display.
    pub fn load_instruction(&mut self, addr: usize, raw: u8) -> Result<Instruction, MemoryError> {
        self.mem.write(addr, raw)?;
        let instr = decode::decode(raw, &self.config);
        match instr.operand() {
            Some(operand) => log::info!(
                "load RAM[{}] = {} ({} {})",
                addr, bits::format_byte(raw), instr.mnemonic(), operand
            ),
            None => log::info!(
                "load RAM[{}] = {} ({})",
                addr, bits::format_byte(raw), instr.mnemonic()
            ),
        }
        Ok(instr)
    }

    /// Fetch: IR := [IAR]. The IAR itself is left alone.
    ///
    /// Returns the fetched byte.
    pub fn fetch(&mut self) -> Result<u8, CpuError> {
        self.ensure_running()?;

        let addr = self.regs.iar;
        let raw = self.mem.read(addr.index())?;
        self.regs.ir.load(raw);
        self.phase = Phase::Decode;

        log::debug!("fetch: RAM[{}] -> IR ({} {})", addr.value(), self.regs.ir.opcode, self.regs.ir.operand);
        Ok(raw)
    }

    /// Decode the instruction register.
    ///
    /// An opcode with no table entry decodes to [`Instruction::Unknown`];
    /// the failure surfaces when it is executed.
    pub fn decode(&mut self) -> Result<DecodedInstruction, CpuError> {
        self.ensure_running()?;

        let ir = self.regs.ir;
        let decoded = DecodedInstruction {
            instruction: decode::decode_fields(ir.opcode, ir.operand, &self.config),
            opcode: ir.opcode,
        };
        self.decoded = Some(decoded);
        self.phase = Phase::Execute;

        match decoded.operand() {
            Some(operand) => log::debug!("decode: {} (operand {})", decoded.mnemonic(), operand),
            None => log::debug!("decode: {}", decoded.mnemonic()),
        }
        Ok(decoded)
    }

    /// Execute the pending decoded instruction.
    ///
    /// The overflow flag and any jump marker an increment never consumed are
    /// cleared first; Z and N keep their values unless the instruction
    /// produces a new result.
    pub fn execute(&mut self) -> Result<Instruction, CpuError> {
        self.ensure_running()?;
        let decoded = self.decoded.take().ok_or(CpuError::NoDecodedInstruction)?;
        let instr = decoded.instruction;

        self.regs.flags.o = false;
        self.jumped = false;
        log::debug!("execute: {}", instr.mnemonic());

        match instr {
            Instruction::Nop => {}

            Instruction::LoadA { addr } => {
                let value = self.mem.read(addr.index())?;
                self.regs.a = value;
                if self.config.flags_on_load {
                    self.regs.flags.set_zn(value);
                }
            }

            Instruction::LoadB { addr } => {
                let value = self.mem.read(addr.index())?;
                self.regs.b = value;
                if self.config.flags_on_load {
                    self.regs.flags.set_zn(value);
                }
            }

            Instruction::StoreA { addr } => {
                self.mem.write(addr.index(), self.regs.a)?;
            }

            Instruction::StoreB { addr } => {
                self.mem.write(addr.index(), self.regs.b)?;
            }

            Instruction::Add => {
                let result = bits::add(self.regs.a, self.regs.b);
                self.regs.a = result.value;
                self.regs.flags.set_from_alu(&result);
            }

            Instruction::Sub => {
                let result = bits::subtract(self.regs.a, self.regs.b);
                self.regs.a = result.value;
                self.regs.flags.set_from_alu(&result);
            }

            Instruction::Addi { data } => {
                let result = bits::add(self.regs.a, data.value());
                self.regs.a = result.value;
                self.regs.flags.set_from_alu(&result);
            }

            Instruction::Jump { addr } => self.jump(addr),

            Instruction::JumpNeg { addr } => {
                if self.regs.flags.n {
                    self.jump(addr);
                }
            }

            Instruction::JumpZero { addr } => {
                if self.regs.flags.z {
                    self.jump(addr);
                }
            }

            Instruction::Halt => {
                self.state = CpuState::Halted;
                log::info!("CPU halted at IAR={}", self.regs.iar.value());
            }

            Instruction::Unknown { opcode } => {
                self.state = CpuState::Faulted;
                log::warn!("unknown opcode {} at IAR={}, stopping", opcode, self.regs.iar.value());
            }
        }

        self.cycles += 1;
        self.last_instr = Some(instr);
        self.phase = Phase::Increment;
        Ok(instr)
    }

    fn jump(&mut self, addr: Nibble) {
        self.regs.jump(addr);
        self.jumped = true;
        log::debug!("jump to {}", addr.value());
    }

    /// Advance the IAR unless the last execute took a jump.
    ///
    /// The jump marker is cleared either way. Returns the new IAR.
    pub fn increment_iar(&mut self) -> Nibble {
        if self.is_running() && !self.jumped {
            self.regs.advance_iar();
        }
        self.jumped = false;
        self.phase = Phase::Fetch;
        self.regs.iar
    }

    /// Perform the next phase of the current cycle.
    ///
    /// Returns the phase that was performed.
    pub fn advance(&mut self) -> Result<Phase, CpuError> {
        self.ensure_running()?;

        let phase = self.phase;
        match phase {
            Phase::Fetch => {
                self.fetch()?;
            }
            Phase::Decode => {
                self.decode()?;
            }
            Phase::Execute => {
                self.execute()?;
            }
            Phase::Increment => {
                self.increment_iar();
            }
        }
        Ok(phase)
    }

    /// Execute a single instruction: the rest of the current cycle if one
    /// is in progress, otherwise a whole new one.
    ///
    /// Returns the executed instruction. Executing an unknown opcode leaves
    /// the CPU faulted and returns [`CpuError::UnknownOpcode`].
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        self.ensure_running()?;

        if self.phase == Phase::Increment {
            self.increment_iar();
        }
        if self.phase == Phase::Fetch {
            self.fetch()?;
        }
        if self.phase == Phase::Decode {
            self.decode()?;
        }
        let instr = self.execute()?;

        match (self.state, instr) {
            (CpuState::Running, _) => {
                self.increment_iar();
                Ok(instr)
            }
            (CpuState::Faulted, Instruction::Unknown { opcode }) => Err(CpuError::UnknownOpcode(opcode)),
            _ => Ok(instr),
        }
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    fn ensure_running(&self) -> Result<(), CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }
        Ok(())
    }

    /// The phase that [`Cpu::advance`] will perform next.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The decoded instruction waiting to be executed, if any.
    pub fn pending(&self) -> Option<&DecodedInstruction> {
        self.decoded.as_ref()
    }

    /// Whether the last execute took a jump that the next increment will honour.
    pub fn jump_pending(&self) -> bool {
        self.jumped
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU has stopped, by HALT or by fault.
    pub fn is_halted(&self) -> bool {
        self.state != CpuState::Running
    }

    /// Check if the CPU stopped on an unknown opcode.
    pub fn is_faulted(&self) -> bool {
        self.state == CpuState::Faulted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// A read-only copy of the visible machine state.
    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            memory: self.mem.cells().to_vec(),
            a: self.regs.a,
            b: self.regs.b,
            iar: self.regs.iar.value(),
            ir_opcode: bits::format_nibble(self.regs.ir.opcode),
            ir_operand: bits::format_nibble(self.regs.ir.operand),
            flags: self.regs.flags,
            state: self.state,
            phase: self.phase,
            cycles: self.cycles,
            pending: self.decoded,
            last_instruction: self.last_instr,
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("phase", &self.phase)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Visible machine state, for front ends to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSnapshot {
    pub memory: Vec<u8>,
    pub a: u8,
    pub b: u8,
    pub iar: u8,
    pub ir_opcode: String,
    pub ir_operand: String,
    pub flags: Flags,
    pub state: CpuState,
    pub phase: Phase,
    pub cycles: u64,
    pub pending: Option<DecodedInstruction>,
    pub last_instruction: Option<Instruction>,
}

impl CpuSnapshot {
    /// Memory cells as 8-character binary strings.
    pub fn memory_bits(&self) -> Vec<String> {
        self.memory.iter().map(|&b| bits::format_byte(b)).collect()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("no decoded instruction to execute")]
    NoDecodedInstruction,

    #[error("unknown opcode {0}")]
    UnknownOpcode(Nibble),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode;
    use crate::cpu::memory::MEMORY_SIZE;

    fn make_program(instructions: &[Instruction]) -> Vec<u8> {
        instructions.iter().map(encode).collect()
    }

    fn addr(n: u8) -> Nibble {
        Nibble::low(n)
    }

    #[test]
    fn test_cpu_halt() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[Instruction::Halt])).unwrap();

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 1);
        assert!(cpu.is_halted());
        assert_eq!(cpu.state, CpuState::Halted);
        assert_eq!(cpu.regs.iar.value(), 0);
    }

    #[test]
    fn test_cpu_nop_then_halt() {
        let mut cpu = Cpu::new();
        let program = make_program(&[
            Instruction::Nop,
            Instruction::Nop,
            Instruction::Nop,
            Instruction::Halt,
        ]);
        cpu.load_program(&program).unwrap();

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 4);
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.iar.value(), 3);
    }

    #[test]
    fn test_single_cycle_load() {
        let mut cpu = Cpu::new();
        cpu.load_instruction(0, 0b0001_0101).unwrap();
        cpu.write_memory(5, 0b0000_0011).unwrap();

        cpu.fetch().unwrap();
        cpu.decode().unwrap();
        cpu.execute().unwrap();
        cpu.increment_iar();

        assert_eq!(cpu.regs.a, 3);
        assert!(!cpu.regs.flags.z);
        assert!(!cpu.regs.flags.n);
        assert_eq!(cpu.regs.iar.value(), 1);
    }

    #[test]
    fn test_fetch_latches_ir_without_moving_iar() {
        let mut cpu = Cpu::new();
        cpu.write_memory(0, 0b0111_1010).unwrap();

        assert_eq!(cpu.fetch(), Ok(0b0111_1010));
        assert_eq!(cpu.regs.ir.opcode.value(), 0b0111);
        assert_eq!(cpu.regs.ir.operand.value(), 0b1010);
        assert_eq!(cpu.regs.iar.value(), 0);
    }

    #[test]
    fn test_load_does_not_touch_flags_by_default() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[
            Instruction::LoadA { addr: addr(4) },
            Instruction::Halt,
        ])).unwrap();
        cpu.regs.flags.z = true;
        cpu.write_memory(4, 0x80).unwrap();

        cpu.step().unwrap();

        assert_eq!(cpu.regs.a, 0x80);
        assert!(cpu.regs.flags.z);
        assert!(!cpu.regs.flags.n);
    }

    #[test]
    fn test_flags_on_load_applies_to_both_registers() {
        let config = CpuConfig { flags_on_load: true, ..CpuConfig::default() };
        let mut cpu = Cpu::with_config(config);
        cpu.load_program(&make_program(&[
            Instruction::LoadA { addr: addr(4) },
            Instruction::LoadB { addr: addr(5) },
            Instruction::Halt,
        ])).unwrap();
        cpu.write_memory(4, 0x80).unwrap();
        cpu.write_memory(5, 0).unwrap();

        cpu.step().unwrap();
        assert!(cpu.regs.flags.n && !cpu.regs.flags.z);

        cpu.step().unwrap();
        assert!(!cpu.regs.flags.n && cpu.regs.flags.z);
    }

    #[test]
    fn test_store() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[
            Instruction::StoreA { addr: addr(14) },
            Instruction::StoreB { addr: addr(15) },
            Instruction::Halt,
        ])).unwrap();
        cpu.regs.a = 0xAA;
        cpu.regs.b = 0x55;
        cpu.regs.flags.z = true;

        cpu.run().unwrap();

        assert_eq!(cpu.read_memory(14), Ok(0xAA));
        assert_eq!(cpu.read_memory(15), Ok(0x55));
        assert!(cpu.regs.flags.z);
    }

    #[test]
    fn test_add_overflow() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[Instruction::Add])).unwrap();
        cpu.regs.a = 127;
        cpu.regs.b = 1;

        cpu.step().unwrap();

        assert_eq!(cpu.regs.a, 128);
        assert_eq!(cpu.regs.flags, Flags { z: false, n: true, o: true });
    }

    #[test]
    fn test_sub_cases() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[Instruction::Sub, Instruction::Sub])).unwrap();

        cpu.step().unwrap();
        assert_eq!(cpu.regs.a, 0);
        assert_eq!(cpu.regs.flags, Flags { z: true, n: false, o: false });

        cpu.regs.b = 1;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.a, 255);
        assert_eq!(cpu.regs.flags, Flags { z: false, n: true, o: false });
    }

    #[test]
    fn test_overflow_cleared_each_execute() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[Instruction::Add, Instruction::Nop])).unwrap();
        cpu.regs.a = 127;
        cpu.regs.b = 1;

        cpu.step().unwrap();
        assert!(cpu.regs.flags.o);

        cpu.step().unwrap();
        assert!(!cpu.regs.flags.o);
        assert!(cpu.regs.flags.n);
    }

    #[test]
    fn test_jump_suppresses_increment() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[Instruction::Jump { addr: addr(9) }])).unwrap();

        cpu.fetch().unwrap();
        cpu.decode().unwrap();
        cpu.execute().unwrap();
        assert_eq!(cpu.regs.iar.value(), 9);
        assert!(cpu.jump_pending());

        assert_eq!(cpu.increment_iar().value(), 9);
        assert!(!cpu.jump_pending());
    }

    #[test]
    fn test_jump_marker_does_not_leak() {
        let mut cpu = Cpu::new();
        cpu.write_memory(0, encode(&Instruction::Jump { addr: addr(6) })).unwrap();
        cpu.write_memory(6, encode(&Instruction::Nop)).unwrap();

        cpu.step().unwrap();
        assert_eq!(cpu.regs.iar.value(), 6);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.iar.value(), 7);
    }

    #[test]
    fn test_skipped_increment_does_not_carry_jump() {
        let mut cpu = Cpu::new();
        cpu.write_memory(0, encode(&Instruction::Jump { addr: addr(5) })).unwrap();
        cpu.write_memory(5, encode(&Instruction::Nop)).unwrap();

        cpu.fetch().unwrap();
        cpu.decode().unwrap();
        cpu.execute().unwrap();
        assert!(cpu.jump_pending());

        // Straight into the next cycle without an increment.
        cpu.fetch().unwrap();
        cpu.decode().unwrap();
        cpu.execute().unwrap();
        assert!(!cpu.jump_pending());

        assert_eq!(cpu.increment_iar().value(), 6);
    }

    #[test]
    fn test_conditional_jumps_not_taken() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[
            Instruction::JumpNeg { addr: addr(12) },
            Instruction::JumpZero { addr: addr(12) },
        ])).unwrap();

        cpu.step().unwrap();
        assert_eq!(cpu.regs.iar.value(), 1);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.iar.value(), 2);
    }

    #[test]
    fn test_conditional_jumps_taken() {
        let mut cpu = Cpu::new();
        cpu.write_memory(0, encode(&Instruction::JumpNeg { addr: addr(8) })).unwrap();
        cpu.write_memory(8, encode(&Instruction::JumpZero { addr: addr(3) })).unwrap();
        cpu.regs.flags.n = true;
        cpu.regs.flags.z = true;

        cpu.step().unwrap();
        assert_eq!(cpu.regs.iar.value(), 8);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.iar.value(), 3);
    }

    #[test]
    fn test_iar_wraps() {
        let mut cpu = Cpu::new();
        cpu.regs.iar = addr(15);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.iar.value(), 0);
    }

    #[test]
    fn test_halted_refuses_phases() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[Instruction::Halt])).unwrap();
        cpu.step().unwrap();

        let refused = Err(CpuError::NotRunning(CpuState::Halted));
        assert_eq!(cpu.fetch(), refused);
        assert_eq!(cpu.decode().map(|_| ()), Err(CpuError::NotRunning(CpuState::Halted)));
        assert_eq!(cpu.execute().map(|_| ()), Err(CpuError::NotRunning(CpuState::Halted)));
        assert_eq!(cpu.step().map(|_| ()), Err(CpuError::NotRunning(CpuState::Halted)));
        assert_eq!(cpu.increment_iar().value(), 0);

        cpu.reset(false);
        assert!(cpu.is_running());
        assert_eq!(cpu.step(), Ok(Instruction::Halt));
    }

    #[test]
    fn test_execute_without_decode() {
        let mut cpu = Cpu::new();
        assert_eq!(cpu.execute(), Err(CpuError::NoDecodedInstruction));

        cpu.fetch().unwrap();
        cpu.decode().unwrap();
        cpu.execute().unwrap();
        assert_eq!(cpu.execute(), Err(CpuError::NoDecodedInstruction));
    }

    #[test]
    fn test_unknown_opcode_faults_at_execute() {
        let mut cpu = Cpu::new();
        cpu.write_memory(0, 0b1011_0000).unwrap();

        cpu.fetch().unwrap();
        let decoded = cpu.decode().unwrap();
        assert_eq!(decoded.instruction, Instruction::Unknown { opcode: addr(0b1011) });
        assert!(cpu.is_running());

        cpu.execute().unwrap();
        assert!(cpu.is_halted());
        assert!(cpu.is_faulted());
    }

    #[test]
    fn test_step_reports_unknown_opcode() {
        let mut cpu = Cpu::new();
        cpu.write_memory(0, 0b1100_0000).unwrap();

        assert_eq!(cpu.run(), Err(CpuError::UnknownOpcode(addr(0b1100))));
        assert_eq!(cpu.state, CpuState::Faulted);
        assert_eq!(cpu.regs.iar.value(), 0);
    }

    #[test]
    fn test_addi_extension() {
        let config = CpuConfig { addi: true, ..CpuConfig::default() };
        let mut cpu = Cpu::with_config(config);
        cpu.load_program(&[0b1010_0101, 0b1111_0000]).unwrap();
        cpu.regs.a = 10;

        cpu.run().unwrap();
        assert_eq!(cpu.regs.a, 15);
        assert!(cpu.is_halted() && !cpu.is_faulted());

        let mut plain = Cpu::new();
        plain.load_program(&[0b1010_0101]).unwrap();
        assert!(plain.run().is_err());
        assert!(plain.is_faulted());
    }

    #[test]
    fn test_reset_modes() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0b0001_0101, 0, 0, 0, 0, 3]).unwrap();
        cpu.step().unwrap();

        cpu.reset(false);
        assert_eq!(cpu.regs, Registers::new());
        assert_eq!(cpu.cycles, 0);
        assert_eq!(cpu.phase(), Phase::Fetch);
        assert!(cpu.pending().is_none());
        assert!(cpu.last_instruction().is_none());
        assert_eq!(cpu.read_memory(0), Ok(0b0001_0101));
        assert_eq!(cpu.read_memory(5), Ok(3));

        cpu.reset(true);
        assert!(cpu.mem.cells().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_reset_after_decode_drops_pending() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[Instruction::Nop, Instruction::Nop])).unwrap();

        cpu.fetch().unwrap();
        cpu.decode().unwrap();
        assert!(cpu.pending().is_some());

        cpu.reset(false);
        assert!(cpu.pending().is_none());
        assert_eq!(cpu.phase(), Phase::Fetch);
        assert_eq!(cpu.execute(), Err(CpuError::NoDecodedInstruction));
    }

    #[test]
    fn test_reset_after_taken_jump_clears_marker() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[Instruction::Jump { addr: addr(7) }])).unwrap();

        cpu.fetch().unwrap();
        cpu.decode().unwrap();
        cpu.execute().unwrap();
        assert!(cpu.jump_pending());
        assert_eq!(cpu.phase(), Phase::Increment);

        cpu.reset(false);
        assert!(!cpu.jump_pending());
        assert!(cpu.pending().is_none());
        assert_eq!(cpu.phase(), Phase::Fetch);
        assert_eq!(cpu.regs.iar.value(), 0);
        assert_eq!(cpu.increment_iar().value(), 1);
    }

    #[test]
    fn test_advance_walks_phases() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[Instruction::Nop])).unwrap();

        assert_eq!(cpu.advance(), Ok(Phase::Fetch));
        assert_eq!(cpu.advance(), Ok(Phase::Decode));
        assert!(cpu.pending().is_some());
        assert_eq!(cpu.advance(), Ok(Phase::Execute));
        assert_eq!(cpu.advance(), Ok(Phase::Increment));
        assert_eq!(cpu.phase(), Phase::Fetch);
        assert_eq!(cpu.regs.iar.value(), 1);
    }

    #[test]
    fn test_step_finishes_partial_cycle() {
        let mut cpu = Cpu::new();
        cpu.load_program(&make_program(&[
            Instruction::LoadA { addr: addr(4) },
            Instruction::Halt,
        ])).unwrap();
        cpu.write_memory(4, 7).unwrap();

        cpu.advance().unwrap();
        assert_eq!(cpu.step(), Ok(Instruction::LoadA { addr: addr(4) }));
        assert_eq!(cpu.regs.a, 7);
        assert_eq!(cpu.regs.iar.value(), 1);
        assert_eq!(cpu.cycles, 1);
    }

    #[test]
    fn test_invalid_address_access() {
        let mut cpu = Cpu::new();
        assert_eq!(cpu.read_memory(16), Err(MemoryError::InvalidAddress(16)));
        assert_eq!(cpu.write_memory(99, 1), Err(MemoryError::InvalidAddress(99)));
        assert!(cpu.load_instruction(16, 0).is_err());
        assert!(matches!(
            cpu.write_memory_bits(0, "2"),
            Err(MemoryError::InvalidOperand(_))
        ));
    }

    #[test]
    fn test_snapshot() {
        let mut cpu = Cpu::new();
        cpu.load_program(&[0b0001_0101]).unwrap();
        cpu.fetch().unwrap();

        let snap = cpu.snapshot();
        assert_eq!(snap.memory.len(), MEMORY_SIZE);
        assert_eq!(snap.memory_bits()[0], "00010101");
        assert_eq!(snap.ir_opcode, "0001");
        assert_eq!(snap.ir_operand, "0101");
        assert_eq!(snap.phase, Phase::Decode);
        assert_eq!(snap.state, CpuState::Running);
    }
}
