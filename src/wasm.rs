//! WebAssembly bindings for the cpu8 emulator.
//!
//! Exposes every phase of the instruction cycle so a browser front end can
//! animate fetch, decode, execute and increment one at a time.

use wasm_bindgen::prelude::*;
use crate::{Cpu, CpuConfig};
use crate::asm::assembler::assemble;
use crate::asm::disasm::{disassemble_instruction, format_instruction};
use crate::bits;
use crate::cpu::decode::{encode, lookup, OPCODE_TABLE};
use crate::cpu::MEMORY_SIZE;
use crate::Nibble;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_err(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    program: Vec<u8>,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU instance with the given extensions enabled.
    #[wasm_bindgen(constructor)]
    pub fn new(addi: bool, flags_on_load: bool) -> Self {
        Self {
            cpu: Cpu::with_config(CpuConfig { addi, flags_on_load }),
            program: Vec::new(),
        }
    }

    /// Load a program from assembly source code. Returns the image size.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let image = assemble(source).map_err(js_err)?;

        self.cpu.reset(true);
        self.cpu.load_program(&image).map_err(js_err)?;
        self.program = image;

        Ok(self.program.len())
    }

    /// Write a binary string such as `"00010101"` into one memory cell.
    #[wasm_bindgen]
    pub fn write_memory_bits(&mut self, addr: usize, bits: &str) -> Result<(), JsError> {
        self.cpu.write_memory_bits(addr, bits).map_err(js_err)
    }

    /// Write one instruction from its two 4-bit fields, e.g.
    /// `load_instruction(3, "0001", "0101")`. Returns the disassembly.
    #[wasm_bindgen]
    pub fn load_instruction(&mut self, addr: usize, opcode_bits: &str, operand_bits: &str) -> Result<String, JsError> {
        let opcode = bits::parse_nibble(opcode_bits).map_err(js_err)?;
        let operand = bits::parse_nibble(operand_bits).map_err(js_err)?;
        let raw = Nibble::join(opcode, operand);

        let instr = self.cpu.load_instruction(addr, raw).map_err(js_err)?;
        Ok(format_instruction(&instr, raw))
    }

    /// The opcode table rows this CPU decodes, as JSON.
    #[wasm_bindgen]
    pub fn opcode_table(&self) -> Result<String, JsError> {
        let rows: Vec<_> = OPCODE_TABLE
            .iter()
            .filter(|info| lookup(Nibble::low(info.opcode), self.cpu.config()).is_some())
            .collect();
        serde_json::to_string(&rows).map_err(js_err)
    }

    /// Fetch phase. Returns the fetched byte.
    #[wasm_bindgen]
    pub fn fetch(&mut self) -> Result<u8, JsError> {
        self.cpu.fetch().map_err(js_err)
    }

    /// Decode phase. Returns the decoded mnemonic.
    #[wasm_bindgen]
    pub fn decode(&mut self) -> Result<String, JsError> {
        let decoded = self.cpu.decode().map_err(js_err)?;
        Ok(decoded.mnemonic().to_string())
    }

    /// Execute phase. Returns the executed instruction as text.
    #[wasm_bindgen]
    pub fn execute(&mut self) -> Result<String, JsError> {
        let instr = self.cpu.execute().map_err(js_err)?;
        Ok(format_instruction(&instr, self.cpu.regs.ir.raw()))
    }

    /// Increment phase. Returns the new IAR.
    #[wasm_bindgen]
    pub fn increment_iar(&mut self) -> u8 {
        self.cpu.increment_iar().value()
    }

    /// Perform the next phase. Returns its name.
    #[wasm_bindgen]
    pub fn advance(&mut self) -> Result<String, JsError> {
        let phase = self.cpu.advance().map_err(js_err)?;
        Ok(format!("{:?}", phase))
    }

    /// Step one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let instr = self.cpu.step().map_err(js_err)?;
        Ok(disassemble_instruction(encode(&instr), self.cpu.config()))
    }

    /// Run until halt or max cycles. Returns the total cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.cpu.run_limited(max_cycles as u64).map_err(js_err)?;
        Ok(self.cpu.cycles)
    }

    /// Reset registers; with `full`, also clear memory.
    #[wasm_bindgen]
    pub fn reset(&mut self, full: bool) {
        self.cpu.reset(full);
    }

    /// Write the last assembled program back into memory.
    #[wasm_bindgen]
    pub fn reload(&mut self) -> Result<usize, JsError> {
        self.cpu.load_program(&self.program).map_err(js_err)?;
        Ok(self.program.len())
    }

    /// Check if CPU is running.
    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    /// Check if CPU is halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    #[wasm_bindgen]
    pub fn a(&self) -> u8 {
        self.cpu.regs.a
    }

    #[wasm_bindgen]
    pub fn b(&self) -> u8 {
        self.cpu.regs.b
    }

    #[wasm_bindgen]
    pub fn iar(&self) -> u8 {
        self.cpu.regs.iar.value()
    }

    /// Instruction register as `"oooo dddd"`.
    #[wasm_bindgen]
    pub fn ir(&self) -> String {
        format!("{} {}", self.cpu.regs.ir.opcode, self.cpu.regs.ir.operand)
    }

    /// Flags as a `"ZNO"` string of `T`/`F`.
    #[wasm_bindgen]
    pub fn flags(&self) -> String {
        let f = self.cpu.regs.flags;
        [f.z, f.n, f.o].iter().map(|&set| if set { 'T' } else { 'F' }).collect()
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state)
    }

    /// The phase the next `advance` will perform.
    #[wasm_bindgen]
    pub fn phase(&self) -> String {
        format!("{:?}", self.cpu.phase())
    }

    /// Get memory cell as binary string.
    #[wasm_bindgen]
    pub fn memory_bits_at(&self, index: usize) -> Result<String, JsError> {
        let value = self.cpu.read_memory(index).map_err(js_err)?;
        Ok(bits::format_byte(value))
    }

    /// Get all memory cells.
    #[wasm_bindgen]
    pub fn memory_all(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(&self.cpu.mem.cells()[..MEMORY_SIZE])
    }

    /// Full machine state as JSON.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu.snapshot()).map_err(js_err)
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new(false, false)
    }
}

/// Assemble source code and return the memory image.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<js_sys::Uint8Array, JsError> {
    let image = assemble(source).map_err(js_err)?;
    Ok(js_sys::Uint8Array::from(&image[..]))
}

/// Disassemble a single byte.
#[wasm_bindgen]
pub fn wasm_disassemble(value: u8, addi: bool) -> String {
    disassemble_instruction(value, &CpuConfig { addi, flags_on_load: false })
}
