//! Debugger application state and logic.

use crate::{Cpu, CpuConfig, Nibble, Phase};
use crate::asm::disasm::disassemble_instruction;
use crate::cpu::MEMORY_SIZE;
use crate::cpu::decode::{lookup, OpcodeInfo, OperandKind, OPCODE_TABLE, REGS_BA};
use std::collections::HashSet;

/// The control panel for writing one instruction into memory: an address,
/// an opcode picked from the table and a 4-bit operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadPanel {
    pub addr: u8,
    /// Index into [`DebuggerApp::opcodes`].
    pub entry: usize,
    pub operand: Nibble,
}

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Program image, reloaded after a full reset.
    pub program: Vec<u8>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<u8>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Open while the user is composing an instruction to load.
    pub load_panel: Option<LoadPanel>,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(program: Vec<u8>, config: CpuConfig) -> Self {
        let mut cpu = Cpu::with_config(config);
        let status = match cpu.load_program(&program) {
            Ok(()) => "Ready. Press 'n' for next phase, 's' to step, 'r' to run, 'q' to quit.".into(),
            Err(e) => format!("Failed to load program: {}", e),
        };

        Self {
            cpu,
            program,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status,
            load_panel: None,
        }
    }

    /// Opcode table rows the engine will decode with its current config.
    pub fn opcodes(&self) -> Vec<&'static OpcodeInfo> {
        OPCODE_TABLE
            .iter()
            .filter(|info| lookup(Nibble::low(info.opcode), self.cpu.config()).is_some())
            .collect()
    }

    /// Open the load panel at the current IAR.
    pub fn open_load_panel(&mut self) {
        self.running = false;
        self.load_panel = Some(LoadPanel {
            addr: self.cpu.regs.iar.value(),
            entry: 0,
            operand: Nibble::zero(),
        });
        self.status = "Load: ↑↓ address, ←→ opcode, +/- operand, Enter to load, Esc to close.".into();
    }

    pub fn close_load_panel(&mut self) {
        self.load_panel = None;
        self.status = "Load panel closed.".into();
    }

    /// Move the panel's target address, wrapping within memory.
    pub fn load_panel_move(&mut self, delta: i8) {
        if let Some(panel) = self.load_panel.as_mut() {
            panel.addr = (panel.addr as i16 + delta as i16).rem_euclid(MEMORY_SIZE as i16) as u8;
        }
    }

    /// Pick the next or previous opcode table row.
    pub fn load_panel_cycle_opcode(&mut self, delta: i8) {
        let count = self.opcodes().len() as isize;
        if let Some(panel) = self.load_panel.as_mut() {
            panel.entry = (panel.entry as isize + delta as isize).rem_euclid(count) as usize;
        }
    }

    /// Change the operand by one, wrapping within 4 bits.
    pub fn load_panel_adjust_operand(&mut self, delta: i8) {
        if let Some(panel) = self.load_panel.as_mut() {
            panel.operand = Nibble::low((panel.operand.value() as i16 + delta as i16).rem_euclid(16) as u8);
        }
    }

    /// The byte the panel would write. ADD/SUB always carry `1001`, NOP and
    /// HALT always `0000`.
    pub fn load_panel_byte(&self) -> Option<u8> {
        let panel = self.load_panel?;
        let info = *self.opcodes().get(panel.entry)?;
        let operand = match info.operands {
            OperandKind::None => Nibble::zero(),
            OperandKind::Regs => Nibble::low(REGS_BA),
            OperandKind::Addr | OperandKind::Data => panel.operand,
        };
        Some(Nibble::join(Nibble::low(info.opcode), operand))
    }

    /// Write the composed instruction into memory.
    pub fn load_panel_commit(&mut self) {
        let (Some(panel), Some(raw)) = (self.load_panel, self.load_panel_byte()) else {
            return;
        };

        self.status = match self.cpu.load_instruction(panel.addr as usize, raw) {
            Ok(instr) => {
                let text = crate::asm::disasm::format_instruction(&instr, raw);
                format!("Loaded RAM[{}] = {} ({})", panel.addr, crate::bits::format_byte(raw), text)
            }
            Err(e) => format!("Load failed: {}", e),
        };
        if let Some(panel) = self.load_panel.as_mut() {
            panel.addr = (panel.addr + 1) % MEMORY_SIZE as u8;
        }
    }

    /// Perform a single phase of the instruction cycle.
    pub fn next_phase(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU stopped: {:?}. Press 'x' to reset.", self.cpu.state);
            self.running = false;
            return;
        }

        match self.cpu.advance() {
            Ok(Phase::Fetch) => {
                self.status = format!("FETCH: RAM[{}] -> IR", self.cpu.regs.iar.value());
            }
            Ok(Phase::Decode) => {
                self.status = match self.cpu.pending() {
                    Some(d) => format!("DECODE: {} -> {}", d.opcode, d.mnemonic()),
                    None => "DECODE".into(),
                };
            }
            Ok(Phase::Execute) => {
                self.status = match self.cpu.last_instruction() {
                    Some(instr) => format!("EXECUTE: {}", instr.mnemonic()),
                    None => "EXECUTE".into(),
                };
            }
            Ok(Phase::Increment) => {
                self.status = format!("INCREMENT: IAR = {}", self.cpu.regs.iar.value());
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Step one whole instruction.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU stopped: {:?}. Press 'x' to reset.", self.cpu.state);
            self.running = false;
            return;
        }

        let iar = self.cpu.regs.iar.value();
        match self.cpu.step() {
            Ok(instr) => {
                let raw = crate::cpu::decode::encode(&instr);
                let disasm = disassemble_instruction(raw, self.cpu.config());
                self.status = format!("IAR={:02}: {}", iar, disasm);
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        // Step off a breakpoint we are already stopped on.
        let iar = self.cpu.regs.iar.value();
        if self.cpu.phase() == Phase::Fetch && self.breakpoints.contains(&iar) {
            self.step();
            if !self.cpu.is_running() {
                return;
            }
        }
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.cpu.is_running() {
            self.running = false;
            self.status = format!("{:?} after {} cycles", self.cpu.state, self.cpu.cycles);
            return;
        }

        // Breakpoints only apply at instruction boundaries.
        let iar = self.cpu.regs.iar.value();
        if self.cpu.phase() == Phase::Fetch && self.breakpoints.contains(&iar) {
            self.running = false;
            self.status = format!("Breakpoint at IAR={}", iar);
            return;
        }

        self.step();
    }

    /// Toggle breakpoint at the current IAR.
    pub fn toggle_breakpoint(&mut self) {
        let iar = self.cpu.regs.iar.value();
        if self.breakpoints.remove(&iar) {
            self.status = format!("Removed breakpoint at IAR={}", iar);
        } else {
            self.breakpoints.insert(iar);
            self.status = format!("Set breakpoint at IAR={}", iar);
        }
    }

    /// Reset registers and flags; the program stays in memory.
    pub fn reset(&mut self) {
        self.cpu.reset(false);
        self.running = false;
        self.status = "Registers reset. Memory kept.".into();
    }

    /// Reset everything, including memory.
    pub fn full_reset(&mut self) {
        self.cpu.reset(true);
        self.running = false;
        self.status = "Full reset. Memory cleared; press 'l' to reload the program.".into();
    }

    /// Write the program image back into memory.
    pub fn reload(&mut self) {
        self.running = false;
        self.status = match self.cpu.load_program(&self.program) {
            Ok(()) => format!("Reloaded {} bytes.", self.program.len()),
            Err(e) => format!("Failed to load program: {}", e),
        };
    }

    /// Disassembly of every memory cell: (address, text, is_current).
    pub fn get_disassembly(&self) -> Vec<(u8, String, bool)> {
        let iar = self.cpu.regs.iar.value();
        self.cpu
            .mem
            .dump(0, MEMORY_SIZE)
            .into_iter()
            .map(|(addr, raw)| {
                let addr = addr as u8;
                (addr, disassemble_instruction(raw, self.cpu.config()), addr == iar)
            })
            .collect()
    }
}

/// Run the debugger with a program.
pub fn run_debugger(program: Vec<u8>, config: CpuConfig) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(program, config);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        // Slow enough to watch the registers change
        if event::poll(Duration::from_millis(150))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.load_panel.is_some() {
                    match key.code {
                        KeyCode::Esc | KeyCode::Char('e') => app.close_load_panel(),
                        KeyCode::Up => app.load_panel_move(-1),
                        KeyCode::Down => app.load_panel_move(1),
                        KeyCode::Left => app.load_panel_cycle_opcode(-1),
                        KeyCode::Right => app.load_panel_cycle_opcode(1),
                        KeyCode::Char('+') | KeyCode::Char('=') => app.load_panel_adjust_operand(1),
                        KeyCode::Char('-') => app.load_panel_adjust_operand(-1),
                        KeyCode::Enter => app.load_panel_commit(),
                        KeyCode::Char('q') => app.should_quit = true,
                        _ => {}
                    }
                } else if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('e') => app.open_load_panel(),
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('n') => {
                            app.running = false;
                            app.next_phase();
                        }
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Char('X') => app.full_reset(),
                        KeyCode::Char('l') => app.reload(),
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble;

    fn app_for(source: &str) -> DebuggerApp {
        DebuggerApp::new(assemble(source).unwrap(), CpuConfig::default())
    }

    #[test]
    fn test_next_phase_walks_cycle() {
        let mut app = app_for("NOP\nHALT");
        app.next_phase();
        assert!(app.status.starts_with("FETCH"));
        app.next_phase();
        assert!(app.status.starts_with("DECODE"));
        app.next_phase();
        assert!(app.status.starts_with("EXECUTE"));
        app.next_phase();
        assert_eq!(app.status, "INCREMENT: IAR = 1");
    }

    #[test]
    fn test_run_stops_at_breakpoint() {
        let mut app = app_for("NOP\nNOP\nNOP\nHALT");
        app.breakpoints.insert(2);
        app.run();
        while app.running {
            app.tick();
        }
        assert_eq!(app.cpu.regs.iar.value(), 2);
        assert!(app.cpu.is_running());

        app.run();
        while app.running {
            app.tick();
        }
        assert!(app.cpu.is_halted());
    }

    #[test]
    fn test_resets() {
        let mut app = app_for("HALT");
        app.step();
        assert!(app.cpu.is_halted());

        app.reset();
        assert!(app.cpu.is_running());
        assert_eq!(app.cpu.read_memory(0), Ok(0b1111_0000));

        app.full_reset();
        assert_eq!(app.cpu.read_memory(0), Ok(0));

        app.reload();
        assert_eq!(app.cpu.read_memory(0), Ok(0b1111_0000));
    }

    #[test]
    fn test_load_panel_writes_instruction() {
        let mut app = DebuggerApp::new(Vec::new(), CpuConfig::default());
        app.open_load_panel();

        // NOP is row 0; two rows on is LOAD_B.
        app.load_panel_cycle_opcode(2);
        app.load_panel_adjust_operand(-1);
        assert_eq!(app.load_panel_byte(), Some(0b0010_1111));

        app.load_panel_commit();
        assert_eq!(app.cpu.read_memory(0), Ok(0b0010_1111));
        assert_eq!(app.status, "Loaded RAM[0] = 00101111 (LOAD_B 15)");
        assert_eq!(app.load_panel.map(|p| p.addr), Some(1));

        // ADD ignores the chosen operand.
        app.load_panel_cycle_opcode(3);
        app.load_panel_commit();
        assert_eq!(app.cpu.read_memory(1), Ok(0b0101_1001));
    }

    #[test]
    fn test_load_panel_follows_config() {
        let plain = DebuggerApp::new(Vec::new(), CpuConfig::default());
        assert_eq!(plain.opcodes().len(), 11);

        let mut extended = DebuggerApp::new(Vec::new(), CpuConfig::extended());
        assert_eq!(extended.opcodes().len(), 12);

        extended.open_load_panel();
        extended.load_panel_move(-1);
        extended.load_panel_cycle_opcode(-2);
        extended.load_panel_adjust_operand(3);
        assert_eq!(extended.load_panel_byte(), Some(0b1010_0011));
        extended.load_panel_commit();
        assert_eq!(extended.cpu.read_memory(15), Ok(0b1010_0011));
    }

    #[test]
    fn test_disassembly_marks_iar() {
        let app = app_for("LOAD_A 3\nHALT");
        let listing = app.get_disassembly();
        assert_eq!(listing.len(), MEMORY_SIZE);
        assert_eq!(listing[0], (0, "LOAD_A 3".to_string(), true));
        assert_eq!(listing[1], (1, "HALT".to_string(), false));
    }
}
