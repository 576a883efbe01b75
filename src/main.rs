//! cpu8 Emulator - CLI Entry Point
//!
//! Commands:
//! - `cpu8-emu run <program>` - Assemble and run a program
//! - `cpu8-emu debug <program>` - Interactive phase-by-phase debugger
//! - `cpu8-emu asm <source>` - Print the assembled binary listing
//! - `cpu8-emu disasm <source>` - Assemble, then disassemble

use clap::{Args, Parser, Subcommand};
use cpu8::{Cpu, CpuConfig};

#[derive(Parser)]
#[command(name = "cpu8-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "An educational 8-bit CPU with a visible fetch-decode-execute cycle")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Engine options shared by the commands that execute code.
#[derive(Args, Clone, Copy)]
struct EngineArgs {
    /// Enable the ADDI extension (opcode 1010)
    #[arg(long)]
    addi: bool,
    /// Update Z and N on LOAD_A / LOAD_B
    #[arg(long)]
    flags_on_load: bool,
}

impl From<EngineArgs> for CpuConfig {
    fn from(args: EngineArgs) -> Self {
        CpuConfig {
            addi: args.addi,
            flags_on_load: args.flags_on_load,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the ASM file to execute
        program: String,
        /// Maximum number of cycles to run (default: 10000)
        #[arg(short, long, default_value = "10000")]
        max_cycles: u64,
        /// Show trace output
        #[arg(short, long)]
        trace: bool,
        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Interactive debugger
    Debug {
        /// Path to the ASM file to debug
        program: String,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Assemble source and print the binary listing
    Asm {
        /// Path to the source file
        source: String,
    },
    /// Assemble source and print its disassembly
    Disasm {
        /// Path to the source file
        source: String,
        /// Decode opcode 1010 as ADDI
        #[arg(long)]
        addi: bool,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { program, max_cycles, trace, json, engine }) => {
            run_program(&program, max_cycles, trace, json, engine.into());
        }
        Some(Commands::Debug { program, engine }) => {
            debug_program(&program, engine.into());
        }
        Some(Commands::Asm { source }) => {
            assemble_file(&source);
        }
        Some(Commands::Disasm { source, addi }) => {
            disassemble_file(&source, CpuConfig { addi, ..CpuConfig::default() });
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("cpu8 Emulator v0.1.0");
            println!("An 8-bit CPU with 16 bytes of memory");
            println!();
            println!("Use --help for available commands");
            println!();
            demo_add_program();
        }
    }
}

/// Read and assemble a source file, exiting on failure.
fn load_source(path: &str) -> Vec<u8> {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    match cpu8::assemble(&source) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("❌ Assembly error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_program(path: &str, max_cycles: u64, trace: bool, json: bool, config: CpuConfig) {
    use cpu8::asm::disasm::disassemble_instruction;
    use cpu8::bits::{format_byte, format_nibble};

    let image = load_source(path);
    if !json {
        println!("🔧 Running: {}", path);
        println!("📝 Assembled {} bytes", image.len());
    }

    let mut cpu = Cpu::with_config(config);
    if let Err(e) = cpu.load_program(&image) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }

    if !json {
        println!();
        println!("━━━ Execution ━━━");
    }

    let mut cycles = 0u64;
    while cpu.is_running() && cycles < max_cycles {
        let iar = cpu.regs.iar.value();

        match cpu.step() {
            Ok(instr) => {
                if trace && !json {
                    let disasm = disassemble_instruction(cpu8::cpu::decode::encode(&instr), cpu.config());
                    let f = cpu.regs.flags;
                    println!("{:02}: {:<10} A={:>3} B={:>3} Z={} N={} O={}",
                        iar, disasm, cpu.regs.a, cpu.regs.b, f.z as u8, f.n as u8, f.o as u8);
                }
                cycles += 1;
            }
            Err(e) => {
                eprintln!("❌ CPU error at IAR={}: {}", iar, e);
                std::process::exit(1);
            }
        }
    }

    if json {
        match serde_json::to_string_pretty(&cpu.snapshot()) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("❌ Failed to serialize state: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let f = cpu.regs.flags;
    println!();
    println!("━━━ Result ━━━");
    println!("Cycles: {}", cycles);
    println!("State:  {:?}", cpu.state);
    println!("A:      {} ({})", format_byte(cpu.regs.a), cpu.regs.a);
    println!("B:      {} ({})", format_byte(cpu.regs.b), cpu.regs.b);
    println!("IAR:    {} ({})", format_nibble(cpu.regs.iar), cpu.regs.iar.value());
    println!("Flags:  Z={} N={} O={}", f.z, f.n, f.o);
    println!();
    println!("{:?}", cpu.mem);

    if cycles >= max_cycles && cpu.is_running() {
        println!();
        println!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, config: CpuConfig) {
    let image = load_source(path);

    println!("🔍 Loaded {} bytes from {}", image.len(), path);
    println!("🚀 Launching debugger...");
    println!();

    if let Err(e) = cpu8::run_debugger(image, config) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str, _config: CpuConfig) {
    eprintln!("❌ Debugger not available: built without the `tui` feature");
    std::process::exit(1);
}

fn assemble_file(source_path: &str) {
    use cpu8::bits::format_byte;

    let image = load_source(source_path);
    for (addr, byte) in image.iter().enumerate() {
        println!("{:02}: {} {}", addr, &format_byte(*byte)[..4], &format_byte(*byte)[4..]);
    }
}

fn disassemble_file(source_path: &str, config: CpuConfig) {
    let image = load_source(source_path);
    println!("{}", cpu8::disassemble(&image, &config));
}

fn demo_add_program() {
    use cpu8::asm::disasm::disassemble_instruction;

    println!("━━━ Demo: 10 + 5 ━━━");
    println!();

    let mut cpu = Cpu::new();
    let program = [
        "00101110", // LOAD_B 14
        "00011111", // LOAD_A 15
        "01011001", // ADD
        "11110000", // HALT
    ];
    for (addr, bits) in program.iter().enumerate() {
        if let Err(e) = cpu.write_memory_bits(addr, bits) {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
    for (addr, bits) in [(14, "00000101"), (15, "00001010")] {
        if let Err(e) = cpu.write_memory_bits(addr, bits) {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }

    println!("Memory before:");
    println!("{:?}", cpu.mem);
    println!();

    while cpu.is_running() {
        let iar = cpu.regs.iar.value();
        match cpu.step() {
            Ok(instr) => {
                let raw = cpu8::cpu::decode::encode(&instr);
                println!("  {:02}: {:<8} A={:>3} B={:>3}",
                    iar, disassemble_instruction(raw, cpu.config()), cpu.regs.a, cpu.regs.b);
            }
            Err(e) => {
                eprintln!("❌ CPU error at IAR={}: {}", iar, e);
                std::process::exit(1);
            }
        }
    }

    println!();
    println!("✓ Halted with A = {} after {} cycles", cpu.regs.a, cpu.cycles);
}

fn run_self_test() {
    use cpu8::bits::alu;
    use cpu8::CpuError;

    println!("━━━ cpu8 Emulator Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut check = |name: &str, ok: bool| {
        if ok {
            println!("{}... ✓", name);
            passed += 1;
        } else {
            println!("{}... ✗", name);
            failed += 1;
        }
    };

    // ALU overflow
    let r = alu::add(127, 1);
    check("ADD 127 + 1 overflows", r.value == 128 && r.overflow && r.negative && !r.zero);
    let r = alu::subtract(0, 1);
    check("SUB 0 - 1 wraps to 255", r.value == 255 && !r.overflow && r.negative);

    // Memory bounds
    let cpu = Cpu::new();
    check("Out-of-range read rejected", cpu.read_memory(16).is_err());

    // Single cycle
    let mut cpu = Cpu::new();
    let ok = cpu.write_memory_bits(0, "00010101").is_ok()
        && cpu.write_memory(5, 3).is_ok()
        && cpu.step().is_ok();
    check("LOAD_A single cycle",
        ok && cpu.regs.a == 3 && cpu.regs.iar.value() == 1 && !cpu.regs.flags.z);

    // Whole program
    let mut cpu = Cpu::new();
    let ok = cpu.load_program(&[0b0010_1110, 0b0001_1111, 0b0101_1001, 0b1111_0000]).is_ok()
        && cpu.write_memory(14, 5).is_ok()
        && cpu.write_memory(15, 10).is_ok()
        && cpu.run().is_ok();
    check("LOAD/ADD/HALT program",
        ok && cpu.regs.a == 15 && cpu.regs.b == 5 && cpu.regs.iar.value() == 3 && cpu.is_halted());

    // Halted engine refuses work
    check("Fetch refused after HALT", matches!(cpu.fetch(), Err(CpuError::NotRunning(_))));

    // Jump suppresses increment
    let mut cpu = Cpu::new();
    let ok = cpu.write_memory(0, 0b0111_1010).is_ok() && cpu.step().is_ok();
    check("JUMP suppresses increment", ok && cpu.regs.iar.value() == 10 && !cpu.jump_pending());

    // Unknown opcode
    let mut cpu = Cpu::new();
    let ok = cpu.write_memory(0, 0b1011_0000).is_ok();
    check("Unknown opcode faults",
        ok && matches!(cpu.step(), Err(CpuError::UnknownOpcode(_))) && cpu.is_faulted());

    // Reset
    cpu.reset(false);
    check("Reset keeps memory", cpu.read_memory(0) == Ok(0b1011_0000) && cpu.is_running());
    cpu.reset(true);
    check("Full reset clears memory", cpu.read_memory(0) == Ok(0));

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
