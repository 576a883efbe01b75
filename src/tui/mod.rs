//! TUI debugger for the cpu8 emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and flag view, with the instruction register split in two
//! - Memory view in binary and decimal
//! - Phase-by-phase stepping, whole-instruction stepping, run and breakpoints
//! - Disassembly view

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
