//! Engine options.

use serde::{Serialize, Deserialize};

/// Options that change how the engine decodes and executes.
///
/// The default is the canonical machine: eleven instructions, and loads
/// that leave the flags alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuConfig {
    /// Decode opcode `1010` as `ADDI` (add a 4-bit immediate to A).
    /// When off, `1010` is an unknown opcode.
    pub addi: bool,

    /// Update Z and N from the loaded value on `LOAD_A` / `LOAD_B`,
    /// as earlier revisions of the machine did.
    pub flags_on_load: bool,
}

impl CpuConfig {
    /// Every optional behaviour switched on.
    pub fn extended() -> Self {
        Self {
            addi: true,
            flags_on_load: true,
        }
    }
}
