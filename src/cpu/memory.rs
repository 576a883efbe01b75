//! Main memory: sixteen 8-bit cells.
//!
//! Addresses are 4 bits wide, so the whole memory is reachable from an
//! instruction's operand field and from the IAR.

use crate::bits::{self, BitsError};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of memory cells.
pub const MEMORY_SIZE: usize = 16;

/// Main memory: 16 eight-bit cells.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: [u8; MEMORY_SIZE],
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: [0; MEMORY_SIZE],
        }
    }

    /// Read a cell by address (0-15).
    #[inline]
    pub fn read(&self, addr: usize) -> Result<u8, MemoryError> {
        self.cells
            .get(addr)
            .copied()
            .ok_or(MemoryError::InvalidAddress(addr))
    }

    /// Write a cell by address (0-15). Out-of-range writes change nothing.
    #[inline]
    pub fn write(&mut self, addr: usize, value: u8) -> Result<(), MemoryError> {
        let cell = self.cells
            .get_mut(addr)
            .ok_or(MemoryError::InvalidAddress(addr))?;
        *cell = value;
        Ok(())
    }

    /// Write a cell from its 8-character binary form.
    ///
    /// The address is checked before the value, so a bad address wins.
    pub fn write_bits(&mut self, addr: usize, bits: &str) -> Result<(), MemoryError> {
        if addr >= MEMORY_SIZE {
            return Err(MemoryError::InvalidAddress(addr));
        }
        let value = bits::parse_byte(bits)?;
        self.write(addr, value)
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells = [0; MEMORY_SIZE];
    }

    /// Load a program into memory starting at the given address.
    pub fn load_program(&mut self, start_addr: usize, program: &[u8]) -> Result<(), MemoryError> {
        if start_addr > MEMORY_SIZE {
            return Err(MemoryError::InvalidAddress(start_addr));
        }
        let available = MEMORY_SIZE - start_addr;
        if program.len() > available {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available,
            });
        }

        self.cells[start_addr..start_addr + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// All cells, address 0 first.
    pub fn cells(&self) -> &[u8; MEMORY_SIZE] {
        &self.cells
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u8)> {
        let end = start.saturating_add(count).min(MEMORY_SIZE);
        (start.min(end)..end)
            .map(|i| (i, self.cells[i]))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&c| c != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory address {0} out of range (0-15)")]
    InvalidAddress(usize),

    #[error("invalid operand: {0}")]
    InvalidOperand(#[from] BitsError),

    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        mem.write(10, 42).unwrap();
        assert_eq!(mem.read(10), Ok(42));
    }

    #[test]
    fn test_memory_bounds() {
        let mut mem = Memory::new();

        assert!(mem.read(0).is_ok());
        assert!(mem.read(15).is_ok());

        assert_eq!(mem.read(16), Err(MemoryError::InvalidAddress(16)));
        assert_eq!(mem.write(16, 1), Err(MemoryError::InvalidAddress(16)));
        assert_eq!(mem.write(usize::MAX, 1), Err(MemoryError::InvalidAddress(usize::MAX)));
        assert!(mem.cells().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_write_bits() {
        let mut mem = Memory::new();
        mem.write_bits(5, "00000011").unwrap();
        assert_eq!(mem.read(5), Ok(3));

        assert!(matches!(
            mem.write_bits(5, "0000001"),
            Err(MemoryError::InvalidOperand(_))
        ));
        assert_eq!(mem.read(5), Ok(3));

        assert_eq!(mem.write_bits(20, "bogus"), Err(MemoryError::InvalidAddress(20)));
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new();
        mem.load_program(0, &[1, 2, 3]).unwrap();

        assert_eq!(mem.read(0), Ok(1));
        assert_eq!(mem.read(1), Ok(2));
        assert_eq!(mem.read(2), Ok(3));
    }

    #[test]
    fn test_load_program_too_large() {
        let mut mem = Memory::new();
        let err = mem.load_program(10, &[0; 7]).unwrap_err();
        assert_eq!(err, MemoryError::ProgramTooLarge { size: 7, available: 6 });
        assert_eq!(mem.load_program(20, &[]), Err(MemoryError::InvalidAddress(20)));
    }

    #[test]
    fn test_clear() {
        let mut mem = Memory::new();
        mem.load_program(0, &[0xFF; MEMORY_SIZE]).unwrap();
        mem.clear();
        assert_eq!(mem, Memory::new());
    }
}
