//! Byte-addressable main memory.
//!
//! A fixed number of 8-bit cells, allocated once and never resized.
//! Every access is bounds-checked and every write is checked against
//! the byte domain.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Default number of memory cells.
pub const DEFAULT_MEMORY_SIZE: usize = 256;

/// Fixed-size byte memory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Create a memory of `size` zeroed cells.
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![0; size],
        }
    }

    /// Number of cells.
    #[inline]
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Read a cell.
    pub fn read(&self, addr: usize) -> Result<u8, MemoryError> {
        self.cells
            .get(addr)
            .copied()
            .ok_or(MemoryError::OutOfBoundsAddress { address: addr, size: self.size() })
    }

    /// Write a cell.
    ///
    /// The value is taken wider than a byte so that literals outside
    /// `0..=255` are rejected here rather than silently truncated.
    pub fn write(&mut self, addr: usize, value: u32) -> Result<(), MemoryError> {
        let size = self.size();
        let cell = self
            .cells
            .get_mut(addr)
            .ok_or(MemoryError::OutOfBoundsAddress { address: addr, size })?;
        *cell = u8::try_from(value).map_err(|_| MemoryError::InvalidByteValue(value))?;
        Ok(())
    }

    /// Zero every cell.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = 0);
    }

    /// Render `[start, min(start + length, size))` as 8-digit binary strings.
    ///
    /// A `start` past the end yields an empty dump.
    pub fn dump(&self, start: usize, length: usize) -> Vec<String> {
        let end = start.saturating_add(length).min(self.size());
        let start = start.min(end);
        self.cells[start..end]
            .iter()
            .map(|cell| format!("{:08b}", cell))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|cell| **cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.size())
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Address is outside `[0, size)`.
    #[error("address {address} is out of bounds (memory size {size})")]
    OutOfBoundsAddress { address: usize, size: usize },
    /// Value does not fit in a byte.
    #[error("invalid value: {0}, must be an 8-bit integer")]
    InvalidByteValue(u32),
}
