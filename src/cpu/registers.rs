//! General-purpose register file.
//!
//! Eight byte-sized registers, R0 through R7, all zero at power-on.

use serde::{Serialize, Deserialize};
use std::fmt;

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 8;

/// A register reference, `R0`..`R7`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reg(u8);

impl Reg {
    /// Create a register reference.
    ///
    /// Returns `None` for indices past R7.
    pub fn new(index: u8) -> Option<Self> {
        ((index as usize) < REGISTER_COUNT).then_some(Self(index))
    }

    /// Parse a register token of the form `R<digit>`.
    pub fn parse(token: &str) -> Option<Self> {
        let digit = token.strip_prefix('R')?;
        let mut chars = digit.chars();
        let index = chars.next()?.to_digit(10)?;
        if chars.next().is_some() {
            return None;
        }
        Self::new(index as u8)
    }

    /// Zero-based register index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

impl fmt::Debug for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// The register file.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    values: [u8; REGISTER_COUNT],
}

impl Registers {
    /// Create a register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a register.
    #[inline]
    pub fn get(&self, reg: Reg) -> u8 {
        self.values[reg.index()]
    }

    /// Write a register.
    #[inline]
    pub fn set(&mut self, reg: Reg, value: u8) {
        self.values[reg.index()] = value;
    }

    /// All register values, R0 first.
    pub fn values(&self) -> &[u8; REGISTER_COUNT] {
        &self.values
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        self.values = [0; REGISTER_COUNT];
    }
}

impl fmt::Debug for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_map();
        for (i, value) in self.values.iter().enumerate() {
            list.entry(&format_args!("R{}", i), &format_args!("{:08b}", value));
        }
        list.finish()
    }
}
