//! Bitwise logic unit.
//!
//! Pure functions over bytes. NAND and NOR are built from the primitive
//! gates rather than computed directly.

use serde::{Serialize, Deserialize};
use std::fmt;

/// Stateless bitwise logic unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogicUnit;

impl LogicUnit {
    #[inline]
    pub fn and(a: u8, b: u8) -> u8 {
        a & b
    }

    #[inline]
    pub fn or(a: u8, b: u8) -> u8 {
        a | b
    }

    #[inline]
    pub fn xor(a: u8, b: u8) -> u8 {
        a ^ b
    }

    /// Bitwise complement within the byte.
    #[inline]
    pub fn not(a: u8) -> u8 {
        !a
    }

    #[inline]
    pub fn nand(a: u8, b: u8) -> u8 {
        Self::not(Self::and(a, b))
    }

    #[inline]
    pub fn nor(a: u8, b: u8) -> u8 {
        Self::not(Self::or(a, b))
    }

    /// Apply a two-input gate.
    pub fn apply(self, gate: Gate, a: u8, b: u8) -> u8 {
        match gate {
            Gate::And => Self::and(a, b),
            Gate::Or => Self::or(a, b),
            Gate::Nand => Self::nand(a, b),
            Gate::Nor => Self::nor(a, b),
            Gate::Xor => Self::xor(a, b),
        }
    }
}

/// Two-input gates reachable from the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gate {
    And,
    Or,
    Nand,
    Nor,
    Xor,
}

impl Gate {
    /// Mnemonic as written in source.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Gate::And => "AND",
            Gate::Or => "OR",
            Gate::Nand => "NAND",
            Gate::Nor => "NOR",
            Gate::Xor => "XOR",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
