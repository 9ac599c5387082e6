//! # bytesim
//!
//! A minimal 8-bit computer: a fixed-size byte-addressable memory, eight
//! general-purpose byte registers, a bitwise logic unit and an interpreter
//! for a small line-oriented assembly language with single-instruction
//! IF/THEN/ELSE.

pub mod cpu;
pub mod asm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuConfig, CpuError, CpuState, ErrorKind, Memory, MemoryError, Registers, Reg, Instruction};
pub use cpu::{Console, StdConsole, Transcript};
pub use asm::{listing, Program, ProgramError};
