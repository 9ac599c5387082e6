//! CPU emulation for the 8-bit machine.
//!
//! - `memory`: fixed-size byte store (256 cells by default)
//! - `registers`: eight byte registers, R0-R7
//! - `logic`: bitwise logic unit
//! - `decode`: line-oriented assembly to [`Instruction`] trees
//! - `execute`: the interpreter that runs them
//! - `console`: where OUT values and trace text go

pub mod memory;
pub mod registers;
pub mod logic;
pub mod decode;
pub mod execute;
pub mod console;

pub use memory::{Memory, MemoryError};
pub use registers::{Reg, Registers};
pub use logic::{Gate, LogicUnit};
pub use decode::{decode, Instruction, Opcode, Operand, DecodeError};
pub use execute::{Cpu, CpuConfig, CpuError, CpuState, ErrorKind, MachineState};
pub use console::{Console, ConsoleLine, StdConsole, Transcript};
