//! Interpreter core.
//!
//! Decodes a line, walks any IF chain down to the single clause that
//! should run, and applies it to registers and memory.

use crate::cpu::console::{Console, StdConsole};
use crate::cpu::decode::{self, Condition, DecodeError, Instruction, Operand, DEFAULT_MAX_NESTING};
use crate::cpu::logic::LogicUnit;
use crate::cpu::memory::{MemoryError, DEFAULT_MEMORY_SIZE};
use crate::cpu::{Memory, Registers};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Emit trace text through the console when the verbosity flag is set.
macro_rules! verbose {
    ($cpu:expr, $($arg:tt)*) => {
        if $cpu.verbose {
            let text = format!($($arg)*);
            $cpu.console.trace(&text);
        }
    };
}

/// Run state for one call to [`Cpu::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    Running,
    /// A HALT instruction was executed.
    Halted,
}

/// Construction-time settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuConfig {
    /// Number of memory cells.
    pub memory_size: usize,
    /// Deepest IF nesting accepted on one line.
    pub max_nesting: usize,
    /// Initial value of the verbosity flag.
    pub verbose: bool,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            max_nesting: DEFAULT_MAX_NESTING,
            verbose: false,
        }
    }
}

/// Serializable view of the machine for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    pub registers: Registers,
    pub verbose: bool,
    pub memory: Memory,
}

/// The CPU: registers, memory and the instruction interpreter.
pub struct Cpu<C: Console = StdConsole> {
    /// General-purpose registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Per-instruction trace on or off. Set by VER.
    pub verbose: bool,
    /// Run state of the current or most recent [`Cpu::run`].
    pub state: CpuState,
    /// Instructions executed since construction or reset.
    pub cycles: u64,
    logic: LogicUnit,
    max_nesting: usize,
    console: C,
}

impl Cpu<StdConsole> {
    /// Create a CPU that prints to standard output.
    pub fn new(config: CpuConfig) -> Self {
        Self::with_console(config, StdConsole)
    }
}

impl<C: Console> Cpu<C> {
    /// Create a CPU that prints to `console`.
    pub fn with_console(config: CpuConfig, console: C) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(config.memory_size),
            verbose: config.verbose,
            state: CpuState::Running,
            cycles: 0,
            logic: LogicUnit,
            max_nesting: config.max_nesting,
            console,
        }
    }

    /// Zero registers and memory. The verbosity flag is left as is.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn max_nesting(&self) -> usize {
        self.max_nesting
    }

    /// Parse and execute one line.
    ///
    /// Returns `Ok(false)` only when the executed instruction was HALT.
    /// Blank and comment-only lines are a no-op returning `Ok(true)`.
    pub fn execute(&mut self, line: &str) -> Result<bool, CpuError> {
        match decode::decode_with_limit(line, self.max_nesting)? {
            Some(instr) => self.execute_instruction(&instr),
            None => Ok(true),
        }
    }

    /// Execute an already decoded instruction.
    pub fn execute_instruction(&mut self, instr: &Instruction) -> Result<bool, CpuError> {
        log::debug!("execute: {}", instr);
        self.cycles += 1;

        let mut current = instr;
        loop {
            match current {
                Instruction::If { cond, then, otherwise } => {
                    let taken = self.evaluate(cond)?;
                    verbose!(self, "IF: {} -> {}", cond, taken);
                    current = match (taken, otherwise) {
                        (true, _) => &**then,
                        (false, Some(otherwise)) => &**otherwise,
                        (false, None) => return Ok(true),
                    };
                }

                Instruction::Load { dst, addr } => {
                    let value = self.mem.read(addr.0)?;
                    self.regs.set(*dst, value);
                    verbose!(self, "LOAD: Loaded {} = {:08b}", dst, value);
                    return Ok(true);
                }

                Instruction::Store { src, addr } => {
                    let value = self.regs.get(*src);
                    self.mem.write(addr.0, value as u32)?;
                    verbose!(self, "STORE: {} stored at {} -> {:08b}", src, addr, value);
                    return Ok(true);
                }

                Instruction::Init { addr, value } => {
                    self.mem.write(addr.0, *value)?;
                    verbose!(self, "INIT: Set memory {} to {:08b} (binary)", addr, value);
                    return Ok(true);
                }

                Instruction::ClearRegister(reg) => {
                    // No trace for the register form, even when verbose.
                    self.regs.set(*reg, 0);
                    return Ok(true);
                }

                Instruction::ClearMemory(addr) => {
                    self.mem.write(addr.0, 0)?;
                    verbose!(self, "CLEAR: Cleared memory at {}", addr);
                    return Ok(true);
                }

                Instruction::Add { a, b, dst } => {
                    let sum = self.regs.get(*a).wrapping_add(self.regs.get(*b));
                    self.regs.set(*dst, sum);
                    verbose!(self, "ADD: {} + {} = {} -> {:08b}", a, b, dst, sum);
                    return Ok(true);
                }

                Instruction::Logic { gate, a, b, dst } => {
                    let result = self.logic.apply(*gate, self.regs.get(*a), self.regs.get(*b));
                    self.regs.set(*dst, result);
                    verbose!(self, "{}: {} {} {} = {} -> {:08b}", gate, a, gate, b, dst, result);
                    return Ok(true);
                }

                Instruction::Not { src, dst } => {
                    let result = LogicUnit::not(self.regs.get(*src));
                    self.regs.set(*dst, result);
                    verbose!(self, "NOT: {} -> {} -> {:08b}", src, dst, result);
                    return Ok(true);
                }

                Instruction::Out(operand) => {
                    let value = self.operand_value(operand)?;
                    self.console.out(&format!("{:08b}", value));
                    return Ok(true);
                }

                Instruction::Ver { enabled, .. } => {
                    self.verbose = *enabled;
                    verbose!(self, "VER: Verbose mode enabled");
                    return Ok(true);
                }

                Instruction::Halt => {
                    self.state = CpuState::Halted;
                    return Ok(false);
                }
            }
        }
    }

    /// Execute lines in order until HALT or the end of the program.
    ///
    /// Returns the number of instructions executed. The first error aborts
    /// the rest of the program.
    pub fn run<S: AsRef<str>>(&mut self, program: &[S]) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        self.state = CpuState::Running;

        for line in program {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            if !self.execute(line)? {
                break;
            }
        }

        Ok(self.cycles - start_cycles)
    }

    /// Check if the last run stopped on HALT.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Copy the machine state for display or serialization.
    pub fn snapshot(&self) -> MachineState {
        MachineState {
            registers: self.regs.clone(),
            verbose: self.verbose,
            memory: self.mem.clone(),
        }
    }

    fn evaluate(&self, cond: &Condition) -> Result<bool, CpuError> {
        let lhs = self.regs.get(cond.lhs);
        let rhs = self.operand_value(&cond.rhs)?;
        Ok(cond.op.evaluate(lhs, rhs))
    }

    fn operand_value(&self, operand: &Operand) -> Result<u8, CpuError> {
        Ok(match operand {
            Operand::Register(reg) => self.regs.get(*reg),
            Operand::Memory(addr) => self.mem.read(addr.0)?,
            Operand::Immediate(value) => *value,
        })
    }
}

impl Default for Cpu<StdConsole> {
    fn default() -> Self {
        Self::new(CpuConfig::default())
    }
}

impl<C: Console> std::fmt::Debug for Cpu<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("verbose", &self.verbose)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("mem", &self.mem)
            .finish()
    }
}

/// The failure categories an instruction can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    OutOfBoundsAddress,
    InvalidByteValue,
    MalformedInstruction,
    UnknownOpcode,
    InvalidCondition,
}

/// Errors that can occur during execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl CpuError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CpuError::Memory(MemoryError::OutOfBoundsAddress { .. }) => ErrorKind::OutOfBoundsAddress,
            CpuError::Memory(MemoryError::InvalidByteValue(_)) => ErrorKind::InvalidByteValue,
            CpuError::Decode(DecodeError::InvalidByteValue { .. }) => ErrorKind::InvalidByteValue,
            CpuError::Decode(DecodeError::UnknownOpcode { .. }) => ErrorKind::UnknownOpcode,
            CpuError::Decode(DecodeError::InvalidCondition { .. }) => ErrorKind::InvalidCondition,
            CpuError::Decode(DecodeError::MalformedInstruction { .. })
            | CpuError::Decode(DecodeError::NestingTooDeep { .. }) => ErrorKind::MalformedInstruction,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::cpu::console::Transcript;
    use crate::cpu::registers::Reg;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn add_wraps_modulo_256(x in any::<u8>(), y in any::<u8>()) {
            let mut cpu = Cpu::with_console(CpuConfig::default(), Transcript::new());
            cpu.regs.set(Reg::new(0).unwrap(), x);
            cpu.regs.set(Reg::new(1).unwrap(), y);

            cpu.execute("ADD R0 R1 R2").unwrap();

            let expected = ((x as u16 + y as u16) % 256) as u8;
            prop_assert_eq!(cpu.regs.get(Reg::new(2).unwrap()), expected);
        }

        #[test]
        fn if_runs_exactly_one_clause(x in any::<u8>(), y in any::<u8>()) {
            let mut cpu = Cpu::with_console(CpuConfig::default(), Transcript::new());
            cpu.regs.set(Reg::new(0).unwrap(), x);
            cpu.regs.set(Reg::new(1).unwrap(), y);

            cpu.execute("IF R0 < R1 THEN OUT 1 ELSE OUT 0").unwrap();

            let expected = if x < y { "00000001" } else { "00000000" };
            prop_assert_eq!(cpu.console().outputs(), vec![expected]);
        }

        #[test]
        fn random_lines_never_panic(line in "[A-Z0-9\\[\\]=<>! ;]{0,40}") {
            let mut cpu = Cpu::with_console(CpuConfig::default(), Transcript::new());
            let _ = cpu.execute(&line);
        }
    }
}
