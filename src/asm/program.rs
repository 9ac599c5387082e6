//! Whole-program loading.
//!
//! Source format:
//! ```text
//! ; Comment
//! INIT [00] = 00000101   ; trailing comments are fine
//! LOAD R0 [00]
//!
//! ADD R0 R0 R1
//! OUT R1
//! HALT
//! ```
//!
//! Every line is decoded before anything runs, so a typo on the last line
//! is reported without side effects. Line numbers are 1-based.

use crate::cpu::decode::{self, DecodeError, Instruction, DEFAULT_MAX_NESTING};
use crate::cpu::{Console, Cpu, CpuError, CpuState};
use std::path::Path;
use thiserror::Error;

/// One decoded source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramLine {
    /// 1-based line number in the source.
    pub number: usize,
    pub instruction: Instruction,
}

/// A parsed program. Blank and comment-only lines are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    lines: Vec<ProgramLine>,
}

impl Program {
    /// Parse source text with the default nesting limit.
    pub fn parse(source: &str) -> Result<Self, ProgramError> {
        Self::parse_with_limit(source, DEFAULT_MAX_NESTING)
    }

    pub fn parse_with_limit(source: &str, max_nesting: usize) -> Result<Self, ProgramError> {
        let mut lines = Vec::new();

        for (idx, text) in source.lines().enumerate() {
            let number = idx + 1;
            let decoded = decode::decode_with_limit(text, max_nesting)
                .map_err(|source| ProgramError::Decode { line: number, source })?;
            if let Some(instruction) = decoded {
                lines.push(ProgramLine { number, instruction });
            }
        }

        Ok(Self { lines })
    }

    /// Read and parse a program file.
    pub fn load<P: AsRef<Path>>(path: P, max_nesting: usize) -> Result<Self, ProgramError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ProgramError::NotFound(path.display().to_string()),
            _ => ProgramError::Io(format!("{}: {}", path.display(), e)),
        })?;
        log::debug!("loaded {} bytes from {}", source.len(), path.display());
        Self::parse_with_limit(&source, max_nesting)
    }

    pub fn lines(&self) -> &[ProgramLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Execute on `cpu` until HALT or the last line.
    ///
    /// Returns the number of instructions executed.
    pub fn run<C: Console>(&self, cpu: &mut Cpu<C>) -> Result<u64, ProgramError> {
        let start_cycles = cpu.cycles;
        cpu.state = CpuState::Running;

        for line in &self.lines {
            let running = cpu
                .execute_instruction(&line.instruction)
                .map_err(|source| ProgramError::Execution { line: line.number, source })?;
            if !running {
                break;
            }
        }

        Ok(cpu.cycles - start_cycles)
    }
}

/// Errors that can occur while loading or running a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("file '{0}' not found")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("line {line}: {source}")]
    Decode { line: usize, source: DecodeError },

    #[error("line {line}: {source}")]
    Execution { line: usize, source: CpuError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{CpuConfig, Reg, Transcript};

    const DOUBLE: &str = r#"
        ; Double a value
        INIT [00] = 00000101
        LOAD R0 [00]   ; R0 = 5

        ADD R0 R0 R1
        OUT R1
        HALT
        OUT R0
    "#;

    fn cpu() -> Cpu<Transcript> {
        Cpu::with_console(CpuConfig::default(), Transcript::new())
    }

    #[test]
    fn test_parse_keeps_line_numbers() {
        let program = Program::parse(DOUBLE).unwrap();

        assert_eq!(program.len(), 6);
        let numbers: Vec<usize> = program.lines().iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![3, 4, 6, 7, 8, 9]);
        assert_eq!(program.lines()[2].instruction.to_string(), "ADD R0 R0 R1");
    }

    #[test]
    fn test_run_stops_on_halt() {
        let program = Program::parse(DOUBLE).unwrap();
        let mut cpu = cpu();

        let executed = program.run(&mut cpu).unwrap();

        assert_eq!(executed, 5);
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.get(Reg::new(1).unwrap()), 10);
        assert_eq!(cpu.console().outputs(), vec!["00001010"]);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = Program::parse("OUT 1\n\nLOAD R9 [00]\n").unwrap_err();
        match err {
            ProgramError::Decode { line, source } => {
                assert_eq!(line, 3);
                assert_eq!(source.line(), "LOAD R9 [00]");
            }
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_execution_error_reports_line() {
        let program = Program::parse("OUT 1\nLOAD R0 [FFFF]\nOUT 10").unwrap();
        let mut cpu = cpu();

        let err = program.run(&mut cpu).unwrap_err();

        assert!(matches!(err, ProgramError::Execution { line: 2, .. }));
        assert_eq!(cpu.console().outputs(), vec!["00000001"]);
    }

    #[test]
    fn test_demo_programs() {
        let double = Program::parse(include_str!("../../demos/double.asm")).unwrap();
        let mut double_cpu = cpu();
        double.run(&mut double_cpu).unwrap();
        assert_eq!(double_cpu.console().outputs(), vec!["00001010"]);
        assert_eq!(double_cpu.mem.read(1).unwrap(), 10);

        let compare = Program::parse(include_str!("../../demos/compare.asm")).unwrap();
        let mut compare_cpu = cpu();
        compare.run(&mut compare_cpu).unwrap();
        assert!(compare_cpu.is_halted());
        assert_eq!(compare_cpu.console().outputs(), vec!["00010011", "00000011"]);
        assert_eq!(
            compare_cpu.console().traces(),
            vec!["VER: Verbose mode enabled", "IF: R0 >= R1 -> true"]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = Program::load("/definitely/not/here.asm", DEFAULT_MAX_NESTING).unwrap_err();
        assert_eq!(err, ProgramError::NotFound("/definitely/not/here.asm".into()));
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("bytesim-load-{}.asm", std::process::id()));
        std::fs::write(&path, "INIT [01] = 1\nHALT\n").unwrap();

        let program = Program::load(&path, DEFAULT_MAX_NESTING).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(program.len(), 2);
    }
}
