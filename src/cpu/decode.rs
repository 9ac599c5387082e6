//! Instruction decoder.
//!
//! Turns one line of assembly text into an [`Instruction`] tree. Each line
//! is parsed exactly once; conditionals hold their clauses as owned
//! sub-instructions, so nesting depth is a property of the tree and is
//! checked here rather than discovered on the call stack at run time.
//!
//! Grammar (opcodes are case-sensitive, `;` starts a comment):
//! ```text
//! LOAD  Rd [addr]             STORE Rs [addr]
//! INIT  [addr] = 00000101     CLEAR [addr] | CLEAR Rd
//! ADD   Ra Rb Rd              AND/OR/NAND/NOR/XOR Ra Rb Rd
//! NOT   Rs Rd                 OUT Rd | OUT 00001010
//! VER   <tag> 0|1             HALT
//! IF Ra <op> <operand> THEN <instr> [ELSE <instr>]
//! ```

use crate::cpu::logic::Gate;
use crate::cpu::registers::Reg;
use serde::{Serialize, Deserialize};
use std::fmt;
use thiserror::Error;

/// Default limit on how many IFs may nest inside one line.
pub const DEFAULT_MAX_NESTING: usize = 16;

/// Closed set of opcodes, resolved once from the mnemonic token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    Load,
    Store,
    Init,
    Clear,
    Add,
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Not,
    Out,
    Ver,
    Halt,
    If,
}

impl Opcode {
    /// Every opcode, in listing order.
    pub const ALL: [Opcode; 15] = [
        Opcode::Load,
        Opcode::Store,
        Opcode::Init,
        Opcode::Clear,
        Opcode::Add,
        Opcode::And,
        Opcode::Or,
        Opcode::Nand,
        Opcode::Nor,
        Opcode::Xor,
        Opcode::Not,
        Opcode::Out,
        Opcode::Ver,
        Opcode::Halt,
        Opcode::If,
    ];

    /// Resolve a mnemonic. Case-sensitive.
    pub fn from_mnemonic(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.mnemonic() == token)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Init => "INIT",
            Opcode::Clear => "CLEAR",
            Opcode::Add => "ADD",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Nand => "NAND",
            Opcode::Nor => "NOR",
            Opcode::Xor => "XOR",
            Opcode::Not => "NOT",
            Opcode::Out => "OUT",
            Opcode::Ver => "VER",
            Opcode::Halt => "HALT",
            Opcode::If => "IF",
        }
    }
}

/// A bracketed memory address, `[hex]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub usize);

impl Address {
    /// Parse `[<hex>]`.
    ///
    /// Hex too wide for `usize` saturates, so it fails later as out of bounds.
    pub fn parse(token: &str) -> Option<Self> {
        let hex = token.strip_prefix('[')?.strip_suffix(']')?;
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Address(usize::from_str_radix(hex, 16).unwrap_or(usize::MAX)))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:02X}]", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A value source: register, memory cell, or immediate byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Register(Reg),
    Memory(Address),
    Immediate(u8),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(reg) => write!(f, "{}", reg),
            Operand::Memory(addr) => write!(f, "{}", addr),
            Operand::Immediate(value) => write!(f, "{:08b}", value),
        }
    }
}

/// Comparison operators allowed in an IF condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CompareOp {
    pub fn from_symbol(token: &str) -> Option<Self> {
        Some(match token {
            "==" => CompareOp::Eq,
            "!=" => CompareOp::Ne,
            ">" => CompareOp::Gt,
            "<" => CompareOp::Lt,
            ">=" => CompareOp::Ge,
            "<=" => CompareOp::Le,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
        }
    }

    /// Compare two byte values.
    pub fn evaluate(self, lhs: u8, rhs: u8) -> bool {
        match self {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Le => lhs <= rhs,
        }
    }
}

/// The `Ra <op> <operand>` part of an IF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub lhs: Reg,
    pub op: CompareOp,
    pub rhs: Operand,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op.symbol(), self.rhs)
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Rd := mem[addr]
    Load { dst: Reg, addr: Address },

    /// mem[addr] := Rs
    Store { src: Reg, addr: Address },

    /// mem[addr] := value
    ///
    /// The literal is kept unchecked; memory rejects values above 255.
    Init { addr: Address, value: u32 },

    /// Rd := 0, silently
    ClearRegister(Reg),

    /// mem[addr] := 0
    ClearMemory(Address),

    /// Rd := (Ra + Rb) mod 256
    Add { a: Reg, b: Reg, dst: Reg },

    /// Rd := gate(Ra, Rb)
    Logic { gate: Gate, a: Reg, b: Reg, dst: Reg },

    /// Rd := !Rs
    Not { src: Reg, dst: Reg },

    /// Emit a register or immediate as 8 binary digits.
    Out(Operand),

    /// Set the verbosity flag. `tag` is the ignored middle token.
    Ver { tag: String, enabled: bool },

    Halt,

    /// Execute exactly one of the clauses.
    If {
        cond: Condition,
        then: Box<Instruction>,
        otherwise: Option<Box<Instruction>>,
    },
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Load { .. } => Opcode::Load,
            Instruction::Store { .. } => Opcode::Store,
            Instruction::Init { .. } => Opcode::Init,
            Instruction::ClearRegister(_) | Instruction::ClearMemory(_) => Opcode::Clear,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Logic { gate, .. } => match gate {
                Gate::And => Opcode::And,
                Gate::Or => Opcode::Or,
                Gate::Nand => Opcode::Nand,
                Gate::Nor => Opcode::Nor,
                Gate::Xor => Opcode::Xor,
            },
            Instruction::Not { .. } => Opcode::Not,
            Instruction::Out(_) => Opcode::Out,
            Instruction::Ver { .. } => Opcode::Ver,
            Instruction::Halt => Opcode::Halt,
            Instruction::If { .. } => Opcode::If,
        }
    }

    /// Number of IFs on the deepest path through this instruction.
    pub fn nesting_depth(&self) -> usize {
        match self {
            Instruction::If { then, otherwise, .. } => {
                let else_depth = otherwise.as_ref().map_or(0, |i| i.nesting_depth());
                1 + then.nesting_depth().max(else_depth)
            }
            _ => 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Load { dst, addr } => write!(f, "LOAD {} {}", dst, addr),
            Instruction::Store { src, addr } => write!(f, "STORE {} {}", src, addr),
            Instruction::Init { addr, value } => write!(f, "INIT {} = {:08b}", addr, value),
            Instruction::ClearRegister(reg) => write!(f, "CLEAR {}", reg),
            Instruction::ClearMemory(addr) => write!(f, "CLEAR {}", addr),
            Instruction::Add { a, b, dst } => write!(f, "ADD {} {} {}", a, b, dst),
            Instruction::Logic { gate, a, b, dst } => write!(f, "{} {} {} {}", gate, a, b, dst),
            Instruction::Not { src, dst } => write!(f, "NOT {} {}", src, dst),
            Instruction::Out(operand) => write!(f, "OUT {}", operand),
            Instruction::Ver { tag, enabled } => write!(f, "VER {} {}", tag, u8::from(*enabled)),
            Instruction::Halt => write!(f, "HALT"),
            Instruction::If { cond, then, otherwise } => {
                write!(f, "IF {} THEN {}", cond, then)?;
                if let Some(otherwise) = otherwise {
                    write!(f, " ELSE {}", otherwise)?;
                }
                Ok(())
            }
        }
    }
}

/// Decode one source line with the default nesting limit.
///
/// Returns `Ok(None)` for blank and comment-only lines.
pub fn decode(line: &str) -> Result<Option<Instruction>, DecodeError> {
    decode_with_limit(line, DEFAULT_MAX_NESTING)
}

/// Decode one source line, allowing at most `max_nesting` nested IFs.
pub fn decode_with_limit(line: &str, max_nesting: usize) -> Result<Option<Instruction>, DecodeError> {
    let code = match line.find(';') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let tokens: Vec<&str> = code.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(None);
    }

    let decoder = Decoder { line: line.trim(), max_nesting };
    decoder.instruction(&tokens, 0).map(Some)
}

/// Per-line decoding context; every error carries the raw line.
struct Decoder<'a> {
    line: &'a str,
    max_nesting: usize,
}

impl<'a> Decoder<'a> {
    fn instruction(&self, tokens: &[&str], depth: usize) -> Result<Instruction, DecodeError> {
        let (&mnemonic, operands) = tokens
            .split_first()
            .ok_or_else(|| self.malformed("empty instruction"))?;
        let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| DecodeError::UnknownOpcode {
            opcode: mnemonic.to_string(),
            line: self.line.to_string(),
        })?;
        log::trace!("decoding {:?} with operands {:?}", opcode, operands);

        let instr = match opcode {
            Opcode::Load => {
                self.expect_operands(opcode, operands, 2)?;
                Instruction::Load {
                    dst: self.register(operands[0])?,
                    addr: self.address(operands[1])?,
                }
            }

            Opcode::Store => {
                self.expect_operands(opcode, operands, 2)?;
                Instruction::Store {
                    src: self.register(operands[0])?,
                    addr: self.address(operands[1])?,
                }
            }

            Opcode::Init => {
                if operands.len() != 3 || operands[1] != "=" {
                    return Err(self.malformed("INIT instruction must be in format INIT [address] = value"));
                }
                Instruction::Init {
                    addr: self.address(operands[0])?,
                    value: self.binary_literal(operands[2])?,
                }
            }

            Opcode::Clear => {
                self.expect_operands(opcode, operands, 1)?;
                match Reg::parse(operands[0]) {
                    Some(reg) => Instruction::ClearRegister(reg),
                    None => Instruction::ClearMemory(self.address(operands[0])?),
                }
            }

            Opcode::Add => {
                self.expect_operands(opcode, operands, 3)?;
                let [a, b, dst] = self.three_registers(operands)?;
                Instruction::Add { a, b, dst }
            }

            Opcode::And => self.logic(Gate::And, opcode, operands)?,
            Opcode::Or => self.logic(Gate::Or, opcode, operands)?,
            Opcode::Nand => self.logic(Gate::Nand, opcode, operands)?,
            Opcode::Nor => self.logic(Gate::Nor, opcode, operands)?,
            Opcode::Xor => self.logic(Gate::Xor, opcode, operands)?,

            Opcode::Not => {
                self.expect_operands(opcode, operands, 2)?;
                Instruction::Not {
                    src: self.register(operands[0])?,
                    dst: self.register(operands[1])?,
                }
            }

            Opcode::Out => {
                self.expect_operands(opcode, operands, 1)?;
                match Reg::parse(operands[0]) {
                    Some(reg) => Instruction::Out(Operand::Register(reg)),
                    None => Instruction::Out(Operand::Immediate(self.byte_literal(operands[0])?)),
                }
            }

            Opcode::Ver => {
                self.expect_operands(opcode, operands, 2)?;
                let enabled = match operands[1] {
                    "0" => false,
                    "1" => true,
                    other => {
                        return Err(self.malformed(&format!("VER expects 0 or 1, got '{}'", other)));
                    }
                };
                Instruction::Ver { tag: operands[0].to_string(), enabled }
            }

            Opcode::Halt => {
                self.expect_operands(opcode, operands, 0)?;
                Instruction::Halt
            }

            Opcode::If => self.conditional(tokens, depth + 1)?,
        };

        Ok(instr)
    }

    /// `tokens` still includes the leading `IF`.
    fn conditional(&self, tokens: &[&str], depth: usize) -> Result<Instruction, DecodeError> {
        if depth > self.max_nesting {
            return Err(DecodeError::NestingTooDeep {
                limit: self.max_nesting,
                line: self.line.to_string(),
            });
        }

        let then_idx = tokens
            .iter()
            .position(|t| *t == "THEN")
            .ok_or_else(|| self.invalid_condition("IF requires a THEN clause"))?;
        let (condition, consequence) = (&tokens[..then_idx], &tokens[then_idx + 1..]);

        if condition.len() != 4 {
            return Err(self.invalid_condition("condition must be 'IF <reg> <op> <operand>'"));
        }
        let lhs = Reg::parse(condition[1])
            .ok_or_else(|| self.invalid_condition(&format!("'{}' is not a register", condition[1])))?;
        let op = CompareOp::from_symbol(condition[2])
            .ok_or_else(|| self.invalid_condition(&format!("unknown operator '{}'", condition[2])))?;
        let rhs = self
            .condition_operand(condition[3])
            .ok_or_else(|| self.invalid_condition(&format!("bad operand '{}'", condition[3])))?;

        let (then_tokens, else_tokens) = match consequence.iter().position(|t| *t == "ELSE") {
            Some(idx) => (&consequence[..idx], Some(&consequence[idx + 1..])),
            None => (consequence, None),
        };
        if then_tokens.is_empty() {
            return Err(self.malformed("THEN clause is empty"));
        }

        let then = Box::new(self.instruction(then_tokens, depth)?);
        let otherwise = match else_tokens {
            Some([]) => return Err(self.malformed("ELSE clause is empty")),
            Some(tokens) => Some(Box::new(self.instruction(tokens, depth)?)),
            None => None,
        };

        Ok(Instruction::If {
            cond: Condition { lhs, op, rhs },
            then,
            otherwise,
        })
    }

    fn logic(&self, gate: Gate, opcode: Opcode, operands: &[&str]) -> Result<Instruction, DecodeError> {
        self.expect_operands(opcode, operands, 3)?;
        let [a, b, dst] = self.three_registers(operands)?;
        Ok(Instruction::Logic { gate, a, b, dst })
    }

    fn condition_operand(&self, token: &str) -> Option<Operand> {
        if let Some(reg) = Reg::parse(token) {
            return Some(Operand::Register(reg));
        }
        if token.starts_with('[') {
            return Address::parse(token).map(Operand::Memory);
        }
        parse_binary(token)
            .and_then(|value| u8::try_from(value).ok())
            .map(Operand::Immediate)
    }

    fn expect_operands(&self, opcode: Opcode, operands: &[&str], count: usize) -> Result<(), DecodeError> {
        if operands.len() != count {
            return Err(self.malformed(&format!(
                "{} instruction must have {} parts",
                opcode.mnemonic(),
                count + 1
            )));
        }
        Ok(())
    }

    fn register(&self, token: &str) -> Result<Reg, DecodeError> {
        Reg::parse(token).ok_or_else(|| self.malformed(&format!("'{}' is not a register (R0-R7)", token)))
    }

    fn three_registers(&self, operands: &[&str]) -> Result<[Reg; 3], DecodeError> {
        Ok([
            self.register(operands[0])?,
            self.register(operands[1])?,
            self.register(operands[2])?,
        ])
    }

    fn address(&self, token: &str) -> Result<Address, DecodeError> {
        Address::parse(token)
            .ok_or_else(|| self.malformed(&format!("'{}' is not a bracketed hex address", token)))
    }

    fn binary_literal(&self, token: &str) -> Result<u32, DecodeError> {
        if token.is_empty() || !token.chars().all(|c| c == '0' || c == '1') {
            return Err(self.malformed(&format!("'{}' is not a binary literal", token)));
        }
        parse_binary(token).ok_or_else(|| DecodeError::InvalidByteValue {
            literal: token.to_string(),
            line: self.line.to_string(),
        })
    }

    fn byte_literal(&self, token: &str) -> Result<u8, DecodeError> {
        let value = self.binary_literal(token)?;
        u8::try_from(value).map_err(|_| DecodeError::InvalidByteValue {
            literal: token.to_string(),
            line: self.line.to_string(),
        })
    }

    fn malformed(&self, reason: &str) -> DecodeError {
        DecodeError::MalformedInstruction {
            reason: reason.to_string(),
            line: self.line.to_string(),
        }
    }

    fn invalid_condition(&self, reason: &str) -> DecodeError {
        DecodeError::InvalidCondition {
            reason: reason.to_string(),
            line: self.line.to_string(),
        }
    }
}

/// Parse a string of `0`/`1` digits. `None` on other characters or overflow.
fn parse_binary(token: &str) -> Option<u32> {
    if token.is_empty() || !token.chars().all(|c| c == '0' || c == '1') {
        return None;
    }
    u32::from_str_radix(token, 2).ok()
}

/// Errors that can occur while decoding a line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed instruction ({reason}): {line}")]
    MalformedInstruction { reason: String, line: String },

    #[error("unknown instruction '{opcode}': {line}")]
    UnknownOpcode { opcode: String, line: String },

    #[error("invalid condition ({reason}): {line}")]
    InvalidCondition { reason: String, line: String },

    #[error("invalid value {literal}, must be an 8-bit integer: {line}")]
    InvalidByteValue { literal: String, line: String },

    #[error("IF nested deeper than {limit} levels: {line}")]
    NestingTooDeep { limit: usize, line: String },
}

impl DecodeError {
    /// The raw source line that failed to decode.
    pub fn line(&self) -> &str {
        match self {
            DecodeError::MalformedInstruction { line, .. }
            | DecodeError::UnknownOpcode { line, .. }
            | DecodeError::InvalidCondition { line, .. }
            | DecodeError::InvalidByteValue { line, .. }
            | DecodeError::NestingTooDeep { line, .. } => line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(i: u8) -> Reg {
        Reg::new(i).unwrap()
    }

    fn decode_ok(line: &str) -> Instruction {
        decode(line).unwrap().unwrap()
    }

    #[test]
    fn test_decode_blank_and_comment() {
        assert_eq!(decode(""), Ok(None));
        assert_eq!(decode("   \t "), Ok(None));
        assert_eq!(decode("; just a comment"), Ok(None));
    }

    #[test]
    fn test_decode_memory_ops() {
        assert_eq!(
            decode_ok("LOAD R0 [0a] ; fetch"),
            Instruction::Load { dst: reg(0), addr: Address(10) }
        );
        assert_eq!(
            decode_ok("STORE R7   [FF]"),
            Instruction::Store { src: reg(7), addr: Address(255) }
        );
        assert_eq!(
            decode_ok("INIT [00] = 00000101"),
            Instruction::Init { addr: Address(0), value: 5 }
        );
        assert_eq!(decode_ok("CLEAR [10]"), Instruction::ClearMemory(Address(16)));
        assert_eq!(decode_ok("CLEAR R2"), Instruction::ClearRegister(reg(2)));
    }

    #[test]
    fn test_decode_alu_ops() {
        assert_eq!(
            decode_ok("ADD R0 R1 R2"),
            Instruction::Add { a: reg(0), b: reg(1), dst: reg(2) }
        );
        assert_eq!(
            decode_ok("NOR R3 R4 R5"),
            Instruction::Logic { gate: Gate::Nor, a: reg(3), b: reg(4), dst: reg(5) }
        );
        assert_eq!(decode_ok("NOT R1 R0"), Instruction::Not { src: reg(1), dst: reg(0) });
    }

    #[test]
    fn test_decode_out_ver_halt() {
        assert_eq!(decode_ok("OUT R1"), Instruction::Out(Operand::Register(reg(1))));
        assert_eq!(decode_ok("OUT 1010"), Instruction::Out(Operand::Immediate(10)));
        assert_eq!(
            decode_ok("VER MODE 1"),
            Instruction::Ver { tag: "MODE".into(), enabled: true }
        );
        assert_eq!(decode_ok("HALT"), Instruction::Halt);
    }

    #[test]
    fn test_decode_wrong_operand_counts() {
        for line in ["LOAD R0", "STORE R0 [00] R1", "ADD R0 R1", "NOT R0", "OUT", "HALT R0", "CLEAR"] {
            assert!(
                matches!(decode(line), Err(DecodeError::MalformedInstruction { .. })),
                "{} should be malformed",
                line
            );
        }
    }

    #[test]
    fn test_decode_bad_operands() {
        assert!(matches!(decode("LOAD R8 [00]"), Err(DecodeError::MalformedInstruction { .. })));
        assert!(matches!(decode("LOAD R0 00"), Err(DecodeError::MalformedInstruction { .. })));
        assert!(matches!(decode("LOAD R0 [zz]"), Err(DecodeError::MalformedInstruction { .. })));
        assert!(matches!(decode("INIT [00] 00000101"), Err(DecodeError::MalformedInstruction { .. })));
        assert!(matches!(decode("INIT [00] := 101"), Err(DecodeError::MalformedInstruction { .. })));
        assert!(matches!(decode("INIT [00] = 12"), Err(DecodeError::MalformedInstruction { .. })));
        assert!(matches!(decode("VER X 2"), Err(DecodeError::MalformedInstruction { .. })));
        assert!(matches!(decode("OUT 100000000"), Err(DecodeError::InvalidByteValue { .. })));
    }

    #[test]
    fn test_decode_init_keeps_wide_literal() {
        // Range is enforced by memory at execution time.
        assert_eq!(
            decode_ok("INIT [00] = 100000000"),
            Instruction::Init { addr: Address(0), value: 256 }
        );
    }

    #[test]
    fn test_address_wider_than_usize_saturates() {
        assert_eq!(Address::parse("[10000000000000000]"), Some(Address(usize::MAX)));
        assert_eq!(Address::parse("[FFFFFFFFFFFFFFFFFFFF]"), Some(Address(usize::MAX)));
        assert_eq!(Address::parse("[]"), None);
        assert_eq!(Address::parse("[0x10]"), None);
    }

    #[test]
    fn test_decode_every_logic_opcode() {
        for (line, gate) in [
            ("AND R0 R1 R2", Gate::And),
            ("OR R0 R1 R2", Gate::Or),
            ("NAND R0 R1 R2", Gate::Nand),
            ("NOR R0 R1 R2", Gate::Nor),
            ("XOR R0 R1 R2", Gate::Xor),
        ] {
            let instr = decode_ok(line);
            assert_eq!(instr, Instruction::Logic { gate, a: reg(0), b: reg(1), dst: reg(2) });
            assert_eq!(instr.to_string(), line);
        }
        assert!(matches!(decode("XOR R0 R1"), Err(DecodeError::MalformedInstruction { .. })));
    }

    #[test]
    fn test_decode_unknown_opcode_carries_line() {
        let err = decode("JMP [00]").unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownOpcode { opcode: "JMP".into(), line: "JMP [00]".into() }
        );
        assert_eq!(err.line(), "JMP [00]");
        // Opcodes are case-sensitive.
        assert!(matches!(decode("halt"), Err(DecodeError::UnknownOpcode { .. })));
    }

    #[test]
    fn test_decode_if_then_else() {
        let instr = decode_ok("IF R0 == 00000101 THEN OUT R0 ELSE OUT R1");
        assert_eq!(
            instr,
            Instruction::If {
                cond: Condition { lhs: reg(0), op: CompareOp::Eq, rhs: Operand::Immediate(5) },
                then: Box::new(Instruction::Out(Operand::Register(reg(0)))),
                otherwise: Some(Box::new(Instruction::Out(Operand::Register(reg(1))))),
            }
        );
    }

    #[test]
    fn test_decode_if_operand_forms() {
        let instr = decode_ok("IF R1 >= [0F] THEN HALT");
        match instr {
            Instruction::If { cond, otherwise, .. } => {
                assert_eq!(cond.rhs, Operand::Memory(Address(15)));
                assert_eq!(cond.op, CompareOp::Ge);
                assert!(otherwise.is_none());
            }
            other => panic!("expected IF, got {:?}", other),
        }

        let instr = decode_ok("IF R1 != R2 THEN HALT");
        assert_eq!(instr.nesting_depth(), 1);
    }

    #[test]
    fn test_decode_invalid_conditions() {
        for line in [
            "IF R0 == 1 OUT R0",
            "IF R0 == THEN OUT R0",
            "IF R0 == 1 1 THEN OUT R0",
            "IF R0 =< 1 THEN OUT R0",
            "IF 1 == R0 THEN OUT R0",
            "IF R0 == 2 THEN OUT R0",
            "IF R0 == 111111111 THEN OUT R0",
        ] {
            assert!(
                matches!(decode(line), Err(DecodeError::InvalidCondition { .. })),
                "{} should be an invalid condition",
                line
            );
        }
    }

    #[test]
    fn test_decode_empty_clauses() {
        assert!(matches!(decode("IF R0 == 1 THEN"), Err(DecodeError::MalformedInstruction { .. })));
        assert!(matches!(
            decode("IF R0 == 1 THEN OUT R0 ELSE"),
            Err(DecodeError::MalformedInstruction { .. })
        ));
    }

    #[test]
    fn test_decode_nested_if() {
        let instr = decode_ok("IF R0 == 1 THEN OUT R0 ELSE IF R1 == 1 THEN OUT R1 ELSE OUT R2");
        assert_eq!(instr.nesting_depth(), 2);
        match instr {
            Instruction::If { otherwise: Some(inner), .. } => {
                assert_eq!(inner.to_string(), "IF R1 == 00000001 THEN OUT R1 ELSE OUT R2");
            }
            other => panic!("expected IF with ELSE, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_first_else_splits() {
        let instr = decode_ok("IF R0 == 1 THEN IF R1 == 1 THEN OUT R1 ELSE OUT R2");
        match instr {
            Instruction::If { then, otherwise, .. } => {
                assert_eq!(then.to_string(), "IF R1 == 00000001 THEN OUT R1");
                assert_eq!(otherwise.unwrap().to_string(), "OUT R2");
            }
            other => panic!("expected IF, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_nesting_limit() {
        let line = "IF R0 == 0 THEN IF R0 == 0 THEN IF R0 == 0 THEN HALT";
        assert_eq!(decode_with_limit(line, 3).unwrap().unwrap().nesting_depth(), 3);
        assert_eq!(
            decode_with_limit(line, 2),
            Err(DecodeError::NestingTooDeep { limit: 2, line: line.into() })
        );
    }

    #[test]
    fn test_display_round_trip() {
        for line in [
            "LOAD R0 [0A]",
            "INIT [00] = 00000101",
            "CLEAR R3",
            "XOR R1 R2 R3",
            "OUT 00001010",
            "VER X 0",
            "IF R0 <= [01] THEN CLEAR [01] ELSE HALT",
        ] {
            let instr = decode_ok(line);
            assert_eq!(instr.to_string(), line);
            assert_eq!(decode_ok(&instr.to_string()), instr);
        }
    }

    #[test]
    fn test_opcode_mnemonics_resolve() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(Opcode::from_mnemonic("Load"), None);
    }
}
