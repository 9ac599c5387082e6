//! Output sinks for the CPU.
//!
//! OUT values and trace text leave the CPU through a [`Console`], so the
//! caller decides whether they reach a terminal or a buffer.

/// Receives everything the CPU prints.
pub trait Console {
    /// An OUT value as 8 binary digits. Always delivered.
    fn out(&mut self, bits: &str);

    /// One line of per-instruction trace. Only delivered when verbose.
    fn trace(&mut self, text: &str);
}

/// Writes to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn out(&mut self, bits: &str) {
        println!("{}", bits);
    }

    fn trace(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// A line recorded by [`Transcript`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    Out(String),
    Trace(String),
}

/// Records output in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    lines: Vec<ConsoleLine>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything, in emission order.
    pub fn lines(&self) -> &[ConsoleLine] {
        &self.lines
    }

    /// OUT values only.
    pub fn outputs(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                ConsoleLine::Out(bits) => Some(bits.as_str()),
                ConsoleLine::Trace(_) => None,
            })
            .collect()
    }

    /// Trace text only.
    pub fn traces(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                ConsoleLine::Trace(text) => Some(text.as_str()),
                ConsoleLine::Out(_) => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl Console for Transcript {
    fn out(&mut self, bits: &str) {
        self.lines.push(ConsoleLine::Out(bits.to_string()));
    }

    fn trace(&mut self, text: &str) {
        self.lines.push(ConsoleLine::Trace(text.to_string()));
    }
}
