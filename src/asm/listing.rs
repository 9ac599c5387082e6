//! Canonical listing of a parsed program.

use crate::asm::Program;

/// Render a program one instruction per line, prefixed by its source line.
pub fn listing(program: &Program) -> String {
    let mut output = String::new();
    output.push_str("; Program Listing\n");
    output.push_str("; ---------------\n\n");

    for line in program.lines() {
        output.push_str(&format!("{:03}: {}\n", line.number, line.instruction));
    }

    output
}
