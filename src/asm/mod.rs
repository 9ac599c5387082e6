//! Program files.
//!
//! This module provides:
//! - A loader that parses a whole `.asm` source up front (`program`)
//! - A listing printer for parsed programs (`listing`)

pub mod program;
pub mod listing;

pub use program::{Program, ProgramLine, ProgramError};
pub use listing::listing;
