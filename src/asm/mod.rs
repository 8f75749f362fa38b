//! Loading of assembly text into a [Program] of decoded [Instructions](crate::instruction::Instruction).
//!
//! The text section holds one instruction per line, optionally preceded by a `label:`. The data
//! section holds `label: .asciiz "..."` string constants, which may continue over several lines.
//! `#` starts a comment everywhere except inside string literals.

pub mod parser;
pub mod program;

pub use parser::{AsmErrorKind, ParseError};
pub use program::{DataString, InstructionEntry, LoadError, Program};
