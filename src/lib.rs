//! A crate for compiling a tiny C-like language into MIPS-style assembly text, and for
//! executing that assembly in a small simulator.
//!
//! Currently this crate provides the functionality to:
//! - Tokenize and parse the source language into a syntax tree.
//! - Pretty-print the syntax tree back into source text.
//! - Generate stack-machine style assembly text from the syntax tree.
//! - Load assembly text into decoded instructions and a symbol table.
//! - Execute the loaded program.
//!
//! # Example
//! ```
//! use toycc::{
//!     asm::Program,
//!     emulator::{Emulator, Halt, TestIo},
//!     instruction::Register,
//! };
//!
//! let source = r#"
//!     int main() {
//!         int i = 0;
//!         while (i < 3) {
//!             print_int(i);
//!             i = i + 1;
//!         }
//!         return i;
//!     }
//! "#;
//!
//! // Lex, parse and generate assembly text.
//! let assembly = toycc::compile(source)
//!     .expect("could not compile the program");
//!
//! // Load the assembly text back in.
//! let program = Program::parse(&assembly.to_string())
//!     .expect("could not load the assembly");
//!
//! // Execute it, capturing the console output.
//! let mut emulator = Emulator::new(program, TestIo::new())
//!     .expect("could not initialize emulator");
//!
//! assert_eq!(emulator.run(), Ok(Halt::Returned));
//! assert_eq!(emulator.io.output(), "012");
//! assert_eq!(emulator.register(Register::V0), 3);
//! ```
//!
//! # Executables
//!
//! ## `toycc`
//!
//! Compiles a source file into an assembly file.
//!
//! ```text
//! $ toycc loop.c -o loop.asm
//! Compiled loop.c -> loop.asm
//! ```
//!
//! ## `toysim`
//!
//! Loads and executes an assembly file. `--trace` prints every executed instruction to the
//! standard error, `--registers` dumps the register file after the run.
//!
//! ```text
//! $ toysim loop.asm
//! 012
//! ```

use slog::{debug, o, Discard, Logger};

pub mod asm;
pub mod codegen;
pub mod emulator;
pub mod error;
pub mod event;
pub mod instruction;
pub mod lang;
pub mod parsing;
pub mod symbol_table;

mod utils;

use codegen::Assembly;
use error::CompileError;

/// Compiles source text into assembly.
pub fn compile(source: &str) -> Result<Assembly, CompileError> {
    compile_with_logger(source, None)
}

/// Compiles source text into assembly, logging the progress of each stage.
pub fn compile_with_logger<L>(source: &str, logger: L) -> Result<Assembly, CompileError>
where
    L: Into<Option<Logger>>,
{
    let logger = logger.into()
        .unwrap_or(Logger::root(Discard, o!()));

    let tokens = lang::tokenize(source)?;
    debug!(logger, "tokenized"; "stage" => "lexer", "tokens" => tokens.len());

    let program = lang::parse(&tokens)?;
    debug!(logger, "parsed"; "stage" => "parser", "functions" => program.functions.len());

    Ok(codegen::generate_with_logger(&program, logger)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_reports_each_stage() {
        assert!(matches!(compile("int main() { return 1 @ 2; }"), Err(CompileError::Lex(_))));
        assert!(matches!(compile("int main() { return 1 }"), Err(CompileError::Syntax(_))));
        assert!(matches!(compile("int main() { return y; }"), Err(CompileError::Codegen(_))));
        assert!(compile("int main() { return 0; }").is_ok());
    }
}
