//! The source language: tokens, syntax tree and parser.

pub mod ast;
pub mod parser;
pub mod token;

/// Error produced by the parser, with the statement and function it occured in as context.
pub type SyntaxError = crate::parsing::Error<String>;

pub use ast::Program;
pub use parser::parse;
pub use token::tokenize;
