use std::fmt::{Display, self};
use nom::error::ErrorKind;

use crate::codegen::CodegenError;
use crate::lang::token::LexError;
use crate::lang::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
enum InnerError<Kind> {
    Context(&'static str),
    Other(Kind),
    Nom(ErrorKind),
}

impl<Kind: Display> fmt::Display for InnerError<Kind> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InnerError::Context(ctx) => write!(f, "invalid {}", ctx),
            InnerError::Nom(_err) => write!(f, "unexpected input"),
            InnerError::Other(op) => fmt::Display::fmt(op, f),
        }
    }
}

/// Error type that contains the reason of the error and the unconsumed input.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError<Kind> {
    stack: Vec<(String, InnerError<Kind>)>,
}

impl<Kind> ParseError<Kind> {
    pub(crate) fn from_kind<S: Into<String>>(input: S, kind: Kind) -> ParseError<Kind> {
        ParseError {
            stack: vec![(input.into(), InnerError::Other(kind))],
        }
    }

    /// The innermost domain specific reason of the error, if nom did not fail on its own.
    pub fn kind(&self) -> Option<&Kind> {
        self.stack.iter()
            .find_map(|(_, inner)| match inner {
                InnerError::Other(kind) => Some(kind),
                _ => None,
            })
    }
}

impl<Kind: Display> fmt::Display for ParseError<Kind> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (input, kind) = self.stack.iter()
            .find(|(_, inner)| match inner {
                InnerError::Other(_) => true,
                _ => false,
            })
            .unwrap_or(&self.stack[0]);

        let input = input.lines().next().unwrap_or("").trim();

        if input.is_empty() {
            write!(f, "{}", kind)
        } else {
            let end = input.char_indices()
                .nth(20)
                .map(|(i, _)| i)
                .unwrap_or(input.len());

            write!(f, "{} at `{}`", kind, &input[..end])
        }
    }
}

impl<Kind> nom::error::ParseError<&str> for ParseError<Kind> {
    fn from_error_kind(input: &str, kind: ErrorKind) -> Self {
        ParseError {
            stack: vec![(input.to_string(), InnerError::Nom(kind))],
        }
    }

    fn append(input: &str, kind: ErrorKind, mut other: Self) -> Self {
        other.stack.push((input.to_string(), InnerError::Nom(kind)));
        other
    }

    fn add_context(input: &str, ctx: &'static str, mut other: Self) -> Self {
        other.stack.push((input.to_string(), InnerError::Context(ctx)));
        other
    }
}

/// Any failure on the way from source text to assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Lex(LexError),
    Syntax(SyntaxError),
    Codegen(CodegenError),
}

impl From<LexError> for CompileError {
    fn from(err: LexError) -> CompileError {
        CompileError::Lex(err)
    }
}

impl From<SyntaxError> for CompileError {
    fn from(err: SyntaxError) -> CompileError {
        CompileError::Syntax(err)
    }
}

impl From<CodegenError> for CompileError {
    fn from(err: CodegenError) -> CompileError {
        CompileError::Codegen(err)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompileError::Lex(err) => write!(f, "lexical error: {}", err),
            CompileError::Syntax(err) => write!(f, "syntax error: {}", err),
            CompileError::Codegen(err) => write!(f, "code generation error: {}", err),
        }
    }
}

impl std::error::Error for CompileError {}

#[test]
fn test_parse_error_display() {
    #[derive(Debug, Clone, PartialEq)]
    struct Oops;

    impl Display for Oops {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "oops")
        }
    }

    let err = ParseError::from_kind("$t99, $t0\nnext line", Oops);
    assert_eq!(err.to_string(), "oops at `$t99, $t0`");
    assert_eq!(err.kind(), Some(&Oops));

    let err = ParseError::from_kind("", Oops);
    assert_eq!(err.to_string(), "oops");
}
