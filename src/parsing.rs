use std::fmt;
use itertools::Itertools;

use crate::lang::token::{Span, Token, TokenKind};

#[derive(Clone, Debug, PartialEq)]
pub struct Error<Context> {
    pub kind: ErrorKind,
    pub context: Vec<Context>,
}

impl<C> Error<C> {
    pub fn unexpected<E>(token: &Token, expected: E) -> Error<C> where E: Into<String> {
        Error {
            kind: ErrorKind::UnexpectedToken {
                expected: expected.into(),
                found: token.kind.to_string(),
                line: token.line,
                span: token.span.clone(),
            },
            context: Vec::new(),
        }
    }

    pub fn eos<E>(expected: E) -> Error<C> where E: Into<String> {
        Error {
            kind: ErrorKind::EndOfStream { expected: expected.into() },
            context: Vec::new(),
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self.kind {
            ErrorKind::EndOfStream { .. } => None,
            ErrorKind::UnexpectedToken { line, .. } => Some(line),
        }
    }
}

pub trait ErrorExt<R,C> {
    fn context<T>(self, ctx: T) -> Self where T: Into<C>;
}

impl<R,C> ErrorExt<R,C> for Result<R, Error<C>> {
    fn context<T>(mut self, ctx: T) -> Self where T: Into<C> {
        if let Err(ref mut err) = self {
            err.context.push(ctx.into());
        }

        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ErrorKind {
    EndOfStream {
        expected: String,
    },
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        span: Span,
    },
}

impl<C> fmt::Display for Error<C>
where
    C: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ctx = self.context.iter()
            .rev()
            .join(": ");

        let prefix = if ctx.is_empty() { String::new() } else { format!("{}: ", ctx) };

        match self.kind {
            ErrorKind::EndOfStream { ref expected } =>
                write!(f, "{}expected {}, found end of input", prefix, expected),
            ErrorKind::UnexpectedToken { ref expected, ref found, line, .. } =>
                write!(f, "line {}: {}expected {}, found {}", line, prefix, expected, found),
        }
    }
}

impl<C: fmt::Debug + fmt::Display> std::error::Error for Error<C> {}

/// Cursor over a slice of tokens.
pub struct TokenStream<'a> {
    tokens: &'a [Token],
    position: usize,
}

impl<'a> From<&'a [Token]> for TokenStream<'a> {
    fn from(tokens: &'a [Token]) -> TokenStream<'a> {
        TokenStream {
            tokens,
            position: 0,
        }
    }
}

impl<'a> Iterator for TokenStream<'a> {
    type Item = &'a Token;

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }
}

impl<'a> TokenStream<'a> {
    pub fn is_empty(&self) -> bool {
        self.position >= self.tokens.len()
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.position)
    }

    pub fn peek_kind(&self) -> Option<&'a TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    /// Consumes the next token if it is `kind`.
    pub fn assert(&mut self, kind: &TokenKind) -> bool {
        match self.peek() {
            Some(token) if token.kind == *kind => {
                self.position += 1;
                true
            },
            _ => false,
        }
    }

    /// Consumes the next token, failing unless it is `kind`.
    pub fn expect<C>(&mut self, kind: &TokenKind, expected: &str) -> Result<&'a Token, Error<C>> {
        match self.peek() {
            Some(token) if token.kind == *kind => {
                self.position += 1;
                Ok(token)
            },
            Some(token) => Err(Error::unexpected(token, expected)),
            None => Err(Error::eos(expected)),
        }
    }

    /// Consumes the next token, which must be an identifier, and returns its name.
    pub fn expect_identifier<C>(&mut self, expected: &str) -> Result<String, Error<C>> {
        match self.peek() {
            Some(Token { kind: TokenKind::Identifier(name), .. }) => {
                self.position += 1;
                Ok(name.clone())
            },
            Some(token) => Err(Error::unexpected(token, expected)),
            None => Err(Error::eos(expected)),
        }
    }

    /// Builds the error for a token that does not fit anywhere at the current position.
    pub fn unexpected<C>(&self, expected: &str) -> Error<C> {
        match self.peek() {
            Some(token) => Error::unexpected(token, expected),
            None => Error::eos(expected),
        }
    }
}
