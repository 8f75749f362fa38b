//! Tokens and a tokenizer for the source language.

use logos::{Lexer, Logos};

use std::fmt;
use std::ops::Range;

/// Byte range of a token in the source text.
pub type Span = Range<usize>;

/// Enumeration of all token kinds of the source language.
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum TokenKind {
    /// Errorneous token that could not be interpreted as any of the other variants.
    /// [tokenize] reports these as a [LexError] and never returns them inside a [Token].
    #[error]
    #[regex(r"[ \t\n\r\f]+", logos::skip)]
    #[regex(r"//[^\n]*", logos::skip)]
    Error,

    /// One of the reserved words.
    #[regex("int|if|else|while|for|return|void", keyword_callback)]
    Keyword(Keyword),

    /// A name which begins with a letter or an underscore.
    #[regex("[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    /// An unsigned decimal number literal.
    #[regex("[0-9]+", |lex| lex.slice().parse())]
    Number(i64),

    /// A string literal with its escape sequences already decoded.
    #[token("\"", string_callback)]
    String(String),

    #[regex(r"==|!=|<=|>=|\+\+|--|[-+*/%=<>!]", operator_callback)]
    Operator(Operator),

    #[regex(r"[(){};,]", punctuation_callback)]
    Punctuation(Punctuation),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Int,
    If,
    Else,
    While,
    For,
    Return,
    Void,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Increment,
    Decrement,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    Less,
    Greater,
    Not,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Punctuation {
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    Semicolon,
    Comma,
}

fn keyword_callback(lex: &mut Lexer<TokenKind>) -> Option<Keyword> {
    let keyword = match lex.slice() {
        "int" => Keyword::Int,
        "if" => Keyword::If,
        "else" => Keyword::Else,
        "while" => Keyword::While,
        "for" => Keyword::For,
        "return" => Keyword::Return,
        "void" => Keyword::Void,
        _ => return None,
    };

    Some(keyword)
}

fn operator_callback(lex: &mut Lexer<TokenKind>) -> Option<Operator> {
    let operator = match lex.slice() {
        "==" => Operator::Equal,
        "!=" => Operator::NotEqual,
        "<=" => Operator::LessEqual,
        ">=" => Operator::GreaterEqual,
        "++" => Operator::Increment,
        "--" => Operator::Decrement,
        "+" => Operator::Plus,
        "-" => Operator::Minus,
        "*" => Operator::Star,
        "/" => Operator::Slash,
        "%" => Operator::Percent,
        "=" => Operator::Assign,
        "<" => Operator::Less,
        ">" => Operator::Greater,
        "!" => Operator::Not,
        _ => return None,
    };

    Some(operator)
}

fn punctuation_callback(lex: &mut Lexer<TokenKind>) -> Option<Punctuation> {
    let punctuation = match lex.slice() {
        "(" => Punctuation::OpenParen,
        ")" => Punctuation::CloseParen,
        "{" => Punctuation::OpenBrace,
        "}" => Punctuation::CloseBrace,
        ";" => Punctuation::Semicolon,
        "," => Punctuation::Comma,
        _ => return None,
    };

    Some(punctuation)
}

/// Consumes the rest of a string literal after the opening quote.
///
/// `\n` decodes into a newline, any other escaped character stands for itself. A literal
/// without a closing quote swallows the rest of the input and produces an error token.
fn string_callback(lex: &mut Lexer<TokenKind>) -> Option<String> {
    let mut text = String::new();
    let mut chars = lex.remainder().char_indices();

    while let Some((offset, c)) = chars.next() {
        match c {
            '"' => {
                lex.bump(offset + 1);
                return Some(text);
            },
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, escaped)) => text.push(escaped),
                None => break,
            },
            c => text.push(c),
        }
    }

    let rest = lex.remainder().len();
    lex.bump(rest);

    None
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Keyword::Int => "int",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::For => "for",
            Keyword::Return => "return",
            Keyword::Void => "void",
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Increment => "++",
            Operator::Decrement => "--",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
            Operator::Percent => "%",
            Operator::Assign => "=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::Not => "!",
        })
    }
}

impl fmt::Display for Punctuation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Punctuation::OpenParen => "(",
            Punctuation::CloseParen => ")",
            Punctuation::OpenBrace => "{",
            Punctuation::CloseBrace => "}",
            Punctuation::Semicolon => ";",
            Punctuation::Comma => ",",
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenKind::Error => write!(f, "<error>"),
            TokenKind::Keyword(keyword) => write!(f, "keyword `{}`", keyword),
            TokenKind::Identifier(name) => write!(f, "identifier `{}`", name),
            TokenKind::Number(value) => write!(f, "number `{}`", value),
            TokenKind::String(text) => write!(f, "string {:?}", text),
            TokenKind::Operator(op) => write!(f, "`{}`", op),
            TokenKind::Punctuation(punct) => write!(f, "`{}`", punct),
        }
    }
}

/// A token together with its position in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,

    /// The line number on which the token begins, starting from 1.
    pub line: usize,

    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LexErrorKind {
    /// A character that does not begin any token.
    UnknownCharacter(char),

    /// A string literal that reaches the end of the input without a closing quote.
    UnterminatedString,

    /// A number literal too large to be represented.
    InvalidNumber(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub line: usize,
    pub kind: LexErrorKind,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            LexErrorKind::UnknownCharacter(c) => {
                write!(f, "line {}: unknown character {:?}", self.line, c)
            },
            LexErrorKind::UnterminatedString => {
                write!(f, "line {}: unterminated string literal", self.line)
            },
            LexErrorKind::InvalidNumber(literal) => {
                write!(f, "line {}: number literal `{}` is out of range", self.line, literal)
            },
        }
    }
}

impl std::error::Error for LexError {}

fn classify_error(slice: &str) -> LexErrorKind {
    if slice.starts_with('"') {
        LexErrorKind::UnterminatedString
    } else if !slice.is_empty() && slice.bytes().all(|b| b.is_ascii_digit()) {
        LexErrorKind::InvalidNumber(slice.to_string())
    } else {
        LexErrorKind::UnknownCharacter(slice.chars().next().unwrap_or('\0'))
    }
}

/// Converts source text into a sequence of tokens.
///
/// Whitespace and `//` comments are discarded. The first character that cannot start a token
/// aborts the scan.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();

    let mut line = 1;
    let mut counted = 0;

    while let Some(kind) = lexer.next() {
        let span = lexer.span();

        line += source[counted..span.start].matches('\n').count();
        counted = span.start;

        if kind == TokenKind::Error {
            return Err(LexError {
                line,
                kind: classify_error(lexer.slice()),
            });
        }

        tokens.push(Token { kind, line, span });
    }

    Ok(tokens)
}
