use std::fmt;
use std::result::Result as StdResult;

use nom::{
    IResult,
    bytes::complete::{tag, take_while, take_while1},
    branch::alt,
    character::complete::{alphanumeric1, char, digit1, hex_digit1, space0},
    combinator::{all_consuming, map, map_res, opt, recognize},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use crate::instruction::{
    Address, AluOp, BranchCondition, ImmediateOp, Instruction, Register,
};
use crate::utils::{did_you_mean, suggest};

#[derive(Debug, Clone, PartialEq)]
pub enum AsmErrorKind {
    UnknownOpcode {
        opcode: String,
        suggestion: Option<String>,
    },
    UnknownRegister {
        name: String,
        suggestion: Option<String>,
    },
    /// A memory operand not of the form `offset(register)`.
    InvalidAddress,
    InvalidOperand {
        expected: &'static str,
    },
    OperandCount {
        opcode: String,
        expected: usize,
        got: usize,
    },
    DuplicateLabel(String),
    UnterminatedString,
    InvalidDirective,
}

impl fmt::Display for AsmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AsmErrorKind::UnknownOpcode { opcode, suggestion } => {
                write!(f, "unknown opcode `{}`{}", opcode, did_you_mean(suggestion))
            },
            AsmErrorKind::UnknownRegister { name, suggestion } => {
                write!(f, "unknown register `{}`{}", name, did_you_mean(suggestion))
            },
            AsmErrorKind::InvalidAddress => write!(f, "expected an operand of the form offset(register)"),
            AsmErrorKind::InvalidOperand { expected } => write!(f, "expected {}", expected),
            AsmErrorKind::OperandCount { opcode, expected, got } => {
                write!(f, "`{}` takes {} operand(s), found {}", opcode, expected, got)
            },
            AsmErrorKind::DuplicateLabel(label) => {
                write!(f, "label `{}` is defined more than once", label)
            },
            AsmErrorKind::UnterminatedString => write!(f, "unterminated string literal"),
            AsmErrorKind::InvalidDirective => write!(f, "invalid directive"),
        }
    }
}

pub type ParseError = crate::error::ParseError<AsmErrorKind>;
type Result<'a, T> = IResult<&'a str, T, ParseError>;

/// Every opcode the loader accepts.
pub const OPCODES: [&str; 29] = [
    "li", "la", "move",
    "add", "sub", "mul", "and", "or", "xor", "slt", "sltu",
    "addi", "andi", "ori", "xori", "slti", "sltiu",
    "div", "mflo", "mfhi",
    "lw", "sw",
    "beq", "bne",
    "j", "jal", "jr",
    "syscall", "nop",
];

fn is_label_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub(crate) fn label(input: &str) -> Result<&str> {
    recognize(pair(take_while1(is_label_start), take_while(is_label_char)))(input)
}

/// A label definition at the start of a line, such as `main:`.
pub(crate) fn label_definition(input: &str) -> Result<&str> {
    terminated(label, preceded(space0, char(':')))(input)
}

pub fn register(input: &str) -> Result<Register> {
    let (rest, name) = recognize(preceded(char('$'), alphanumeric1))(input)?;

    match name.parse() {
        Ok(register) => Ok((rest, register)),
        Err(()) => Err(nom::Err::Failure(ParseError::from_kind(
            input,
            AsmErrorKind::UnknownRegister {
                name: name.to_string(),
                suggestion: suggest(name, Register::names()),
            },
        ))),
    }
}

fn take_i64(input: &str) -> Result<i64> {
    alt((
        map_res(
            preceded(alt((tag("0x"), tag("0X"))), hex_digit1),
            |n| i64::from_str_radix(n, 16),
        ),
        map_res(digit1, |n| i64::from_str_radix(n, 10)),
    ))(input)
}

/// A signed decimal or hexadecimal number. Values outside of 32 bits are truncated.
pub fn immediate(input: &str) -> Result<i32> {
    map(
        tuple((
            opt(alt((char('+'), char('-')))),
            take_i64,
        )),
        |(sign, number)| match sign {
            Some('-') => number.wrapping_neg() as i32,
            Some(_) | None => number as i32,
        }
    )(input)
}

pub fn address(input: &str) -> Result<Address> {
    map(
        pair(
            opt(immediate),
            delimited(char('('), register, char(')')),
        ),
        |(offset, base)| Address {
            offset: offset.unwrap_or(0),
            base,
        },
    )(input)
}

/// Applies `parser` to the whole of `text`.
///
/// Failures of the parser are returned as they are, any other error becomes `otherwise`.
fn operand<'a, T, P>(parser: P, text: &'a str, otherwise: AsmErrorKind) -> StdResult<T, ParseError>
where
    P: Fn(&'a str) -> Result<'a, T>,
{
    match all_consuming(parser)(text) {
        Ok((_, value)) => Ok(value),
        Err(nom::Err::Failure(err)) => Err(err),
        Err(_) => Err(ParseError::from_kind(text, otherwise)),
    }
}

fn reg(text: &str) -> StdResult<Register, ParseError> {
    operand(register, text, AsmErrorKind::InvalidOperand { expected: "a register" })
}

fn imm(text: &str) -> StdResult<i32, ParseError> {
    operand(immediate, text, AsmErrorKind::InvalidOperand { expected: "an immediate value" })
}

fn target(text: &str) -> StdResult<String, ParseError> {
    operand(label, text, AsmErrorKind::InvalidOperand { expected: "a label" })
        .map(|label| label.to_string())
}

fn addr(text: &str) -> StdResult<Address, ParseError> {
    operand(address, text, AsmErrorKind::InvalidAddress)
}

fn alu_op(opcode: &str) -> Option<AluOp> {
    match opcode {
        "add" => Some(AluOp::Add),
        "sub" => Some(AluOp::Subtract),
        "mul" => Some(AluOp::Multiply),
        "and" => Some(AluOp::And),
        "or" => Some(AluOp::Or),
        "xor" => Some(AluOp::Xor),
        "slt" => Some(AluOp::SetLessThan),
        "sltu" => Some(AluOp::SetLessThanUnsigned),
        _ => None,
    }
}

fn immediate_op(opcode: &str) -> Option<ImmediateOp> {
    match opcode {
        "addi" => Some(ImmediateOp::Add),
        "andi" => Some(ImmediateOp::And),
        "ori" => Some(ImmediateOp::Or),
        "xori" => Some(ImmediateOp::Xor),
        "slti" => Some(ImmediateOp::SetLessThan),
        "sltiu" => Some(ImmediateOp::SetLessThanUnsigned),
        _ => None,
    }
}

fn operand_count(opcode: &str) -> Option<usize> {
    let count = match opcode {
        "syscall" | "nop" => 0,
        "mflo" | "mfhi" | "j" | "jal" | "jr" => 1,
        "li" | "la" | "move" | "div" | "lw" | "sw" => 2,
        "beq" | "bne" => 3,
        _ if alu_op(opcode).is_some() || immediate_op(opcode).is_some() => 3,
        _ => return None,
    };

    Some(count)
}

fn unknown_opcode(line: &str, opcode: &str) -> ParseError {
    ParseError::from_kind(line, AsmErrorKind::UnknownOpcode {
        opcode: opcode.to_string(),
        suggestion: suggest(opcode, OPCODES.iter().copied()),
    })
}

/// Decodes a single instruction with its comment and label already removed.
///
/// Operands are separated by commas, whitespace or both.
pub fn parse_instruction(line: &str) -> StdResult<Instruction, ParseError> {
    let mut parts = line.split_whitespace();

    let opcode = match parts.next() {
        Some(opcode) => opcode,
        None => return Ok(Instruction::NoOperation),
    };

    let operands: Vec<&str> = parts
        .flat_map(|part| part.split(','))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    let expected = match operand_count(opcode) {
        Some(count) => count,
        None => return Err(unknown_opcode(line, opcode)),
    };

    if operands.len() != expected {
        return Err(ParseError::from_kind(line, AsmErrorKind::OperandCount {
            opcode: opcode.to_string(),
            expected,
            got: operands.len(),
        }));
    }

    let ops = &operands;

    let instruction = match opcode {
        "li" => Instruction::LoadImmediate { rt: reg(ops[0])?, value: imm(ops[1])? },
        "la" => Instruction::LoadAddress { rt: reg(ops[0])?, label: target(ops[1])? },
        "move" => Instruction::Move { rd: reg(ops[0])?, rs: reg(ops[1])? },
        "div" => Instruction::Divide { rs: reg(ops[0])?, rt: reg(ops[1])? },
        "mflo" => Instruction::MoveFromLo { rd: reg(ops[0])? },
        "mfhi" => Instruction::MoveFromHi { rd: reg(ops[0])? },
        "lw" => Instruction::LoadWord { rt: reg(ops[0])?, address: addr(ops[1])? },
        "sw" => Instruction::StoreWord { rt: reg(ops[0])?, address: addr(ops[1])? },
        "beq" | "bne" => Instruction::Branch {
            condition: match opcode {
                "beq" => BranchCondition::Equal,
                _ => BranchCondition::NotEqual,
            },
            rs: reg(ops[0])?,
            rt: reg(ops[1])?,
            label: target(ops[2])?,
        },
        "j" => Instruction::Jump { label: target(ops[0])? },
        "jal" => Instruction::JumpAndLink { label: target(ops[0])? },
        "jr" => Instruction::JumpRegister { rs: reg(ops[0])? },
        "syscall" => Instruction::Syscall,
        "nop" => Instruction::NoOperation,
        _ => match (alu_op(opcode), immediate_op(opcode)) {
            (Some(op), _) => Instruction::Alu {
                op,
                rd: reg(ops[0])?,
                rs: reg(ops[1])?,
                rt: reg(ops[2])?,
            },
            (None, Some(op)) => Instruction::AluImmediate {
                op,
                rt: reg(ops[0])?,
                rs: reg(ops[1])?,
                imm: imm(ops[2])?,
            },
            (None, None) => return Err(unknown_opcode(line, opcode)),
        },
    };

    Ok(instruction)
}
