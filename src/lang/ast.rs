//! Syntax tree of the source language.
//!
//! The [Display](std::fmt::Display) implementations print source text which parses back into
//! an identical tree.

use std::fmt;
use itertools::Itertools;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub functions: Vec<Function>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Int,
    Void,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub return_type: Type,
    pub name: String,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Declaration {
        name: String,
        init: Option<Expression>,
    },
    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Option<Vec<Statement>>,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    For {
        init: Option<ForInit>,
        condition: Option<Expression>,
        update: Option<Expression>,
        body: Vec<Statement>,
    },
    Return(Option<Expression>),
    Expression(Expression),
}

/// The first clause of a `for` loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Declaration {
        name: String,
        init: Option<Expression>,
    },
    Expression(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
        }
    }
}

/// Increment or decrement, used both as a prefix and a postfix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOp {
    Increment,
    Decrement,
}

impl StepOp {
    pub fn symbol(self) -> &'static str {
        match self {
            StepOp::Increment => "++",
            StepOp::Decrement => "--",
        }
    }

    pub fn delta(self) -> i32 {
        match self {
            StepOp::Increment => 1,
            StepOp::Decrement => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Assign {
        target: Box<Expression>,
        value: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    PreOp {
        op: StepOp,
        operand: Box<Expression>,
    },
    PostOp {
        op: StepOp,
        operand: Box<Expression>,
    },
    Number(i64),
    String(String),
    Variable(String),
    Call {
        name: String,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn variable<S: Into<String>>(name: S) -> Expression {
        Expression::Variable(name.into())
    }

    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn assign(target: Expression, value: Expression) -> Expression {
        Expression::Assign {
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    /// Writes the expression without parentheses around the outermost operator.
    fn fmt_bare(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expression::Assign { target, value } => write!(f, "{} = {}", target, value),
            Expression::Binary { op, left, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            },
            other => fmt::Display::fmt(other, f),
        }
    }
}

struct Bare<'a>(&'a Expression);

impl fmt::Display for Bare<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt_bare(f)
    }
}

fn write_escaped(f: &mut fmt::Formatter, text: &str) -> fmt::Result {
    write!(f, "\"")?;

    for c in text.chars() {
        match c {
            '\\' => write!(f, "\\\\")?,
            '"' => write!(f, "\\\"")?,
            '\n' => write!(f, "\\n")?,
            c => write!(f, "{}", c)?,
        }
    }

    write!(f, "\"")
}

fn write_step_operand(f: &mut fmt::Formatter, operand: &Expression) -> fmt::Result {
    match operand {
        Expression::PreOp { .. } | Expression::PostOp { .. } => write!(f, "({})", operand),
        _ => write!(f, "{}", operand),
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expression::Assign { .. } | Expression::Binary { .. } => {
                write!(f, "(")?;
                self.fmt_bare(f)?;
                write!(f, ")")
            },
            Expression::PreOp { op, operand } => {
                write!(f, "{}", op.symbol())?;
                write_step_operand(f, operand)
            },
            Expression::PostOp { op, operand } => {
                write_step_operand(f, operand)?;
                write!(f, "{}", op.symbol())
            },
            Expression::Number(value) => write!(f, "{}", value),
            Expression::String(text) => write_escaped(f, text),
            Expression::Variable(name) => write!(f, "{}", name),
            Expression::Call { name, args } => {
                write!(f, "{}({})", name, args.iter().map(Bare).join(", "))
            },
        }
    }
}

const INDENT: &str = "    ";

fn write_indent(f: &mut fmt::Formatter, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }

    Ok(())
}

fn write_block(f: &mut fmt::Formatter, body: &[Statement], depth: usize) -> fmt::Result {
    writeln!(f, "{{")?;

    for statement in body {
        statement.fmt_indented(f, depth + 1)?;
    }

    write_indent(f, depth)?;
    write!(f, "}}")
}

fn write_declaration(f: &mut fmt::Formatter, name: &str, init: &Option<Expression>) -> fmt::Result {
    match init {
        Some(init) => write!(f, "int {} = {};", name, Bare(init)),
        None => write!(f, "int {};", name),
    }
}

impl fmt::Display for ForInit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ForInit::Declaration { name, init } => write_declaration(f, name, init),
            ForInit::Expression(expr) => write!(f, "{};", Bare(expr)),
        }
    }
}

impl Statement {
    fn fmt_indented(&self, f: &mut fmt::Formatter, depth: usize) -> fmt::Result {
        write_indent(f, depth)?;

        match self {
            Statement::If { condition, then_body, else_body } => {
                write!(f, "if ({}) ", Bare(condition))?;
                write_block(f, then_body, depth)?;

                if let Some(else_body) = else_body {
                    write!(f, " else ")?;
                    write_block(f, else_body, depth)?;
                }
            },
            Statement::While { condition, body } => {
                write!(f, "while ({}) ", Bare(condition))?;
                write_block(f, body, depth)?;
            },
            Statement::For { init, condition, update, body } => {
                write!(f, "for (")?;

                match init {
                    Some(init) => write!(f, "{}", init)?,
                    None => write!(f, ";")?,
                }

                if let Some(condition) = condition {
                    write!(f, " {}", Bare(condition))?;
                }

                write!(f, ";")?;

                if let Some(update) = update {
                    write!(f, " {}", Bare(update))?;
                }

                write!(f, ") ")?;
                write_block(f, body, depth)?;
            },
            Statement::Declaration { name, init } => write_declaration(f, name, init)?,
            Statement::Expression(expr) => write!(f, "{};", Bare(expr))?,
            Statement::Return(Some(value)) => write!(f, "return {};", Bare(value))?,
            Statement::Return(None) => write!(f, "return;")?,
        }

        writeln!(f)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Void => write!(f, "void"),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}() ", self.return_type, self.name)?;
        write_block(f, &self.body, 0)?;
        writeln!(f)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, function) in self.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }

            write!(f, "{}", function)?;
        }

        Ok(())
    }
}
