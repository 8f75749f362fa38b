//! Translation of the syntax tree into assembly.
//!
//! Expressions are evaluated into `$t0`. The left operand of a binary operator is spilled on the
//! stack while the right one is evaluated, after which the right operand is moved into `$t1` and
//! the left one popped back into `$t0`. Local variables live below the frame pointer, one word
//! each, in declaration order.

use slog::{debug, o, trace, warn, Discard, Logger};

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::instruction::{
    Address, AluOp, BranchCondition, ImmediateOp, Instruction, Register,
};
use crate::lang::ast::{BinaryOp, Expression, ForInit, Function, Program, Statement};
use crate::utils::{did_you_mean, suggest};

/// Builtin routines recognized by name at call sites.
pub const BUILTINS: [&str; 2] = ["print_int", "print_str"];

const RUNTIME_ROUTINES: &str = "\
print_int:
    li $v0, 1
    syscall
    jr $ra

print_str:
    li $v0, 4
    syscall
    jr $ra";

/// Prefixes of the labels made up for control flow and string constants, each followed by a
/// counter.
const GENERATED_PREFIXES: [&str; 7] = ["else", "endif", "while", "endwhile", "for", "endfor", "str"];

fn is_generated_label(name: &str) -> bool {
    GENERATED_PREFIXES.iter().any(|prefix| match name.strip_prefix(prefix) {
        Some(counter) => !counter.is_empty() && counter.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum CodegenError {
    /// A variable was used before any declaration of it in the same function.
    UnknownVariable {
        name: String,
        function: String,
        suggestion: Option<String>,
    },

    /// The left hand side of an assignment is not a variable.
    InvalidAssignmentTarget {
        function: String,
    },

    /// The operand of `++` or `--` is not a variable.
    InvalidStepOperand {
        function: String,
    },

    /// A builtin was called with the wrong number of arguments.
    ArgumentCount {
        name: String,
        expected: usize,
        got: usize,
    },

    /// A function is named like a builtin routine, an epilogue or a generated label.
    ReservedName {
        name: String,
    },

    DuplicateFunction {
        name: String,
    },
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CodegenError::UnknownVariable { name, function, suggestion } => write!(
                f, "unknown variable `{}` in function `{}`{}",
                name, function, did_you_mean(suggestion),
            ),
            CodegenError::InvalidAssignmentTarget { function } => write!(
                f, "left hand side of an assignment in function `{}` is not a variable",
                function,
            ),
            CodegenError::InvalidStepOperand { function } => write!(
                f, "operand of an increment or decrement in function `{}` is not a variable",
                function,
            ),
            CodegenError::ArgumentCount { name, expected, got } => write!(
                f, "`{}` takes {} argument(s) but {} were given",
                name, expected, got,
            ),
            CodegenError::ReservedName { name } => write!(
                f, "function name `{}` clashes with a label used by the generated code",
                name,
            ),
            CodegenError::DuplicateFunction { name } => {
                write!(f, "function `{}` is defined more than once", name)
            },
        }
    }
}

impl std::error::Error for CodegenError {}

/// A line in the text section.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Label(String),
    Instruction(Instruction),
    Blank,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Line::Label(label) => write!(f, "{}:", label),
            Line::Instruction(ins) => write!(f, "    {}", ins),
            Line::Blank => Ok(()),
        }
    }
}

/// Generated assembly for a whole program.
///
/// The [Display](fmt::Display) implementation renders the complete assembly file, including the builtin
/// `print_int` and `print_str` routines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    /// String constants as `(label, text)` pairs, in the order they were encountered.
    pub data: Vec<(String, String)>,

    /// Function bodies.
    pub text: Vec<Line>,
}

impl Assembly {
    pub fn labels(&self) -> impl Iterator<Item=&str> {
        self.text.iter()
            .filter_map(|line| match line {
                Line::Label(label) => Some(label.as_str()),
                _ => None,
            })
    }

    pub fn instructions(&self) -> impl Iterator<Item=&Instruction> {
        self.text.iter()
            .filter_map(|line| match line {
                Line::Instruction(ins) => Some(ins),
                _ => None,
            })
    }
}

/// Escapes a string for an `.asciiz` directive.
pub(crate) fn escape_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }

    escaped
}

impl fmt::Display for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, ".data")?;

        for (label, text) in &self.data {
            writeln!(f, "{}: .asciiz \"{}\"", label, escape_string(text))?;
        }

        writeln!(f)?;
        writeln!(f, ".text")?;
        writeln!(f, ".globl main")?;
        writeln!(f)?;

        for line in &self.text {
            writeln!(f, "{}", line)?;
        }

        writeln!(f)?;
        f.write_str(RUNTIME_ROUTINES)
    }
}

fn frame(offset: i32) -> Address {
    Address { offset, base: Register::Fp }
}

fn stack(offset: i32) -> Address {
    Address { offset, base: Register::Sp }
}

fn add_immediate(rt: Register, rs: Register, imm: i32) -> Instruction {
    Instruction::AluImmediate { op: ImmediateOp::Add, rt, rs, imm }
}

fn alu(op: AluOp, rd: Register, rs: Register, rt: Register) -> Instruction {
    Instruction::Alu { op, rd, rs, rt }
}

fn xor_one(reg: Register) -> Instruction {
    Instruction::AluImmediate { op: ImmediateOp::Xor, rt: reg, rs: reg, imm: 1 }
}

struct CodeGen {
    assembly: Assembly,
    label_counter: usize,
    variables: HashMap<String, i32>,
    stack_offset: i32,
    function: String,
    logger: Logger,
}

impl CodeGen {
    fn emit(&mut self, instruction: Instruction) {
        self.assembly.text.push(Line::Instruction(instruction));
    }

    fn emit_label<S: Into<String>>(&mut self, label: S) {
        self.assembly.text.push(Line::Label(label.into()));
    }

    fn new_label(&mut self, prefix: &str) -> String {
        let label = format!("{}{}", prefix, self.label_counter);
        self.label_counter += 1;
        trace!(self.logger, "new label"; "label" => &label);
        label
    }

    fn add_string(&mut self, text: &str) -> String {
        let label = format!("str{}", self.assembly.data.len());
        trace!(self.logger, "add string constant"; "label" => &label, "text" => ?text);
        self.assembly.data.push((label.clone(), text.to_string()));
        label
    }

    fn variable(&self, name: &str) -> Result<Address, CodegenError> {
        match self.variables.get(name) {
            Some(offset) => Ok(frame(*offset)),
            None => Err(CodegenError::UnknownVariable {
                name: name.to_string(),
                function: self.function.clone(),
                suggestion: suggest(name, self.variables.keys().map(|k| k.as_str())),
            }),
        }
    }

    fn exit_label(&self) -> String {
        format!("{}_exit", self.function)
    }

    fn function(&mut self, function: &Function) -> Result<(), CodegenError> {
        debug!(self.logger, "generate function"; "function" => &function.name);

        self.function = function.name.clone();
        self.variables.clear();
        self.stack_offset = 0;

        self.emit_label(function.name.clone());
        self.emit(add_immediate(Register::Sp, Register::Sp, -8));
        self.emit(Instruction::StoreWord { rt: Register::Ra, address: stack(4) });
        self.emit(Instruction::StoreWord { rt: Register::Fp, address: stack(0) });
        self.emit(Instruction::Move { rd: Register::Fp, rs: Register::Sp });

        for statement in &function.body {
            self.statement(statement)?;
        }

        self.emit_label(self.exit_label());
        self.emit(Instruction::Move { rd: Register::Sp, rs: Register::Fp });
        self.emit(Instruction::LoadWord { rt: Register::Fp, address: stack(0) });
        self.emit(Instruction::LoadWord { rt: Register::Ra, address: stack(4) });
        self.emit(add_immediate(Register::Sp, Register::Sp, 8));
        self.emit(Instruction::JumpRegister { rs: Register::Ra });
        self.assembly.text.push(Line::Blank);

        Ok(())
    }

    fn body(&mut self, body: &[Statement]) -> Result<(), CodegenError> {
        for statement in body {
            self.statement(statement)?;
        }

        Ok(())
    }

    /// Gives the variable a fresh slot below the frame pointer, also when redeclared.
    ///
    /// `$sp` is set from `$fp`, leaving it below every slot allocated so far on any path.
    fn declare(&mut self, name: &str, init: &Option<Expression>) -> Result<(), CodegenError> {
        self.stack_offset += 4;

        let offset = -self.stack_offset;
        self.variables.insert(name.to_string(), offset);
        self.emit(add_immediate(Register::Sp, Register::Fp, offset));

        trace!(self.logger, "allocate variable"; "name" => name, "offset" => offset);

        if let Some(init) = init {
            self.expression(init)?;
            self.emit(Instruction::StoreWord { rt: Register::T0, address: frame(offset) });
        }

        Ok(())
    }

    fn statement(&mut self, statement: &Statement) -> Result<(), CodegenError> {
        match statement {
            Statement::Declaration { name, init } => self.declare(name, init)?,
            Statement::Expression(expr) => self.expression(expr)?,
            Statement::If { condition, then_body, else_body } => {
                let else_label = self.new_label("else");
                let end_label = self.new_label("endif");

                self.expression(condition)?;
                self.branch_if_zero(&else_label);
                self.body(then_body)?;
                self.emit(Instruction::Jump { label: end_label.clone() });
                self.emit_label(else_label);

                if let Some(else_body) = else_body {
                    self.body(else_body)?;
                }

                self.emit_label(end_label);
            },
            Statement::While { condition, body } => {
                let loop_label = self.new_label("while");
                let end_label = self.new_label("endwhile");

                self.emit_label(loop_label.clone());
                self.expression(condition)?;
                self.branch_if_zero(&end_label);
                self.body(body)?;
                self.emit(Instruction::Jump { label: loop_label });
                self.emit_label(end_label);
            },
            Statement::For { init, condition, update, body } => {
                let loop_label = self.new_label("for");
                let end_label = self.new_label("endfor");

                match init {
                    Some(ForInit::Declaration { name, init }) => self.declare(name, init)?,
                    Some(ForInit::Expression(expr)) => self.expression(expr)?,
                    None => (),
                }

                self.emit_label(loop_label.clone());

                if let Some(condition) = condition {
                    self.expression(condition)?;
                    self.branch_if_zero(&end_label);
                }

                self.body(body)?;

                if let Some(update) = update {
                    self.expression(update)?;
                }

                self.emit(Instruction::Jump { label: loop_label });
                self.emit_label(end_label);
            },
            Statement::Return(value) => {
                if let Some(value) = value {
                    self.expression(value)?;
                    self.emit(Instruction::Move { rd: Register::V0, rs: Register::T0 });
                }

                let label = self.exit_label();
                self.emit(Instruction::Jump { label });
            },
        }

        Ok(())
    }

    fn branch_if_zero(&mut self, label: &str) {
        self.emit(Instruction::Branch {
            condition: BranchCondition::Equal,
            rs: Register::T0,
            rt: Register::Zero,
            label: label.to_string(),
        });
    }

    fn step_target(&self, operand: &Expression) -> Result<Address, CodegenError> {
        match operand {
            Expression::Variable(name) => self.variable(name),
            _ => Err(CodegenError::InvalidStepOperand { function: self.function.clone() }),
        }
    }

    fn expression(&mut self, expr: &Expression) -> Result<(), CodegenError> {
        match expr {
            Expression::Number(value) => {
                self.emit(Instruction::LoadImmediate { rt: Register::T0, value: *value as i32 });
            },
            Expression::String(text) => {
                let label = self.add_string(text);
                self.emit(Instruction::LoadAddress { rt: Register::T0, label });
            },
            Expression::Variable(name) => {
                let address = self.variable(name)?;
                self.emit(Instruction::LoadWord { rt: Register::T0, address });
            },
            Expression::Assign { target, value } => {
                let address = match &**target {
                    Expression::Variable(name) => self.variable(name)?,
                    _ => return Err(CodegenError::InvalidAssignmentTarget {
                        function: self.function.clone(),
                    }),
                };

                self.expression(value)?;
                self.emit(Instruction::StoreWord { rt: Register::T0, address });
            },
            Expression::Binary { op, left, right } => {
                self.expression(left)?;
                self.emit(add_immediate(Register::Sp, Register::Sp, -4));
                self.emit(Instruction::StoreWord { rt: Register::T0, address: stack(0) });

                self.expression(right)?;
                self.emit(Instruction::Move { rd: Register::T1, rs: Register::T0 });

                self.emit(Instruction::LoadWord { rt: Register::T0, address: stack(0) });
                self.emit(add_immediate(Register::Sp, Register::Sp, 4));

                self.binary_op(*op);
            },
            Expression::PreOp { op, operand } => {
                let address = self.step_target(operand)?;

                self.emit(Instruction::LoadWord { rt: Register::T0, address });
                self.emit(add_immediate(Register::T0, Register::T0, op.delta()));
                self.emit(Instruction::StoreWord { rt: Register::T0, address });
            },
            Expression::PostOp { op, operand } => {
                let address = self.step_target(operand)?;

                self.emit(Instruction::LoadWord { rt: Register::T0, address });
                self.emit(Instruction::Move { rd: Register::T2, rs: Register::T0 });
                self.emit(add_immediate(Register::T0, Register::T0, op.delta()));
                self.emit(Instruction::StoreWord { rt: Register::T0, address });
                self.emit(Instruction::Move { rd: Register::T0, rs: Register::T2 });
            },
            Expression::Call { name, args } => self.call(name, args)?,
        }

        Ok(())
    }

    fn call(&mut self, name: &str, args: &[Expression]) -> Result<(), CodegenError> {
        if !BUILTINS.contains(&name) {
            warn!(self.logger, "call to a function that is not a builtin is ignored"; "name" => name);
            self.emit(Instruction::NoOperation);
            return Ok(());
        }

        if args.len() != 1 {
            return Err(CodegenError::ArgumentCount {
                name: name.to_string(),
                expected: 1,
                got: args.len(),
            });
        }

        self.expression(&args[0])?;
        self.emit(Instruction::Move { rd: Register::A0, rs: Register::T0 });
        self.emit(Instruction::JumpAndLink { label: name.to_string() });

        Ok(())
    }

    /// Combines `$t0` (left) and `$t1` (right) into `$t0`.
    fn binary_op(&mut self, op: BinaryOp) {
        use Register::{T0, T1, T2, T3, Zero};

        match op {
            BinaryOp::Add => self.emit(alu(AluOp::Add, T0, T0, T1)),
            BinaryOp::Subtract => self.emit(alu(AluOp::Subtract, T0, T0, T1)),
            BinaryOp::Multiply => self.emit(alu(AluOp::Multiply, T0, T0, T1)),
            BinaryOp::Divide => {
                self.emit(Instruction::Divide { rs: T0, rt: T1 });
                self.emit(Instruction::MoveFromLo { rd: T0 });
            },
            BinaryOp::Modulo => {
                self.emit(Instruction::Divide { rs: T0, rt: T1 });
                self.emit(Instruction::MoveFromHi { rd: T0 });
            },
            BinaryOp::Less => self.emit(alu(AluOp::SetLessThan, T0, T0, T1)),
            BinaryOp::Greater => self.emit(alu(AluOp::SetLessThan, T0, T1, T0)),
            BinaryOp::Equal => {
                // !((a < b) | (b < a)), without the overflow of comparing a - b against zero.
                self.emit(alu(AluOp::SetLessThan, T2, T0, T1));
                self.emit(alu(AluOp::SetLessThan, T3, T1, T0));
                self.emit(alu(AluOp::Or, T0, T2, T3));
                self.emit(xor_one(T0));
            },
            BinaryOp::NotEqual => {
                self.emit(alu(AluOp::Subtract, T0, T0, T1));
                self.emit(alu(AluOp::SetLessThanUnsigned, T0, Zero, T0));
                self.emit(Instruction::AluImmediate { op: ImmediateOp::And, rt: T0, rs: T0, imm: 1 });
            },
            BinaryOp::LessEqual => {
                self.emit(alu(AluOp::SetLessThan, T0, T1, T0));
                self.emit(xor_one(T0));
            },
            BinaryOp::GreaterEqual => {
                self.emit(alu(AluOp::SetLessThan, T0, T0, T1));
                self.emit(xor_one(T0));
            },
        }
    }
}

fn check_function_names(program: &Program) -> Result<(), CodegenError> {
    let mut seen = HashSet::new();

    for function in &program.functions {
        let name = function.name.as_str();

        let reserved = BUILTINS.contains(&name)
            || is_generated_label(name)
            || program.functions.iter().any(|other| name == format!("{}_exit", other.name));

        if reserved {
            return Err(CodegenError::ReservedName { name: name.to_string() });
        }

        if !seen.insert(name) {
            return Err(CodegenError::DuplicateFunction { name: name.to_string() });
        }
    }

    Ok(())
}

/// Generates assembly for `program`.
pub fn generate(program: &Program) -> Result<Assembly, CodegenError> {
    generate_with_logger(program, None)
}

pub fn generate_with_logger<L>(program: &Program, logger: L) -> Result<Assembly, CodegenError>
where
    L: Into<Option<Logger>>,
{
    let logger = logger.into()
        .unwrap_or(Logger::root(Discard, o!()))
        .new(o!("stage" => "codegen"));

    let mut gen = CodeGen {
        assembly: Assembly::default(),
        label_counter: 0,
        variables: HashMap::new(),
        stack_offset: 0,
        function: String::new(),
        logger,
    };

    check_function_names(program)?;

    for function in &program.functions {
        gen.function(function)?;
    }

    debug!(gen.logger, "code generation finished";
        "lines" => gen.assembly.text.len(),
        "strings" => gen.assembly.data.len());

    Ok(gen.assembly)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_str(source: &str) -> Result<Assembly, CodegenError> {
        let program = Program::parse(source).expect("could not parse");
        generate(&program)
    }

    fn instruction_lines(assembly: &Assembly) -> Vec<String> {
        assembly.instructions().map(|ins| ins.to_string()).collect()
    }

    #[test]
    fn test_return_constant_layout() {
        let assembly = generate_str("int main() { return 42; }").unwrap();

        let expected = "\
.data

.text
.globl main

main:
    addi $sp, $sp, -8
    sw $ra, 4($sp)
    sw $fp, 0($sp)
    move $fp, $sp
    li $t0, 42
    move $v0, $t0
    j main_exit
main_exit:
    move $sp, $fp
    lw $fp, 0($sp)
    lw $ra, 4($sp)
    addi $sp, $sp, 8
    jr $ra


print_int:
    li $v0, 1
    syscall
    jr $ra

print_str:
    li $v0, 4
    syscall
    jr $ra";

        assert_eq!(assembly.to_string(), expected);
    }

    #[test]
    fn test_declaration_offsets() {
        let assembly = generate_str("int main() { int a = 1; int b; b = a; }").unwrap();
        let lines = instruction_lines(&assembly);

        assert_eq!(&lines[4..11], &[
            "addi $sp, $fp, -4",
            "li $t0, 1",
            "sw $t0, -4($fp)",
            "addi $sp, $fp, -8",
            "lw $t0, -4($fp)",
            "sw $t0, -8($fp)",
            "move $sp, $fp",
        ]);
    }

    #[test]
    fn test_binary_operand_order() {
        let assembly = generate_str("int main() { int a; int b; a - b; }").unwrap();
        let lines = instruction_lines(&assembly);

        assert_eq!(&lines[6..13], &[
            "lw $t0, -4($fp)",
            "addi $sp, $sp, -4",
            "sw $t0, 0($sp)",
            "lw $t0, -8($fp)",
            "move $t1, $t0",
            "lw $t0, 0($sp)",
            "addi $sp, $sp, 4",
        ]);
        assert_eq!(lines[13], "sub $t0, $t0, $t1");
    }

    #[test]
    fn test_comparison_lowering() {
        let cases: &[(&str, &[&str])] = &[
            ("<", &["slt $t0, $t0, $t1"]),
            (">", &["slt $t0, $t1, $t0"]),
            ("<=", &["slt $t0, $t1, $t0", "xori $t0, $t0, 1"]),
            (">=", &["slt $t0, $t0, $t1", "xori $t0, $t0, 1"]),
            ("!=", &["sub $t0, $t0, $t1", "sltu $t0, $zero, $t0", "andi $t0, $t0, 1"]),
            ("==", &[
                "slt $t2, $t0, $t1",
                "slt $t3, $t1, $t0",
                "or $t0, $t2, $t3",
                "xori $t0, $t0, 1",
            ]),
        ];

        for (op, expected) in cases {
            let source = format!("int main() {{ 1 {} 2; }}", op);
            let lines = instruction_lines(&generate_str(&source).unwrap());

            // Prologue (4) + left, push (3) + right, move, pop (4).
            assert_eq!(&lines[11..11 + expected.len()], *expected, "operator {}", op);
        }
    }

    #[test]
    fn test_string_constants() {
        let assembly = generate_str(r#"int main() { print_str("a\"b\n"); print_str("c"); }"#).unwrap();

        assert_eq!(assembly.data, vec![
            ("str0".to_string(), "a\"b\n".to_string()),
            ("str1".to_string(), "c".to_string()),
        ]);

        let text = assembly.to_string();
        assert!(text.starts_with(".data\nstr0: .asciiz \"a\\\"b\\n\"\nstr1: .asciiz \"c\"\n\n.text"));
        assert!(text.contains("    la $t0, str0\n    move $a0, $t0\n    jal print_str\n"));
    }

    #[test]
    fn test_unique_labels() {
        let source = "int main() {
            int i;
            for (i = 0; i < 3; i++) {
                if (i) { while (0) { } } else { }
            }
            while (1) { if (0) return 1; }
        }";

        let assembly = generate_str(source).unwrap();
        let labels: Vec<_> = assembly.labels().collect();

        assert_eq!(labels.len(), 2 + 2 * 5);

        let mut unique = labels.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), labels.len());

        assert!(labels.contains(&"for0"));
        assert!(labels.contains(&"endfor1"));
        assert!(labels.contains(&"else2"));
    }

    #[test]
    fn test_return_targets_own_epilogue() {
        let assembly = generate_str("void f() { return; } int main() { return 1; }").unwrap();
        let lines = instruction_lines(&assembly);

        assert!(lines.contains(&"j f_exit".to_string()));
        assert!(lines.contains(&"j main_exit".to_string()));
    }

    #[test]
    fn test_unknown_variable() {
        let err = generate_str("int main() { int count; counter = 1; }").unwrap_err();

        assert_eq!(err, CodegenError::UnknownVariable {
            name: "counter".into(),
            function: "main".into(),
            suggestion: Some("count".into()),
        });
        assert_eq!(
            err.to_string(),
            "unknown variable `counter` in function `main` (did you mean `count`?)",
        );
    }

    #[test]
    fn test_variables_are_function_scoped() {
        let err = generate_str("void f() { int x; } int main() { x = 1; }").unwrap_err();

        match err {
            CodegenError::UnknownVariable { ref name, ref function, .. } => {
                assert_eq!(name, "x");
                assert_eq!(function, "main");
            },
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_targets() {
        assert_eq!(
            generate_str("int main() { 1 = 2; }").unwrap_err(),
            CodegenError::InvalidAssignmentTarget { function: "main".into() },
        );

        assert_eq!(
            generate_str("int main() { 5++; }").unwrap_err(),
            CodegenError::InvalidStepOperand { function: "main".into() },
        );
    }

    #[test]
    fn test_builtin_arity_and_unknown_calls() {
        assert_eq!(
            generate_str("int main() { print_int(1, 2); }").unwrap_err(),
            CodegenError::ArgumentCount { name: "print_int".into(), expected: 1, got: 2 },
        );

        let assembly = generate_str("int main() { helper(1); }").unwrap();
        assert_eq!(instruction_lines(&assembly)[4], "nop");
    }

    #[test]
    fn test_function_names_clashing_with_labels() {
        for name in &["else0", "endwhile12", "str0", "print_int", "main_exit"] {
            let source = format!("void {}() {{ }} int main() {{ if (1) {{ }} return 0; }}", name);

            assert_eq!(
                generate_str(&source).unwrap_err(),
                CodegenError::ReservedName { name: name.to_string() },
            );
        }

        assert_eq!(
            generate_str("int f() { } int main() { } void f() { }").unwrap_err(),
            CodegenError::DuplicateFunction { name: "f".into() },
        );

        assert!(generate_str("void else_x() { } void str() { } int main() { }").is_ok());
    }
}
