//! types for representing instructions and their parts

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;

/// The 32 general purpose registers of the target machine.
///
/// Every register has a fixed purpose by convention, but only [Register::Zero] is treated
/// specially by the [Emulator](crate::emulator::Emulator): writes to it are discarded and reads
/// from it always return zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    Zero,
    At,
    V0,
    V1,
    A0,
    A1,
    A2,
    A3,
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
    T7,
    S0,
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    T8,
    T9,
    K0,
    K1,
    Gp,
    Sp,
    Fp,
    Ra,
}

lazy_static! {
    static ref REGISTER_NAMES: HashMap<&'static str, Register> = Register::ALL
        .iter()
        .map(|reg| (reg.name(), *reg))
        .collect();
}

impl Register {
    /// All registers, ordered by their index.
    pub const ALL: [Register; 32] = [
        Register::Zero, Register::At, Register::V0, Register::V1,
        Register::A0, Register::A1, Register::A2, Register::A3,
        Register::T0, Register::T1, Register::T2, Register::T3,
        Register::T4, Register::T5, Register::T6, Register::T7,
        Register::S0, Register::S1, Register::S2, Register::S3,
        Register::S4, Register::S5, Register::S6, Register::S7,
        Register::T8, Register::T9, Register::K0, Register::K1,
        Register::Gp, Register::Sp, Register::Fp, Register::Ra,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Register> {
        Register::ALL.get(index).copied()
    }

    /// The canonical assembly name of the register, including the `$` prefix.
    pub fn name(&self) -> &'static str {
        match self {
            Register::Zero => "$zero",
            Register::At => "$at",
            Register::V0 => "$v0",
            Register::V1 => "$v1",
            Register::A0 => "$a0",
            Register::A1 => "$a1",
            Register::A2 => "$a2",
            Register::A3 => "$a3",
            Register::T0 => "$t0",
            Register::T1 => "$t1",
            Register::T2 => "$t2",
            Register::T3 => "$t3",
            Register::T4 => "$t4",
            Register::T5 => "$t5",
            Register::T6 => "$t6",
            Register::T7 => "$t7",
            Register::S0 => "$s0",
            Register::S1 => "$s1",
            Register::S2 => "$s2",
            Register::S3 => "$s3",
            Register::S4 => "$s4",
            Register::S5 => "$s5",
            Register::S6 => "$s6",
            Register::S7 => "$s7",
            Register::T8 => "$t8",
            Register::T9 => "$t9",
            Register::K0 => "$k0",
            Register::K1 => "$k1",
            Register::Gp => "$gp",
            Register::Sp => "$sp",
            Register::Fp => "$fp",
            Register::Ra => "$ra",
        }
    }

    pub(crate) fn names() -> impl Iterator<Item = &'static str> {
        (0..Register::ALL.len()).filter_map(Register::from_index).map(|reg| reg.name())
    }
}

impl FromStr for Register {
    type Err = ();

    fn from_str(name: &str) -> Result<Register, ()> {
        REGISTER_NAMES.get(name).copied().ok_or(())
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operations shared by the three-register and the immediate forms of the ALU instructions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Subtract,
    Multiply,
    And,
    Or,
    Xor,
    /// Signed comparison. The result is `1` if the first operand is less than the second.
    SetLessThan,
    /// Unsigned comparison. The result is `1` if the first operand is less than the second.
    SetLessThanUnsigned,
}

impl AluOp {
    /// Applies the operation to two 32-bit words. All arithmetic wraps.
    pub fn apply(self, a: u32, b: u32) -> u32 {
        match self {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Subtract => a.wrapping_sub(b),
            AluOp::Multiply => a.wrapping_mul(b),
            AluOp::And => a & b,
            AluOp::Or => a | b,
            AluOp::Xor => a ^ b,
            AluOp::SetLessThan => ((a as i32) < (b as i32)) as u32,
            AluOp::SetLessThanUnsigned => (a < b) as u32,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Subtract => "sub",
            AluOp::Multiply => "mul",
            AluOp::And => "and",
            AluOp::Or => "or",
            AluOp::Xor => "xor",
            AluOp::SetLessThan => "slt",
            AluOp::SetLessThanUnsigned => "sltu",
        }
    }
}

/// The subset of [AluOp] that has an immediate form.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImmediateOp {
    Add,
    And,
    Or,
    Xor,
    SetLessThan,
    SetLessThanUnsigned,
}

impl ImmediateOp {
    pub fn alu(self) -> AluOp {
        match self {
            ImmediateOp::Add => AluOp::Add,
            ImmediateOp::And => AluOp::And,
            ImmediateOp::Or => AluOp::Or,
            ImmediateOp::Xor => AluOp::Xor,
            ImmediateOp::SetLessThan => AluOp::SetLessThan,
            ImmediateOp::SetLessThanUnsigned => AluOp::SetLessThanUnsigned,
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            ImmediateOp::Add => "addi",
            ImmediateOp::And => "andi",
            ImmediateOp::Or => "ori",
            ImmediateOp::Xor => "xori",
            ImmediateOp::SetLessThan => "slti",
            ImmediateOp::SetLessThanUnsigned => "sltiu",
        }
    }
}

/// Describes the predicate of a conditional branch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BranchCondition {
    /// Branch if both registers hold the same value. (`beq`)
    Equal,

    /// Branch if the registers hold different values. (`bne`)
    NotEqual,
}

impl BranchCondition {
    pub fn holds(self, a: u32, b: u32) -> bool {
        match self {
            BranchCondition::Equal => a == b,
            BranchCondition::NotEqual => a != b,
        }
    }
}

/// A memory operand of the form `offset(register)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Address {
    pub offset: i32,
    pub base: Register,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({})", self.offset, self.base)
    }
}

/// Instructions understood by the [Emulator](crate::emulator::Emulator).
///
/// Labels are kept symbolic and resolved at execution time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// `li rt, imm`
    LoadImmediate { rt: Register, value: i32 },

    /// `la rt, label`. Loads the address of a string in the data section, copying the string
    /// into memory the first time its address is taken.
    LoadAddress { rt: Register, label: String },

    /// `move rd, rs`
    Move { rd: Register, rs: Register },

    /// `add`, `sub`, `mul`, `and`, `or`, `xor`, `slt` and `sltu`.
    Alu { op: AluOp, rd: Register, rs: Register, rt: Register },

    /// `addi`, `andi`, `ori`, `xori`, `slti` and `sltiu`. The immediate is sign-extended.
    AluImmediate { op: ImmediateOp, rt: Register, rs: Register, imm: i32 },

    /// `div rs, rt`. Stores the quotient in `lo` and the remainder in `hi`.
    Divide { rs: Register, rt: Register },

    /// `mflo rd`
    MoveFromLo { rd: Register },

    /// `mfhi rd`
    MoveFromHi { rd: Register },

    /// `lw rt, offset(base)`
    LoadWord { rt: Register, address: Address },

    /// `sw rt, offset(base)`
    StoreWord { rt: Register, address: Address },

    /// `beq` and `bne`.
    Branch { condition: BranchCondition, rs: Register, rt: Register, label: String },

    /// `j label`
    Jump { label: String },

    /// `jal label`. Calls to `print_int` and `print_str` are performed by the emulator itself.
    JumpAndLink { label: String },

    /// `jr rs`
    JumpRegister { rs: Register },

    Syscall,

    NoOperation,
}

impl Instruction {
    /// The mnemonic of the instruction as written in assembly.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::LoadImmediate { .. } => "li",
            Instruction::LoadAddress { .. } => "la",
            Instruction::Move { .. } => "move",
            Instruction::Alu { op, .. } => op.mnemonic(),
            Instruction::AluImmediate { op, .. } => op.mnemonic(),
            Instruction::Divide { .. } => "div",
            Instruction::MoveFromLo { .. } => "mflo",
            Instruction::MoveFromHi { .. } => "mfhi",
            Instruction::LoadWord { .. } => "lw",
            Instruction::StoreWord { .. } => "sw",
            Instruction::Branch { condition: BranchCondition::Equal, .. } => "beq",
            Instruction::Branch { condition: BranchCondition::NotEqual, .. } => "bne",
            Instruction::Jump { .. } => "j",
            Instruction::JumpAndLink { .. } => "jal",
            Instruction::JumpRegister { .. } => "jr",
            Instruction::Syscall => "syscall",
            Instruction::NoOperation => "nop",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mnemonic = self.mnemonic();

        match self {
            Instruction::LoadImmediate { rt, value } => write!(f, "{} {}, {}", mnemonic, rt, value),
            Instruction::LoadAddress { rt, label } => write!(f, "{} {}, {}", mnemonic, rt, label),
            Instruction::Move { rd, rs } => write!(f, "{} {}, {}", mnemonic, rd, rs),
            Instruction::Alu { rd, rs, rt, .. } => write!(f, "{} {}, {}, {}", mnemonic, rd, rs, rt),
            Instruction::AluImmediate { rt, rs, imm, .. } => {
                write!(f, "{} {}, {}, {}", mnemonic, rt, rs, imm)
            },
            Instruction::Divide { rs, rt } => write!(f, "{} {}, {}", mnemonic, rs, rt),
            Instruction::MoveFromLo { rd } | Instruction::MoveFromHi { rd } => {
                write!(f, "{} {}", mnemonic, rd)
            },
            Instruction::LoadWord { rt, address } | Instruction::StoreWord { rt, address } => {
                write!(f, "{} {}, {}", mnemonic, rt, address)
            },
            Instruction::Branch { rs, rt, label, .. } => {
                write!(f, "{} {}, {}, {}", mnemonic, rs, rt, label)
            },
            Instruction::Jump { label } | Instruction::JumpAndLink { label } => {
                write!(f, "{} {}", mnemonic, label)
            },
            Instruction::JumpRegister { rs } => write!(f, "{} {}", mnemonic, rs),
            Instruction::Syscall | Instruction::NoOperation => f.write_str(mnemonic),
        }
    }
}

#[test]
fn test_register_names() {
    for (index, reg) in Register::ALL.iter().enumerate() {
        assert_eq!(reg.index(), index);
        assert_eq!(Register::from_index(index), Some(*reg));
        assert_eq!(reg.name().parse::<Register>(), Ok(*reg));
    }

    assert_eq!("$t8".parse::<Register>(), Ok(Register::T8));
    assert_eq!("$fp".parse::<Register>(), Ok(Register::Fp));
    assert_eq!("$t10".parse::<Register>(), Err(()));
    assert_eq!("t0".parse::<Register>(), Err(()));
    assert_eq!(Register::from_index(32), None);
}

#[test]
fn test_alu_signedness() {
    let minus_one = -1i32 as u32;

    assert_eq!(AluOp::SetLessThan.apply(minus_one, 1), 1);
    assert_eq!(AluOp::SetLessThanUnsigned.apply(minus_one, 1), 0);
    assert_eq!(AluOp::Add.apply(u32::MAX, 1), 0);
    assert_eq!(AluOp::Subtract.apply(0, 1), u32::MAX);
    assert_eq!(AluOp::Multiply.apply(minus_one, 3) as i32, -3);
}

#[test]
fn test_instruction_display() {
    let ins = Instruction::StoreWord {
        rt: Register::T0,
        address: Address { offset: -4, base: Register::Fp },
    };
    assert_eq!(ins.to_string(), "sw $t0, -4($fp)");

    let ins = Instruction::AluImmediate {
        op: ImmediateOp::Xor,
        rt: Register::T0,
        rs: Register::T0,
        imm: 1,
    };
    assert_eq!(ins.to_string(), "xori $t0, $t0, 1");

    let ins = Instruction::Branch {
        condition: BranchCondition::Equal,
        rs: Register::T0,
        rt: Register::Zero,
        label: "endwhile1".into(),
    };
    assert_eq!(ins.to_string(), "beq $t0, $zero, endwhile1");
    assert_eq!(Instruction::Syscall.to_string(), "syscall");
}
