//! [Emulator] for executing [assembly programs](crate::asm::Program).

use slog::{debug, o, trace, Discard, Logger};

use std::collections::HashMap;
use std::fmt;
use std::io::Write;

use crate::asm::Program;
use crate::event::{Event, EventDispatcher, EventListener};
use crate::instruction::{Address, Instruction, Register};
use crate::utils::{did_you_mean, suggest};

/// Contains the execution environment of the processor.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Index of the next instruction to be executed.
    pub pc: usize,

    /// Values of the general purpose registers, indexed by [Register::index].
    pub r: [u32; 32],

    /// Quotient of the latest `div`.
    pub lo: u32,

    /// Remainder of the latest `div`.
    pub hi: u32,
}

impl Context {
    pub fn register(&self, register: Register) -> u32 {
        match register {
            Register::Zero => 0,
            _ => self.r[register.index()],
        }
    }
}

/// Sparse byte addressable memory. Unmapped bytes read as zero.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    bytes: HashMap<u32, u8>,
}

impl Memory {
    pub fn new() -> Memory {
        Memory::default()
    }

    pub fn read_byte(&self, address: u32) -> u8 {
        self.bytes.get(&address).copied().unwrap_or(0)
    }

    pub fn write_byte(&mut self, address: u32, value: u8) {
        self.bytes.insert(address, value);
    }

    /// Reads a little-endian word.
    pub fn read_word(&self, address: u32) -> u32 {
        (0..4).fold(0, |word, i| {
            word | (self.read_byte(address.wrapping_add(i)) as u32) << (i * 8)
        })
    }

    /// Writes a little-endian word.
    pub fn write_word(&mut self, address: u32, word: u32) {
        for i in 0..4 {
            self.write_byte(address.wrapping_add(i), (word >> (i * 8)) as u8);
        }
    }

    /// Reads bytes up to the first zero byte.
    pub fn read_string(&self, address: u32) -> String {
        let mut bytes = Vec::new();
        let mut address = address;

        loop {
            match self.read_byte(address) {
                0 => break,
                byte => bytes.push(byte),
            }

            address = address.wrapping_add(1);
        }

        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Writes `text` followed by a zero byte.
    pub fn write_string(&mut self, address: u32, text: &str) {
        let mut address = address;

        for byte in text.bytes().chain(std::iter::once(0)) {
            self.write_byte(address, byte);
            address = address.wrapping_add(1);
        }
    }
}

/// Interface to the console, used by the `print_int` and `print_str` builtins and the
/// corresponding syscalls.
pub trait InputOutput {
    /// Print a signed integer, without any separator.
    fn print_int(&mut self, value: i32);

    /// Print a string as is.
    fn print_str(&mut self, text: &str);
}

/// An IO handler that writes to the standard output.
pub struct StdIo;

impl InputOutput for StdIo {
    fn print_int(&mut self, value: i32) {
        print!("{}", value);
        let _ = std::io::stdout().flush();
    }

    fn print_str(&mut self, text: &str) {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }
}

/// An IO handler for testing purposes.
///
/// Appends everything printed to an output buffer.
#[derive(Debug, Default)]
pub struct TestIo {
    output_buffer: String,
}

impl TestIo {
    pub fn new() -> TestIo {
        TestIo::default()
    }

    pub fn output(&self) -> &str {
        &self.output_buffer
    }

    pub fn into_output(self) -> String {
        self.output_buffer
    }
}

impl InputOutput for TestIo {
    fn print_int(&mut self, value: i32) {
        self.output_buffer.push_str(&value.to_string());
    }

    fn print_str(&mut self, text: &str) {
        self.output_buffer.push_str(text);
    }
}

impl InputOutput for &mut TestIo {
    fn print_int(&mut self, value: i32) {
        (**self).print_int(value)
    }

    fn print_str(&mut self, text: &str) {
        (**self).print_str(text)
    }
}

/// Settings of the emulated machine.
#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    /// Label at which the execution starts.
    pub entry: String,

    /// Initial value of `$sp`.
    pub stack_pointer: u32,

    /// Number of instructions executed before the emulator gives up.
    pub max_steps: usize,

    /// Address at which the strings of the data section are placed.
    pub data_base: u32,
}

impl Default for EmulatorConfig {
    fn default() -> EmulatorConfig {
        EmulatorConfig {
            entry: "main".to_string(),
            stack_pointer: 0x7fff_fffc,
            max_steps: 100_000,
            data_base: 0x1000_0000,
        }
    }
}

/// Reason for a normal end of execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// The program counter moved past the last instruction.
    EndOfProgram,

    /// `jr $ra` was executed while `$ra` was zero.
    Returned,

    /// Syscall 10.
    Exit,

    /// The configured maximum number of instructions was executed.
    StepLimit,
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Halt::EndOfProgram => write!(f, "reached the end of the program"),
            Halt::Returned => write!(f, "returned from the entry point"),
            Halt::Exit => write!(f, "exited"),
            Halt::StepLimit => write!(f, "step limit reached"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EmulationError {
    /// The program has no text label to start the execution from.
    MissingEntryPoint {
        entry: String,
    },

    /// A jump, branch or `la` refers to a label that is not defined, or is defined in the
    /// wrong section.
    UnknownLabel {
        label: String,
        suggestion: Option<String>,
    },

    DivisionByZero {
        /// Index of the `div` instruction.
        pc: usize,
    },

    UnknownSyscall {
        code: u32,
    },
}

impl fmt::Display for EmulationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EmulationError::MissingEntryPoint { entry } => {
                write!(f, "no `{}` label to start the execution from", entry)
            },
            EmulationError::UnknownLabel { label, suggestion } => {
                write!(f, "unknown label `{}`{}", label, did_you_mean(suggestion))
            },
            EmulationError::DivisionByZero { pc } => {
                write!(f, "division by zero at instruction {}", pc)
            },
            EmulationError::UnknownSyscall { code } => write!(f, "unknown syscall code {}", code),
        }
    }
}

impl std::error::Error for EmulationError {}

fn align4(value: u32) -> u32 {
    value.wrapping_add(3) & !3
}

/// The emulator contains all neccessary context for executing a program
/// and an interface for doing IO.
pub struct Emulator<IO> {
    /// The program being executed.
    pub program: Program,

    /// The execution context, which includes the registers and the program counter.
    pub context: Context,

    pub memory: Memory,

    /// Interface for console output.
    pub io: IO,

    /// Set once the execution has stopped normally.
    pub halted: Option<Halt>,

    /// Number of instructions executed so far.
    pub steps: usize,

    config: EmulatorConfig,

    /// Addresses of the strings copied into memory so far, by data section index.
    string_addresses: HashMap<usize, u32>,
    next_data_address: u32,

    dispatcher: EventDispatcher,
    logger: Logger,
}

impl<IO> Emulator<IO> where IO: InputOutput {
    /// Create a new emulator with the default configuration.
    ///
    /// # Errors
    /// Returns [EmulationError::MissingEntryPoint] if the program has no `main` label.
    pub fn new(program: Program, io: IO) -> Result<Emulator<IO>, EmulationError> {
        Emulator::with_config(program, io, EmulatorConfig::default(), None)
    }

    pub fn with_logger<L>(program: Program, io: IO, logger: L) -> Result<Emulator<IO>, EmulationError>
    where
        L: Into<Option<Logger>>,
    {
        Emulator::with_config(program, io, EmulatorConfig::default(), logger)
    }

    pub fn with_config<L>(
        program: Program,
        io: IO,
        config: EmulatorConfig,
        logger: L,
    ) -> Result<Emulator<IO>, EmulationError>
    where
        L: Into<Option<Logger>>,
    {
        let logger = logger.into()
            .unwrap_or(Logger::root(Discard, o!()))
            .new(o!("stage" => "emulation"));

        let entry = match program.text_label(&config.entry) {
            Some(entry) => entry,
            None => return Err(EmulationError::MissingEntryPoint {
                entry: config.entry.clone(),
            }),
        };

        let mut context = Context::default();
        context.pc = entry;
        context.r[Register::Sp.index()] = config.stack_pointer;

        debug!(logger, "emulator initialized";
            "entry" => &config.entry,
            "pc" => entry,
            "instructions" => program.instructions.len());

        Ok(Emulator {
            program,
            context,
            memory: Memory::new(),
            io,
            halted: None,
            steps: 0,
            next_data_address: config.data_base,
            config,
            string_addresses: HashMap::new(),
            dispatcher: EventDispatcher::new(),
            logger,
        })
    }

    pub fn add_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.dispatcher.add_listener(listener);
    }

    pub fn register(&self, register: Register) -> u32 {
        self.context.register(register)
    }

    /// Writes a register. Writes to `$zero` are discarded.
    pub fn set_register(&mut self, register: Register, data: u32) {
        if register == Register::Zero {
            return;
        }

        self.context.r[register.index()] = data;
        self.dispatcher.dispatch(Event::RegisterChange { register, data });
    }

    fn halt(&mut self, reason: Halt) {
        debug!(self.logger, "halted"; "reason" => %reason, "steps" => self.steps);
        self.halted = Some(reason);
        self.dispatcher.dispatch(Event::Halted { reason });
    }

    fn resolve_text(&self, label: &str) -> Result<usize, EmulationError> {
        match self.program.text_label(label) {
            Some(index) => Ok(index),
            None => Err(EmulationError::UnknownLabel {
                label: label.to_string(),
                suggestion: self.program.symbol_table.suggest(label),
            }),
        }
    }

    /// Address of a data section string, copying it into memory on first use.
    fn string_address(&mut self, label: &str) -> Result<u32, EmulationError> {
        let (index, text) = match self.program.data_label(label) {
            Some(string) => string,
            None => return Err(EmulationError::UnknownLabel {
                label: label.to_string(),
                suggestion: suggest(label, self.program.strings.iter().map(|s| s.label.as_str())),
            }),
        };

        if let Some(address) = self.string_addresses.get(&index) {
            return Ok(*address);
        }

        let address = self.next_data_address;

        self.memory.write_string(address, text);
        self.next_data_address = align4(address.wrapping_add(text.len() as u32 + 1));
        self.string_addresses.insert(index, address);

        trace!(self.logger, "string copied into memory"; "label" => label, "address" => address);

        Ok(address)
    }

    fn effective_address(&self, address: &Address) -> u32 {
        self.register(address.base).wrapping_add(address.offset as u32)
    }

    fn print_int(&mut self) {
        let value = self.register(Register::A0) as i32;
        let text = value.to_string();

        self.io.print_int(value);
        self.dispatcher.dispatch(Event::Output { text: &text });
    }

    fn print_str(&mut self) {
        let text = self.memory.read_string(self.register(Register::A0));

        self.io.print_str(&text);
        self.dispatcher.dispatch(Event::Output { text: &text });
    }

    /// Execute an instruction.
    ///
    /// The program counter must already point to the following instruction.
    pub fn execute(&mut self, instruction: &Instruction) -> Result<(), EmulationError> {
        match instruction {
            Instruction::LoadImmediate { rt, value } => self.set_register(*rt, *value as u32),
            Instruction::LoadAddress { rt, label } => {
                let address = self.string_address(label)?;
                self.set_register(*rt, address);
            },
            Instruction::Move { rd, rs } => {
                let value = self.register(*rs);
                self.set_register(*rd, value);
            },
            Instruction::Alu { op, rd, rs, rt } => {
                let value = op.apply(self.register(*rs), self.register(*rt));
                self.set_register(*rd, value);
            },
            Instruction::AluImmediate { op, rt, rs, imm } => {
                let value = op.alu().apply(self.register(*rs), *imm as u32);
                self.set_register(*rt, value);
            },
            Instruction::Divide { rs, rt } => {
                let dividend = self.register(*rs) as i32;
                let divisor = self.register(*rt) as i32;

                if divisor == 0 {
                    return Err(EmulationError::DivisionByZero {
                        pc: self.context.pc.wrapping_sub(1),
                    });
                }

                self.context.lo = dividend.wrapping_div(divisor) as u32;
                self.context.hi = dividend.wrapping_rem(divisor) as u32;
            },
            Instruction::MoveFromLo { rd } => {
                let value = self.context.lo;
                self.set_register(*rd, value);
            },
            Instruction::MoveFromHi { rd } => {
                let value = self.context.hi;
                self.set_register(*rd, value);
            },
            Instruction::LoadWord { rt, address } => {
                let value = self.memory.read_word(self.effective_address(address));
                self.set_register(*rt, value);
            },
            Instruction::StoreWord { rt, address } => {
                let address = self.effective_address(address);
                let data = self.register(*rt);

                self.memory.write_word(address, data);
                self.dispatcher.dispatch(Event::MemoryChange { address, data });
            },
            Instruction::Branch { condition, rs, rt, label } => {
                if condition.holds(self.register(*rs), self.register(*rt)) {
                    self.context.pc = self.resolve_text(label)?;
                }
            },
            Instruction::Jump { label } => {
                self.context.pc = self.resolve_text(label)?;
            },
            Instruction::JumpAndLink { label } => match label.as_str() {
                "print_int" => self.print_int(),
                "print_str" => self.print_str(),
                _ => {
                    let target = self.resolve_text(label)?;
                    let link = self.context.pc as u32;

                    self.set_register(Register::Ra, link);
                    self.context.pc = target;
                },
            },
            Instruction::JumpRegister { rs } => {
                let target = self.register(*rs);

                if *rs == Register::Ra && target == 0 {
                    self.halt(Halt::Returned);
                } else {
                    self.context.pc = target as usize;
                }
            },
            Instruction::Syscall => match self.register(Register::V0) {
                1 => self.print_int(),
                4 => self.print_str(),
                10 => self.halt(Halt::Exit),
                code => return Err(EmulationError::UnknownSyscall { code }),
            },
            Instruction::NoOperation => (),
        }

        Ok(())
    }

    /// Fetches the next instruction, increments the program counter and executes the instruction.
    ///
    /// Halts with [Halt::EndOfProgram] if the program counter is past the last instruction.
    pub fn step(&mut self) -> Result<(), EmulationError> {
        if self.halted.is_some() {
            return Ok(());
        }

        let pc = self.context.pc;

        let (instruction, line) = match self.program.instructions.get(pc) {
            Some(entry) => (entry.instruction.clone(), entry.line),
            None => {
                self.halt(Halt::EndOfProgram);
                return Ok(());
            },
        };

        trace!(self.logger, "execute"; "pc" => pc, "line" => line, "instruction" => %instruction);

        self.dispatcher.dispatch(Event::Execute {
            pc,
            line,
            instruction: &instruction,
        });

        self.steps += 1;
        self.context.pc = pc + 1;

        self.execute(&instruction)
    }

    /// Executes the program until it halts or an error occurs.
    ///
    /// Running into the step limit is a normal halt, not an error.
    pub fn run(&mut self) -> Result<Halt, EmulationError> {
        loop {
            if let Some(reason) = self.halted {
                return Ok(reason);
            }

            if self.steps >= self.config.max_steps {
                self.halt(Halt::StepLimit);
                continue;
            }

            self.step()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    struct RegisterLog(Rc<RefCell<Vec<Register>>>);

    impl EventListener for RegisterLog {
        fn event(&mut self, event: &Event) {
            if let Event::RegisterChange { register, .. } = event {
                self.0.borrow_mut().push(*register);
            }
        }
    }

    fn emulator(source: &str) -> Emulator<TestIo> {
        let program = Program::parse(source).expect("could not load program");
        Emulator::new(program, TestIo::new()).expect("could not initialize emulator")
    }

    #[test]
    fn test_zero_register() {
        let mut emulator = emulator("
            main:
                li $zero, 5
                addi $zero, $zero, 7
                lw $zero, 0($sp)
                move $t0, $zero
                addi $t1, $zero, 3
        ");

        let changes = Rc::new(RefCell::new(Vec::new()));
        emulator.add_listener(RegisterLog(changes.clone()));

        assert_eq!(emulator.run(), Ok(Halt::EndOfProgram));
        assert_eq!(emulator.register(Register::Zero), 0);
        assert_eq!(emulator.context.r[0], 0);
        assert_eq!(emulator.register(Register::T1), 3);
        assert_eq!(*changes.borrow(), vec![Register::T0, Register::T1]);
    }

    #[test]
    fn test_memory_is_little_endian() {
        let mut memory = Memory::new();
        memory.write_word(0x100, 0x0102_0304);

        assert_eq!(memory.read_byte(0x100), 0x04);
        assert_eq!(memory.read_byte(0x103), 0x01);
        assert_eq!(memory.read_word(0x100), 0x0102_0304);
        assert_eq!(memory.read_word(0x102), 0x0000_0102);
        assert_eq!(memory.read_word(0x5000), 0);
    }

    #[test]
    fn test_stack_pointer_and_stores() {
        let mut emulator = emulator("
            main:
                li $t0, -2
                addi $sp, $sp, -4
                sw $t0, 0($sp)
                lw $t1, 0($sp)
        ");

        emulator.run().unwrap();

        assert_eq!(emulator.register(Register::Sp), 0x7fff_fff8);
        assert_eq!(emulator.register(Register::T1) as i32, -2);
        assert_eq!(emulator.memory.read_word(0x7fff_fff8), 0xffff_fffe);
    }

    #[test]
    fn test_signed_division() {
        let mut emulator = emulator("
            main:
                li $t0, -7
                li $t1, 2
                div $t0, $t1
                mflo $t2
                mfhi $t3
        ");

        emulator.run().unwrap();

        assert_eq!(emulator.register(Register::T2) as i32, -3);
        assert_eq!(emulator.register(Register::T3) as i32, -1);
    }

    #[test]
    fn test_division_by_zero_stops_execution() {
        let mut emulator = emulator("
            main:
                li $t0, 1
                div $t0, $zero
                li $t5, 9
        ");

        assert_eq!(emulator.run(), Err(EmulationError::DivisionByZero { pc: 1 }));
        assert_eq!(emulator.register(Register::T5), 0);
        assert_eq!(emulator.halted, None);
    }

    #[test]
    fn test_call_and_return() {
        let mut emulator = emulator("
            double:
                add $v0, $a0, $a0
                jr $ra
            main:
                li $a0, 21
                jal double
                move $s0, $v0
                li $ra, 0
                jr $ra
                li $s1, 1
        ");

        assert_eq!(emulator.run(), Ok(Halt::Returned));
        assert_eq!(emulator.register(Register::S0), 42);
        assert_eq!(emulator.register(Register::S1), 0);
    }

    #[test]
    fn test_builtins_are_intercepted() {
        let mut emulator = emulator("
            .data
            msg: .asciiz \"n=\"
            .text
            main:
                la $a0, msg
                jal print_str
                li $a0, -15
                jal print_int
        ");

        assert_eq!(emulator.run(), Ok(Halt::EndOfProgram));
        assert_eq!(emulator.io.output(), "n=-15");
        assert_eq!(emulator.register(Register::Ra), 0);
    }

    #[test]
    fn test_syscalls() {
        let mut emulator = emulator("
            main:
                li $v0, 1
                li $a0, 7
                syscall
                li $v0, 10
                syscall
                li $a0, 8
                li $v0, 1
                syscall
        ");

        assert_eq!(emulator.run(), Ok(Halt::Exit));
        assert_eq!(emulator.io.output(), "7");

        let mut emulator = self::emulator("main:\n li $v0, 99\n syscall\n");
        assert_eq!(emulator.run(), Err(EmulationError::UnknownSyscall { code: 99 }));
    }

    #[test]
    fn test_string_addresses_are_distinct() {
        let mut emulator = emulator("
            .data
            aa: .asciiz \"first\"
            bb: .asciiz \"second\"
            .text
            main:
                la $t0, aa
                la $t1, bb
                la $t2, aa
        ");

        emulator.run().unwrap();

        let first = emulator.register(Register::T0);
        let second = emulator.register(Register::T1);

        assert_eq!(first, 0x1000_0000);
        assert_eq!(second, 0x1000_0008);
        assert_eq!(emulator.register(Register::T2), first);
        assert_eq!(emulator.memory.read_string(first), "first");
        assert_eq!(emulator.memory.read_string(second), "second");
    }

    #[test]
    fn test_step_limit() {
        let program = Program::parse("main:\nloop: addi $t0, $t0, 1\n j loop\n").unwrap();
        let config = EmulatorConfig {
            max_steps: 10,
            ..EmulatorConfig::default()
        };

        let mut emulator = Emulator::with_config(program, TestIo::new(), config, None).unwrap();

        assert_eq!(emulator.run(), Ok(Halt::StepLimit));
        assert_eq!(emulator.steps, 10);
        assert_eq!(emulator.register(Register::T0), 5);
    }

    #[test]
    fn test_label_errors() {
        let program = Program::parse("start: nop\n").unwrap();
        assert_eq!(
            Emulator::new(program, TestIo::new()).err(),
            Some(EmulationError::MissingEntryPoint { entry: "main".into() }),
        );

        let mut emulator = self::emulator("main: j mian_exit\nmain_exit: nop\n");
        assert_eq!(emulator.run(), Err(EmulationError::UnknownLabel {
            label: "mian_exit".into(),
            suggestion: Some("main_exit".into()),
        }));

        let mut emulator = self::emulator("main: la $a0, main\n");
        match emulator.run() {
            Err(EmulationError::UnknownLabel { label, .. }) => assert_eq!(label, "main"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
