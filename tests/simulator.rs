use std::cell::RefCell;
use std::rc::Rc;

use toycc::{
    asm::{AsmErrorKind, Program},
    emulator::{EmulationError, Emulator, Halt, TestIo},
    event::{Event, EventListener},
    instruction::{Instruction, Register},
};

fn read_program() -> Program {
    Program::parse(include_str!("programs/banner.asm"))
        .expect("could not load banner.asm")
}

#[test]
fn test_banner_read_program() {
    let p = read_program();

    assert_eq!(p.instructions.len(), 23);
    assert_eq!(p.strings.len(), 2);
    assert_eq!(p.data_label("banner"), Some((0, "first line\nsecond line\n")));
    assert_eq!(p.data_label("sep"), Some((1, ", ")));
    assert_eq!(p.text_label("main"), Some(0));
    assert_eq!(p.text_label("loop"), Some(5));
    assert_eq!(p.text_label("done"), Some(9));

    assert_eq!(p.instructions[0].line, 11);
    assert_eq!(p.instructions[5].instruction, Instruction::Branch {
        condition: toycc::instruction::BranchCondition::Equal,
        rs: Register::T1,
        rt: Register::T2,
        label: "done".into(),
    });
}

#[test]
fn test_banner_emulate() {
    let mut emulator = Emulator::new(read_program(), TestIo::new())
        .expect("could not initialize emulator");

    assert_eq!(emulator.run(), Ok(Halt::Exit));
    assert_eq!(emulator.io.output(), "first line\nsecond line\n55, 0");
    assert_eq!(emulator.register(Register::T0), 55);
    assert_eq!(emulator.register(Register::Zero), 0);
}

#[test]
fn test_borrowed_io() {
    let mut io = TestIo::new();

    {
        let mut emulator = Emulator::new(read_program(), &mut io)
            .expect("could not initialize emulator");

        emulator.run().unwrap();
    }

    assert_eq!(io.into_output(), "first line\nsecond line\n55, 0");
}

#[derive(Clone, Default)]
struct Recorder {
    output: Rc<RefCell<String>>,
    registers: Rc<RefCell<Vec<Register>>>,
    executed: Rc<RefCell<usize>>,
    halts: Rc<RefCell<Vec<Halt>>>,
}

impl EventListener for Recorder {
    fn event(&mut self, event: &Event) {
        match event {
            Event::Execute { .. } => *self.executed.borrow_mut() += 1,
            Event::Output { text } => self.output.borrow_mut().push_str(text),
            Event::RegisterChange { register, .. } => self.registers.borrow_mut().push(*register),
            Event::Halted { reason } => self.halts.borrow_mut().push(*reason),
            Event::MemoryChange { .. } => (),
        }
    }
}

#[test]
fn test_events() {
    let recorder = Recorder::default();

    let mut emulator = Emulator::new(read_program(), TestIo::new()).unwrap();
    emulator.add_listener(recorder.clone());
    emulator.run().unwrap();

    assert_eq!(*recorder.output.borrow(), emulator.io.output());
    assert_eq!(*recorder.executed.borrow(), emulator.steps);
    assert_eq!(*recorder.halts.borrow(), vec![Halt::Exit]);
    assert!(!recorder.registers.borrow().contains(&Register::Zero));
}

#[test]
fn test_load_errors() {
    let err = Program::parse("main:\n    add $t0, $t1\n").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.kind(), Some(&AsmErrorKind::OperandCount {
        opcode: "add".into(),
        expected: 3,
        got: 2,
    }));

    let err = Program::parse("main:\n    li $t10, 1\n").unwrap_err();
    assert_eq!(err.line, 2);

    match err.kind() {
        Some(AsmErrorKind::UnknownRegister { name, .. }) => assert_eq!(name, "$t10"),
        other => panic!("unexpected error kind: {:?}", other),
    }

    let err = Program::parse("main:\n    lw $t0, 4[$sp]\n").unwrap_err();
    assert_eq!(err.kind(), Some(&AsmErrorKind::InvalidAddress));
}

#[test]
fn test_runtime_label_error() {
    let program = Program::parse("main:\n    beq $zero, $zero, nowhere\n").unwrap();
    let mut emulator = Emulator::new(program, TestIo::new()).unwrap();

    assert_eq!(emulator.run(), Err(EmulationError::UnknownLabel {
        label: "nowhere".into(),
        suggestion: None,
    }));
}
