use toycc::{
    asm::Program,
    codegen::CodegenError,
    error::CompileError,
    emulator::{EmulationError, Emulator, EmulatorConfig, Halt, TestIo},
    instruction::Register,
};

fn load(source: &str) -> Program {
    let assembly = toycc::compile(source)
        .expect("could not compile");

    Program::parse(&assembly.to_string())
        .expect("could not load the generated assembly")
}

fn execute(source: &str) -> (Result<Halt, EmulationError>, Emulator<TestIo>) {
    let mut emulator = Emulator::new(load(source), TestIo::new())
        .expect("could not initialize emulator");

    let result = emulator.run();

    (result, emulator)
}

#[test]
fn test_return_constant() {
    let (result, emulator) = execute(include_str!("programs/return42.c"));

    assert_eq!(result, Ok(Halt::Returned));
    assert_eq!(emulator.register(Register::V0), 42);
    assert_eq!(emulator.io.output(), "");
    assert_eq!(emulator.register(Register::Sp), 0x7fff_fffc);
}

#[test]
fn test_while_loop_output() {
    let (result, emulator) = execute(include_str!("programs/count.c"));

    assert_eq!(result, Ok(Halt::Returned));
    assert_eq!(emulator.io.output(), "012");
    assert_eq!(emulator.register(Register::V0), 3);
}

#[test]
fn test_print_string() {
    let (result, emulator) = execute(include_str!("programs/hello.c"));

    assert_eq!(result, Ok(Halt::Returned));
    assert_eq!(emulator.io.output(), "hi\n");
}

#[test]
fn test_division_by_zero() {
    let (result, emulator) = execute(include_str!("programs/divzero.c"));

    match result {
        Err(EmulationError::DivisionByZero { .. }) => (),
        other => panic!("expected a division by zero, got {:?}", other),
    }

    assert_eq!(emulator.io.output(), "before\n");
    assert_eq!(emulator.halted, None);
}

#[test]
fn test_comparisons() {
    let (result, emulator) = execute(include_str!("programs/compare.c"));

    assert_eq!(result, Ok(Halt::Returned));
    assert_eq!(emulator.io.output(), "101010");
}

#[test]
fn test_fizzbuzz() {
    let (result, emulator) = execute(include_str!("programs/fizzbuzz.c"));

    assert_eq!(result, Ok(Halt::Returned));
    assert_eq!(
        emulator.io.output(),
        "1\n2\nFizz\n4\nBuzz\nFizz\n7\n8\nFizz\nBuzz\n11\nFizz\n13\n14\nFizzBuzz\n",
    );
}

#[test]
fn test_increments_and_precedence() {
    let (result, emulator) = execute(include_str!("programs/steps.c"));

    assert_eq!(result, Ok(Halt::Returned));
    assert_eq!(emulator.io.output(), "7 5 6 7");
    assert_eq!(emulator.register(Register::V0), 13);
}

#[test]
fn test_signed_division_truncates() {
    let (_, emulator) = execute("int main() { return (0 - 7) / 2; }");
    assert_eq!(emulator.register(Register::V0) as i32, -3);

    let (_, emulator) = execute("int main() { return (0 - 7) % 2; }");
    assert_eq!(emulator.register(Register::V0) as i32, -1);
}

#[test]
fn test_equality_of_extremes() {
    // The difference of these operands does not fit in 32 bits.
    let (_, emulator) = execute("int main() { return 2147483647 == 0 - 2147483647 - 1; }");
    assert_eq!(emulator.register(Register::V0), 0);
}

#[test]
fn test_skipped_declaration_keeps_later_variables_above_stack() {
    let (result, emulator) = execute(
        "int main() { if (0) { int t = 5; } int y = 2; print_int(1 + y); return 0; }",
    );

    assert_eq!(result, Ok(Halt::Returned));
    assert_eq!(emulator.io.output(), "3");

    let (_, emulator) = execute("int main() {
        int i = 0;
        while (i < 3) { int t = i; i++; }
        int y = 4;
        print_int(10 * y + i);
        return 0;
    }");

    assert_eq!(emulator.io.output(), "43");
}

#[test]
fn test_function_named_like_generated_label() {
    match toycc::compile("void else0() { } int main() { if (1) { } return 0; }") {
        Err(CompileError::Codegen(CodegenError::ReservedName { name })) => assert_eq!(name, "else0"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_other_calls_are_ignored() {
    let (result, emulator) = execute("int main() { helper(1, 2); return 3; }");

    assert_eq!(result, Ok(Halt::Returned));
    assert_eq!(emulator.register(Register::V0), 3);
}

#[test]
fn test_infinite_loop_hits_step_limit() {
    let config = EmulatorConfig {
        max_steps: 1000,
        ..EmulatorConfig::default()
    };

    let program = load("int main() { int i = 0; while (1) { i++; } return i; }");
    let mut emulator = Emulator::with_config(program, TestIo::new(), config, None)
        .expect("could not initialize emulator");

    assert_eq!(emulator.run(), Ok(Halt::StepLimit));
    assert_eq!(emulator.steps, 1000);
}

#[test]
fn test_with_terminal_logger() {
    use slog::{o, Drain, Logger};

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = Logger::root(drain, o!());

    let assembly = toycc::compile_with_logger(include_str!("programs/count.c"), logger.clone())
        .expect("could not compile");

    let program = Program::parse(&assembly.to_string()).unwrap();
    let mut emulator = Emulator::with_logger(program, TestIo::new(), logger).unwrap();

    assert_eq!(emulator.run(), Ok(Halt::Returned));
    assert_eq!(emulator.io.output(), "012");
}
