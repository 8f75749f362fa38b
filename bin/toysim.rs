use clap::{App, Arg, ArgMatches};
use slog::{o, Discard, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

use toycc::{
    asm::{LoadError, Program},
    emulator::{EmulationError, Emulator, EmulatorConfig, StdIo},
    event::Event,
    instruction::Register,
};

enum Error {
    IO(std::io::Error),
    Load(LoadError),
    Execution(EmulationError),
    InvalidArgument(String),
}

impl Error {
    fn exit_code(&self) -> i32 {
        match self {
            Error::Execution(_) => 2,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::IO(e)
    }
}

impl From<LoadError> for Error {
    fn from(e: LoadError) -> Error {
        Error::Load(e)
    }
}

impl From<EmulationError> for Error {
    fn from(e: EmulationError) -> Error {
        Error::Execution(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IO(e) => write!(f, "{}", e),
            Error::Load(e) => write!(f, "{}", e),
            Error::Execution(e) => write!(f, "{}", e),
            Error::InvalidArgument(msg) => write!(f, "{}", msg),
        }
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("toysim")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Mitja Karhusaari <mitja@karhusaari.me>")
        .about("Loads and executes MIPS-style assembly")
        .arg(Arg::with_name("source")
             .help("File containing the assembly source")
             .value_name("SOURCE")
             .required(true)
             .index(1))
        .arg(Arg::with_name("max-steps")
             .help("Number of instructions to execute before giving up")
             .value_name("STEPS")
             .long("max-steps"))
        .arg(Arg::with_name("trace")
             .help("Prints every executed instruction to the standard error")
             .long("trace"))
        .arg(Arg::with_name("registers")
             .help("Prints the register file after the program has halted")
             .long("registers"))
        .arg(Arg::with_name("verbose")
             .help("Enables verbose logging")
             .long("verbose")
             .short("v"))
        .get_matches()
}

fn trace(event: &Event) {
    if let Event::Execute { pc, line, instruction } = event {
        eprintln!("{:>6}  line {:<5} {}", pc, line, instruction);
    }
}

fn run(args: &ArgMatches, logger: Logger) -> Result<(), Error> {
    let path = args.value_of("source").unwrap();

    let mut config = EmulatorConfig::default();

    if let Some(steps) = args.value_of("max-steps") {
        config.max_steps = steps.parse()
            .map_err(|_| Error::InvalidArgument(format!("invalid step count `{}`", steps)))?;
    }

    let source = std::fs::read_to_string(path)?;
    let program = Program::parse(&source)?;

    let mut emulator = Emulator::with_config(program, StdIo, config, logger)?;

    if args.is_present("trace") {
        emulator.add_listener(trace);
    }

    let result = emulator.run();

    if args.is_present("registers") {
        println!();

        for register in Register::ALL.iter() {
            let value = emulator.register(*register);
            println!("{:>5} = 0x{:08x} ({})", register.name(), value, value as i32);
        }

        println!("   lo = 0x{:08x}", emulator.context.lo);
        println!("   hi = 0x{:08x}", emulator.context.hi);
        println!("   pc = {}", emulator.context.pc);
    }

    result?;

    Ok(())
}

fn main() {
    let args = parse_arguments();

    let logger = if args.is_present("verbose") {
        let decorator = TermDecorator::new().stderr().build();
        let drain = FullFormat::new(decorator).build().fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        Logger::root(drain, o!())
    } else {
        Logger::root(Discard, o!())
    };

    if let Err(e) = run(&args, logger) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
