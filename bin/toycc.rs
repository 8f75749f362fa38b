use clap::{App, Arg, ArgMatches};
use slog::{o, Discard, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

use toycc::error::CompileError;

enum Error {
    Compile(CompileError),
    IO(String, std::io::Error),
}

impl From<CompileError> for Error {
    fn from(e: CompileError) -> Error {
        Error::Compile(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Compile(e) => write!(f, "{}", e),
            Error::IO(path, e) => write!(f, "{}: {}", path, e),
        }
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("toycc")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Mitja Karhusaari <mitja@karhusaari.me>")
        .about("Compiles a C-like source file into MIPS-style assembly")
        .arg(Arg::with_name("input")
             .help("Source file to compile")
             .value_name("INPUT")
             .required(true)
             .index(1))
        .arg(Arg::with_name("output")
             .help("File to write the assembly to")
             .value_name("OUTPUT")
             .short("o")
             .long("output")
             .default_value("out.asm"))
        .arg(Arg::with_name("verbose")
             .help("Enables verbose logging")
             .long("verbose")
             .short("v"))
        .get_matches()
}

fn logger(verbose: bool) -> Logger {
    if verbose {
        let decorator = TermDecorator::new().stderr().build();
        let drain = FullFormat::new(decorator).build().fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        Logger::root(drain, o!())
    } else {
        Logger::root(Discard, o!())
    }
}

fn compile(input: &str, output: &str, logger: Logger) -> Result<(), Error> {
    let source = std::fs::read_to_string(input)
        .map_err(|e| Error::IO(input.to_string(), e))?;

    let assembly = toycc::compile_with_logger(&source, logger)?;

    std::fs::write(output, assembly.to_string())
        .map_err(|e| Error::IO(output.to_string(), e))?;

    Ok(())
}

fn main() {
    let args = parse_arguments();

    let input = args.value_of("input").unwrap();
    let output = args.value_of("output").unwrap();

    // The async drain flushes when the logger is dropped, so it must not outlive the exit call.
    let result = compile(input, output, logger(args.is_present("verbose")));

    match result {
        Ok(()) => println!("Compiled {} -> {}", input, output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        },
    }
}
