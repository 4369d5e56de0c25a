//! Punto de entrada ("driver").
//!
//! Este módulo abre la entrada y la salida, delega la compilación a
//! [`esteira::session`] y traduce su resultado a un código de salida.

use anyhow::{self, Context};
use clap::{self, crate_version, Arg, ArgMatches};
use esteira::{
    error::Diagnostics,
    session::{self, SessionError},
};

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    process,
};

const DEFAULT_OUTPUT: &str = "programa.mwasm";

fn main() {
    // Parsing de CLI
    let args = clap::Command::new("ESTEIRA compiler")
        .version(crate_version!())
        .about("Compiles ESTEIRA programs to MicrowaveVM assembly")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .help("Source file, standard input if absent"),
        )
        .arg(
            Arg::new("output")
                .value_name("OUTPUT")
                .default_value(DEFAULT_OUTPUT)
                .help("Output file ('-' for stdout)"),
        )
        .get_matches();

    match run(&args) {
        Ok(()) => (),

        Err(Failure::Rejected(diagnostics)) => {
            eprint!("{}", diagnostics);
            process::exit(1);
        }

        Err(Failure::Io(error)) => {
            eprintln!("Falha na compilacao: {:#}", error);
            process::exit(1);
        }
    }
}

/// Motivo por el cual una invocación no tuvo éxito.
///
/// Los diagnósticos no pueden viajar dentro de [`anyhow::Error`], ya
/// que citan código fuente compartido con `Rc`.
enum Failure {
    Rejected(Diagnostics),
    Io(anyhow::Error),
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        Failure::Io(error)
    }
}

fn run(args: &ArgMatches) -> Result<(), Failure> {
    let stdin = io::stdin();

    let (input, name): (Box<dyn BufRead + '_>, &str) = match args.value_of("input") {
        None => (Box::new(stdin.lock()), "<stdin>"),
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open for reading: {}", path))?;

            (Box::new(BufReader::new(file)), path)
        }
    };

    let path = args.value_of("output").unwrap_or(DEFAULT_OUTPUT);
    let output: Box<dyn Write> = match path {
        "-" => Box::new(io::stdout()),
        path => Box::new(
            File::create(path).with_context(|| format!("Failed to open for writing: {}", path))?,
        ),
    };

    match session::compile(input, name, output) {
        Ok(()) => Ok(()),
        Err(SessionError::Rejected(diagnostics)) => Err(Failure::Rejected(diagnostics)),
        Err(SessionError::Io(error)) => {
            let error = anyhow::Error::new(error).context(format!("Failed to compile {}", name));
            Err(error.into())
        }
    }
}
