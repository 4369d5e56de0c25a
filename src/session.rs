//! Una compilación completa, de texto fuente a `.mwasm`.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::{
    codegen::Emitter,
    error::Diagnostics,
    lex::{Lexer, LexerError},
    parse,
    semantic::Sink,
    source::{self, Located},
};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{0}")]
    Io(#[from] io::Error),

    /// El programa tiene errores; ya fueron formateados.
    #[error("{0}")]
    Rejected(Diagnostics),
}

/// Compila `input`, nombrado `name` en diagnósticos, hacia `output`.
///
/// La salida siempre recibe el encabezado y termina en `HALT`, aun si
/// la compilación falla a medio camino. Las instrucciones emitidas
/// antes del error se conservan.
pub fn compile<R, W>(input: R, name: &str, output: W) -> Result<(), SessionError>
where
    R: BufRead,
    W: Write,
{
    let mut emitter = Emitter::new(output);
    emitter.banner();

    let translated = translate(input, name, &mut emitter);
    let finished = emitter.finish();

    translated?;
    finished?;

    Ok(())
}

fn translate<R: BufRead, S: Sink>(input: R, name: &str, sink: &mut S) -> Result<(), SessionError> {
    let (start, stream) = source::consume(input, name);

    let tokens = Lexer::new(start.clone(), stream)
        .try_exhaustive()
        .map_err(lexical)?;

    let ast = parse::parse(tokens.iter(), start)
        .map_err(|error| SessionError::Rejected(Diagnostics::from(error).kind("Syntax error")))?;

    ast.lower(sink).map_err(|error| {
        let kind = error.as_ref().kind();
        SessionError::Rejected(Diagnostics::from(error).kind(kind))
    })
}

/// Separa fallas de lectura de errores léxicos propiamente dichos.
fn lexical(errors: Vec<Located<LexerError>>) -> SessionError {
    let mut rejected = Vec::with_capacity(errors.len());
    for error in errors {
        let (location, error) = error.split();
        match error {
            LexerError::Input(error) => return SessionError::Io(error),
            error => rejected.push(Located::at(error, location)),
        }
    }

    SessionError::Rejected(Diagnostics::from(rejected).kind("Lexical error"))
}
