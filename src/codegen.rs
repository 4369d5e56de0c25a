//! Emisión de texto `.mwasm`.

use std::{
    fmt::{self, Display},
    io::{self, LineWriter, Write},
};

use crate::{ir::Instruction, semantic::Sink};

/// Primera línea de todo archivo generado.
pub const BANNER: &str = "; Codigo gerado pela linguagem ESTEIRA para MicrowaveVM";

/// Escribe instrucciones de MicrowaveVM, una por línea.
///
/// Ningún error de escritura interrumpe la traducción: el primero que
/// ocurra se conserva y se reporta en [`Emitter::finish()`].
pub struct Emitter<W: Write> {
    output: LineWriter<W>,
    failure: Option<io::Error>,
}

impl<W: Write> Emitter<W> {
    pub fn new(output: W) -> Self {
        Emitter {
            output: LineWriter::new(output),
            failure: None,
        }
    }

    pub fn banner(&mut self) {
        let result = writeln!(self.output, "{}", BANNER);
        self.record(result);
    }

    /// Termina el programa con `HALT` y devuelve la salida.
    pub fn finish(mut self) -> io::Result<W> {
        self.push(Instruction::Halt);

        let result = self.output.flush();
        self.record(result);

        if let Some(failure) = self.failure.take() {
            return Err(failure);
        }

        self.output.into_inner().map_err(io::IntoInnerError::into_error)
    }

    fn record(&mut self, result: io::Result<()>) {
        if let Err(error) = result {
            if self.failure.is_none() {
                self.failure = Some(error);
            }
        }
    }

    fn write(&mut self, instruction: &Instruction) -> io::Result<()> {
        use Instruction::*;

        let output = &mut self.output;
        match instruction {
            SetLabel(label) => writeln!(output, "{}:", label),

            Push(number) => emit!(output, "PUSH", "{}", number),
            PushStr(string) => emit!(output, "PUSHS", "\"{}\"", Escaped(string)),
            Load(slot) => emit!(output, "LOAD", "{}", slot),
            Store(slot) => emit!(output, "STORE", "{}", slot),

            Add => emit!(output, "ADD"),
            Sub => emit!(output, "SUB"),
            Mul => emit!(output, "MUL"),
            Div => emit!(output, "DIV"),
            Neg => emit!(output, "NEG"),

            CmpEq => emit!(output, "CMPEQ"),
            CmpNe => emit!(output, "CMPNE"),
            CmpLt => emit!(output, "CMPLT"),
            CmpGt => emit!(output, "CMPGT"),
            CmpLe => emit!(output, "CMPLE"),
            CmpGe => emit!(output, "CMPGE"),

            JumpIfZero(label) => emit!(output, "JZ", "{}", label),
            JumpIfNotZero(label) => emit!(output, "JNZ", "{}", label),
            Jump(label) => emit!(output, "JMP", "{}", label),

            ReadSensor(name) => emit!(output, "READSENS", "{}", name),
            PowerOn => emit!(output, "POWERON"),
            PowerOff => emit!(output, "POWEROFF"),
            Start => emit!(output, "START"),
            SetParam(name) => emit!(output, "SETPARAM", "{}", name),
            Print(count) => emit!(output, "PRINT", "{}", count),
            Beep => emit!(output, "BEEP"),
            Sleep => emit!(output, "SLEEP"),
            Halt => emit!(output, "HALT"),
        }
    }
}

impl<W: Write> Sink for Emitter<W> {
    fn push(&mut self, instruction: Instruction) {
        if self.failure.is_none() {
            let result = self.write(&instruction);
            self.record(result);
        }
    }
}

/// Contenido de una cadena con `"` y `\` escapados nuevamente.
struct Escaped<'a>(&'a str);

impl Display for Escaped<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '"' | '\\' => write!(fmt, "\\{}", c)?,
                c => write!(fmt, "{}", c)?,
            }
        }

        Ok(())
    }
}
