//! Vocabulario de MicrowaveVM.
//!
//! Las instrucciones aquí descritas corresponden uno a uno con los
//! mnemónicos del formato `.mwasm`. El traductor en [`crate::semantic`]
//! las produce y [`crate::codegen`] las escribe como texto.

use std::fmt::{self, Display};

use crate::lex::{Identifier, Register};

/// Operando numérico inmediato de `PUSH`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Display for Number {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(integer) => write!(fmt, "{}", integer),

            // `{:?}` siempre incluye el punto decimal (`2.0`, `0.5`)
            Number::Float(float) => write!(fmt, "{:?}", float),
        }
    }
}

/// Ubicación de almacenamiento de un símbolo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Uno de los cuatro registros de hardware.
    Register(Register),

    /// Celda de memoria numerada.
    Memory(u32),

    /// Variable simbólica `VAR_<nombre>`.
    Var(Identifier),
}

impl Display for Slot {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Register(register) => write!(fmt, "{}", register),
            Slot::Memory(cell) => write!(fmt, "MEM[{}]", cell),
            Slot::Var(name) => write!(fmt, "VAR_{}", name),
        }
    }
}

/// Destino de salto, `L<n>`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

impl Display for Label {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "L{}", self.0)
    }
}

/// Generador de etiquetas frescas.
///
/// Las etiquetas se numeran desde cero de forma monótona dentro de
/// una misma compilación.
#[derive(Clone, Debug, Default)]
pub struct LabelGenerator {
    next: u32,
}

impl LabelGenerator {
    /// Emite una etiqueta que no se ha entregado antes.
    pub fn fresh(&mut self) -> Label {
        let label = Label(self.next);
        self.next += 1;
        label
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    SetLabel(Label),
    Push(Number),
    PushStr(String),
    Load(Slot),
    Store(Slot),
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    CmpEq,
    CmpNe,
    CmpLt,
    CmpGt,
    CmpLe,
    CmpGe,
    JumpIfZero(Label),
    JumpIfNotZero(Label),
    Jump(Label),
    ReadSensor(Identifier),
    PowerOn,
    PowerOff,
    Start,
    SetParam(Identifier),
    Print(u32),
    Beep,
    Sleep,
    Halt,
}
