//! Sufijos de unidad física.
//!
//! Un literal numérico puede llevar una unidad (`36 km/h`, `2 s`,
//! `50 %`). Antes de emitirse, el valor se convierte a la unidad
//! canónica de su dimensión, de modo que la máquina virtual solo ve
//! metros por segundo, metros, milisegundos y fracciones.

use std::fmt::{self, Display};

use crate::ir::Number;

/// Magnitud física que describe una unidad.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dimension {
    Speed,
    Ratio,
    Angle,
    Frequency,
    Length,
    Time,
}

/// Un sufijo de unidad reconocido por el lexer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Unit {
    /// `km/h`
    KilometersPerHour,
    /// `m/s`
    MetersPerSecond,
    /// `%`
    Percent,
    /// `graus`
    Degrees,
    /// `bpm`
    BeatsPerMinute,
    /// `km`
    Kilometers,
    /// `m`
    Meters,
    /// `min`
    Minutes,
    /// `s`
    Seconds,
    /// `ms`
    Milliseconds,
}

impl Unit {
    /// Busca la unidad que corresponde a una palabra completa.
    ///
    /// `km/h` y `m/s` no son palabras; el lexer los arma a partir de
    /// `km` y `m` respectivamente.
    pub fn from_word(word: &str) -> Option<Unit> {
        use Unit::*;

        let unit = match word {
            "graus" => Degrees,
            "bpm" => BeatsPerMinute,
            "km" => Kilometers,
            "m" => Meters,
            "min" => Minutes,
            "s" => Seconds,
            "ms" => Milliseconds,
            _ => return None,
        };

        Some(unit)
    }

    /// Unidad compuesta `<self>/<denominator>`, si existe.
    pub fn per(self, denominator: char) -> Option<Unit> {
        match (self, denominator) {
            (Unit::Kilometers, 'h') => Some(Unit::KilometersPerHour),
            (Unit::Meters, 's') => Some(Unit::MetersPerSecond),
            _ => None,
        }
    }

    pub fn dimension(self) -> Dimension {
        use Unit::*;

        match self {
            KilometersPerHour | MetersPerSecond => Dimension::Speed,
            Percent => Dimension::Ratio,
            Degrees => Dimension::Angle,
            BeatsPerMinute => Dimension::Frequency,
            Kilometers | Meters => Dimension::Length,
            Minutes | Seconds | Milliseconds => Dimension::Time,
        }
    }

    /// Convierte un valor expresado en esta unidad a la unidad canónica.
    ///
    /// `km/h` y `%` siempre producen flotantes. Los demás factores son
    /// enteros y preservan el tipo del literal. Retorna `None` si el
    /// resultado se desborda al escalarse.
    pub fn normalize(self, value: Number) -> Option<Number> {
        use Unit::*;

        let factor = match self {
            KilometersPerHour => return finite(as_float(value) * 1000.0 / 3600.0),
            Percent => return finite(as_float(value) / 100.0),

            MetersPerSecond | Degrees | BeatsPerMinute | Meters | Milliseconds => 1,
            Kilometers | Seconds => 1000,
            Minutes => 60_000,
        };

        match value {
            Number::Int(integer) => integer.checked_mul(factor).map(Number::Int),
            Number::Float(float) => finite(float * factor as f64),
        }
    }

    /// Factor entero hacia milisegundos, solo para unidades de tiempo.
    pub fn millis(self) -> Option<i64> {
        if self.dimension() != Dimension::Time {
            return None;
        }

        match self.normalize(Number::Int(1)) {
            Some(Number::Int(factor)) => Some(factor),
            _ => None,
        }
    }
}

impl Display for Unit {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Unit::*;

        let string = match self {
            KilometersPerHour => "km/h",
            MetersPerSecond => "m/s",
            Percent => "%",
            Degrees => "graus",
            BeatsPerMinute => "bpm",
            Kilometers => "km",
            Meters => "m",
            Minutes => "min",
            Seconds => "s",
            Milliseconds => "ms",
        };

        fmt.write_str(string)
    }
}

fn finite(value: f64) -> Option<Number> {
    Some(value).filter(|value| value.is_finite()).map(Number::Float)
}

fn as_float(value: Number) -> f64 {
    match value {
        Number::Int(integer) => integer as f64,
        Number::Float(float) => float,
    }
}
