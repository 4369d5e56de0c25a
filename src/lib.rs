//! Compilador de ESTEIRA para MicrowaveVM.
//!
//! # Front end
//! Cada programa deriva de un único archivo de código fuente.
//! Este archivo se somete primero a análisis léxico en [`lex`], de
//! lo cual se obtiene un flujo de tokens. Los literales numéricos
//! pueden llevar un sufijo de unidad física, descrito en [`unit`].
//! El flujo de tokens se dispone en un AST por medio de análisis
//! sintáctico en [`parse`].
//!
//! # Traducción
//! El árbol sintáctico es recorrido por el análisis semántico en
//! [`semantic`], que resuelve nombres, verifica tipos y unidades y
//! produce instrucciones de MicrowaveVM, descritas en [`ir`]. No hay
//! una segunda pasada: cada instrucción se entrega al emisor de
//! [`codegen`] en cuanto se genera, de modo que un error deja en la
//! salida todo lo traducido hasta ese punto.
//!
//! [`session`] une todas las fases y [`error`] da formato a los
//! errores que estas reportan.

#[macro_use]
mod macros;

pub mod codegen;
pub mod error;
pub mod ir;
pub mod lex;
pub mod parse;
pub mod semantic;
pub mod session;
pub mod source;
pub mod unit;
