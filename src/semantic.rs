//! Análisis semántico y traducción.
//!
//! Este módulo recorre el [`parse::Ast`] en orden de fuente, resuelve
//! nombres contra la [`SymbolTable`], verifica tipos y unidades y
//! produce instrucciones de MicrowaveVM. Las instrucciones se entregan
//! a un [`Sink`] tan pronto como se generan, de modo que lo ya emitido
//! sobrevive a un error posterior.
//!
//! Toda expresión deja exactamente un valor en la pila de operandos y
//! toda sentencia la deja vacía.

use thiserror::Error;

use std::collections::HashMap;

use crate::{
    ir::{Instruction, LabelGenerator, Number, Slot},
    lex::{Identifier, Register},
    parse::{self, BinOp, Declaration, Expr, Statement, UnOp},
    source::Located,
    unit::Unit,
};

pub use crate::parse::Type;

/// Clase de símbolo declarado, junto con su almacenamiento físico.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    RegisterAlias(Register),
    MemoryAlias(u32),
}

#[derive(Clone, Debug)]
pub struct Symbol {
    kind: SymbolKind,
    typ: Type,
    slot: Slot,
}

impl Symbol {
    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn typ(&self) -> Type {
        self.typ
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }
}

/// Espacio de nombres plano de un programa.
#[derive(Default)]
pub struct SymbolTable {
    symbols: HashMap<Identifier, Symbol>,
}

impl SymbolTable {
    pub fn declare(
        &mut self,
        name: &Located<Identifier>,
        kind: SymbolKind,
        typ: Type,
    ) -> Semantic<&Symbol> {
        self.vacant(name)?;

        let id = name.as_ref();
        let slot = match kind {
            SymbolKind::Variable => Slot::Var(id.clone()),
            SymbolKind::RegisterAlias(register) => Slot::Register(register),
            SymbolKind::MemoryAlias(cell) => Slot::Memory(cell),
        };

        let symbol = Symbol { kind, typ, slot };
        Ok(self.symbols.entry(id.clone()).or_insert(symbol))
    }

    fn vacant(&self, name: &Located<Identifier>) -> Semantic<()> {
        let id = name.as_ref();
        if self.symbols.contains_key(id) {
            return Err(Located::at(
                SemanticError::Duplicate(id.clone()),
                name.location().clone(),
            ));
        }

        Ok(())
    }

    pub fn lookup(&self, id: &Located<Identifier>) -> Semantic<&Symbol> {
        self.symbols.get(id.as_ref()).ok_or_else(|| {
            Located::at(
                SemanticError::Undeclared(id.as_ref().clone()),
                id.location().clone(),
            )
        })
    }

    pub fn kind_of(&self, id: &Located<Identifier>) -> Semantic<SymbolKind> {
        self.lookup(id).map(Symbol::kind)
    }

    pub fn type_of(&self, id: &Located<Identifier>) -> Semantic<Type> {
        self.lookup(id).map(Symbol::typ)
    }
}

/// Destino de las instrucciones generadas.
pub trait Sink {
    fn push(&mut self, instruction: Instruction);
}

impl Sink for Vec<Instruction> {
    fn push(&mut self, instruction: Instruction) {
        Vec::push(self, instruction)
    }
}

/// Descarta todo; solo interesa verificar tipos.
struct TypeCheck;

impl Sink for TypeCheck {
    fn push(&mut self, _instruction: Instruction) {}
}

pub type Semantic<T> = Result<T, Located<SemanticError>>;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("Symbol `{0}` is undeclared")]
    Undeclared(Identifier),

    #[error("Symbol `{0}` is already declared")]
    Duplicate(Identifier),

    #[error("Type mismatch: expected `{0}`, found `{1}`")]
    ExpectedType(Type, Type),

    #[error("Type mismatch: expected `int` or `float`, found `{0}`")]
    ExpectedNumeric(Type),

    #[error("Type mismatch: expected `bool` or `int` condition, found `{0}`")]
    ExpectedCondition(Type),

    #[error("Type mismatch: `{0}` and `{1}` cannot be compared")]
    Incomparable(Type, Type),

    #[error("Unit `{0}` can only follow a numeric literal here")]
    MisplacedUnit(Unit),

    #[error("`ESPERAR` expects a time unit (`min`, `s`, `ms`), found `{0}`")]
    ExpectedTimeUnit(Unit),

    #[error("Literal overflows when converted from `{0}`")]
    LiteralOverflow(Unit),
}

impl SemanticError {
    /// Categoría del error, tal como se reporta en diagnósticos.
    pub fn kind(&self) -> &'static str {
        use SemanticError::*;

        match self {
            Undeclared(_) => "Undeclared symbol",
            Duplicate(_) => "Duplicate symbol",
            ExpectedType(..) | ExpectedNumeric(_) | ExpectedCondition(_) | Incomparable(..) => {
                "Type mismatch"
            }
            MisplacedUnit(_) | ExpectedTimeUnit(_) => "Unit misuse",
            LiteralOverflow(_) => "Invalid literal",
        }
    }
}

impl parse::Ast {
    /// Traduce el programa, entregando cada instrucción a `sink`.
    ///
    /// No se emite `HALT` final; eso le corresponde al emisor.
    pub fn lower<S: Sink>(&self, sink: &mut S) -> Semantic<()> {
        let mut symbols = SymbolTable::default();
        let mut labels = LabelGenerator::default();

        let mut context = Context {
            symbols: &mut symbols,
            labels: &mut labels,
            sink,
        };

        for declaration in self.declarations() {
            context.declare(declaration)?;
        }

        context.block(self.statements())
    }
}

struct Context<'a, S: Sink> {
    symbols: &'a mut SymbolTable,
    labels: &'a mut LabelGenerator,
    sink: &'a mut S,
}

impl<S: Sink> Context<'_, S> {
    fn declare(&mut self, declaration: &Declaration) -> Semantic<()> {
        match declaration {
            Declaration::Var { of, name, init } => {
                let typ = *of.as_ref();

                // Un duplicado no debe dejar su inicializador en la pila
                self.symbols.vacant(name)?;

                let init = match init {
                    Some(init) => {
                        let found = self.eval(init)?;
                        expect_assignable(typ, found, init)?;
                        true
                    }

                    None => false,
                };

                let symbol = self.symbols.declare(name, SymbolKind::Variable, typ)?;
                if init {
                    let slot = symbol.slot().clone();
                    self.sink.push(Instruction::Store(slot));
                }
            }

            // Los registros y celdas guardan valores numéricos
            Declaration::Register { register, name } => {
                let kind = SymbolKind::RegisterAlias(*register.as_ref());
                self.symbols.declare(name, kind, Type::Float)?;
            }

            Declaration::Memory { cell, name } => {
                let kind = SymbolKind::MemoryAlias(*cell.as_ref());
                self.symbols.declare(name, kind, Type::Float)?;
            }
        }

        Ok(())
    }

    fn block(&mut self, statements: &[Located<Statement>]) -> Semantic<()> {
        statements
            .iter()
            .try_for_each(|statement| self.statement(statement.as_ref()))
    }

    fn statement(&mut self, statement: &Statement) -> Semantic<()> {
        use Instruction::*;

        match statement {
            Statement::Assignment { target, value } => {
                let (slot, typ) = {
                    let symbol = self.symbols.lookup(target)?;
                    (symbol.slot().clone(), symbol.typ())
                };

                let found = self.eval(value)?;
                expect_assignable(typ, found, value)?;
                self.sink.push(Store(slot));
            }

            Statement::If {
                condition,
                body,
                otherwise,
            } => {
                self.condition(condition)?;

                let (otherwise_label, end) = (self.labels.fresh(), self.labels.fresh());
                self.sink.push(JumpIfZero(otherwise_label));
                self.block(body)?;
                self.sink.push(Jump(end));

                self.sink.push(SetLabel(otherwise_label));
                if let Some(otherwise) = otherwise {
                    self.block(otherwise)?;
                }

                self.sink.push(SetLabel(end));
            }

            Statement::While { condition, body } => {
                let (top, end) = (self.labels.fresh(), self.labels.fresh());

                self.sink.push(SetLabel(top));
                self.condition(condition)?;
                self.sink.push(JumpIfZero(end));
                self.block(body)?;
                self.sink.push(Jump(top));
                self.sink.push(SetLabel(end));
            }

            Statement::Show(args) => {
                for arg in args {
                    self.eval(arg)?;
                }

                self.sink.push(Print(args.len() as u32));
            }

            Statement::Wait(duration) => {
                self.duration(duration)?;
                self.sink.push(Sleep);
            }

            Statement::Define { parameter, value } => {
                let found = self.eval(value)?;
                expect_numeric(found, value)?;
                self.sink.push(SetParam(parameter.as_ref().clone()));
            }

            Statement::Beep => self.sink.push(Beep),
            Statement::PowerOn => self.sink.push(PowerOn),
            Statement::PowerOff => self.sink.push(PowerOff),
            Statement::Start => self.sink.push(Start),
            Statement::Stop => self.sink.push(Halt),
        }

        Ok(())
    }

    fn condition(&mut self, condition: &Located<Expr>) -> Semantic<()> {
        let found = self.eval(condition)?;
        expect_condition(found, condition)
    }

    /// Argumento de `ESPERAR`, normalizado a milisegundos.
    fn duration(&mut self, duration: &Located<Expr>) -> Semantic<()> {
        match duration.as_ref() {
            Expr::Number {
                value,
                unit: Some(unit),
            } => {
                time_unit(unit)?;
                self.number(*value, Some(unit))?;
                Ok(())
            }

            Expr::Measured(inner, unit) => {
                let factor = time_unit(unit)?;

                let found = self.eval(inner)?;
                expect_numeric(found, inner)?;

                if factor != 1 {
                    self.sink.push(Instruction::Push(Number::Int(factor)));
                    self.sink.push(Instruction::Mul);
                }

                Ok(())
            }

            _ => {
                time_literals(duration)?;

                let found = self.eval(duration)?;
                expect_numeric(found, duration)
            }
        }
    }

    fn eval(&mut self, expr: &Located<Expr>) -> Semantic<Type> {
        use Instruction::*;

        match expr.as_ref() {
            Expr::True => {
                self.sink.push(Push(Number::Int(1)));
                Ok(Type::Bool)
            }

            Expr::False => {
                self.sink.push(Push(Number::Int(0)));
                Ok(Type::Bool)
            }

            Expr::Number { value, unit } => self.number(*value, unit.as_ref()),

            Expr::Str(string) => {
                self.sink.push(PushStr(string.clone()));
                Ok(Type::Str)
            }

            Expr::Sensor(name) => {
                self.sink.push(ReadSensor(name.as_ref().clone()));
                Ok(Type::Float)
            }

            Expr::Read(name) => {
                let symbol = self.symbols.lookup(name)?;
                let typ = symbol.typ();

                self.sink.push(Load(symbol.slot().clone()));
                Ok(typ)
            }

            Expr::Unary(op, operand) => {
                let typ = self.eval(operand)?;
                expect_numeric(typ, operand)?;

                if let UnOp::Negate = op {
                    self.sink.push(Neg);
                }

                Ok(typ)
            }

            Expr::Binary(lhs, op @ BinOp::And, rhs) | Expr::Binary(lhs, op @ BinOp::Or, rhs) => {
                self.logical(lhs, *op, rhs)
            }

            Expr::Binary(lhs, op, rhs) => {
                let lhs_type = self.eval(lhs)?;
                let rhs_type = self.eval(rhs)?;

                let instruction = match op {
                    BinOp::Add => Add,
                    BinOp::Sub => Sub,
                    BinOp::Mul => Mul,
                    BinOp::Div => Div,
                    BinOp::Equal => CmpEq,
                    BinOp::NotEqual => CmpNe,
                    BinOp::Less => CmpLt,
                    BinOp::Greater => CmpGt,
                    BinOp::LessOrEqual => CmpLe,
                    BinOp::GreaterOrEqual => CmpGe,
                    BinOp::And | BinOp::Or => unreachable!(),
                };

                let typ = match op {
                    BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                        expect_numeric(lhs_type, lhs)?;
                        expect_numeric(rhs_type, rhs)?;

                        if lhs_type == Type::Int && rhs_type == Type::Int {
                            Type::Int
                        } else {
                            Type::Float
                        }
                    }

                    BinOp::Equal | BinOp::NotEqual => {
                        let comparable = (is_numeric(lhs_type) && is_numeric(rhs_type))
                            || (lhs_type == Type::Bool && rhs_type == Type::Bool);

                        if !comparable {
                            return Err(Located::at(
                                SemanticError::Incomparable(lhs_type, rhs_type),
                                expr.location().clone(),
                            ));
                        }

                        Type::Bool
                    }

                    _ => {
                        if !is_numeric(lhs_type) || !is_numeric(rhs_type) {
                            return Err(Located::at(
                                SemanticError::Incomparable(lhs_type, rhs_type),
                                expr.location().clone(),
                            ));
                        }

                        Type::Bool
                    }
                };

                self.sink.push(instruction);
                Ok(typ)
            }

            Expr::Measured(_, unit) => Err(Located::at(
                SemanticError::MisplacedUnit(*unit.as_ref()),
                unit.location().clone(),
            )),
        }
    }

    fn number(&mut self, value: Number, unit: Option<&Located<Unit>>) -> Semantic<Type> {
        let value = match unit {
            None => value,
            Some(unit) => unit.as_ref().normalize(value).ok_or_else(|| {
                Located::at(
                    SemanticError::LiteralOverflow(*unit.as_ref()),
                    unit.location().clone(),
                )
            })?,
        };

        self.sink.push(Instruction::Push(value));
        match value {
            Number::Int(_) => Ok(Type::Int),
            Number::Float(_) => Ok(Type::Float),
        }
    }

    /// `&&` y `||` con evaluación en cortocircuito.
    fn logical(&mut self, lhs: &Located<Expr>, op: BinOp, rhs: &Located<Expr>) -> Semantic<Type> {
        use Instruction::*;

        let short_value = match op {
            BinOp::And => 0,
            _ => 1,
        };

        // Con un lado izquierdo constante el resultado se decide aquí
        if let Some(constant) = truth(lhs) {
            let found = self.check_only(lhs)?;
            expect_condition(found, lhs)?;

            if constant as i64 == short_value {
                let found = self.check_only(rhs)?;
                expect_condition(found, rhs)?;
                self.sink.push(Push(Number::Int(short_value)));
            } else {
                let found = self.eval(rhs)?;
                expect_condition(found, rhs)?;
            }

            return Ok(Type::Bool);
        }

        self.condition(lhs)?;

        let (short, end) = (self.labels.fresh(), self.labels.fresh());
        self.sink.push(match op {
            BinOp::And => JumpIfZero(short),
            _ => JumpIfNotZero(short),
        });

        self.condition(rhs)?;
        self.sink.push(Jump(end));
        self.sink.push(SetLabel(short));
        self.sink.push(Push(Number::Int(short_value)));
        self.sink.push(SetLabel(end));

        Ok(Type::Bool)
    }

    /// Verifica una expresión sin emitir código ni consumir etiquetas.
    fn check_only(&mut self, expr: &Located<Expr>) -> Semantic<Type> {
        let mut labels = self.labels.clone();
        let mut sink = TypeCheck;

        let mut type_check = Context {
            symbols: &mut *self.symbols,
            labels: &mut labels,
            sink: &mut sink,
        };

        type_check.eval(expr)
    }
}

/// Valor de verdad de una condición, si se conoce sin ejecutarla.
///
/// Sigue exactamente las decisiones de [`Context::logical`], de modo que
/// un operando descartado por una constante tampoco se emite.
fn truth(expr: &Located<Expr>) -> Option<bool> {
    match expr.as_ref() {
        Expr::True => Some(true),
        Expr::False => Some(false),

        Expr::Binary(lhs, BinOp::And, rhs) => match truth(lhs)? {
            false => Some(false),
            true => truth(rhs),
        },

        Expr::Binary(lhs, BinOp::Or, rhs) => match truth(lhs)? {
            true => Some(true),
            false => truth(rhs),
        },

        _ => None,
    }
}

/// Toda unidad dentro de un argumento de `ESPERAR` debe ser de tiempo.
fn time_literals(expr: &Located<Expr>) -> Semantic<()> {
    match expr.as_ref() {
        Expr::Number {
            unit: Some(unit), ..
        } => time_unit(unit).map(|_| ()),

        Expr::Unary(_, operand) => time_literals(operand),
        Expr::Binary(lhs, _, rhs) => {
            time_literals(lhs)?;
            time_literals(rhs)
        }

        Expr::Measured(inner, unit) => {
            time_unit(unit)?;
            time_literals(inner)
        }

        _ => Ok(()),
    }
}

fn is_numeric(typ: Type) -> bool {
    matches!(typ, Type::Int | Type::Float)
}

fn expect_numeric<T>(found: Type, at: &Located<T>) -> Semantic<()> {
    if is_numeric(found) {
        Ok(())
    } else {
        Err(Located::at(
            SemanticError::ExpectedNumeric(found),
            at.location().clone(),
        ))
    }
}

fn expect_condition<T>(found: Type, at: &Located<T>) -> Semantic<()> {
    match found {
        Type::Bool | Type::Int => Ok(()),
        _ => Err(Located::at(
            SemanticError::ExpectedCondition(found),
            at.location().clone(),
        )),
    }
}

fn expect_assignable<T>(to: Type, found: Type, at: &Located<T>) -> Semantic<()> {
    if to == found || (to == Type::Float && found == Type::Int) {
        Ok(())
    } else {
        Err(Located::at(
            SemanticError::ExpectedType(to, found),
            at.location().clone(),
        ))
    }
}

/// Factor hacia milisegundos de una unidad de tiempo.
fn time_unit(unit: &Located<Unit>) -> Semantic<i64> {
    unit.as_ref().millis().ok_or_else(|| {
        Located::at(
            SemanticError::ExpectedTimeUnit(*unit.as_ref()),
            unit.location().clone(),
        )
    })
}
