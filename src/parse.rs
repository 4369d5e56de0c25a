//! Análisis sintáctico.
//!
//! El parser es descendente recursivo y produce un árbol sintáctico
//! pequeño ([`Ast`]) que luego recorre [`crate::semantic`]. La
//! precedencia de operadores, de menor a mayor, es `||`, `&&`,
//! comparaciones (no asociativas), aditivos, multiplicativos y unarios.
//! Todos los operadores binarios asocian a la izquierda.

use std::{
    convert::TryFrom,
    fmt::{self, Display},
    iter::Peekable,
    marker::PhantomData,
};
use thiserror::Error;

use crate::{
    ir::Number,
    lex::{Identifier, Keyword, Register, Token},
    source::{Located, Location},
    unit::Unit,
};

/// Un programa `ESTEIRA nombre { ... }` completo.
#[derive(Debug)]
pub struct Ast {
    name: Located<Identifier>,
    declarations: Vec<Declaration>,
    statements: Vec<Located<Statement>>,
}

impl Ast {
    pub fn name(&self) -> &Located<Identifier> {
        &self.name
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn statements(&self) -> &[Located<Statement>] {
        &self.statements
    }
}

#[derive(Debug)]
pub enum Declaration {
    /// `VAR tipo nombre (= expr)?;`
    Var {
        of: Located<Type>,
        name: Located<Identifier>,
        init: Option<Located<Expr>>,
    },

    /// `REG Rk = nombre;`
    Register {
        register: Located<Register>,
        name: Located<Identifier>,
    },

    /// `MEM[k] = nombre;`
    Memory {
        cell: Located<u32>,
        name: Located<Identifier>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Int,
    Float,
    Bool,
    Str,
}

impl Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => fmt.write_str("int"),
            Type::Float => fmt.write_str("float"),
            Type::Bool => fmt.write_str("bool"),
            Type::Str => fmt.write_str("string"),
        }
    }
}

#[derive(Debug)]
pub enum Statement {
    Assignment {
        target: Located<Identifier>,
        value: Located<Expr>,
    },

    If {
        condition: Located<Expr>,
        body: Vec<Located<Statement>>,
        otherwise: Option<Vec<Located<Statement>>>,
    },

    While {
        condition: Located<Expr>,
        body: Vec<Located<Statement>>,
    },

    Show(Vec<Located<Expr>>),

    Wait(Located<Expr>),

    Define {
        parameter: Located<Identifier>,
        value: Located<Expr>,
    },

    Beep,
    PowerOn,
    PowerOff,
    Start,
    Stop,
}

#[derive(Debug)]
pub enum Expr {
    True,
    False,
    Number {
        value: Number,
        unit: Option<Located<Unit>>,
    },
    Str(String),
    Sensor(Located<Identifier>),
    Read(Located<Identifier>),
    Unary(UnOp, Box<Located<Expr>>),
    Binary(Box<Located<Expr>>, BinOp, Box<Located<Expr>>),

    /// Unidad aplicada a algo que no es un literal numérico.
    Measured(Box<Located<Expr>>, Located<Unit>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnOp {
    Negate,
    Identity,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    Add,
    Sub,
    Mul,
    Div,
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Expected {0}, found {1} instead")]
    UnexpectedToken(Token, Token),

    #[error("Expected {0}, none was found instead")]
    MissingToken(Token),

    #[error("Expected identifier, found {0}")]
    ExpectedId(Token),

    #[error("Expected a register `R0`..`R3`, found {0}")]
    ExpectedRegister(Token),

    #[error("Expected a memory cell number, found {0}")]
    ExpectedCell(Token),

    #[error("Memory cell {0} is out of range")]
    CellOutOfRange(i64),

    #[error("Expected any of `int`, `float`, `bool`, `string`, found {0}")]
    ExpectedType(Token),

    #[error("Expected a statement, found {0}")]
    ExpectedStatement(Token),

    #[error("Expected an expression, found {0}")]
    ExpectedExpr(Token),

    #[error("Unexpected {0} after end of program")]
    TrailingInput(Token),

    #[error("Abrupt end of program")]
    UnexpectedEof,
}

/// Flujo de tokens que el parser puede bifurcar.
pub trait TokenStream<'a>: Iterator<Item = &'a Located<Token>> + Clone {}

impl<'a, I> TokenStream<'a> for I where I: Iterator<Item = &'a Located<Token>> + Clone {}

/// Construye el árbol sintáctico de un programa completo.
///
/// `start` es la ubicación que se reporta si la entrada está vacía.
pub fn parse<'a>(
    tokens: impl TokenStream<'a>,
    start: Location,
) -> Result<Ast, Located<ParserError>> {
    let mut parser = Parser {
        tokens: tokens.peekable(),
        last_known: start,
        lifetime_hack: PhantomData,
    };

    parser.program().map_err(Failure::coerce)
}

#[derive(Clone)]
struct Parser<'a, I: TokenStream<'a>> {
    tokens: Peekable<I>,
    last_known: Location,
    lifetime_hack: PhantomData<&'a ()>,
}

/// Una falla débil indica que la regla no aplicaba en esta posición
/// y que el llamador puede probar otra alternativa. Una falla estricta
/// aborta el análisis.
enum Failure {
    Weak(Located<ParserError>),
    Strict(Located<ParserError>),
}

impl Failure {
    fn weak(self) -> Self {
        Failure::Weak(self.coerce())
    }

    fn strict(self) -> Self {
        Failure::Strict(self.coerce())
    }

    fn coerce(self) -> Located<ParserError> {
        match self {
            Failure::Weak(error) => error,
            Failure::Strict(error) => error,
        }
    }
}

type Parse<T> = Result<T, Failure>;

impl<'a, I: TokenStream<'a>> Parser<'a, I> {
    fn program(&mut self) -> Parse<Ast> {
        self.keyword(Keyword::Esteira)?;
        let name = self.id()?;
        self.expect(Token::OpenCurly)?;

        let mut declarations = Vec::new();
        while let Some(declaration) = self.optional(Parser::declaration)? {
            declarations.push(declaration);
        }

        let statements = self.statements_until_close()?;

        if let Some(token) = self.tokens.next() {
            let (location, token) = token.clone().split();
            return Err(Failure::Strict(Located::at(
                ParserError::TrailingInput(token),
                location,
            )));
        }

        Ok(Ast {
            name,
            declarations,
            statements,
        })
    }

    fn declaration(&mut self) -> Parse<Declaration> {
        let (location, token) = self.next()?.split();
        let declaration = match token {
            Token::Keyword(Keyword::Var) => {
                let of = self.typ()?;
                let name = self.id()?;

                let init = if self.accept(Token::Assign) {
                    Some(self.expr().map_err(Failure::strict)?)
                } else {
                    None
                };

                Declaration::Var { of, name, init }
            }

            Token::Keyword(Keyword::Reg) => {
                let register = self.register()?;
                self.expect(Token::Assign)?;
                let name = self.id()?;

                Declaration::Register { register, name }
            }

            Token::Keyword(Keyword::Mem) => {
                self.expect(Token::OpenSquare)?;
                let cell = self.cell()?;
                self.expect(Token::CloseSquare)?;
                self.expect(Token::Assign)?;
                let name = self.id()?;

                Declaration::Memory { cell, name }
            }

            _ => {
                return Err(Failure::Weak(Located::at(
                    ParserError::ExpectedStatement(token),
                    location,
                )))
            }
        };

        self.expect(Token::Semicolon)?;
        Ok(declaration)
    }

    fn statement_block(&mut self) -> Parse<Vec<Located<Statement>>> {
        self.expect(Token::OpenCurly)?;
        self.statements_until_close()
    }

    fn statements_until_close(&mut self) -> Parse<Vec<Located<Statement>>> {
        let mut statements = Vec::new();
        loop {
            match self.attempt(Parser::statement) {
                Ok(statement) => statements.push(statement),
                Err(Failure::Weak(error)) => {
                    self.expect(Token::CloseCurly)
                        .map_err(|_| Failure::Strict(error))?;

                    break Ok(statements);
                }

                Err(error) => break Err(error),
            }
        }
    }

    fn statement(&mut self) -> Parse<Located<Statement>> {
        let (start, token) = self.next()?.split();

        let statement = match token {
            Token::Id(id) => {
                let target = Located::at(id, start.clone());
                self.expect(Token::Assign)?;
                let value = self.expr().map_err(Failure::strict)?;
                self.expect(Token::Semicolon)?;

                Statement::Assignment { target, value }
            }

            Token::Keyword(Keyword::Se) => {
                let condition = self.condition()?;
                let body = self.statement_block()?;

                let otherwise = if self.accept(Token::Keyword(Keyword::Senao)) {
                    Some(self.statement_block()?)
                } else {
                    None
                };

                Statement::If {
                    condition,
                    body,
                    otherwise,
                }
            }

            Token::Keyword(Keyword::Enquanto) => {
                let condition = self.condition()?;
                let body = self.statement_block()?;

                Statement::While { condition, body }
            }

            Token::Keyword(Keyword::Mostrar) => {
                self.expect(Token::OpenParen)?;
                let args = self.comma_separated(Parser::expr)?;
                self.expect(Token::CloseParen)?;
                self.expect(Token::Semicolon)?;

                Statement::Show(args)
            }

            Token::Keyword(Keyword::Esperar) => {
                self.expect(Token::OpenParen)?;
                let duration = self.expr().map_err(Failure::strict)?;
                self.expect(Token::CloseParen)?;
                self.expect(Token::Semicolon)?;

                Statement::Wait(duration)
            }

            Token::Keyword(Keyword::Definir) => {
                let parameter = self.id()?;
                self.expect(Token::Assign)?;
                let value = self.expr().map_err(Failure::strict)?;
                self.expect(Token::Semicolon)?;

                Statement::Define { parameter, value }
            }

            Token::Keyword(keyword) => {
                let statement = match keyword {
                    Keyword::Bip => Statement::Beep,
                    Keyword::Ligar => Statement::PowerOn,
                    Keyword::Desligar => Statement::PowerOff,
                    Keyword::Iniciar => Statement::Start,
                    Keyword::Parar => Statement::Stop,
                    _ => {
                        return self
                            .fail(ParserError::ExpectedStatement(Token::Keyword(keyword)))
                            .map_err(Failure::weak)
                    }
                };

                self.expect(Token::Semicolon)?;
                statement
            }

            token => {
                return self
                    .fail(ParserError::ExpectedStatement(token))
                    .map_err(Failure::weak)
            }
        };

        let location = Location::span(start, &self.last_known);
        Ok(Located::at(statement, location))
    }

    /// `( expr )` de `SE` y `ENQUANTO`.
    fn condition(&mut self) -> Parse<Located<Expr>> {
        self.expect(Token::OpenParen)?;
        let condition = self.expr().map_err(Failure::strict)?;
        self.expect(Token::CloseParen)?;

        Ok(condition)
    }

    fn expr(&mut self) -> Parse<Located<Expr>> {
        self.or()
    }

    fn or(&mut self) -> Parse<Located<Expr>> {
        self.left_assoc(&[(Token::Or, BinOp::Or)], Parser::and)
    }

    fn and(&mut self) -> Parse<Located<Expr>> {
        self.left_assoc(&[(Token::And, BinOp::And)], Parser::relational)
    }

    fn relational(&mut self) -> Parse<Located<Expr>> {
        const OPERATORS: &[(Token, BinOp)] = &[
            (Token::Equal, BinOp::Equal),
            (Token::NotEqual, BinOp::NotEqual),
            (Token::Less, BinOp::Less),
            (Token::Greater, BinOp::Greater),
            (Token::LessOrEqual, BinOp::LessOrEqual),
            (Token::GreaterOrEqual, BinOp::GreaterOrEqual),
        ];

        let lhs = self.additive()?;
        match self.operator(OPERATORS) {
            Some(op) => {
                let rhs = self.additive().map_err(Failure::strict)?;
                Ok(binary(lhs, op, rhs))
            }

            None => Ok(lhs),
        }
    }

    fn additive(&mut self) -> Parse<Located<Expr>> {
        self.left_assoc(
            &[(Token::Plus, BinOp::Add), (Token::Minus, BinOp::Sub)],
            Parser::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Parse<Located<Expr>> {
        self.left_assoc(
            &[(Token::Times, BinOp::Mul), (Token::Slash, BinOp::Div)],
            Parser::unary,
        )
    }

    fn unary(&mut self) -> Parse<Located<Expr>> {
        let op = match self.tokens.peek().map(|token| token.as_ref()) {
            Some(Token::Minus) => UnOp::Negate,
            Some(Token::Plus) => UnOp::Identity,
            _ => return self.primary(),
        };

        let start = self.next()?.location().clone();
        let operand = self.unary().map_err(Failure::strict)?;
        let location = Location::span(start, operand.location());

        Ok(Located::at(Expr::Unary(op, Box::new(operand)), location))
    }

    fn primary(&mut self) -> Parse<Located<Expr>> {
        let (location, token) = self.next()?.split();

        let expr = match token {
            Token::IntLiteral(integer) => return Ok(self.number(Number::Int(integer), location)),
            Token::FloatLiteral(float) => return Ok(self.number(Number::Float(float), location)),

            Token::StrLiteral(string) => Expr::Str(string),
            Token::Keyword(Keyword::True) => Expr::True,
            Token::Keyword(Keyword::False) => Expr::False,

            Token::Keyword(Keyword::Sensor) => {
                self.expect(Token::OpenParen)?;
                let name = self.id()?;
                self.expect(Token::CloseParen)?;

                Expr::Sensor(name)
            }

            Token::Id(id) => Expr::Read(Located::at(id, location.clone())),

            Token::OpenParen => {
                let inner = self.expr().map_err(Failure::strict)?;
                self.expect(Token::CloseParen)?;

                let location = Location::span(location, &self.last_known);
                return Ok(self.measured(Located::at(inner.into_inner(), location)));
            }

            token => {
                return self
                    .fail(ParserError::ExpectedExpr(token))
                    .map_err(Failure::weak)
            }
        };

        let location = Location::span(location, &self.last_known);
        Ok(self.measured(Located::at(expr, location)))
    }

    /// Literal numérico con su unidad opcional.
    fn number(&mut self, value: Number, location: Location) -> Located<Expr> {
        match self.unit() {
            Some(unit) => {
                let location = Location::span(location, unit.location());
                Located::at(
                    Expr::Number {
                        value,
                        unit: Some(unit),
                    },
                    location,
                )
            }

            None => Located::at(Expr::Number { value, unit: None }, location),
        }
    }

    /// Registra una unidad que sigue a algo distinto de un literal.
    fn measured(&mut self, expr: Located<Expr>) -> Located<Expr> {
        match self.unit() {
            Some(unit) => {
                let location = Location::span(expr.location().clone(), unit.location());
                Located::at(Expr::Measured(Box::new(expr), unit), location)
            }

            None => expr,
        }
    }

    fn unit(&mut self) -> Option<Located<Unit>> {
        match self.tokens.peek().map(|token| token.as_ref()) {
            Some(Token::Unit(_)) => (),
            _ => return None,
        }

        match self.next().ok()?.split() {
            (location, Token::Unit(unit)) => Some(Located::at(unit, location)),
            _ => None,
        }
    }

    fn left_assoc<F>(&mut self, operators: &[(Token, BinOp)], mut operand: F) -> Parse<Located<Expr>>
    where
        F: FnMut(&mut Self) -> Parse<Located<Expr>>,
    {
        let mut lhs = operand(self)?;
        while let Some(op) = self.operator(operators) {
            let rhs = operand(self).map_err(Failure::strict)?;
            lhs = binary(lhs, op, rhs);
        }

        Ok(lhs)
    }

    /// Consume el siguiente token si es alguno de los operadores dados.
    fn operator(&mut self, operators: &[(Token, BinOp)]) -> Option<BinOp> {
        let next = self.tokens.peek().map(|token| token.as_ref())?;
        let op = operators
            .iter()
            .find(|(token, _)| token == next)
            .map(|&(_, op)| op)?;

        self.next().ok()?;
        Some(op)
    }

    fn typ(&mut self) -> Parse<Located<Type>> {
        let (location, token) = self.next()?.split();
        let typ = match token {
            Token::Keyword(Keyword::Int) => Type::Int,
            Token::Keyword(Keyword::Float) => Type::Float,
            Token::Keyword(Keyword::Bool) => Type::Bool,
            Token::Keyword(Keyword::Str) => Type::Str,

            token => self.fail(ParserError::ExpectedType(token))?,
        };

        Ok(Located::at(typ, location))
    }

    fn register(&mut self) -> Parse<Located<Register>> {
        let (location, token) = self.next()?.split();
        match token {
            Token::Register(register) => Ok(Located::at(register, location)),
            token => self.fail(ParserError::ExpectedRegister(token)),
        }
    }

    fn cell(&mut self) -> Parse<Located<u32>> {
        let (location, token) = self.next()?.split();
        match token {
            Token::IntLiteral(cell) => match u32::try_from(cell) {
                Ok(cell) => Ok(Located::at(cell, location)),
                Err(_) => self.fail(ParserError::CellOutOfRange(cell)),
            },

            token => self.fail(ParserError::ExpectedCell(token)),
        }
    }

    fn optional<T, F>(&mut self, rule: F) -> Parse<Option<T>>
    where
        F: FnOnce(&mut Self) -> Parse<T>,
    {
        match self.attempt(rule) {
            Err(Failure::Weak(_)) => Ok(None),
            result => Ok(Some(result?)),
        }
    }

    fn attempt<T, F>(&mut self, rule: F) -> Parse<T>
    where
        F: FnOnce(&mut Self) -> Parse<T>,
    {
        let mut fork = self.clone();

        let result = rule(&mut fork);
        if result.is_ok() {
            *self = fork;
        }

        result
    }

    fn comma_separated<T, F>(&mut self, mut rule: F) -> Parse<Vec<T>>
    where
        F: FnMut(&mut Self) -> Parse<T>,
    {
        let mut items = vec![rule(self).map_err(Failure::strict)?];
        while self.accept(Token::Comma) {
            items.push(rule(self).map_err(Failure::strict)?);
        }

        Ok(items)
    }

    /// Consume `token` si es el siguiente.
    fn accept(&mut self, token: Token) -> bool {
        self.attempt(|s| s.expect(token).map_err(Failure::weak))
            .is_ok()
    }

    fn id(&mut self) -> Parse<Located<Identifier>> {
        let (location, token) = self.next()?.split();
        match token {
            Token::Id(id) => Ok(Located::at(id, location)),
            token => self.fail(ParserError::ExpectedId(token)),
        }
    }

    fn keyword(&mut self, keyword: Keyword) -> Parse<()> {
        self.expect(Token::Keyword(keyword))
    }

    fn expect(&mut self, token: Token) -> Parse<()> {
        match self.next().map(Located::into_inner) {
            Ok(found) if found == token => Ok(()),
            Ok(found) => self.fail(ParserError::UnexpectedToken(token, found)),
            Err(_) => self.fail(ParserError::MissingToken(token)),
        }
    }

    fn next(&mut self) -> Parse<Located<Token>> {
        match self.tokens.next() {
            Some(token) => {
                self.last_known = token.location().clone();
                Ok(token.clone())
            }

            None => self.fail(ParserError::UnexpectedEof),
        }
    }

    fn fail<T>(&self, error: ParserError) -> Parse<T> {
        Err(Failure::Strict(Located::at(error, self.last_known.clone())))
    }
}

fn binary(lhs: Located<Expr>, op: BinOp, rhs: Located<Expr>) -> Located<Expr> {
    let location = Location::span(lhs.location().clone(), rhs.location());
    Located::at(Expr::Binary(Box::new(lhs), op, Box::new(rhs)), location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::Lexer, source};

    fn parse_str(text: &str) -> Result<Ast, ParserError> {
        let (start, stream) = source::consume(text.as_bytes(), "<test>");
        let tokens = Lexer::new(start.clone(), stream).try_exhaustive().unwrap();
        parse(tokens.iter(), start).map_err(Located::into_inner)
    }

    fn single_expr(text: &str) -> Located<Expr> {
        let ast = parse_str(&format!("ESTEIRA t {{ x = {}; }}", text)).unwrap();
        match ast.statements.into_iter().next().map(Located::into_inner) {
            Some(Statement::Assignment { value, .. }) => value,
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    fn inner<T>(located: &Located<T>) -> &T {
        located.as_ref()
    }

    /// Reescribe una expresión con paréntesis explícitos.
    fn shape(expr: &Expr) -> String {
        match expr {
            Expr::True => "TRUE".into(),
            Expr::False => "FALSE".into(),
            Expr::Number { value, unit: None } => value.to_string(),
            Expr::Number {
                value,
                unit: Some(unit),
            } => format!("{}{}", value, inner(unit)),
            Expr::Str(string) => format!("{:?}", string),
            Expr::Sensor(name) => format!("SENSOR({})", inner(name)),
            Expr::Read(name) => inner(name).to_string(),
            Expr::Unary(UnOp::Negate, operand) => format!("(-{})", shape(inner(operand))),
            Expr::Unary(UnOp::Identity, operand) => format!("(+{})", shape(inner(operand))),
            Expr::Binary(lhs, op, rhs) => {
                format!("({} {:?} {})", shape(inner(lhs)), op, shape(inner(rhs)))
            }
            Expr::Measured(measured, unit) => {
                format!("[{}]{}", shape(inner(measured)), inner(unit))
            }
        }
    }

    #[test]
    fn precedence_and_associativity() {
        let expr = single_expr("a || b && c + d / e < 3 - -f");
        assert_eq!(
            shape(inner(&expr)),
            "(a Or (b And ((c Add (d Div e)) Less (3 Sub (-f)))))"
        );

        let expr = single_expr("1 - 2 - 3");
        assert_eq!(shape(inner(&expr)), "((1 Sub 2) Sub 3)");

        let expr = single_expr("(1 + 2) * +3");
        assert_eq!(shape(inner(&expr)), "((1 Add 2) Mul (+3))");
    }

    #[test]
    fn units_bind_to_literals() {
        let expr = single_expr("2 s + 36 km/h");
        assert_eq!(shape(inner(&expr)), "(2s Add 36km/h)");

        let expr = single_expr("(t + 1) min");
        assert_eq!(shape(inner(&expr)), "[(t Add 1)]min");
    }

    #[test]
    fn comparisons_do_not_chain() {
        assert!(matches!(
            parse_str("ESTEIRA t { x = a < b < c; }"),
            Err(ParserError::UnexpectedToken(Token::Semicolon, Token::Less))
        ));
    }

    #[test]
    fn full_program() {
        let ast = parse_str(
            r#"
            ESTEIRA forno {
                VAR int x = 3;
                VAR string nome;
                REG R1 = velocidade;
                MEM[4] = contador;

                SE (x > 2) { BIP; } SENAO { LIGAR; }
                ENQUANTO (SENSOR(temp) < 50) { ESPERAR(1 s); }
                MOSTRAR("v=", x, velocidade);
                DEFINIR potencia = 80 %;
                DESLIGAR; INICIAR; PARAR;
            }
            "#,
        )
        .unwrap();

        assert_eq!(inner(ast.name()).to_string(), "forno");
        assert_eq!(ast.declarations().len(), 4);
        assert!(matches!(
            &ast.declarations()[3],
            Declaration::Memory { cell, .. } if *inner(cell) == 4
        ));

        let kinds: Vec<_> = ast
            .statements()
            .iter()
            .map(|statement| match inner(statement) {
                Statement::If { otherwise, .. } => format!("if/{}", otherwise.is_some()),
                Statement::While { .. } => "while".into(),
                Statement::Show(args) => format!("show/{}", args.len()),
                Statement::Define { .. } => "define".into(),
                Statement::PowerOff => "off".into(),
                Statement::Start => "start".into(),
                Statement::Stop => "stop".into(),
                other => format!("{:?}", other),
            })
            .collect();

        assert_eq!(
            kinds,
            ["if/true", "while", "show/3", "define", "off", "start", "stop"]
        );
    }

    #[test]
    fn declarations_precede_statements() {
        assert!(matches!(
            parse_str("ESTEIRA t { BIP; VAR int x; }"),
            Err(ParserError::ExpectedStatement(Token::Keyword(Keyword::Var)))
        ));
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(
            parse_str("ESTEIRA t { BIP }"),
            Err(ParserError::UnexpectedToken(Token::Semicolon, Token::CloseCurly))
        ));

        assert!(matches!(
            parse_str("ESTEIRA t { MOSTRAR(); }"),
            Err(ParserError::ExpectedExpr(Token::CloseParen))
        ));

        assert!(matches!(
            parse_str("ESTEIRA t { REG R7 = x; }"),
            Err(ParserError::ExpectedRegister(Token::Id(_)))
        ));

        assert!(matches!(
            parse_str("ESTEIRA t { MEM[5000000000] = x; }"),
            Err(ParserError::CellOutOfRange(5_000_000_000))
        ));

        assert!(matches!(
            parse_str("ESTEIRA t { } BIP;"),
            Err(ParserError::TrailingInput(Token::Keyword(Keyword::Bip)))
        ));

        assert!(matches!(
            parse_str("ESTEIRA t { SE (x) { BIP; }"),
            Err(ParserError::UnexpectedEof)
        ));

        assert!(matches!(parse_str(""), Err(ParserError::MissingToken(_))));
    }

    #[test]
    fn errors_point_at_offending_token() {
        let text = "ESTEIRA t {\n  BIP;\n  x = ;\n}";
        let (start, stream) = source::consume(text.as_bytes(), "<test>");
        let tokens = Lexer::new(start.clone(), stream).try_exhaustive().unwrap();

        let error = parse(tokens.iter(), start).unwrap_err();
        assert!(matches!(inner(&error), ParserError::ExpectedExpr(Token::Semicolon)));
        assert_eq!(error.location().start().line(), 3);
        assert_eq!(error.location().start().column(), 7);
    }
}
