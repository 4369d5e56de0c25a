//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone un [`InputStream`]
//! (flujo de caracteres) en unidades léxicas denominadas tokens. Los espacios
//! en blanco y los comentarios (`// ...` y `/* ... */`) se descartan durante
//! esta operación. Cada token emitido está asociado a una ubicación en el
//! código fuente original.
//!
//! # Contenido de un token
//! Operadores, puntuación, palabras clave, registros y unidades se identifican
//! por lo que son y no incluyen lexemas. Los identificadores sí incluyen su
//! lexema. Las constantes literales se resuelven a sus valores: los enteros
//! a `i64`, los flotantes a `f64` y las cadenas a su contenido ya sin
//! secuencias de escape.
//!
//! # Reglas importantes del lenguaje
//! - El lenguaje distingue mayúsculas de minúsculas: `SE` es palabra clave,
//!   `se` es un identificador.
//! - Los nombres de unidad (`m`, `s`, `ms`, `min`, `km`, `graus`, `bpm`) son
//!   reservados y nunca forman identificadores.
//! - `km/h` y `m/s` se reconocen como una sola unidad. Se prefiere siempre
//!   la coincidencia más larga.
//!
//! # Errores
//! El lexer es capaz de recuperarse parcialmente de condiciones de error,
//! descartando el resto de la línea afectada. Esto permite reportar más de
//! un error por ejecución, pero no avanzar a las demás fases.

use crate::{
    source::{InputStream, Located, Location},
    unit::Unit,
};

use std::{
    fmt::{self, Display},
    rc::Rc,
    str::FromStr,
};

use thiserror::Error;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Error de E/S originado por el [`InputStream`].
    #[error("I/O error")]
    Input(#[from] std::io::Error),

    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Se esperaba un carácter específico en esta posición.
    #[error("Expected {0:?}")]
    Expected(char),

    /// Una constante entera se encuentra fuera de rango.
    #[error("Integer literal overflow, valid range is [0, {}]", i64::MAX)]
    IntOverflow,

    /// Parte fraccionaria o exponente incompleto, o un valor que no
    /// cabe en un flotante.
    #[error("Malformed numeric literal")]
    MalformedNumber,

    /// Una cadena no se cerró antes del fin de línea.
    #[error("Unterminated string literal")]
    UnterminatedString,

    /// Secuencia de escape distinta de `\"` y `\\`.
    #[error("Unknown escape sequence `\\{0}`")]
    BadEscape(char),

    /// Un comentario `/*` llegó al final de la entrada.
    #[error("Unterminated block comment")]
    UnterminatedComment,
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Rc<str>);

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

/// Objeto resultante del análisis léxico.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identificador.
    Id(Identifier),

    /// Palabra clave.
    Keyword(Keyword),

    /// Registro de hardware, `R0` a `R3`.
    Register(Register),

    /// Sufijo de unidad.
    Unit(Unit),

    /// Literal de entero.
    IntLiteral(i64),

    /// Literal de punto flotante.
    FloatLiteral(f64),

    /// Literal de cadena, ya sin comillas ni escapes.
    StrLiteral(String),

    /// `||`
    Or,

    /// `&&`
    And,

    /// `==`
    Equal,

    /// `!=`
    NotEqual,

    /// `<`
    Less,

    /// `>`
    Greater,

    /// `<=`
    LessOrEqual,

    /// `>=`
    GreaterOrEqual,

    /// `=`
    Assign,

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `/`
    Slash,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `{`
    OpenCurly,

    /// `}`
    CloseCurly,

    /// `[`
    OpenSquare,

    /// `]`
    CloseSquare,

    /// `;`
    Semicolon,

    /// `,`
    Comma,
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Id(id) => write!(fmt, "identifier `{}`", id),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Register(register) => write!(fmt, "register `{}`", register),
            Unit(unit) => write!(fmt, "unit `{}`", unit),
            IntLiteral(integer) => write!(fmt, "literal `{}`", integer),
            FloatLiteral(float) => write!(fmt, "literal `{}`", float),
            StrLiteral(string) => write!(fmt, "literal {:?}", string),
            Or => fmt.write_str("`||`"),
            And => fmt.write_str("`&&`"),
            Equal => fmt.write_str("`==`"),
            NotEqual => fmt.write_str("`!=`"),
            Less => fmt.write_str("`<`"),
            Greater => fmt.write_str("`>`"),
            LessOrEqual => fmt.write_str("`<=`"),
            GreaterOrEqual => fmt.write_str("`>=`"),
            Assign => fmt.write_str("`=`"),
            Plus => fmt.write_str("`+`"),
            Minus => fmt.write_str("`-`"),
            Times => fmt.write_str("`*`"),
            Slash => fmt.write_str("`/`"),
            OpenParen => fmt.write_str("`(`"),
            CloseParen => fmt.write_str("`)`"),
            OpenCurly => fmt.write_str("`{`"),
            CloseCurly => fmt.write_str("`}`"),
            OpenSquare => fmt.write_str("`[`"),
            CloseSquare => fmt.write_str("`]`"),
            Semicolon => fmt.write_str("`;`"),
            Comma => fmt.write_str("`,`"),
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Esteira,
    Var,
    Se,
    Senao,
    Enquanto,
    Ligar,
    Desligar,
    Iniciar,
    Parar,
    Definir,
    Mostrar,
    Bip,
    Esperar,
    Sensor,
    Reg,
    Mem,
    True,
    False,
    Int,
    Float,
    Bool,
    Str,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("ESTEIRA",  Keyword::Esteira),
    ("VAR",      Keyword::Var),
    ("SE",       Keyword::Se),
    ("SENAO",    Keyword::Senao),
    ("ENQUANTO", Keyword::Enquanto),
    ("LIGAR",    Keyword::Ligar),
    ("DESLIGAR", Keyword::Desligar),
    ("INICIAR",  Keyword::Iniciar),
    ("PARAR",    Keyword::Parar),
    ("DEFINIR",  Keyword::Definir),
    ("MOSTRAR",  Keyword::Mostrar),
    ("BIP",      Keyword::Bip),
    ("ESPERAR",  Keyword::Esperar),
    ("SENSOR",   Keyword::Sensor),
    ("REG",      Keyword::Reg),
    ("MEM",      Keyword::Mem),
    ("TRUE",     Keyword::True),
    ("FALSE",    Keyword::False),
    ("int",      Keyword::Int),
    ("float",    Keyword::Float),
    ("bool",     Keyword::Bool),
    ("string",   Keyword::Str),
];

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = KEYWORDS
            .iter()
            .find(|&&(_, keyword)| keyword == *self)
            .map(|&(name, _)| name)
            .unwrap_or("?");

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Registro de hardware.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Register {
    R0,
    R1,
    R2,
    R3,
}

impl Display for Register {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            Register::R0 => "R0",
            Register::R1 => "R1",
            Register::R2 => "R2",
            Register::R3 => "R3",
        };

        fmt.write_str(string)
    }
}

impl FromStr for Register {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string {
            "R0" => Ok(Register::R0),
            "R1" => Ok(Register::R1),
            "R2" => Ok(Register::R2),
            "R3" => Ok(Register::R3),
            _ => Err(()),
        }
    }
}

/// Máquina de estados para análisis léxico.
///
/// La salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en el flujo de entrada.
pub struct Lexer<S: Iterator> {
    source: std::iter::Peekable<S>,
    state: State,
    start: Location,
    next: Location,

    /// Token ya reconocido que debe emitirse antes de continuar.
    ///
    /// Solo ocurre con `km/` y `m/` que no forman una unidad compuesta.
    pending: Option<Located<Token>>,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de error. Se descarta todo hasta el fin de línea.
    Error,

    /// Estado de completitud; siempre emite el token incluido,
    /// consume la entrada actual y pasa a [`State::Start`].
    Complete(Token),

    /// Se encontró `/`: división o inicio de comentario.
    Slash,

    /// Comentario de línea.
    Comment,

    /// Comentario de bloque.
    BlockComment,

    /// Comentario de bloque justo después de un `*`.
    BlockCommentStar,

    /// `=` o `==`.
    Equals,

    /// `!`, que solo puede formar `!=`.
    Bang,

    /// `<` o `<=`.
    Less,

    /// `>` o `>=`.
    Greater,

    /// `&`, que solo puede formar `&&`.
    Ampersand,

    /// `|`, que solo puede formar `||`.
    Pipe,

    /// Parte entera de una constante numérica.
    Integer(String),

    /// Se encontró `.` y se exige al menos un dígito.
    Fraction(String),

    /// Dígitos después del punto decimal.
    FractionDigits(String),

    /// Se encontró `e` o `E`.
    Exponent(String),

    /// Signo explícito del exponente.
    ExponentSign(String),

    /// Dígitos del exponente.
    ExponentDigits(String),

    /// Interior de una cadena.
    Str(String),

    /// Interior de una cadena justo después de `\`.
    StrEscape(String),

    /// Término que puede ser un identificador, palabra clave,
    /// registro o unidad.
    Word(String),

    /// Se consumió `km/` o `m/`. La ubicación es la del último
    /// carácter de la unidad simple, antes de la barra.
    UnitSlash(Unit, Location),
}

impl<S: InputStream> Lexer<S> {
    /// Crea un lexer en estado inicial a partir de un flujo.
    pub fn new(start: Location, source: S) -> Self {
        let next = start.clone();
        Lexer {
            source: source.peekable(),
            state: State::Start,
            start,
            next,
            pending: None,
        }
    }

    /// Reduce la entrada a sea una secuencia conocida de tokens
    /// infalibles o una secuencia de errores.
    ///
    /// En caso de que ocurra al menos un error, el lexer dejará
    /// de buscar tokens exitosos y comenzará a acumular solamente
    /// errores.
    pub fn try_exhaustive(mut self) -> Result<Vec<Located<Token>>, Vec<Located<LexerError>>> {
        let mut tokens = Vec::new();

        while let Some(result) = self.next() {
            match result {
                Ok(token) => tokens.push(token),
                Err(error) => {
                    drop(tokens);

                    let mut errors = vec![error];
                    errors.extend(self.filter_map(Result::err));

                    return Err(errors);
                }
            }
        }

        Ok(tokens)
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<(Token, Location)>, LexerError> {
        use State::*;

        let mut last_accepted = self.start.clone();
        let token = loop {
            // Se espera un siguiente carácter, fallando si hay error de E/S
            let next_char = match self.source.peek() {
                None => None,
                Some(Ok((c, _))) => Some(*c),
                Some(Err(_)) => match self.source.next() {
                    Some(Err(error)) => break Err(error.into()),
                    _ => unreachable!(),
                },
            };

            // La posición de origen se mueve junto a la posición
            // siguiente siempre que no se haya encontrado una
            // frontera de token
            if let Start = self.state {
                self.start = self.next.clone();
            }

            match (&mut self.state, next_char) {
                // Condiciones de error: se descarta la línea donde
                // ocurrió el error
                (Error, None) => return Ok(None),
                (Error, Some('\n')) => self.state = Start,
                (Error, Some(_)) => (),

                // Tokens triviales
                (Start, None) => return Ok(None),
                (Start, Some(',')) => self.state = Complete(Token::Comma),
                (Start, Some(';')) => self.state = Complete(Token::Semicolon),
                (Start, Some('+')) => self.state = Complete(Token::Plus),
                (Start, Some('-')) => self.state = Complete(Token::Minus),
                (Start, Some('*')) => self.state = Complete(Token::Times),
                (Start, Some('(')) => self.state = Complete(Token::OpenParen),
                (Start, Some(')')) => self.state = Complete(Token::CloseParen),
                (Start, Some('{')) => self.state = Complete(Token::OpenCurly),
                (Start, Some('}')) => self.state = Complete(Token::CloseCurly),
                (Start, Some('[')) => self.state = Complete(Token::OpenSquare),
                (Start, Some(']')) => self.state = Complete(Token::CloseSquare),
                (Start, Some('%')) => self.state = Complete(Token::Unit(Unit::Percent)),

                // Operadores de uno o dos caracteres
                (Start, Some('/')) => self.state = Slash,
                (Start, Some('=')) => self.state = Equals,
                (Start, Some('!')) => self.state = Bang,
                (Start, Some('<')) => self.state = Less,
                (Start, Some('>')) => self.state = Greater,
                (Start, Some('&')) => self.state = Ampersand,
                (Start, Some('|')) => self.state = Pipe,

                (Start, Some('"')) => self.state = Str(String::new()),

                // Identificadores, palabras clave, registros y unidades
                (Start, Some(c)) if c.is_ascii_alphabetic() || c == '_' => {
                    self.state = Word(c.to_string())
                }

                // Inicio de una constante numérica. No se consume el
                // dígito, ya que el caso de acumulación lo hará
                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Integer(String::new());
                    continue;
                }

                // Espacios en blanco y caracteres inesperados
                (Start, Some(c)) if c.is_whitespace() => (),
                (Start, Some(c)) => break Err(LexerError::BadChar(c)),

                // Emisión retardada de tokens cualesquiera
                (Complete(value), _) => break Ok(std::mem::replace(value, Token::Plus)),

                (Slash, Some('/')) => self.state = Comment,
                (Slash, Some('*')) => self.state = BlockComment,
                (Slash, _) => break Ok(Token::Slash),

                (Comment, Some('\n')) | (Comment, None) => self.state = Start,
                (Comment, Some(_)) => (),

                (BlockComment, Some('*')) => self.state = BlockCommentStar,
                (BlockComment, Some(_)) => (),
                (BlockCommentStar, Some('/')) => self.state = Start,
                (BlockCommentStar, Some('*')) => (),
                (BlockCommentStar, Some(_)) => self.state = BlockComment,
                (BlockComment, None) | (BlockCommentStar, None) => {
                    break Err(LexerError::UnterminatedComment)
                }

                (Equals, Some('=')) => self.state = Complete(Token::Equal),
                (Equals, _) => break Ok(Token::Assign),
                (Bang, Some('=')) => self.state = Complete(Token::NotEqual),
                (Bang, _) => break Err(LexerError::Expected('=')),
                (Less, Some('=')) => self.state = Complete(Token::LessOrEqual),
                (Less, _) => break Ok(Token::Less),
                (Greater, Some('=')) => self.state = Complete(Token::GreaterOrEqual),
                (Greater, _) => break Ok(Token::Greater),
                (Ampersand, Some('&')) => self.state = Complete(Token::And),
                (Ampersand, _) => break Err(LexerError::Expected('&')),
                (Pipe, Some('|')) => self.state = Complete(Token::Or),
                (Pipe, _) => break Err(LexerError::Expected('|')),

                // Constantes numéricas
                (Integer(text), Some(c)) if c.is_ascii_digit() => text.push(c),
                (Integer(text), Some('.')) => {
                    let text = std::mem::take(text) + ".";
                    self.state = Fraction(text);
                }

                (Integer(text), Some(c)) if c == 'e' || c == 'E' => {
                    let text = std::mem::take(text) + "e";
                    self.state = Exponent(text);
                }

                (Integer(text), _) => {
                    break text
                        .parse()
                        .map(Token::IntLiteral)
                        .map_err(|_| LexerError::IntOverflow)
                }

                (Fraction(text), Some(c)) if c.is_ascii_digit() => {
                    let mut text = std::mem::take(text);
                    text.push(c);
                    self.state = FractionDigits(text);
                }

                (FractionDigits(text), Some(c)) if c.is_ascii_digit() => text.push(c),
                (FractionDigits(text), Some(c)) if c == 'e' || c == 'E' => {
                    let text = std::mem::take(text) + "e";
                    self.state = Exponent(text);
                }

                (Exponent(text), Some(c)) if c == '+' || c == '-' => {
                    let mut text = std::mem::take(text);
                    text.push(c);
                    self.state = ExponentSign(text);
                }

                (Exponent(text), Some(c)) | (ExponentSign(text), Some(c)) if c.is_ascii_digit() => {
                    let mut text = std::mem::take(text);
                    text.push(c);
                    self.state = ExponentDigits(text);
                }

                (ExponentDigits(text), Some(c)) if c.is_ascii_digit() => text.push(c),
                (FractionDigits(text), _) | (ExponentDigits(text), _) => break float(text),

                (Fraction(_), _) | (Exponent(_), _) | (ExponentSign(_), _) => {
                    break Err(LexerError::MalformedNumber)
                }

                // Cadenas
                (Str(text), Some('"')) => {
                    let text = std::mem::take(text);
                    self.state = Complete(Token::StrLiteral(text));
                }

                (Str(text), Some('\\')) => {
                    let text = std::mem::take(text);
                    self.state = StrEscape(text);
                }

                (Str(_), Some('\n')) | (Str(_), None) => break Err(LexerError::UnterminatedString),
                (Str(text), Some(c)) => text.push(c),

                (StrEscape(text), Some(c)) if c == '"' || c == '\\' => {
                    let mut text = std::mem::take(text);
                    text.push(c);
                    self.state = Str(text);
                }

                (StrEscape(_), Some('\n')) | (StrEscape(_), None) => {
                    break Err(LexerError::UnterminatedString)
                }

                (StrEscape(_), Some(c)) => break Err(LexerError::BadEscape(c)),

                // Extensión de términos
                (Word(word), Some(c)) if is_word_char(c) => word.push(c),

                // `km/` y `m/` pueden continuar como `km/h` y `m/s`
                (Word(word), Some('/')) => match compound_prefix(word) {
                    Some(unit) => self.state = UnitSlash(unit, last_accepted.clone()),
                    None => break Ok(classify(std::mem::take(word))),
                },

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => break Ok(classify(std::mem::take(word))),

                (UnitSlash(unit, before_slash), next_char) => {
                    match next_char.and_then(|c| unit.per(c)) {
                        Some(compound) => self.state = Complete(Token::Unit(compound)),

                        // La barra era una división; se emite después de la unidad
                        None => {
                            let unit = *unit;
                            let slash = Located::at(Token::Slash, last_accepted.clone());

                            self.pending = Some(slash);
                            last_accepted = before_slash.clone();
                            break Ok(Token::Unit(unit));
                        }
                    }
                }
            }

            // Si no hubo `continue`, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            if let Some(Ok((_, next_position))) = self.source.next() {
                last_accepted = std::mem::replace(&mut self.next, next_position);
            }
        };

        token.map(|token| Some((token, last_accepted)))
    }
}

impl<S: InputStream> Iterator for Lexer<S> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(pending) = self.pending.take() {
            return Some(Ok(pending));
        }

        match self.lex() {
            Ok(None) => None,
            Ok(Some((token, last_accepted))) => {
                self.state = State::Start;

                let location = Location::span(self.start.clone(), &last_accepted);
                Some(Ok(Located::at(token, location)))
            }

            Err(error) => {
                self.state = State::Error;
                Some(Err(Located::at(error, self.next.clone())))
            }
        }
    }
}

/// Determina si un carácter puede pertenecer a un término.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Unidades simples que pueden ser numerador de una unidad compuesta.
fn compound_prefix(word: &str) -> Option<Unit> {
    Unit::from_word(word).filter(|unit| unit.per('h').is_some() || unit.per('s').is_some())
}

/// Decide qué clase de token es un término completo.
fn classify(word: String) -> Token {
    if let Ok(keyword) = Keyword::from_str(&word) {
        Token::Keyword(keyword)
    } else if let Ok(register) = Register::from_str(&word) {
        Token::Register(register)
    } else if let Some(unit) = Unit::from_word(&word) {
        Token::Unit(unit)
    } else {
        Token::Id(Identifier(Rc::from(word)))
    }
}

fn float(text: &str) -> Result<Token, LexerError> {
    let value: f64 = text.parse().map_err(|_| LexerError::MalformedNumber)?;

    // Un exponente extremo no puede volverse infinito ni cero
    let mantissa = text.split(|c: char| c == 'e' || c == 'E').next().unwrap_or(text);
    let vanished = value == 0.0 && mantissa.chars().any(|c| ('1'..='9').contains(&c));

    if value.is_finite() && !vanished {
        Ok(Token::FloatLiteral(value))
    } else {
        Err(LexerError::MalformedNumber)
    }
}
