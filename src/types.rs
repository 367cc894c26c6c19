use serde::{Deserialize, Serialize};
use std::fmt;

/// One element of a program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    /// Name of a machine instruction, resolved through the registry at run time
    Opcode(String),
    Integer(i64),
    /// Raw bytes of a quoted string literal
    Str(Vec<u8>),
}

impl Token {
    pub fn opcode(name: &str) -> Self {
        Token::Opcode(name.to_string())
    }

    pub fn is_opcode(&self) -> bool {
        matches!(self, Token::Opcode(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Opcode(name) => write!(f, "{}", name),
            Token::Integer(n) => write!(f, "{}", n),
            Token::Str(bytes) => write_quoted(f, bytes),
        }
    }
}

/// Human-readable program text, tokens separated by single spaces.
pub fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| token.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Data stack value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Bool(bool),
    Str(Vec<u8>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
        }
    }

    /// Numeric view used by fitness scoring. Booleans are not numbers here.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(n) => *n != 0,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(bytes) => write_quoted(f, bytes),
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    write!(f, "\"")?;
    for &b in bytes {
        write!(f, "{}", std::ascii::escape_default(b))?;
    }
    write!(f, "\"")
}
