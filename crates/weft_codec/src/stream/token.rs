use std::fmt;

/// Kind of the next value in a token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Null,
    Boolean,
    Number,
    String,
    Binary,
    Object,
    Array,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Null => "null",
            TokenKind::Boolean => "boolean",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Binary => "binary",
            TokenKind::Object => "object",
            TokenKind::Array => "array",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A numeric scalar as read from the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::UInt(v) => write!(f, "{v}"),
            Number::Float(v) => write!(f, "{v:?}"),
        }
    }
}

/// One token written to an encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Key(&'a str),
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(&'a str),
    Binary(&'a [u8]),
}
