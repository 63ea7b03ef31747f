use std::fmt;

use crate::error::CodecError;

use super::{Decoder, Number, Token, TokenKind, TokenWriter};

#[derive(Debug, Clone, PartialEq)]
enum Recorded {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Key(String),
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Binary(Vec<u8>),
}

// -----------------------------------------------------------------------------
// TokenBuffer

/// An in-memory token sequence.
///
/// Records one value read from a [`Decoder`] and replays it later, so a
/// polymorphic object can be decoded when its discriminator key arrives
/// after other keys. Also a [`TokenWriter`], which makes it a wire
/// format-free sink for tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenBuffer {
    tokens: Vec<Recorded>,
}

impl TokenBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads one complete value from `decoder`.
    pub fn capture(decoder: &mut dyn Decoder) -> Result<Self, CodecError> {
        let mut buffer = Self::new();
        buffer.capture_value(decoder)?;
        Ok(buffer)
    }

    fn capture_value(&mut self, decoder: &mut dyn Decoder) -> Result<(), CodecError> {
        let token = match decoder.peek()? {
            TokenKind::Null => {
                decoder.decode_null()?;
                Recorded::Null
            }
            TokenKind::Boolean => Recorded::Bool(decoder.decode_bool()?),
            TokenKind::Number => Recorded::Number(decoder.decode_number()?),
            TokenKind::String => Recorded::String(decoder.decode_string()?),
            TokenKind::Binary => Recorded::Binary(decoder.decode_binary()?),
            TokenKind::Object => {
                decoder.begin_object()?;
                self.tokens.push(Recorded::BeginObject);
                while let Some(key) = decoder.next_key()? {
                    self.tokens.push(Recorded::Key(key));
                    self.capture_value(decoder)?;
                }
                Recorded::EndObject
            }
            TokenKind::Array => {
                decoder.begin_array()?;
                self.tokens.push(Recorded::BeginArray);
                while decoder.has_next_element()? {
                    self.capture_value(decoder)?;
                }
                Recorded::EndArray
            }
        };
        self.tokens.push(token);
        Ok(())
    }

    /// A decoder replaying the recorded tokens.
    pub fn decoder(&self) -> BufferDecoder<'_> {
        BufferDecoder {
            tokens: &self.tokens,
            pos: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TokenWriter for TokenBuffer {
    fn write(&mut self, token: Token<'_>) -> Result<(), CodecError> {
        self.tokens.push(match token {
            Token::BeginObject => Recorded::BeginObject,
            Token::EndObject => Recorded::EndObject,
            Token::BeginArray => Recorded::BeginArray,
            Token::EndArray => Recorded::EndArray,
            Token::Key(key) => Recorded::Key(key.to_owned()),
            Token::Null => Recorded::Null,
            Token::Bool(v) => Recorded::Bool(v),
            Token::Int(v) => Recorded::Number(Number::Int(v)),
            Token::UInt(v) => Recorded::Number(Number::UInt(v)),
            Token::Float(v) => Recorded::Number(Number::Float(v)),
            Token::Str(v) => Recorded::String(v.to_owned()),
            Token::Binary(v) => Recorded::Binary(v.to_vec()),
        });
        Ok(())
    }
}

/// Compact JSON-like rendering, binary values as `b"<hex>"`.
impl fmt::Display for TokenBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut need_comma = false;
        for token in &self.tokens {
            let opens_member = !matches!(token, Recorded::EndObject | Recorded::EndArray);
            if need_comma && opens_member {
                f.write_str(",")?;
            }
            match token {
                Recorded::BeginObject => f.write_str("{")?,
                Recorded::EndObject => f.write_str("}")?,
                Recorded::BeginArray => f.write_str("[")?,
                Recorded::EndArray => f.write_str("]")?,
                Recorded::Key(key) => write!(f, "{key:?}:")?,
                Recorded::Null => f.write_str("null")?,
                Recorded::Bool(v) => write!(f, "{v}")?,
                Recorded::Number(v) => write!(f, "{v}")?,
                Recorded::String(v) => write!(f, "{v:?}")?,
                Recorded::Binary(v) => {
                    f.write_str("b\"")?;
                    for byte in v {
                        write!(f, "{byte:02x}")?;
                    }
                    f.write_str("\"")?;
                }
            }
            need_comma = !matches!(
                token,
                Recorded::BeginObject | Recorded::BeginArray | Recorded::Key(_)
            );
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// BufferDecoder

/// [`Decoder`] over the tokens of a [`TokenBuffer`].
pub struct BufferDecoder<'a> {
    tokens: &'a [Recorded],
    pos: usize,
}

impl<'a> BufferDecoder<'a> {
    fn current(&self) -> Result<&'a Recorded, CodecError> {
        self.tokens
            .get(self.pos)
            .ok_or_else(|| CodecError::syntax("unexpected end of buffered input"))
    }

    /// Consumes the next value token if `accept` takes it.
    fn next_value<T>(
        &mut self,
        expected: &'static str,
        accept: impl FnOnce(&'a Recorded) -> Option<T>,
    ) -> Result<T, CodecError> {
        let kind = self.peek()?;
        match accept(self.current()?) {
            Some(value) => {
                self.pos += 1;
                Ok(value)
            }
            None => Err(CodecError::unexpected_token(expected, kind)),
        }
    }
}

impl Decoder for BufferDecoder<'_> {
    fn peek(&mut self) -> Result<TokenKind, CodecError> {
        Ok(match self.current()? {
            Recorded::BeginObject => TokenKind::Object,
            Recorded::BeginArray => TokenKind::Array,
            Recorded::Null => TokenKind::Null,
            Recorded::Bool(_) => TokenKind::Boolean,
            Recorded::Number(_) => TokenKind::Number,
            Recorded::String(_) => TokenKind::String,
            Recorded::Binary(_) => TokenKind::Binary,
            Recorded::EndObject | Recorded::EndArray | Recorded::Key(_) => {
                return Err(CodecError::syntax("expected a value"));
            }
        })
    }

    fn decode_null(&mut self) -> Result<(), CodecError> {
        self.next_value("null", |token| matches!(token, Recorded::Null).then_some(()))
    }

    fn decode_bool(&mut self) -> Result<bool, CodecError> {
        self.next_value("boolean", |token| match token {
            Recorded::Bool(v) => Some(*v),
            _ => None,
        })
    }

    fn decode_number(&mut self) -> Result<Number, CodecError> {
        self.next_value("number", |token| match token {
            Recorded::Number(v) => Some(*v),
            _ => None,
        })
    }

    fn decode_string(&mut self) -> Result<String, CodecError> {
        self.next_value("string", |token| match token {
            Recorded::String(v) => Some(v.clone()),
            _ => None,
        })
    }

    fn decode_binary(&mut self) -> Result<Vec<u8>, CodecError> {
        self.next_value("binary", |token| match token {
            Recorded::Binary(v) => Some(v.clone()),
            _ => None,
        })
    }

    fn begin_object(&mut self) -> Result<(), CodecError> {
        self.next_value("object", |token| {
            matches!(token, Recorded::BeginObject).then_some(())
        })
    }

    fn next_key(&mut self) -> Result<Option<String>, CodecError> {
        let key = match self.current()? {
            Recorded::Key(key) => Some(key.clone()),
            Recorded::EndObject => None,
            _ => return Err(CodecError::syntax("expected a key or the end of an object")),
        };
        self.pos += 1;
        Ok(key)
    }

    fn begin_array(&mut self) -> Result<(), CodecError> {
        self.next_value("array", |token| {
            matches!(token, Recorded::BeginArray).then_some(())
        })
    }

    fn has_next_element(&mut self) -> Result<bool, CodecError> {
        if matches!(self.current()?, Recorded::EndArray) {
            self.pos += 1;
            Ok(false)
        } else {
            Ok(true)
        }
    }

    fn finish(&mut self) -> Result<(), CodecError> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(CodecError::syntax("trailing buffered tokens"))
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
