use crate::error::CodecError;

use super::Token;

// -----------------------------------------------------------------------------
// Encoder

/// Write-only token API targeted by every serializer.
///
/// Tokens must nest well: each begin is matched by its end before the
/// enclosing container continues, object members are a key followed by
/// exactly one value, and there is one root value.
pub trait Encoder {
    fn write_token(&mut self, token: Token<'_>) -> Result<(), CodecError>;

    #[inline]
    fn begin_object(&mut self) -> Result<(), CodecError> {
        self.write_token(Token::BeginObject)
    }

    #[inline]
    fn end_object(&mut self) -> Result<(), CodecError> {
        self.write_token(Token::EndObject)
    }

    #[inline]
    fn begin_array(&mut self) -> Result<(), CodecError> {
        self.write_token(Token::BeginArray)
    }

    #[inline]
    fn end_array(&mut self) -> Result<(), CodecError> {
        self.write_token(Token::EndArray)
    }

    #[inline]
    fn encode_key(&mut self, key: &str) -> Result<(), CodecError> {
        self.write_token(Token::Key(key))
    }

    #[inline]
    fn encode_null(&mut self) -> Result<(), CodecError> {
        self.write_token(Token::Null)
    }

    #[inline]
    fn encode_bool(&mut self, value: bool) -> Result<(), CodecError> {
        self.write_token(Token::Bool(value))
    }

    #[inline]
    fn encode_i64(&mut self, value: i64) -> Result<(), CodecError> {
        self.write_token(Token::Int(value))
    }

    #[inline]
    fn encode_u64(&mut self, value: u64) -> Result<(), CodecError> {
        self.write_token(Token::UInt(value))
    }

    #[inline]
    fn encode_f64(&mut self, value: f64) -> Result<(), CodecError> {
        self.write_token(Token::Float(value))
    }

    #[inline]
    fn encode_str(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_token(Token::Str(value))
    }

    #[inline]
    fn encode_binary(&mut self, value: &[u8]) -> Result<(), CodecError> {
        self.write_token(Token::Binary(value))
    }
}

// -----------------------------------------------------------------------------
// TokenWriter

/// A raw token sink, e.g. a JSON text writer.
///
/// Sinks trust their input; wrap them in a [`StreamEncoder`] to validate it.
pub trait TokenWriter {
    fn write(&mut self, token: Token<'_>) -> Result<(), CodecError>;

    /// Pushes buffered output to the underlying byte sink.
    fn flush(&mut self) -> Result<(), CodecError> {
        Ok(())
    }
}

impl<W: TokenWriter + ?Sized> TokenWriter for &mut W {
    #[inline]
    fn write(&mut self, token: Token<'_>) -> Result<(), CodecError> {
        (**self).write(token)
    }

    #[inline]
    fn flush(&mut self) -> Result<(), CodecError> {
        (**self).flush()
    }
}

// -----------------------------------------------------------------------------
// StreamEncoder

#[derive(Debug, Clone, Copy)]
enum Frame {
    Object { expect_key: bool },
    Array,
}

/// An [`Encoder`] that checks the token grammar before a token reaches the sink.
///
/// The first violation fails with `MalformedOutput` and poisons the
/// encoder: every later token is rejected too.
pub struct StreamEncoder<W> {
    sink: W,
    stack: Vec<Frame>,
    root_done: bool,
    poisoned: bool,
}

impl<W: TokenWriter> StreamEncoder<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            stack: Vec::new(),
            root_done: false,
            poisoned: false,
        }
    }

    /// Checks that exactly one complete value was written, then flushes the sink.
    pub fn finish(&mut self) -> Result<(), CodecError> {
        if self.poisoned {
            return Err(CodecError::malformed("encoder failed earlier"));
        }
        if !self.stack.is_empty() || !self.root_done {
            return Err(CodecError::malformed("incomplete output"));
        }
        self.sink.flush()
    }

    /// Flushes the sink without checking completeness.
    pub fn flush(&mut self) -> Result<(), CodecError> {
        self.sink.flush()
    }

    #[inline]
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    #[inline]
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn check(&mut self, token: &Token<'_>) -> Result<(), &'static str> {
        match token {
            Token::EndObject => match self.stack.pop() {
                Some(Frame::Object { expect_key: true }) => {
                    self.value_done();
                    Ok(())
                }
                Some(Frame::Object { expect_key: false }) => Err("key without value"),
                _ => Err("end of object outside of an object"),
            },
            Token::EndArray => match self.stack.pop() {
                Some(Frame::Array) => {
                    self.value_done();
                    Ok(())
                }
                _ => Err("end of array outside of an array"),
            },
            Token::Key(_) => match self.stack.last_mut() {
                Some(Frame::Object { expect_key }) if *expect_key => {
                    *expect_key = false;
                    Ok(())
                }
                Some(Frame::Object { .. }) => Err("two keys in a row"),
                _ => Err("key outside of an object"),
            },
            _ => {
                match self.stack.last() {
                    Some(Frame::Object { expect_key: true }) => return Err("value without key"),
                    None if self.root_done => return Err("more than one root value"),
                    _ => {}
                }
                match token {
                    Token::BeginObject => self.stack.push(Frame::Object { expect_key: true }),
                    Token::BeginArray => self.stack.push(Frame::Array),
                    _ => self.value_done(),
                }
                Ok(())
            }
        }
    }

    fn value_done(&mut self) {
        match self.stack.last_mut() {
            Some(Frame::Object { expect_key }) => *expect_key = true,
            Some(Frame::Array) => {}
            None => self.root_done = true,
        }
    }
}

impl<W: TokenWriter> Encoder for StreamEncoder<W> {
    fn write_token(&mut self, token: Token<'_>) -> Result<(), CodecError> {
        if self.poisoned {
            return Err(CodecError::malformed("encoder failed earlier"));
        }
        if let Err(msg) = self.check(&token) {
            self.poisoned = true;
            return Err(CodecError::malformed(msg));
        }
        self.sink.write(token).inspect_err(|_| self.poisoned = true)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{Encoder, StreamEncoder};
    use crate::error::ErrorKind;
    use crate::stream::TokenBuffer;

    #[test]
    fn accepts_well_formed_output() {
        let mut encoder = StreamEncoder::new(TokenBuffer::new());
        encoder.begin_object().unwrap();
        encoder.encode_key("a").unwrap();
        encoder.begin_array().unwrap();
        encoder.encode_i64(1).unwrap();
        encoder.encode_null().unwrap();
        encoder.end_array().unwrap();
        encoder.encode_key("b").unwrap();
        encoder.encode_str("x").unwrap();
        encoder.end_object().unwrap();
        encoder.finish().unwrap();
        assert_eq!(encoder.into_inner().to_string(), r#"{"a":[1,null],"b":"x"}"#);
    }

    #[test]
    fn violation_never_reaches_sink() {
        let mut encoder = StreamEncoder::new(TokenBuffer::new());
        encoder.begin_object().unwrap();
        let err = encoder.encode_i64(1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MalformedOutput(_)));
        // poisoned afterwards
        assert!(encoder.encode_key("a").is_err());
        assert_eq!(encoder.get_ref().len(), 1);
    }

    #[test]
    fn rejects_unbalanced_and_extra_roots() {
        let mut encoder = StreamEncoder::new(TokenBuffer::new());
        encoder.begin_array().unwrap();
        assert!(encoder.end_object().is_err());

        let mut encoder = StreamEncoder::new(TokenBuffer::new());
        encoder.encode_bool(true).unwrap();
        assert!(encoder.encode_bool(false).is_err());

        let mut encoder = StreamEncoder::new(TokenBuffer::new());
        encoder.begin_object().unwrap();
        encoder.encode_key("k").unwrap();
        assert!(encoder.end_object().is_err());

        let mut encoder = StreamEncoder::new(TokenBuffer::new());
        encoder.begin_object().unwrap();
        assert!(matches!(
            encoder.finish().unwrap_err().kind(),
            ErrorKind::MalformedOutput(_)
        ));
    }
}
