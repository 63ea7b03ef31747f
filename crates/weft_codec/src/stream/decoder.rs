use crate::error::{CodecError, ErrorKind};

use super::{Number, TokenKind};

/// Read cursor over the token grammar, targeted by every deserializer.
///
/// Objects are read as `begin_object` followed by `next_key` until it
/// returns `None`; the value of each key is read (or skipped) before the
/// next call. Arrays are read as `begin_array` followed by
/// `has_next_element` until it returns `false`.
pub trait Decoder {
    /// Kind of the next value, without consuming it.
    fn peek(&mut self) -> Result<TokenKind, CodecError>;

    fn decode_null(&mut self) -> Result<(), CodecError>;

    fn decode_bool(&mut self) -> Result<bool, CodecError>;

    fn decode_number(&mut self) -> Result<Number, CodecError>;

    fn decode_string(&mut self) -> Result<String, CodecError>;

    /// Reads a binary scalar. Not every wire format has one.
    fn decode_binary(&mut self) -> Result<Vec<u8>, CodecError> {
        Err(ErrorKind::NotImplemented("binary values").into())
    }

    fn begin_object(&mut self) -> Result<(), CodecError>;

    /// The next key of the current object, `None` (consuming the end) when done.
    fn next_key(&mut self) -> Result<Option<String>, CodecError>;

    fn begin_array(&mut self) -> Result<(), CodecError>;

    /// Whether another element follows, consuming the end when not.
    fn has_next_element(&mut self) -> Result<bool, CodecError>;

    /// Fails if anything but trailing whitespace follows the root value.
    fn finish(&mut self) -> Result<(), CodecError> {
        Ok(())
    }

    fn decode_i64(&mut self) -> Result<i64, CodecError> {
        match self.decode_number()? {
            Number::Int(v) => Ok(v),
            Number::UInt(v) => {
                i64::try_from(v).map_err(|_| CodecError::type_mismatch("i64", v.to_string()))
            }
            Number::Float(v) => Err(CodecError::type_mismatch("integer", v.to_string())),
        }
    }

    fn decode_u64(&mut self) -> Result<u64, CodecError> {
        match self.decode_number()? {
            Number::UInt(v) => Ok(v),
            Number::Int(v) => {
                u64::try_from(v).map_err(|_| CodecError::type_mismatch("u64", v.to_string()))
            }
            Number::Float(v) => Err(CodecError::type_mismatch("integer", v.to_string())),
        }
    }

    fn decode_f64(&mut self) -> Result<f64, CodecError> {
        Ok(match self.decode_number()? {
            Number::Int(v) => v as f64,
            Number::UInt(v) => v as f64,
            Number::Float(v) => v,
        })
    }

    /// Consumes and discards one complete value.
    fn skip_value(&mut self) -> Result<(), CodecError> {
        match self.peek()? {
            TokenKind::Null => self.decode_null(),
            TokenKind::Boolean => self.decode_bool().map(drop),
            TokenKind::Number => self.decode_number().map(drop),
            TokenKind::String => self.decode_string().map(drop),
            TokenKind::Binary => self.decode_binary().map(drop),
            TokenKind::Object => {
                self.begin_object()?;
                while self.next_key()?.is_some() {
                    self.skip_value()?;
                }
                Ok(())
            }
            TokenKind::Array => {
                self.begin_array()?;
                while self.has_next_element()? {
                    self.skip_value()?;
                }
                Ok(())
            }
        }
    }
}

impl<D: Decoder + ?Sized> Decoder for &mut D {
    fn peek(&mut self) -> Result<TokenKind, CodecError> {
        (**self).peek()
    }

    fn decode_null(&mut self) -> Result<(), CodecError> {
        (**self).decode_null()
    }

    fn decode_bool(&mut self) -> Result<bool, CodecError> {
        (**self).decode_bool()
    }

    fn decode_number(&mut self) -> Result<Number, CodecError> {
        (**self).decode_number()
    }

    fn decode_string(&mut self) -> Result<String, CodecError> {
        (**self).decode_string()
    }

    fn decode_binary(&mut self) -> Result<Vec<u8>, CodecError> {
        (**self).decode_binary()
    }

    fn begin_object(&mut self) -> Result<(), CodecError> {
        (**self).begin_object()
    }

    fn next_key(&mut self) -> Result<Option<String>, CodecError> {
        (**self).next_key()
    }

    fn begin_array(&mut self) -> Result<(), CodecError> {
        (**self).begin_array()
    }

    fn has_next_element(&mut self) -> Result<bool, CodecError> {
        (**self).has_next_element()
    }

    fn finish(&mut self) -> Result<(), CodecError> {
        (**self).finish()
    }

    fn decode_i64(&mut self) -> Result<i64, CodecError> {
        (**self).decode_i64()
    }

    fn decode_u64(&mut self) -> Result<u64, CodecError> {
        (**self).decode_u64()
    }

    fn decode_f64(&mut self) -> Result<f64, CodecError> {
        (**self).decode_f64()
    }

    fn skip_value(&mut self) -> Result<(), CodecError> {
        (**self).skip_value()
    }
}
