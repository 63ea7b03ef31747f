//! Conversions between token streams and [`serde_json::Value`] trees.

use serde_json::{Map, Value};
use weft_codec::CodecError;
use weft_codec::stream::{Decoder, Number, Token, TokenKind, TokenWriter};

use crate::binary;

// -----------------------------------------------------------------------------
// TreeWriter

enum Partial {
    Object { map: Map<String, Value>, key: Option<String> },
    Array(Vec<Value>),
}

/// A [`TokenWriter`] building a [`Value`] in memory.
///
/// Binary values become base64 strings and non-finite floats `null`.
#[derive(Default)]
pub struct TreeWriter {
    stack: Vec<Partial>,
    root: Option<Value>,
}

impl TreeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The finished tree, `Value::Null` if nothing was written.
    pub fn into_value(self) -> Value {
        self.root.unwrap_or(Value::Null)
    }

    fn put(&mut self, value: Value) -> Result<(), CodecError> {
        match self.stack.last_mut() {
            Some(Partial::Array(items)) => items.push(value),
            Some(Partial::Object { map, key }) => {
                let Some(key) = key.take() else {
                    return Err(CodecError::malformed("object member without key"));
                };
                map.insert(key, value);
            }
            None => self.root = Some(value),
        }
        Ok(())
    }
}

impl TokenWriter for TreeWriter {
    fn write(&mut self, token: Token<'_>) -> Result<(), CodecError> {
        match token {
            Token::BeginObject => {
                self.stack.push(Partial::Object {
                    map: Map::new(),
                    key: None,
                });
                Ok(())
            }
            Token::BeginArray => {
                self.stack.push(Partial::Array(Vec::new()));
                Ok(())
            }
            Token::EndObject | Token::EndArray => {
                let value = match self.stack.pop() {
                    Some(Partial::Object { map, .. }) => Value::Object(map),
                    Some(Partial::Array(items)) => Value::Array(items),
                    None => return Err(CodecError::malformed("unbalanced end token")),
                };
                self.put(value)
            }
            Token::Key(name) => match self.stack.last_mut() {
                Some(Partial::Object { key, .. }) => {
                    *key = Some(name.to_owned());
                    Ok(())
                }
                _ => Err(CodecError::malformed("key outside of an object")),
            },
            Token::Null => self.put(Value::Null),
            Token::Bool(v) => self.put(Value::Bool(v)),
            Token::Int(v) => self.put(Value::from(v)),
            Token::UInt(v) => self.put(Value::from(v)),
            // `Value::from` maps non-finite floats to null.
            Token::Float(v) => self.put(Value::from(v)),
            Token::Str(v) => self.put(Value::String(v.to_owned())),
            Token::Binary(v) => self.put(Value::String(binary::encode(v))),
        }
    }
}

// -----------------------------------------------------------------------------
// TreeReader

enum Cursor<'a> {
    Object(serde_json::map::Iter<'a>),
    Array(std::slice::Iter<'a, Value>),
}

/// A [`Decoder`] walking a borrowed [`Value`].
pub struct TreeReader<'a> {
    next: Option<&'a Value>,
    stack: Vec<Cursor<'a>>,
}

impl<'a> TreeReader<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            next: Some(root),
            stack: Vec::new(),
        }
    }

    fn current(&self) -> Result<&'a Value, CodecError> {
        self.next
            .ok_or_else(|| CodecError::syntax("no value at this position"))
    }

    fn take<T>(
        &mut self,
        expected: &'static str,
        f: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, CodecError> {
        let value = self.current()?;
        match f(value) {
            Some(out) => {
                self.next = None;
                Ok(out)
            }
            None => Err(CodecError::unexpected_token(expected, kind_of(value))),
        }
    }
}

fn kind_of(value: &Value) -> TokenKind {
    match value {
        Value::Null => TokenKind::Null,
        Value::Bool(_) => TokenKind::Boolean,
        Value::Number(_) => TokenKind::Number,
        Value::String(_) => TokenKind::String,
        Value::Array(_) => TokenKind::Array,
        Value::Object(_) => TokenKind::Object,
    }
}

impl Decoder for TreeReader<'_> {
    fn peek(&mut self) -> Result<TokenKind, CodecError> {
        self.current().map(kind_of)
    }

    fn decode_null(&mut self) -> Result<(), CodecError> {
        self.take("null", |v| v.is_null().then_some(()))
    }

    fn decode_bool(&mut self) -> Result<bool, CodecError> {
        self.take("boolean", Value::as_bool)
    }

    fn decode_number(&mut self) -> Result<Number, CodecError> {
        self.take("number", |v| {
            let Value::Number(n) = v else {
                return None;
            };
            n.as_u64()
                .map(Number::UInt)
                .or_else(|| n.as_i64().map(Number::Int))
                .or_else(|| n.as_f64().map(Number::Float))
        })
    }

    fn decode_string(&mut self) -> Result<String, CodecError> {
        self.take("string", |v| v.as_str().map(str::to_owned))
    }

    fn decode_binary(&mut self) -> Result<Vec<u8>, CodecError> {
        let text = self.take("base64 string", Value::as_str)?;
        binary::decode(text)
    }

    fn begin_object(&mut self) -> Result<(), CodecError> {
        let map = self.take("object", Value::as_object)?;
        self.stack.push(Cursor::Object(map.iter()));
        Ok(())
    }

    fn next_key(&mut self) -> Result<Option<String>, CodecError> {
        let Some(Cursor::Object(iter)) = self.stack.last_mut() else {
            return Err(CodecError::syntax("not inside an object"));
        };
        match iter.next() {
            Some((key, value)) => {
                self.next = Some(value);
                Ok(Some(key.clone()))
            }
            None => {
                self.stack.pop();
                Ok(None)
            }
        }
    }

    fn begin_array(&mut self) -> Result<(), CodecError> {
        let items = self.take("array", Value::as_array)?;
        self.stack.push(Cursor::Array(items.iter()));
        Ok(())
    }

    fn has_next_element(&mut self) -> Result<bool, CodecError> {
        let Some(Cursor::Array(iter)) = self.stack.last_mut() else {
            return Err(CodecError::syntax("not inside an array"));
        };
        match iter.next() {
            Some(value) => {
                self.next = Some(value);
                Ok(true)
            }
            None => {
                self.stack.pop();
                Ok(false)
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use serde_json::json;
    use weft_codec::stream::{Decoder, Encoder, StreamEncoder, TokenBuffer};

    use super::{TreeReader, TreeWriter};

    #[test]
    fn writer_builds_values() {
        let mut encoder = StreamEncoder::new(TreeWriter::new());
        encoder.begin_object().unwrap();
        encoder.encode_key("a").unwrap();
        encoder.begin_array().unwrap();
        encoder.encode_u64(1).unwrap();
        encoder.encode_binary(b"hi!").unwrap();
        encoder.encode_f64(f64::INFINITY).unwrap();
        encoder.end_array().unwrap();
        encoder.encode_key("b").unwrap();
        encoder.encode_str("x").unwrap();
        encoder.end_object().unwrap();
        encoder.finish().unwrap();
        assert_eq!(
            encoder.into_inner().into_value(),
            json!({"a": [1, "aGkh", null], "b": "x"})
        );
    }

    #[test]
    fn reader_replays_values() {
        let value = json!({"a": [1, -2, 0.5], "b": {"c": null}, "d": "s"});
        let buffer = TokenBuffer::capture(&mut TreeReader::new(&value)).unwrap();
        assert_eq!(buffer.to_string(), r#"{"a":[1,-2,0.5],"b":{"c":null},"d":"s"}"#);
    }

    #[test]
    fn reader_rejects_wrong_kind() {
        let value = json!([1]);
        let mut reader = TreeReader::new(&value);
        assert!(reader.begin_object().is_err());
        reader.begin_array().unwrap();
        assert!(reader.has_next_element().unwrap());
        assert!(reader.decode_string().is_err());
        assert_eq!(reader.decode_i64().unwrap(), 1);
        assert!(!reader.has_next_element().unwrap());
    }
}
