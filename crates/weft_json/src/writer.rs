use std::io;

use serde_json::ser::{CharEscape, CompactFormatter, Formatter, PrettyFormatter};
use weft_codec::CodecError;
use weft_codec::stream::{Token, TokenWriter};

use crate::binary;

#[derive(Debug, Clone, Copy)]
enum Frame {
    Object { first: bool },
    Array { first: bool },
}

/// A [`TokenWriter`] producing JSON text.
///
/// Layout is delegated to a `serde_json` [`Formatter`]: compact by default,
/// indented with [`JsonWriter::pretty`]. Binary values are written as base64
/// strings and non-finite floats as `null`.
///
/// The writer trusts the token order; wrap it in a
/// [`StreamEncoder`](weft_codec::stream::StreamEncoder) to validate it.
pub struct JsonWriter<W, F = CompactFormatter> {
    writer: W,
    formatter: F,
    stack: Vec<Frame>,
}

impl<W: io::Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_formatter(writer, CompactFormatter)
    }
}

impl<'a, W: io::Write> JsonWriter<W, PrettyFormatter<'a>> {
    /// A writer indenting nested values by two spaces.
    pub fn pretty(writer: W) -> Self {
        Self::with_formatter(writer, PrettyFormatter::new())
    }
}

impl<W: io::Write, F: Formatter> JsonWriter<W, F> {
    pub fn with_formatter(writer: W, formatter: F) -> Self {
        Self {
            writer,
            formatter,
            stack: Vec::new(),
        }
    }

    #[inline]
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    #[inline]
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Opens an array element if the current container is an array.
    fn begin_value(&mut self) -> io::Result<()> {
        if let Some(Frame::Array { first }) = self.stack.last_mut() {
            let was_first = *first;
            *first = false;
            self.formatter.begin_array_value(&mut self.writer, was_first)?;
        }
        Ok(())
    }

    /// Closes the element or member that just got its complete value.
    fn end_value(&mut self) -> io::Result<()> {
        match self.stack.last() {
            Some(Frame::Array { .. }) => self.formatter.end_array_value(&mut self.writer),
            Some(Frame::Object { .. }) => self.formatter.end_object_value(&mut self.writer),
            None => Ok(()),
        }
    }

    fn write_key(&mut self, key: &str) -> io::Result<()> {
        let first = match self.stack.last_mut() {
            Some(Frame::Object { first }) => std::mem::replace(first, false),
            _ => false,
        };
        self.formatter.begin_object_key(&mut self.writer, first)?;
        write_escaped(&mut self.writer, &mut self.formatter, key)?;
        self.formatter.end_object_key(&mut self.writer)?;
        self.formatter.begin_object_value(&mut self.writer)
    }

    fn write_scalar(
        &mut self,
        write: impl FnOnce(&mut W, &mut F) -> io::Result<()>,
    ) -> io::Result<()> {
        self.begin_value()?;
        write(&mut self.writer, &mut self.formatter)?;
        self.end_value()
    }

    fn write_token(&mut self, token: Token<'_>) -> io::Result<()> {
        match token {
            Token::BeginObject => {
                self.begin_value()?;
                self.formatter.begin_object(&mut self.writer)?;
                self.stack.push(Frame::Object { first: true });
                Ok(())
            }
            Token::BeginArray => {
                self.begin_value()?;
                self.formatter.begin_array(&mut self.writer)?;
                self.stack.push(Frame::Array { first: true });
                Ok(())
            }
            Token::EndObject => {
                self.stack.pop();
                self.formatter.end_object(&mut self.writer)?;
                self.end_value()
            }
            Token::EndArray => {
                self.stack.pop();
                self.formatter.end_array(&mut self.writer)?;
                self.end_value()
            }
            Token::Key(key) => self.write_key(key),
            Token::Null => self.write_scalar(|w, f| f.write_null(w)),
            Token::Bool(v) => self.write_scalar(|w, f| f.write_bool(w, v)),
            Token::Int(v) => self.write_scalar(|w, f| f.write_i64(w, v)),
            Token::UInt(v) => self.write_scalar(|w, f| f.write_u64(w, v)),
            Token::Float(v) if v.is_finite() => self.write_scalar(|w, f| f.write_f64(w, v)),
            Token::Float(_) => self.write_scalar(|w, f| f.write_null(w)),
            Token::Str(v) => self.write_scalar(|w, f| write_escaped(w, f, v)),
            Token::Binary(v) => {
                let text = binary::encode(v);
                self.write_scalar(|w, f| write_escaped(w, f, &text))
            }
        }
    }
}

impl<W: io::Write, F: Formatter> TokenWriter for JsonWriter<W, F> {
    fn write(&mut self, token: Token<'_>) -> Result<(), CodecError> {
        self.write_token(token).map_err(CodecError::from)
    }

    fn flush(&mut self) -> Result<(), CodecError> {
        self.writer.flush().map_err(CodecError::from)
    }
}

/// Writes `value` as a quoted JSON string.
fn write_escaped<W, F>(writer: &mut W, formatter: &mut F, value: &str) -> io::Result<()>
where
    W: ?Sized + io::Write,
    F: ?Sized + Formatter,
{
    formatter.begin_string(writer)?;
    let bytes = value.as_bytes();
    let mut start = 0;
    for (index, &byte) in bytes.iter().enumerate() {
        let escape = match byte {
            b'"' => CharEscape::Quote,
            b'\\' => CharEscape::ReverseSolidus,
            b'\n' => CharEscape::LineFeed,
            b'\r' => CharEscape::CarriageReturn,
            b'\t' => CharEscape::Tab,
            0x08 => CharEscape::Backspace,
            0x0c => CharEscape::FormFeed,
            0x00..=0x1f => CharEscape::AsciiControl(byte),
            _ => continue,
        };
        // escaped bytes are ASCII, so `index` is a char boundary.
        if start < index {
            formatter.write_string_fragment(writer, &value[start..index])?;
        }
        formatter.write_char_escape(writer, escape)?;
        start = index + 1;
    }
    if start < bytes.len() {
        formatter.write_string_fragment(writer, &value[start..])?;
    }
    formatter.end_string(writer)
}

// -----------------------------------------------------------------------------
// Tests
