use weft_codec::CodecError;
use weft_codec::stream::{Decoder, Number, TokenKind};

use crate::binary;

/// Nesting limit, deeper input fails instead of growing the stack without bound.
const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object { first: bool },
    Array { first: bool },
}

/// A pull [`Decoder`] over JSON text.
///
/// Base64 strings are accepted where a binary value is expected.
/// Syntax errors report the line and column of the offending byte.
pub struct JsonReader<'a> {
    input: &'a [u8],
    pos: usize,
    stack: Vec<Frame>,
}

impl<'a> JsonReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
        }
    }

    /// Byte offset of the next unread byte.
    #[inline]
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn error(&self, msg: &str) -> CodecError {
        let consumed = &self.input[..self.pos.min(self.input.len())];
        let line = consumed.iter().filter(|&&b| b == b'\n').count() + 1;
        let column = consumed.iter().rev().take_while(|&&b| b != b'\n').count() + 1;
        CodecError::syntax(format!("{msg} at line {line} column {column}"))
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.input.get(self.pos) {
            self.pos += 1;
        }
    }

    fn peek_byte(&mut self) -> Result<u8, CodecError> {
        self.skip_whitespace();
        self.input
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.error("unexpected end of input"))
    }

    fn expect(&mut self, byte: u8, what: &str) -> Result<(), CodecError> {
        if self.peek_byte()? != byte {
            return Err(self.error(&format!("expected {what}")));
        }
        self.pos += 1;
        Ok(())
    }

    fn expect_literal(&mut self, literal: &[u8]) -> Result<(), CodecError> {
        self.skip_whitespace();
        if !self.input[self.pos..].starts_with(literal) {
            return Err(self.error("invalid literal"));
        }
        self.pos += literal.len();
        Ok(())
    }

    fn mismatch(&mut self, expected: &'static str) -> CodecError {
        match self.peek() {
            Ok(found) => CodecError::unexpected_token(expected, found),
            Err(err) => err,
        }
    }

    fn push(&mut self, frame: Frame) -> Result<(), CodecError> {
        if self.stack.len() >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.stack.push(frame);
        Ok(())
    }

    /// Consumes the separator before the next member or element.
    ///
    /// Returns `false` (consuming `close`) at the end of the container.
    fn next_entry(&mut self, close: u8) -> Result<bool, CodecError> {
        let first = match self.stack.last_mut() {
            Some(Frame::Object { first } | Frame::Array { first }) => {
                std::mem::replace(first, false)
            }
            None => return Err(self.error("not inside a container")),
        };
        let byte = self.peek_byte()?;
        if byte == close {
            self.pos += 1;
            self.stack.pop();
            return Ok(false);
        }
        if !first {
            if byte != b',' {
                return Err(self.error("expected `,`"));
            }
            self.pos += 1;
        }
        Ok(true)
    }

    fn parse_string(&mut self) -> Result<String, CodecError> {
        self.expect(b'"', "string")?;
        let mut out: Vec<u8> = Vec::new();
        loop {
            let start = self.pos;
            while let Some(&byte) = self.input.get(self.pos) {
                if byte == b'"' || byte == b'\\' || byte < 0x20 {
                    break;
                }
                self.pos += 1;
            }
            out.extend_from_slice(&self.input[start..self.pos]);
            match self.input.get(self.pos) {
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.parse_escape(&mut out)?;
                }
                Some(_) => return Err(self.error("control character in string")),
                None => return Err(self.error("unterminated string")),
            }
        }
        String::from_utf8(out).map_err(|_| self.error("invalid UTF-8 in string"))
    }

    fn parse_escape(&mut self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let Some(&byte) = self.input.get(self.pos) else {
            return Err(self.error("unterminated escape"));
        };
        self.pos += 1;
        let ch = match byte {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => self.parse_unicode()?,
            _ => return Err(self.error("invalid escape")),
        };
        let mut buf = [0u8; 4];
        out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        Ok(())
    }

    fn parse_hex4(&mut self) -> Result<u16, CodecError> {
        let digits = self
            .input
            .get(self.pos..self.pos + 4)
            .and_then(|digits| std::str::from_utf8(digits).ok())
            .and_then(|digits| u16::from_str_radix(digits, 16).ok())
            .ok_or_else(|| self.error("invalid unicode escape"))?;
        self.pos += 4;
        Ok(digits)
    }

    fn parse_unicode(&mut self) -> Result<char, CodecError> {
        let high = self.parse_hex4()?;
        let code = if (0xD800..0xDC00).contains(&high) {
            if !self.input[self.pos..].starts_with(b"\\u") {
                return Err(self.error("unpaired surrogate"));
            }
            self.pos += 2;
            let low = self.parse_hex4()?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(self.error("unpaired surrogate"));
            }
            0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00)
        } else {
            u32::from(high)
        };
        char::from_u32(code).ok_or_else(|| self.error("unpaired surrogate"))
    }

    fn parse_number(&mut self) -> Result<Number, CodecError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut float = false;
        if self.input.get(self.pos) == Some(&b'-') {
            self.pos += 1;
        }
        let int_start = self.pos;
        let digits = self.skip_digits();
        if digits == 0 {
            return Err(self.error("invalid number"));
        }
        if digits > 1 && self.input[int_start] == b'0' {
            self.pos = int_start;
            return Err(self.error("leading zero in number"));
        }
        if self.input.get(self.pos) == Some(&b'.') {
            float = true;
            self.pos += 1;
            if self.skip_digits() == 0 {
                return Err(self.error("invalid number"));
            }
        }
        if let Some(b'e' | b'E') = self.input.get(self.pos) {
            float = true;
            self.pos += 1;
            if let Some(b'+' | b'-') = self.input.get(self.pos) {
                self.pos += 1;
            }
            if self.skip_digits() == 0 {
                return Err(self.error("invalid number"));
            }
        }

        // only ASCII digits, signs and dots were consumed.
        let text = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("invalid number"))?;
        let parsed = if float {
            text.parse().ok().map(Number::Float)
        } else if text.starts_with('-') {
            text.parse().ok().map(Number::Int)
        } else {
            text.parse().ok().map(Number::UInt)
        };
        // out of range integers degrade to floats.
        match parsed {
            Some(number) => Ok(number),
            None => text
                .parse()
                .map(Number::Float)
                .map_err(|_| self.error("invalid number")),
        }
    }

    fn skip_digits(&mut self) -> usize {
        let start = self.pos;
        while let Some(b'0'..=b'9') = self.input.get(self.pos) {
            self.pos += 1;
        }
        self.pos - start
    }
}

impl Decoder for JsonReader<'_> {
    fn peek(&mut self) -> Result<TokenKind, CodecError> {
        Ok(match self.peek_byte()? {
            b'n' => TokenKind::Null,
            b't' | b'f' => TokenKind::Boolean,
            b'"' => TokenKind::String,
            b'-' | b'0'..=b'9' => TokenKind::Number,
            b'{' => TokenKind::Object,
            b'[' => TokenKind::Array,
            _ => return Err(self.error("expected a value")),
        })
    }

    fn decode_null(&mut self) -> Result<(), CodecError> {
        if self.peek()? != TokenKind::Null {
            return Err(self.mismatch("null"));
        }
        self.expect_literal(b"null")
    }

    fn decode_bool(&mut self) -> Result<bool, CodecError> {
        match self.peek_byte()? {
            b't' => self.expect_literal(b"true").map(|()| true),
            b'f' => self.expect_literal(b"false").map(|()| false),
            _ => Err(self.mismatch("boolean")),
        }
    }

    fn decode_number(&mut self) -> Result<Number, CodecError> {
        if self.peek()? != TokenKind::Number {
            return Err(self.mismatch("number"));
        }
        self.parse_number()
    }

    fn decode_string(&mut self) -> Result<String, CodecError> {
        if self.peek()? != TokenKind::String {
            return Err(self.mismatch("string"));
        }
        self.parse_string()
    }

    fn decode_binary(&mut self) -> Result<Vec<u8>, CodecError> {
        if self.peek()? != TokenKind::String {
            return Err(self.mismatch("base64 string"));
        }
        binary::decode(&self.parse_string()?)
    }

    fn begin_object(&mut self) -> Result<(), CodecError> {
        if self.peek()? != TokenKind::Object {
            return Err(self.mismatch("object"));
        }
        self.pos += 1;
        self.push(Frame::Object { first: true })
    }

    fn next_key(&mut self) -> Result<Option<String>, CodecError> {
        if !matches!(self.stack.last(), Some(Frame::Object { .. })) {
            return Err(self.error("not inside an object"));
        }
        if !self.next_entry(b'}')? {
            return Ok(None);
        }
        if self.peek_byte()? != b'"' {
            return Err(self.error("expected a string key"));
        }
        let key = self.parse_string()?;
        self.expect(b':', "`:`")?;
        Ok(Some(key))
    }

    fn begin_array(&mut self) -> Result<(), CodecError> {
        if self.peek()? != TokenKind::Array {
            return Err(self.mismatch("array"));
        }
        self.pos += 1;
        self.push(Frame::Array { first: true })
    }

    fn has_next_element(&mut self) -> Result<bool, CodecError> {
        if !matches!(self.stack.last(), Some(Frame::Array { .. })) {
            return Err(self.error("not inside an array"));
        }
        self.next_entry(b']')
    }

    fn finish(&mut self) -> Result<(), CodecError> {
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error("trailing characters"));
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests
