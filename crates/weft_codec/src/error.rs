use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

use crate::info::TypeRef;
use crate::stream::TokenKind;

// -----------------------------------------------------------------------------
// ErrorKind

/// What went wrong during registry build, encode or decode.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The registry has no serializer or deserializer for a type.
    #[error("no codec available")]
    NoCodecAvailable,
    /// A codec emitted tokens outside of the encoder grammar.
    #[error("malformed output: {0}")]
    MalformedOutput(Cow<'static, str>),
    /// A discriminator value or runtime type is missing from a subtype mapping.
    #[error("unknown subtype `{0}`")]
    UnknownSubtype(String),
    /// A property without default was absent after decode.
    #[error("missing required property `{0}`")]
    MissingRequiredProperty(String),
    /// The wire token (or runtime value) does not fit the expected type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: Cow<'static, str>,
        found: Cow<'static, str>,
    },
    /// A back reference was used without its managed counterpart.
    #[error("structural reference error: {0}")]
    StructuralReference(Cow<'static, str>),
    /// An unknown key while `fail_on_unknown_properties` is enabled.
    #[error("unknown property `{0}`")]
    UnknownProperty(String),
    /// The registry or a descriptor is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(Cow<'static, str>),
    /// An optional adapter capability is not provided.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    /// The wire input is not well formed.
    #[error("syntax error: {0}")]
    Syntax(Cow<'static, str>),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Message(String),
}

// -----------------------------------------------------------------------------
// PathSegment

/// One step of the property path carried by a [`CodecError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Property(String),
    Index(usize),
}

/// Renders the path segments outermost first, e.g. `$.owner.pets[2]`.
struct PropertyPath<'a>(&'a [PathSegment]);

impl fmt::Display for PropertyPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        // segments are pushed while unwinding, innermost first.
        for segment in self.0.iter().rev() {
            match segment {
                PathSegment::Property(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// CodecError

/// The error of every fallible operation in this crate.
///
/// Carries the [`ErrorKind`], the path of the innermost type involved
/// and the property path from the top-level value to the failure.
#[derive(Debug)]
pub struct CodecError {
    kind: ErrorKind,
    type_path: Option<String>,
    path: Vec<PathSegment>,
}

impl CodecError {
    #[inline]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            type_path: None,
            path: Vec::new(),
        }
    }

    pub fn no_codec(ty: &TypeRef) -> Self {
        Self::new(ErrorKind::NoCodecAvailable).in_type(ty)
    }

    pub fn malformed(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::MalformedOutput(msg.into()))
    }

    pub fn unknown_subtype(value: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownSubtype(value.into()))
    }

    pub fn missing_property(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingRequiredProperty(name.into()))
    }

    pub fn type_mismatch(
        expected: impl Into<Cow<'static, str>>,
        found: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(ErrorKind::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        })
    }

    /// A token of kind `found` where `expected` was required.
    pub fn unexpected_token(expected: &'static str, found: TokenKind) -> Self {
        Self::type_mismatch(expected, found.name())
    }

    pub fn structural(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::StructuralReference(msg.into()))
    }

    pub fn config(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidConfiguration(msg.into()))
    }

    pub fn syntax(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Syntax(msg.into()))
    }

    /// Records the offending type, keeping the innermost one.
    pub fn in_type(mut self, ty: &TypeRef) -> Self {
        if self.type_path.is_none() {
            self.type_path = Some(ty.to_string());
        }
        self
    }

    /// Prepends a property name to the path.
    pub fn at_property(mut self, name: impl Into<String>) -> Self {
        self.path.push(PathSegment::Property(name.into()));
        self
    }

    /// Prepends a sequence index to the path.
    pub fn at_index(mut self, index: usize) -> Self {
        self.path.push(PathSegment::Index(index));
        self
    }

    #[inline]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    #[inline]
    pub fn type_path(&self) -> Option<&str> {
        self.type_path.as_deref()
    }

    /// The property path, outermost segment first.
    pub fn path(&self) -> impl Iterator<Item = &PathSegment> {
        self.path.iter().rev()
    }

    /// The property path rendered like `$.owner.pets[2]`.
    pub fn path_string(&self) -> String {
        PropertyPath(&self.path).to_string()
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ty) = &self.type_path {
            write!(f, " (type `{ty}`")?;
            if !self.path.is_empty() {
                write!(f, ", at `{}`", PropertyPath(&self.path))?;
            }
            f.write_str(")")
        } else if !self.path.is_empty() {
            write!(f, " (at `{}`)", PropertyPath(&self.path))
        } else {
            Ok(())
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ErrorKind> for CodecError {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<std::io::Error> for CodecError {
    #[inline]
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io(err))
    }
}

impl serde_core::ser::Error for CodecError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::new(ErrorKind::Message(msg.to_string()))
    }
}

impl serde_core::de::Error for CodecError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::new(ErrorKind::Message(msg.to_string()))
    }
}

// -----------------------------------------------------------------------------
// Tests
