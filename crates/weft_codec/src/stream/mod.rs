//! The streaming token protocol between codecs and wire formats.
//!
//! Serializers write through [`Encoder`], deserializers read through
//! [`Decoder`]. A wire format plugs in as a [`TokenWriter`] (wrapped in a
//! validating [`StreamEncoder`]) and a `Decoder` implementation.

// -----------------------------------------------------------------------------
// Modules

mod buffer;
mod decoder;
mod encoder;
mod token;

// -----------------------------------------------------------------------------
// Exports

pub use buffer::{BufferDecoder, TokenBuffer};
pub use decoder::Decoder;
pub use encoder::{Encoder, StreamEncoder, TokenWriter};
pub use token::{Number, Token, TokenKind};
