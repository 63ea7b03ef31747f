//! Type-directed serialization engine.
//!
//! A [`CodecRegistry`](registry::CodecRegistry) maps types, generic ones
//! included, to serializers and deserializers. Those are either written by
//! hand or derived from declarative [descriptors](info), and they all target
//! the streaming [`Encoder`](stream::Encoder) and [`Decoder`](stream::Decoder)
//! token API. The [`Mapper`] drives one encode or decode call.
//!
//! Wire formats live in adapter crates that implement
//! [`TokenWriter`](stream::TokenWriter) and [`Decoder`](stream::Decoder).
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Modules

mod error;
mod mapper;

pub mod codecs;
pub mod info;
pub mod naming;
pub mod reference;
pub mod registry;
pub mod stream;

#[cfg(test)]
mod testing;

// -----------------------------------------------------------------------------
// Top-Level exports

#[doc(hidden)]
pub mod __macro_exports {
    #[cfg(feature = "auto_register")]
    pub use inventory;
}

pub use codecs::Bytes;
pub use error::{CodecError, ErrorKind, PathSegment};
pub use mapper::{Mapper, MapperConfig};
pub use reference::BackRef;
