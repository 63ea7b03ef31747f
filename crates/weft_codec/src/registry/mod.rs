//! Codec lookup by type.
//!
//! ## Menu
//!
//! - [`Serializer`], [`Deserializer`]: codecs of one type.
//! - [`SerializerFactory`], [`DeserializerFactory`]: codecs of every
//!   parameterization of a raw type, like `Vec<T>`.
//! - [`RegistryBuilder`]: collects descriptors and codecs, validates them.
//! - [`CodecRegistry`]: the immutable, thread safe result.
//! - [`EncodeContext`], [`DecodeContext`]: per-call state.
//!
//! ## auto_register
//!
//! See [`RegistryBuilder::auto_register`].
//!
//! We use the [`inventory`] crate for link-time registration. Not every
//! platform supports it; there the call returns `false` and registers
//! nothing.
//!
//! [`inventory`]: https://docs.rs/inventory

// -----------------------------------------------------------------------------
// Modules

mod auto;
mod builder;
mod codec;
mod codec_registry;

// -----------------------------------------------------------------------------
// Exports

pub use auto::AutoRegistration;
pub use builder::RegistryBuilder;
pub use codec::{DecodeContext, EncodeContext};
pub use codec::{deserializer_as, deserializer_fn, serializer_as, serializer_fn};
pub use codec::{Deserializer, DeserializerFactory, Serializer, SerializerFactory};
pub use codec_registry::CodecRegistry;
