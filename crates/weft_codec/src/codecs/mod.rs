//! Builtin codecs.
//!
//! - scalars: primitives, `String`, [`Bytes`]
//! - containers: sequences, string keyed maps, `Option`, `Box`, `Arc`
//! - objects and polymorphic types, derived from descriptors
//! - types with `serde` implementations

// -----------------------------------------------------------------------------
// Modules

mod container;
mod object;
mod scalar;
mod serde_bridge;
mod subtype;

// -----------------------------------------------------------------------------
// Exports

pub use container::{MapFactory, OptionFactory, PointerFactory, SequenceFactory};
pub use object::{ObjectDeserializer, ObjectSerializer};
pub use scalar::Bytes;
pub use serde_bridge::SerdeCodec;
pub use subtype::{SubtypeDeserializer, SubtypeSerializer};

pub(crate) use scalar::{ScalarTable, builtin_scalars};
