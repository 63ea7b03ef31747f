//! JSON wire format for `weft_codec`.
//!
//! - [`JsonWriter`]: a [`TokenWriter`](weft_codec::stream::TokenWriter)
//!   producing compact or indented text.
//! - [`JsonReader`]: a pull [`Decoder`](weft_codec::stream::Decoder) over
//!   JSON text.
//! - [`TreeWriter`] and [`TreeReader`]: the same over [`serde_json::Value`].
//! - [`JsonMapper`]: the convenience entry points over all of the above.
//!
//! Binary values travel as base64 strings.

// -----------------------------------------------------------------------------
// Modules

mod binary;
mod mapper;
mod reader;
mod tree;
mod writer;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use mapper::JsonMapper;
pub use reader::JsonReader;
pub use tree::{TreeReader, TreeWriter};
pub use writer::JsonWriter;
