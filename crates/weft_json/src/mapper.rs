use std::io;
use std::sync::Arc;

use serde_json::Value;
use weft_codec::info::Typed;
use weft_codec::registry::CodecRegistry;
use weft_codec::{CodecError, Mapper, MapperConfig};

use crate::reader::JsonReader;
use crate::tree::{TreeReader, TreeWriter};
use crate::writer::JsonWriter;

/// Reads and writes JSON through a shared [`CodecRegistry`].
///
/// Cheap to clone, and safe to use from many threads at once.
///
/// # Example
///
/// ```
/// use weft_codec::info::{GetDescriptor, ObjectDescriptor, PropertyDescriptor, TypeDescriptor};
/// use weft_codec::registry::RegistryBuilder;
/// use weft_json::JsonMapper;
///
/// #[derive(Debug, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// weft_codec::impl_typed!(Point);
///
/// impl GetDescriptor for Point {
///     fn get_descriptor() -> TypeDescriptor {
///         ObjectDescriptor::new(|v| Ok(Point { x: v.take("x")?, y: v.take("y")? }))
///             .property(PropertyDescriptor::field("x", |p: &Point| &p.x))
///             .property(PropertyDescriptor::field("y", |p: &Point| &p.y))
///             .into()
///     }
/// }
///
/// let mut builder = RegistryBuilder::new();
/// builder.register::<Point>();
/// let json = JsonMapper::new(builder.build().unwrap());
///
/// let text = json.write_to_string(&Point { x: 1, y: 2 }).unwrap();
/// assert_eq!(text, r#"{"x":1,"y":2}"#);
/// assert_eq!(json.read_str::<Point>(&text).unwrap(), Point { x: 1, y: 2 });
/// ```
#[derive(Clone)]
pub struct JsonMapper {
    mapper: Mapper,
    pretty: bool,
}

impl JsonMapper {
    pub fn new(registry: impl Into<Arc<CodecRegistry>>) -> Self {
        Self::from_mapper(Mapper::new(registry))
    }

    pub fn from_mapper(mapper: Mapper) -> Self {
        Self { mapper, pretty: false }
    }

    /// Replaces the per-call configuration.
    pub fn with_config(mut self, config: MapperConfig) -> Self {
        self.mapper = self.mapper.with_config(config);
        self
    }

    /// Indents the written text.
    pub fn pretty(mut self, enabled: bool) -> Self {
        self.pretty = enabled;
        self
    }

    #[inline]
    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Writes `value` to `writer` and returns the writer.
    ///
    /// The writer is flushed on success and on failure.
    pub fn write<T: Typed, W: io::Write>(&self, writer: W, value: &T) -> Result<W, CodecError> {
        if self.pretty {
            let writer = self.mapper.encode(JsonWriter::pretty(writer), value)?;
            Ok(writer.into_inner())
        } else {
            let writer = self.mapper.encode(JsonWriter::new(writer), value)?;
            Ok(writer.into_inner())
        }
    }

    pub fn write_to_vec<T: Typed>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        self.write(Vec::with_capacity(128), value)
    }

    pub fn write_to_string<T: Typed>(&self, value: &T) -> Result<String, CodecError> {
        let bytes = self.write_to_vec(value)?;
        String::from_utf8(bytes)
            .map_err(|err| CodecError::malformed(format!("non UTF-8 output: {err}")))
    }

    /// Reads one value from `reader`, which is read to its end.
    pub fn read<T: Typed, R: io::Read>(&self, mut reader: R) -> Result<T, CodecError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.read_slice(&bytes)
    }

    pub fn read_slice<T: Typed>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        self.mapper.decode(JsonReader::new(bytes))
    }

    pub fn read_str<T: Typed>(&self, text: &str) -> Result<T, CodecError> {
        self.read_slice(text.as_bytes())
    }

    /// Encodes `value` into a [`Value`] tree.
    pub fn write_to_tree<T: Typed>(&self, value: &T) -> Result<Value, CodecError> {
        self.mapper
            .encode(TreeWriter::new(), value)
            .map(TreeWriter::into_value)
    }

    /// Decodes a value from a [`Value`] tree.
    pub fn read_from_tree<T: Typed>(&self, tree: &Value) -> Result<T, CodecError> {
        self.mapper.decode(TreeReader::new(tree))
    }
}

impl std::fmt::Debug for JsonMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonMapper")
            .field("config", self.mapper.config())
            .field("pretty", &self.pretty)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests
