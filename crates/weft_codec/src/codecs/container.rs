//! Codecs for sequences, string keyed maps, options and pointers.
//!
//! Each is registered as a factory on the raw type path and receives the
//! codec of its type arguments from the registry.

use std::any::Any;
use std::sync::Arc;

use crate::error::CodecError;
use crate::info::{MapOps, OptionOps, PointerOps, SeqOps, Shape, TypeRef};
use crate::registry::{CodecRegistry, DecodeContext, Deserializer, DeserializerFactory};
use crate::registry::{EncodeContext, Serializer, SerializerFactory};
use crate::stream::{Decoder, Encoder, TokenBuffer, TokenKind};

fn argument(ty: &TypeRef, index: usize) -> Result<&TypeRef, CodecError> {
    ty.arg(index)
        .ok_or_else(|| CodecError::config("missing type argument").in_type(ty))
}

fn wrong_shape(ty: &TypeRef, expected: &'static str) -> CodecError {
    CodecError::config(format!("expected a {expected} type, found a {} type", ty.shape().name()))
        .in_type(ty)
}

fn mismatch(ty: &TypeRef) -> CodecError {
    CodecError::type_mismatch(ty.path(), "another type").in_type(ty)
}

// -----------------------------------------------------------------------------
// Sequence

/// Factory of sequence codecs, e.g. for `Vec<T>`.
pub struct SequenceFactory;

struct SequenceSerializer {
    ops: SeqOps,
    element_ty: TypeRef,
    element: Arc<dyn Serializer>,
}

struct SequenceDeserializer {
    ops: SeqOps,
    element_ty: TypeRef,
    element: Arc<dyn Deserializer>,
}

impl SerializerFactory for SequenceFactory {
    fn create(
        &self,
        ty: &TypeRef,
        registry: &CodecRegistry,
    ) -> Result<Arc<dyn Serializer>, CodecError> {
        let Shape::Sequence(ops) = ty.shape() else {
            return Err(wrong_shape(ty, "sequence"));
        };
        let element_ty = argument(ty, 0)?.clone();
        Ok(Arc::new(SequenceSerializer {
            ops: *ops,
            element: registry.find_serializer(&element_ty)?,
            element_ty,
        }))
    }
}

impl DeserializerFactory for SequenceFactory {
    fn create(
        &self,
        ty: &TypeRef,
        registry: &CodecRegistry,
    ) -> Result<Arc<dyn Deserializer>, CodecError> {
        let Shape::Sequence(ops) = ty.shape() else {
            return Err(wrong_shape(ty, "sequence"));
        };
        let element_ty = argument(ty, 0)?.clone();
        Ok(Arc::new(SequenceDeserializer {
            ops: *ops,
            element: registry.find_deserializer(&element_ty)?,
            element_ty,
        }))
    }
}

impl Serializer for SequenceSerializer {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        let items = (self.ops.iter)(value).ok_or_else(|| mismatch(ty))?;
        encoder.begin_array()?;
        for (index, item) in items.enumerate() {
            self.element
                .serialize(encoder, ctx, item, &self.element_ty)
                .map_err(|err| err.at_index(index))?;
        }
        encoder.end_array()
    }

    fn is_empty(&self, value: &dyn Any) -> bool {
        (self.ops.len)(value) == Some(0)
    }
}

impl Deserializer for SequenceDeserializer {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError> {
        decoder.begin_array().map_err(|err| err.in_type(ty))?;
        let mut items = Vec::new();
        while decoder.has_next_element()? {
            let item = self
                .element
                .deserialize(decoder, ctx, &self.element_ty)
                .map_err(|err| err.at_index(items.len()))?;
            items.push(item);
        }
        (self.ops.collect)(items).ok_or_else(|| mismatch(ty))
    }
}

// -----------------------------------------------------------------------------
// Map

/// Factory of codecs for maps with string keys.
pub struct MapFactory;

struct MapSerializer {
    ops: MapOps,
    value_ty: TypeRef,
    value: Arc<dyn Serializer>,
}

struct MapDeserializer {
    ops: MapOps,
    value_ty: TypeRef,
    value: Arc<dyn Deserializer>,
}

impl SerializerFactory for MapFactory {
    fn create(
        &self,
        ty: &TypeRef,
        registry: &CodecRegistry,
    ) -> Result<Arc<dyn Serializer>, CodecError> {
        let Shape::Map(ops) = ty.shape() else {
            return Err(wrong_shape(ty, "map"));
        };
        let value_ty = argument(ty, 1)?.clone();
        Ok(Arc::new(MapSerializer {
            ops: *ops,
            value: registry.find_serializer(&value_ty)?,
            value_ty,
        }))
    }
}

impl DeserializerFactory for MapFactory {
    fn create(
        &self,
        ty: &TypeRef,
        registry: &CodecRegistry,
    ) -> Result<Arc<dyn Deserializer>, CodecError> {
        let Shape::Map(ops) = ty.shape() else {
            return Err(wrong_shape(ty, "map"));
        };
        let value_ty = argument(ty, 1)?.clone();
        Ok(Arc::new(MapDeserializer {
            ops: *ops,
            value: registry.find_deserializer(&value_ty)?,
            value_ty,
        }))
    }
}

impl MapSerializer {
    /// Writes the entries as members of an already opened object.
    fn write_entries(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        let entries = (self.ops.iter)(value).ok_or_else(|| mismatch(ty))?;
        for (key, item) in entries {
            encoder.encode_key(key)?;
            self.value
                .serialize(encoder, ctx, item, &self.value_ty)
                .map_err(|err| err.at_property(key))?;
        }
        Ok(())
    }
}

impl Serializer for MapSerializer {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        encoder.begin_object()?;
        self.write_entries(encoder, ctx, value, ty)?;
        encoder.end_object()
    }

    fn is_empty(&self, value: &dyn Any) -> bool {
        (self.ops.len)(value) == Some(0)
    }

    fn serialize_properties(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        self.write_entries(encoder, ctx, value, ty)
    }
}

impl MapDeserializer {
    fn read_entries(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
        buffered: Vec<(String, TokenBuffer)>,
    ) -> Result<Box<dyn Any>, CodecError> {
        let mut entries = Vec::new();
        for (key, buffer) in buffered {
            let item = self
                .value
                .deserialize(&mut buffer.decoder(), ctx, &self.value_ty)
                .map_err(|err| err.at_property(key.as_str()))?;
            entries.push((key, item));
        }
        while let Some(key) = decoder.next_key()? {
            let item = self
                .value
                .deserialize(decoder, ctx, &self.value_ty)
                .map_err(|err| err.at_property(key.as_str()))?;
            entries.push((key, item));
        }
        (self.ops.collect)(entries).ok_or_else(|| mismatch(ty))
    }
}

impl Deserializer for MapDeserializer {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError> {
        decoder.begin_object().map_err(|err| err.in_type(ty))?;
        self.read_entries(decoder, ctx, ty, Vec::new())
    }

    fn deserialize_properties(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
        buffered: Vec<(String, TokenBuffer)>,
    ) -> Result<Box<dyn Any>, CodecError> {
        self.read_entries(decoder, ctx, ty, buffered)
    }
}

// -----------------------------------------------------------------------------
// Option

/// Factory of `Option<T>` codecs. `None` is written as null.
pub struct OptionFactory;

struct OptionSerializer {
    ops: OptionOps,
    inner_ty: TypeRef,
    inner: Arc<dyn Serializer>,
}

struct OptionDeserializer {
    ops: OptionOps,
    inner_ty: TypeRef,
    inner: Arc<dyn Deserializer>,
}

impl SerializerFactory for OptionFactory {
    fn create(
        &self,
        ty: &TypeRef,
        registry: &CodecRegistry,
    ) -> Result<Arc<dyn Serializer>, CodecError> {
        let Shape::Optional(ops) = ty.shape() else {
            return Err(wrong_shape(ty, "optional"));
        };
        let inner_ty = argument(ty, 0)?.clone();
        Ok(Arc::new(OptionSerializer {
            ops: *ops,
            inner: registry.find_serializer(&inner_ty)?,
            inner_ty,
        }))
    }
}

impl DeserializerFactory for OptionFactory {
    fn create(
        &self,
        ty: &TypeRef,
        registry: &CodecRegistry,
    ) -> Result<Arc<dyn Deserializer>, CodecError> {
        let Shape::Optional(ops) = ty.shape() else {
            return Err(wrong_shape(ty, "optional"));
        };
        let inner_ty = argument(ty, 0)?.clone();
        Ok(Arc::new(OptionDeserializer {
            ops: *ops,
            inner: registry.find_deserializer(&inner_ty)?,
            inner_ty,
        }))
    }
}

impl Serializer for OptionSerializer {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        match (self.ops.get)(value) {
            Some(Some(inner)) => self.inner.serialize(encoder, ctx, inner, &self.inner_ty),
            Some(None) => encoder.encode_null(),
            None => Err(mismatch(ty)),
        }
    }

    fn is_empty(&self, value: &dyn Any) -> bool {
        match (self.ops.get)(value) {
            Some(Some(inner)) => self.inner.is_empty(inner),
            _ => true,
        }
    }
}

impl Deserializer for OptionDeserializer {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError> {
        if decoder.peek()? == TokenKind::Null {
            decoder.decode_null()?;
            return Ok((self.ops.none)());
        }
        let inner = self.inner.deserialize(decoder, ctx, &self.inner_ty)?;
        (self.ops.some)(inner).ok_or_else(|| mismatch(ty))
    }

    fn absent_value(&self, _ty: &TypeRef) -> Option<Box<dyn Any>> {
        Some((self.ops.none)())
    }
}

// -----------------------------------------------------------------------------
// Pointer

/// Factory of `Box<T>` and `Arc<T>` codecs, transparent on the wire.
///
/// Decoding into an `Arc` also links the back references waiting for
/// the pointee.
pub struct PointerFactory;

struct PointerSerializer {
    ops: PointerOps,
    inner_ty: TypeRef,
    inner: Arc<dyn Serializer>,
}

struct PointerDeserializer {
    ops: PointerOps,
    inner_ty: TypeRef,
    inner: Arc<dyn Deserializer>,
}

impl SerializerFactory for PointerFactory {
    fn create(
        &self,
        ty: &TypeRef,
        registry: &CodecRegistry,
    ) -> Result<Arc<dyn Serializer>, CodecError> {
        let Shape::Pointer(ops) = ty.shape() else {
            return Err(wrong_shape(ty, "pointer"));
        };
        let inner_ty = argument(ty, 0)?.clone();
        Ok(Arc::new(PointerSerializer {
            ops: *ops,
            inner: registry.find_serializer(&inner_ty)?,
            inner_ty,
        }))
    }
}

impl DeserializerFactory for PointerFactory {
    fn create(
        &self,
        ty: &TypeRef,
        registry: &CodecRegistry,
    ) -> Result<Arc<dyn Deserializer>, CodecError> {
        let Shape::Pointer(ops) = ty.shape() else {
            return Err(wrong_shape(ty, "pointer"));
        };
        let inner_ty = argument(ty, 0)?.clone();
        Ok(Arc::new(PointerDeserializer {
            ops: *ops,
            inner: registry.find_deserializer(&inner_ty)?,
            inner_ty,
        }))
    }
}

impl Serializer for PointerSerializer {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        let inner = (self.ops.get)(value).ok_or_else(|| mismatch(ty))?;
        self.inner.serialize(encoder, ctx, inner, &self.inner_ty)
    }

    fn is_empty(&self, value: &dyn Any) -> bool {
        (self.ops.get)(value).is_some_and(|inner| self.inner.is_empty(inner))
    }

    fn serialize_properties(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        let inner = (self.ops.get)(value).ok_or_else(|| mismatch(ty))?;
        self.inner
            .serialize_properties(encoder, ctx, inner, &self.inner_ty)
    }
}

impl PointerDeserializer {
    fn wrap(
        &self,
        ctx: &mut DecodeContext<'_>,
        depth: usize,
        inner: Box<dyn Any>,
        ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError> {
        let value = (self.ops.wrap)(inner).ok_or_else(|| mismatch(ty))?;
        if let Some(link) = self.ops.link {
            let links = ctx.references().take_pending(depth, self.inner_ty.id());
            if !links.is_empty() && !link(value.as_ref(), &links) {
                return Err(mismatch(ty));
            }
        }
        Ok(value)
    }
}

impl Deserializer for PointerDeserializer {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError> {
        let depth = ctx.references().depth();
        let inner = self.inner.deserialize(decoder, ctx, &self.inner_ty)?;
        self.wrap(ctx, depth, inner, ty)
    }

    fn absent_value(&self, _ty: &TypeRef) -> Option<Box<dyn Any>> {
        let inner = self.inner.absent_value(&self.inner_ty)?;
        (self.ops.wrap)(inner)
    }

    fn deserialize_properties(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
        buffered: Vec<(String, TokenBuffer)>,
    ) -> Result<Box<dyn Any>, CodecError> {
        let depth = ctx.references().depth();
        let inner = self
            .inner
            .deserialize_properties(decoder, ctx, &self.inner_ty, buffered)?;
        self.wrap(ctx, depth, inner, ty)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap, VecDeque};
    use std::sync::Arc;

    use crate::error::ErrorKind;
    use crate::stream::Encoder;
    use crate::testing::{encode, mapper, roundtrip, tokens};

    #[test]
    fn sequences_of_options() {
        let mapper = mapper(|_| {});
        let value = vec![Some(1), None, Some(3)];
        assert_eq!(encode(&mapper, &value).unwrap(), "[1,null,3]");
        assert_eq!(roundtrip(&mapper, &value), value);

        let deque: VecDeque<String> = VecDeque::from(["a".to_owned(), "b".to_owned()]);
        assert_eq!(encode(&mapper, &deque).unwrap(), r#"["a","b"]"#);
        assert_eq!(roundtrip(&mapper, &deque), deque);
    }

    #[test]
    fn string_keyed_maps() {
        let mapper = mapper(|_| {});
        let value = BTreeMap::from([
            ("x".to_owned(), vec![1u32, 2]),
            ("y".to_owned(), Vec::new()),
        ]);
        assert_eq!(encode(&mapper, &value).unwrap(), r#"{"x":[1,2],"y":[]}"#);
        assert_eq!(roundtrip(&mapper, &value), value);

        let hashed = HashMap::from([("only".to_owned(), true)]);
        assert_eq!(encode(&mapper, &hashed).unwrap(), r#"{"only":true}"#);
        assert_eq!(roundtrip(&mapper, &hashed), hashed);
    }

    #[test]
    fn pointers_are_transparent() {
        let mapper = mapper(|_| {});
        let boxed = Box::new(7i64);
        assert_eq!(encode(&mapper, &boxed).unwrap(), "7");
        assert_eq!(roundtrip(&mapper, &boxed), boxed);

        let shared: Arc<String> = Arc::new("s".into());
        assert_eq!(encode(&mapper, &shared).unwrap(), r#""s""#);
        assert_eq!(roundtrip(&mapper, &shared), shared);
    }

    #[test]
    fn element_errors_report_their_index() {
        let mapper = mapper(|_| {});
        let input = tokens(|e| {
            e.begin_array()?;
            e.encode_i64(1)?;
            e.encode_str("two")?;
            e.end_array()
        });
        let err = mapper.decode::<Vec<i32>, _>(input.decoder()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));
        assert_eq!(err.path_string(), "$[1]");
    }

    #[test]
    fn wrong_token_for_a_sequence() {
        let mapper = mapper(|_| {});
        let input = tokens(|e| e.encode_str("nope"));
        let err = mapper.decode::<Vec<i32>, _>(input.decoder()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));
        assert_eq!(err.type_path(), Some("alloc::vec::Vec<i32>"));
    }
}
