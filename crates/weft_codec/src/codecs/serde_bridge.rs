//! Codecs for types that implement `serde` traits.
//!
//! The value is written through a `serde` serializer over an [`Encoder`]
//! and read through a `serde` deserializer over a [`Decoder`]. The type
//! is erased with `erased-serde`, so one codec struct serves every type.

use std::any::Any;
use std::fmt;

use serde_core::de::value::StringDeserializer;
use serde_core::de::{self, DeserializeSeed, Visitor};
use serde_core::ser::{self, Impossible, Serialize};

use crate::error::{CodecError, ErrorKind};
use crate::info::{TypeRef, Typed};
use crate::registry::{DecodeContext, Deserializer, EncodeContext, Serializer};
use crate::stream::{Decoder, Encoder, Number, TokenKind};

// -----------------------------------------------------------------------------
// SerdeCodec

type SerializeFn = fn(&dyn Any) -> Option<&dyn erased_serde::Serialize>;

type DeserializeFn =
    fn(&mut dyn erased_serde::Deserializer<'_>) -> Result<Box<dyn Any>, erased_serde::Error>;

/// A codec delegating to the `serde` implementations of one type.
///
/// Registered with [`RegistryBuilder::register_serde`].
///
/// [`RegistryBuilder::register_serde`]: crate::registry::RegistryBuilder::register_serde
#[derive(Clone, Copy)]
pub struct SerdeCodec {
    serialize: SerializeFn,
    deserialize: DeserializeFn,
}

impl SerdeCodec {
    pub fn of<T>() -> Self
    where
        T: Typed + Serialize + de::DeserializeOwned,
    {
        Self {
            serialize: |value| {
                value
                    .downcast_ref::<T>()
                    .map(|value| value as &dyn erased_serde::Serialize)
            },
            deserialize: |deserializer| {
                Ok(Box::new(erased_serde::deserialize::<T>(deserializer)?) as Box<dyn Any>)
            },
        }
    }
}

impl fmt::Debug for SerdeCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeCodec").finish_non_exhaustive()
    }
}

impl Serializer for SerdeCodec {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        _ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        let Some(value) = (self.serialize)(value) else {
            return Err(CodecError::type_mismatch(ty.path(), "another type").in_type(ty));
        };
        let mut serializer = EncoderSerializer { encoder };
        erased_serde::serialize(value, &mut serializer).map_err(|err| err.in_type(ty))
    }
}

impl Deserializer for SerdeCodec {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        _ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError> {
        let mut deserializer = DecoderDeserializer {
            decoder,
            error: None,
        };
        let result = {
            let mut erased = <dyn erased_serde::Deserializer>::erase(&mut deserializer);
            (self.deserialize)(&mut erased)
        };
        result.map_err(|err| match deserializer.error.take() {
            Some(original) => original.in_type(ty),
            None => CodecError::new(ErrorKind::Message(err.to_string())).in_type(ty),
        })
    }
}

// -----------------------------------------------------------------------------
// EncoderSerializer

/// A `serde` serializer writing tokens to an [`Encoder`].
pub(crate) struct EncoderSerializer<'a> {
    encoder: &'a mut dyn Encoder,
}

/// Sequence, map and struct state. `close_outer` ends the object that
/// wraps a variant.
pub(crate) struct Compound<'a, 'b> {
    ser: &'a mut EncoderSerializer<'b>,
    close_outer: bool,
}

impl Compound<'_, '_> {
    fn end_array(self) -> Result<(), CodecError> {
        self.ser.encoder.end_array()?;
        if self.close_outer {
            self.ser.encoder.end_object()?;
        }
        Ok(())
    }

    fn end_object(self) -> Result<(), CodecError> {
        self.ser.encoder.end_object()?;
        if self.close_outer {
            self.ser.encoder.end_object()?;
        }
        Ok(())
    }
}

impl<'a, 'b> ser::Serializer for &'a mut EncoderSerializer<'b> {
    type Ok = ();
    type Error = CodecError;
    type SerializeSeq = Compound<'a, 'b>;
    type SerializeTuple = Compound<'a, 'b>;
    type SerializeTupleStruct = Compound<'a, 'b>;
    type SerializeTupleVariant = Compound<'a, 'b>;
    type SerializeMap = Compound<'a, 'b>;
    type SerializeStruct = Compound<'a, 'b>;
    type SerializeStructVariant = Compound<'a, 'b>;

    fn serialize_bool(self, v: bool) -> Result<(), CodecError> {
        self.encoder.encode_bool(v)
    }

    fn serialize_i8(self, v: i8) -> Result<(), CodecError> {
        self.encoder.encode_i64(v.into())
    }

    fn serialize_i16(self, v: i16) -> Result<(), CodecError> {
        self.encoder.encode_i64(v.into())
    }

    fn serialize_i32(self, v: i32) -> Result<(), CodecError> {
        self.encoder.encode_i64(v.into())
    }

    fn serialize_i64(self, v: i64) -> Result<(), CodecError> {
        self.encoder.encode_i64(v)
    }

    fn serialize_u8(self, v: u8) -> Result<(), CodecError> {
        self.encoder.encode_u64(v.into())
    }

    fn serialize_u16(self, v: u16) -> Result<(), CodecError> {
        self.encoder.encode_u64(v.into())
    }

    fn serialize_u32(self, v: u32) -> Result<(), CodecError> {
        self.encoder.encode_u64(v.into())
    }

    fn serialize_u64(self, v: u64) -> Result<(), CodecError> {
        self.encoder.encode_u64(v)
    }

    fn serialize_f32(self, v: f32) -> Result<(), CodecError> {
        self.encoder.encode_f64(v.into())
    }

    fn serialize_f64(self, v: f64) -> Result<(), CodecError> {
        self.encoder.encode_f64(v)
    }

    fn serialize_char(self, v: char) -> Result<(), CodecError> {
        self.encoder.encode_str(v.encode_utf8(&mut [0; 4]))
    }

    fn serialize_str(self, v: &str) -> Result<(), CodecError> {
        self.encoder.encode_str(v)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<(), CodecError> {
        self.encoder.encode_binary(v)
    }

    fn serialize_none(self) -> Result<(), CodecError> {
        self.encoder.encode_null()
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), CodecError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), CodecError> {
        self.encoder.encode_null()
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), CodecError> {
        self.encoder.encode_null()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<(), CodecError> {
        self.encoder.encode_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        self.encoder.begin_object()?;
        self.encoder.encode_key(variant)?;
        value.serialize(&mut *self)?;
        self.encoder.end_object()
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Compound<'a, 'b>, CodecError> {
        self.encoder.begin_array()?;
        Ok(Compound {
            ser: self,
            close_outer: false,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Compound<'a, 'b>, CodecError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Compound<'a, 'b>, CodecError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Compound<'a, 'b>, CodecError> {
        self.encoder.begin_object()?;
        self.encoder.encode_key(variant)?;
        self.encoder.begin_array()?;
        Ok(Compound {
            ser: self,
            close_outer: true,
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Compound<'a, 'b>, CodecError> {
        self.encoder.begin_object()?;
        Ok(Compound {
            ser: self,
            close_outer: false,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Compound<'a, 'b>, CodecError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Compound<'a, 'b>, CodecError> {
        self.encoder.begin_object()?;
        self.encoder.encode_key(variant)?;
        self.encoder.begin_object()?;
        Ok(Compound {
            ser: self,
            close_outer: true,
        })
    }
}

impl ser::SerializeSeq for Compound<'_, '_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), CodecError> {
        self.end_array()
    }
}

impl ser::SerializeTuple for Compound<'_, '_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), CodecError> {
        self.end_array()
    }
}

impl ser::SerializeTupleStruct for Compound<'_, '_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), CodecError> {
        self.end_array()
    }
}

impl ser::SerializeTupleVariant for Compound<'_, '_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), CodecError> {
        self.end_array()
    }
}

impl ser::SerializeMap for Compound<'_, '_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), CodecError> {
        key.serialize(KeySerializer {
            encoder: &mut *self.ser.encoder,
        })
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), CodecError> {
        self.end_object()
    }
}

impl ser::SerializeStruct for Compound<'_, '_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        self.ser.encoder.encode_key(key)?;
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), CodecError> {
        self.end_object()
    }
}

impl ser::SerializeStructVariant for Compound<'_, '_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        self.ser.encoder.encode_key(key)?;
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), CodecError> {
        self.end_object()
    }
}

// -----------------------------------------------------------------------------
// KeySerializer

/// Writes map keys: strings as is, integers, booleans and chars as text.
struct KeySerializer<'a> {
    encoder: &'a mut dyn Encoder,
}

fn key_error(found: &'static str) -> CodecError {
    CodecError::type_mismatch("string map key", found)
}

impl ser::Serializer for KeySerializer<'_> {
    type Ok = ();
    type Error = CodecError;
    type SerializeSeq = Impossible<(), CodecError>;
    type SerializeTuple = Impossible<(), CodecError>;
    type SerializeTupleStruct = Impossible<(), CodecError>;
    type SerializeTupleVariant = Impossible<(), CodecError>;
    type SerializeMap = Impossible<(), CodecError>;
    type SerializeStruct = Impossible<(), CodecError>;
    type SerializeStructVariant = Impossible<(), CodecError>;

    fn serialize_bool(self, v: bool) -> Result<(), CodecError> {
        self.encoder.encode_key(if v { "true" } else { "false" })
    }

    fn serialize_i8(self, v: i8) -> Result<(), CodecError> {
        self.encoder.encode_key(&v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<(), CodecError> {
        self.encoder.encode_key(&v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<(), CodecError> {
        self.encoder.encode_key(&v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<(), CodecError> {
        self.encoder.encode_key(&v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<(), CodecError> {
        self.encoder.encode_key(&v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<(), CodecError> {
        self.encoder.encode_key(&v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<(), CodecError> {
        self.encoder.encode_key(&v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<(), CodecError> {
        self.encoder.encode_key(&v.to_string())
    }

    fn serialize_f32(self, _v: f32) -> Result<(), CodecError> {
        Err(key_error("float"))
    }

    fn serialize_f64(self, _v: f64) -> Result<(), CodecError> {
        Err(key_error("float"))
    }

    fn serialize_char(self, v: char) -> Result<(), CodecError> {
        self.encoder.encode_key(v.encode_utf8(&mut [0; 4]))
    }

    fn serialize_str(self, v: &str) -> Result<(), CodecError> {
        self.encoder.encode_key(v)
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), CodecError> {
        Err(key_error("bytes"))
    }

    fn serialize_none(self) -> Result<(), CodecError> {
        Err(key_error("null"))
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), CodecError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), CodecError> {
        Err(key_error("unit"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), CodecError> {
        Err(key_error("unit"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<(), CodecError> {
        self.encoder.encode_key(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), CodecError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<(), CodecError> {
        Err(key_error("enum variant"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, CodecError> {
        Err(key_error("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, CodecError> {
        Err(key_error("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, CodecError> {
        Err(key_error("tuple"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, CodecError> {
        Err(key_error("enum variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, CodecError> {
        Err(key_error("map"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, CodecError> {
        Err(key_error("struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, CodecError> {
        Err(key_error("enum variant"))
    }
}

// -----------------------------------------------------------------------------
// DecoderDeserializer

/// A `serde` deserializer reading tokens from a [`Decoder`].
///
/// Errors raised by the decoder are kept in `error`, since the erased
/// layer only carries their message.
pub(crate) struct DecoderDeserializer<'a> {
    decoder: &'a mut dyn Decoder,
    error: Option<CodecError>,
}

impl DecoderDeserializer<'_> {
    fn call<T>(
        &mut self,
        f: impl FnOnce(&mut dyn Decoder) -> Result<T, CodecError>,
    ) -> Result<T, CodecError> {
        f(&mut *self.decoder).map_err(|err| {
            let message = err.to_string();
            if self.error.is_none() {
                self.error = Some(err);
            }
            CodecError::new(ErrorKind::Message(message))
        })
    }
}

macro_rules! forward_to_any {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
                self.deserialize_any(visitor)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for &mut DecoderDeserializer<'_> {
    type Error = CodecError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        match self.call(|d| d.peek())? {
            TokenKind::Null => {
                self.call(|d| d.decode_null())?;
                visitor.visit_unit()
            }
            TokenKind::Boolean => visitor.visit_bool(self.call(|d| d.decode_bool())?),
            TokenKind::Number => match self.call(|d| d.decode_number())? {
                Number::Int(v) => visitor.visit_i64(v),
                Number::UInt(v) => visitor.visit_u64(v),
                Number::Float(v) => visitor.visit_f64(v),
            },
            TokenKind::String => visitor.visit_string(self.call(|d| d.decode_string())?),
            TokenKind::Binary => visitor.visit_byte_buf(self.call(|d| d.decode_binary())?),
            TokenKind::Object => {
                self.call(|d| d.begin_object())?;
                visitor.visit_map(MapAccessor { de: self })
            }
            TokenKind::Array => {
                self.call(|d| d.begin_array())?;
                visitor.visit_seq(SeqAccessor { de: self })
            }
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        if self.call(|d| d.peek())? == TokenKind::Null {
            self.call(|d| d.decode_null())?;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        // text formats carry binary values as strings, decoded by the adapter.
        match self.call(|d| d.peek())? {
            TokenKind::Binary | TokenKind::String => {
                visitor.visit_byte_buf(self.call(|d| d.decode_binary())?)
            }
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        match self.call(|d| d.peek())? {
            TokenKind::String => {
                let variant = self.call(|d| d.decode_string())?;
                visitor.visit_enum(StringDeserializer::<CodecError>::new(variant))
            }
            TokenKind::Object => {
                self.call(|d| d.begin_object())?;
                let Some(variant) = self.call(|d| d.next_key())? else {
                    return Err(CodecError::type_mismatch("enum variant", "empty object"));
                };
                let value = visitor.visit_enum(EnumAccessor {
                    de: &mut *self,
                    variant,
                })?;
                match self.call(|d| d.next_key())? {
                    None => Ok(value),
                    Some(extra) => Err(CodecError::type_mismatch(
                        "object with one enum variant",
                        format!("another key `{extra}`"),
                    )),
                }
            }
            kind => Err(CodecError::unexpected_token("enum variant", kind)),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, CodecError> {
        self.call(|d| d.skip_value())?;
        visitor.visit_unit()
    }

    forward_to_any! {
        deserialize_bool deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
        deserialize_f32 deserialize_f64 deserialize_char deserialize_str deserialize_string
        deserialize_unit deserialize_seq deserialize_map deserialize_identifier
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_any(visitor)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_any(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_any(visitor)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        self.deserialize_any(visitor)
    }
}

struct MapAccessor<'a, 'b> {
    de: &'a mut DecoderDeserializer<'b>,
}

impl<'de> de::MapAccess<'de> for MapAccessor<'_, '_> {
    type Error = CodecError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, CodecError> {
        match self.de.call(|d| d.next_key())? {
            Some(key) => seed.deserialize(StringDeserializer::<CodecError>::new(key)).map(Some),
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, CodecError> {
        seed.deserialize(&mut *self.de)
    }
}

struct SeqAccessor<'a, 'b> {
    de: &'a mut DecoderDeserializer<'b>,
}

impl<'de> de::SeqAccess<'de> for SeqAccessor<'_, '_> {
    type Error = CodecError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, CodecError> {
        if self.de.call(|d| d.has_next_element())? {
            seed.deserialize(&mut *self.de).map(Some)
        } else {
            Ok(None)
        }
    }
}

struct EnumAccessor<'a, 'b> {
    de: &'a mut DecoderDeserializer<'b>,
    variant: String,
}

impl<'de, 'a, 'b> de::EnumAccess<'de> for EnumAccessor<'a, 'b> {
    type Error = CodecError;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self), CodecError> {
        let variant = self.variant.clone();
        let value = seed.deserialize(StringDeserializer::<CodecError>::new(variant))?;
        Ok((value, self))
    }
}

impl<'de> de::VariantAccess<'de> for EnumAccessor<'_, '_> {
    type Error = CodecError;

    fn unit_variant(self) -> Result<(), CodecError> {
        self.de.call(|d| d.decode_null())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, CodecError> {
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        de::Deserializer::deserialize_seq(&mut *self.de, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, CodecError> {
        de::Deserializer::deserialize_map(&mut *self.de, visitor)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};

    use crate::error::ErrorKind;
    use crate::info::{GetDescriptor, ObjectDescriptor, PropertyDescriptor, TypeDescriptor};
    use crate::registry::RegistryBuilder;
    use crate::stream::Encoder;
    use crate::testing::{encode, mapper, roundtrip, tokens};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Mode {
        Fast,
        Careful { retries: u8 },
        Named(String),
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Settings {
        name: String,
        tags: Vec<String>,
        limit: Option<u32>,
        mode: Mode,
        #[serde(with = "bytes")]
        blob: Vec<u8>,
    }

    mod bytes {
        use serde::{Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_bytes(value)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<u8>, D::Error> {
            struct Visitor;

            impl serde::de::Visitor<'_> for Visitor {
                type Value = Vec<u8>;

                fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                    f.write_str("bytes")
                }

                fn visit_bytes<E>(self, v: &[u8]) -> Result<Vec<u8>, E> {
                    Ok(v.to_vec())
                }

                fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Vec<u8>, E> {
                    Ok(v)
                }
            }

            deserializer.deserialize_byte_buf(Visitor)
        }
    }

    crate::impl_typed!(Mode);
    crate::impl_typed!(Settings);

    fn settings() -> Settings {
        Settings {
            name: "main".into(),
            tags: vec!["a".into(), "b".into()],
            limit: None,
            mode: Mode::Careful { retries: 3 },
            blob: vec![0xde, 0xad],
        }
    }

    #[test]
    fn serde_types_use_the_token_stream() {
        let mapper = mapper(|b| {
            b.register_serde::<Settings>();
        });
        assert_eq!(
            encode(&mapper, &settings()).unwrap(),
            concat!(
                r#"{"name":"main","tags":["a","b"],"limit":null,"#,
                r#""mode":{"Careful":{"retries":3}},"blob":b"dead"}"#,
            )
        );
        assert_eq!(roundtrip(&mapper, &settings()), settings());

        for mode in [Mode::Fast, Mode::Named("n".into())] {
            let value = Settings { mode, ..settings() };
            assert_eq!(roundtrip(&mapper, &value), value);
        }
    }

    #[test]
    fn serde_errors_become_codec_errors() {
        let mapper = mapper(|b| {
            b.register_serde::<Mode>();
        });
        let input = tokens(|e| e.encode_str("Slow"));
        let err = mapper.decode::<Mode, _>(input.decoder()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Message(msg) if msg.contains("Slow")));
    }

    #[test]
    fn map_keys_are_written_as_strings() {
        #[derive(Serialize, Deserialize)]
        struct Indexed(BTreeMap<u32, bool>);
        crate::impl_typed!(Indexed);

        let mapper = mapper(|b| {
            b.register_serde::<Indexed>();
        });
        let value = Indexed(BTreeMap::from([(1, true), (20, false)]));
        assert_eq!(encode(&mapper, &value).unwrap(), r#"{"1":true,"20":false}"#);
    }

    #[derive(Debug, PartialEq)]
    struct Job {
        id: u64,
        settings: Settings,
    }

    crate::impl_typed!(Job);

    impl GetDescriptor for Job {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| {
                Ok(Job {
                    id: v.take("id")?,
                    settings: v.take("settings")?,
                })
            })
            .property(PropertyDescriptor::field("id", |j: &Job| &j.id))
            .property(PropertyDescriptor::field("settings", |j: &Job| &j.settings))
            .into()
        }

        fn register_dependencies(builder: &mut RegistryBuilder) {
            builder.register_serde::<Settings>();
        }
    }

    #[test]
    fn serde_types_nest_inside_descriptor_types() {
        let mapper = mapper(|b| {
            b.register::<Job>();
        });
        let job = Job { id: 9, settings: settings() };
        assert_eq!(roundtrip(&mapper, &job), job);
    }
}
