//! Builtin codecs for primitives, `String` and [`Bytes`].

use std::any::Any;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use weft_utils::TypeIdMap;

use crate::error::CodecError;
use crate::info::TypeRef;
use crate::registry::{DecodeContext, Deserializer, EncodeContext, Serializer};
use crate::stream::{Decoder, Encoder};

/// A binary payload, written as a binary scalar instead of an array of numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Deref for Bytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl DerefMut for Bytes {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

// -----------------------------------------------------------------------------
// Scalar

trait Scalar: Any + Sized {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), CodecError>;

    fn decode(decoder: &mut dyn Decoder) -> Result<Self, CodecError>;

    fn is_empty(&self) -> bool {
        false
    }
}

macro_rules! impl_signed {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), CodecError> {
                    encoder.encode_i64(*self as i64)
                }

                fn decode(decoder: &mut dyn Decoder) -> Result<Self, CodecError> {
                    let value = decoder.decode_i64()?;
                    <$ty>::try_from(value)
                        .map_err(|_| CodecError::type_mismatch(stringify!($ty), value.to_string()))
                }
            }
        )*
    };
}

macro_rules! impl_unsigned {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), CodecError> {
                    encoder.encode_u64(*self as u64)
                }

                fn decode(decoder: &mut dyn Decoder) -> Result<Self, CodecError> {
                    let value = decoder.decode_u64()?;
                    <$ty>::try_from(value)
                        .map_err(|_| CodecError::type_mismatch(stringify!($ty), value.to_string()))
                }
            }
        )*
    };
}

impl_signed!(i8, i16, i32, i64, isize);
impl_unsigned!(u8, u16, u32, u64, usize);

impl Scalar for bool {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), CodecError> {
        encoder.encode_bool(*self)
    }

    fn decode(decoder: &mut dyn Decoder) -> Result<Self, CodecError> {
        decoder.decode_bool()
    }
}

impl Scalar for f64 {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), CodecError> {
        encoder.encode_f64(*self)
    }

    fn decode(decoder: &mut dyn Decoder) -> Result<Self, CodecError> {
        decoder.decode_f64()
    }
}

impl Scalar for f32 {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), CodecError> {
        encoder.encode_f64(f64::from(*self))
    }

    fn decode(decoder: &mut dyn Decoder) -> Result<Self, CodecError> {
        Ok(decoder.decode_f64()? as f32)
    }
}

impl Scalar for char {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), CodecError> {
        encoder.encode_str(self.encode_utf8(&mut [0; 4]))
    }

    fn decode(decoder: &mut dyn Decoder) -> Result<Self, CodecError> {
        let value = decoder.decode_string()?;
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(CodecError::type_mismatch("char", format!("string {value:?}"))),
        }
    }
}

impl Scalar for String {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), CodecError> {
        encoder.encode_str(self)
    }

    fn decode(decoder: &mut dyn Decoder) -> Result<Self, CodecError> {
        decoder.decode_string()
    }

    fn is_empty(&self) -> bool {
        String::is_empty(self)
    }
}

impl Scalar for Bytes {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<(), CodecError> {
        encoder.encode_binary(&self.0)
    }

    fn decode(decoder: &mut dyn Decoder) -> Result<Self, CodecError> {
        decoder.decode_binary().map(Bytes)
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// -----------------------------------------------------------------------------
// ScalarCodec

struct ScalarCodec<T>(PhantomData<fn() -> T>);

impl<T: Scalar> Serializer for ScalarCodec<T> {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        _ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        match value.downcast_ref::<T>() {
            Some(value) => value.encode(encoder),
            None => Err(CodecError::type_mismatch(ty.path(), "another type").in_type(ty)),
        }
    }

    fn is_empty(&self, value: &dyn Any) -> bool {
        value.downcast_ref::<T>().is_some_and(T::is_empty)
    }
}

impl<T: Scalar> Deserializer for ScalarCodec<T> {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        _ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError> {
        T::decode(decoder)
            .map(|value| Box::new(value) as Box<dyn Any>)
            .map_err(|err| err.in_type(ty))
    }
}

pub(crate) type ScalarTable = TypeIdMap<(Arc<dyn Serializer>, Arc<dyn Deserializer>)>;

fn insert<T: Scalar>(table: &mut ScalarTable) {
    let codec = Arc::new(ScalarCodec::<T>(PhantomData));
    let serializer: Arc<dyn Serializer> = codec.clone();
    let deserializer: Arc<dyn Deserializer> = codec;
    table.insert_type::<T>((serializer, deserializer));
}

/// The builtin scalar codecs, keyed by type.
pub(crate) fn builtin_scalars() -> ScalarTable {
    let mut table = TypeIdMap::new();
    insert::<bool>(&mut table);
    insert::<i8>(&mut table);
    insert::<i16>(&mut table);
    insert::<i32>(&mut table);
    insert::<i64>(&mut table);
    insert::<isize>(&mut table);
    insert::<u8>(&mut table);
    insert::<u16>(&mut table);
    insert::<u32>(&mut table);
    insert::<u64>(&mut table);
    insert::<usize>(&mut table);
    insert::<f32>(&mut table);
    insert::<f64>(&mut table);
    insert::<char>(&mut table);
    insert::<String>(&mut table);
    insert::<Bytes>(&mut table);
    table
}
