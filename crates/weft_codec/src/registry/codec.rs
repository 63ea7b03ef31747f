use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::CodecError;
use crate::info::{PropertyDescriptor, Shape, TypeRef, Typed};
use crate::reference::ReferenceScope;
use crate::registry::CodecRegistry;
use crate::stream::{Decoder, Encoder, TokenBuffer};

// -----------------------------------------------------------------------------
// Serializer / Deserializer

/// Writes values of one type to an [`Encoder`].
///
/// `value` is the erased value of type `ty`; implementations downcast it
/// and fail with `TypeMismatch` on anything else.
pub trait Serializer: Send + Sync + 'static {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError>;

    /// Whether `value` counts as empty for [`Inclusion::NonEmpty`](crate::info::Inclusion).
    fn is_empty(&self, _value: &dyn Any) -> bool {
        false
    }

    /// Writes the members of `value` into an object the caller already opened.
    ///
    /// Needed to put a discriminator next to the object's own keys.
    fn serialize_properties(
        &self,
        _encoder: &mut dyn Encoder,
        _ctx: &mut EncodeContext<'_>,
        _value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        Err(CodecError::config("type cannot be written as object properties").in_type(ty))
    }
}

/// Reads values of one type from a [`Decoder`].
pub trait Deserializer: Send + Sync + 'static {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError>;

    /// The value of an absent property, if the type has one (e.g. `None`).
    fn absent_value(&self, _ty: &TypeRef) -> Option<Box<dyn Any>> {
        None
    }

    /// Reads the rest of an object the caller already opened.
    ///
    /// `buffered` holds members the caller read before it knew the type.
    fn deserialize_properties(
        &self,
        _decoder: &mut dyn Decoder,
        _ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
        _buffered: Vec<(String, TokenBuffer)>,
    ) -> Result<Box<dyn Any>, CodecError> {
        Err(CodecError::config("type cannot be read from object properties").in_type(ty))
    }
}

/// Builds the serializer of a parameterized type from its raw type.
///
/// Registered per raw path; element codecs come from the same registry.
pub trait SerializerFactory: Send + Sync + 'static {
    fn create(
        &self,
        ty: &TypeRef,
        registry: &CodecRegistry,
    ) -> Result<Arc<dyn Serializer>, CodecError>;
}

/// Builds the deserializer of a parameterized type from its raw type.
pub trait DeserializerFactory: Send + Sync + 'static {
    fn create(
        &self,
        ty: &TypeRef,
        registry: &CodecRegistry,
    ) -> Result<Arc<dyn Deserializer>, CodecError>;
}

// -----------------------------------------------------------------------------
// Function codecs

struct FnSerializer<T> {
    f: fn(&T, &mut dyn Encoder) -> Result<(), CodecError>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any> Serializer for FnSerializer<T> {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        _ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        let value = value
            .downcast_ref::<T>()
            .ok_or_else(|| CodecError::type_mismatch(ty.path(), "another type").in_type(ty))?;
        (self.f)(value, encoder)
    }
}

struct FnDeserializer<T> {
    f: fn(&mut dyn Decoder) -> Result<T, CodecError>,
}

impl<T: Any> Deserializer for FnDeserializer<T> {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        _ctx: &mut DecodeContext<'_>,
        _ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError> {
        Ok(Box::new((self.f)(decoder)?))
    }
}

/// A serializer from a plain function.
pub fn serializer_fn<T: Any>(
    f: fn(&T, &mut dyn Encoder) -> Result<(), CodecError>,
) -> Arc<dyn Serializer> {
    Arc::new(FnSerializer {
        f,
        _marker: PhantomData,
    })
}

/// A deserializer from a plain function.
pub fn deserializer_fn<T: Any>(
    f: fn(&mut dyn Decoder) -> Result<T, CodecError>,
) -> Arc<dyn Deserializer> {
    Arc::new(FnDeserializer { f })
}

// -----------------------------------------------------------------------------
// Converting codecs

struct AsSerializer<T, S> {
    convert: fn(&T) -> S,
}

impl<T: Any, S: Typed> AsSerializer<T, S> {
    fn converted(&self, value: &dyn Any, ty: &TypeRef) -> Result<S, CodecError> {
        value
            .downcast_ref::<T>()
            .map(self.convert)
            .ok_or_else(|| CodecError::type_mismatch(ty.path(), "another type").in_type(ty))
    }
}

impl<T: Any, S: Typed> Serializer for AsSerializer<T, S> {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        let converted = self.converted(value, ty)?;
        ctx.serialize(encoder, &converted, &S::type_ref())
    }

    fn serialize_properties(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        let converted = self.converted(value, ty)?;
        let target = S::type_ref();
        let serializer = ctx.registry().find_serializer(&target)?;
        serializer.serialize_properties(encoder, ctx, &converted, &target)
    }
}

struct AsDeserializer<S, T> {
    convert: fn(S) -> T,
}

impl<S: Typed, T: Any> AsDeserializer<S, T> {
    fn converted(&self, value: Box<dyn Any>, ty: &TypeRef) -> Result<Box<dyn Any>, CodecError> {
        let source = S::type_ref();
        match value.downcast::<S>() {
            Ok(value) => Ok(Box::new((self.convert)(*value))),
            Err(_) => Err(CodecError::type_mismatch(source.path(), "another type").in_type(ty)),
        }
    }
}

impl<S: Typed, T: Any> Deserializer for AsDeserializer<S, T> {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError> {
        let value = ctx.deserialize(decoder, &S::type_ref())?;
        self.converted(value, ty)
    }

    fn absent_value(&self, ty: &TypeRef) -> Option<Box<dyn Any>> {
        match S::type_ref().shape() {
            Shape::Optional(ops) => self.converted((ops.none)(), ty).ok(),
            _ => None,
        }
    }

    fn deserialize_properties(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
        buffered: Vec<(String, TokenBuffer)>,
    ) -> Result<Box<dyn Any>, CodecError> {
        let source = S::type_ref();
        let deserializer = ctx.registry().find_deserializer(&source)?;
        let value = deserializer.deserialize_properties(decoder, ctx, &source, buffered)?;
        self.converted(value, ty)
    }
}

/// A serializer that converts `T` to `S` and writes the result with the
/// codec of `S`.
pub fn serializer_as<T: Any, S: Typed>(convert: fn(&T) -> S) -> Arc<dyn Serializer> {
    Arc::new(AsSerializer { convert })
}

/// A deserializer that reads an `S` with the codec of `S` and converts it to `T`.
pub fn deserializer_as<S: Typed, T: Any>(convert: fn(S) -> T) -> Arc<dyn Deserializer> {
    Arc::new(AsDeserializer { convert })
}

// -----------------------------------------------------------------------------
// Contexts

/// Per-call state handed to every serializer.
pub struct EncodeContext<'r> {
    registry: &'r CodecRegistry,
    references: ReferenceScope,
    view: Option<&'r str>,
}

impl<'r> EncodeContext<'r> {
    pub fn new(registry: &'r CodecRegistry, view: Option<&'r str>) -> Self {
        Self {
            registry,
            references: ReferenceScope::new(),
            view,
        }
    }

    #[inline]
    pub fn registry(&self) -> &'r CodecRegistry {
        self.registry
    }

    #[inline]
    pub fn references(&mut self) -> &mut ReferenceScope {
        &mut self.references
    }

    /// The active view, `None` when every property is visible.
    #[inline]
    pub fn view(&self) -> Option<&'r str> {
        self.view
    }

    /// Resolves the serializer of `ty` and writes `value` with it.
    pub fn serialize(
        &mut self,
        encoder: &mut dyn Encoder,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        let serializer = self.registry.find_serializer(ty)?;
        serializer.serialize(encoder, self, value, ty)
    }

    /// Like [`serialize`](Self::serialize), honoring a property's custom serializer.
    pub fn serialize_property(
        &mut self,
        encoder: &mut dyn Encoder,
        value: &dyn Any,
        property: &PropertyDescriptor,
    ) -> Result<(), CodecError> {
        let serializer = self.registry.find_property_serializer(property)?;
        serializer.serialize(encoder, self, value, property.ty())
    }
}

/// Per-call state handed to every deserializer.
pub struct DecodeContext<'r> {
    registry: &'r CodecRegistry,
    references: ReferenceScope,
    view: Option<&'r str>,
    fail_on_unknown: bool,
}

impl<'r> DecodeContext<'r> {
    pub fn new(registry: &'r CodecRegistry, view: Option<&'r str>, fail_on_unknown: bool) -> Self {
        Self {
            registry,
            references: ReferenceScope::new(),
            view,
            fail_on_unknown,
        }
    }

    #[inline]
    pub fn registry(&self) -> &'r CodecRegistry {
        self.registry
    }

    #[inline]
    pub fn references(&mut self) -> &mut ReferenceScope {
        &mut self.references
    }

    #[inline]
    pub fn view(&self) -> Option<&'r str> {
        self.view
    }

    /// Whether an unknown key fails the call instead of being skipped.
    #[inline]
    pub fn fail_on_unknown(&self) -> bool {
        self.fail_on_unknown
    }

    /// Resolves the deserializer of `ty` and reads a value with it.
    pub fn deserialize(
        &mut self,
        decoder: &mut dyn Decoder,
        ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError> {
        let deserializer = self.registry.find_deserializer(ty)?;
        deserializer.deserialize(decoder, self, ty)
    }

    /// Checks that every back reference found its owner.
    pub fn finish(&self) -> Result<(), CodecError> {
        self.references.finish()
    }
}
