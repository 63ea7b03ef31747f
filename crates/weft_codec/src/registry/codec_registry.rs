use std::sync::{Arc, PoisonError, RwLock};

use weft_utils::hash::HashMap;

use crate::codecs::{ObjectDeserializer, ObjectSerializer, ScalarTable};
use crate::codecs::{SubtypeDeserializer, SubtypeSerializer};
use crate::error::CodecError;
use crate::info::{ObjectDescriptor, PropertyDescriptor, SubtypeMapping, TypeRef};
use crate::naming::NamingStrategy;
use crate::registry::{Deserializer, DeserializerFactory, Serializer, SerializerFactory};

// -----------------------------------------------------------------------------
// CodecRegistry

/// The immutable lookup of codecs by type, built by a [`RegistryBuilder`].
///
/// Codecs derived from descriptors and raw type factories are created on
/// first use and cached. The cache is the only mutable state, so the
/// registry can be shared between threads behind an [`Arc`].
///
/// Lookup order for a type:
///
/// 1. a codec registered for exactly this type;
/// 2. the cache;
/// 3. a factory registered for the raw type path, e.g. `alloc::vec::Vec`;
/// 4. a subtype mapping, then an object descriptor;
/// 5. a builtin scalar codec.
///
/// [`RegistryBuilder`]: crate::registry::RegistryBuilder
pub struct CodecRegistry {
    pub(super) serializers: HashMap<TypeRef, Arc<dyn Serializer>>,
    pub(super) deserializers: HashMap<TypeRef, Arc<dyn Deserializer>>,
    pub(super) raw_serializers: HashMap<&'static str, Arc<dyn SerializerFactory>>,
    pub(super) raw_deserializers: HashMap<&'static str, Arc<dyn DeserializerFactory>>,
    pub(super) objects: HashMap<TypeRef, Arc<ObjectDescriptor>>,
    pub(super) subtypes: HashMap<TypeRef, Arc<SubtypeMapping>>,
    pub(super) scalars: ScalarTable,
    pub(super) naming: HashMap<String, Arc<dyn NamingStrategy>>,
    pub(super) serializer_cache: RwLock<HashMap<TypeRef, Arc<dyn Serializer>>>,
    pub(super) deserializer_cache: RwLock<HashMap<TypeRef, Arc<dyn Deserializer>>>,
}

impl CodecRegistry {
    /// Finds or creates the serializer of `ty`.
    ///
    /// Fails with `NoCodecAvailable` when nothing describes the type.
    pub fn find_serializer(&self, ty: &TypeRef) -> Result<Arc<dyn Serializer>, CodecError> {
        if let Some(serializer) = self.serializers.get(ty) {
            return Ok(Arc::clone(serializer));
        }

        let cache = self
            .serializer_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(serializer) = cache.get(ty) {
            return Ok(Arc::clone(serializer));
        }
        drop(cache);

        // Created outside the lock: factories resolve their element codecs
        // through this registry. A concurrent creation of the same type
        // loses to whichever is inserted first.
        let created = self.create_serializer(ty)?;
        log::debug!("created serializer for `{ty}`");

        let mut cache = self
            .serializer_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(ty.clone()).or_insert(created)))
    }

    /// Finds or creates the deserializer of `ty`.
    pub fn find_deserializer(&self, ty: &TypeRef) -> Result<Arc<dyn Deserializer>, CodecError> {
        if let Some(deserializer) = self.deserializers.get(ty) {
            return Ok(Arc::clone(deserializer));
        }

        let cache = self
            .deserializer_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(deserializer) = cache.get(ty) {
            return Ok(Arc::clone(deserializer));
        }
        drop(cache);

        let created = self.create_deserializer(ty)?;
        log::debug!("created deserializer for `{ty}`");

        let mut cache = self
            .deserializer_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(ty.clone()).or_insert(created)))
    }

    /// The serializer of a property: its own if set, else the one of its type.
    pub fn find_property_serializer(
        &self,
        property: &PropertyDescriptor,
    ) -> Result<Arc<dyn Serializer>, CodecError> {
        match property.custom_serializer() {
            Some(serializer) => Ok(Arc::clone(serializer)),
            None => self.find_serializer(property.ty()),
        }
    }

    /// The deserializer of a property: its own if set, else the one of its type.
    pub fn find_property_deserializer(
        &self,
        property: &PropertyDescriptor,
    ) -> Result<Arc<dyn Deserializer>, CodecError> {
        match property.custom_deserializer() {
            Some(deserializer) => Ok(Arc::clone(deserializer)),
            None => self.find_deserializer(property.ty()),
        }
    }

    /// Whether a serializer for `ty` can be found, without creating it.
    pub fn has_codec(&self, ty: &TypeRef) -> bool {
        self.serializers.contains_key(ty)
            || self.raw_serializers.contains_key(ty.path())
            || self.subtypes.contains_key(ty)
            || self.objects.contains_key(ty)
            || self.scalars.contains(&ty.id())
    }

    /// Whether a deserializer for `ty` can be found, without creating it.
    pub fn has_deserializer(&self, ty: &TypeRef) -> bool {
        self.deserializers.contains_key(ty)
            || self.raw_deserializers.contains_key(ty.path())
            || self.subtypes.contains_key(ty)
            || self.objects.contains_key(ty)
            || self.scalars.contains(&ty.id())
    }

    /// The object descriptor of `ty`, with wire names and inclusions resolved.
    #[inline]
    pub fn object_descriptor(&self, ty: &TypeRef) -> Option<&Arc<ObjectDescriptor>> {
        self.objects.get(ty)
    }

    #[inline]
    pub fn subtype_mapping(&self, ty: &TypeRef) -> Option<&Arc<SubtypeMapping>> {
        self.subtypes.get(ty)
    }

    /// A registered naming strategy.
    #[inline]
    pub fn naming(&self, name: &str) -> Option<&Arc<dyn NamingStrategy>> {
        self.naming.get(name)
    }

    fn create_serializer(&self, ty: &TypeRef) -> Result<Arc<dyn Serializer>, CodecError> {
        if let Some(factory) = self.raw_serializers.get(ty.path()) {
            return factory.create(ty, self);
        }
        if let Some(mapping) = self.subtypes.get(ty) {
            return Ok(Arc::new(SubtypeSerializer::new(Arc::clone(mapping))));
        }
        if let Some(object) = self.objects.get(ty) {
            return Ok(Arc::new(ObjectSerializer::new(Arc::clone(object), self)));
        }
        if let Some((serializer, _)) = self.scalars.get(&ty.id()) {
            return Ok(Arc::clone(serializer));
        }
        Err(CodecError::no_codec(ty))
    }

    fn create_deserializer(&self, ty: &TypeRef) -> Result<Arc<dyn Deserializer>, CodecError> {
        if let Some(factory) = self.raw_deserializers.get(ty.path()) {
            return factory.create(ty, self);
        }
        if let Some(mapping) = self.subtypes.get(ty) {
            return Ok(Arc::new(SubtypeDeserializer::new(Arc::clone(mapping), self)?));
        }
        if let Some(object) = self.objects.get(ty) {
            return Ok(Arc::new(ObjectDeserializer::new(Arc::clone(object), self)?));
        }
        if let Some((_, deserializer)) = self.scalars.get(&ty.id()) {
            return Ok(Arc::clone(deserializer));
        }
        Err(CodecError::no_codec(ty))
    }
}

impl core::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("objects", &self.objects.len())
            .field("subtypes", &self.subtypes.len())
            .field("serializers", &self.serializers.len())
            .field("deserializers", &self.deserializers.len())
            .field("raw_types", &self.raw_serializers.len())
            .finish_non_exhaustive()
    }
}
