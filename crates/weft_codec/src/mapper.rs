use std::any::Any;
use std::sync::Arc;

use crate::error::CodecError;
use crate::info::{TypeRef, Typed};
use crate::registry::{CodecRegistry, DecodeContext, EncodeContext};
use crate::stream::{Decoder, StreamEncoder, TokenWriter};

// -----------------------------------------------------------------------------
// MapperConfig

/// Per-mapper options applied to every call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapperConfig {
    view: Option<String>,
    fail_on_unknown_properties: bool,
}

impl MapperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only properties without views or in `view` are encoded and decoded.
    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    /// Fail with `UnknownProperty` instead of skipping unknown keys.
    pub fn fail_on_unknown_properties(mut self, enabled: bool) -> Self {
        self.fail_on_unknown_properties = enabled;
        self
    }

    #[inline]
    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    #[inline]
    pub fn fails_on_unknown_properties(&self) -> bool {
        self.fail_on_unknown_properties
    }
}

// -----------------------------------------------------------------------------
// Mapper

/// Entry point for encoding values to and decoding values from token streams.
///
/// Each call runs with its own [`ReferenceScope`](crate::reference::ReferenceScope)
/// and its own encoder or decoder; the shared registry is read-only, so a
/// mapper can be cloned or shared between threads freely.
///
/// The sink is flushed on every path, failed or not. When both the body
/// and the flush fail, the body's error is returned.
///
/// # Example
///
/// ```
/// use weft_codec::info::{GetDescriptor, ObjectDescriptor, PropertyDescriptor, TypeDescriptor};
/// use weft_codec::registry::RegistryBuilder;
/// use weft_codec::stream::TokenBuffer;
/// use weft_codec::Mapper;
///
/// #[derive(Debug, PartialEq)]
/// struct Person { name: String, age: u32 }
/// weft_codec::impl_typed!(Person);
///
/// impl GetDescriptor for Person {
///     fn get_descriptor() -> TypeDescriptor {
///         ObjectDescriptor::new(|v| Ok(Person { name: v.take("name")?, age: v.take("age")? }))
///             .property(PropertyDescriptor::field("name", |p: &Person| &p.name))
///             .property(PropertyDescriptor::field("age", |p: &Person| &p.age))
///             .into()
///     }
/// }
///
/// let mut builder = RegistryBuilder::new();
/// builder.register::<Person>();
/// let mapper = Mapper::new(builder.build().unwrap());
///
/// let ann = Person { name: "Ann".into(), age: 30 };
/// let tokens = mapper.encode(TokenBuffer::new(), &ann).unwrap();
/// assert_eq!(tokens.to_string(), r#"{"name":"Ann","age":30}"#);
///
/// let back: Person = mapper.decode(tokens.decoder()).unwrap();
/// assert_eq!(back, ann);
/// ```
#[derive(Debug, Clone)]
pub struct Mapper {
    registry: Arc<CodecRegistry>,
    config: MapperConfig,
}

impl Mapper {
    pub fn new(registry: impl Into<Arc<CodecRegistry>>) -> Self {
        Self {
            registry: registry.into(),
            config: MapperConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    #[inline]
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Writes `value` to `writer` and returns the writer.
    pub fn encode<T: Typed, W: TokenWriter>(&self, writer: W, value: &T) -> Result<W, CodecError> {
        self.encode_dyn(writer, value, &T::type_ref())
    }

    /// Writes the erased `value` of type `ty` to `writer`.
    pub fn encode_dyn<W: TokenWriter>(
        &self,
        writer: W,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<W, CodecError> {
        let mut encoder = StreamEncoder::new(writer);
        let mut ctx = EncodeContext::new(&self.registry, self.config.view());
        match ctx.serialize(&mut encoder, value, ty) {
            Ok(()) => encoder.finish()?,
            Err(err) => {
                if let Err(flush) = encoder.flush() {
                    log::debug!("flush after failed encode of `{ty}` failed too: {flush}");
                }
                return Err(err);
            }
        }
        Ok(encoder.into_inner())
    }

    /// Reads one value of type `T` from `decoder`.
    pub fn decode<T: Typed, D: Decoder>(&self, decoder: D) -> Result<T, CodecError> {
        let ty = T::type_ref();
        let value = self.decode_dyn(decoder, &ty)?;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(CodecError::type_mismatch(ty.path(), "another type").in_type(&ty)),
        }
    }

    /// Reads one erased value of type `ty` from `decoder`.
    ///
    /// Fails if content follows the value, or if a back reference was
    /// not linked to its owner.
    pub fn decode_dyn<D: Decoder>(
        &self,
        mut decoder: D,
        ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError> {
        let mut ctx = DecodeContext::new(
            &self.registry,
            self.config.view(),
            self.config.fails_on_unknown_properties(),
        );
        let value = ctx.deserialize(&mut decoder, ty)?;
        ctx.finish().map_err(|err| err.in_type(ty))?;
        decoder.finish()?;
        Ok(value)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::Mapper;
    use crate::error::ErrorKind;
    use crate::info::{GetDescriptor, ObjectDescriptor, PropertyDescriptor, TypeDescriptor, Typed};
    use crate::reference::BackRef;
    use crate::registry::RegistryBuilder;
    use crate::stream::{Encoder, TokenBuffer};
    use crate::testing::{encode, mapper, tokens};

    #[derive(Debug)]
    struct Folder {
        name: String,
        files: Vec<File>,
    }

    #[derive(Debug)]
    struct File {
        name: String,
        folder: BackRef<Folder>,
    }

    crate::impl_typed!(Folder);
    crate::impl_typed!(File);

    impl GetDescriptor for Folder {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| {
                Ok(Folder {
                    name: v.take("name")?,
                    files: v.take_or_default("files")?,
                })
            })
            .property(PropertyDescriptor::field("name", |f: &Folder| &f.name))
            .property(PropertyDescriptor::field("files", |f: &Folder| &f.files).managed())
            .into()
        }

        fn register_dependencies(builder: &mut RegistryBuilder) {
            builder.register::<File>();
        }
    }

    impl GetDescriptor for File {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| {
                Ok(File {
                    name: v.take("name")?,
                    folder: v.take("folder")?,
                })
            })
            .property(PropertyDescriptor::field("name", |f: &File| &f.name))
            .property(PropertyDescriptor::back("folder", |f: &File| &f.folder))
            .into()
        }
    }

    fn folder() -> Arc<Folder> {
        Arc::new_cyclic(|weak| Folder {
            name: "docs".into(),
            files: vec![
                File {
                    name: "a.txt".into(),
                    folder: BackRef::from_weak(weak.clone()),
                },
                File {
                    name: "b.txt".into(),
                    folder: BackRef::from_weak(weak.clone()),
                },
            ],
        })
    }

    fn folders() -> Mapper {
        mapper(|b| {
            b.register::<Folder>();
        })
    }

    #[test]
    fn back_references_are_restored() {
        let mapper = folders();
        let written = mapper.encode(TokenBuffer::new(), &folder()).unwrap();
        assert_eq!(
            written.to_string(),
            r#"{"name":"docs","files":[{"name":"a.txt"},{"name":"b.txt"}]}"#
        );

        let decoded: Arc<Folder> = mapper.decode(written.decoder()).unwrap();
        assert_eq!(decoded.files.len(), 2);
        for file in &decoded.files {
            assert!(Arc::ptr_eq(&file.folder.get().unwrap(), &decoded));
        }
    }

    #[test]
    fn back_reference_without_shared_owner_dangles() {
        let mapper = folders();
        let written = mapper.encode(TokenBuffer::new(), &folder()).unwrap();
        let err = mapper.decode::<Folder, _>(written.decoder()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::StructuralReference(_)));

        // no files, nothing to link.
        let empty = tokens(|e| {
            e.begin_object()?;
            e.encode_key("name")?;
            e.encode_str("empty")?;
            e.end_object()
        });
        let decoded: Folder = mapper.decode(empty.decoder()).unwrap();
        assert!(decoded.files.is_empty());
    }

    #[test]
    fn back_reference_to_unwritten_owner_fails() {
        let mapper = folders();
        let owner = folder();
        let stray = File {
            name: "c.txt".into(),
            folder: BackRef::from_weak(Arc::downgrade(&owner)),
        };
        let err = encode(&mapper, &stray).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::StructuralReference(_)));

        let unset = File {
            name: "d.txt".into(),
            folder: BackRef::new(),
        };
        assert_eq!(encode(&mapper, &unset).unwrap(), r#"{"name":"d.txt"}"#);
    }

    #[derive(Debug)]
    struct Shelf {
        loose: Folder,
        shared: Arc<Folder>,
    }

    crate::impl_typed!(Shelf);

    impl GetDescriptor for Shelf {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| {
                Ok(Shelf {
                    loose: v.take("loose")?,
                    shared: v.take("shared")?,
                })
            })
            .property(PropertyDescriptor::field("loose", |s: &Shelf| &s.loose))
            .property(PropertyDescriptor::field("shared", |s: &Shelf| &s.shared))
            .into()
        }

        fn register_dependencies(builder: &mut RegistryBuilder) {
            builder.register::<Folder>();
        }
    }

    #[test]
    fn back_reference_is_not_claimed_by_a_later_owner() {
        let mapper = mapper(|b| {
            b.register::<Shelf>();
        });
        let input = tokens(|e| {
            e.begin_object()?;
            e.encode_key("loose")?;
            e.begin_object()?;
            e.encode_key("name")?;
            e.encode_str("loose")?;
            e.encode_key("files")?;
            e.begin_array()?;
            e.begin_object()?;
            e.encode_key("name")?;
            e.encode_str("a.txt")?;
            e.end_object()?;
            e.end_array()?;
            e.end_object()?;
            e.encode_key("shared")?;
            e.begin_object()?;
            e.encode_key("name")?;
            e.encode_str("shared")?;
            e.end_object()?;
            e.end_object()
        });
        let err = mapper.decode::<Shelf, _>(input.decoder()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::StructuralReference(_)));
    }

    #[test]
    fn back_reference_outside_managed_property() {
        let mapper = folders();
        let input = tokens(|e| {
            e.begin_object()?;
            e.encode_key("name")?;
            e.encode_str("e.txt")?;
            e.end_object()
        });
        let err = mapper.decode::<File, _>(input.decoder()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::StructuralReference(_)));
    }

    #[test]
    fn erased_entry_points() {
        let mapper = folders();
        let value: Vec<u32> = vec![1, 2];
        let ty = <Vec<u32>>::type_ref();
        let written = mapper.encode_dyn(TokenBuffer::new(), &value, &ty).unwrap();
        let decoded = mapper.decode_dyn(written.decoder(), &ty).unwrap();
        assert_eq!(decoded.downcast_ref::<Vec<u32>>(), Some(&value));
    }

    #[test]
    fn mapper_is_shared_across_threads() {
        let mapper = folders();
        std::thread::scope(|scope| {
            for index in 0..4 {
                let mapper = &mapper;
                scope.spawn(move || {
                    let value = vec![index; 3];
                    let written = mapper.encode(TokenBuffer::new(), &value).unwrap();
                    let decoded: Vec<i32> = mapper.decode(written.decoder()).unwrap();
                    assert_eq!(decoded, value);
                });
            }
        });
    }
}
