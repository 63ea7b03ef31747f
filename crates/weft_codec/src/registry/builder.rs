use std::sync::{Arc, RwLock};

use weft_utils::hash::{HashMap, HashSet};

use crate::codecs::{MapFactory, OptionFactory, PointerFactory, SequenceFactory, SerdeCodec};
use crate::codecs::builtin_scalars;
use crate::error::CodecError;
use crate::info::{Creator, GetDescriptor, Inclusion, ObjectDescriptor, ReferenceRole};
use crate::info::{DiscriminatorKind, Shape, SubtypeMapping, TypeDescriptor, TypeRef, Typed};
use crate::naming::{self, NamingStrategy};
use crate::registry::{CodecRegistry, Deserializer, DeserializerFactory};
use crate::registry::{Serializer, SerializerFactory};
use crate::registry::{deserializer_as, serializer_as};

/// Raw paths of the builtin container types.
const SEQUENCES: [&str; 2] = ["alloc::vec::Vec", "alloc::collections::VecDeque"];
const MAPS: [&str; 2] = ["alloc::collections::BTreeMap", "std::collections::HashMap"];
const OPTIONS: [&str; 1] = ["core::option::Option"];
const POINTERS: [&str; 2] = ["alloc::boxed::Box", "alloc::sync::Arc"];

// -----------------------------------------------------------------------------
// RegistryBuilder

/// Collects descriptors, codecs and settings, then validates them into a
/// [`CodecRegistry`].
///
/// # Example
///
/// ```
/// use weft_codec::info::{GetDescriptor, ObjectDescriptor, PropertyDescriptor, TypeDescriptor};
/// use weft_codec::naming::names;
/// use weft_codec::registry::RegistryBuilder;
///
/// struct Point { x_pos: i32 }
/// weft_codec::impl_typed!(Point);
///
/// impl GetDescriptor for Point {
///     fn get_descriptor() -> TypeDescriptor {
///         ObjectDescriptor::new(|v| Ok(Point { x_pos: v.take("xPos")? }))
///             .property(PropertyDescriptor::field("xPos", |p: &Point| &p.x_pos))
///             .into()
///     }
/// }
///
/// let mut builder = RegistryBuilder::new();
/// builder.register::<Point>().default_naming(names::SNAKE_CASE);
/// let registry = builder.build().unwrap();
///
/// let point = <Point as weft_codec::info::Typed>::type_ref();
/// let descriptor = registry.object_descriptor(&point).unwrap();
/// assert_eq!(descriptor.properties()[0].wire_name(), "x_pos");
/// ```
pub struct RegistryBuilder {
    descriptors: HashMap<TypeRef, TypeDescriptor>,
    serializers: HashMap<TypeRef, Arc<dyn Serializer>>,
    deserializers: HashMap<TypeRef, Arc<dyn Deserializer>>,
    raw_serializers: HashMap<&'static str, Arc<dyn SerializerFactory>>,
    raw_deserializers: HashMap<&'static str, Arc<dyn DeserializerFactory>>,
    naming: HashMap<String, Arc<dyn NamingStrategy>>,
    default_naming: String,
    default_inclusion: Inclusion,
    ignored_types: HashSet<TypeRef>,
    builtins: bool,
}

impl Default for RegistryBuilder {
    /// See [`RegistryBuilder::new`].
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// A builder without builtin codecs or naming strategies.
    pub fn empty() -> Self {
        Self {
            descriptors: HashMap::default(),
            serializers: HashMap::default(),
            deserializers: HashMap::default(),
            raw_serializers: HashMap::default(),
            raw_deserializers: HashMap::default(),
            naming: HashMap::default(),
            default_naming: naming::names::IDENTITY.to_owned(),
            default_inclusion: Inclusion::Always,
            ignored_types: HashSet::default(),
            builtins: false,
        }
    }

    /// A builder with the builtin codecs and naming strategies.
    ///
    /// - scalars: `bool`, integers, floats, `char`, `String`, [`Bytes`](crate::Bytes)
    /// - sequences: `Vec`, `VecDeque`
    /// - string keyed maps: `BTreeMap`, `HashMap`
    /// - `Option`, `Box`, `Arc`
    pub fn new() -> Self {
        let mut builder = Self::empty();
        builder.builtins = true;
        for path in SEQUENCES {
            builder.register_raw(path, SequenceFactory);
        }
        for path in MAPS {
            builder.register_raw(path, MapFactory);
        }
        for path in OPTIONS {
            builder.register_raw(path, OptionFactory);
        }
        for path in POINTERS {
            builder.register_raw(path, PointerFactory);
        }
        for (name, strategy) in naming::builtins() {
            builder.naming.insert(name.to_owned(), strategy);
        }
        builder
    }

    /// Registers `T` and its dependencies, unless `T` is already registered.
    pub fn register<T: GetDescriptor>(&mut self) -> &mut Self {
        let ty = T::type_ref();
        if !self.descriptors.contains_key(&ty) {
            self.descriptors.insert(ty, T::get_descriptor());
            T::register_dependencies(self);
        }
        self
    }

    /// Inserts or overwrites a descriptor. Dependencies are not registered.
    pub fn register_descriptor(&mut self, descriptor: impl Into<TypeDescriptor>) -> &mut Self {
        let descriptor = descriptor.into();
        let ty = descriptor.ty().clone();
        if self.descriptors.insert(ty.clone(), descriptor).is_some() {
            log::debug!("descriptor of `{ty}` overwritten");
        }
        self
    }

    /// Whether a descriptor for `T` is present.
    pub fn contains<T: Typed>(&self) -> bool {
        self.descriptors.contains_key(&T::type_ref())
    }

    /// A serializer for exactly `ty`, taking precedence over everything else.
    pub fn register_serializer(
        &mut self,
        ty: TypeRef,
        serializer: Arc<dyn Serializer>,
    ) -> &mut Self {
        self.serializers.insert(ty, serializer);
        self
    }

    /// A deserializer for exactly `ty`, taking precedence over everything else.
    pub fn register_deserializer(
        &mut self,
        ty: TypeRef,
        deserializer: Arc<dyn Deserializer>,
    ) -> &mut Self {
        self.deserializers.insert(ty, deserializer);
        self
    }

    /// Writes every `T` as an `S` made by `convert`.
    pub fn serialize_as<T: Typed, S: Typed>(&mut self, convert: fn(&T) -> S) -> &mut Self {
        self.register_serializer(T::type_ref(), serializer_as(convert))
    }

    /// Reads every `T` as an `S` and converts it with `convert`.
    pub fn deserialize_as<T: Typed, S: Typed>(&mut self, convert: fn(S) -> T) -> &mut Self {
        self.register_deserializer(T::type_ref(), deserializer_as(convert))
    }

    /// Registers a serializer and a deserializer for exactly `ty`.
    pub fn register_codec<C: Serializer + Deserializer>(
        &mut self,
        ty: TypeRef,
        codec: C,
    ) -> &mut Self {
        let codec = Arc::new(codec);
        let serializer: Arc<dyn Serializer> = codec.clone();
        let deserializer: Arc<dyn Deserializer> = codec;
        self.register_serializer(ty.clone(), serializer)
            .register_deserializer(ty, deserializer)
    }

    /// A codec factory for every parameterization of the raw type at `path`.
    pub fn register_raw<F>(&mut self, path: &'static str, factory: F) -> &mut Self
    where
        F: SerializerFactory + DeserializerFactory,
    {
        let factory = Arc::new(factory);
        let serializer: Arc<dyn SerializerFactory> = factory.clone();
        let deserializer: Arc<dyn DeserializerFactory> = factory;
        self.raw_serializers.insert(path, serializer);
        self.raw_deserializers.insert(path, deserializer);
        self
    }

    /// Encodes and decodes `T` through its `serde` implementations.
    pub fn register_serde<T>(&mut self) -> &mut Self
    where
        T: Typed + serde_core::Serialize + serde_core::de::DeserializeOwned,
    {
        self.register_codec(T::type_ref(), SerdeCodec::of::<T>())
    }

    /// Adds or replaces a named naming strategy.
    pub fn naming_strategy(
        &mut self,
        name: impl Into<String>,
        strategy: impl NamingStrategy,
    ) -> &mut Self {
        self.naming.insert(name.into(), Arc::new(strategy));
        self
    }

    /// The strategy of types that do not name one. `IDENTITY` by default.
    pub fn default_naming(&mut self, name: impl Into<String>) -> &mut Self {
        self.default_naming = name.into();
        self
    }

    /// Excludes every property of type `T`, in all registered types, in both
    /// directions.
    pub fn ignore_type<T: Typed>(&mut self) -> &mut Self {
        self.ignored_types.insert(T::type_ref());
        self
    }

    /// The inclusion of properties whose type and declaration do not set one.
    pub fn default_inclusion(&mut self, inclusion: Inclusion) -> &mut Self {
        self.default_inclusion = inclusion;
        self
    }

    /// Registers every type submitted with [`auto_register!`](crate::auto_register).
    ///
    /// Returns `true` if automatic registration is supported on this platform
    /// and enabled by the `auto_register` feature.
    #[cfg_attr(not(feature = "auto_register"), inline(always))]
    pub fn auto_register(&mut self) -> bool {
        #[cfg(feature = "auto_register")]
        {
            super::auto::register_all(self)
        }
        #[cfg(not(feature = "auto_register"))]
        {
            false
        }
    }

    /// Validates the configuration and produces the registry.
    ///
    /// Fails with `InvalidConfiguration` on:
    /// - an unknown naming strategy;
    /// - duplicate wire names or aliases within one type;
    /// - more than one catch-all property, or one that is not a string keyed map;
    /// - an unwrapped property without object descriptor;
    /// - duplicate discriminator values;
    /// - a discriminator property named like a property of a subtype.
    pub fn build(mut self) -> Result<CodecRegistry, CodecError> {
        let mut objects: HashMap<TypeRef, ObjectDescriptor> = HashMap::default();
        let mut subtypes: HashMap<TypeRef, Arc<SubtypeMapping>> = HashMap::default();

        for (ty, descriptor) in std::mem::take(&mut self.descriptors) {
            match descriptor {
                TypeDescriptor::Object(mut object) => {
                    self.resolve_object(&mut object)?;
                    objects.insert(ty, object);
                }
                TypeDescriptor::Polymorphic(mapping) => {
                    mapping.validate()?;
                    subtypes.insert(ty, Arc::new(mapping));
                }
            }
        }
        let mut claimed: HashMap<TypeRef, HashSet<String>> = HashMap::default();
        for (ty, object) in &objects {
            claimed.insert(ty.clone(), validate_object(object, &objects)?);
        }
        for mapping in subtypes.values() {
            validate_discriminator(mapping, &claimed)?;
        }
        log::debug!(
            "codec registry built with {} object and {} polymorphic types",
            objects.len(),
            subtypes.len()
        );

        Ok(CodecRegistry {
            serializers: self.serializers,
            deserializers: self.deserializers,
            raw_serializers: self.raw_serializers,
            raw_deserializers: self.raw_deserializers,
            objects: objects
                .into_iter()
                .map(|(ty, object)| (ty, Arc::new(object)))
                .collect(),
            subtypes,
            scalars: if self.builtins {
                builtin_scalars()
            } else {
                Default::default()
            },
            naming: self.naming,
            serializer_cache: RwLock::new(HashMap::default()),
            deserializer_cache: RwLock::new(HashMap::default()),
        })
    }

    /// Fixes wire names and inclusions of `object`.
    fn resolve_object(&self, object: &mut ObjectDescriptor) -> Result<(), CodecError> {
        let ty = object.ty().clone();
        let strategy_name = object
            .naming_strategy()
            .unwrap_or(&self.default_naming)
            .to_owned();
        let Some(strategy) = self.naming.get(&strategy_name) else {
            let msg = format!("unknown naming strategy `{strategy_name}`");
            return Err(CodecError::config(msg).in_type(&ty));
        };
        let inclusion = object.default_inclusion().unwrap_or(self.default_inclusion);

        for property in object.properties_mut() {
            if !property.is_catch_all() && self.ignored_types.contains(property.ty()) {
                log::debug!("property `{}` of `{ty}` ignored by type", property.name());
                property.set_ignored();
            }
            let wire_name = match property.explicit_wire_name() {
                Some(name) => name.to_owned(),
                None => strategy.translate(property.name()),
            };
            property.set_wire_name(wire_name);
            if property.declared_inclusion().is_none() {
                property.set_inclusion(inclusion);
            }
        }
        Ok(())
    }
}

/// Checks `object` and returns the wire names and aliases it claims.
fn validate_object(
    object: &ObjectDescriptor,
    objects: &HashMap<TypeRef, ObjectDescriptor>,
) -> Result<HashSet<String>, CodecError> {
    let ty = object.ty();
    let fail = |msg: String| Err(CodecError::config(msg).in_type(ty));

    let mut names: HashSet<String> = HashSet::default();
    let mut claim = |name: String| -> Result<(), CodecError> {
        if names.insert(name.clone()) {
            Ok(())
        } else {
            Err(CodecError::config(format!("duplicate wire name `{name}`")).in_type(ty))
        }
    };

    let mut catch_all = 0;
    for property in object.properties() {
        if property.is_catch_all() {
            catch_all += 1;
            if !matches!(property.ty().shape(), Shape::Map(_)) {
                let name = property.name();
                return fail(format!("catch-all property `{name}` is not a string keyed map"));
            }
            continue;
        }
        if property.role() == ReferenceRole::Back {
            if !matches!(property.ty().shape(), Shape::BackReference(_)) {
                return fail(format!("back property `{}` is not a `BackRef`", property.name()));
            }
            continue;
        }
        if let Some(unwrapped) = property.unwrapped_spec() {
            let Some(nested) = objects.get(property.ty()) else {
                return fail(format!(
                    "unwrapped property `{}` needs an object descriptor for `{}`",
                    property.name(),
                    property.ty()
                ));
            };
            if !matches!(nested.creator(), Creator::Properties(_)) {
                let name = property.name();
                return fail(format!("unwrapped property `{name}` has a delegating type"));
            }
            for inner in nested.properties() {
                if inner.unwrapped_spec().is_some() || inner.is_catch_all() {
                    return fail(format!(
                        "unwrapped property `{}` nests another flattened property",
                        property.name()
                    ));
                }
                if inner.role() == ReferenceRole::Back {
                    continue;
                }
                claim(format!("{}{}{}", unwrapped.prefix, inner.wire_name(), unwrapped.suffix))?;
                for alias in inner.aliases() {
                    claim(format!("{}{}{}", unwrapped.prefix, alias, unwrapped.suffix))?;
                }
            }
            continue;
        }
        claim(property.wire_name().to_owned())?;
        for alias in property.aliases() {
            claim(alias.clone())?;
        }
    }
    if catch_all > 1 {
        return fail("more than one catch-all property".to_owned());
    }
    Ok(names)
}

fn validate_discriminator(
    mapping: &SubtypeMapping,
    claimed: &HashMap<TypeRef, HashSet<String>>,
) -> Result<(), CodecError> {
    if mapping.kind() != DiscriminatorKind::Property {
        return Ok(());
    }
    let property = mapping.property();
    for subtype in mapping.subtypes() {
        if claimed.get(subtype.ty()).is_some_and(|names| names.contains(property)) {
            return Err(CodecError::config(format!(
                "discriminator property `{property}` is also a property of `{}`",
                subtype.ty()
            ))
            .in_type(mapping.ty()));
        }
    }
    Ok(())
}


// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::RegistryBuilder;
    use crate::error::{CodecError, ErrorKind};
    use crate::info::{
        DiscriminatorKind, GetDescriptor, Inclusion, ObjectDescriptor, PropertyDescriptor,
        SubtypeMapping, TypeDescriptor, Typed,
    };
    use crate::mapper::Mapper;
    use crate::naming::names;
    use crate::stream::Encoder;
    use crate::testing::{encode, roundtrip, tokens};

    #[derive(Debug, PartialEq)]
    struct Pair {
        first_value: i32,
        second_value: Option<i32>,
    }

    crate::impl_typed!(Pair);

    fn pair(extend: fn(ObjectDescriptor) -> ObjectDescriptor) -> TypeDescriptor {
        let descriptor = ObjectDescriptor::new(|v| {
            Ok(Pair {
                first_value: v.take("firstValue")?,
                second_value: v.take("secondValue")?,
            })
        });
        extend(descriptor).into()
    }

    fn first() -> PropertyDescriptor {
        PropertyDescriptor::field("firstValue", |p: &Pair| &p.first_value)
    }

    fn second() -> PropertyDescriptor {
        PropertyDescriptor::field("secondValue", |p: &Pair| &p.second_value)
    }

    fn build_error(descriptor: TypeDescriptor) -> CodecError {
        let mut builder = RegistryBuilder::new();
        builder.register_descriptor(descriptor);
        builder.build().unwrap_err()
    }

    #[test]
    fn builder_defaults_apply_to_undeclared_settings() {
        let mut builder = RegistryBuilder::new();
        builder
            .register_descriptor(pair(|d| d.property(first()).property(second())))
            .default_naming(names::KEBAB_CASE)
            .default_inclusion(Inclusion::NonNull);
        let mapper = Mapper::new(builder.build().unwrap());
        let value = Pair {
            first_value: 1,
            second_value: None,
        };
        assert_eq!(encode(&mapper, &value).unwrap(), r#"{"first-value":1}"#);
    }

    #[test]
    fn type_settings_override_builder_defaults() {
        let mut builder = RegistryBuilder::new();
        builder
            .register_descriptor(pair(|d| {
                d.naming(names::UPPER_CAMEL_CASE)
                    .inclusion(Inclusion::Always)
                    .property(first().rename("one"))
                    .property(second())
            }))
            .default_naming(names::KEBAB_CASE)
            .default_inclusion(Inclusion::NonNull);
        let mapper = Mapper::new(builder.build().unwrap());
        let value = Pair {
            first_value: 1,
            second_value: None,
        };
        assert_eq!(encode(&mapper, &value).unwrap(), r#"{"one":1,"SecondValue":null}"#);
    }

    #[test]
    fn custom_naming_strategy() {
        let mut builder = RegistryBuilder::new();
        builder
            .naming_strategy("shout", |name: &str| name.to_uppercase())
            .register_descriptor(pair(|d| d.naming("shout").property(first()).property(second())));
        let mapper = Mapper::new(builder.build().unwrap());
        let value = Pair {
            first_value: 1,
            second_value: Some(2),
        };
        assert_eq!(encode(&mapper, &value).unwrap(), r#"{"FIRSTVALUE":1,"SECONDVALUE":2}"#);
    }

    #[derive(Debug, PartialEq)]
    struct Stamp(u64);

    crate::impl_typed!(Stamp);

    #[derive(Debug, PartialEq, Default)]
    struct Token(u64);

    crate::impl_typed!(Token);

    #[derive(Debug, PartialEq)]
    struct Entry {
        at: Stamp,
        previous: Option<Stamp>,
        token: Token,
    }

    crate::impl_typed!(Entry);

    impl GetDescriptor for Entry {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| {
                Ok(Entry {
                    at: v.take("at")?,
                    previous: v.take("previous")?,
                    token: v.take_or_default("token")?,
                })
            })
            .property(PropertyDescriptor::field("at", |e: &Entry| &e.at))
            .property(PropertyDescriptor::field("previous", |e: &Entry| &e.previous))
            .property(PropertyDescriptor::field("token", |e: &Entry| &e.token))
            .into()
        }
    }

    #[test]
    fn types_written_as_another_type_and_ignored_types() {
        let mut builder = RegistryBuilder::new();
        builder
            .register::<Entry>()
            .serialize_as(|s: &Stamp| s.0)
            .deserialize_as(Stamp)
            .ignore_type::<Token>();
        let mapper = Mapper::new(builder.build().unwrap());

        let entry = Entry {
            at: Stamp(20),
            previous: Some(Stamp(10)),
            token: Token(7),
        };
        assert_eq!(encode(&mapper, &entry).unwrap(), r#"{"at":20,"previous":10}"#);

        let decoded = roundtrip(&mapper, &entry);
        assert_eq!(decoded.previous, Some(Stamp(10)));
        assert_eq!(decoded.token, Token(0));

        // ignored on decode too
        let input = tokens(|e| {
            e.begin_object()?;
            e.encode_key("at")?;
            e.encode_u64(1)?;
            e.encode_key("token")?;
            e.encode_u64(99)?;
            e.end_object()
        });
        let decoded: Entry = mapper.decode(input.decoder()).unwrap();
        assert_eq!(decoded, Entry { at: Stamp(1), previous: None, token: Token(0) });
    }

    #[test]
    fn rejects_unknown_naming_strategy() {
        let err = build_error(pair(|d| d.naming("nope").property(first())));
        assert!(matches!(err.kind(), ErrorKind::InvalidConfiguration(_)));
    }

    #[test]
    fn rejects_duplicate_wire_names() {
        let err = build_error(pair(|d| {
            d.property(first())
                .property(second().rename("firstValue"))
        }));
        assert!(matches!(err.kind(), ErrorKind::InvalidConfiguration(_)));

        let err = build_error(pair(|d| d.property(first()).property(second().alias("firstValue"))));
        assert!(matches!(err.kind(), ErrorKind::InvalidConfiguration(_)));
    }

    #[derive(Debug)]
    struct Loose {
        rest: BTreeMap<String, i32>,
        more: BTreeMap<String, i32>,
    }

    crate::impl_typed!(Loose);

    #[test]
    fn rejects_invalid_catch_all() {
        let two = ObjectDescriptor::new(|v| {
            Ok(Loose {
                rest: v.take("rest")?,
                more: v.take("more")?,
            })
        })
        .property(PropertyDescriptor::field("rest", |l: &Loose| &l.rest).catch_all())
        .property(PropertyDescriptor::field("more", |l: &Loose| &l.more).catch_all());
        assert!(matches!(build_error(two.into()).kind(), ErrorKind::InvalidConfiguration(_)));

        let not_a_map = pair(|d| d.property(first().catch_all()));
        assert!(matches!(build_error(not_a_map).kind(), ErrorKind::InvalidConfiguration(_)));
    }

    #[test]
    fn rejects_unwrapped_without_object() {
        let err = build_error(pair(|d| d.property(first().unwrapped("p_", ""))));
        assert!(matches!(err.kind(), ErrorKind::InvalidConfiguration(_)));
    }

    #[derive(Debug)]
    struct Left;

    #[derive(Debug)]
    struct Right;

    #[derive(Debug)]
    enum Either {
        Left(Left),
        Right(Right),
    }

    crate::impl_typed!(Left);
    crate::impl_typed!(Right);
    crate::impl_typed!(Either);

    #[test]
    fn rejects_duplicate_discriminators() {
        let mapping = SubtypeMapping::new::<Either>(DiscriminatorKind::Property)
            .named(
                "same",
                |e: &Either| match e {
                    Either::Left(l) => Some(l),
                    _ => None,
                },
                Either::Left,
            )
            .named(
                "same",
                |e: &Either| match e {
                    Either::Right(r) => Some(r),
                    _ => None,
                },
                Either::Right,
            );
        let err = build_error(mapping.build().into());
        assert!(matches!(err.kind(), ErrorKind::InvalidConfiguration(_)));
    }

    #[derive(Debug)]
    struct Tabby {
        kind: u8,
    }

    #[derive(Debug)]
    enum Pet {
        Tabby(Tabby),
    }

    crate::impl_typed!(Tabby);
    crate::impl_typed!(Pet);

    #[test]
    fn rejects_discriminator_named_like_a_subtype_property() {
        let tabby = ObjectDescriptor::new(|v| Ok(Tabby { kind: v.take("kind")? }))
            .property(PropertyDescriptor::field("kind", |t: &Tabby| &t.kind));
        let pets = |property: &str| {
            SubtypeMapping::new::<Pet>(DiscriminatorKind::Property)
                .discriminator_property(property)
                .named(
                    "tabby",
                    |p: &Pet| match p {
                        Pet::Tabby(t) => Some(t),
                    },
                    Pet::Tabby,
                )
                .build()
        };

        let mut builder = RegistryBuilder::new();
        builder.register_descriptor(tabby.clone()).register_descriptor(pets("kind"));
        let err = builder.build().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidConfiguration(_)));

        let mut builder = RegistryBuilder::new();
        builder.register_descriptor(tabby).register_descriptor(pets("type"));
        assert!(builder.build().is_ok());
    }

    #[derive(Debug, PartialEq)]
    struct Discovered {
        id: u32,
    }

    crate::impl_typed!(Discovered);

    impl GetDescriptor for Discovered {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| Ok(Discovered { id: v.take("id")? }))
                .property(PropertyDescriptor::field("id", |d: &Discovered| &d.id))
                .into()
        }
    }

    crate::auto_register!(Discovered);

    #[test]
    fn auto_register_collects_submitted_types() {
        let mut builder = RegistryBuilder::new();
        if builder.auto_register() {
            assert!(builder.contains::<Discovered>());
            let registry = builder.build().unwrap();
            assert!(registry.has_codec(&Discovered::type_ref()));
        } else {
            assert!(!builder.contains::<Discovered>());
        }
    }
}
