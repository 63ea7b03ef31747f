//! Codecs derived from an [`ObjectDescriptor`].
//!
//! Property codecs are looked up on each call rather than when the codec
//! is created, so recursive types resolve without cycles in the cache.

use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;

use weft_utils::hash::{HashMap, HashSet};

use crate::error::{CodecError, ErrorKind};
use crate::info::{Creator, Inclusion, ObjectDescriptor, PropertyDescriptor, PropertyValues};
use crate::info::{ReferenceRole, Shape, TypeRef};
use crate::reference::BackLink;
use crate::registry::{CodecRegistry, DecodeContext, Deserializer, EncodeContext, Serializer};
use crate::stream::{Decoder, Encoder, TokenBuffer};

fn mismatch(ty: &TypeRef) -> CodecError {
    CodecError::type_mismatch(ty.path(), "another type").in_type(ty)
}

fn affixed<'a>(prefix: &str, name: &'a str, suffix: &str) -> Cow<'a, str> {
    if prefix.is_empty() && suffix.is_empty() {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{prefix}{name}{suffix}"))
    }
}

// -----------------------------------------------------------------------------
// Inclusion

/// Whether `value` is an empty option.
fn is_null(value: &dyn Any, ty: &TypeRef) -> bool {
    match ty.shape() {
        Shape::Optional(ops) => matches!((ops.get)(value), Some(None)),
        _ => false,
    }
}

/// Whether `value` does not lead to a value through options and pointers.
fn is_absent(value: &dyn Any, ty: &TypeRef) -> bool {
    let inner = match ty.shape() {
        Shape::Optional(ops) => match (ops.get)(value) {
            Some(Some(inner)) => inner,
            Some(None) => return true,
            None => return false,
        },
        Shape::Pointer(ops) => match (ops.get)(value) {
            Some(inner) => inner,
            None => return false,
        },
        _ => return false,
    };
    ty.arg(0).is_some_and(|inner_ty| is_absent(inner, inner_ty))
}

fn is_included(
    inclusion: Inclusion,
    value: &dyn Any,
    ty: &TypeRef,
    serializer: &dyn Serializer,
) -> bool {
    match inclusion {
        Inclusion::Always => true,
        Inclusion::NonNull => !is_null(value, ty),
        Inclusion::NonAbsent => !is_absent(value, ty),
        Inclusion::NonEmpty => !is_absent(value, ty) && !serializer.is_empty(value),
        Inclusion::Never => false,
    }
}

// -----------------------------------------------------------------------------
// ObjectSerializer

/// Writes an object from its property descriptors.
///
/// Catch-all entries whose key belongs to a declared property are not
/// written, since reading them back would fill that property instead.
pub struct ObjectSerializer {
    descriptor: Arc<ObjectDescriptor>,
    order: Vec<usize>,
    declared: HashSet<String>,
}

impl ObjectSerializer {
    pub fn new(descriptor: Arc<ObjectDescriptor>, registry: &CodecRegistry) -> Self {
        let order = descriptor.encode_order();
        let declared = declared_keys(&descriptor, registry);
        Self {
            descriptor,
            order,
            declared,
        }
    }

    fn write_members(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
    ) -> Result<(), CodecError> {
        let layout = Layout {
            descriptor: &self.descriptor,
            order: &self.order,
            declared: &self.declared,
        };
        write_members(encoder, ctx, layout, value, "", "")
    }
}

/// Every wire key routed to a declared property on decode.
fn declared_keys(descriptor: &ObjectDescriptor, registry: &CodecRegistry) -> HashSet<String> {
    let mut keys = HashSet::default();
    for property in descriptor.properties() {
        if property.is_catch_all() {
            continue;
        }
        if let Some(unwrapped) = property.unwrapped_spec() {
            let Some(inner) = registry.object_descriptor(property.ty()) else {
                continue;
            };
            for inner_property in inner.properties() {
                let names = std::iter::once(inner_property.wire_name())
                    .chain(inner_property.aliases().iter().map(String::as_str));
                for name in names {
                    keys.insert(format!("{}{name}{}", unwrapped.prefix, unwrapped.suffix));
                }
            }
            continue;
        }
        keys.insert(property.wire_name().to_owned());
        keys.extend(property.aliases().iter().cloned());
    }
    keys
}

/// The properties written into one object.
#[derive(Clone, Copy)]
struct Layout<'a> {
    descriptor: &'a ObjectDescriptor,
    order: &'a [usize],
    declared: &'a HashSet<String>,
}

fn write_members(
    encoder: &mut dyn Encoder,
    ctx: &mut EncodeContext<'_>,
    layout: Layout<'_>,
    owner: &dyn Any,
    prefix: &str,
    suffix: &str,
) -> Result<(), CodecError> {
    let Layout {
        descriptor,
        order,
        declared,
    } = layout;
    let ty = descriptor.ty();
    for &index in order {
        let property = &descriptor.properties()[index];
        if !property.access().encodes()
            || property.effective_inclusion() == Inclusion::Never
            || !property.in_view(ctx.view())
        {
            continue;
        }
        let Some(member) = property.get(owner) else {
            return Err(mismatch(ty));
        };

        if property.role() == ReferenceRole::Back {
            ctx.references()
                .check_back(member, property.ty())
                .map_err(|err| err.at_property(property.wire_name()).in_type(ty))?;
            continue;
        }

        if property.is_catch_all() {
            write_catch_all(encoder, ctx, property, member, declared)
                .map_err(|err| err.in_type(ty))?;
            continue;
        }

        if let Some(unwrapped) = property.unwrapped_spec() {
            let Some(nested) = ctx.registry().object_descriptor(property.ty()) else {
                return Err(CodecError::no_codec(property.ty()));
            };
            let prefix = format!("{prefix}{}", unwrapped.prefix);
            let suffix = format!("{}{suffix}", unwrapped.suffix);
            let order = nested.encode_order();
            let layout = Layout {
                descriptor: nested,
                order: &order,
                declared,
            };
            write_members(encoder, ctx, layout, member, &prefix, &suffix)
                .map_err(|err| err.in_type(ty))?;
            continue;
        }

        let serializer = ctx.registry().find_property_serializer(property)?;
        if !is_included(
            property.effective_inclusion(),
            member,
            property.ty(),
            serializer.as_ref(),
        ) {
            continue;
        }
        if property.role() == ReferenceRole::Managed {
            ctx.references().enter_managed(owner);
        }

        let key = affixed(prefix, property.wire_name(), suffix);
        encoder.encode_key(&key)?;
        write_property(encoder, ctx, serializer.as_ref(), member, property)
            .map_err(|err| err.at_property(key.as_ref()).in_type(ty))?;
    }
    Ok(())
}

fn write_catch_all(
    encoder: &mut dyn Encoder,
    ctx: &mut EncodeContext<'_>,
    property: &PropertyDescriptor,
    map: &dyn Any,
    declared: &HashSet<String>,
) -> Result<(), CodecError> {
    let map_ty = property.ty();
    let (Shape::Map(ops), Some(value_ty)) = (map_ty.shape(), map_ty.arg(1)) else {
        return Err(mismatch(map_ty));
    };
    let entries = (ops.iter)(map).ok_or_else(|| mismatch(map_ty))?;
    for (key, item) in entries {
        if declared.contains(key) {
            log::debug!("catch-all key `{key}` shadows a declared property, not written");
            continue;
        }
        encoder.encode_key(key)?;
        ctx.serialize(encoder, item, value_ty)
            .map_err(|err| err.at_property(key))?;
    }
    Ok(())
}

fn write_property(
    encoder: &mut dyn Encoder,
    ctx: &mut EncodeContext<'_>,
    serializer: &dyn Serializer,
    value: &dyn Any,
    property: &PropertyDescriptor,
) -> Result<(), CodecError> {
    match property.wrapper() {
        Some(wrapper) => {
            encoder.begin_object()?;
            encoder.encode_key(wrapper)?;
            serializer
                .serialize(encoder, ctx, value, property.ty())
                .map_err(|err| err.at_property(wrapper))?;
            encoder.end_object()
        }
        None => serializer.serialize(encoder, ctx, value, property.ty()),
    }
}

impl Serializer for ObjectSerializer {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        match self.descriptor.creator() {
            Creator::Delegating { ty: delegate, get, .. } => {
                let inner = get(value).ok_or_else(|| mismatch(ty))?;
                ctx.serialize(encoder, inner, delegate)
                    .map_err(|err| err.in_type(ty))
            }
            Creator::Properties(_) => {
                encoder.begin_object()?;
                self.write_members(encoder, ctx, value)?;
                encoder.end_object()
            }
        }
    }

    fn serialize_properties(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        match self.descriptor.creator() {
            Creator::Delegating { .. } => Err(CodecError::config(
                "a type written as a single value cannot share an object",
            )
            .in_type(ty)),
            Creator::Properties(_) => self.write_members(encoder, ctx, value),
        }
    }
}

// -----------------------------------------------------------------------------
// ObjectDeserializer

/// Where the value of a wire key goes.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Property(usize),
    /// Property `.1` of the object flattened into property `.0`.
    Nested(usize, usize),
    /// A known key that is not decoded.
    Ignore,
}

/// Values read for one object, before its creator runs.
struct Members {
    values: Vec<Option<Box<dyn Any>>>,
    nested: Vec<Vec<Option<Box<dyn Any>>>>,
    extra: Vec<(String, Box<dyn Any>)>,
    links: Vec<BackLink>,
}

/// Reads an object from its property descriptors.
///
/// Keys are matched in any order, by wire name or alias.
pub struct ObjectDeserializer {
    descriptor: Arc<ObjectDescriptor>,
    keys: HashMap<String, Slot>,
    /// Descriptors of unwrapped properties, by property index.
    nested: Vec<Option<Arc<ObjectDescriptor>>>,
    catch_all: Option<usize>,
}

impl ObjectDeserializer {
    pub fn new(
        descriptor: Arc<ObjectDescriptor>,
        registry: &CodecRegistry,
    ) -> Result<Self, CodecError> {
        let ty = descriptor.ty();
        let mut keys: HashMap<String, Slot> = HashMap::default();
        let mut nested = Vec::with_capacity(descriptor.properties().len());
        let mut catch_all = None;

        for (index, property) in descriptor.properties().iter().enumerate() {
            let mut flattened = None;
            if property.is_catch_all() {
                catch_all = Some(index);
            } else if property.role() == ReferenceRole::Back {
                keys.insert(property.wire_name().to_owned(), Slot::Ignore);
            } else if let Some(unwrapped) = property.unwrapped_spec() {
                let Some(inner) = registry.object_descriptor(property.ty()) else {
                    return Err(CodecError::no_codec(property.ty()).in_type(ty));
                };
                for (inner_index, inner_property) in inner.properties().iter().enumerate() {
                    let slot = if inner_property.role() == ReferenceRole::Back
                        || !inner_property.access().decodes()
                    {
                        Slot::Ignore
                    } else {
                        Slot::Nested(index, inner_index)
                    };
                    let names = std::iter::once(inner_property.wire_name())
                        .chain(inner_property.aliases().iter().map(String::as_str));
                    for name in names {
                        let key = format!("{}{name}{}", unwrapped.prefix, unwrapped.suffix);
                        keys.insert(key, slot);
                    }
                }
                flattened = Some(Arc::clone(inner));
            } else {
                let slot = if property.access().decodes() {
                    Slot::Property(index)
                } else {
                    Slot::Ignore
                };
                keys.insert(property.wire_name().to_owned(), slot);
                for alias in property.aliases() {
                    keys.insert(alias.clone(), slot);
                }
            }
            nested.push(flattened);
        }

        Ok(Self {
            descriptor,
            keys,
            nested,
            catch_all,
        })
    }

    fn read_members(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        buffered: Vec<(String, TokenBuffer)>,
    ) -> Result<Box<dyn Any>, CodecError> {
        let ty = self.descriptor.ty();
        let mut members = Members {
            values: self.descriptor.properties().iter().map(|_| None).collect(),
            nested: self
                .nested
                .iter()
                .map(|nested| match nested {
                    Some(nested) => nested.properties().iter().map(|_| None).collect(),
                    None => Vec::new(),
                })
                .collect(),
            extra: Vec::new(),
            links: Vec::new(),
        };

        ctx.references().enter_object();
        for (key, buffer) in buffered {
            self.read_member(&mut buffer.decoder(), ctx, key, &mut members)?;
        }
        while let Some(key) = decoder.next_key()? {
            self.read_member(decoder, ctx, key, &mut members)?;
        }

        let links = std::mem::take(&mut members.links);
        let value = self.assemble(ctx, members);
        ctx.references().leave_object(ty.id(), links);
        value
    }

    fn read_member(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        key: String,
        members: &mut Members,
    ) -> Result<(), CodecError> {
        let ty = self.descriptor.ty();
        match self.keys.get(key.as_str()).copied() {
            Some(Slot::Property(index)) => {
                let property = &self.descriptor.properties()[index];
                if !property.in_view(ctx.view()) {
                    return decoder.skip_value();
                }
                let value = read_property(decoder, ctx, property, &mut members.links)
                    .map_err(|err| err.at_property(key).in_type(ty))?;
                members.values[index] = Some(value);
            }
            Some(Slot::Nested(index, inner_index)) => {
                let Some(nested) = &self.nested[index] else {
                    return decoder.skip_value();
                };
                let property = &nested.properties()[inner_index];
                if !property.in_view(ctx.view()) {
                    return decoder.skip_value();
                }
                let value = read_property(decoder, ctx, property, &mut members.links)
                    .map_err(|err| err.at_property(key).in_type(ty))?;
                members.nested[index][inner_index] = Some(value);
            }
            Some(Slot::Ignore) => decoder.skip_value()?,
            None => match self.catch_all {
                Some(index) => {
                    let property = &self.descriptor.properties()[index];
                    let value_ty = property
                        .ty()
                        .arg(1)
                        .ok_or_else(|| CodecError::config("catch-all map without value type"))?;
                    let value = ctx
                        .deserialize(decoder, value_ty)
                        .map_err(|err| err.at_property(key.as_str()).in_type(ty))?;
                    members.extra.push((key, value));
                }
                None if ctx.fail_on_unknown() => {
                    return Err(CodecError::new(ErrorKind::UnknownProperty(key)).in_type(ty));
                }
                None => {
                    log::trace!("skipping unknown key `{key}` of `{ty}`");
                    decoder.skip_value()?;
                }
            },
        }
        Ok(())
    }

    fn assemble(
        &self,
        ctx: &mut DecodeContext<'_>,
        members: Members,
    ) -> Result<Box<dyn Any>, CodecError> {
        let Members {
            values,
            nested,
            extra,
            ..
        } = members;
        let mut extra = Some(extra);

        let mut complete = Vec::with_capacity(values.len());
        for ((index, value), nested_values) in values.into_iter().enumerate().zip(nested) {
            let property = &self.descriptor.properties()[index];
            let value = if property.is_catch_all() {
                let Shape::Map(ops) = property.ty().shape() else {
                    return Err(mismatch(property.ty()));
                };
                let entries = extra.take().unwrap_or_default();
                Some((ops.collect)(entries).ok_or_else(|| mismatch(property.ty()))?)
            } else if let Some(descriptor) = &self.nested[index] {
                Some(create(ctx, descriptor, nested_values)?)
            } else {
                value
            };
            complete.push(value);
        }
        create(ctx, &self.descriptor, complete)
    }
}

/// Reads one property value, honoring its wrapper and managed role.
fn read_property(
    decoder: &mut dyn Decoder,
    ctx: &mut DecodeContext<'_>,
    property: &PropertyDescriptor,
    links: &mut Vec<BackLink>,
) -> Result<Box<dyn Any>, CodecError> {
    let deserializer = ctx.registry().find_property_deserializer(property)?;
    let managed = property.role() == ReferenceRole::Managed;
    if managed {
        ctx.references().open_slot();
    }

    let value = match property.wrapper() {
        Some(wrapper) => read_wrapped(decoder, ctx, deserializer.as_ref(), property.ty(), wrapper),
        None => deserializer.deserialize(decoder, ctx, property.ty()),
    };

    if managed {
        links.append(&mut ctx.references().close_slot());
    }
    value
}

fn read_wrapped(
    decoder: &mut dyn Decoder,
    ctx: &mut DecodeContext<'_>,
    deserializer: &dyn Deserializer,
    ty: &TypeRef,
    wrapper: &str,
) -> Result<Box<dyn Any>, CodecError> {
    decoder.begin_object()?;
    let mut value = None;
    while let Some(key) = decoder.next_key()? {
        if key == wrapper && value.is_none() {
            value = Some(
                deserializer
                    .deserialize(decoder, ctx, ty)
                    .map_err(|err| err.at_property(key))?,
            );
        } else {
            log::trace!("skipping key `{key}` next to wrapper `{wrapper}`");
            decoder.skip_value()?;
        }
    }
    match value {
        Some(value) => Ok(value),
        None => Err(CodecError::missing_property(wrapper).in_type(ty)),
    }
}

/// Completes absent values and runs the creator of `descriptor`.
fn create(
    ctx: &mut DecodeContext<'_>,
    descriptor: &ObjectDescriptor,
    values: Vec<Option<Box<dyn Any>>>,
) -> Result<Box<dyn Any>, CodecError> {
    let ty = descriptor.ty();
    let Creator::Properties(build) = descriptor.creator() else {
        return Err(CodecError::config("delegating type read from properties").in_type(ty));
    };

    let mut out = PropertyValues::new(ty.clone());
    for (property, value) in descriptor.properties().iter().zip(values) {
        let value = match value {
            Some(value) => Some(value),
            None if property.role() == ReferenceRole::Back => Some(
                ctx.references()
                    .create_back(property.ty())
                    .map_err(|err| err.at_property(property.wire_name()).in_type(ty))?,
            ),
            None if !property.access().decodes() => property.default_of(),
            None => match property.default_of() {
                Some(value) => Some(value),
                None => ctx
                    .registry()
                    .find_property_deserializer(property)?
                    .absent_value(property.ty()),
            },
        };
        if let Some(value) = value {
            out.insert(property.name(), value);
        }
    }
    build(&mut out).map_err(|err| err.in_type(ty))
}

impl Deserializer for ObjectDeserializer {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError> {
        match self.descriptor.creator() {
            Creator::Delegating {
                ty: delegate,
                create,
                ..
            } => {
                let value = ctx
                    .deserialize(decoder, delegate)
                    .map_err(|err| err.in_type(ty))?;
                create(value).map_err(|err| err.in_type(ty))
            }
            Creator::Properties(_) => {
                decoder.begin_object().map_err(|err| err.in_type(ty))?;
                self.read_members(decoder, ctx, Vec::new())
            }
        }
    }

    fn deserialize_properties(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
        buffered: Vec<(String, TokenBuffer)>,
    ) -> Result<Box<dyn Any>, CodecError> {
        match self.descriptor.creator() {
            Creator::Delegating { .. } => Err(CodecError::config(
                "a type read from a single value cannot share an object",
            )
            .in_type(ty)),
            Creator::Properties(_) => self.read_members(decoder, ctx, buffered),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::error::ErrorKind;
    use crate::info::{GetDescriptor, Inclusion, ObjectDescriptor, PropertyDescriptor};
    use crate::info::{TypeDescriptor, Typed};
    use crate::mapper::MapperConfig;
    use crate::naming::names;
    use crate::registry::RegistryBuilder;
    use crate::stream::Encoder;
    use crate::testing::{encode, mapper, mapper_with, roundtrip, tokens};

    #[derive(Debug, PartialEq, Default)]
    struct Profile {
        a: Option<i32>,
        b: Option<i32>,
        c: String,
        d: Vec<i32>,
        e: Option<Option<i32>>,
        f: i32,
    }

    crate::impl_typed!(Profile);

    impl GetDescriptor for Profile {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| {
                Ok(Profile {
                    a: v.take("a")?,
                    b: v.take("b")?,
                    c: v.take_or_default("c")?,
                    d: v.take_or_default("d")?,
                    e: v.take("e")?,
                    f: v.take_or_default("f")?,
                })
            })
            .property(
                PropertyDescriptor::field("a", |p: &Profile| &p.a)
                    .inclusion(Inclusion::NonNull),
            )
            .property(PropertyDescriptor::field("b", |p: &Profile| &p.b))
            .property(
                PropertyDescriptor::field("c", |p: &Profile| &p.c)
                    .inclusion(Inclusion::NonEmpty),
            )
            .property(
                PropertyDescriptor::field("d", |p: &Profile| &p.d)
                    .inclusion(Inclusion::NonEmpty),
            )
            .property(
                PropertyDescriptor::field("e", |p: &Profile| &p.e)
                    .inclusion(Inclusion::NonAbsent),
            )
            .property(
                PropertyDescriptor::field("f", |p: &Profile| &p.f)
                    .inclusion(Inclusion::Never),
            )
            .into()
        }
    }

    #[test]
    fn inclusion_policies() {
        let mapper = mapper(|b| {
            b.register::<Profile>();
        });
        let empty = Profile {
            e: Some(None),
            f: 5,
            ..Profile::default()
        };
        assert_eq!(encode(&mapper, &empty).unwrap(), r#"{"b":null}"#);

        let decoded = roundtrip(&mapper, &empty);
        assert_eq!(decoded.b, None);
        assert_eq!(decoded.e, None);
        assert_eq!(decoded.f, 0);

        let full = Profile {
            a: Some(1),
            b: Some(2),
            c: "x".into(),
            d: vec![3],
            e: Some(Some(4)),
            f: 5,
        };
        assert_eq!(
            encode(&mapper, &full).unwrap(),
            r#"{"a":1,"b":2,"c":"x","d":[3],"e":4}"#
        );
        assert_eq!(roundtrip(&mapper, &full), Profile { f: 0, ..full });
    }

    #[derive(Debug, PartialEq)]
    struct Account {
        user_name: String,
        email: String,
        login_count: u32,
    }

    crate::impl_typed!(Account);

    impl GetDescriptor for Account {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| {
                Ok(Account {
                    user_name: v.take("userName")?,
                    email: v.take("email")?,
                    login_count: v.take_or_default("loginCount")?,
                })
            })
            .naming(names::SNAKE_CASE)
            .property(PropertyDescriptor::field("userName", |a: &Account| &a.user_name))
            .property(
                PropertyDescriptor::field("email", |a: &Account| &a.email)
                    .rename("mail")
                    .alias("e-mail"),
            )
            .property(
                PropertyDescriptor::field("loginCount", |a: &Account| &a.login_count).order(0),
            )
            .into()
        }
    }

    #[test]
    fn naming_rename_order_and_alias() {
        let mapper = mapper(|b| {
            b.register::<Account>();
        });
        let account = Account {
            user_name: "ann".into(),
            email: "a@x".into(),
            login_count: 3,
        };
        assert_eq!(
            encode(&mapper, &account).unwrap(),
            r#"{"login_count":3,"user_name":"ann","mail":"a@x"}"#
        );

        let input = tokens(|e| {
            e.begin_object()?;
            e.encode_key("e-mail")?;
            e.encode_str("a@x")?;
            e.encode_key("user_name")?;
            e.encode_str("ann")?;
            e.encode_key("login_count")?;
            e.encode_u64(3)?;
            e.end_object()
        });
        let decoded: Account = mapper.decode(input.decoder()).unwrap();
        assert_eq!(decoded, account);
    }

    fn account_with_extra_key() -> crate::stream::TokenBuffer {
        tokens(|e| {
            e.begin_object()?;
            e.encode_key("user_name")?;
            e.encode_str("ann")?;
            e.encode_key("extra")?;
            e.begin_object()?;
            e.encode_key("x")?;
            e.begin_array()?;
            e.encode_i64(1)?;
            e.end_array()?;
            e.end_object()?;
            e.encode_key("mail")?;
            e.encode_str("m")?;
            e.end_object()
        })
    }

    #[test]
    fn unknown_keys_are_skipped_by_default() {
        let mapper = mapper(|b| {
            b.register::<Account>();
        });
        let decoded: Account = mapper.decode(account_with_extra_key().decoder()).unwrap();
        assert_eq!(decoded.email, "m");
        assert_eq!(decoded.login_count, 0);
    }

    #[test]
    fn unknown_keys_can_fail() {
        let mapper = mapper_with(
            |b| {
                b.register::<Account>();
            },
            MapperConfig::new().fail_on_unknown_properties(true),
        );
        let err = mapper
            .decode::<Account, _>(account_with_extra_key().decoder())
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnknownProperty(key) if key == "extra"));
        assert_eq!(err.type_path(), Some(Account::type_ref().path()));
    }

    #[test]
    fn missing_required_property() {
        let mapper = mapper(|b| {
            b.register::<Account>();
        });
        let input = tokens(|e| {
            e.begin_object()?;
            e.end_object()
        });
        let err = mapper.decode::<Account, _>(input.decoder()).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::MissingRequiredProperty(name) if name == "userName"
        ));
        assert_eq!(err.type_path(), Some(Account::type_ref().path()));
    }

    #[derive(Debug, PartialEq)]
    struct Flexible {
        id: i32,
        extra: BTreeMap<String, String>,
    }

    crate::impl_typed!(Flexible);

    impl GetDescriptor for Flexible {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| {
                Ok(Flexible {
                    id: v.take("id")?,
                    extra: v.take("extra")?,
                })
            })
            .property(PropertyDescriptor::field("id", |f: &Flexible| &f.id))
            .property(PropertyDescriptor::field("extra", |f: &Flexible| &f.extra).catch_all())
            .into()
        }
    }

    #[test]
    fn catch_all_collects_and_emits_unmapped_keys() {
        let mapper = mapper(|b| {
            b.register::<Flexible>();
        });
        let value = Flexible {
            id: 1,
            extra: BTreeMap::from([("x".to_owned(), "y".to_owned())]),
        };
        assert_eq!(encode(&mapper, &value).unwrap(), r#"{"id":1,"x":"y"}"#);
        assert_eq!(roundtrip(&mapper, &value), value);

        let bare = Flexible {
            id: 2,
            extra: BTreeMap::new(),
        };
        assert_eq!(roundtrip(&mapper, &bare), bare);
    }

    #[test]
    fn catch_all_does_not_shadow_declared_keys() {
        let mapper = mapper(|b| {
            b.register::<Flexible>();
        });
        let value = Flexible {
            id: 1,
            extra: BTreeMap::from([
                ("id".to_owned(), "shadow".to_owned()),
                ("x".to_owned(), "y".to_owned()),
            ]),
        };
        assert_eq!(encode(&mapper, &value).unwrap(), r#"{"id":1,"x":"y"}"#);

        let decoded = roundtrip(&mapper, &value);
        assert_eq!(decoded.id, 1);
        assert_eq!(decoded.extra, BTreeMap::from([("x".to_owned(), "y".to_owned())]));
    }

    #[derive(Debug, PartialEq, Clone)]
    struct Address {
        street: String,
        city: String,
    }

    crate::impl_typed!(Address);

    impl GetDescriptor for Address {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| {
                Ok(Address {
                    street: v.take("street")?,
                    city: v.take("city")?,
                })
            })
            .property(PropertyDescriptor::field("street", |a: &Address| &a.street))
            .property(PropertyDescriptor::field("city", |a: &Address| &a.city))
            .into()
        }
    }

    #[derive(Debug, PartialEq)]
    struct Customer {
        name: String,
        address: Address,
    }

    crate::impl_typed!(Customer);

    impl GetDescriptor for Customer {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| {
                Ok(Customer {
                    name: v.take("name")?,
                    address: v.take("address")?,
                })
            })
            .property(PropertyDescriptor::field("name", |c: &Customer| &c.name))
            .property(
                PropertyDescriptor::field("address", |c: &Customer| &c.address)
                    .unwrapped("addr_", ""),
            )
            .into()
        }

        fn register_dependencies(builder: &mut RegistryBuilder) {
            builder.register::<Address>();
        }
    }

    #[test]
    fn unwrapped_properties_are_flattened() {
        let mapper = mapper(|b| {
            b.register::<Customer>();
        });
        let value = Customer {
            name: "A".into(),
            address: Address {
                street: "S".into(),
                city: "C".into(),
            },
        };
        assert_eq!(
            encode(&mapper, &value).unwrap(),
            r#"{"name":"A","addr_street":"S","addr_city":"C"}"#
        );
        assert_eq!(roundtrip(&mapper, &value), value);
    }

    #[derive(Debug, PartialEq)]
    struct Basket {
        items: Vec<i32>,
    }

    crate::impl_typed!(Basket);

    impl GetDescriptor for Basket {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| Ok(Basket { items: v.take("items")? }))
                .property(PropertyDescriptor::field("items", |b: &Basket| &b.items).wrapped("item"))
                .into()
        }
    }

    #[test]
    fn wrapped_property_is_nested_one_level() {
        let mapper = mapper(|b| {
            b.register::<Basket>();
        });
        let value = Basket { items: vec![1, 2] };
        assert_eq!(encode(&mapper, &value).unwrap(), r#"{"items":{"item":[1,2]}}"#);
        assert_eq!(roundtrip(&mapper, &value), value);
    }

    #[derive(Debug, PartialEq)]
    struct Document {
        title: String,
        secret: String,
        hits: u32,
        cache: String,
    }

    crate::impl_typed!(Document);

    impl GetDescriptor for Document {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| {
                Ok(Document {
                    title: v.take("title")?,
                    secret: v.take_or_default("secret")?,
                    hits: v.take_or_default("hits")?,
                    cache: v.take_or_default("cache")?,
                })
            })
            .property(PropertyDescriptor::field("title", |d: &Document| &d.title))
            .property(
                PropertyDescriptor::field("secret", |d: &Document| &d.secret).view("internal"),
            )
            .property(PropertyDescriptor::field("hits", |d: &Document| &d.hits).read_only())
            .property(PropertyDescriptor::field("cache", |d: &Document| &d.cache).ignored())
            .into()
        }
    }

    #[test]
    fn views_and_access_modes() {
        let document = Document {
            title: "t".into(),
            secret: "s".into(),
            hits: 7,
            cache: "c".into(),
        };

        let full = mapper(|b| {
            b.register::<Document>();
        });
        let written = full.encode(crate::stream::TokenBuffer::new(), &document).unwrap();
        assert_eq!(written.to_string(), r#"{"title":"t","secret":"s","hits":7}"#);

        // read-only and ignored properties are not decoded.
        let decoded: Document = full.decode(written.decoder()).unwrap();
        assert_eq!(decoded.secret, "s");
        assert_eq!((decoded.hits, decoded.cache.as_str()), (0, ""));

        let public = mapper_with(
            |b| {
                b.register::<Document>();
            },
            MapperConfig::new().with_view("public"),
        );
        assert_eq!(encode(&public, &document).unwrap(), r#"{"title":"t","hits":7}"#);
        let decoded: Document = public.decode(written.decoder()).unwrap();
        assert_eq!(decoded.secret, "");
    }

    #[derive(Debug, PartialEq)]
    struct Celsius(i32);

    crate::impl_typed!(Celsius);

    #[derive(Debug, PartialEq)]
    struct Reading {
        station: String,
        temperature: Celsius,
    }

    crate::impl_typed!(Reading);

    impl GetDescriptor for Reading {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| {
                Ok(Reading {
                    station: v.take("station")?,
                    temperature: v.take("temperature")?,
                })
            })
            .property(PropertyDescriptor::field("station", |r: &Reading| &r.station))
            .property(
                PropertyDescriptor::field("temperature", |r: &Reading| &r.temperature)
                    .serialize_as(|c: &Celsius| c.0)
                    .deserialize_as(Celsius),
            )
            .into()
        }
    }

    #[test]
    fn property_written_and_read_as_another_type() {
        let mapper = mapper(|b| {
            b.register::<Reading>();
        });
        let reading = Reading {
            station: "north".into(),
            temperature: Celsius(-4),
        };
        assert_eq!(
            encode(&mapper, &reading).unwrap(),
            r#"{"station":"north","temperature":-4}"#
        );
        assert_eq!(roundtrip(&mapper, &reading), reading);

        let wrong = tokens(|e| {
            e.begin_object()?;
            e.encode_key("station")?;
            e.encode_str("south")?;
            e.encode_key("temperature")?;
            e.encode_str("cold")?;
            e.end_object()
        });
        let err = mapper.decode::<Reading, _>(wrong.decoder()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));
    }

    #[derive(Debug, PartialEq)]
    struct Email(String);

    crate::impl_typed!(Email);

    impl GetDescriptor for Email {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::delegating(|e: &Email| &e.0, |s: String| Ok(Email(s))).into()
        }
    }

    #[derive(Debug, PartialEq)]
    struct Contact {
        email: Email,
        fallback: Option<Email>,
    }

    crate::impl_typed!(Contact);

    impl GetDescriptor for Contact {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| {
                Ok(Contact {
                    email: v.take("email")?,
                    fallback: v.take("fallback")?,
                })
            })
            .property(PropertyDescriptor::field("email", |c: &Contact| &c.email))
            .property(
                PropertyDescriptor::field("fallback", |c: &Contact| &c.fallback)
                    .inclusion(Inclusion::NonNull)
                    .default_value(|| Some(Email("none@x".into()))),
            )
            .into()
        }

        fn register_dependencies(builder: &mut RegistryBuilder) {
            builder.register::<Email>();
        }
    }

    #[test]
    fn delegating_type_is_a_single_value() {
        let mapper = mapper(|b| {
            b.register::<Contact>();
        });
        let value = Contact {
            email: Email("a@b".into()),
            fallback: None,
        };
        assert_eq!(encode(&mapper, &value).unwrap(), r#"{"email":"a@b"}"#);

        // absent on the wire, so the default value applies.
        let decoded = roundtrip(&mapper, &value);
        assert_eq!(decoded.fallback, Some(Email("none@x".into())));
    }

    #[derive(Debug, PartialEq)]
    struct Member {
        name: String,
    }

    crate::impl_typed!(Member);

    impl GetDescriptor for Member {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| Ok(Member { name: v.take("name")? }))
                .property(PropertyDescriptor::field("name", |m: &Member| &m.name))
                .into()
        }
    }

    #[derive(Debug, PartialEq)]
    struct Team {
        members: Vec<Member>,
    }

    crate::impl_typed!(Team);

    impl GetDescriptor for Team {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| Ok(Team { members: v.take("members")? }))
                .property(PropertyDescriptor::field("members", |t: &Team| &t.members))
                .into()
        }

        fn register_dependencies(builder: &mut RegistryBuilder) {
            builder.register::<Member>();
        }
    }

    #[test]
    fn errors_carry_the_property_path() {
        let mapper = mapper(|b| {
            b.register::<Team>();
        });
        let input = tokens(|e| {
            e.begin_object()?;
            e.encode_key("members")?;
            e.begin_array()?;
            e.begin_object()?;
            e.encode_key("name")?;
            e.encode_str("a")?;
            e.end_object()?;
            e.begin_object()?;
            e.encode_key("name")?;
            e.encode_i64(5)?;
            e.end_object()?;
            e.end_array()?;
            e.end_object()
        });
        let err = mapper.decode::<Team, _>(input.decoder()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));
        assert_eq!(err.path_string(), "$.members[1].name");
        assert_eq!(err.type_path(), Some("alloc::string::String"));
    }

    #[test]
    fn unregistered_type_has_no_codec() {
        let mapper = mapper(|_| {});
        let err = encode(&mapper, &Member { name: "a".into() }).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NoCodecAvailable));
        assert_eq!(err.type_path(), Some(Member::type_ref().path()));
    }
}
