//! Codecs of polymorphic base types, driven by a [`SubtypeMapping`].

use std::any::Any;
use std::sync::Arc;

use crate::error::CodecError;
use crate::info::{DiscriminatorKind, Subtype, SubtypeMapping, TypeRef};
use crate::registry::{CodecRegistry, DecodeContext, Deserializer, EncodeContext, Serializer};
use crate::stream::{Decoder, Encoder, TokenBuffer, TokenKind};

// -----------------------------------------------------------------------------
// SubtypeSerializer

/// Writes the concrete value of a base type with its discriminator.
pub struct SubtypeSerializer {
    mapping: Arc<SubtypeMapping>,
}

impl SubtypeSerializer {
    pub fn new(mapping: Arc<SubtypeMapping>) -> Self {
        Self { mapping }
    }

    fn resolve<'a>(
        &self,
        value: &'a dyn Any,
        ty: &TypeRef,
    ) -> Result<(&Subtype, &'a dyn Any), CodecError> {
        self.mapping.resolve(value).ok_or_else(|| {
            CodecError::unknown_subtype(format!("unregistered variant of `{ty}`")).in_type(ty)
        })
    }
}

impl Serializer for SubtypeSerializer {
    fn serialize(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        let (subtype, concrete) = self.resolve(value, ty)?;
        let discriminator = subtype.discriminator(self.mapping.value_kind());
        let serializer = ctx.registry().find_serializer(subtype.ty())?;

        encoder.begin_object()?;
        match self.mapping.kind() {
            DiscriminatorKind::Property => {
                encoder.encode_key(self.mapping.property())?;
                encoder.encode_str(discriminator)?;
                serializer.serialize_properties(encoder, ctx, concrete, subtype.ty())?;
            }
            DiscriminatorKind::WrapperObject => {
                encoder.encode_key(discriminator)?;
                serializer
                    .serialize(encoder, ctx, concrete, subtype.ty())
                    .map_err(|err| err.at_property(discriminator))?;
            }
        }
        encoder.end_object()
    }

    fn serialize_properties(
        &self,
        encoder: &mut dyn Encoder,
        ctx: &mut EncodeContext<'_>,
        value: &dyn Any,
        ty: &TypeRef,
    ) -> Result<(), CodecError> {
        if self.mapping.kind() != DiscriminatorKind::Property {
            let msg = "a wrapper object discriminator cannot share an object";
            return Err(CodecError::config(msg).in_type(ty));
        }
        let (subtype, concrete) = self.resolve(value, ty)?;
        let serializer = ctx.registry().find_serializer(subtype.ty())?;
        encoder.encode_key(self.mapping.property())?;
        encoder.encode_str(subtype.discriminator(self.mapping.value_kind()))?;
        serializer.serialize_properties(encoder, ctx, concrete, subtype.ty())
    }
}

// -----------------------------------------------------------------------------
// SubtypeDeserializer

/// Reads a concrete value by its discriminator and returns it as the base type.
///
/// With [`DiscriminatorKind::Property`] the members before the
/// discriminator key are buffered and replayed to the concrete type.
pub struct SubtypeDeserializer {
    mapping: Arc<SubtypeMapping>,
}

impl SubtypeDeserializer {
    pub fn new(mapping: Arc<SubtypeMapping>, registry: &CodecRegistry) -> Result<Self, CodecError> {
        if let Some(missing) = mapping
            .subtypes()
            .iter()
            .find(|subtype| !registry.has_deserializer(subtype.ty()))
        {
            return Err(CodecError::no_codec(missing.ty()));
        }
        Ok(Self { mapping })
    }

    fn find(&self, value: &str) -> Result<&Subtype, CodecError> {
        self.mapping
            .find(value)
            .ok_or_else(|| CodecError::unknown_subtype(value).in_type(self.mapping.ty()))
    }

    fn read_discriminator(&self, decoder: &mut dyn Decoder) -> Result<&Subtype, CodecError> {
        let kind = decoder.peek()?;
        if kind != TokenKind::String {
            return Err(CodecError::unexpected_token("discriminator string", kind)
                .at_property(self.mapping.property())
                .in_type(self.mapping.ty()));
        }
        let value = decoder.decode_string()?;
        self.find(&value)
    }

    /// Reads the remaining members as `subtype` and upcasts the result.
    fn read_concrete(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        subtype: &Subtype,
        buffered: Vec<(String, TokenBuffer)>,
    ) -> Result<Box<dyn Any>, CodecError> {
        let deserializer = ctx.registry().find_deserializer(subtype.ty())?;
        let depth = ctx.references().depth();
        let concrete = deserializer.deserialize_properties(decoder, ctx, subtype.ty(), buffered)?;
        ctx.references()
            .retag_pending(depth, subtype.ty().id(), self.mapping.ty().id());
        subtype.upcast(concrete)
    }

    fn read_properties(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        mut buffered: Vec<(String, TokenBuffer)>,
    ) -> Result<Box<dyn Any>, CodecError> {
        let property = self.mapping.property();
        if let Some(position) = buffered.iter().position(|(key, _)| key == property) {
            let (_, buffer) = buffered.remove(position);
            let subtype = self.read_discriminator(&mut buffer.decoder())?;
            return self.read_concrete(decoder, ctx, subtype, buffered);
        }

        while let Some(key) = decoder.next_key()? {
            if key == property {
                let subtype = self.read_discriminator(decoder)?;
                return self.read_concrete(decoder, ctx, subtype, buffered);
            }
            let buffer = TokenBuffer::capture(decoder)?;
            buffered.push((key, buffer));
        }
        Err(CodecError::missing_property(property).in_type(self.mapping.ty()))
    }

    fn read_wrapper(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError> {
        let Some(key) = decoder.next_key()? else {
            let expected = "object with one discriminator key";
            return Err(CodecError::type_mismatch(expected, "empty object").in_type(ty));
        };
        let subtype = self.find(&key)?;
        let deserializer = ctx.registry().find_deserializer(subtype.ty())?;
        let depth = ctx.references().depth();
        let concrete = deserializer
            .deserialize(decoder, ctx, subtype.ty())
            .map_err(|err| err.at_property(key.as_str()))?;
        ctx.references()
            .retag_pending(depth, subtype.ty().id(), self.mapping.ty().id());
        if let Some(extra) = decoder.next_key()? {
            return Err(CodecError::type_mismatch(
                "object with one discriminator key",
                format!("another key `{extra}`"),
            )
            .in_type(ty));
        }
        subtype.upcast(concrete)
    }
}

impl Deserializer for SubtypeDeserializer {
    fn deserialize(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
    ) -> Result<Box<dyn Any>, CodecError> {
        decoder.begin_object().map_err(|err| err.in_type(ty))?;
        match self.mapping.kind() {
            DiscriminatorKind::Property => self.read_properties(decoder, ctx, Vec::new()),
            DiscriminatorKind::WrapperObject => self.read_wrapper(decoder, ctx, ty),
        }
    }

    fn deserialize_properties(
        &self,
        decoder: &mut dyn Decoder,
        ctx: &mut DecodeContext<'_>,
        ty: &TypeRef,
        buffered: Vec<(String, TokenBuffer)>,
    ) -> Result<Box<dyn Any>, CodecError> {
        match self.mapping.kind() {
            DiscriminatorKind::Property => self.read_properties(decoder, ctx, buffered),
            DiscriminatorKind::WrapperObject => Err(CodecError::config(
                "a wrapper object discriminator cannot share an object",
            )
            .in_type(ty)),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::Arc;

    use crate::error::{CodecError, ErrorKind};
    use crate::info::{
        DiscriminatorKind, GetDescriptor, ObjectDescriptor, PropertyDescriptor, SubtypeMapping,
        TypeDescriptor, TypeRef, Typed,
    };
    use crate::registry::{DecodeContext, Deserializer, RegistryBuilder};
    use crate::stream::{Decoder, Encoder};
    use crate::testing::{encode, mapper, roundtrip, tokens};

    #[derive(Debug, PartialEq)]
    struct Circle {
        radius: f64,
    }

    #[derive(Debug, PartialEq)]
    struct Square {
        side: f64,
    }

    #[derive(Debug, PartialEq)]
    enum Figure {
        Circle(Circle),
        Square(Square),
    }

    crate::impl_typed!(Circle);
    crate::impl_typed!(Square);
    crate::impl_typed!(Figure);

    impl GetDescriptor for Circle {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| Ok(Circle { radius: v.take("radius")? }))
                .property(PropertyDescriptor::field("radius", |c: &Circle| &c.radius))
                .into()
        }
    }

    impl GetDescriptor for Square {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| Ok(Square { side: v.take("side")? }))
                .property(PropertyDescriptor::field("side", |s: &Square| &s.side))
                .into()
        }
    }

    impl GetDescriptor for Figure {
        fn get_descriptor() -> TypeDescriptor {
            SubtypeMapping::new::<Figure>(DiscriminatorKind::Property)
                .subtype(
                    |f: &Figure| match f {
                        Figure::Circle(c) => Some(c),
                        _ => None,
                    },
                    Figure::Circle,
                )
                .subtype(
                    |f: &Figure| match f {
                        Figure::Square(s) => Some(s),
                        _ => None,
                    },
                    Figure::Square,
                )
                .build()
                .into()
        }

        fn register_dependencies(builder: &mut RegistryBuilder) {
            builder.register::<Circle>().register::<Square>();
        }
    }

    #[derive(Debug, PartialEq)]
    struct Drawing {
        figures: Vec<Figure>,
    }

    crate::impl_typed!(Drawing);

    impl GetDescriptor for Drawing {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| Ok(Drawing { figures: v.take("figures")? }))
                .property(PropertyDescriptor::field("figures", |d: &Drawing| &d.figures))
                .into()
        }

        fn register_dependencies(builder: &mut RegistryBuilder) {
            builder.register::<Figure>();
        }
    }

    #[test]
    fn property_discriminator() {
        let mapper = mapper(|b| {
            b.register::<Drawing>();
        });
        let drawing = Drawing {
            figures: vec![
                Figure::Circle(Circle { radius: 1.5 }),
                Figure::Square(Square { side: 2.5 }),
            ],
        };
        assert_eq!(
            encode(&mapper, &drawing).unwrap(),
            r#"{"figures":[{"@type":"Circle","radius":1.5},{"@type":"Square","side":2.5}]}"#
        );
        assert_eq!(roundtrip(&mapper, &drawing), drawing);
    }

    #[test]
    fn discriminator_may_follow_other_keys() {
        let mapper = mapper(|b| {
            b.register::<Figure>();
        });
        let input = tokens(|e| {
            e.begin_object()?;
            e.encode_key("radius")?;
            e.encode_f64(1.5)?;
            e.encode_key("@type")?;
            e.encode_str("Circle")?;
            e.end_object()
        });
        let figure: Figure = mapper.decode(input.decoder()).unwrap();
        assert_eq!(figure, Figure::Circle(Circle { radius: 1.5 }));
    }

    #[test]
    fn unmapped_variant_fails_to_encode() {
        let circles = SubtypeMapping::new::<Figure>(DiscriminatorKind::Property)
            .subtype(
                |f: &Figure| match f {
                    Figure::Circle(c) => Some(c),
                    _ => None,
                },
                Figure::Circle,
            )
            .build();
        let mapper = mapper(|b| {
            b.register::<Circle>().register_descriptor(circles);
        });
        assert!(encode(&mapper, &Figure::Circle(Circle { radius: 1.0 })).is_ok());

        let err = encode(&mapper, &Figure::Square(Square { side: 1.0 })).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnknownSubtype(_)));
        assert_eq!(err.type_path(), Some(Figure::type_ref().path()));
    }

    #[test]
    fn subtype_with_only_an_explicit_deserializer() {
        struct Dot;
        crate::impl_typed!(Dot);

        struct DotCodec;

        impl Deserializer for DotCodec {
            fn deserialize(
                &self,
                decoder: &mut dyn Decoder,
                _ctx: &mut DecodeContext<'_>,
                _ty: &TypeRef,
            ) -> Result<Box<dyn Any>, CodecError> {
                decoder.skip_value()?;
                Ok(Box::new(Dot))
            }
        }

        enum Mark {
            Dot(Dot),
        }
        crate::impl_typed!(Mark);

        let marks = SubtypeMapping::new::<Mark>(DiscriminatorKind::WrapperObject)
            .named(
                "dot",
                |m: &Mark| match m {
                    Mark::Dot(d) => Some(d),
                },
                Mark::Dot,
            )
            .build();
        let mapper = mapper(|b| {
            b.register_deserializer(Dot::type_ref(), Arc::new(DotCodec))
                .register_descriptor(marks);
        });
        let input = tokens(|e| {
            e.begin_object()?;
            e.encode_key("dot")?;
            e.encode_null()?;
            e.end_object()
        });
        let mark: Mark = mapper.decode(input.decoder()).unwrap();
        assert!(matches!(mark, Mark::Dot(Dot)));
    }

    #[test]
    fn unknown_and_missing_discriminators() {
        let mapper = mapper(|b| {
            b.register::<Figure>();
        });
        let unknown = tokens(|e| {
            e.begin_object()?;
            e.encode_key("@type")?;
            e.encode_str("Hexagon")?;
            e.end_object()
        });
        let err = mapper.decode::<Figure, _>(unknown.decoder()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnknownSubtype(value) if value == "Hexagon"));

        let missing = tokens(|e| {
            e.begin_object()?;
            e.encode_key("radius")?;
            e.encode_f64(1.0)?;
            e.end_object()
        });
        let err = mapper.decode::<Figure, _>(missing.decoder()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MissingRequiredProperty(name) if name == "@type"));
    }

    #[derive(Debug, PartialEq)]
    struct Dog {
        name: String,
    }

    #[derive(Debug, PartialEq)]
    struct Cat {
        lives: u8,
    }

    #[derive(Debug, PartialEq)]
    enum Pet {
        Dog(Dog),
        Cat(Cat),
    }

    crate::impl_typed!(Dog);
    crate::impl_typed!(Cat);
    crate::impl_typed!(Pet);

    impl GetDescriptor for Dog {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| Ok(Dog { name: v.take("name")? }))
                .property(PropertyDescriptor::field("name", |d: &Dog| &d.name))
                .into()
        }
    }

    impl GetDescriptor for Cat {
        fn get_descriptor() -> TypeDescriptor {
            ObjectDescriptor::new(|v| Ok(Cat { lives: v.take("lives")? }))
                .property(PropertyDescriptor::field("lives", |c: &Cat| &c.lives))
                .into()
        }
    }

    impl GetDescriptor for Pet {
        fn get_descriptor() -> TypeDescriptor {
            SubtypeMapping::new::<Pet>(DiscriminatorKind::WrapperObject)
                .named(
                    "dog",
                    |p: &Pet| match p {
                        Pet::Dog(d) => Some(d),
                        _ => None,
                    },
                    Pet::Dog,
                )
                .named(
                    "cat",
                    |p: &Pet| match p {
                        Pet::Cat(c) => Some(c),
                        _ => None,
                    },
                    Pet::Cat,
                )
                .build()
                .into()
        }

        fn register_dependencies(builder: &mut RegistryBuilder) {
            builder.register::<Dog>().register::<Cat>();
        }
    }

    #[test]
    fn wrapper_object_discriminator() {
        let mapper = mapper(|b| {
            b.register::<Pet>();
        });
        let pet = Pet::Dog(Dog { name: "rex".into() });
        assert_eq!(encode(&mapper, &pet).unwrap(), r#"{"dog":{"name":"rex"}}"#);
        assert_eq!(roundtrip(&mapper, &pet), pet);

        let cat = Pet::Cat(Cat { lives: 9 });
        assert_eq!(roundtrip(&mapper, &cat), cat);
    }

    #[test]
    fn wrapper_object_rejects_extra_keys() {
        let mapper = mapper(|b| {
            b.register::<Pet>();
        });
        let input = tokens(|e| {
            e.begin_object()?;
            e.encode_key("cat")?;
            e.begin_object()?;
            e.encode_key("lives")?;
            e.encode_u64(9)?;
            e.end_object()?;
            e.encode_key("dog")?;
            e.encode_null()?;
            e.end_object()
        });
        let err = mapper.decode::<Pet, _>(input.decoder()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));
    }
}
