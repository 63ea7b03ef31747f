use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::CodecError;
use crate::info::{ErasedGetter, TypeRef, Typed};

#[inline(always)]
fn downcast_hint<F>(f: F) -> F
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
{
    f
}

/// Where the discriminator goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscriminatorKind {
    /// Among the object's own keys.
    #[default]
    Property,
    /// The object nested under a single key named after the discriminator.
    WrapperObject,
}

/// How the discriminator value of a subtype is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscriminatorValue {
    /// Full type path.
    ClassName,
    /// Last segment of the type path.
    #[default]
    ClassSimpleName,
    /// The explicit name given to the subtype, simple name if none.
    Name,
}

/// One concrete type of a [`SubtypeMapping`].
#[derive(Clone)]
pub struct Subtype {
    ty: TypeRef,
    name: Option<String>,
    downcast: ErasedGetter,
    upcast: Arc<dyn Fn(Box<dyn Any>) -> Option<Box<dyn Any>> + Send + Sync>,
}

impl Subtype {
    #[inline]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// The discriminator value under `kind`.
    pub fn discriminator(&self, kind: DiscriminatorValue) -> &str {
        match kind {
            DiscriminatorValue::ClassName => self.ty.path(),
            DiscriminatorValue::ClassSimpleName => self.ty.simple_name(),
            DiscriminatorValue::Name => self.name.as_deref().unwrap_or(self.ty.simple_name()),
        }
    }

    /// The concrete value inside a base value, if it is of this subtype.
    pub fn downcast<'a>(&self, base: &'a dyn Any) -> Option<&'a dyn Any> {
        (self.downcast)(base)
    }

    /// Turns a decoded concrete value into a base value.
    pub fn upcast(&self, value: Box<dyn Any>) -> Result<Box<dyn Any>, CodecError> {
        (self.upcast)(value).ok_or_else(|| {
            CodecError::type_mismatch(self.ty.path(), "another type").in_type(&self.ty)
        })
    }
}

/// The closed set of concrete types of a polymorphic base type.
///
/// ```
/// use weft_codec::info::{DiscriminatorKind, SubtypeMapping};
///
/// struct Cat { lives: u8 }
/// struct Dog { good: bool }
/// enum Animal { Cat(Cat), Dog(Dog) }
/// weft_codec::impl_typed!(Cat);
/// weft_codec::impl_typed!(Dog);
/// weft_codec::impl_typed!(Animal);
///
/// let mapping = SubtypeMapping::new::<Animal>(DiscriminatorKind::Property)
///     .named::<Cat>("cat", |a| match a { Animal::Cat(c) => Some(c), _ => None }, Animal::Cat)
///     .named::<Dog>("dog", |a| match a { Animal::Dog(d) => Some(d), _ => None }, Animal::Dog)
///     .build();
///
/// assert_eq!(mapping.property(), "@type");
/// assert_eq!(mapping.find("dog").unwrap().discriminator(mapping.value_kind()), "dog");
/// ```
#[derive(Clone)]
pub struct SubtypeMapping {
    ty: TypeRef,
    kind: DiscriminatorKind,
    property: String,
    value_kind: DiscriminatorValue,
    subtypes: Vec<Subtype>,
}

impl SubtypeMapping {
    /// Default discriminator property name.
    pub const DEFAULT_PROPERTY: &'static str = "@type";

    /// Starts the mapping of base type `B`.
    pub fn new<B: Typed>(kind: DiscriminatorKind) -> SubtypeMappingBuilder<B> {
        SubtypeMappingBuilder {
            mapping: Self {
                ty: B::type_ref(),
                kind,
                property: Self::DEFAULT_PROPERTY.to_owned(),
                value_kind: DiscriminatorValue::default(),
                subtypes: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    #[inline]
    pub fn kind(&self) -> DiscriminatorKind {
        self.kind
    }

    #[inline]
    pub fn property(&self) -> &str {
        &self.property
    }

    #[inline]
    pub fn value_kind(&self) -> DiscriminatorValue {
        self.value_kind
    }

    #[inline]
    pub fn subtypes(&self) -> &[Subtype] {
        &self.subtypes
    }

    /// The subtype with discriminator `value`.
    pub fn find(&self, value: &str) -> Option<&Subtype> {
        self.subtypes
            .iter()
            .find(|subtype| subtype.discriminator(self.value_kind) == value)
    }

    /// The subtype of a base value, with the concrete value inside it.
    pub fn resolve<'a>(&self, base: &'a dyn Any) -> Option<(&Subtype, &'a dyn Any)> {
        self.subtypes
            .iter()
            .find_map(|subtype| subtype.downcast(base).map(|value| (subtype, value)))
    }

    /// Fails on duplicate discriminator values.
    pub fn validate(&self) -> Result<(), CodecError> {
        for (index, subtype) in self.subtypes.iter().enumerate() {
            let value = subtype.discriminator(self.value_kind);
            if self.subtypes[..index]
                .iter()
                .any(|earlier| earlier.discriminator(self.value_kind) == value)
            {
                return Err(CodecError::config(format!(
                    "duplicate discriminator `{value}` in subtypes of `{}`",
                    self.ty
                ))
                .in_type(&self.ty));
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// SubtypeMappingBuilder

/// Typed builder of a [`SubtypeMapping`] for base type `B`.
pub struct SubtypeMappingBuilder<B> {
    mapping: SubtypeMapping,
    _marker: PhantomData<fn() -> B>,
}

impl<B: Typed> SubtypeMappingBuilder<B> {
    /// Name of the discriminator key for [`DiscriminatorKind::Property`].
    pub fn discriminator_property(mut self, name: impl Into<String>) -> Self {
        self.mapping.property = name.into();
        self
    }

    pub fn discriminator_value(mut self, value_kind: DiscriminatorValue) -> Self {
        self.mapping.value_kind = value_kind;
        self
    }

    /// Adds a subtype whose discriminator follows the mapping's value kind.
    pub fn subtype<S: Typed>(self, downcast: fn(&B) -> Option<&S>, upcast: fn(S) -> B) -> Self {
        self.push(None, downcast, upcast)
    }

    /// Adds a subtype with an explicit name and switches to [`DiscriminatorValue::Name`].
    pub fn named<S: Typed>(
        mut self,
        name: impl Into<String>,
        downcast: fn(&B) -> Option<&S>,
        upcast: fn(S) -> B,
    ) -> Self {
        self.mapping.value_kind = DiscriminatorValue::Name;
        self.push(Some(name.into()), downcast, upcast)
    }

    fn push<S: Typed>(
        mut self,
        name: Option<String>,
        downcast: fn(&B) -> Option<&S>,
        upcast: fn(S) -> B,
    ) -> Self {
        self.mapping.subtypes.push(Subtype {
            ty: S::type_ref(),
            name,
            downcast: Arc::new(downcast_hint(move |base: &dyn Any| {
                downcast(base.downcast_ref::<B>()?).map(|value| value as &dyn Any)
            })),
            upcast: Arc::new(move |value: Box<dyn Any>| {
                let value = value.downcast::<S>().ok()?;
                Some(Box::new(upcast(*value)) as Box<dyn Any>)
            }),
        });
        self
    }

    #[inline]
    pub fn build(self) -> SubtypeMapping {
        self.mapping
    }
}

impl<B: Typed> From<SubtypeMappingBuilder<B>> for SubtypeMapping {
    #[inline]
    fn from(builder: SubtypeMappingBuilder<B>) -> Self {
        builder.build()
    }
}

impl fmt::Debug for SubtypeMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subtypes: Vec<(&str, &TypeRef)> = self
            .subtypes
            .iter()
            .map(|subtype| (subtype.discriminator(self.value_kind), subtype.ty()))
            .collect();
        f.debug_struct("SubtypeMapping")
            .field("ty", &self.ty)
            .field("kind", &self.kind)
            .field("property", &self.property)
            .field("value_kind", &self.value_kind)
            .field("subtypes", &subtypes)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{DiscriminatorKind, DiscriminatorValue, SubtypeMapping};
    use crate::error::ErrorKind;

    struct Circle(f64);
    struct Square(f64);
    enum Shape {
        Circle(Circle),
        Square(Square),
    }

    crate::impl_typed!(Circle);
    crate::impl_typed!(Square);
    crate::impl_typed!(Shape);

    fn mapping() -> SubtypeMapping {
        SubtypeMapping::new::<Shape>(DiscriminatorKind::WrapperObject)
            .subtype::<Circle>(
                |s| match s {
                    Shape::Circle(c) => Some(c),
                    _ => None,
                },
                Shape::Circle,
            )
            .subtype::<Square>(
                |s| match s {
                    Shape::Square(q) => Some(q),
                    _ => None,
                },
                Shape::Square,
            )
            .build()
    }

    #[test]
    fn resolves_runtime_subtype() {
        let mapping = mapping();
        let value = Shape::Square(Square(2.0));
        let (subtype, inner) = mapping.resolve(&value).unwrap();
        assert_eq!(subtype.discriminator(mapping.value_kind()), "Square");
        assert_eq!(inner.downcast_ref::<Square>().map(|s| s.0), Some(2.0));
        assert!(mapping.find("Triangle").is_none());
    }

    #[test]
    fn upcast_builds_base() {
        let mapping = mapping();
        let subtype = mapping.find("Circle").unwrap();
        let base = subtype.upcast(Box::new(Circle(1.5))).unwrap();
        assert!(matches!(*base.downcast::<Shape>().unwrap(), Shape::Circle(Circle(r)) if r == 1.5));
    }

    #[test]
    fn class_name_and_duplicates() {
        let mapping = SubtypeMapping::new::<Shape>(DiscriminatorKind::Property)
            .discriminator_value(DiscriminatorValue::ClassName)
            .subtype::<Circle>(|_| None, Shape::Circle)
            .build();
        assert!(mapping.find("weft_codec::info::subtype::tests::Circle").is_some());
        assert!(mapping.validate().is_ok());

        let duplicate = SubtypeMapping::new::<Shape>(DiscriminatorKind::Property)
            .named::<Circle>("round", |_| None, Shape::Circle)
            .named::<Square>("round", |_| None, Shape::Square)
            .build();
        let err = duplicate.validate().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidConfiguration(_)));
    }
}
