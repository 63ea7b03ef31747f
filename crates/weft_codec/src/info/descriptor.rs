use std::any::Any;
use std::fmt;
use std::sync::Arc;

use weft_utils::hash::HashMap;

use crate::error::CodecError;
use crate::info::{ErasedGetter, Inclusion, PropertyDescriptor, SubtypeMapping};
use crate::info::{TypeRef, Typed, erase_getter};
use crate::registry::RegistryBuilder;

// -----------------------------------------------------------------------------
// PropertyValues

/// Decoded property values handed to a [`Creator::Properties`] function,
/// keyed by declared name.
pub struct PropertyValues {
    ty: TypeRef,
    values: HashMap<&'static str, Box<dyn Any>>,
}

impl PropertyValues {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            values: HashMap::default(),
        }
    }

    pub fn insert(&mut self, name: &'static str, value: Box<dyn Any>) {
        self.values.insert(name, value);
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Takes a required property.
    ///
    /// Fails with `MissingRequiredProperty` if it was absent and has no default.
    pub fn take<T: Any>(&mut self, name: &str) -> Result<T, CodecError> {
        match self.take_opt(name)? {
            Some(value) => Ok(value),
            None => Err(CodecError::missing_property(name).in_type(&self.ty)),
        }
    }

    /// Takes a property, `None` if it was absent.
    pub fn take_opt<T: Any>(&mut self, name: &str) -> Result<Option<T>, CodecError> {
        let Some(value) = self.values.remove(name) else {
            return Ok(None);
        };
        match value.downcast::<T>() {
            Ok(value) => Ok(Some(*value)),
            Err(_) => Err(CodecError::type_mismatch(std::any::type_name::<T>(), "another type")
                .at_property(name)
                .in_type(&self.ty)),
        }
    }

    /// Takes a property, `T::default()` if it was absent.
    pub fn take_or_default<T: Any + Default>(&mut self, name: &str) -> Result<T, CodecError> {
        Ok(self.take_opt(name)?.unwrap_or_default())
    }
}

// -----------------------------------------------------------------------------
// Creator

/// Builds the value of a `PROPERTIES` creator.
pub type PropertiesFn =
    Arc<dyn Fn(&mut PropertyValues) -> Result<Box<dyn Any>, CodecError> + Send + Sync>;

/// Builds the value of a `DELEGATING` creator from its single delegate.
pub type DelegateFn = Arc<dyn Fn(Box<dyn Any>) -> Result<Box<dyn Any>, CodecError> + Send + Sync>;

/// How a value is constructed on decode.
#[derive(Clone)]
pub enum Creator {
    /// From named properties matched by wire name.
    Properties(PropertiesFn),
    /// From one value of type `ty`. The same value is written on encode.
    Delegating {
        ty: TypeRef,
        get: ErasedGetter,
        create: DelegateFn,
    },
}

// -----------------------------------------------------------------------------
// ObjectDescriptor

/// Properties and creator of one object type.
///
/// ```
/// use weft_codec::info::{ObjectDescriptor, PropertyDescriptor};
///
/// struct Person { name: String, age: u32 }
/// weft_codec::impl_typed!(Person);
///
/// let descriptor = ObjectDescriptor::new(|values| {
///     Ok(Person { name: values.take("name")?, age: values.take_or_default("age")? })
/// })
/// .property(PropertyDescriptor::field("name", |p: &Person| &p.name))
/// .property(PropertyDescriptor::field("age", |p: &Person| &p.age));
///
/// assert_eq!(descriptor.properties().len(), 2);
/// ```
#[derive(Clone)]
pub struct ObjectDescriptor {
    ty: TypeRef,
    properties: Vec<PropertyDescriptor>,
    creator: Creator,
    inclusion: Option<Inclusion>,
    naming: Option<String>,
}

impl ObjectDescriptor {
    /// An object built from its properties by `create`.
    pub fn new<T: Typed>(create: fn(&mut PropertyValues) -> Result<T, CodecError>) -> Self {
        Self::with_creator(
            T::type_ref(),
            Creator::Properties(Arc::new(move |values: &mut PropertyValues| {
                create(values).map(|value| Box::new(value) as Box<dyn Any>)
            })),
        )
    }

    /// An object represented on the wire by a single value of type `V`.
    pub fn delegating<T: Typed, V: Typed>(
        get: fn(&T) -> &V,
        create: fn(V) -> Result<T, CodecError>,
    ) -> Self {
        let delegate = V::type_ref();
        let create_ty = delegate.clone();
        Self::with_creator(
            T::type_ref(),
            Creator::Delegating {
                ty: delegate,
                get: erase_getter(get),
                create: Arc::new(move |value: Box<dyn Any>| match value.downcast::<V>() {
                    Ok(value) => create(*value).map(|value| Box::new(value) as Box<dyn Any>),
                    Err(_) => Err(CodecError::type_mismatch(create_ty.path(), "another type")),
                }),
            },
        )
    }

    pub fn with_creator(ty: TypeRef, creator: Creator) -> Self {
        Self {
            ty,
            properties: Vec::new(),
            creator,
            inclusion: None,
            naming: None,
        }
    }

    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    /// Default inclusion of properties that do not set one.
    pub fn inclusion(mut self, inclusion: Inclusion) -> Self {
        self.inclusion = Some(inclusion);
        self
    }

    /// Naming strategy for properties without explicit wire name.
    pub fn naming(mut self, strategy: impl Into<String>) -> Self {
        self.naming = Some(strategy.into());
        self
    }

    #[inline]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    #[inline]
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub(crate) fn properties_mut(&mut self) -> &mut [PropertyDescriptor] {
        &mut self.properties
    }

    #[inline]
    pub fn creator(&self) -> &Creator {
        &self.creator
    }

    #[inline]
    pub fn default_inclusion(&self) -> Option<Inclusion> {
        self.inclusion
    }

    #[inline]
    pub fn naming_strategy(&self) -> Option<&str> {
        self.naming.as_deref()
    }

    pub fn catch_all(&self) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|prop| prop.is_catch_all())
    }

    /// Property indices in encode order: explicit order first, then declaration order.
    pub fn encode_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.properties.len()).collect();
        // stable sort keeps declaration order among equal keys.
        order.sort_by_key(|&index| match self.properties[index].order_index() {
            Some(order) => (0, order),
            None => (1, 0),
        });
        order
    }
}

impl fmt::Debug for ObjectDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let creator = match &self.creator {
            Creator::Properties(_) => "properties",
            Creator::Delegating { .. } => "delegating",
        };
        f.debug_struct("ObjectDescriptor")
            .field("ty", &self.ty)
            .field("creator", &creator)
            .field("inclusion", &self.inclusion)
            .field("naming", &self.naming)
            .field("properties", &self.properties)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// TypeDescriptor

/// What the descriptor provider knows about one type.
#[derive(Clone, Debug)]
pub enum TypeDescriptor {
    Object(ObjectDescriptor),
    Polymorphic(SubtypeMapping),
}

impl TypeDescriptor {
    pub fn ty(&self) -> &TypeRef {
        match self {
            TypeDescriptor::Object(object) => object.ty(),
            TypeDescriptor::Polymorphic(mapping) => mapping.ty(),
        }
    }
}

impl From<ObjectDescriptor> for TypeDescriptor {
    fn from(value: ObjectDescriptor) -> Self {
        TypeDescriptor::Object(value)
    }
}

impl From<SubtypeMapping> for TypeDescriptor {
    fn from(value: SubtypeMapping) -> Self {
        TypeDescriptor::Polymorphic(value)
    }
}

/// A type with a [`TypeDescriptor`].
///
/// This is what the descriptor provider implements, by hand or generated.
pub trait GetDescriptor: Typed {
    fn get_descriptor() -> TypeDescriptor;

    /// Registers the types this one needs, e.g. its subtypes.
    ///
    /// The default implementation does nothing.
    fn register_dependencies(_builder: &mut RegistryBuilder) {}
}

// -----------------------------------------------------------------------------
// Tests
