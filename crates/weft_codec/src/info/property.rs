use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::info::{TypeRef, Typed};
use crate::reference::BackRef;
use crate::registry::{Deserializer, Serializer, deserializer_as, serializer_as};

// -----------------------------------------------------------------------------
// Erased accessors

/// Reads a member out of an erased owner. `None` if the owner has another type.
pub type ErasedGetter = Arc<dyn for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync>;

/// Produces a default value for an absent property.
pub type ErasedDefault = Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>;

#[inline(always)]
fn getter_hint<F>(f: F) -> F
where
    F: for<'a> Fn(&'a dyn Any) -> Option<&'a dyn Any> + Send + Sync + 'static,
{
    f
}

/// Erases a typed member accessor.
pub fn erase_getter<O: Any, T: Any>(get: fn(&O) -> &T) -> ErasedGetter {
    Arc::new(getter_hint(move |owner: &dyn Any| {
        owner.downcast_ref::<O>().map(|owner| get(owner) as &dyn Any)
    }))
}

// -----------------------------------------------------------------------------
// Settings

/// When a property is written, based on its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inclusion {
    #[default]
    Always,
    /// Skip `None`.
    NonNull,
    /// Skip `None` and options that do not dereference to a value, like `Some(None)`.
    NonAbsent,
    /// Skip absent values and empty strings, sequences and maps.
    NonEmpty,
    Never,
}

/// Which directions a property takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    ReadWrite,
    /// Written on encode, ignored on decode.
    ReadOnly,
    /// Read on decode, never written.
    WriteOnly,
}

impl Access {
    #[inline]
    pub fn encodes(self) -> bool {
        self != Access::WriteOnly
    }

    #[inline]
    pub fn decodes(self) -> bool {
        self != Access::ReadOnly
    }
}

/// The role of a property in a managed/back reference pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceRole {
    #[default]
    None,
    Managed,
    Back,
}

/// Flattening of a nested object's properties into its parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unwrapped {
    pub prefix: String,
    pub suffix: String,
}

// -----------------------------------------------------------------------------
// PropertyDescriptor

/// Metadata of one property of an object type.
///
/// Built once per type by the descriptor provider:
///
/// ```
/// use weft_codec::info::{Inclusion, PropertyDescriptor};
///
/// struct Person { first_name: String, nick: Option<String> }
///
/// let first = PropertyDescriptor::field("firstName", |p: &Person| &p.first_name).alias("fname");
/// let nick = PropertyDescriptor::field("nick", |p: &Person| &p.nick)
///     .inclusion(Inclusion::NonNull);
/// assert_eq!(first.name(), "firstName");
/// assert_eq!(nick.declared_inclusion(), Some(Inclusion::NonNull));
/// ```
#[derive(Clone)]
pub struct PropertyDescriptor {
    name: &'static str,
    ty: TypeRef,
    getter: Option<ErasedGetter>,
    rename: Option<String>,
    wire_name: String,
    aliases: Vec<String>,
    inclusion: Option<Inclusion>,
    access: Access,
    role: ReferenceRole,
    wrapper: Option<String>,
    unwrapped: Option<Unwrapped>,
    order: Option<i32>,
    views: Vec<String>,
    catch_all: bool,
    default: Option<ErasedDefault>,
    serializer: Option<Arc<dyn Serializer>>,
    deserializer: Option<Arc<dyn Deserializer>>,
}

impl PropertyDescriptor {
    fn with_type(name: &'static str, ty: TypeRef, getter: Option<ErasedGetter>) -> Self {
        Self {
            name,
            ty,
            getter,
            rename: None,
            wire_name: name.to_owned(),
            aliases: Vec::new(),
            inclusion: None,
            access: Access::ReadWrite,
            role: ReferenceRole::None,
            wrapper: None,
            unwrapped: None,
            order: None,
            views: Vec::new(),
            catch_all: false,
            default: None,
            serializer: None,
            deserializer: None,
        }
    }

    /// A property read through `get` on encode and handed to the creator on decode.
    pub fn field<O: Any, T: Typed>(name: &'static str, get: fn(&O) -> &T) -> Self {
        Self::with_type(name, T::type_ref(), Some(erase_getter(get)))
    }

    /// A decode-only property without accessor.
    pub fn setter<T: Typed>(name: &'static str) -> Self {
        let mut prop = Self::with_type(name, T::type_ref(), None);
        prop.access = Access::WriteOnly;
        prop
    }

    /// The back side of a managed/back pair. Never on the wire.
    pub fn back<O: Any, T: Typed + Send + Sync>(
        name: &'static str,
        get: fn(&O) -> &BackRef<T>,
    ) -> Self {
        let mut prop = Self::with_type(name, BackRef::<T>::type_ref(), Some(erase_getter(get)));
        prop.role = ReferenceRole::Back;
        prop
    }

    // ---- builder ----

    /// Uses `wire_name` instead of the naming strategy's translation.
    pub fn rename(mut self, wire_name: impl Into<String>) -> Self {
        self.rename = Some(wire_name.into());
        self
    }

    /// Another wire name accepted on decode.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn inclusion(mut self, inclusion: Inclusion) -> Self {
        self.inclusion = Some(inclusion);
        self
    }

    /// Excludes the property in both directions.
    pub fn ignored(mut self) -> Self {
        self.inclusion = Some(Inclusion::Never);
        self.access = Access::ReadOnly;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.access = Access::WriteOnly;
        self
    }

    /// The owning side of a managed/back pair.
    pub fn managed(mut self) -> Self {
        self.role = ReferenceRole::Managed;
        self
    }

    /// Nests the value one level under `name`.
    pub fn wrapped(mut self, name: impl Into<String>) -> Self {
        self.wrapper = Some(name.into());
        self
    }

    /// Flattens the nested object's properties into the parent.
    pub fn unwrapped(mut self, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.unwrapped = Some(Unwrapped {
            prefix: prefix.into(),
            suffix: suffix.into(),
        });
        self
    }

    /// Explicit position. Unordered properties follow, in declaration order.
    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Adds the property to a view.
    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.views.push(view.into());
        self
    }

    /// Marks the string keyed map that collects and emits unmapped keys.
    pub fn catch_all(mut self) -> Self {
        self.catch_all = true;
        self
    }

    /// Value used when the property is absent on decode.
    pub fn default_value<T: Any>(mut self, f: fn() -> T) -> Self {
        self.default = Some(Arc::new(move || Box::new(f()) as Box<dyn Any>));
        self
    }

    pub fn serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn deserializer(mut self, deserializer: Arc<dyn Deserializer>) -> Self {
        self.deserializer = Some(deserializer);
        self
    }

    /// Writes the property as an `S` made by `convert`.
    pub fn serialize_as<T: Any, S: Typed>(self, convert: fn(&T) -> S) -> Self {
        self.serializer(serializer_as(convert))
    }

    /// Reads the property as an `S` and converts it with `convert`.
    pub fn deserialize_as<S: Typed, T: Any>(self, convert: fn(S) -> T) -> Self {
        self.deserializer(deserializer_as(convert))
    }

    // ---- accessors ----

    /// The declared name, also the key in [`PropertyValues`](super::PropertyValues).
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Reads the property out of its owner.
    pub fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any> {
        self.getter.as_ref().and_then(|get| get(owner))
    }

    #[inline]
    pub fn explicit_wire_name(&self) -> Option<&str> {
        self.rename.as_deref()
    }

    /// The name on the wire, final once the registry is built.
    #[inline]
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub(crate) fn set_wire_name(&mut self, wire_name: String) {
        self.wire_name = wire_name;
    }

    #[inline]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    #[inline]
    pub fn declared_inclusion(&self) -> Option<Inclusion> {
        self.inclusion
    }

    pub(crate) fn set_inclusion(&mut self, inclusion: Inclusion) {
        self.inclusion = Some(inclusion);
    }

    pub(crate) fn set_ignored(&mut self) {
        self.inclusion = Some(Inclusion::Never);
        self.access = Access::ReadOnly;
    }

    /// The inclusion in effect, final once the registry is built.
    #[inline]
    pub fn effective_inclusion(&self) -> Inclusion {
        self.inclusion.unwrap_or_default()
    }

    #[inline]
    pub fn access(&self) -> Access {
        self.access
    }

    #[inline]
    pub fn role(&self) -> ReferenceRole {
        self.role
    }

    #[inline]
    pub fn wrapper(&self) -> Option<&str> {
        self.wrapper.as_deref()
    }

    #[inline]
    pub fn unwrapped_spec(&self) -> Option<&Unwrapped> {
        self.unwrapped.as_ref()
    }

    #[inline]
    pub fn order_index(&self) -> Option<i32> {
        self.order
    }

    /// Whether the property takes part in `view`. No view means every property.
    pub fn in_view(&self, view: Option<&str>) -> bool {
        match view {
            None => true,
            Some(view) => self.views.is_empty() || self.views.iter().any(|v| v == view),
        }
    }

    #[inline]
    pub fn is_catch_all(&self) -> bool {
        self.catch_all
    }

    pub fn default_of(&self) -> Option<Box<dyn Any>> {
        self.default.as_ref().map(|f| f())
    }

    #[inline]
    pub fn custom_serializer(&self) -> Option<&Arc<dyn Serializer>> {
        self.serializer.as_ref()
    }

    #[inline]
    pub fn custom_deserializer(&self) -> Option<&Arc<dyn Deserializer>> {
        self.deserializer.as_ref()
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("wire_name", &self.wire_name)
            .field("ty", &self.ty)
            .field("aliases", &self.aliases)
            .field("inclusion", &self.inclusion)
            .field("access", &self.access)
            .field("role", &self.role)
            .field("wrapper", &self.wrapper)
            .field("unwrapped", &self.unwrapped)
            .field("order", &self.order)
            .field("views", &self.views)
            .field("catch_all", &self.catch_all)
            .finish_non_exhaustive()
    }
}
