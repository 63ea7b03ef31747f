use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::Shape;

// -----------------------------------------------------------------------------
// TypeRef

/// A type together with its generic type arguments.
///
/// `TypeRef` is the key of every registry lookup. Equality and hashing
/// are structural over the raw type path and the ordered arguments, so
/// `Vec<Foo>` and `Vec<Bar>` are different keys that share the raw
/// path `alloc::vec::Vec`.
///
/// Cloning is a reference count increment.
#[derive(Clone)]
pub struct TypeRef(Arc<Inner>);

struct Inner {
    id: TypeId,
    path: &'static str,
    args: Box<[TypeRef]>,
    shape: Shape,
    display: String,
}

impl TypeRef {
    /// Creates the reference of `T`, with raw `path` and generic `args`.
    pub fn new<T: Any>(path: &'static str, args: Vec<TypeRef>, shape: Shape) -> Self {
        let display = if args.is_empty() {
            path.to_owned()
        } else {
            let args: Vec<&str> = args.iter().map(|arg| arg.0.display.as_str()).collect();
            format!("{path}<{}>", args.join(", "))
        };
        Self(Arc::new(Inner {
            id: TypeId::of::<T>(),
            path,
            args: args.into_boxed_slice(),
            shape,
            display,
        }))
    }

    /// Creates the reference of a non generic type without container shape.
    #[inline]
    pub fn plain<T: Any>(path: &'static str) -> Self {
        Self::new::<T>(path, Vec::new(), Shape::Plain)
    }

    /// The [`TypeId`] of the fully parameterized type.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.0.id
    }

    /// Whether this is the reference of `T`.
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.0.id == TypeId::of::<T>()
    }

    /// The raw type path, without arguments, e.g. `alloc::vec::Vec`.
    #[inline]
    pub fn path(&self) -> &'static str {
        self.0.path
    }

    /// The last segment of the raw path, e.g. `Vec`.
    pub fn simple_name(&self) -> &'static str {
        match self.0.path.rfind("::") {
            Some(index) => &self.0.path[index + 2..],
            None => self.0.path,
        }
    }

    #[inline]
    pub fn args(&self) -> &[TypeRef] {
        &self.0.args
    }

    #[inline]
    pub fn arg(&self, index: usize) -> Option<&TypeRef> {
        self.0.args.get(index)
    }

    #[inline]
    pub fn is_generic(&self) -> bool {
        !self.0.args.is_empty()
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.0.shape
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.path == other.0.path && self.0.args == other.0.args)
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.path.hash(state);
        self.0.args.hash(state);
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.display)
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.0.display)
    }
}

// -----------------------------------------------------------------------------
// Typed

/// A type with a static [`TypeRef`].
///
/// Implemented for the builtin scalars and containers, and by the
/// descriptor provider (or [`impl_typed!`](crate::impl_typed)) for user types.
pub trait Typed: Any {
    fn type_ref() -> TypeRef;
}

/// Implements [`Typed`] for a type without generic parameters.
///
/// The default path is `module_path!()` followed by the type name.
///
/// ```
/// struct Point { x: i32, y: i32 }
///
/// weft_codec::impl_typed!(Point);
///
/// use weft_codec::info::Typed;
/// assert_eq!(Point::type_ref().simple_name(), "Point");
/// ```
#[macro_export]
macro_rules! impl_typed {
    ($ty:ident) => {
        $crate::impl_typed!($ty, concat!(module_path!(), "::", stringify!($ty)));
    };
    ($ty:ty, $path:expr) => {
        impl $crate::info::Typed for $ty {
            fn type_ref() -> $crate::info::TypeRef {
                static CELL: $crate::info::TypeRefCell = $crate::info::TypeRefCell::new();
                CELL.get_or_init(|| $crate::info::TypeRef::plain::<$ty>($path))
            }
        }
    };
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use crate::info::Typed;
    use std::collections::BTreeMap;

    #[test]
    fn structural_equality() {
        assert_eq!(<Vec<u8>>::type_ref(), <Vec<u8>>::type_ref());
        assert_ne!(<Vec<u8>>::type_ref(), <Vec<u16>>::type_ref());
        assert_eq!(<Vec<u8>>::type_ref().path(), <Vec<u16>>::type_ref().path());
    }

    #[test]
    fn display_with_arguments() {
        let ty = <BTreeMap<String, Vec<Option<i32>>>>::type_ref();
        assert_eq!(
            ty.to_string(),
            concat!(
                "alloc::collections::BTreeMap<alloc::string::String, ",
                "alloc::vec::Vec<core::option::Option<i32>>>",
            )
        );
        assert_eq!(ty.simple_name(), "BTreeMap");
        assert_eq!(ty.args().len(), 2);
    }

    struct Marker;
    crate::impl_typed!(Marker);

    #[test]
    fn impl_typed_uses_module_path() {
        assert_eq!(Marker::type_ref().path(), "weft_codec::info::type_ref::tests::Marker");
        assert!(Marker::type_ref().is::<Marker>());
    }
}
