//! Static storage for [`TypeRef`]s.
//!
//! A `Typed` impl builds its `TypeRef` once and keeps it in a `static`:
//!
//! - [`TypeRefCell`] for non generic types, a plain [`OnceLock`].
//! - [`GenericTypeRefCell`] for generic types. The `static` inside a generic
//!   function is shared by every instantiation, so the cell is a
//!   [`TypeIdMap`] behind a [`RwLock`].

use std::any::{Any, TypeId};
use std::sync::{OnceLock, PoisonError, RwLock};

use weft_utils::TypeIdMap;

use super::TypeRef;

/// Static storage of the [`TypeRef`] of a non generic type.
///
/// ```
/// use weft_codec::info::{Shape, TypeRef, TypeRefCell, Typed};
///
/// struct Meters(f64);
///
/// impl Typed for Meters {
///     fn type_ref() -> TypeRef {
///         static CELL: TypeRefCell = TypeRefCell::new();
///         CELL.get_or_init(|| TypeRef::new::<Meters>("demo::Meters", Vec::new(), Shape::Plain))
///     }
/// }
///
/// assert_eq!(Meters::type_ref().simple_name(), "Meters");
/// ```
pub struct TypeRefCell(OnceLock<TypeRef>);

impl TypeRefCell {
    #[inline]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    #[inline]
    pub fn get_or_init(&self, f: impl FnOnce() -> TypeRef) -> TypeRef {
        self.0.get_or_init(f).clone()
    }
}

/// Static storage of the [`TypeRef`]s of a generic type, one per instantiation.
pub struct GenericTypeRefCell(RwLock<TypeIdMap<TypeRef>>);

impl GenericTypeRefCell {
    #[inline]
    pub const fn new() -> Self {
        Self(RwLock::new(TypeIdMap::new()))
    }

    /// Returns the `TypeRef` stored for `G`, building it with `f` on first use.
    ///
    /// `f` runs without holding the lock, so it may resolve the type
    /// arguments through this same cell. Two threads racing on the same
    /// key both build a value and the first insert wins.
    #[inline(always)]
    pub fn get_or_insert<G: Any + ?Sized>(&self, f: impl FnOnce() -> TypeRef) -> TypeRef {
        self.get_or_insert_by_type_id(TypeId::of::<G>(), f)
    }

    #[inline(never)]
    fn get_or_insert_by_type_id(&self, type_id: TypeId, f: impl FnOnce() -> TypeRef) -> TypeRef {
        let cached = self
            .0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .cloned();
        if let Some(ty) = cached {
            return ty;
        }
        let built = f();
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(type_id, || built)
            .clone()
    }
}
