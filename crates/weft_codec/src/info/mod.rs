//! Type information consumed by the codecs.
//!
//! - [`TypeRef`] and [`Typed`]: a type with its generic arguments.
//! - [`Shape`]: erased access to containers.
//! - [`PropertyDescriptor`], [`ObjectDescriptor`], [`SubtypeMapping`]:
//!   the declarative description of how a type maps to the wire, built
//!   once by the descriptor provider and immutable afterwards.

// -----------------------------------------------------------------------------
// Modules

mod cell;
mod descriptor;
mod impls;
mod property;
mod shape;
mod subtype;
mod type_ref;

// -----------------------------------------------------------------------------
// Exports

pub use cell::{GenericTypeRefCell, TypeRefCell};
pub use descriptor::{Creator, DelegateFn, GetDescriptor, ObjectDescriptor, PropertiesFn};
pub use descriptor::{PropertyValues, TypeDescriptor};
pub use property::{Access, Inclusion, ReferenceRole, Unwrapped};
pub use property::{ErasedDefault, ErasedGetter, PropertyDescriptor, erase_getter};
pub use shape::{BackRefOps, MapOps, OptionOps, PointerOps, SeqOps, Shape};
pub use shape::{ElementIter, EntryIter, address_of};
pub use subtype::{DiscriminatorKind, DiscriminatorValue, Subtype};
pub use subtype::{SubtypeMapping, SubtypeMappingBuilder};
pub use type_ref::{TypeRef, Typed};
