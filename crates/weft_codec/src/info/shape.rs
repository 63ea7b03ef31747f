//! Structural access to container types without knowing them statically.
//!
//! Codecs receive values as `&dyn Any` and produce `Box<dyn Any>`. A
//! container codec reaches the elements through the function tables of
//! the [`Shape`] stored in the container's [`TypeRef`](super::TypeRef).
//!
//! Every function returns `None` when handed a value of another type.

use std::any::Any;

use crate::reference::BackLink;

/// How a type is laid out, as far as the builtin codecs care.
#[derive(Clone, Copy)]
pub enum Shape {
    /// Scalars and user types, handled by their own codec.
    Plain,
    Sequence(SeqOps),
    /// A map with string keys.
    Map(MapOps),
    Optional(OptionOps),
    /// `Box` and `Arc`.
    Pointer(PointerOps),
    BackReference(BackRefOps),
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Plain => "plain",
            Shape::Sequence(_) => "sequence",
            Shape::Map(_) => "map",
            Shape::Optional(_) => "optional",
            Shape::Pointer(_) => "pointer",
            Shape::BackReference(_) => "back reference",
        }
    }
}

/// Element iterator over an erased sequence.
pub type ElementIter<'a> = Box<dyn Iterator<Item = &'a dyn Any> + 'a>;

/// Entry iterator over an erased map.
pub type EntryIter<'a> = Box<dyn Iterator<Item = (&'a str, &'a dyn Any)> + 'a>;

#[derive(Clone, Copy)]
pub struct SeqOps {
    pub len: fn(&dyn Any) -> Option<usize>,
    pub iter: for<'a> fn(&'a dyn Any) -> Option<ElementIter<'a>>,
    /// Builds the sequence, `None` if an element has the wrong type.
    pub collect: fn(Vec<Box<dyn Any>>) -> Option<Box<dyn Any>>,
}

#[derive(Clone, Copy)]
pub struct MapOps {
    pub len: fn(&dyn Any) -> Option<usize>,
    pub iter: for<'a> fn(&'a dyn Any) -> Option<EntryIter<'a>>,
    pub collect: fn(Vec<(String, Box<dyn Any>)>) -> Option<Box<dyn Any>>,
}

#[derive(Clone, Copy)]
pub struct OptionOps {
    /// `Some(None)` for an empty option.
    pub get: for<'a> fn(&'a dyn Any) -> Option<Option<&'a dyn Any>>,
    pub none: fn() -> Box<dyn Any>,
    pub some: fn(Box<dyn Any>) -> Option<Box<dyn Any>>,
}

#[derive(Clone, Copy)]
pub struct PointerOps {
    pub get: for<'a> fn(&'a dyn Any) -> Option<&'a dyn Any>,
    pub wrap: fn(Box<dyn Any>) -> Option<Box<dyn Any>>,
    /// Points back links at the pointee. Only shared pointers have one.
    pub link: Option<fn(&dyn Any, &[BackLink]) -> bool>,
}

#[derive(Clone, Copy)]
pub struct BackRefOps {
    /// Address of the current target, `Some(None)` when unset.
    pub target: fn(&dyn Any) -> Option<Option<usize>>,
    pub create: fn(BackLink) -> Box<dyn Any>,
}

/// Identity of an erased value, as used by the reference scope.
#[inline]
pub fn address_of(value: &dyn Any) -> usize {
    value as *const dyn Any as *const () as usize
}
