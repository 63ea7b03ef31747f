//! [`Typed`] for scalars and standard containers.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use super::{
    ElementIter, EntryIter, GenericTypeRefCell, MapOps, OptionOps, PointerOps, SeqOps, Shape,
    TypeRef, TypeRefCell, Typed,
};
use crate::reference::link_shared;

// -----------------------------------------------------------------------------
// Scalars

macro_rules! impl_scalar_typed {
    ($($ty:ty => $path:literal),* $(,)?) => {
        $(
            impl Typed for $ty {
                fn type_ref() -> TypeRef {
                    static CELL: TypeRefCell = TypeRefCell::new();
                    CELL.get_or_init(|| TypeRef::plain::<$ty>($path))
                }
            }
        )*
    };
}

impl_scalar_typed! {
    bool => "bool",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    isize => "isize",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
    f32 => "f32",
    f64 => "f64",
    char => "char",
    String => "alloc::string::String",
    crate::Bytes => "weft_codec::Bytes",
}

// -----------------------------------------------------------------------------
// Sequences

trait Sequence: Any + Sized {
    type Item: Any;

    fn length(&self) -> usize;

    fn elements(&self) -> impl Iterator<Item = &Self::Item>;

    fn from_elements(items: Vec<Self::Item>) -> Self;
}

impl<T: Any> Sequence for Vec<T> {
    type Item = T;

    fn length(&self) -> usize {
        self.len()
    }

    fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    fn from_elements(items: Vec<T>) -> Self {
        items
    }
}

impl<T: Any> Sequence for VecDeque<T> {
    type Item = T;

    fn length(&self) -> usize {
        self.len()
    }

    fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    fn from_elements(items: Vec<T>) -> Self {
        items.into()
    }
}

fn seq_len<S: Sequence>(value: &dyn Any) -> Option<usize> {
    value.downcast_ref::<S>().map(S::length)
}

fn seq_iter<'a, S: Sequence>(value: &'a dyn Any) -> Option<ElementIter<'a>> {
    let seq = value.downcast_ref::<S>()?;
    Some(Box::new(seq.elements().map(|item| item as &dyn Any)))
}

fn seq_collect<S: Sequence>(items: Vec<Box<dyn Any>>) -> Option<Box<dyn Any>> {
    let items = items
        .into_iter()
        .map(|item| item.downcast::<S::Item>().ok().map(|item| *item))
        .collect::<Option<Vec<_>>>()?;
    Some(Box::new(S::from_elements(items)))
}

fn seq_ops<S: Sequence>() -> SeqOps {
    SeqOps {
        len: seq_len::<S>,
        iter: seq_iter::<S>,
        collect: seq_collect::<S>,
    }
}

impl<T: Typed> Typed for Vec<T> {
    fn type_ref() -> TypeRef {
        static CELL: GenericTypeRefCell = GenericTypeRefCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeRef::new::<Self>(
                "alloc::vec::Vec",
                vec![T::type_ref()],
                Shape::Sequence(seq_ops::<Self>()),
            )
        })
    }
}

impl<T: Typed> Typed for VecDeque<T> {
    fn type_ref() -> TypeRef {
        static CELL: GenericTypeRefCell = GenericTypeRefCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeRef::new::<Self>(
                "alloc::collections::VecDeque",
                vec![T::type_ref()],
                Shape::Sequence(seq_ops::<Self>()),
            )
        })
    }
}

// -----------------------------------------------------------------------------
// String keyed maps

trait StringMap: Any + Sized {
    type Value: Any;

    fn length(&self) -> usize;

    fn entries(&self) -> impl Iterator<Item = (&String, &Self::Value)>;

    fn from_entries(entries: Vec<(String, Self::Value)>) -> Self;
}

impl<V: Any> StringMap for BTreeMap<String, V> {
    type Value = V;

    fn length(&self) -> usize {
        self.len()
    }

    fn entries(&self) -> impl Iterator<Item = (&String, &V)> {
        self.iter()
    }

    fn from_entries(entries: Vec<(String, V)>) -> Self {
        entries.into_iter().collect()
    }
}

impl<V: Any> StringMap for HashMap<String, V> {
    type Value = V;

    fn length(&self) -> usize {
        self.len()
    }

    fn entries(&self) -> impl Iterator<Item = (&String, &V)> {
        self.iter()
    }

    fn from_entries(entries: Vec<(String, V)>) -> Self {
        entries.into_iter().collect()
    }
}

fn map_len<M: StringMap>(value: &dyn Any) -> Option<usize> {
    value.downcast_ref::<M>().map(M::length)
}

fn map_iter<'a, M: StringMap>(value: &'a dyn Any) -> Option<EntryIter<'a>> {
    let map = value.downcast_ref::<M>()?;
    Some(Box::new(
        map.entries()
            .map(|(key, value)| (key.as_str(), value as &dyn Any)),
    ))
}

fn map_collect<M: StringMap>(entries: Vec<(String, Box<dyn Any>)>) -> Option<Box<dyn Any>> {
    let entries = entries
        .into_iter()
        .map(|(key, value)| value.downcast::<M::Value>().ok().map(|value| (key, *value)))
        .collect::<Option<Vec<_>>>()?;
    Some(Box::new(M::from_entries(entries)))
}

fn map_ops<M: StringMap>() -> MapOps {
    MapOps {
        len: map_len::<M>,
        iter: map_iter::<M>,
        collect: map_collect::<M>,
    }
}

impl<V: Typed> Typed for BTreeMap<String, V> {
    fn type_ref() -> TypeRef {
        static CELL: GenericTypeRefCell = GenericTypeRefCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeRef::new::<Self>(
                "alloc::collections::BTreeMap",
                vec![String::type_ref(), V::type_ref()],
                Shape::Map(map_ops::<Self>()),
            )
        })
    }
}

impl<V: Typed> Typed for HashMap<String, V> {
    fn type_ref() -> TypeRef {
        static CELL: GenericTypeRefCell = GenericTypeRefCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeRef::new::<Self>(
                "std::collections::HashMap",
                vec![String::type_ref(), V::type_ref()],
                Shape::Map(map_ops::<Self>()),
            )
        })
    }
}

// -----------------------------------------------------------------------------
// Option

fn option_get<'a, T: Any>(value: &'a dyn Any) -> Option<Option<&'a dyn Any>> {
    let option = value.downcast_ref::<Option<T>>()?;
    Some(option.as_ref().map(|inner| inner as &dyn Any))
}

fn option_none<T: Any>() -> Box<dyn Any> {
    Box::new(None::<T>)
}

fn option_some<T: Any>(inner: Box<dyn Any>) -> Option<Box<dyn Any>> {
    let inner = inner.downcast::<T>().ok()?;
    Some(Box::new(Some(*inner)))
}

impl<T: Typed> Typed for Option<T> {
    fn type_ref() -> TypeRef {
        static CELL: GenericTypeRefCell = GenericTypeRefCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeRef::new::<Self>(
                "core::option::Option",
                vec![T::type_ref()],
                Shape::Optional(OptionOps {
                    get: option_get::<T>,
                    none: option_none::<T>,
                    some: option_some::<T>,
                }),
            )
        })
    }
}

// -----------------------------------------------------------------------------
// Pointers

fn box_get<'a, T: Any>(value: &'a dyn Any) -> Option<&'a dyn Any> {
    value.downcast_ref::<Box<T>>().map(|inner| &**inner as &dyn Any)
}

fn box_wrap<T: Any>(inner: Box<dyn Any>) -> Option<Box<dyn Any>> {
    let inner = inner.downcast::<T>().ok()?;
    Some(Box::new(inner))
}

fn arc_get<'a, T: Any + Send + Sync>(value: &'a dyn Any) -> Option<&'a dyn Any> {
    value.downcast_ref::<Arc<T>>().map(|inner| &**inner as &dyn Any)
}

fn arc_wrap<T: Any + Send + Sync>(inner: Box<dyn Any>) -> Option<Box<dyn Any>> {
    let inner = inner.downcast::<T>().ok()?;
    Some(Box::new(Arc::<T>::from(inner)))
}

impl<T: Typed> Typed for Box<T> {
    fn type_ref() -> TypeRef {
        static CELL: GenericTypeRefCell = GenericTypeRefCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeRef::new::<Self>(
                "alloc::boxed::Box",
                vec![T::type_ref()],
                Shape::Pointer(PointerOps {
                    get: box_get::<T>,
                    wrap: box_wrap::<T>,
                    link: None,
                }),
            )
        })
    }
}

impl<T: Typed + Send + Sync> Typed for Arc<T> {
    fn type_ref() -> TypeRef {
        static CELL: GenericTypeRefCell = GenericTypeRefCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeRef::new::<Self>(
                "alloc::sync::Arc",
                vec![T::type_ref()],
                Shape::Pointer(PointerOps {
                    get: arc_get::<T>,
                    wrap: arc_wrap::<T>,
                    link: Some(link_shared::<T>),
                }),
            )
        })
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use crate::info::{Shape, Typed};
    use std::any::Any;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[test]
    fn sequence_ops_round_trip() {
        let ty = <Vec<i32>>::type_ref();
        let Shape::Sequence(ops) = ty.shape() else {
            panic!("expected a sequence");
        };
        let value = vec![1, 2, 3];
        assert_eq!((ops.len)(&value), Some(3));
        let items: Vec<i32> = (ops.iter)(&value)
            .unwrap()
            .map(|item| *item.downcast_ref::<i32>().unwrap())
            .collect();
        assert_eq!(items, [1, 2, 3]);

        let rebuilt = (ops.collect)(vec![Box::new(4) as Box<dyn Any>, Box::new(5)]).unwrap();
        assert_eq!(*rebuilt.downcast::<Vec<i32>>().unwrap(), vec![4, 5]);
        assert!((ops.collect)(vec![Box::new("x") as Box<dyn Any>]).is_none());
        assert!((ops.len)(&"not a vec").is_none());
    }

    #[test]
    fn map_ops_keep_keys() {
        let ty = <BTreeMap<String, u8>>::type_ref();
        let Shape::Map(ops) = ty.shape() else {
            panic!("expected a map");
        };
        let value = BTreeMap::from([("a".to_owned(), 1_u8), ("b".to_owned(), 2)]);
        let keys: Vec<&str> = (ops.iter)(&value).unwrap().map(|(key, _)| key).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn option_and_arc_ops() {
        let Shape::Optional(ops) = <Option<String>>::type_ref().shape().clone() else {
            panic!("expected an option");
        };
        assert!(matches!((ops.get)(&None::<String>), Some(None)));
        let some = (ops.some)(Box::new(String::from("x"))).unwrap();
        assert_eq!(*some.downcast::<Option<String>>().unwrap(), Some("x".to_owned()));

        let Shape::Pointer(ops) = <Arc<u8>>::type_ref().shape().clone() else {
            panic!("expected a pointer");
        };
        assert!(ops.link.is_some());
        let wrapped = (ops.wrap)(Box::new(7_u8)).unwrap();
        assert_eq!(**wrapped.downcast::<Arc<u8>>().unwrap(), 7);
    }
}
