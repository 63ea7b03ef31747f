//! Managed and back references.
//!
//! A managed property owns a child value; a back property inside that
//! child points at the owner. Only the managed side is on the wire.
//!
//! On encode the [`ReferenceScope`] remembers every owner whose managed
//! property is being written, and a back property whose target is among
//! them writes nothing.
//!
//! On decode a back property is created empty and attached to the
//! innermost open managed slot. Once the owner is built and placed in
//! an `Arc`, the `Arc` codec points every attached link at it. Links
//! still dangling when the call ends are a structural error.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, Weak};

use weft_utils::hash::AddressSet;

use crate::error::CodecError;
use crate::info::{BackRefOps, GenericTypeRefCell, Shape, TypeRef, Typed, address_of};

/// Shared slot filled with the owner once it is known.
pub type BackLink = Arc<OnceLock<Weak<dyn Any + Send + Sync>>>;

// -----------------------------------------------------------------------------
// BackRef

/// The back side of a managed/back reference pair.
///
/// Holds a weak pointer to an owner living in an [`Arc`].
pub struct BackRef<T> {
    link: BackLink,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> BackRef<T> {
    /// An unset reference.
    pub fn new() -> Self {
        Self::from_link(Arc::new(OnceLock::new()))
    }

    /// A reference to `target`, usually from inside [`Arc::new_cyclic`].
    pub fn from_weak(target: Weak<T>) -> Self {
        let link: BackLink = Arc::new(OnceLock::new());
        let _ = link.set(target);
        Self::from_link(link)
    }

    fn from_link(link: BackLink) -> Self {
        Self {
            link,
            _marker: PhantomData,
        }
    }

    /// The owner, if set and still alive.
    pub fn get(&self) -> Option<Arc<T>> {
        self.link.get()?.upgrade()?.downcast::<T>().ok()
    }

    /// Whether the reference was linked, regardless of the owner being alive.
    pub fn is_set(&self) -> bool {
        self.link.get().is_some()
    }

    fn target_address(&self) -> Option<usize> {
        let owner = self.link.get()?.upgrade()?;
        Some(Arc::as_ptr(&owner) as *const () as usize)
    }
}

impl<T: Any + Send + Sync> Default for BackRef<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BackRef<T> {
    fn clone(&self) -> Self {
        Self {
            link: Arc::clone(&self.link),
            _marker: PhantomData,
        }
    }
}

impl<T: Any + Send + Sync> fmt::Debug for BackRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target_address() {
            Some(address) => write!(f, "BackRef({address:#x})"),
            None => f.write_str("BackRef(unset)"),
        }
    }
}

/// Two back references are equal when they point at the same owner.
impl<T: Any + Send + Sync> PartialEq for BackRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.target_address() == other.target_address()
    }
}

impl<T: Typed + Send + Sync> Typed for BackRef<T> {
    fn type_ref() -> TypeRef {
        static CELL: GenericTypeRefCell = GenericTypeRefCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeRef::new::<Self>(
                "weft_codec::reference::BackRef",
                vec![T::type_ref()],
                Shape::BackReference(BackRefOps {
                    target: back_ref_target::<T>,
                    create: back_ref_create::<T>,
                }),
            )
        })
    }
}

fn back_ref_target<T: Any + Send + Sync>(value: &dyn Any) -> Option<Option<usize>> {
    value.downcast_ref::<BackRef<T>>().map(BackRef::target_address)
}

fn back_ref_create<T: Any + Send + Sync>(link: BackLink) -> Box<dyn Any> {
    Box::new(BackRef::<T>::from_link(link))
}

/// Points `links` at the `Arc<T>` in `value`.
pub(crate) fn link_shared<T: Any + Send + Sync>(value: &dyn Any, links: &[BackLink]) -> bool {
    let Some(shared) = value.downcast_ref::<Arc<T>>() else {
        return false;
    };
    for link in links {
        let weak: Weak<T> = Arc::downgrade(shared);
        let _ = link.set(weak as Weak<dyn Any + Send + Sync>);
    }
    true
}

// -----------------------------------------------------------------------------
// ReferenceScope

/// Links produced inside one finished owner, waiting for its `Arc`.
struct Pending {
    depth: usize,
    owner: TypeId,
    links: Vec<BackLink>,
}

/// Per-call identity table for managed/back reference pairs.
///
/// Created by the mapper for one top-level call and dropped with it.
#[derive(Default)]
pub struct ReferenceScope {
    owners: AddressSet,
    slots: Vec<Vec<BackLink>>,
    depth: usize,
    pending: Vec<Pending>,
    dangling: usize,
}

impl ReferenceScope {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- encode side ----

    /// Records `owner` before its managed property is written.
    pub fn enter_managed(&mut self, owner: &dyn Any) {
        self.owners.insert(address_of(owner));
    }

    /// Checks a back property whose value is `value` with type `ty`.
    ///
    /// Returns an error when the target was never entered as an owner.
    pub fn check_back(&self, value: &dyn Any, ty: &TypeRef) -> Result<(), CodecError> {
        let Shape::BackReference(ops) = ty.shape() else {
            return Err(CodecError::config("back property is not a `BackRef`").in_type(ty));
        };
        match (ops.target)(value) {
            None => Err(CodecError::type_mismatch(ty.path(), "another type").in_type(ty)),
            Some(None) => Ok(()),
            Some(Some(address)) if self.owners.contains(&address) => Ok(()),
            Some(Some(_)) => Err(CodecError::structural(
                "back reference target was not written through a managed property",
            )
            .in_type(ty)),
        }
    }

    // ---- decode side ----

    /// Opens a slot for back references created while decoding a managed value.
    pub fn open_slot(&mut self) {
        self.slots.push(Vec::new());
    }

    /// Closes the innermost slot and returns its links.
    pub fn close_slot(&mut self) -> Vec<BackLink> {
        self.slots.pop().unwrap_or_default()
    }

    /// Creates the value of a back property, attached to the innermost slot.
    pub fn create_back(&mut self, ty: &TypeRef) -> Result<Box<dyn Any>, CodecError> {
        let Shape::BackReference(ops) = ty.shape() else {
            return Err(CodecError::config("back property is not a `BackRef`").in_type(ty));
        };
        let Some(slot) = self.slots.last_mut() else {
            return Err(CodecError::structural(
                "back reference decoded outside of a managed property",
            )
            .in_type(ty));
        };
        let link: BackLink = Arc::new(OnceLock::new());
        slot.push(Arc::clone(&link));
        self.dangling += 1;
        Ok((ops.create)(link))
    }

    /// Enters one object level.
    pub fn enter_object(&mut self) {
        self.discard_unclaimed();
        self.depth += 1;
    }

    /// Leaves one object level. `links` are the back links of the finished
    /// object of type `owner`, which the enclosing `Arc` will fulfill.
    pub fn leave_object(&mut self, owner: TypeId, links: Vec<BackLink>) {
        self.discard_unclaimed();
        self.depth = self.depth.saturating_sub(1);
        if !links.is_empty() {
            self.pending.push(Pending {
                depth: self.depth,
                owner,
                links,
            });
        }
    }

    /// Drops links of an owner finished at the current depth.
    ///
    /// An `Arc` claims the links of its owner right after the owner is
    /// built, so links still waiting when the next object starts or the
    /// enclosing one ends belong to an owner decoded by value. They stay
    /// counted as dangling and `finish` reports them.
    fn discard_unclaimed(&mut self) {
        let depth = self.depth;
        self.pending.retain(|pending| pending.depth != depth);
    }

    /// Current object depth, recorded by a shared pointer before decoding its pointee.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Takes the links waiting for an owner of type `owner` finished at `depth`.
    pub fn take_pending(&mut self, depth: usize, owner: TypeId) -> Vec<BackLink> {
        let mut taken = Vec::new();
        self.pending.retain_mut(|pending| {
            if pending.depth == depth && pending.owner == owner {
                taken.append(&mut pending.links);
                false
            } else {
                true
            }
        });
        self.dangling = self.dangling.saturating_sub(taken.len());
        taken
    }

    /// Reassigns the links of an owner finished at `depth` from type `from` to
    /// type `to`, used when a concrete subtype is stored as its base type.
    pub fn retag_pending(&mut self, depth: usize, from: TypeId, to: TypeId) {
        for pending in &mut self.pending {
            if pending.depth == depth && pending.owner == from {
                pending.owner = to;
            }
        }
    }

    /// Fails if a back reference was never linked to its owner.
    pub fn finish(&self) -> Result<(), CodecError> {
        if self.dangling == 0 {
            Ok(())
        } else {
            Err(CodecError::structural(
                "owner of a back reference must be decoded into an `Arc`",
            ))
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
