//! # Handles
//!
//! The copyable front-end the rest of the engine sees. A [`Handle`] is a
//! pointer into pool storage plus a keep-alive reference to the pool's
//! shared state; it never allocates or frees memory itself, it only drives
//! the payload's intrusive refcount.

#![allow(unsafe_code)]

use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;
use std::rc::Rc;

use super::allocator::{PoolInner, Slot, SlotState};
use super::refcount::RefCounted;

/// Shared-ownership handle over one pooled payload.
///
/// Cloning increments the payload's refcount; dropping decrements it and,
/// on the zero transition, marks the slot as garbage in the owning pool.
/// Moves are plain Rust moves and touch no count. Dereferencing yields `&T`;
/// payloads expose their mutable surface through interior mutability, since
/// any number of handles may alias one slot.
///
/// Using a handle after its slot was force-released by `free_all` is a
/// caller bug: it asserts in debug builds and is undefined in release.
pub struct Handle<T: RefCounted> {
    slot: NonNull<Slot<T>>,
    pool: Rc<PoolInner<T>>,
}

impl<T: RefCounted> Handle<T> {
    /// Defining first reference: takes the freshly constructed payload's
    /// count from zero to one.
    pub(crate) fn first(slot: NonNull<Slot<T>>, pool: Rc<PoolInner<T>>) -> Self {
        let handle = Self { slot, pool };
        handle.payload().ref_count().inc();
        handle
    }

    /// Additional reference over an already-live slot (adopt path).
    pub(crate) fn retain(slot: NonNull<Slot<T>>, pool: Rc<PoolInner<T>>) -> Self {
        let handle = Self { slot, pool };
        handle.payload().ref_count().inc();
        handle
    }

    fn payload(&self) -> &T {
        // SAFETY: the slot was live when this handle was created and our
        // refcount contribution keeps it live; the pool Rc keeps the block
        // storage alive. The state check catches use-after-free_all in
        // debug builds.
        unsafe {
            let slot = self.slot.as_ref();
            debug_assert_eq!(
                slot.state.get(),
                SlotState::Live,
                "handle used after its slot was released"
            );
            (*slot.value.get()).assume_init_ref()
        }
    }

    /// Stable address of the payload, for identity comparisons and for
    /// round-tripping through native APIs (see `BlockAllocator::adopt`).
    #[must_use]
    pub fn payload_ptr(&self) -> NonNull<T> {
        self.slot.cast()
    }

    /// Whether two handles reference the same slot.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }

    /// Downgrades into the read-only capability wrapper.
    #[must_use]
    pub fn into_view(self) -> ViewHandle<T> {
        ViewHandle { inner: self }
    }
}

impl<T: RefCounted> Clone for Handle<T> {
    fn clone(&self) -> Self {
        self.payload().ref_count().inc();
        Self {
            slot: self.slot,
            pool: Rc::clone(&self.pool),
        }
    }
}

impl<T: RefCounted> Drop for Handle<T> {
    fn drop(&mut self) {
        // SAFETY: the pool Rc keeps the slot storage alive while any handle
        // exists; `free_all` releases block storage only after every payload
        // destructor has run.
        let state = unsafe { self.slot.as_ref() }.state.get();
        if state == SlotState::Free {
            // A teardown walk already released this slot's payload. This
            // handle lives inside a payload the same walk is destroying;
            // there is no refcount left to decrement.
            return;
        }
        // The only path by which a slot can reach the garbage state.
        if self.payload().ref_count().dec() == 0 {
            self.pool.mark_garbage_slot(self.slot);
        }
    }
}

impl<T: RefCounted> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.payload()
    }
}

impl<T: RefCounted> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("slot", &self.slot)
            .field("refs", &self.payload().ref_count().get())
            .finish()
    }
}

/// Read-only capability wrapper over the same pool slot as a [`Handle`].
///
/// Carries the identical refcount contribution but is handed out where a
/// collaborator must observe a resource without gaining its mutation
/// surface (a hit-test result observing an actor, for instance). Domain
/// crates keep their payloads' mutators `pub(crate)` and re-expose them
/// only on their owning wrapper types, so a `ViewHandle` reaches accessors
/// alone - no virtual dispatch, no duplicate storage.
pub struct ViewHandle<T: RefCounted> {
    inner: Handle<T>,
}

impl<T: RefCounted> ViewHandle<T> {
    /// Stable address of the observed payload.
    #[must_use]
    pub fn payload_ptr(&self) -> NonNull<T> {
        self.inner.payload_ptr()
    }

    /// Whether this view observes the same slot as `handle`.
    #[must_use]
    pub fn observes(&self, handle: &Handle<T>) -> bool {
        self.inner.ptr_eq(handle)
    }
}

impl<T: RefCounted> From<Handle<T>> for ViewHandle<T> {
    fn from(handle: Handle<T>) -> Self {
        handle.into_view()
    }
}

impl<T: RefCounted> Clone for ViewHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: RefCounted> Deref for ViewHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.inner.payload()
    }
}

impl<T: RefCounted> fmt::Debug for ViewHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewHandle").field("inner", &self.inner).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::allocator::BlockAllocator;
    use super::super::refcount::{RefCount, RefCounted};
    use super::*;
    use std::cell::Cell;

    struct Counter {
        refs: RefCount,
        hits: Cell<u32>,
    }

    impl Counter {
        fn new() -> Self {
            Self {
                refs: RefCount::new(),
                hits: Cell::new(0),
            }
        }

        fn bump(&self) {
            self.hits.set(self.hits.get() + 1);
        }
    }

    impl RefCounted for Counter {
        fn ref_count(&self) -> &RefCount {
            &self.refs
        }
    }

    #[test]
    fn test_clone_and_drop_balance() {
        let pool: BlockAllocator<Counter> = BlockAllocator::new(4);
        let h1 = pool.allocate(Counter::new());
        assert_eq!(h1.ref_count().get(), 1);

        let h2 = h1.clone();
        let h3 = h2.clone();
        assert_eq!(h1.ref_count().get(), 3);
        assert!(h1.ptr_eq(&h3));

        drop(h2);
        drop(h3);
        assert_eq!(h1.ref_count().get(), 1);
        assert_eq!(pool.garbage_count(), 0);
    }

    #[test]
    fn test_move_does_not_touch_count() {
        let pool: BlockAllocator<Counter> = BlockAllocator::new(4);
        let h1 = pool.allocate(Counter::new());
        let moved = h1; // plain move
        assert_eq!(moved.ref_count().get(), 1);
    }

    #[test]
    fn test_deref_reaches_payload() {
        let pool: BlockAllocator<Counter> = BlockAllocator::new(4);
        let handle = pool.allocate(Counter::new());
        handle.bump();
        handle.bump();
        assert_eq!(handle.hits.get(), 2);
    }

    #[test]
    fn test_view_shares_refcount_and_slot() {
        let pool: BlockAllocator<Counter> = BlockAllocator::new(4);
        let owner = pool.allocate(Counter::new());
        let view = owner.clone().into_view();

        assert_eq!(owner.ref_count().get(), 2);
        assert!(view.observes(&owner));
        assert_eq!(view.payload_ptr(), owner.payload_ptr());

        drop(owner);
        assert_eq!(pool.live_count(), 1, "view keeps the slot live");
        drop(view);
        assert_eq!(pool.garbage_count(), 1);
    }
}
