//! # Block Pool Allocator
//!
//! Fixed-size slot pool with stable addresses and deferred destruction.
//!
//! The pool grows in blocks of slots; a block, once allocated, is never
//! moved or shrunk, which is what guarantees payload addresses stay valid
//! for the allocator's whole lifetime. Reclamation is two-phase: a slot
//! whose last handle dropped is *marked* as garbage, and only a later
//! [`BlockAllocator::gc`] sweep (driven by the owning manager at a safe
//! checkpoint) actually runs the payload's destructor.

#![allow(unsafe_code)]

use std::cell::{Cell, RefCell, UnsafeCell};
use std::mem::MaybeUninit;
use std::ptr::NonNull;
use std::rc::Rc;

use super::handle::Handle;
use super::refcount::RefCounted;

/// Slots per block when none is specified.
pub const DEFAULT_BLOCK_CAPACITY: usize = 256;

/// Lifecycle state of one pool slot.
///
/// The only legal transitions are `Free -> Live` (allocate),
/// `Live -> Garbage` (refcount reached zero) and `Garbage -> Free` (sweep).
/// A slot never goes straight from `Live` to `Free`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Unoccupied; on the free list and available to `allocate`.
    Free,
    /// Holds a payload with at least one outstanding handle.
    Live,
    /// Refcount hit zero; payload still constructed, destruction deferred
    /// until the next sweep.
    Garbage,
}

/// One storage unit inside a pool block.
///
/// Layout note: the payload is the first field and the struct is `repr(C)`,
/// so a payload pointer and its slot pointer are the same address. That is
/// what lets a raw payload pointer coming back from a native callback be
/// re-associated with its slot (see [`BlockAllocator::adopt`]).
#[repr(C)]
pub(crate) struct Slot<T> {
    pub(crate) value: UnsafeCell<MaybeUninit<T>>,
    pub(crate) state: Cell<SlotState>,
}

impl<T> Slot<T> {
    fn empty() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            state: Cell::new(SlotState::Free),
        }
    }
}

/// Shared pool state. Handles keep it alive through an `Rc`, so slot
/// bookkeeping stays reachable for exactly as long as anything can still
/// point into the pool.
pub(crate) struct PoolInner<T> {
    block_capacity: usize,
    /// Blocks are individually boxed: the outer vec may reallocate as the
    /// pool grows, the slot storage it points to never moves.
    blocks: RefCell<Vec<Box<[Slot<T>]>>>,
    /// Recycled and never-used slots, ready for `allocate`.
    free: RefCell<Vec<NonNull<Slot<T>>>>,
    /// Slots whose refcount reached zero, awaiting the sweep.
    garbage: RefCell<Vec<NonNull<Slot<T>>>>,
    live: Cell<usize>,
}

impl<T> PoolInner<T> {
    pub(crate) fn mark_garbage_slot(&self, slot: NonNull<Slot<T>>) {
        // SAFETY: callers only pass slots that belong to this pool, whose
        // storage is kept alive by the Rc the caller holds.
        let state = unsafe { slot.as_ref() }.state.get();
        if state != SlotState::Live {
            debug_assert_eq!(
                state,
                SlotState::Live,
                "mark_garbage on a slot that is not live (double mark?)"
            );
            tracing::warn!(?state, "ignoring mark_garbage on a non-live slot");
            return;
        }
        unsafe { slot.as_ref() }.state.set(SlotState::Garbage);
        self.live.set(self.live.get() - 1);
        self.garbage.borrow_mut().push(slot);
    }

    fn sweep(&self, budget: usize) -> usize {
        let mut swept = 0;
        while swept < budget {
            let Some(slot) = self.garbage.borrow_mut().pop() else {
                break;
            };
            // SAFETY: a garbage slot holds a constructed payload that no
            // handle can reach any more; it is destroyed here exactly once.
            // The state flips to Free *before* the drop so anything the
            // payload's destructor does cannot re-mark this slot.
            unsafe {
                let slot_ref = slot.as_ref();
                debug_assert_eq!(slot_ref.state.get(), SlotState::Garbage);
                slot_ref.state.set(SlotState::Free);
                (*slot_ref.value.get()).assume_init_drop();
            }
            self.free.borrow_mut().push(slot);
            swept += 1;
        }
        if swept > 0 {
            tracing::trace!(swept, "swept garbage slots");
        }
        swept
    }

    fn free_all(&self) {
        // Snapshot slot addresses first: destructors may drop handles and
        // mark further slots while we walk.
        let slots: Vec<NonNull<Slot<T>>> = self
            .blocks
            .borrow()
            .iter()
            .flat_map(|block| block.iter().map(NonNull::from))
            .collect();

        let mut dropped = 0usize;
        for slot in slots {
            // SAFETY: every slot in the snapshot belongs to a block we still
            // own. Non-free slots hold a constructed payload; flipping the
            // state to Free before dropping makes the walk single-shot even
            // when destructors cascade.
            unsafe {
                let slot_ref = slot.as_ref();
                if slot_ref.state.get() == SlotState::Free {
                    continue;
                }
                slot_ref.state.set(SlotState::Free);
                (*slot_ref.value.get()).assume_init_drop();
            }
            dropped += 1;
        }

        self.live.set(0);
        self.garbage.borrow_mut().clear();
        self.free.borrow_mut().clear();
        self.blocks.borrow_mut().clear();
        if dropped > 0 {
            tracing::debug!(dropped, "pool teardown released all blocks");
        }
    }

    fn contains(&self, slot: NonNull<Slot<T>>) -> bool {
        let addr = slot.as_ptr() as usize;
        let stride = std::mem::size_of::<Slot<T>>();
        self.blocks.borrow().iter().any(|block| {
            let start = block.as_ptr() as usize;
            let end = start + block.len() * stride;
            addr >= start && addr < end && (addr - start) % stride == 0
        })
    }
}

impl<T> Drop for PoolInner<T> {
    fn drop(&mut self) {
        // The last Rc is gone, so no handle exists; anything still
        // constructed is garbage and must not leak.
        self.free_all();
    }
}

/// A pool allocator for one resource implementation type.
///
/// Owned by the manager that creates that type: the graphics device owns one
/// per GPU resource kind, the physics context one per actor kind. Cloning an
/// allocator produces another view over the *same* pool, which is how
/// collaborator objects (a scene, a vehicle manager) reach the pool they do
/// not own.
///
/// # Thread Safety
///
/// NOT thread-safe, by contract: allocation, refcount traffic and sweeps all
/// run inline on the owning thread.
///
/// # Example
///
/// ```rust,ignore
/// let pool: BlockAllocator<ShapeImpl> = BlockAllocator::new(64);
/// let shape = pool.allocate(ShapeImpl::new(geometry));
/// drop(shape);            // slot becomes garbage
/// let swept = pool.gc();  // slot destroyed and recycled
/// assert_eq!(swept, 1);
/// ```
pub struct BlockAllocator<T> {
    inner: Rc<PoolInner<T>>,
}

impl<T> Clone for BlockAllocator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for BlockAllocator<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_CAPACITY)
    }
}

impl<T> BlockAllocator<T> {
    /// Creates a pool that grows in blocks of `block_capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `block_capacity` is zero.
    #[must_use]
    pub fn new(block_capacity: usize) -> Self {
        assert!(block_capacity > 0, "block capacity must be greater than zero");
        Self {
            inner: Rc::new(PoolInner {
                block_capacity,
                blocks: RefCell::new(Vec::new()),
                free: RefCell::new(Vec::new()),
                garbage: RefCell::new(Vec::new()),
                live: Cell::new(0),
            }),
        }
    }

    /// Number of slots per growth block.
    #[inline]
    #[must_use]
    pub fn block_capacity(&self) -> usize {
        self.inner.block_capacity
    }

    /// Number of blocks currently allocated.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.inner.blocks.borrow().len()
    }

    /// Number of live (handle-reachable) payloads.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.inner.live.get()
    }

    /// Number of slots marked as garbage and awaiting the sweep.
    #[must_use]
    pub fn garbage_count(&self) -> usize {
        self.inner.garbage.borrow().len()
    }

    /// Number of recycled or never-used slots ready for `allocate`.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.inner.free.borrow().len()
    }

    /// Destroys every garbage slot and returns it to the free list.
    ///
    /// A no-op when nothing was marked since the previous sweep, and
    /// idempotent when called repeatedly. Must only be invoked once all
    /// native work that could still reference a garbage payload has retired
    /// for the current frame/tick; the allocator cannot check that, the
    /// owning manager's checkpoint placement does.
    ///
    /// Returns the number of payloads destroyed, including any cascade from
    /// payload destructors releasing further same-pool handles.
    pub fn gc(&self) -> usize {
        self.inner.sweep(usize::MAX)
    }

    /// Budgeted variant of [`gc`](Self::gc): destroys at most `budget`
    /// garbage slots, leaving the rest for a later sweep.
    pub fn gc_at_most(&self, budget: usize) -> usize {
        self.inner.sweep(budget)
    }

    fn take_free_slot(&self) -> NonNull<Slot<T>> {
        if let Some(slot) = self.inner.free.borrow_mut().pop() {
            return slot;
        }
        self.grow();
        self.inner
            .free
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| unreachable!("grow() refilled the free list"))
    }

    /// Adds one block of `block_capacity` slots. The block is boxed before
    /// any pointer into it is taken; pushing the box into the block list
    /// moves the box, never its storage.
    fn grow(&self) {
        let mut slots = Vec::with_capacity(self.inner.block_capacity);
        for _ in 0..self.inner.block_capacity {
            slots.push(Slot::empty());
        }
        let block: Box<[Slot<T>]> = slots.into_boxed_slice();

        {
            let mut free = self.inner.free.borrow_mut();
            for slot in block.iter().rev() {
                free.push(NonNull::from(slot));
            }
        }
        self.inner.blocks.borrow_mut().push(block);
        tracing::trace!(
            blocks = self.inner.blocks.borrow().len(),
            "pool grew by one block"
        );
    }

    /// Force-destroys every non-free slot and releases all blocks.
    ///
    /// Teardown only: safe once no native work referencing pooled payloads
    /// is outstanding and no collaborator still holds a handle. The
    /// allocator remains usable afterwards; a subsequent `allocate` starts
    /// from a fresh block.
    pub fn free_all(&self) {
        self.inner.free_all();
    }
}

impl<T: RefCounted> BlockAllocator<T> {
    /// Stores `payload` in a free slot and returns the defining first
    /// handle over it.
    ///
    /// Amortized O(1): reuses a recycled slot when one exists, otherwise
    /// grows by one block. Growth never moves previously returned payloads.
    /// Host allocation failure while growing is unrecoverable for a core
    /// pool and aborts, per the engine's panic policy.
    pub fn allocate(&self, payload: T) -> Handle<T> {
        let slot = self.take_free_slot();
        // SAFETY: the slot came off the free list, so its storage is
        // uninitialized and nothing else points at it.
        unsafe {
            let slot_ref = slot.as_ref();
            debug_assert_eq!(slot_ref.state.get(), SlotState::Free);
            (*slot_ref.value.get()).write(payload);
            slot_ref.state.set(SlotState::Live);
        }
        self.inner.live.set(self.inner.live.get() + 1);
        Handle::first(slot, Rc::clone(&self.inner))
    }

    /// Re-establishes handle bookkeeping over a raw payload pointer.
    ///
    /// This is the path for pointers that round-tripped through a native
    /// API (a physics hit-test callback handing back an actor pointer): the
    /// new handle increments the payload's refcount like any other copy.
    ///
    /// # Safety
    ///
    /// `payload` must point at a currently live payload allocated from this
    /// pool. Both conditions are checked in debug builds only.
    pub unsafe fn adopt(&self, payload: NonNull<T>) -> Handle<T> {
        let slot = payload.cast::<Slot<T>>();
        debug_assert!(
            self.inner.contains(slot),
            "adopt: pointer does not belong to this pool"
        );
        debug_assert_eq!(
            // SAFETY: contains() just validated the slot in debug; in
            // release the caller's contract guarantees it.
            unsafe { slot.as_ref() }.state.get(),
            SlotState::Live,
            "adopt: slot is not live"
        );
        Handle::retain(slot, Rc::clone(&self.inner))
    }

    /// Transitions a live slot to garbage.
    ///
    /// Called from the zero-refcount transition; handles do this on their
    /// own, so the only direct callers are tests and adapters that manage
    /// refcounts manually. Marking a slot that is not live is a caller bug:
    /// it asserts in debug builds and is ignored in release.
    ///
    /// # Safety
    ///
    /// `payload` must point at a payload allocated from this pool.
    pub unsafe fn mark_garbage(&self, payload: NonNull<T>) {
        let slot = payload.cast::<Slot<T>>();
        debug_assert!(
            self.inner.contains(slot),
            "mark_garbage: pointer does not belong to this pool"
        );
        self.inner.mark_garbage_slot(slot);
    }
}
