//! Queue and host synchronization primitives.

use std::cell::Cell;

use kestrel_core::{Handle, RefCount, RefCounted};

use crate::driver::NativeObject;

/// Pooled semaphore implementation. Reached only through [`Semaphore`]
/// handles.
pub struct SemaphoreImpl {
    refs: RefCount,
    native: NativeObject,
}

impl SemaphoreImpl {
    pub(crate) fn new(native: NativeObject) -> Self {
        Self {
            refs: RefCount::new(),
            native,
        }
    }

    /// Identifier of the underlying native object.
    #[must_use]
    pub fn native_id(&self) -> u64 {
        self.native.id()
    }
}

impl RefCounted for SemaphoreImpl {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

/// Shareable handle to a pooled semaphore.
pub type Semaphore = Handle<SemaphoreImpl>;

/// Pooled fence implementation. Reached only through [`Fence`] handles.
pub struct FenceImpl {
    refs: RefCount,
    native: NativeObject,
    signaled: Cell<bool>,
}

impl FenceImpl {
    pub(crate) fn new(native: NativeObject, signaled: bool) -> Self {
        Self {
            refs: RefCount::new(),
            native,
            signaled: Cell::new(signaled),
        }
    }

    pub(crate) fn set_signaled(&self, signaled: bool) {
        self.signaled.set(signaled);
    }

    /// Whether the fence has been signaled since its last reset.
    #[must_use]
    pub fn is_signaled(&self) -> bool {
        self.signaled.get()
    }

    /// Identifier of the underlying native object.
    #[must_use]
    pub fn native_id(&self) -> u64 {
        self.native.id()
    }
}

impl RefCounted for FenceImpl {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

/// Shareable handle to a pooled fence.
pub type Fence = Handle<FenceImpl>;
