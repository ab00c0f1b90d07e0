//! # Headless Driver Seam
//!
//! Stand-in for the native GPU driver. Real bindings (a Vulkan-style
//! device) are collaborators outside this repository; what the lifetime
//! subsystem needs from them is exactly what this module models:
//!
//! - creation that can fail (device memory exhaustion)
//! - RAII native objects whose release must be deferred until safe
//! - an idle/fence boundary that `end_frame` waits on before sweeping
//!
//! The live-object census exists so tests can prove a native object was
//! still alive at a given point and gone after the sweep.

use std::cell::Cell;
use std::rc::Rc;

use thiserror::Error;

/// Kinds of native driver objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    /// Linear data buffer.
    Buffer,
    /// Texture / attachment image.
    Image,
    /// Backing device memory for an image.
    Memory,
    /// Descriptor binding set.
    BindGroup,
    /// Compiled graphics pipeline.
    Pipeline,
    /// Render pass / attachment layout.
    RenderPass,
    /// Queue synchronization primitive.
    Semaphore,
    /// Host synchronization primitive.
    Fence,
}

impl ObjectKind {
    pub(crate) const COUNT: usize = 8;

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// Errors surfaced by the driver seam.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The device's object budget is exhausted.
    #[error("device out of memory creating {kind:?} (capacity {capacity})")]
    OutOfDeviceMemory {
        /// The kind that failed to allocate.
        kind: ObjectKind,
        /// The configured object capacity.
        capacity: usize,
    },
}

struct DriverShared {
    next_id: Cell<u64>,
    live: [Cell<usize>; ObjectKind::COUNT],
    /// Total live-object budget; `None` means unbounded.
    capacity: Option<usize>,
    fence_waits: Cell<u64>,
}

impl DriverShared {
    fn live_total(&self) -> usize {
        self.live.iter().map(Cell::get).sum()
    }
}

/// A native driver object, owned by exactly one resource implementation.
///
/// Dropping it is the native release; because resource impls are only
/// dropped from the allocator sweep (or teardown), release timing is
/// inherited from the lifetime subsystem's GC checkpoints.
pub struct NativeObject {
    id: u64,
    kind: ObjectKind,
    driver: Rc<DriverShared>,
}

impl NativeObject {
    /// Driver-assigned identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Kind of the underlying object.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }
}

impl Drop for NativeObject {
    fn drop(&mut self) {
        let live = &self.driver.live[self.kind.index()];
        live.set(live.get() - 1);
        tracing::trace!(id = self.id, kind = ?self.kind, "native object released");
    }
}

impl std::fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeObject")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Handle to the headless driver instance.
///
/// Cheaply cloneable; all clones observe the same census.
#[derive(Clone)]
pub struct Gpu {
    shared: Rc<DriverShared>,
}

impl Default for Gpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Gpu {
    /// Driver with an unbounded object budget.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Driver that fails creation once `capacity` objects are alive.
    ///
    /// Used to exercise the out-of-device-memory path deterministically.
    #[must_use]
    pub fn with_object_capacity(capacity: usize) -> Self {
        Self::build(Some(capacity))
    }

    fn build(capacity: Option<usize>) -> Self {
        Self {
            shared: Rc::new(DriverShared {
                next_id: Cell::new(1),
                live: std::array::from_fn(|_| Cell::new(0)),
                capacity,
                fence_waits: Cell::new(0),
            }),
        }
    }

    pub(crate) fn create_object(&self, kind: ObjectKind) -> Result<NativeObject, DriverError> {
        if let Some(capacity) = self.shared.capacity {
            if self.shared.live_total() >= capacity {
                return Err(DriverError::OutOfDeviceMemory { kind, capacity });
            }
        }
        let id = self.shared.next_id.get();
        self.shared.next_id.set(id + 1);
        let live = &self.shared.live[kind.index()];
        live.set(live.get() + 1);
        Ok(NativeObject {
            id,
            kind,
            driver: Rc::clone(&self.shared),
        })
    }

    /// Blocks until all submitted work has retired.
    ///
    /// Headless: nothing is actually in flight, but the call is still the
    /// ordering boundary the device's frame sweep keys off, and tests count
    /// it to verify the sweep never runs before the wait.
    pub fn wait_idle(&self) {
        self.shared.fence_waits.set(self.shared.fence_waits.get() + 1);
        tracing::trace!("driver idle wait");
    }

    /// Number of idle/fence waits issued so far.
    #[must_use]
    pub fn fence_waits(&self) -> u64 {
        self.shared.fence_waits.get()
    }

    /// Total live native objects.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.shared.live_total()
    }

    /// Live native objects of one kind.
    #[must_use]
    pub fn live_objects_of(&self, kind: ObjectKind) -> usize {
        self.shared.live[kind.index()].get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_census_tracks_create_and_release() {
        let gpu = Gpu::new();
        let a = gpu.create_object(ObjectKind::Buffer).unwrap();
        let b = gpu.create_object(ObjectKind::Image).unwrap();
        assert_eq!(gpu.live_objects(), 2);
        assert_eq!(gpu.live_objects_of(ObjectKind::Buffer), 1);
        assert_ne!(a.id(), b.id());

        drop(a);
        assert_eq!(gpu.live_objects(), 1);
        drop(b);
        assert_eq!(gpu.live_objects(), 0);
    }

    #[test]
    fn test_capacity_exhaustion() {
        let gpu = Gpu::with_object_capacity(1);
        let held = gpu.create_object(ObjectKind::Buffer).unwrap();
        let err = gpu.create_object(ObjectKind::Image).unwrap_err();
        assert_eq!(
            err,
            DriverError::OutOfDeviceMemory {
                kind: ObjectKind::Image,
                capacity: 1
            }
        );
        drop(held);
        assert!(gpu.create_object(ObjectKind::Image).is_ok());
    }
}
