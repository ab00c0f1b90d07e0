//! # KESTREL Core Engine
//!
//! The resource-lifetime backbone shared by every long-lived engine object:
//! GPU buffers, images and pipelines on one side, physics actors, shapes and
//! controllers on the other. Heavy implementation objects live in pooled
//! storage with stable addresses; the rest of the engine only ever holds
//! small, cloneable handles.
//!
//! ## Architecture Rules
//!
//! 1. **Destruction is deferred** - a payload whose last handle drops is only
//!    *marked* as garbage; it is physically destroyed at the owner's next
//!    `gc()` checkpoint, after in-flight native work has retired
//! 2. **Addresses are stable** - pool growth never moves a previously
//!    returned payload
//! 3. **Single-threaded by contract** - no locks, no atomics, no suspension
//!    points anywhere in this crate
//!
//! ## Example
//!
//! ```rust,ignore
//! use kestrel_core::{BlockAllocator, Handle, RefCount, RefCounted};
//!
//! struct ImageImpl { refs: RefCount, /* native payload */ }
//! impl RefCounted for ImageImpl {
//!     fn ref_count(&self) -> &RefCount { &self.refs }
//! }
//!
//! let images: BlockAllocator<ImageImpl> = BlockAllocator::default();
//! let handle = images.allocate(ImageImpl { refs: RefCount::new() });
//! drop(handle);      // marks the slot as garbage
//! images.gc();       // destroys it, once native work has retired
//! ```

pub mod memory;

pub use memory::{BlockAllocator, Handle, RefCount, RefCounted, SlotState, ViewHandle};
