//! # Memory Management
//!
//! Pooled storage and deferred reclamation for engine resources.
//!
//! ## Design Philosophy
//!
//! One [`BlockAllocator`] exists per resource type, owned by the manager that
//! creates that type (the graphics device, the physics context, an asset
//! manager). Payloads are reached only through [`Handle`]s, which mediate an
//! intrusive reference count. When the count hits zero the slot is *marked*
//! as garbage; the owning manager sweeps at a checkpoint where no native work
//! can still reference the payload:
//!
//! - No slot is ever destroyed while the GPU or the physics solver may still
//!   touch it this frame
//! - A slot never goes straight from live to free; it always passes through
//!   the garbage state
//! - Slot addresses never change while the allocator is alive

mod allocator;
mod handle;
mod refcount;

pub use allocator::{BlockAllocator, SlotState, DEFAULT_BLOCK_CAPACITY};
pub use handle::{Handle, ViewHandle};
pub use refcount::{RefCount, RefCounted};
