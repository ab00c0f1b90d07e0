//! # KESTREL Graphics
//!
//! The GPU-side exemplar of the engine's resource-lifetime pattern: a
//! [`Device`] owns one pooled allocator per resource type, `create_*` calls
//! hand out refcounted handles, and [`Device::end_frame`] runs the garbage
//! sweep only after the frame's driver work has retired.
//!
//! The actual GPU binding is a collaborator, not part of this crate; the
//! [`driver`] module is the headless seam where a real driver would attach.
//! It issues RAII native objects and keeps a live-object census, which is
//! how tests prove that native teardown never races in-flight work.

pub mod device;
pub mod driver;
pub mod error;
pub mod model;
pub mod resources;

pub use device::{Device, DeviceCensus};
pub use driver::{Gpu, ObjectKind};
pub use error::GraphicsError;
pub use model::{Model, ModelImpl, ModelManager};
pub use resources::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupImpl, BindingResource, Buffer,
    BufferDescriptor, BufferImpl, BufferUsage, Fence, FenceImpl, Format, Image, ImageDescriptor,
    ImageImpl, Pipeline, PipelineDescriptor, PipelineImpl, RenderPass, RenderPassDescriptor,
    RenderPassImpl, Semaphore, SemaphoreImpl,
};
