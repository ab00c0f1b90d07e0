//! # GPU Resource Implementations
//!
//! One pooled implementation type per resource kind, each embedding a
//! [`RefCount`](kestrel_core::RefCount) and owning its RAII native object.
//! The engine-facing names (`Buffer`, `Image`, ...) are handle aliases into
//! the device's pools; nothing outside the device ever owns an impl
//! directly.

mod bind_group;
mod buffer;
mod image;
mod pipeline;
mod render_pass;
mod sync;

pub use bind_group::{BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupImpl, BindingResource};
pub use buffer::{Buffer, BufferDescriptor, BufferImpl, BufferUsage};
pub use image::{Format, Image, ImageDescriptor, ImageImpl};
pub use pipeline::{Pipeline, PipelineDescriptor, PipelineImpl};
pub use render_pass::{RenderPass, RenderPassDescriptor, RenderPassImpl};
pub use sync::{Fence, FenceImpl, Semaphore, SemaphoreImpl};
