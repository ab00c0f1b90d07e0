//! Compiled graphics pipelines.
//!
//! A pipeline retains a handle to its render pass, so a pass can never be
//! destroyed while a pipeline built against it is still alive. The device
//! sweeps pipelines before passes for the same reason.

use kestrel_core::{Handle, RefCount, RefCounted};

use crate::driver::NativeObject;

use super::render_pass::RenderPass;

/// Creation parameters for [`Device::create_pipeline`].
///
/// [`Device::create_pipeline`]: crate::Device::create_pipeline
pub struct PipelineDescriptor {
    /// Shader program source; must be non-empty.
    pub shader_source: String,
    /// The pass this pipeline renders into; the pipeline keeps it alive.
    pub render_pass: RenderPass,
}

/// Pooled pipeline implementation. Reached only through [`Pipeline`]
/// handles.
pub struct PipelineImpl {
    refs: RefCount,
    native: NativeObject,
    shader_source: String,
    render_pass: RenderPass,
}

impl PipelineImpl {
    pub(crate) fn new(native: NativeObject, desc: PipelineDescriptor) -> Self {
        Self {
            refs: RefCount::new(),
            native,
            shader_source: desc.shader_source,
            render_pass: desc.render_pass,
        }
    }

    /// Shader program source.
    #[must_use]
    pub fn shader_source(&self) -> &str {
        &self.shader_source
    }

    /// The render pass this pipeline was built against.
    #[must_use]
    pub fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    /// Identifier of the underlying native object.
    #[must_use]
    pub fn native_id(&self) -> u64 {
        self.native.id()
    }
}

impl RefCounted for PipelineImpl {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

/// Shareable handle to a pooled pipeline.
pub type Pipeline = Handle<PipelineImpl>;
