//! Render pass / attachment layout objects.

use kestrel_core::{Handle, RefCount, RefCounted};

use crate::driver::NativeObject;

use super::image::Format;

/// Creation parameters for [`Device::create_render_pass`].
///
/// [`Device::create_render_pass`]: crate::Device::create_render_pass
#[derive(Clone, Debug)]
pub struct RenderPassDescriptor {
    /// Color attachment formats; must be non-empty.
    pub color_formats: Vec<Format>,
    /// Optional depth/stencil attachment format.
    pub depth_format: Option<Format>,
}

/// Pooled render pass implementation. Reached only through [`RenderPass`]
/// handles.
pub struct RenderPassImpl {
    refs: RefCount,
    native: NativeObject,
    color_formats: Vec<Format>,
    depth_format: Option<Format>,
}

impl RenderPassImpl {
    pub(crate) fn new(native: NativeObject, desc: &RenderPassDescriptor) -> Self {
        Self {
            refs: RefCount::new(),
            native,
            color_formats: desc.color_formats.clone(),
            depth_format: desc.depth_format,
        }
    }

    /// Color attachment formats.
    #[must_use]
    pub fn color_formats(&self) -> &[Format] {
        &self.color_formats
    }

    /// Depth/stencil attachment format, if any.
    #[must_use]
    pub fn depth_format(&self) -> Option<Format> {
        self.depth_format
    }

    /// Identifier of the underlying native object.
    #[must_use]
    pub fn native_id(&self) -> u64 {
        self.native.id()
    }
}

impl RefCounted for RenderPassImpl {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

/// Shareable handle to a pooled render pass.
pub type RenderPass = Handle<RenderPassImpl>;
