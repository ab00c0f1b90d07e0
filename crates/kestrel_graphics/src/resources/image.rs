//! Images and their backing device memory.
//!
//! Image creation is two-phase against the driver: the image object first,
//! its memory second. The memory phase can fail after the pool slot is
//! already reserved, which is the canonical exercise of the "reserved slot
//! is released through the garbage path, never leaked" rule.

use std::cell::RefCell;

use kestrel_core::{Handle, RefCount, RefCounted};

use crate::driver::NativeObject;

/// Texel formats understood by the headless driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// 8-bit RGBA, unsigned normalized.
    Rgba8Unorm,
    /// 8-bit BGRA, unsigned normalized.
    Bgra8Unorm,
    /// 24-bit depth with 8-bit stencil.
    Depth24Stencil8,
    /// Single-channel 32-bit float.
    R32Float,
}

/// Creation parameters for [`Device::create_image`].
///
/// [`Device::create_image`]: crate::Device::create_image
#[derive(Clone, Debug)]
pub struct ImageDescriptor {
    /// Width, height, depth in texels; all must be non-zero.
    pub extent: [u32; 3],
    /// Texel format.
    pub format: Format,
    /// Mip chain length; must be non-zero.
    pub mip_levels: u32,
}

/// Pooled image implementation. Reached only through [`Image`] handles.
pub struct ImageImpl {
    refs: RefCount,
    native: NativeObject,
    /// Bound after creation; `None` only during the window between image
    /// creation and memory binding (or when binding failed and the slot is
    /// already on its way to the garbage list).
    memory: RefCell<Option<NativeObject>>,
    extent: [u32; 3],
    format: Format,
    mip_levels: u32,
}

impl ImageImpl {
    pub(crate) fn new(native: NativeObject, desc: &ImageDescriptor) -> Self {
        Self {
            refs: RefCount::new(),
            native,
            memory: RefCell::new(None),
            extent: desc.extent,
            format: desc.format,
            mip_levels: desc.mip_levels,
        }
    }

    pub(crate) fn bind_memory(&self, memory: NativeObject) {
        *self.memory.borrow_mut() = Some(memory);
    }

    /// Whether backing memory is bound.
    #[must_use]
    pub fn has_memory(&self) -> bool {
        self.memory.borrow().is_some()
    }

    /// Width, height, depth in texels.
    #[must_use]
    pub fn extent(&self) -> [u32; 3] {
        self.extent
    }

    /// Texel format.
    #[must_use]
    pub fn format(&self) -> Format {
        self.format
    }

    /// Mip chain length.
    #[must_use]
    pub fn mip_level_count(&self) -> u32 {
        self.mip_levels
    }

    /// Identifier of the underlying native image object.
    #[must_use]
    pub fn native_id(&self) -> u64 {
        self.native.id()
    }
}

impl RefCounted for ImageImpl {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

/// Shareable handle to a pooled image.
pub type Image = Handle<ImageImpl>;
