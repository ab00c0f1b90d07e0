//! Linear data buffers.

use kestrel_core::{Handle, RefCount, RefCounted};

use crate::driver::NativeObject;

/// What a buffer is bound as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex input.
    Vertex,
    /// Index input.
    Index,
    /// Shader-visible uniform data.
    Uniform,
    /// Shader-visible read/write storage.
    Storage,
}

/// Creation parameters for [`Device::create_buffer`].
///
/// [`Device::create_buffer`]: crate::Device::create_buffer
#[derive(Clone, Debug)]
pub struct BufferDescriptor {
    /// Size in bytes; must be non-zero.
    pub size: u64,
    /// Binding usage.
    pub usage: BufferUsage,
}

/// Pooled buffer implementation. Reached only through [`Buffer`] handles.
pub struct BufferImpl {
    refs: RefCount,
    native: NativeObject,
    size: u64,
    usage: BufferUsage,
}

impl BufferImpl {
    pub(crate) fn new(native: NativeObject, desc: &BufferDescriptor) -> Self {
        Self {
            refs: RefCount::new(),
            native,
            size: desc.size,
            usage: desc.usage,
        }
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Binding usage.
    #[must_use]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Identifier of the underlying native object.
    #[must_use]
    pub fn native_id(&self) -> u64 {
        self.native.id()
    }
}

impl RefCounted for BufferImpl {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

/// Shareable handle to a pooled buffer.
pub type Buffer = Handle<BufferImpl>;
