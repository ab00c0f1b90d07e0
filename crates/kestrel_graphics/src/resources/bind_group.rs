//! Descriptor binding sets.
//!
//! A bind group retains handles to the resources it binds, which is what
//! keeps a buffer alive for as long as any bind group still references it -
//! the cross-pool ownership cascade the sweep order relies on.

use kestrel_core::{Handle, RefCount, RefCounted};

use crate::driver::NativeObject;

use super::buffer::Buffer;
use super::image::Image;

/// One bindable resource.
#[derive(Clone)]
pub enum BindingResource {
    /// A whole buffer.
    Buffer(Buffer),
    /// A whole image.
    Image(Image),
}

/// One slot of a bind group.
#[derive(Clone)]
pub struct BindGroupEntry {
    /// Shader-visible binding index.
    pub binding: u32,
    /// The bound resource; the entry owns a handle to it.
    pub resource: BindingResource,
}

/// Creation parameters for [`Device::create_bind_group`].
///
/// [`Device::create_bind_group`]: crate::Device::create_bind_group
pub struct BindGroupDescriptor {
    /// Entries; must be non-empty.
    pub entries: Vec<BindGroupEntry>,
}

/// Pooled bind group implementation. Reached only through [`BindGroup`]
/// handles.
pub struct BindGroupImpl {
    refs: RefCount,
    native: NativeObject,
    entries: Vec<BindGroupEntry>,
}

impl BindGroupImpl {
    pub(crate) fn new(native: NativeObject, entries: Vec<BindGroupEntry>) -> Self {
        Self {
            refs: RefCount::new(),
            native,
            entries,
        }
    }

    /// The bound entries.
    #[must_use]
    pub fn entries(&self) -> &[BindGroupEntry] {
        &self.entries
    }

    /// Identifier of the underlying native object.
    #[must_use]
    pub fn native_id(&self) -> u64 {
        self.native.id()
    }
}

impl RefCounted for BindGroupImpl {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

/// Shareable handle to a pooled bind group.
pub type BindGroup = Handle<BindGroupImpl>;
