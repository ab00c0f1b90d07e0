//! # Model Manager
//!
//! The asset-side exemplar of the ownership pattern: a loaded model is a
//! pooled payload that retains buffer handles from the device, and the
//! manager's `gc()` pass reclaims models once no render frame references
//! them any more. Sweeping models *before* the device's frame sweep lets
//! the freed buffers go in the same frame.

use kestrel_core::{BlockAllocator, Handle, RefCount, RefCounted};

use crate::device::Device;
use crate::error::GraphicsError;
use crate::resources::{Buffer, BufferDescriptor, BufferUsage};

/// Pooled model implementation. Reached only through [`Model`] handles.
pub struct ModelImpl {
    refs: RefCount,
    name: String,
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    vertex_count: u32,
    index_count: u32,
}

impl ModelImpl {
    /// Asset name this model was loaded from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// GPU vertex buffer backing this model.
    #[must_use]
    pub fn vertex_buffer(&self) -> &Buffer {
        &self.vertex_buffer
    }

    /// GPU index buffer backing this model.
    #[must_use]
    pub fn index_buffer(&self) -> &Buffer {
        &self.index_buffer
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Number of indices.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

impl RefCounted for ModelImpl {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

/// Shareable handle to a loaded model.
pub type Model = Handle<ModelImpl>;

/// Owner of the model pool.
#[derive(Default)]
pub struct ModelManager {
    models: BlockAllocator<ModelImpl>,
}

impl ModelManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads `vertices`/`indices` through `device` and returns a pooled
    /// model handle.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidDescriptor`] for empty geometry and
    /// propagates buffer-creation failures from the device.
    pub fn load(
        &self,
        device: &Device,
        name: &str,
        vertices: &[f32],
        indices: &[u32],
    ) -> Result<Model, GraphicsError> {
        if vertices.is_empty() || indices.is_empty() {
            tracing::warn!(name, "model load rejected: empty geometry");
            return Err(GraphicsError::InvalidDescriptor {
                reason: format!("model '{name}' has no geometry"),
            });
        }
        let vertex_count = element_count(name, "vertex", vertices.len())?;
        let index_count = element_count(name, "index", indices.len())?;

        let vertex_buffer = device.create_buffer(&BufferDescriptor {
            size: std::mem::size_of_val(vertices) as u64,
            usage: BufferUsage::Vertex,
        })?;
        let index_buffer = device.create_buffer(&BufferDescriptor {
            size: std::mem::size_of_val(indices) as u64,
            usage: BufferUsage::Index,
        })?;

        let model = self.models.allocate(ModelImpl {
            refs: RefCount::new(),
            name: name.to_owned(),
            vertex_buffer,
            index_buffer,
            vertex_count,
            index_count,
        });
        tracing::debug!(name, "model loaded");
        Ok(model)
    }

    /// Number of live models.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.models.live_count()
    }

    /// Sweeps unreferenced models, releasing their buffer handles into the
    /// device's garbage lists. Returns the number of models destroyed.
    pub fn gc(&self) -> usize {
        self.models.gc()
    }
}

impl Drop for ModelManager {
    fn drop(&mut self) {
        // Models hold device buffers, so the manager must be torn down
        // before its device.
        self.models.free_all();
    }
}

/// Draw calls index geometry with `u32`, so element counts past
/// `u32::MAX` are rejected rather than clamped.
fn element_count(name: &str, kind: &str, len: usize) -> Result<u32, GraphicsError> {
    u32::try_from(len).map_err(|_| {
        tracing::warn!(name, kind, len, "model load rejected: too many elements");
        GraphicsError::InvalidDescriptor {
            reason: format!("model '{name}' has {len} {kind} elements, limit is {}", u32::MAX),
        }
    })
}
