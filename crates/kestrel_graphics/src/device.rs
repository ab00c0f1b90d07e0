//! # Device
//!
//! The graphics-side owning manager. One pool per resource type; `create_*`
//! returns a refcounted handle or a logged error; the per-frame sweep runs
//! in [`Device::end_frame`], strictly after the driver idle wait, so no
//! native object is ever destroyed while submitted work could still touch
//! it. Teardown releases the pools in dependency order.

use std::cell::Cell;

use kestrel_core::BlockAllocator;

use crate::driver::{Gpu, ObjectKind};
use crate::error::GraphicsError;
use crate::resources::{
    BindGroup, BindGroupDescriptor, BindGroupImpl, Buffer, BufferDescriptor, BufferImpl, Fence,
    FenceImpl, Image, ImageDescriptor, ImageImpl, Pipeline, PipelineDescriptor, PipelineImpl,
    RenderPass, RenderPassDescriptor, RenderPassImpl, Semaphore, SemaphoreImpl,
};

/// Live-resource counts per pool, for diagnostics and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceCensus {
    /// Live buffers.
    pub buffers: usize,
    /// Live images.
    pub images: usize,
    /// Live bind groups.
    pub bind_groups: usize,
    /// Live pipelines.
    pub pipelines: usize,
    /// Live render passes.
    pub render_passes: usize,
    /// Live semaphores.
    pub semaphores: usize,
    /// Live fences.
    pub fences: usize,
}

/// The graphics device: owner of every GPU resource pool.
///
/// # Example
///
/// ```rust,ignore
/// let gpu = Gpu::new();
/// let device = Device::new(gpu.clone());
/// let vbo = device.create_buffer(&BufferDescriptor {
///     size: 64 * 1024,
///     usage: BufferUsage::Vertex,
/// })?;
/// // ... record and submit work referencing `vbo` ...
/// drop(vbo);            // marked, not destroyed
/// device.end_frame();   // destroyed here, after the idle wait
/// ```
pub struct Device {
    gpu: Gpu,
    buffers: BlockAllocator<BufferImpl>,
    images: BlockAllocator<ImageImpl>,
    bind_groups: BlockAllocator<BindGroupImpl>,
    pipelines: BlockAllocator<PipelineImpl>,
    render_passes: BlockAllocator<RenderPassImpl>,
    semaphores: BlockAllocator<SemaphoreImpl>,
    fences: BlockAllocator<FenceImpl>,
    frame: Cell<u64>,
    submits: Cell<u64>,
}

impl Device {
    /// Creates a device over `gpu` with default pool block sizes.
    #[must_use]
    pub fn new(gpu: Gpu) -> Self {
        Self::with_block_capacity(gpu, kestrel_core::memory::DEFAULT_BLOCK_CAPACITY)
    }

    /// Creates a device whose pools grow in blocks of `block_capacity`.
    #[must_use]
    pub fn with_block_capacity(gpu: Gpu, block_capacity: usize) -> Self {
        Self {
            gpu,
            buffers: BlockAllocator::new(block_capacity),
            images: BlockAllocator::new(block_capacity),
            bind_groups: BlockAllocator::new(block_capacity),
            pipelines: BlockAllocator::new(block_capacity),
            render_passes: BlockAllocator::new(block_capacity),
            semaphores: BlockAllocator::new(block_capacity),
            fences: BlockAllocator::new(block_capacity),
            frame: Cell::new(0),
            submits: Cell::new(0),
        }
    }

    /// The driver this device allocates against.
    #[must_use]
    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    /// Creates a buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidDescriptor`] for a zero-size buffer
    /// and [`GraphicsError::Driver`] when the driver is out of memory.
    pub fn create_buffer(&self, desc: &BufferDescriptor) -> Result<Buffer, GraphicsError> {
        if desc.size == 0 {
            tracing::warn!("buffer creation rejected: zero size");
            return Err(GraphicsError::InvalidDescriptor {
                reason: "buffer size must be non-zero".into(),
            });
        }
        let native = self.gpu.create_object(ObjectKind::Buffer).map_err(|e| {
            tracing::warn!(error = %e, "buffer creation failed");
            e
        })?;
        Ok(self.buffers.allocate(BufferImpl::new(native, desc)))
    }

    /// Creates an image and binds its backing memory.
    ///
    /// Two driver calls back to back: if the memory allocation fails after
    /// the image slot was already reserved, the reserved slot is released
    /// through the normal garbage path and swept at the next frame boundary.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidDescriptor`] for a degenerate extent
    /// or empty mip chain, [`GraphicsError::Driver`] on driver exhaustion.
    pub fn create_image(&self, desc: &ImageDescriptor) -> Result<Image, GraphicsError> {
        if desc.extent.contains(&0) || desc.mip_levels == 0 {
            tracing::warn!(extent = ?desc.extent, "image creation rejected: degenerate descriptor");
            return Err(GraphicsError::InvalidDescriptor {
                reason: "image extent and mip count must be non-zero".into(),
            });
        }
        let native = self.gpu.create_object(ObjectKind::Image).map_err(|e| {
            tracing::warn!(error = %e, "image creation failed");
            e
        })?;
        let image = self.images.allocate(ImageImpl::new(native, desc));

        match self.gpu.create_object(ObjectKind::Memory) {
            Ok(memory) => {
                image.bind_memory(memory);
                Ok(image)
            }
            Err(e) => {
                tracing::warn!(error = %e, "image memory allocation failed; releasing reserved slot");
                drop(image); // last handle: the slot goes Live -> Garbage
                Err(e.into())
            }
        }
    }

    /// Creates a bind group over `desc.entries`.
    ///
    /// The bind group retains a handle to every bound resource.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidDescriptor`] for an empty entry
    /// list, [`GraphicsError::Driver`] on driver exhaustion.
    pub fn create_bind_group(&self, desc: BindGroupDescriptor) -> Result<BindGroup, GraphicsError> {
        if desc.entries.is_empty() {
            tracing::warn!("bind group creation rejected: no entries");
            return Err(GraphicsError::InvalidDescriptor {
                reason: "bind group needs at least one entry".into(),
            });
        }
        let native = self.gpu.create_object(ObjectKind::BindGroup).map_err(|e| {
            tracing::warn!(error = %e, "bind group creation failed");
            e
        })?;
        Ok(self
            .bind_groups
            .allocate(BindGroupImpl::new(native, desc.entries)))
    }

    /// Creates a render pass.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidDescriptor`] when no color
    /// attachment is given, [`GraphicsError::Driver`] on driver exhaustion.
    pub fn create_render_pass(
        &self,
        desc: &RenderPassDescriptor,
    ) -> Result<RenderPass, GraphicsError> {
        if desc.color_formats.is_empty() {
            tracing::warn!("render pass creation rejected: no color attachments");
            return Err(GraphicsError::InvalidDescriptor {
                reason: "render pass needs at least one color attachment".into(),
            });
        }
        let native = self.gpu.create_object(ObjectKind::RenderPass).map_err(|e| {
            tracing::warn!(error = %e, "render pass creation failed");
            e
        })?;
        Ok(self
            .render_passes
            .allocate(RenderPassImpl::new(native, desc)))
    }

    /// Creates a pipeline against `desc.render_pass`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::InvalidDescriptor`] for empty shader
    /// source, [`GraphicsError::Driver`] on driver exhaustion.
    pub fn create_pipeline(&self, desc: PipelineDescriptor) -> Result<Pipeline, GraphicsError> {
        if desc.shader_source.trim().is_empty() {
            tracing::warn!("pipeline creation rejected: empty shader source");
            return Err(GraphicsError::InvalidDescriptor {
                reason: "pipeline shader source must be non-empty".into(),
            });
        }
        let native = self.gpu.create_object(ObjectKind::Pipeline).map_err(|e| {
            tracing::warn!(error = %e, "pipeline creation failed");
            e
        })?;
        Ok(self.pipelines.allocate(PipelineImpl::new(native, desc)))
    }

    /// Creates a semaphore.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::Driver`] on driver exhaustion.
    pub fn create_semaphore(&self) -> Result<Semaphore, GraphicsError> {
        let native = self.gpu.create_object(ObjectKind::Semaphore).map_err(|e| {
            tracing::warn!(error = %e, "semaphore creation failed");
            e
        })?;
        Ok(self.semaphores.allocate(SemaphoreImpl::new(native)))
    }

    /// Creates a fence, optionally already signaled.
    ///
    /// # Errors
    ///
    /// Returns [`GraphicsError::Driver`] on driver exhaustion.
    pub fn create_fence(&self, signaled: bool) -> Result<Fence, GraphicsError> {
        let native = self.gpu.create_object(ObjectKind::Fence).map_err(|e| {
            tracing::warn!(error = %e, "fence creation failed");
            e
        })?;
        Ok(self.fences.allocate(FenceImpl::new(native, signaled)))
    }

    /// Submits recorded work using `pipeline`, to be fenced by `fence`.
    ///
    /// Headless: the submission is counted and the fence is unsignaled
    /// until [`wait_for_fence`](Self::wait_for_fence).
    pub fn submit(&self, pipeline: &Pipeline, fence: Option<&Fence>) {
        self.submits.set(self.submits.get() + 1);
        if let Some(fence) = fence {
            fence.set_signaled(false);
        }
        tracing::trace!(
            pipeline = pipeline.native_id(),
            "work submitted"
        );
    }

    /// Blocks until `fence` signals, i.e. until the submitted work retired.
    pub fn wait_for_fence(&self, fence: &Fence) {
        self.gpu.wait_idle();
        fence.set_signaled(true);
    }

    /// Retires the frame: waits for the driver to go idle, then sweeps
    /// every pool in dependency order (dependents before dependencies).
    ///
    /// Returns the number of resources destroyed.
    pub fn end_frame(&self) -> usize {
        self.gpu.wait_idle();

        let mut swept = 0;
        swept += self.bind_groups.gc();
        swept += self.pipelines.gc();
        swept += self.render_passes.gc();
        swept += self.images.gc();
        swept += self.buffers.gc();
        swept += self.fences.gc();
        swept += self.semaphores.gc();

        let frame = self.frame.get();
        self.frame.set(frame + 1);
        tracing::debug!(frame, swept, "frame retired");
        swept
    }

    /// Index of the frame currently being recorded.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame.get()
    }

    /// Total submissions since device creation.
    #[must_use]
    pub fn submit_count(&self) -> u64 {
        self.submits.get()
    }

    /// Live-resource counts per pool.
    #[must_use]
    pub fn census(&self) -> DeviceCensus {
        DeviceCensus {
            buffers: self.buffers.live_count(),
            images: self.images.live_count(),
            bind_groups: self.bind_groups.live_count(),
            pipelines: self.pipelines.live_count(),
            render_passes: self.render_passes.live_count(),
            semaphores: self.semaphores.live_count(),
            fences: self.fences.live_count(),
        }
    }

    /// Slots marked as garbage across all pools, awaiting the next
    /// [`end_frame`](Self::end_frame).
    #[must_use]
    pub fn pending_destroy_count(&self) -> usize {
        self.bind_groups.garbage_count()
            + self.pipelines.garbage_count()
            + self.render_passes.garbage_count()
            + self.images.garbage_count()
            + self.buffers.garbage_count()
            + self.fences.garbage_count()
            + self.semaphores.garbage_count()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        // Teardown in dependency order; only legal once nothing outside the
        // device still holds a handle and the driver is idle.
        self.gpu.wait_idle();
        self.bind_groups.free_all();
        self.pipelines.free_all();
        self.render_passes.free_all();
        self.images.free_all();
        self.buffers.free_all();
        self.fences.free_all();
        self.semaphores.free_all();
        tracing::debug!("device torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{BindGroupEntry, BindingResource, BufferUsage, Format};

    fn buffer_desc(size: u64) -> BufferDescriptor {
        BufferDescriptor {
            size,
            usage: BufferUsage::Vertex,
        }
    }

    fn image_desc() -> ImageDescriptor {
        ImageDescriptor {
            extent: [64, 64, 1],
            format: Format::Rgba8Unorm,
            mip_levels: 1,
        }
    }

    #[test]
    fn test_native_release_waits_for_frame_boundary() {
        let gpu = Gpu::new();
        let device = Device::new(gpu.clone());

        let buffer = device.create_buffer(&buffer_desc(1024)).unwrap();
        assert_eq!(gpu.live_objects_of(ObjectKind::Buffer), 1);

        drop(buffer);
        assert_eq!(device.pending_destroy_count(), 1);
        assert_eq!(
            gpu.live_objects_of(ObjectKind::Buffer),
            1,
            "native object must survive until the sweep"
        );

        let waits_before = gpu.fence_waits();
        assert_eq!(device.end_frame(), 1);
        assert!(gpu.fence_waits() > waits_before, "sweep ran before idle wait");
        assert_eq!(gpu.live_objects_of(ObjectKind::Buffer), 0);
    }

    #[test]
    fn test_zero_size_buffer_is_rejected_without_native_call() {
        let gpu = Gpu::new();
        let device = Device::new(gpu.clone());

        let err = device.create_buffer(&buffer_desc(0)).unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidDescriptor { .. }));
        assert_eq!(gpu.live_objects(), 0);
        assert_eq!(device.pending_destroy_count(), 0);
    }

    #[test]
    fn test_image_memory_failure_releases_reserved_slot() {
        // Budget of one: the image object itself fits, its memory does not.
        let gpu = Gpu::with_object_capacity(1);
        let device = Device::new(gpu.clone());

        let err = device.create_image(&image_desc()).unwrap_err();
        assert!(matches!(err, GraphicsError::Driver(_)));

        // The reserved slot went down the garbage path, not leaked.
        assert_eq!(device.census().images, 0);
        assert_eq!(device.pending_destroy_count(), 1);
        assert_eq!(gpu.live_objects_of(ObjectKind::Image), 1);

        device.end_frame();
        assert_eq!(device.pending_destroy_count(), 0);
        assert_eq!(gpu.live_objects(), 0);

        // The budget is free again, so creation now succeeds... almost:
        // image + memory need two objects, so raise the budget via a fresh
        // driver to prove the slot itself is reusable.
        let gpu = Gpu::with_object_capacity(2);
        let device = Device::new(gpu.clone());
        let image = device.create_image(&image_desc()).unwrap();
        assert!(image.has_memory());
    }

    #[test]
    fn test_bind_group_keeps_buffer_alive() {
        let gpu = Gpu::new();
        let device = Device::new(gpu.clone());

        let buffer = device.create_buffer(&buffer_desc(256)).unwrap();
        let bind_group = device
            .create_bind_group(BindGroupDescriptor {
                entries: vec![BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::Buffer(buffer.clone()),
                }],
            })
            .unwrap();

        drop(buffer);
        device.end_frame();
        assert_eq!(
            gpu.live_objects_of(ObjectKind::Buffer),
            1,
            "bind group entry must keep the buffer alive"
        );

        drop(bind_group);
        device.end_frame();
        assert_eq!(gpu.live_objects(), 0);
    }

    #[test]
    fn test_pipeline_and_pass_cascade_in_one_frame() {
        let gpu = Gpu::new();
        let device = Device::new(gpu.clone());

        let pass = device
            .create_render_pass(&RenderPassDescriptor {
                color_formats: vec![Format::Bgra8Unorm],
                depth_format: Some(Format::Depth24Stencil8),
            })
            .unwrap();
        let pipeline = device
            .create_pipeline(PipelineDescriptor {
                shader_source: "fn main() {}".into(),
                render_pass: pass.clone(),
            })
            .unwrap();

        drop(pass);
        drop(pipeline);
        // Pipelines sweep before passes, so the handle the pipeline held is
        // released early enough for the pass to go in the same frame.
        assert_eq!(device.end_frame(), 2);
        assert_eq!(gpu.live_objects(), 0);
    }

    #[test]
    fn test_submit_and_fence_roundtrip() {
        let gpu = Gpu::new();
        let device = Device::new(gpu.clone());

        let pass = device
            .create_render_pass(&RenderPassDescriptor {
                color_formats: vec![Format::Rgba8Unorm],
                depth_format: None,
            })
            .unwrap();
        let pipeline = device
            .create_pipeline(PipelineDescriptor {
                shader_source: "fn main() {}".into(),
                render_pass: pass,
            })
            .unwrap();
        let fence = device.create_fence(false).unwrap();

        device.submit(&pipeline, Some(&fence));
        assert!(!fence.is_signaled());
        device.wait_for_fence(&fence);
        assert!(fence.is_signaled());
        assert_eq!(device.submit_count(), 1);
    }

    #[test]
    fn test_teardown_releases_every_native_object() {
        let gpu = Gpu::new();
        {
            let device = Device::new(gpu.clone());
            let semaphore = device.create_semaphore().unwrap();
            let buffer = device.create_buffer(&buffer_desc(64)).unwrap();
            drop(buffer); // garbage at teardown time
            drop(semaphore); // handles must not outlive the device
        }
        assert_eq!(gpu.live_objects(), 0);
    }
}
