//! # Frame Loop
//!
//! One frame is one full turn of the lifetime machinery, in a fixed order:
//!
//! 1. Drive inputs and physics step ([`kestrel_physics::Context::update`])
//! 2. Retire the step ([`kestrel_physics::Context::fetch_results`])
//! 3. Sweep physics pools, then asset pools
//! 4. Record and submit GPU work
//! 5. Retire the frame and sweep GPU pools
//!    ([`kestrel_graphics::Device::end_frame`])
//!
//! Sweeps run only at these two points. Nothing between them may destroy a
//! pooled resource, so a handle dropped mid-frame stays addressable until
//! the frame ends.

use glam::Vec3;
use kestrel_graphics::{Device, Gpu, ModelManager};
use kestrel_physics::Context;
use tracing::{debug, info};

use crate::config::EngineConfig;

/// Per-frame accounting, returned by [`Engine::run_frame`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    /// Frame index, starting at 1.
    pub frame: u64,
    /// Simulation tick retired this frame, if a step ran.
    pub tick: Option<u64>,
    /// Physics actors reclaimed this frame.
    pub physics_swept: usize,
    /// Models reclaimed this frame.
    pub models_swept: usize,
    /// GPU resources reclaimed this frame.
    pub graphics_swept: usize,
}

impl FrameStats {
    /// Total resources reclaimed this frame.
    #[must_use]
    pub fn total_swept(&self) -> usize {
        self.physics_swept + self.models_swept + self.graphics_swept
    }
}

/// Owns the exemplar managers and turns frames.
///
/// Field order is teardown order: models retain device buffers, so the
/// asset and physics managers drop before the device frees its pools.
pub struct Engine {
    models: ModelManager,
    physics: Context,
    device: Device,
    timestep: f32,
    frame: u64,
}

impl Engine {
    /// Builds the managers from a loaded config.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let device = Device::with_block_capacity(Gpu::new(), config.memory.block_capacity);
        let physics = Context::new(Vec3::new(0.0, -config.physics.gravity, 0.0));
        info!(
            block_capacity = config.memory.block_capacity,
            timestep = config.physics.timestep,
            "engine initialized"
        );
        Self {
            models: ModelManager::new(),
            physics,
            device,
            timestep: config.physics.timestep,
            frame: 0,
        }
    }

    /// The GPU resource manager.
    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The asset manager.
    #[must_use]
    pub fn models(&self) -> &ModelManager {
        &self.models
    }

    /// The physics context.
    #[must_use]
    pub fn physics(&self) -> &Context {
        &self.physics
    }

    /// Turns one frame and returns what it reclaimed.
    pub fn run_frame(&mut self) -> FrameStats {
        self.frame += 1;

        self.physics.update(self.timestep);
        let tick = self.physics.fetch_results().map(|summary| summary.tick);

        let physics_swept = self.physics.gc();
        let models_swept = self.models.gc();
        let graphics_swept = self.device.end_frame();

        let stats = FrameStats {
            frame: self.frame,
            tick,
            physics_swept,
            models_swept,
            graphics_swept,
        };
        if stats.total_swept() > 0 {
            debug!(stats.frame, swept = stats.total_swept(), "frame retired");
        }
        stats
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        info!(frames = self.frame, "engine shutdown");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_graphics::{BufferDescriptor, BufferUsage};

    fn test_engine() -> Engine {
        Engine::new(&EngineConfig::default())
    }

    #[test]
    fn test_frames_advance_ticks() {
        let mut engine = test_engine();
        let first = engine.run_frame();
        let second = engine.run_frame();
        assert_eq!(first.frame, 1);
        assert_eq!(first.tick, Some(1));
        assert_eq!(second.tick, Some(2));
    }

    #[test]
    fn test_dropped_buffer_survives_until_frame_end() {
        let mut engine = test_engine();
        let buffer = engine
            .device()
            .create_buffer(&BufferDescriptor {
                size: 256,
                usage: BufferUsage::Vertex,
            })
            .unwrap();
        drop(buffer);

        assert_eq!(engine.device().pending_destroy_count(), 1);
        let stats = engine.run_frame();
        assert_eq!(stats.graphics_swept, 1);
        assert_eq!(engine.device().pending_destroy_count(), 0);
    }

    #[test]
    fn test_model_release_cascades_within_one_frame() {
        let mut engine = test_engine();
        let model = engine
            .models()
            .load(
                engine.device(),
                "cube",
                &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
                &[0, 1, 2],
            )
            .unwrap();
        drop(model);

        let stats = engine.run_frame();
        assert_eq!(stats.models_swept, 1);
        assert_eq!(stats.graphics_swept, 2);
        assert_eq!(engine.models().live_count(), 0);
    }
}
