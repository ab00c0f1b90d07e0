//! Capsule character controllers.
//!
//! A controller lives in a scene and is stepped with it; the scene is its
//! dependency, so controllers are always torn down first. The controller's
//! position is its foot point; the ground plane sits at `y = 0`.

use std::cell::Cell;

use glam::Vec3;
use kestrel_core::{Handle, RefCount, RefCounted};

/// Creation parameters for
/// [`Context::create_capsule_controller`](crate::Context::create_capsule_controller).
#[derive(Clone, Copy, Debug)]
pub struct CapsuleControllerDescriptor {
    /// Capsule radius; must be positive.
    pub radius: f32,
    /// Total capsule height; must be positive.
    pub height: f32,
    /// Initial foot position.
    pub position: Vec3,
}

/// Pooled controller implementation. Reached only through
/// [`CapsuleController`].
pub struct CapsuleControllerImpl {
    refs: RefCount,
    radius: f32,
    height: f32,
    position: Cell<Vec3>,
    vertical_velocity: Cell<f32>,
    grounded: Cell<bool>,
    pending_move: Cell<Vec3>,
}

impl CapsuleControllerImpl {
    pub(crate) fn new(desc: &CapsuleControllerDescriptor) -> Self {
        Self {
            refs: RefCount::new(),
            radius: desc.radius,
            height: desc.height,
            position: Cell::new(desc.position),
            vertical_velocity: Cell::new(0.0),
            grounded: Cell::new(desc.position.y <= 0.0),
            pending_move: Cell::new(Vec3::ZERO),
        }
    }

    /// Capsule radius.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Total capsule height.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Current foot position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position.get()
    }

    /// Whether the controller rested on the ground after the last step.
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.grounded.get()
    }

    pub(crate) fn queue_move(&self, displacement: Vec3) {
        self.pending_move.set(self.pending_move.get() + displacement);
    }

    pub(crate) fn teleport(&self, position: Vec3) {
        self.position.set(position);
        self.vertical_velocity.set(0.0);
        self.grounded.set(position.y <= 0.0);
    }

    /// Applies the queued displacement plus gravity, clamping at the
    /// ground plane.
    pub(crate) fn step(&self, dt: f32, gravity_y: f32) {
        let vertical = self.vertical_velocity.get() + gravity_y * dt;
        let mut position =
            self.position.get() + self.pending_move.take() + Vec3::new(0.0, vertical * dt, 0.0);

        if position.y <= 0.0 {
            position.y = 0.0;
            self.vertical_velocity.set(0.0);
            self.grounded.set(true);
        } else {
            self.vertical_velocity.set(vertical);
            self.grounded.set(false);
        }
        self.position.set(position);
    }
}

impl RefCounted for CapsuleControllerImpl {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

/// Owning wrapper over a pooled capsule controller.
pub struct CapsuleController {
    handle: Handle<CapsuleControllerImpl>,
}

impl CapsuleController {
    pub(crate) fn new(handle: Handle<CapsuleControllerImpl>) -> Self {
        Self { handle }
    }

    /// The underlying pooled handle.
    #[must_use]
    pub fn handle(&self) -> &Handle<CapsuleControllerImpl> {
        &self.handle
    }

    /// Current foot position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.handle.position()
    }

    /// Whether the controller rested on the ground after the last step.
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.handle.is_grounded()
    }

    /// Queues a displacement for the next simulation step.
    pub fn move_by(&self, displacement: Vec3) {
        self.handle.queue_move(displacement);
    }

    /// Moves the controller instantly, resetting its fall state.
    pub fn teleport(&self, position: Vec3) {
        self.handle.teleport(position);
    }
}
