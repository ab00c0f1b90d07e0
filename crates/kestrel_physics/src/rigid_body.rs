//! Rigid actors.
//!
//! One pooled implementation type backs static actors, dynamic actors and
//! the read-only views the query paths hand out. Mutators are `pub(crate)`
//! and re-exposed only on the owning wrapper types, which is what makes
//! [`RigidActorView`] a genuinely capability-restricted view over the same
//! pool slot - no subclassing, no duplicate storage.

use std::cell::{Cell, RefCell};

use glam::{Quat, Vec3};
use kestrel_core::{Handle, RefCount, RefCounted, ViewHandle};

use crate::shape::Shape;

/// Whether an actor participates in integration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    /// Never moves; collides.
    Static,
    /// Integrated every tick.
    Dynamic,
}

/// Pooled rigid actor implementation. Reached through [`RigidStatic`],
/// [`RigidDynamic`] or [`RigidActorView`].
pub struct RigidBodyImpl {
    refs: RefCount,
    kind: BodyKind,
    position: Cell<Vec3>,
    rotation: Cell<Quat>,
    linear_velocity: Cell<Vec3>,
    shapes: RefCell<Vec<Shape>>,
}

impl RigidBodyImpl {
    pub(crate) fn new(kind: BodyKind, position: Vec3, rotation: Quat) -> Self {
        Self {
            refs: RefCount::new(),
            kind,
            position: Cell::new(position),
            rotation: Cell::new(rotation),
            linear_velocity: Cell::new(Vec3::ZERO),
            shapes: RefCell::new(Vec::new()),
        }
    }

    /// Static or dynamic.
    #[must_use]
    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    /// World-space position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position.get()
    }

    /// World-space rotation.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotation.get()
    }

    /// Linear velocity; always zero for static actors.
    #[must_use]
    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity.get()
    }

    /// Number of attached shapes.
    #[must_use]
    pub fn shape_count(&self) -> usize {
        self.shapes.borrow().len()
    }

    /// Largest bounding-sphere radius over the attached shapes, if any
    /// attached geometry is bounded.
    #[must_use]
    pub fn bounding_radius(&self) -> Option<f32> {
        self.shapes
            .borrow()
            .iter()
            .filter_map(|shape| shape.geometry().bounding_radius())
            .fold(None, |best, radius| {
                Some(best.map_or(radius, |b: f32| b.max(radius)))
            })
    }

    pub(crate) fn set_position(&self, position: Vec3) {
        self.position.set(position);
    }

    pub(crate) fn set_linear_velocity(&self, velocity: Vec3) {
        self.linear_velocity.set(velocity);
    }

    pub(crate) fn attach_shape(&self, shape: Shape) {
        self.shapes.borrow_mut().push(shape);
    }

    /// Advances the actor by one tick; a no-op for static actors.
    pub(crate) fn integrate(&self, dt: f32, gravity: Vec3) {
        if self.kind != BodyKind::Dynamic {
            return;
        }
        let velocity = self.linear_velocity.get() + gravity * dt;
        self.linear_velocity.set(velocity);
        self.position.set(self.position.get() + velocity * dt);
    }
}

impl RefCounted for RigidBodyImpl {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

/// A non-moving actor.
pub struct RigidStatic {
    handle: Handle<RigidBodyImpl>,
}

impl RigidStatic {
    pub(crate) fn new(handle: Handle<RigidBodyImpl>) -> Self {
        Self { handle }
    }

    /// The underlying pooled handle, for scene registration and identity
    /// comparisons.
    #[must_use]
    pub fn handle(&self) -> &Handle<RigidBodyImpl> {
        &self.handle
    }

    /// World-space position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.handle.position()
    }

    /// Attaches a collision shape; the actor keeps the shape alive.
    pub fn attach_shape(&self, shape: Shape) {
        self.handle.attach_shape(shape);
    }
}

/// An integrated actor.
pub struct RigidDynamic {
    handle: Handle<RigidBodyImpl>,
}

impl RigidDynamic {
    pub(crate) fn new(handle: Handle<RigidBodyImpl>) -> Self {
        Self { handle }
    }

    /// The underlying pooled handle, for scene registration and identity
    /// comparisons.
    #[must_use]
    pub fn handle(&self) -> &Handle<RigidBodyImpl> {
        &self.handle
    }

    /// World-space position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.handle.position()
    }

    /// Current linear velocity.
    #[must_use]
    pub fn linear_velocity(&self) -> Vec3 {
        self.handle.linear_velocity()
    }

    /// Teleports the actor.
    pub fn set_position(&self, position: Vec3) {
        self.handle.set_position(position);
    }

    /// Overrides the linear velocity.
    pub fn set_linear_velocity(&self, velocity: Vec3) {
        self.handle.set_linear_velocity(velocity);
    }

    /// Attaches a collision shape; the actor keeps the shape alive.
    pub fn attach_shape(&self, shape: Shape) {
        self.handle.attach_shape(shape);
    }
}

/// Read-only view over a rigid actor, as returned by query paths
/// (raycasts, overlap tests). Shares the slot and refcount of the actor it
/// observes but exposes accessors only.
pub struct RigidActorView {
    view: ViewHandle<RigidBodyImpl>,
}

impl RigidActorView {
    pub(crate) fn new(view: ViewHandle<RigidBodyImpl>) -> Self {
        Self { view }
    }

    /// Static or dynamic.
    #[must_use]
    pub fn kind(&self) -> BodyKind {
        self.view.kind()
    }

    /// World-space position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.view.position()
    }

    /// World-space rotation.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.view.rotation()
    }

    /// Current linear velocity.
    #[must_use]
    pub fn linear_velocity(&self) -> Vec3 {
        self.view.linear_velocity()
    }

    /// Whether this view observes the same pooled actor as `handle`.
    #[must_use]
    pub fn observes(&self, handle: &Handle<RigidBodyImpl>) -> bool {
        self.view.observes(handle)
    }
}
