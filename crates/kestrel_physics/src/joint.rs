//! Six-degree-of-freedom joints.
//!
//! A joint constrains two actors; it retains a handle to each, so a live
//! joint keeps both actors live and the per-tick sweep visits the joint
//! pool before the body pool. Anchor frames are local to their actor.

use std::cell::Cell;

use glam::{Quat, Vec3};
use kestrel_core::{Handle, RefCount, RefCounted};

use crate::rigid_body::RigidBodyImpl;

/// Per-axis constraint mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum D6Motion {
    /// The axis does not move.
    #[default]
    Locked,
    /// The axis moves within its limit.
    Limited,
    /// The axis moves without constraint.
    Free,
}

/// The six constrained axes: three translational, twist about the joint
/// axis, and the two swing cones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum D6Axis {
    /// Translation along the joint's X axis.
    X,
    /// Translation along the joint's Y axis.
    Y,
    /// Translation along the joint's Z axis.
    Z,
    /// Rotation about the joint's X axis.
    Twist,
    /// Rotation about the joint's Y axis.
    Swing1,
    /// Rotation about the joint's Z axis.
    Swing2,
}

impl D6Axis {
    const COUNT: usize = 6;

    fn index(self) -> usize {
        self as usize
    }
}

/// An anchor pose local to one of the joined actors.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct JointFrame {
    /// Anchor offset from the actor's origin.
    pub position: Vec3,
    /// Anchor orientation relative to the actor.
    pub rotation: Quat,
}

/// Pooled joint implementation. Reached only through [`D6Joint`].
pub struct D6JointImpl {
    refs: RefCount,
    actor0: Handle<RigidBodyImpl>,
    actor1: Handle<RigidBodyImpl>,
    frame0: Cell<JointFrame>,
    frame1: Cell<JointFrame>,
    motions: [Cell<D6Motion>; D6Axis::COUNT],
    break_force: Cell<f32>,
    break_torque: Cell<f32>,
}

impl D6JointImpl {
    pub(crate) fn new(
        actor0: Handle<RigidBodyImpl>,
        frame0: JointFrame,
        actor1: Handle<RigidBodyImpl>,
        frame1: JointFrame,
    ) -> Self {
        Self {
            refs: RefCount::new(),
            actor0,
            actor1,
            frame0: Cell::new(frame0),
            frame1: Cell::new(frame1),
            motions: std::array::from_fn(|_| Cell::new(D6Motion::Locked)),
            break_force: Cell::new(f32::INFINITY),
            break_torque: Cell::new(f32::INFINITY),
        }
    }

    /// The first joined actor.
    #[must_use]
    pub fn actor0(&self) -> &Handle<RigidBodyImpl> {
        &self.actor0
    }

    /// The second joined actor.
    #[must_use]
    pub fn actor1(&self) -> &Handle<RigidBodyImpl> {
        &self.actor1
    }

    /// Anchor pose local to the first actor.
    #[must_use]
    pub fn frame0(&self) -> JointFrame {
        self.frame0.get()
    }

    /// Anchor pose local to the second actor.
    #[must_use]
    pub fn frame1(&self) -> JointFrame {
        self.frame1.get()
    }

    /// Constraint mode for one axis.
    #[must_use]
    pub fn motion(&self, axis: D6Axis) -> D6Motion {
        self.motions[axis.index()].get()
    }

    /// Force and torque thresholds past which the joint breaks.
    #[must_use]
    pub fn break_force(&self) -> (f32, f32) {
        (self.break_force.get(), self.break_torque.get())
    }

    pub(crate) fn set_motion(&self, axis: D6Axis, motion: D6Motion) {
        self.motions[axis.index()].set(motion);
    }

    pub(crate) fn set_frames(&self, frame0: JointFrame, frame1: JointFrame) {
        self.frame0.set(frame0);
        self.frame1.set(frame1);
    }

    pub(crate) fn set_break_force(&self, force: f32, torque: f32) {
        self.break_force.set(force);
        self.break_torque.set(torque);
    }
}

impl RefCounted for D6JointImpl {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

/// Owning wrapper over a pooled joint.
pub struct D6Joint {
    handle: Handle<D6JointImpl>,
}

impl D6Joint {
    pub(crate) fn new(handle: Handle<D6JointImpl>) -> Self {
        Self { handle }
    }

    /// The underlying pooled handle.
    #[must_use]
    pub fn handle(&self) -> &Handle<D6JointImpl> {
        &self.handle
    }

    /// Constraint mode for one axis.
    #[must_use]
    pub fn motion(&self, axis: D6Axis) -> D6Motion {
        self.handle.motion(axis)
    }

    /// Sets the constraint mode for one axis.
    pub fn set_motion(&self, axis: D6Axis, motion: D6Motion) {
        self.handle.set_motion(axis, motion);
    }

    /// Replaces both anchor poses.
    pub fn set_frames(&self, frame0: JointFrame, frame1: JointFrame) {
        self.handle.set_frames(frame0, frame1);
    }

    /// Sets the force and torque thresholds past which the joint breaks.
    pub fn set_break_force(&self, force: f32, torque: f32) {
        self.handle.set_break_force(force, torque);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rigid_body::BodyKind;
    use kestrel_core::BlockAllocator;

    #[test]
    fn test_axes_default_locked_and_mutate_independently() {
        let bodies: BlockAllocator<RigidBodyImpl> = BlockAllocator::default();
        let a = bodies.allocate(RigidBodyImpl::new(BodyKind::Dynamic, Vec3::ZERO, Quat::IDENTITY));
        let b = bodies.allocate(RigidBodyImpl::new(BodyKind::Static, Vec3::X, Quat::IDENTITY));

        let joints: BlockAllocator<D6JointImpl> = BlockAllocator::default();
        let joint = D6Joint::new(joints.allocate(D6JointImpl::new(
            a,
            JointFrame::default(),
            b,
            JointFrame::default(),
        )));

        assert_eq!(joint.motion(D6Axis::X), D6Motion::Locked);
        joint.set_motion(D6Axis::Twist, D6Motion::Free);
        joint.set_motion(D6Axis::Swing1, D6Motion::Limited);
        assert_eq!(joint.motion(D6Axis::Twist), D6Motion::Free);
        assert_eq!(joint.motion(D6Axis::Swing1), D6Motion::Limited);
        assert_eq!(joint.motion(D6Axis::Swing2), D6Motion::Locked);
    }

    #[test]
    fn test_break_force_defaults_unbreakable() {
        let bodies: BlockAllocator<RigidBodyImpl> = BlockAllocator::default();
        let a = bodies.allocate(RigidBodyImpl::new(BodyKind::Dynamic, Vec3::ZERO, Quat::IDENTITY));
        let b = bodies.allocate(RigidBodyImpl::new(BodyKind::Dynamic, Vec3::X, Quat::IDENTITY));

        let joints: BlockAllocator<D6JointImpl> = BlockAllocator::default();
        let joint = D6Joint::new(joints.allocate(D6JointImpl::new(
            a,
            JointFrame::default(),
            b,
            JointFrame::default(),
        )));

        assert_eq!(joint.handle().break_force(), (f32::INFINITY, f32::INFINITY));
        joint.set_break_force(100.0, 50.0);
        assert_eq!(joint.handle().break_force(), (100.0, 50.0));
    }
}
