//! # Physics Context
//!
//! The context is the crate's owning manager: one pooled allocator per
//! actor kind, `create_*` entry points that validate descriptors before
//! touching a pool, and a [`Context::gc`] that sweeps the pools in
//! dependency order once the current simulation step has been retired.
//!
//! ## Design Philosophy
//!
//! Creation is fallible and loud: a bad descriptor returns a
//! [`PhysicsError`] and logs a warning rather than producing a half-built
//! actor. Destruction is deferred and silent: dropping the last handle
//! marks the slot, and nothing is reclaimed until the per-tick sweep.

use glam::{Quat, Vec3};
use kestrel_core::{BlockAllocator, Handle};
use tracing::{debug, warn};

use crate::controller::{CapsuleController, CapsuleControllerDescriptor, CapsuleControllerImpl};
use crate::error::PhysicsError;
use crate::joint::{D6Joint, D6JointImpl, JointFrame};
use crate::material::{Material, MaterialImpl};
use crate::rigid_body::{BodyKind, RigidBodyImpl, RigidDynamic, RigidStatic};
use crate::scene::Scene;
use crate::shape::{Geometry, Shape, ShapeImpl};
use crate::vehicle::{Vehicle4WDrive, VehicleDescriptor, VehicleManager};

/// Default downward gravity, matching Earth at sea level.
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Snapshot of live actor counts across every pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextCensus {
    /// Live materials.
    pub materials: usize,
    /// Live shapes.
    pub shapes: usize,
    /// Live rigid bodies.
    pub bodies: usize,
    /// Live joints.
    pub joints: usize,
    /// Live capsule controllers.
    pub controllers: usize,
    /// Live vehicles.
    pub vehicles: usize,
}

impl ContextCensus {
    /// Total live actors across all pools.
    #[must_use]
    pub fn total(&self) -> usize {
        self.materials + self.shapes + self.bodies + self.joints + self.controllers + self.vehicles
    }
}

/// Owns every physics pool and the scene that steps them.
pub struct Context {
    materials: BlockAllocator<MaterialImpl>,
    shapes: BlockAllocator<ShapeImpl>,
    bodies: BlockAllocator<RigidBodyImpl>,
    joints: BlockAllocator<D6JointImpl>,
    controllers: BlockAllocator<CapsuleControllerImpl>,
    vehicles: VehicleManager,
    scene: Scene,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(DEFAULT_GRAVITY)
    }
}

impl Context {
    /// Creates a context with empty pools and the given gravity.
    #[must_use]
    pub fn new(gravity: Vec3) -> Self {
        let bodies: BlockAllocator<RigidBodyImpl> = BlockAllocator::default();
        Self {
            materials: BlockAllocator::default(),
            shapes: BlockAllocator::default(),
            scene: Scene::new(bodies.clone(), gravity),
            bodies,
            joints: BlockAllocator::default(),
            controllers: BlockAllocator::default(),
            vehicles: VehicleManager::new(),
        }
    }

    /// The simulation scene owned by this context.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Creates a surface material.
    ///
    /// Frictions must be non-negative and restitution within `[0, 1]`.
    pub fn create_material(
        &self,
        static_friction: f32,
        dynamic_friction: f32,
        restitution: f32,
    ) -> Result<Material, PhysicsError> {
        if static_friction < 0.0 || dynamic_friction < 0.0 {
            warn!(static_friction, dynamic_friction, "rejected material");
            return Err(PhysicsError::InvalidMaterial {
                reason: "friction coefficients must be non-negative".into(),
            });
        }
        if !(0.0..=1.0).contains(&restitution) {
            warn!(restitution, "rejected material");
            return Err(PhysicsError::InvalidMaterial {
                reason: "restitution must be within [0, 1]".into(),
            });
        }
        Ok(self
            .materials
            .allocate(MaterialImpl::new(static_friction, dynamic_friction, restitution)))
    }

    /// Creates a collision shape from a geometry and a material.
    pub fn create_shape(
        &self,
        geometry: Geometry,
        material: Material,
    ) -> Result<Shape, PhysicsError> {
        if let Some(reason) = invalid_geometry(&geometry) {
            warn!(?geometry, "rejected shape");
            return Err(PhysicsError::InvalidGeometry {
                reason: reason.into(),
            });
        }
        Ok(self.shapes.allocate(ShapeImpl::new(geometry, material)))
    }

    /// Creates a static body registered with the scene.
    pub fn create_rigid_static(&self, position: Vec3, rotation: Quat) -> RigidStatic {
        let handle = self
            .bodies
            .allocate(RigidBodyImpl::new(BodyKind::Static, position, rotation));
        self.scene.add_actor(handle.clone());
        RigidStatic::new(handle)
    }

    /// Creates a dynamic body registered with the scene.
    pub fn create_rigid_dynamic(&self, position: Vec3, rotation: Quat) -> RigidDynamic {
        let handle = self
            .bodies
            .allocate(RigidBodyImpl::new(BodyKind::Dynamic, position, rotation));
        self.scene.add_actor(handle.clone());
        RigidDynamic::new(handle)
    }

    /// Creates a six-degree-of-freedom joint between two actors, anchored
    /// at the given actor-local frames. All axes start locked.
    pub fn create_d6_joint(
        &self,
        actor0: &Handle<RigidBodyImpl>,
        frame0: JointFrame,
        actor1: &Handle<RigidBodyImpl>,
        frame1: JointFrame,
    ) -> Result<D6Joint, PhysicsError> {
        if actor0.ptr_eq(actor1) {
            warn!("rejected joint between an actor and itself");
            return Err(PhysicsError::InvalidDescriptor {
                reason: "joint must connect two distinct actors".into(),
            });
        }
        let handle = self.joints.allocate(D6JointImpl::new(
            actor0.clone(),
            frame0,
            actor1.clone(),
            frame1,
        ));
        Ok(D6Joint::new(handle))
    }

    /// Creates a capsule character controller stepped with the scene.
    pub fn create_capsule_controller(
        &self,
        desc: &CapsuleControllerDescriptor,
    ) -> Result<CapsuleController, PhysicsError> {
        if desc.radius <= 0.0 || desc.height <= 0.0 {
            warn!(desc.radius, desc.height, "rejected capsule controller");
            return Err(PhysicsError::InvalidDescriptor {
                reason: "capsule radius and height must be positive".into(),
            });
        }
        let handle = self.controllers.allocate(CapsuleControllerImpl::new(desc));
        self.scene.add_controller(handle.clone());
        Ok(CapsuleController::new(handle))
    }

    /// Creates a four-wheel drive vehicle over a dynamic chassis.
    pub fn create_vehicle_4w_drive(
        &self,
        chassis: &RigidDynamic,
        desc: &VehicleDescriptor,
    ) -> Result<Vehicle4WDrive, PhysicsError> {
        if desc.wheel_radius <= 0.0 || desc.engine_accel <= 0.0 {
            warn!(desc.wheel_radius, desc.engine_accel, "rejected vehicle");
            return Err(PhysicsError::InvalidDescriptor {
                reason: "wheel radius and engine acceleration must be positive".into(),
            });
        }
        Ok(self.vehicles.create(chassis.handle().clone(), desc))
    }

    /// The vehicle manager owned by this context.
    #[must_use]
    pub fn vehicles(&self) -> &VehicleManager {
        &self.vehicles
    }

    /// Applies vehicle drive inputs, then advances the scene by `dt`.
    pub fn update(&self, dt: f32) {
        self.vehicles.update(dt);
        self.scene.simulate(dt);
    }

    /// Retires the in-flight step; see [`Scene::fetch_results`].
    pub fn fetch_results(&self) -> Option<crate::scene::SimulationSummary> {
        self.scene.fetch_results()
    }

    /// Sweeps every pool in dependency order and returns the total number
    /// of actors reclaimed.
    ///
    /// A no-op while step results are still in flight; reclaiming actors
    /// the solver may still reference is a caller bug.
    pub fn gc(&self) -> usize {
        if self.scene.results_pending() {
            debug_assert!(!self.scene.results_pending(), "gc during in-flight step");
            warn!("gc called with simulation results pending, sweep skipped");
            return 0;
        }
        let swept = self.vehicles.gc()
            + self.joints.gc()
            + self.controllers.gc()
            + self.bodies.gc()
            + self.shapes.gc()
            + self.materials.gc();
        if swept > 0 {
            debug!(swept, "physics gc");
        }
        swept
    }

    /// Live actor counts per pool.
    #[must_use]
    pub fn census(&self) -> ContextCensus {
        ContextCensus {
            materials: self.materials.live_count(),
            shapes: self.shapes.live_count(),
            bodies: self.bodies.live_count(),
            joints: self.joints.live_count(),
            controllers: self.controllers.live_count(),
            vehicles: self.vehicles.live_count(),
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        // Dependents before dependencies: a vehicle retains its chassis, a
        // joint retains both its actors, a body retains its shapes, a shape
        // retains its material.
        self.vehicles.teardown();
        self.scene.clear();
        self.joints.free_all();
        self.controllers.free_all();
        self.bodies.free_all();
        self.shapes.free_all();
        self.materials.free_all();
    }
}

fn invalid_geometry(geometry: &Geometry) -> Option<&'static str> {
    match *geometry {
        Geometry::Sphere { radius } if radius <= 0.0 => Some("sphere radius must be positive"),
        Geometry::Box { half_extents } if half_extents.min_element() <= 0.0 => {
            Some("box half extents must be positive")
        }
        Geometry::Capsule { radius, half_height } if radius <= 0.0 || half_height <= 0.0 => {
            Some("capsule radius and half height must be positive")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::DriveState;

    fn test_context() -> Context {
        Context::default()
    }

    #[test]
    fn test_invalid_descriptors_are_rejected() {
        let ctx = test_context();
        assert!(ctx.create_material(-1.0, 0.5, 0.1).is_err());
        assert!(ctx.create_material(0.5, 0.5, 2.0).is_err());

        let material = ctx.create_material(0.5, 0.5, 0.1).unwrap();
        assert!(ctx
            .create_shape(Geometry::Sphere { radius: 0.0 }, material)
            .is_err());
        assert!(ctx
            .create_capsule_controller(&CapsuleControllerDescriptor {
                radius: 0.0,
                height: 1.8,
                position: Vec3::ZERO,
            })
            .is_err());
        assert_eq!(ctx.census().shapes, 0);
        assert_eq!(ctx.census().controllers, 0);
    }

    #[test]
    fn test_shape_chain_keeps_material_live() {
        let ctx = test_context();
        let material = ctx.create_material(0.5, 0.5, 0.1).unwrap();
        let shape = ctx
            .create_shape(Geometry::Sphere { radius: 1.0 }, material.clone())
            .unwrap();
        let actor = ctx.create_rigid_dynamic(Vec3::ZERO, Quat::IDENTITY);
        actor.attach_shape(shape.clone());

        drop(material);
        drop(shape);
        assert_eq!(ctx.gc(), 0);
        assert_eq!(ctx.census().materials, 1);
        assert_eq!(ctx.census().shapes, 1);

        ctx.scene().remove_actor(actor.handle());
        drop(actor);
        // One sweep reclaims the whole chain: the body drop releases the
        // shape, whose drop releases the material, before their pools are
        // visited.
        assert_eq!(ctx.gc(), 3);
        assert_eq!(ctx.census().total(), 0);
    }

    #[test]
    fn test_gc_skipped_while_results_pending() {
        let ctx = test_context();
        let actor = ctx.create_rigid_dynamic(Vec3::new(0.0, 5.0, 0.0), Quat::IDENTITY);
        ctx.scene().remove_actor(actor.handle());
        drop(actor);

        ctx.update(0.016);
        let swept = if cfg!(debug_assertions) {
            // The guard traps in debug builds and skips in release.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| ctx.gc()));
            assert!(result.is_err());
            0
        } else {
            ctx.gc()
        };
        assert_eq!(swept, 0);
        assert_eq!(ctx.census().bodies, 1);

        ctx.fetch_results().unwrap();
        assert_eq!(ctx.gc(), 1);
        assert_eq!(ctx.census().bodies, 0);
    }

    #[test]
    fn test_joint_keeps_both_actors_live() {
        use crate::joint::{D6Axis, D6Motion};

        let ctx = test_context();
        let anchor = ctx.create_rigid_static(Vec3::ZERO, Quat::IDENTITY);
        let swinging = ctx.create_rigid_dynamic(Vec3::Y, Quat::IDENTITY);

        assert!(ctx
            .create_d6_joint(
                anchor.handle(),
                JointFrame::default(),
                anchor.handle(),
                JointFrame::default(),
            )
            .is_err());

        let joint = ctx
            .create_d6_joint(
                anchor.handle(),
                JointFrame::default(),
                swinging.handle(),
                JointFrame::default(),
            )
            .unwrap();
        joint.set_motion(D6Axis::Swing1, D6Motion::Free);

        ctx.scene().remove_actor(anchor.handle());
        ctx.scene().remove_actor(swinging.handle());
        drop(anchor);
        drop(swinging);

        // The joint's retained handles keep both bodies out of the sweep.
        assert_eq!(ctx.gc(), 0);
        assert_eq!(ctx.census().bodies, 2);
        assert_eq!(ctx.census().joints, 1);

        drop(joint);
        // Joints sweep before bodies, so the whole chain drains in one gc.
        assert_eq!(ctx.gc(), 3);
        assert_eq!(ctx.census().total(), 0);
    }

    #[test]
    fn test_vehicle_drive_moves_chassis() {
        let ctx = test_context();
        ctx.scene().set_gravity(Vec3::ZERO);
        let chassis = ctx.create_rigid_dynamic(Vec3::ZERO, Quat::IDENTITY);
        let vehicle = ctx
            .create_vehicle_4w_drive(
                &chassis,
                &VehicleDescriptor {
                    wheel_radius: 0.4,
                    engine_accel: 8.0,
                },
            )
            .unwrap();

        vehicle.set_drive(DriveState {
            accelerate: 1.0,
            ..DriveState::default()
        });
        ctx.update(1.0);
        ctx.fetch_results().unwrap();
        assert!(chassis.position().z > 0.0);
    }

    #[test]
    fn test_controller_falls_and_grounds() {
        let ctx = test_context();
        let controller = ctx
            .create_capsule_controller(&CapsuleControllerDescriptor {
                radius: 0.4,
                height: 1.8,
                position: Vec3::new(0.0, 2.0, 0.0),
            })
            .unwrap();
        assert!(!controller.is_grounded());

        for _ in 0..120 {
            ctx.update(0.016);
            ctx.fetch_results().unwrap();
        }
        assert!(controller.is_grounded());
        assert_eq!(controller.position().y, 0.0);
    }

    #[test]
    fn test_teardown_reclaims_everything() {
        let ctx = test_context();
        let material = ctx.create_material(0.5, 0.5, 0.1).unwrap();
        let shape = ctx
            .create_shape(Geometry::Sphere { radius: 1.0 }, material)
            .unwrap();
        let actor = ctx.create_rigid_dynamic(Vec3::ZERO, Quat::IDENTITY);
        actor.attach_shape(shape);
        let vehicle = ctx
            .create_vehicle_4w_drive(
                &actor,
                &VehicleDescriptor {
                    wheel_radius: 0.4,
                    engine_accel: 8.0,
                },
            )
            .unwrap();

        std::mem::forget(actor);
        std::mem::forget(vehicle);
        drop(ctx);
        // Drop ran free_all on every pool; reaching here without a debug
        // assertion firing means the dependency order held.
    }
}
