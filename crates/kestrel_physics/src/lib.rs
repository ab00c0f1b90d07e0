//! # KESTREL Physics
//!
//! The simulation-side exemplar of the engine's resource-lifetime pattern:
//! a [`Context`] owns one pooled allocator per actor kind (materials,
//! shapes, rigid bodies, joints, capsule controllers, 4W-drive vehicles),
//! `create_*`
//! calls hand out refcounted handles, and [`Context::gc`] runs once per
//! tick, strictly after [`Scene::fetch_results`], so no actor is destroyed
//! while the solver could still reference it.
//!
//! The real physics SDK is a collaborator outside this repository; the
//! small kinematic stepper in [`Scene`] stands where it would attach.

pub mod context;
pub mod controller;
pub mod error;
pub mod joint;
pub mod material;
pub mod rigid_body;
pub mod scene;
pub mod shape;
pub mod vehicle;

pub use context::{Context, ContextCensus, DEFAULT_GRAVITY};
pub use controller::{CapsuleController, CapsuleControllerDescriptor, CapsuleControllerImpl};
pub use error::PhysicsError;
pub use joint::{D6Axis, D6Joint, D6JointImpl, D6Motion, JointFrame};
pub use material::{Material, MaterialImpl};
pub use rigid_body::{BodyKind, RigidActorView, RigidBodyImpl, RigidDynamic, RigidStatic};
pub use scene::{RaycastHit, Scene, SimulationSummary};
pub use shape::{Geometry, Shape, ShapeImpl};
pub use vehicle::{DriveState, Vehicle4WDrive, Vehicle4WDriveImpl, VehicleDescriptor, VehicleManager};
