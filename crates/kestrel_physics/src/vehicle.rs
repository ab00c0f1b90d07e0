//! Four-wheel drive vehicles and their manager.
//!
//! A vehicle retains the dynamic body it drives, so a live vehicle keeps its
//! chassis body live. The manager keeps its own handle to every created
//! vehicle and is therefore the authority on when a vehicle may be swept.

use std::cell::{Cell, RefCell};

use glam::Vec3;
use kestrel_core::{BlockAllocator, Handle, RefCount, RefCounted};
use tracing::debug;

use crate::rigid_body::RigidBodyImpl;

/// Driver inputs applied on the next update.
#[derive(Clone, Copy, Debug, Default)]
pub struct DriveState {
    /// Throttle in `[0, 1]`.
    pub accelerate: f32,
    /// Brake in `[0, 1]`.
    pub brake: f32,
    /// Steering in `[-1, 1]`, positive steers right.
    pub steer: f32,
}

/// Creation parameters for
/// [`Context::create_vehicle_4w_drive`](crate::Context::create_vehicle_4w_drive).
#[derive(Clone, Copy, Debug)]
pub struct VehicleDescriptor {
    /// Wheel radius; must be positive.
    pub wheel_radius: f32,
    /// Peak forward acceleration at full throttle, in m/s^2.
    pub engine_accel: f32,
}

/// Pooled vehicle implementation. Reached only through [`Vehicle4WDrive`].
pub struct Vehicle4WDriveImpl {
    refs: RefCount,
    body: Handle<RigidBodyImpl>,
    drive: Cell<DriveState>,
    wheel_radius: f32,
    engine_accel: f32,
}

impl Vehicle4WDriveImpl {
    fn new(body: Handle<RigidBodyImpl>, desc: &VehicleDescriptor) -> Self {
        Self {
            refs: RefCount::new(),
            body,
            drive: Cell::new(DriveState::default()),
            wheel_radius: desc.wheel_radius,
            engine_accel: desc.engine_accel,
        }
    }

    /// Wheel radius.
    #[must_use]
    pub fn wheel_radius(&self) -> f32 {
        self.wheel_radius
    }

    /// The chassis body the vehicle drives.
    #[must_use]
    pub fn body(&self) -> &Handle<RigidBodyImpl> {
        &self.body
    }

    /// The drive state applied on the next update.
    #[must_use]
    pub fn drive(&self) -> DriveState {
        self.drive.get()
    }

    pub(crate) fn set_drive(&self, drive: DriveState) {
        self.drive.set(drive);
    }

    /// Converts the drive state into a chassis velocity change.
    pub(crate) fn apply_drive(&self, dt: f32) {
        let drive = self.drive.get();
        let mut velocity = self.body.linear_velocity();

        velocity.z += drive.accelerate.clamp(0.0, 1.0) * self.engine_accel * dt;
        velocity.x += drive.steer.clamp(-1.0, 1.0) * self.engine_accel * 0.5 * dt;

        let brake = drive.brake.clamp(0.0, 1.0);
        if brake > 0.0 {
            let scale = (1.0 - brake * dt * 4.0).max(0.0);
            velocity = Vec3::new(velocity.x * scale, velocity.y, velocity.z * scale);
        }
        self.body.set_linear_velocity(velocity);
    }
}

impl RefCounted for Vehicle4WDriveImpl {
    fn ref_count(&self) -> &RefCount {
        &self.refs
    }
}

/// Owning wrapper over a pooled vehicle.
pub struct Vehicle4WDrive {
    handle: Handle<Vehicle4WDriveImpl>,
}

impl Vehicle4WDrive {
    pub(crate) fn new(handle: Handle<Vehicle4WDriveImpl>) -> Self {
        Self { handle }
    }

    /// The underlying pooled handle.
    #[must_use]
    pub fn handle(&self) -> &Handle<Vehicle4WDriveImpl> {
        &self.handle
    }

    /// The drive state applied on the next update.
    #[must_use]
    pub fn drive(&self) -> DriveState {
        self.handle.drive()
    }

    /// Replaces the driver inputs for the next update.
    pub fn set_drive(&self, drive: DriveState) {
        self.handle.set_drive(drive);
    }

    /// The chassis body the vehicle drives.
    #[must_use]
    pub fn body(&self) -> &Handle<RigidBodyImpl> {
        self.handle.body()
    }
}

/// Owns every vehicle and steps their drive models each update.
pub struct VehicleManager {
    vehicles: BlockAllocator<Vehicle4WDriveImpl>,
    active: RefCell<Vec<Handle<Vehicle4WDriveImpl>>>,
}

impl Default for VehicleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl VehicleManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            vehicles: BlockAllocator::default(),
            active: RefCell::new(Vec::new()),
        }
    }

    /// Creates a vehicle driving `body` and registers it for updates.
    pub fn create(&self, body: Handle<RigidBodyImpl>, desc: &VehicleDescriptor) -> Vehicle4WDrive {
        let handle = self.vehicles.allocate(Vehicle4WDriveImpl::new(body, desc));
        self.active.borrow_mut().push(handle.clone());
        Vehicle4WDrive::new(handle)
    }

    /// Applies every registered vehicle's drive state to its chassis.
    pub fn update(&self, dt: f32) {
        for vehicle in self.active.borrow().iter() {
            vehicle.apply_drive(dt);
        }
    }

    /// Unregisters a vehicle so it can be reclaimed once callers release it.
    pub fn remove(&self, vehicle: &Vehicle4WDrive) {
        self.active
            .borrow_mut()
            .retain(|held| !held.ptr_eq(vehicle.handle()));
    }

    /// Sweeps vehicles released by both the manager and their callers.
    pub fn gc(&self) -> usize {
        self.vehicles.gc()
    }

    /// Number of live vehicles, registered or not.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.vehicles.live_count()
    }

    /// Releases every vehicle and empties the pool. Idempotent.
    pub fn teardown(&self) {
        let released = self.active.borrow_mut().drain(..).count();
        if released > 0 {
            debug!(released, "vehicle manager teardown");
        }
        self.vehicles.free_all();
    }
}

impl Drop for VehicleManager {
    fn drop(&mut self) {
        self.teardown();
    }
}
