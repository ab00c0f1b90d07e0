//! # Simulation Scene
//!
//! The scene owns a handle to every actor and controller registered with it,
//! advances them in [`Scene::simulate`], and surfaces step results through
//! [`Scene::fetch_results`]. Between those two calls the step is considered
//! in flight and pooled actors must not be reclaimed; the context enforces
//! that before sweeping.
//!
//! Raycasts answer against each actor's bounding sphere and return a
//! read-only view of the closest hit, produced by re-entering the pool
//! through the payload pointer.

#![allow(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::ptr::NonNull;

use glam::Vec3;
use kestrel_core::{BlockAllocator, Handle};
use tracing::{debug, warn};

use crate::controller::CapsuleControllerImpl;
use crate::rigid_body::{BodyKind, RigidActorView, RigidBodyImpl};

/// Aggregate results of one completed simulation step.
#[derive(Clone, Copy, Debug)]
pub struct SimulationSummary {
    /// Step index, starting at 1 for the first completed step.
    pub tick: u64,
    /// Dynamic actors integrated this step.
    pub active_actors: usize,
    /// Controllers stepped this step.
    pub active_controllers: usize,
}

/// A raycast hit against an actor's bounding sphere.
pub struct RaycastHit {
    /// Read-only view of the actor that was hit.
    pub actor: RigidActorView,
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// World-space hit point.
    pub position: Vec3,
}

/// Steps registered actors and controllers and answers spatial queries.
pub struct Scene {
    bodies: BlockAllocator<RigidBodyImpl>,
    gravity: Cell<Vec3>,
    actors: RefCell<Vec<Handle<RigidBodyImpl>>>,
    controllers: RefCell<Vec<Handle<CapsuleControllerImpl>>>,
    results_pending: Cell<bool>,
    tick: Cell<u64>,
}

impl Scene {
    /// Creates a scene sharing `bodies` with its owning context.
    pub(crate) fn new(bodies: BlockAllocator<RigidBodyImpl>, gravity: Vec3) -> Self {
        Self {
            bodies,
            gravity: Cell::new(gravity),
            actors: RefCell::new(Vec::new()),
            controllers: RefCell::new(Vec::new()),
            results_pending: Cell::new(false),
            tick: Cell::new(0),
        }
    }

    /// Current gravity vector.
    #[must_use]
    pub fn gravity(&self) -> Vec3 {
        self.gravity.get()
    }

    /// Replaces the gravity vector for subsequent steps.
    pub fn set_gravity(&self, gravity: Vec3) {
        self.gravity.set(gravity);
    }

    /// Number of actors registered with the scene.
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.actors.borrow().len()
    }

    /// Whether a step has been simulated but not yet fetched.
    #[must_use]
    pub fn results_pending(&self) -> bool {
        self.results_pending.get()
    }

    pub(crate) fn add_actor(&self, actor: Handle<RigidBodyImpl>) {
        self.actors.borrow_mut().push(actor);
    }

    pub(crate) fn add_controller(&self, controller: Handle<CapsuleControllerImpl>) {
        self.controllers.borrow_mut().push(controller);
    }

    /// Unregisters an actor so it can be reclaimed once callers release it.
    pub fn remove_actor(&self, actor: &Handle<RigidBodyImpl>) {
        self.actors.borrow_mut().retain(|held| !held.ptr_eq(actor));
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// Results stay in flight until [`Scene::fetch_results`] retires them;
    /// simulating again before that is a caller bug.
    pub fn simulate(&self, dt: f32) {
        if self.results_pending.get() {
            debug_assert!(!self.results_pending.get(), "simulate before fetch_results");
            warn!("simulate called with results still pending, step skipped");
            return;
        }

        let gravity = self.gravity.get();
        for actor in self.actors.borrow().iter() {
            actor.integrate(dt, gravity);
        }
        for controller in self.controllers.borrow().iter() {
            controller.step(dt, gravity.y);
        }
        self.results_pending.set(true);
    }

    /// Retires the in-flight step and returns its summary.
    ///
    /// Returns `None` when no step is pending.
    pub fn fetch_results(&self) -> Option<SimulationSummary> {
        if !self.results_pending.get() {
            return None;
        }
        self.results_pending.set(false);

        let tick = self.tick.get() + 1;
        self.tick.set(tick);

        let active_actors = self
            .actors
            .borrow()
            .iter()
            .filter(|actor| actor.kind() == BodyKind::Dynamic)
            .count();
        let summary = SimulationSummary {
            tick,
            active_actors,
            active_controllers: self.controllers.borrow().len(),
        };
        debug!(tick, summary.active_actors, "simulation step retired");
        Some(summary)
    }

    /// Casts a ray against every registered actor's bounding sphere and
    /// returns the closest hit within `max_distance`.
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RaycastHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }

        let mut best: Option<(NonNull<RigidBodyImpl>, f32)> = None;
        for actor in self.actors.borrow().iter() {
            let Some(radius) = actor.bounding_radius() else {
                continue;
            };
            let Some(distance) = ray_sphere(origin, direction, actor.position(), radius) else {
                continue;
            };
            if distance > max_distance {
                continue;
            }
            if best.map_or(true, |(_, closest)| distance < closest) {
                best = Some((actor.payload_ptr(), distance));
            }
        }

        best.map(|(payload, distance)| {
            // The pointer came from a handle held in `actors` above, so the
            // slot is still live.
            let handle = unsafe { self.bodies.adopt(payload) };
            RaycastHit {
                actor: RigidActorView::new(handle.into_view()),
                distance,
                position: origin + direction * distance,
            }
        })
    }

    /// Releases every registered actor and controller handle.
    pub(crate) fn clear(&self) {
        self.actors.borrow_mut().clear();
        self.controllers.borrow_mut().clear();
        self.results_pending.set(false);
    }
}

/// Distance along `direction` at which the ray first touches the sphere, or
/// `None` when it misses or starts past it.
fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let to_center = center - origin;
    let projection = to_center.dot(direction);
    let closest_sq = to_center.length_squared() - projection * projection;
    let radius_sq = radius * radius;
    if closest_sq > radius_sq {
        return None;
    }
    let half_chord = (radius_sq - closest_sq).sqrt();
    let distance = projection - half_chord;
    (distance >= 0.0).then_some(distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MaterialImpl;
    use crate::rigid_body::RigidBodyImpl;
    use crate::shape::{Geometry, ShapeImpl};
    use glam::Quat;

    fn scene_with_sphere_at(position: Vec3, radius: f32) -> (Scene, Handle<RigidBodyImpl>) {
        let bodies: BlockAllocator<RigidBodyImpl> = BlockAllocator::default();
        let materials: BlockAllocator<MaterialImpl> = BlockAllocator::default();
        let shapes: BlockAllocator<ShapeImpl> = BlockAllocator::default();

        let material = materials.allocate(MaterialImpl::new(0.5, 0.5, 0.1));
        let shape = shapes.allocate(ShapeImpl::new(Geometry::Sphere { radius }, material));
        let body = bodies.allocate(RigidBodyImpl::new(BodyKind::Dynamic, position, Quat::IDENTITY));
        body.attach_shape(shape);

        let scene = Scene::new(bodies.clone(), Vec3::new(0.0, -9.81, 0.0));
        scene.add_actor(body.clone());
        (scene, body)
    }

    #[test]
    fn test_simulate_integrates_gravity() {
        let (scene, body) = scene_with_sphere_at(Vec3::new(0.0, 10.0, 0.0), 1.0);
        scene.simulate(1.0);
        let summary = scene.fetch_results().unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.active_actors, 1);
        assert!(body.position().y < 10.0);
    }

    #[test]
    fn test_fetch_without_step_returns_none() {
        let (scene, _body) = scene_with_sphere_at(Vec3::ZERO, 1.0);
        assert!(scene.fetch_results().is_none());
        scene.simulate(0.016);
        assert!(scene.fetch_results().is_some());
        assert!(scene.fetch_results().is_none());
    }

    #[test]
    fn test_raycast_hits_closest_actor() {
        let (scene, body) = scene_with_sphere_at(Vec3::new(0.0, 0.0, 10.0), 1.0);
        let hit = scene
            .raycast(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), 100.0)
            .unwrap();
        assert!((hit.distance - 9.0).abs() < 1e-4);
        assert!(hit.actor.observes(&body));
    }

    #[test]
    fn test_raycast_miss_returns_none() {
        let (scene, _body) = scene_with_sphere_at(Vec3::new(0.0, 50.0, 10.0), 1.0);
        assert!(scene
            .raycast(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), 100.0)
            .is_none());
    }

    #[test]
    fn test_raycast_view_does_not_block_reclaim() {
        let (scene, body) = scene_with_sphere_at(Vec3::new(0.0, 0.0, 5.0), 1.0);
        let hit = scene
            .raycast(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0), 100.0)
            .unwrap();
        drop(hit);

        scene.remove_actor(&body);
        let bodies = {
            // Reuse the pool through a fresh clone of the scene's allocator.
            scene.bodies.clone()
        };
        drop(body);
        assert_eq!(bodies.gc(), 1);
    }
}
