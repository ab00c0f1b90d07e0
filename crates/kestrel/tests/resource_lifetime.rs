//! End-to-end lifetime verification across every manager.
//!
//! These tests drive real frames through the engine and check the ordering
//! contract from the outside: destruction is deferred to the frame
//! boundary, dependency chains are reclaimed in one sweep, and teardown
//! leaves no native object alive.

use glam::{Quat, Vec3};
use kestrel::{Engine, EngineConfig};
use kestrel_graphics::{BufferDescriptor, BufferUsage, ImageDescriptor, Format};
use kestrel_physics::{CapsuleControllerDescriptor, DriveState, Geometry, VehicleDescriptor};

fn small_engine() -> Engine {
    let config = EngineConfig::from_toml_str(
        "[memory]\n\
         block_capacity = 8\n\
         [physics]\n\
         timestep = 0.016\n",
    )
    .unwrap();
    Engine::new(&config)
}

#[test]
fn dropped_resources_outlive_the_frame_that_dropped_them() {
    let mut engine = small_engine();

    let buffer = engine
        .device()
        .create_buffer(&BufferDescriptor {
            size: 1024,
            usage: BufferUsage::Uniform,
        })
        .unwrap();
    let image = engine
        .device()
        .create_image(&ImageDescriptor {
            extent: [64, 64, 1],
            format: Format::Rgba8Unorm,
            mip_levels: 1,
        })
        .unwrap();

    let live_before = engine.device().gpu().live_objects();
    drop(buffer);
    drop(image);

    // Marked, not destroyed: the native objects are still alive.
    assert_eq!(engine.device().gpu().live_objects(), live_before);
    assert_eq!(engine.device().pending_destroy_count(), 2);

    let stats = engine.run_frame();
    assert_eq!(stats.graphics_swept, 2);
    assert_eq!(engine.device().gpu().live_objects(), 0);
}

#[test]
fn dependency_chains_drain_in_a_single_frame() {
    let mut engine = small_engine();

    let model = engine
        .models()
        .load(engine.device(), "chain", &[0.0; 9], &[0, 1, 2])
        .unwrap();

    let material = engine.physics().create_material(0.6, 0.4, 0.2).unwrap();
    let shape = engine
        .physics()
        .create_shape(Geometry::Sphere { radius: 0.5 }, material.clone())
        .unwrap();
    let actor = engine
        .physics()
        .create_rigid_dynamic(Vec3::new(0.0, 2.0, 0.0), Quat::IDENTITY);
    actor.attach_shape(shape.clone());

    drop(model);
    drop(material);
    drop(shape);
    engine.physics().scene().remove_actor(actor.handle());
    drop(actor);

    let stats = engine.run_frame();
    // Body, shape, material on the physics side; the model plus its two
    // buffers on the graphics side.
    assert_eq!(stats.physics_swept, 3);
    assert_eq!(stats.models_swept, 1);
    assert_eq!(stats.graphics_swept, 2);

    // The next frame has nothing left to reclaim.
    assert_eq!(engine.run_frame().total_swept(), 0);
}

#[test]
fn vehicle_drives_and_controller_lands_over_many_frames() {
    let mut engine = small_engine();
    engine.physics().scene().set_gravity(Vec3::new(0.0, -9.81, 0.0));

    let chassis = engine
        .physics()
        .create_rigid_dynamic(Vec3::ZERO, Quat::IDENTITY);
    let vehicle = engine
        .physics()
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

    let controller = engine
        .physics()
        .create_capsule_controller(&CapsuleControllerDescriptor {
            radius: 0.4,
            height: 1.8,
            position: Vec3::new(5.0, 3.0, 0.0),
        })
        .unwrap();

    for _ in 0..180 {
        engine.run_frame();
    }

    assert!(chassis.position().z > 0.0);
    assert!(controller.is_grounded());

    let hit = engine
        .physics()
        .scene()
        .raycast(
            Vec3::new(chassis.position().x, chassis.position().y, -10.0),
            Vec3::new(0.0, 0.0, 1.0),
            1000.0,
        )
        .map(|hit| hit.actor.observes(chassis.handle()));
    // No shape attached to the chassis, so the ray finds nothing.
    assert_eq!(hit, None);
}

#[test]
fn pool_growth_keeps_resident_handles_valid() {
    let mut engine = small_engine();

    // With 8-slot blocks, 50 buffers force multiple growths.
    let buffers: Vec<_> = (0..50u64)
        .map(|i| {
            engine
                .device()
                .create_buffer(&BufferDescriptor {
                    size: 64 + i,
                    usage: BufferUsage::Storage,
                })
                .unwrap()
        })
        .collect();

    for (i, buffer) in buffers.iter().enumerate() {
        assert_eq!(buffer.size(), 64 + i as u64);
    }

    drop(buffers);
    assert_eq!(engine.run_frame().graphics_swept, 50);
}

#[test]
fn shutdown_releases_every_native_object() {
    let engine = {
        let mut engine = small_engine();
        let _ = engine
            .models()
            .load(engine.device(), "leak_check", &[0.0; 9], &[0, 1, 2])
            .unwrap();
        engine
            .physics()
            .create_rigid_dynamic(Vec3::ZERO, Quat::IDENTITY);
        engine.run_frame();
        engine
    };

    let gpu = engine.device().gpu().clone();
    drop(engine);
    assert_eq!(gpu.live_objects(), 0);
}
