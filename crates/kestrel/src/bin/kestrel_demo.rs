//! Headless demo: spins up the engine, drops a vehicle and a model into it,
//! turns frames for the configured duration, and prints the final censuses.
//!
//! Pass a TOML config path as the first argument to override the defaults.

use std::path::Path;
use std::process::ExitCode;

use glam::{Quat, Vec3};
use kestrel::{Engine, EngineConfig};
use kestrel_physics::{DriveState, VehicleDescriptor};
use tracing::{error, info};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(err) => {
                error!(%err, %path, "could not load config");
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "demo failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = Engine::new(config);

    let model = engine.models().load(
        engine.device(),
        "test_cube",
        &[
            -0.5, -0.5, 0.0, //
            0.5, -0.5, 0.0, //
            0.0, 0.5, 0.0,
        ],
        &[0, 1, 2],
    )?;

    let chassis = engine
        .physics()
        .create_rigid_dynamic(Vec3::new(0.0, 0.5, 0.0), Quat::IDENTITY);
    let vehicle = engine.physics().create_vehicle_4w_drive(
        &chassis,
        &VehicleDescriptor {
            wheel_radius: 0.4,
            engine_accel: 8.0,
        },
    )?;
    vehicle.set_drive(DriveState {
        accelerate: 1.0,
        ..DriveState::default()
    });

    let mut reclaimed = 0;
    for frame in 0..config.frame.frames {
        // Release everything at the halfway point and watch it drain.
        if frame == config.frame.frames / 2 {
            engine.physics().vehicles().remove(&vehicle);
            engine.physics().scene().remove_actor(chassis.handle());
        }
        let stats = engine.run_frame();
        reclaimed += stats.total_swept();
        if frame == config.frame.frames / 2 {
            info!(z = chassis.position().z, "vehicle position at release");
        }
    }
    drop(vehicle);
    drop(chassis);
    drop(model);

    let final_stats = engine.run_frame();
    reclaimed += final_stats.total_swept();

    info!(
        frames = config.frame.frames + 1,
        reclaimed,
        physics_live = engine.physics().census().total(),
        models_live = engine.models().live_count(),
        gpu_pending = engine.device().pending_destroy_count(),
        "demo complete"
    );
    Ok(())
}
