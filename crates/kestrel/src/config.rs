//! Startup configuration, loaded once from TOML before any pool exists.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Errors raised while loading an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML or has bad field types.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Pool sizing for every allocator in the engine.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Slots per pool block.
    pub block_capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            block_capacity: kestrel_core::memory::DEFAULT_BLOCK_CAPACITY,
        }
    }
}

/// Physics stepping parameters.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Downward gravity magnitude in m/s^2.
    pub gravity: f32,
    /// Fixed simulation timestep in seconds.
    pub timestep: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            timestep: 1.0 / 60.0,
        }
    }
}

/// Frame loop parameters.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Frames the demo binary runs before shutting down.
    pub frames: u64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { frames: 600 }
    }
}

/// Root configuration for the engine.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pool sizing.
    pub memory: MemoryConfig,
    /// Physics stepping.
    pub physics: PhysicsConfig,
    /// Frame loop.
    pub frame: FrameConfig,
}

impl EngineConfig {
    /// Parses a config from TOML text. Missing sections take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads a config file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "loaded engine config");
        Ok(config)
    }
}
