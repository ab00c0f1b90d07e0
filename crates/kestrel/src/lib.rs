//! # KESTREL
//!
//! The engine front crate: startup configuration, the per-frame loop that
//! drives the exemplar managers, and the demo binary. The frame loop is
//! where the ordering contract lives: native work retires, then the
//! physics pools sweep, then the asset pools, then the GPU pools, exactly
//! once per frame.

pub mod config;
pub mod frame;

pub use config::{ConfigError, EngineConfig};
pub use frame::{Engine, FrameStats};
