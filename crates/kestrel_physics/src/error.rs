//! # Physics Error Types
//!
//! Creation failures stop at the context boundary: logged, then surfaced
//! as an `Err`. Invariant violations (sweeping mid-tick, double-marking)
//! assert in debug builds instead.

use thiserror::Error;

/// Errors surfaced by actor creation on the physics context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhysicsError {
    /// Material parameters failed validation.
    #[error("invalid material: {reason}")]
    InvalidMaterial {
        /// What validation rejected.
        reason: String,
    },

    /// Shape geometry failed validation.
    #[error("invalid geometry: {reason}")]
    InvalidGeometry {
        /// What validation rejected.
        reason: String,
    },

    /// Controller or vehicle parameters failed validation.
    #[error("invalid descriptor: {reason}")]
    InvalidDescriptor {
        /// What validation rejected.
        reason: String,
    },
}
