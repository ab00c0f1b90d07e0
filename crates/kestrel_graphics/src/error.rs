//! # Graphics Error Types
//!
//! Creation failures are recoverable and stop at the device boundary: the
//! caller gets an `Err`, the log gets a diagnostic, and any pool slot that
//! was already reserved for the attempt is released through the normal
//! garbage path. Invariant violations (double-marking, use after sweep) are
//! not errors; they assert in debug builds.

use thiserror::Error;

use crate::driver::DriverError;

/// Errors surfaced by resource creation on the device.
#[derive(Error, Debug)]
pub enum GraphicsError {
    /// The native driver failed to allocate.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// The descriptor failed validation before any native call was made.
    #[error("invalid descriptor: {reason}")]
    InvalidDescriptor {
        /// What validation rejected.
        reason: String,
    },
}
