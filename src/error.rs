//! Custom error types for the scan engine.
//!
//! This module defines the primary error type, `ScanError`, for the whole
//! crate. Using the `thiserror` crate, it gives every failure mode a typed,
//! matchable variant instead of stringly-typed errors.
//!
//! ## Error Hierarchy
//!
//! `ScanError` consolidates the logic-level failures:
//!
//! - **`Configuration`**: semantic problems in caller-supplied settings,
//!   such as a non-positive axis step, inverted bounds with a wrong-sign
//!   step, or mismatched coordinate arrays. Caught before any hardware call.
//! - **`InsufficientData`**: pixel-pitch inference was asked to recover a
//!   grid from fewer than two distinct coordinates.
//! - **`GridInconsistency`**: gap filling could not converge to a uniform
//!   pitch (malformed step or non-grid-aligned input).
//! - **`ConcurrentScan`**: a scan was started on a data model that already
//!   has one in progress. Fails fast; the running scan's buffer is untouched.
//! - **`EmptyPeakSet`**: peak navigation over zero detected peaks.
//! - **`Hardware`**: device-level failures, carried transparently so callers
//!   can match on [`HardwareError`] directly; a hardware fault is never
//!   rewrapped into a logic error.
//! - **`Io`** / **`Record`**: persistence failures while writing or parsing
//!   scan records.
//!
//! Hardware collaborators report through their own enum, [`HardwareError`],
//! which converts into `ScanError` via `#[from]` so driver code and scan
//! logic compose with the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type ScanResult<T> = std::result::Result<T, ScanError>;

/// Convenience alias for results produced by hardware collaborators.
pub type HardwareResult<T> = std::result::Result<T, HardwareError>;

/// Errors raised by the scan engine itself.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Insufficient data: pixel-pitch inference needs at least 2 distinct coordinates, got {distinct}")]
    InsufficientData {
        /// Number of distinct coordinates seen (at 3-decimal resolution).
        distinct: usize,
    },

    #[error("Grid inconsistency: {0}")]
    GridInconsistency(String),

    #[error("A scan is already in progress on this data model")]
    ConcurrentScan,

    #[error("Peak set is empty")]
    EmptyPeakSet,

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record serialization error: {0}")]
    Record(#[from] serde_json::Error),
}

/// Errors raised by hardware collaborators (actuator, detector).
///
/// These propagate through [`ScanError::Hardware`] without being rewrapped,
/// so a caller can always tell a device fault from a logic fault.
#[derive(Error, Debug)]
pub enum HardwareError {
    #[error("Actuator target ({x:.3}, {y:.3}) V outside range [{min:.3}, {max:.3}] V")]
    ActuatorRange {
        /// Requested x position in volts.
        x: f64,
        /// Requested y position in volts.
        y: f64,
        /// Lower bound of the actuator's voltage range.
        min: f64,
        /// Upper bound of the actuator's voltage range.
        max: f64,
    },

    #[error("Detector timed out after {waited_ms:.0} ms (integration window {integration_time_ms:.0} ms)")]
    Timeout {
        /// How long the read waited before giving up, in milliseconds.
        waited_ms: f64,
        /// The requested integration window, in milliseconds.
        integration_time_ms: f64,
    },

    #[error("Device fault: {0}")]
    Device(String),
}
