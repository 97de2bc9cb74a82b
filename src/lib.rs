//! # Confocal Scan Engine
//!
//! This crate is the core library for a 2-axis raster/point scanning
//! instrument: serpentine grid sweeps with live cancellation, pixel-pitch
//! inference for rebuilding grids from arbitrary point lists, peak
//! detection with index-wrapped navigation, and JSON persistence of
//! finished scans. The engine drives hardware through small capability
//! traits, so the same scan logic runs against mock devices in tests and
//! real drivers in production hosts.
//!
//! ## Crate Structure
//!
//! The library is organized into several modules, each with a distinct
//! responsibility:
//!
//! - **`axis`**: Stepped axis construction (`AxisSpec` into `Axis`) and
//!   the 3-decimal coordinate rounding shared across the crate.
//! - **`config`**: Layered configuration from `config/confocal.toml` and
//!   `CONFOCAL_` environment variables. See `config::AppConfig`.
//! - **`error`**: The `ScanError`/`HardwareError` taxonomy; hardware
//!   faults propagate unwrapped.
//! - **`grid`**: Pixel-pitch inference, axis reconstruction, and bounded
//!   gap filling for recovering a regular grid from a point list.
//! - **`hardware`**: Capability traits (`Actuator`, `Detector`,
//!   `Renderer`, `PeakFinder`), the shipped `LocalMaxima` peak finder,
//!   and mock devices.
//! - **`logging`**: Idempotent tracing initialization.
//! - **`model`**: Scan data models: measurement buffers, data streams,
//!   color-range bookkeeping, and the single-active-scan rule.
//! - **`peaks`**: Peak detection over finished frames and index-wrapped
//!   peak navigation.
//! - **`points`**: Target point lists for custom (non-grid) patterns.
//! - **`record`**: JSON scan records, artifact naming, and side-by-side
//!   record/image saving.
//! - **`scan`**: The raster and point-sequence engines, cooperative
//!   interrupts, and scan observers.
//! - **`validation`**: Utility validators shared by configuration and the
//!   CLI.

pub mod axis;
pub mod config;
pub mod error;
pub mod grid;
pub mod hardware;
pub mod logging;
pub mod model;
pub mod peaks;
pub mod points;
pub mod record;
pub mod scan;
pub mod validation;

pub use error::{HardwareError, HardwareResult, ScanError, ScanResult};
