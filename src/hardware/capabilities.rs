//! Atomic hardware capabilities.
//!
//! The scan engine talks to instruments through fine-grained capability
//! traits instead of one monolithic device interface:
//!
//! - [`Actuator`]: 2-axis beam positioning (galvo mirror pair, piezo stage)
//! - [`Detector`]: integrating point detector (photon counter, APD)
//! - [`Renderer`]: live image sink for scan frames
//! - [`PeakFinder`]: 2D local-maxima search over a finished frame
//!
//! Small traits keep contracts focused, let one device offer several
//! capabilities, and make mocks trivial (see [`crate::hardware::mock`]).
//! Every trait requires `Send + Sync` so a scan can run on a worker thread
//! while the host keeps hold of the interrupt flag.
//!
//! Device failures are reported through
//! [`HardwareError`](crate::error::HardwareError); the engine propagates
//! them without rewrapping.

use std::path::Path;

use crate::error::HardwareResult;
use crate::model::{Extent, ScanBuffer};

/// Capability: 2-axis beam positioning.
///
/// # Contract
/// - Coordinates are in volts on the deflection axes.
/// - `move_to` blocks until the target is reached. A target outside the
///   device window fails with
///   [`ActuatorRange`](crate::error::HardwareError::ActuatorRange) and
///   leaves the position unchanged.
/// - `position` reports the last commanded position.
pub trait Actuator: Send + Sync {
    /// Drive both axes to `(x, y)`.
    fn move_to(&mut self, x: f64, y: f64) -> HardwareResult<()>;

    /// Last commanded position as `(x, y)`.
    fn position(&self) -> (f64, f64);
}

/// Capability: integrating point detector.
///
/// # Contract
/// - `measure` integrates over the given window and returns the count rate
///   in counts per second.
/// - A read that misses its deadline fails with
///   [`Timeout`](crate::error::HardwareError::Timeout). The engine stops
///   the scan and surfaces the fault as-is.
pub trait Detector: Send + Sync {
    /// Integrate for `integration_time_ms` and return the count rate.
    fn measure(&mut self, integration_time_ms: f64) -> HardwareResult<f64>;
}

/// One frame handed to a renderer: the measurement grid, its physical
/// extent, and the display color bounds already resolved by the data model.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// Measurement grid to draw.
    pub buffer: &'a ScanBuffer,
    /// Physical bounds of the grid, for axis labeling.
    pub extent: Extent,
    /// Lower color bound.
    pub color_low: f64,
    /// Upper color bound.
    pub color_high: f64,
    /// Colormap name the display should map values through. Renderers
    /// without color (the PGM mock) may ignore it.
    pub colormap: &'a str,
}

/// Capability: live image sink.
///
/// # Contract
/// - `render` replaces the previously shown frame. The engine calls it at
///   its redraw cadence, not once per sample.
/// - `save_image` writes the most recent frame to `path`, for archiving
///   next to a scan record.
pub trait Renderer: Send + Sync {
    /// Display a frame.
    fn render(&mut self, request: &RenderRequest<'_>) -> HardwareResult<()>;

    /// Write the most recent frame to disk.
    fn save_image(&self, path: &Path) -> HardwareResult<()>;

    /// File extension (without the dot) of the images this renderer
    /// writes.
    fn image_extension(&self) -> &'static str {
        "pgm"
    }
}

/// Capability: 2D local-maxima search.
///
/// # Contract
/// - Returns grid indices `(x_index, y_index)` of cells that are local
///   maxima with value strictly above `threshold_abs`.
/// - No two returned peaks lie within `min_separation` cells of each other
///   on both axes (square exclusion footprint).
/// - Strongest peaks come first.
pub trait PeakFinder: Send + Sync {
    /// Locate peaks in a finished frame.
    fn find_peaks(
        &self,
        buffer: &ScanBuffer,
        threshold_abs: f64,
        min_separation: usize,
    ) -> Vec<(usize, usize)>;
}
