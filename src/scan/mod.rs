//! Scan execution engines.
//!
//! [`RasterScanner`] sweeps a 2D grid in a serpentine traversal;
//! [`PointSequenceScanner`] visits an arbitrary target list once or in a
//! repositioning loop. Both engines are cooperative: they poll a shared
//! [`ScanInterrupt`] before every sample, so a host thread can stop a scan
//! between samples and the partial data stays valid.
//!
//! ## Cancellation Model
//!
//! Stopping a scan is a normal outcome, not an error. The engines return
//! [`TerminationReason`] on success and reserve `Err` for real faults
//! (device errors, a scan already in progress). A cancelled grid scan
//! leaves the buffer holding the exact prefix of samples taken so far over
//! zeros, and the beam stays wherever it was; only a completed scan parks
//! the beam back at the origin.

pub mod raster;
pub mod sequence;

pub use raster::{RasterScanner, DEFAULT_COLORMAP, DEFAULT_LIVE_REDRAW_EVERY};
pub use sequence::{PointSequenceScanner, SequenceMode};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::HardwareResult;
use crate::hardware::{Actuator, Detector};

/// Why a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// Every point was visited.
    Completed,
    /// An interrupt stopped the scan between samples.
    Cancelled,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Shared stop flag for a running scan.
///
/// Clone one end into the scanning thread and keep the other; calling
/// [`request_stop`](Self::request_stop) makes the engine exit before its
/// next sample.
#[derive(Debug, Clone, Default)]
pub struct ScanInterrupt(Arc<AtomicBool>);

impl ScanInterrupt {
    /// A fresh, unraised interrupt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running scan to stop.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Lower the flag so the interrupt can be reused for another scan.
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One grid measurement, as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Grid x index.
    pub x_index: usize,
    /// Grid y index.
    pub y_index: usize,
    /// Physical x position, volts.
    pub x: f64,
    /// Physical y position, volts.
    pub y: f64,
    /// Measured count rate.
    pub value: f64,
    /// Running sample number within the scan, counting from 1.
    pub seq: usize,
}

/// One point-sequence measurement, as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSample {
    /// Index into the target list.
    pub index: usize,
    /// Physical x position, volts.
    pub x: f64,
    /// Physical y position, volts.
    pub y: f64,
    /// Measured count rate.
    pub value: f64,
}

/// Hook into a running scan, for progress reporting and tests.
///
/// All methods default to no-ops; implement only what you need. `()` is
/// the null observer.
pub trait ScanObserver {
    /// Called after each grid sample is recorded.
    fn on_sample(&mut self, sample: &Sample) {
        let _ = sample;
    }

    /// Called after each point-sequence visit.
    fn on_point(&mut self, point: &PointSample) {
        let _ = point;
    }
}

impl ScanObserver for () {}

/// Read the detector once at a position: move, integrate, return the rate.
///
/// The live-counts readout. Device faults propagate exactly as they do from
/// a scan sample.
pub fn point_readout(
    actuator: &mut dyn Actuator,
    detector: &mut dyn Detector,
    x: f64,
    y: f64,
    integration_time_ms: f64,
) -> HardwareResult<f64> {
    actuator.move_to(x, y)?;
    detector.measure(integration_time_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HardwareError;
    use crate::hardware::{GaussianSpot, MockCounter, MockMirror};

    #[test]
    fn point_readout_moves_then_measures() {
        let mut mirror = MockMirror::default();
        let mut counter = MockCounter::new(mirror.beam())
            .with_background(2.0)
            .with_spots([GaussianSpot {
                x: 0.3,
                y: 0.4,
                amplitude: 10.0,
                sigma: 0.05,
            }]);

        let rate = point_readout(&mut mirror, &mut counter, 0.3, 0.4, 5.0).unwrap();
        assert_eq!(rate, 12.0);
        assert_eq!(mirror.move_log(), &[(0.3, 0.4)]);
    }

    #[test]
    fn point_readout_surfaces_actuator_faults() {
        let mut mirror = MockMirror::new(-0.1, 0.1);
        let mut counter = MockCounter::new(mirror.beam());

        let err = point_readout(&mut mirror, &mut counter, 5.0, 0.0, 5.0).unwrap_err();
        assert!(matches!(err, HardwareError::ActuatorRange { .. }));
        assert_eq!(counter.reads(), 0);
    }

    #[test]
    fn interrupt_is_shared_between_clones() {
        let interrupt = ScanInterrupt::new();
        let other = interrupt.clone();

        other.request_stop();
        assert!(interrupt.is_requested());
        interrupt.clear();
        assert!(!other.is_requested());
    }
}
