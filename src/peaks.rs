//! Peak detection and index-wrapped peak navigation.
//!
//! [`detect`] thresholds a finished frame at a fraction of the whole-buffer
//! mean (zeros included, so sparse frames get a low bar) and maps the
//! finder's grid indices back to physical coordinates through the owning
//! axes. [`PeakSet`] keeps those coordinates unrounded for persistence;
//! navigation hands out 3-decimal-rounded targets, matching what actuator
//! commands and displays use.

use tracing::debug;

use crate::axis::round3;
use crate::error::{ScanError, ScanResult};
use crate::hardware::PeakFinder;
use crate::model::ScanDataModel;

/// Physical coordinates of the peaks found in one frame, strongest first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeakSet {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

/// One navigation result: where to drive the beam, and which peak the
/// cursor actually landed on after wrapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakTarget {
    /// Peak x coordinate, rounded to 3 decimals.
    pub x: f64,
    /// Peak y coordinate, rounded to 3 decimals.
    pub y: f64,
    /// The wrapped peak index, for resynchronizing a displayed cursor.
    pub index: usize,
}

impl PeakSet {
    /// Rebuild a set from persisted coordinate arrays.
    pub fn from_coords(xs: Vec<f64>, ys: Vec<f64>) -> ScanResult<Self> {
        if xs.len() != ys.len() {
            return Err(ScanError::Configuration(format!(
                "peak coordinate arrays differ in length: {} x values vs {} y values",
                xs.len(),
                ys.len()
            )));
        }
        Ok(Self { xs, ys })
    }

    /// Number of peaks.
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// True when no peaks were found.
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Stored (unrounded) x coordinates, strongest peak first.
    pub fn x_coords(&self) -> &[f64] {
        &self.xs
    }

    /// Stored (unrounded) y coordinates, strongest peak first.
    pub fn y_coords(&self) -> &[f64] {
        &self.ys
    }

    /// Navigate to a peak by index.
    ///
    /// The index wraps modulo the set length with the sign of the divisor,
    /// so `-1` is the last peak, `-2` the one before it, and an index past
    /// the end comes back around to the front.
    pub fn go_to_index(&self, index: i64) -> ScanResult<PeakTarget> {
        if self.is_empty() {
            return Err(ScanError::EmptyPeakSet);
        }
        let wrapped = index.rem_euclid(self.len() as i64) as usize;
        Ok(PeakTarget {
            x: round3(self.xs[wrapped]),
            y: round3(self.ys[wrapped]),
            index: wrapped,
        })
    }

    /// Navigate relative to `current` by `delta` (±1 from a UI's next and
    /// previous buttons, but any offset wraps the same way).
    pub fn go_to_next(&self, current: i64, delta: i64) -> ScanResult<PeakTarget> {
        self.go_to_index(current + delta)
    }
}

/// Detect peaks in a finished frame.
///
/// The absolute threshold is `threshold_fraction` times the mean over
/// every buffer cell, written or not. Returned coordinates come from the
/// model's axes, in the finder's strongest-first order.
pub fn detect(
    model: &ScanDataModel,
    finder: &dyn PeakFinder,
    threshold_fraction: f64,
    min_separation: usize,
) -> PeakSet {
    let threshold_abs = threshold_fraction * model.buffer().mean();
    let indices = finder.find_peaks(model.buffer(), threshold_abs, min_separation);
    let (xs, ys) = indices
        .iter()
        .map(|&(xi, yi)| (model.x_axis()[xi], model.y_axis()[yi]))
        .unzip();
    let set = PeakSet { xs, ys };
    debug!(threshold_abs, peaks = set.len(), "peak detection finished");
    set
}

/// Cursor over a [`PeakSet`], tracking the peak most recently navigated to.
#[derive(Debug, Clone)]
pub struct PeakNavigator {
    peaks: PeakSet,
    cursor: usize,
}

impl PeakNavigator {
    /// A navigator parked on the strongest peak.
    pub fn new(peaks: PeakSet) -> Self {
        Self { peaks, cursor: 0 }
    }

    /// The underlying peak set.
    pub fn peaks(&self) -> &PeakSet {
        &self.peaks
    }

    /// Index of the peak the cursor is parked on.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Jump the cursor to a peak by (wrapping) index.
    pub fn go_to_index(&mut self, index: i64) -> ScanResult<PeakTarget> {
        let target = self.peaks.go_to_index(index)?;
        self.cursor = target.index;
        Ok(target)
    }

    /// Step the cursor by `delta` peaks, wrapping at either end.
    pub fn advance(&mut self, delta: i64) -> ScanResult<PeakTarget> {
        let target = self.peaks.go_to_next(self.cursor as i64, delta)?;
        self.cursor = target.index;
        Ok(target)
    }
}
