//! Scan data models: measurement buffers, autoscale bookkeeping, and the
//! single-active-scan arbitration.
//!
//! [`ScanDataModel`] backs grid sweeps: a dense 2D buffer indexed
//! `[x][y]`, the append-only stream of every measurement in traversal order,
//! and the display color range. [`PointScanModel`] is the 1D variant for
//! custom point patterns, with a buffer aligned to the target list and a
//! sub-scan counter for repeat acquisitions.
//!
//! Both models enforce one scan at a time: beginning a scan while another is
//! in progress fails with `ConcurrentScan` and leaves the running scan's
//! data untouched. Buffers are replaced, never cleared in place, when a new
//! scan begins, so a cancelled scan always freezes as a clean prefix of
//! written cells over zeros.

use std::collections::BTreeMap;

use tracing::warn;

use crate::axis::Axis;
use crate::error::{ScanError, ScanResult};
use crate::points::TargetPointList;

// ===== Buffer =====

/// Dense 2D measurement buffer, indexed `[x_index][y_index]`.
///
/// Row-major over x: all y samples for one x column are contiguous. Cells
/// start at 0 and hold the raw count rate once written.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanBuffer {
    nx: usize,
    ny: usize,
    data: Vec<f64>,
}

impl ScanBuffer {
    /// A zero-filled buffer for an `nx` by `ny` grid.
    pub fn new(nx: usize, ny: usize) -> Self {
        Self {
            nx,
            ny,
            data: vec![0.0; nx * ny],
        }
    }

    /// Grid dimensions as `(nx, ny)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// True when the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at `(xi, yi)`. Indices must be in range.
    pub fn get(&self, xi: usize, yi: usize) -> f64 {
        self.data[xi * self.ny + yi]
    }

    /// Write `value` at `(xi, yi)`. Indices must be in range.
    pub fn set(&mut self, xi: usize, yi: usize, value: f64) {
        self.data[xi * self.ny + yi] = value;
    }

    /// Flat view of all cells (x-major).
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Mean over every cell, written or not; 0 for an empty grid.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Nested representation for persistence: one inner vec per x index.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.nx)
            .map(|xi| self.data[xi * self.ny..(xi + 1) * self.ny].to_vec())
            .collect()
    }

    /// Rebuild a buffer from its nested representation.
    pub fn from_rows(rows: &[Vec<f64>]) -> ScanResult<Self> {
        let nx = rows.len();
        let ny = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(nx * ny);
        for row in rows {
            if row.len() != ny {
                return Err(ScanError::Configuration(format!(
                    "scan data rows have unequal lengths ({} vs {ny})",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self { nx, ny, data })
    }
}

// ===== Color range =====

/// Display color range: either tracking the data (autoscale) or pinned by
/// the caller.
///
/// In autoscale mode the bounds follow the running min/max of everything
/// recorded so far, updated in O(1) per sample. Manual bounds are stored
/// verbatim, including `low > high`, which some hosts use deliberately to
/// invert a colormap; interpreting that is the renderer's business.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorRange {
    low: f64,
    high: f64,
    autoscale: bool,
}

impl Default for ColorRange {
    /// Autoscale on, with (0, 1) placeholder bounds until the first sample
    /// reseeds them.
    fn default() -> Self {
        Self {
            low: 0.0,
            high: 1.0,
            autoscale: true,
        }
    }
}

impl ColorRange {
    /// Lower display bound.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Upper display bound.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Both bounds as `(low, high)`.
    pub fn bounds(&self) -> (f64, f64) {
        (self.low, self.high)
    }

    /// Whether the range is tracking the data.
    pub fn is_autoscale(&self) -> bool {
        self.autoscale
    }

    fn observe(&mut self, value: f64, first_sample: bool) {
        if !self.autoscale {
            return;
        }
        if first_sample {
            self.low = value;
            self.high = value;
        } else {
            if value < self.low {
                self.low = value;
            }
            if value > self.high {
                self.high = value;
            }
        }
    }

    fn set_manual(&mut self, low: f64, high: f64) {
        if low > high {
            warn!(low, high, "manual color range has low > high (inverted map)");
        }
        self.low = low;
        self.high = high;
        self.autoscale = false;
    }

    fn recompute_from(&mut self, stream: &[f64]) {
        match stream.first() {
            None => {
                self.low = 0.0;
                self.high = 1.0;
            }
            Some(&seed) => {
                let (mut low, mut high) = (seed, seed);
                for &value in &stream[1..] {
                    if value < low {
                        low = value;
                    }
                    if value > high {
                        high = value;
                    }
                }
                self.low = low;
                self.high = high;
            }
        }
    }
}

// ===== Extent =====

/// Physical bounds of a scan area, for renderers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// Smallest x coordinate.
    pub x_min: f64,
    /// Largest x coordinate.
    pub x_max: f64,
    /// Smallest y coordinate.
    pub y_min: f64,
    /// Largest y coordinate.
    pub y_max: f64,
}

fn axis_bounds(axis: &Axis) -> (f64, f64) {
    match (axis.first(), axis.last()) {
        (Some(a), Some(b)) => (a.min(b), a.max(b)),
        _ => (0.0, 0.0),
    }
}

// ===== 2D model =====

/// Owner of one grid scan's data: axes, buffer, measurement stream, color
/// range, and the scanning flag that arbitrates exclusive access.
#[derive(Debug, Clone)]
pub struct ScanDataModel {
    x_axis: Axis,
    y_axis: Axis,
    buffer: ScanBuffer,
    stream: Vec<f64>,
    color_range: ColorRange,
    scanning: bool,
}

impl ScanDataModel {
    /// A model sized to the given axes, with a zeroed buffer.
    pub fn new(x_axis: Axis, y_axis: Axis) -> Self {
        let buffer = ScanBuffer::new(x_axis.len(), y_axis.len());
        Self {
            x_axis,
            y_axis,
            buffer,
            stream: Vec::new(),
            color_range: ColorRange::default(),
            scanning: false,
        }
    }

    /// The x axis this model is sized to.
    pub fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    /// The y axis this model is sized to.
    pub fn y_axis(&self) -> &Axis {
        &self.y_axis
    }

    /// The measurement buffer.
    pub fn buffer(&self) -> &ScanBuffer {
        &self.buffer
    }

    /// Every measurement so far, in traversal order.
    pub fn data_stream(&self) -> &[f64] {
        &self.stream
    }

    /// Current display color range.
    pub fn color_range(&self) -> &ColorRange {
        &self.color_range
    }

    /// Whether a scan currently owns this model.
    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Physical bounds of the grid.
    pub fn extent(&self) -> Extent {
        let (x_min, x_max) = axis_bounds(&self.x_axis);
        let (y_min, y_max) = axis_bounds(&self.y_axis);
        Extent {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Claim the model for a new scan.
    ///
    /// Fails with `ConcurrentScan` if one is already in progress, leaving
    /// the running scan's data untouched. On success the buffer is replaced
    /// with a fresh zeroed one and the stream is cleared.
    pub fn begin_scan(&mut self) -> ScanResult<()> {
        if self.scanning {
            return Err(ScanError::ConcurrentScan);
        }
        self.scanning = true;
        self.buffer = ScanBuffer::new(self.x_axis.len(), self.y_axis.len());
        self.stream = Vec::new();
        Ok(())
    }

    /// Release the model at scan end (completion, cancellation, or error).
    pub fn finish_scan(&mut self) {
        self.scanning = false;
    }

    /// Record one measurement: append to the stream, write the buffer cell,
    /// and fold the value into the autoscale bounds (O(1); the very first
    /// sample seeds both bounds).
    pub fn record_sample(&mut self, xi: usize, yi: usize, value: f64) {
        self.stream.push(value);
        self.buffer.set(xi, yi, value);
        let first = self.stream.len() == 1;
        self.color_range.observe(value, first);
    }

    /// Pin the color range to caller-supplied bounds, disabling autoscale.
    /// Values are stored verbatim, `low > high` included.
    pub fn set_manual_range(&mut self, low: f64, high: f64) {
        self.color_range.set_manual(low, high);
    }

    /// Switch autoscale on or off. Re-enabling recomputes the bounds with a
    /// full pass over the stream, since manual edits may have happened in
    /// between; disabling freezes the current bounds.
    pub fn toggle_autoscale(&mut self, on: bool) {
        self.color_range.autoscale = on;
        if on {
            self.color_range.recompute_from(&self.stream);
        }
    }
}

// ===== 1D model =====

/// Data model for point-sequence scans: one value per target point, plus
/// the sub-scan numbering for repeat acquisitions over the same pattern.
#[derive(Debug, Clone)]
pub struct PointScanModel {
    points: TargetPointList,
    values: Vec<f64>,
    stream: Vec<f64>,
    color_range: ColorRange,
    scanning: bool,
    next_scan_num: u32,
    completed: BTreeMap<u32, Vec<f64>>,
    last_point: Option<(usize, f64)>,
}

impl PointScanModel {
    /// A model aligned to the given target list.
    pub fn new(points: TargetPointList) -> Self {
        let values = vec![0.0; points.len()];
        Self {
            points,
            values,
            stream: Vec::new(),
            color_range: ColorRange::default(),
            scanning: false,
            next_scan_num: 1,
            completed: BTreeMap::new(),
            last_point: None,
        }
    }

    /// The target list this model is aligned to.
    pub fn points(&self) -> &TargetPointList {
        &self.points
    }

    /// Current acquisition values, one slot per target point.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Every measurement so far, in scan order.
    pub fn data_stream(&self) -> &[f64] {
        &self.stream
    }

    /// Current display color range.
    pub fn color_range(&self) -> &ColorRange {
        &self.color_range
    }

    /// Whether a scan currently owns this model.
    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Completed acquisitions, keyed by sub-scan number.
    pub fn completed_scans(&self) -> &BTreeMap<u32, Vec<f64>> {
        &self.completed
    }

    /// Most recently visited point as `(index, value)`.
    pub fn last_point(&self) -> Option<(usize, f64)> {
        self.last_point
    }

    /// Claim the model for a measuring acquisition and allocate its
    /// sub-scan number (counting from 1; an interrupted acquisition still
    /// consumes its number). The value buffer is replaced with zeros.
    pub fn begin_acquisition(&mut self) -> ScanResult<u32> {
        if self.scanning {
            return Err(ScanError::ConcurrentScan);
        }
        self.scanning = true;
        self.values = vec![0.0; self.points.len()];
        self.stream = Vec::new();
        let scan_num = self.next_scan_num;
        self.next_scan_num += 1;
        Ok(scan_num)
    }

    /// Claim the model for a positioning-only pass (no accumulation, no
    /// sub-scan number).
    pub fn begin_positioning(&mut self) -> ScanResult<()> {
        if self.scanning {
            return Err(ScanError::ConcurrentScan);
        }
        self.scanning = true;
        Ok(())
    }

    /// Release the model at scan end.
    pub fn finish_scan(&mut self) {
        self.scanning = false;
    }

    /// Record one measurement at `index` during an acquisition.
    pub fn record_point(&mut self, index: usize, value: f64) {
        self.stream.push(value);
        self.values[index] = value;
        let first = self.stream.len() == 1;
        self.color_range.observe(value, first);
        self.last_point = Some((index, value));
    }

    /// Note the most recent position during a positioning pass. Nothing is
    /// accumulated beyond this.
    pub fn note_position(&mut self, index: usize, value: f64) {
        self.last_point = Some((index, value));
    }

    /// File the current value buffer as the finished acquisition
    /// `scan_num`.
    pub fn store_acquisition(&mut self, scan_num: u32) {
        self.completed.insert(scan_num, self.values.clone());
    }

    /// Pin the color range to caller-supplied bounds, disabling autoscale.
    pub fn set_manual_range(&mut self, low: f64, high: f64) {
        self.color_range.set_manual(low, high);
    }

    /// Switch autoscale on or off; re-enabling recomputes over the stream.
    pub fn toggle_autoscale(&mut self, on: bool) {
        self.color_range.autoscale = on;
        if on {
            self.color_range.recompute_from(&self.stream);
        }
    }
}
