//! Axis construction for scan grids.
//!
//! An axis is the evenly spaced 1D coordinate sequence a scanner sweeps
//! along: `floor((end - start) / step) + 1` points starting exactly at
//! `start`, each `step` apart. The final point lands on `end` only when the
//! range is an exact multiple of the step; otherwise it falls short rather
//! than stretching the pitch, since pixel-pitch inference and gap filling
//! rely on uniform spacing.
//!
//! Coordinates throughout the engine are meaningful to 3 decimal places
//! (millivolt resolution on the actuator), which is where the shared
//! rounding helper and comparison tolerance in this module come from.

use crate::error::{ScanError, ScanResult};

/// Comparison tolerance for matching a coordinate against an axis point.
///
/// Half of the 3-decimal resolution: two coordinates closer than this are
/// the same grid point.
pub(crate) const COORD_TOLERANCE: f64 = 5e-4;

/// Guards axis construction against runaway allocations from a tiny step.
const MAX_AXIS_POINTS: usize = 10_000_000;

/// Round a coordinate to 3 decimal places.
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Declarative description of one scan axis: sweep from `start` to `end` in
/// increments of `step`.
///
/// `step` must be non-zero, finite, and point from `start` toward `end`:
/// ascending bounds take a positive step, inverted (descending) bounds take
/// a negative one. `start == end` is a valid single-point axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSpec {
    /// First coordinate of the sweep (always emitted exactly).
    pub start: f64,
    /// Target final coordinate; the last emitted point never overshoots it.
    pub end: f64,
    /// Spacing between adjacent points.
    pub step: f64,
}

impl AxisSpec {
    /// Create a new axis description. Validation happens in [`build`].
    ///
    /// [`build`]: AxisSpec::build
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        Self { start, end, step }
    }

    /// Check bounds and step consistency without constructing the axis.
    pub fn validate(&self) -> ScanResult<()> {
        if !self.start.is_finite() || !self.end.is_finite() || !self.step.is_finite() {
            return Err(ScanError::Configuration(format!(
                "axis bounds and step must be finite, got start={}, end={}, step={}",
                self.start, self.end, self.step
            )));
        }
        if self.step == 0.0 {
            return Err(ScanError::Configuration(
                "axis step must be non-zero".to_string(),
            ));
        }
        if self.end > self.start && self.step < 0.0 {
            return Err(ScanError::Configuration(format!(
                "axis step must be positive when end >= start (start={}, end={}, step={})",
                self.start, self.end, self.step
            )));
        }
        if self.end < self.start && self.step > 0.0 {
            return Err(ScanError::Configuration(format!(
                "inverted axis bounds need a negative step (start={}, end={}, step={})",
                self.start, self.end, self.step
            )));
        }
        Ok(())
    }

    /// Materialize the axis points.
    ///
    /// Length is `floor((end - start) / step) + 1`. The division gets a tiny
    /// epsilon before flooring so ranges that are exact step multiples in
    /// decimal (but not in binary, e.g. -1..1 by 0.1) keep their final
    /// point.
    pub fn build(&self) -> ScanResult<Axis> {
        self.validate()?;
        let ratio = (self.end - self.start) / self.step;
        let count = (ratio + 1e-9).floor() as usize + 1;
        if count > MAX_AXIS_POINTS {
            return Err(ScanError::Configuration(format!(
                "axis would have {count} points; step {} is too small for range [{}, {}]",
                self.step, self.start, self.end
            )));
        }
        let values = (0..count)
            .map(|i| self.start + i as f64 * self.step)
            .collect();
        Ok(Axis {
            values,
            step: self.step,
        })
    }
}

/// A materialized scan axis: strictly monotonic coordinates at uniform
/// pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    values: Vec<f64>,
    step: f64,
}

impl Axis {
    /// Wrap an already-built coordinate sequence.
    ///
    /// The caller asserts the values are uniformly spaced by `step`; grid
    /// inference and record loading use this after producing such a
    /// sequence themselves.
    pub fn from_values(values: Vec<f64>, step: f64) -> Self {
        Self { values, step }
    }

    /// Number of points on the axis.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the axis has no points.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The coordinate sequence.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The pitch between adjacent points.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Coordinate at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// First coordinate, if any.
    pub fn first(&self) -> Option<f64> {
        self.values.first().copied()
    }

    /// Last coordinate, if any.
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Index of the axis point matching `coord` within
    /// [`COORD_TOLERANCE`], if any.
    pub fn index_of(&self, coord: f64) -> Option<usize> {
        self.values
            .iter()
            .position(|v| (v - coord).abs() < COORD_TOLERANCE)
    }
}

impl std::ops::Index<usize> for Axis {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.values[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_length_matches_floor_formula() {
        // Exact multiple: (1 - 0) / 0.25 = 4 -> 5 points.
        let axis = AxisSpec::new(0.0, 1.0, 0.25).build().unwrap();
        assert_eq!(axis.len(), 5);
        assert_eq!(axis.first(), Some(0.0));

        // Non-divisible range: floor(3.33) + 1 = 4 points, last short of end.
        let axis = AxisSpec::new(0.0, 1.0, 0.3).build().unwrap();
        assert_eq!(axis.len(), 4);
        assert!((axis.last().unwrap() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn axis_starts_exactly_at_start() {
        let axis = AxisSpec::new(-0.5, 0.5, 0.25).build().unwrap();
        assert_eq!(axis.values()[0], -0.5);
        assert_eq!(axis.len(), 5);
    }

    #[test]
    fn binary_inexact_range_keeps_final_point() {
        // (1 - -1) / 0.1 is 19.999999999999996 in f64; the mathematical
        // count is 21 points ending on 1.0.
        let axis = AxisSpec::new(-1.0, 1.0, 0.1).build().unwrap();
        assert_eq!(axis.len(), 21);
        assert!((axis.last().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn axis_is_strictly_monotonic() {
        let axis = AxisSpec::new(-1.0, 1.0, 0.1).build().unwrap();
        for pair in axis.values().windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn single_point_axis_when_bounds_equal() {
        let axis = AxisSpec::new(0.3, 0.3, 0.1).build().unwrap();
        assert_eq!(axis.values(), &[0.3]);
    }

    #[test]
    fn descending_axis_takes_negative_step() {
        let axis = AxisSpec::new(1.0, -1.0, -0.5).build().unwrap();
        assert_eq!(axis.values(), &[1.0, 0.5, 0.0, -0.5, -1.0]);
    }

    #[test]
    fn rejects_zero_step() {
        assert!(matches!(
            AxisSpec::new(0.0, 1.0, 0.0).build(),
            Err(ScanError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_wrong_sign_step() {
        assert!(matches!(
            AxisSpec::new(0.0, 1.0, -0.1).build(),
            Err(ScanError::Configuration(_))
        ));
        assert!(matches!(
            AxisSpec::new(1.0, 0.0, 0.1).build(),
            Err(ScanError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_non_finite_spec() {
        assert!(AxisSpec::new(f64::NAN, 1.0, 0.1).build().is_err());
        assert!(AxisSpec::new(0.0, f64::INFINITY, 0.1).build().is_err());
    }

    #[test]
    fn index_of_matches_within_tolerance() {
        let axis = AxisSpec::new(-0.5, 0.5, 0.25).build().unwrap();
        assert_eq!(axis.index_of(0.25), Some(3));
        assert_eq!(axis.index_of(0.2501), Some(3));
        assert_eq!(axis.index_of(0.1), None);
    }

    #[test]
    fn round3_snaps_to_millivolts() {
        assert_eq!(round3(0.12349), 0.123);
        assert_eq!(round3(-0.0005), -0.001);
        assert_eq!(round3(2.0), 2.0);
    }
}
