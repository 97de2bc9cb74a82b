//! Regular-grid inference from arbitrary target coordinates.
//!
//! Custom point patterns arrive as a bare list of (x, y) targets with no
//! pitch attached. For display and mapping we need the regular grid those
//! points live on:
//!
//! 1. [`infer_pixel_step`] recovers the pitch: scale to integers at
//!    3-decimal resolution and take the GCD across all values.
//! 2. [`fill_gaps`] repairs an axis built from the distinct coordinates by
//!    inserting midpoints wherever a gap is wider than one pitch, until the
//!    spacing is uniform.
//! 3. [`InferredGrid`] bundles the two repaired axes and maps points to
//!    pixel indices.
//!
//! Midpoint insertion only converges when every gap is a power-of-two
//! multiple of the pitch, so the walk caps its insertion count and fails
//! with `GridInconsistency` instead of looping on malformed input.

use std::collections::BTreeSet;

use crate::axis::{round3, Axis, AxisSpec, COORD_TOLERANCE};
use crate::error::{ScanError, ScanResult};
use crate::model::ScanBuffer;
use crate::points::TargetPointList;

/// Recover the pixel pitch underlying a coordinate list.
///
/// Coordinates are scaled by 1000 and truncated to integers, then reduced
/// pairwise by GCD; the result divided back by 1000 is the pitch. Fails with
/// `InsufficientData` when fewer than 2 distinct scaled values remain, which
/// also catches coordinate sets that collapse below 3-decimal resolution.
pub fn infer_pixel_step(coords: &[f64]) -> ScanResult<f64> {
    let scaled: BTreeSet<i64> = coords.iter().map(|c| (c * 1000.0) as i64).collect();
    if scaled.len() < 2 {
        return Err(ScanError::InsufficientData {
            distinct: scaled.len(),
        });
    }
    let mut pitch = 0_i64;
    for value in &scaled {
        pitch = gcd(pitch, value.abs());
    }
    Ok(pitch as f64 / 1000.0)
}

/// Build a regular axis over `[min, max]` at the given pitch.
///
/// Same construction as [`AxisSpec::build`]: `floor((max-min)/step) + 1`
/// points starting at `min`.
pub fn build_axis(min: f64, max: f64, step: f64) -> ScanResult<Axis> {
    AxisSpec::new(min, max, step).build()
}

/// Make `axis` uniformly spaced by `step`, inserting midpoints in place.
///
/// Walks adjacent pairs; wherever the observed gap (rounded to 3 decimals)
/// differs from `step`, the midpoint is inserted and the same position is
/// re-examined, halving the gap until it matches. The number of insertions
/// is capped by the span/step ratio: past the cap the input cannot converge
/// (a gap that is an odd multiple of the pitch never halves down to it) and
/// the walk fails with `GridInconsistency`.
pub fn fill_gaps(axis: &mut Vec<f64>, step: f64) -> ScanResult<()> {
    if !step.is_finite() || step <= 0.0 {
        return Err(ScanError::GridInconsistency(format!(
            "gap filling needs a positive finite step, got {step}"
        )));
    }
    if axis.len() < 2 {
        return Ok(());
    }

    let span = (axis[axis.len() - 1] - axis[0]).abs();
    let max_insertions = 2 * ((span / step).ceil() as usize) + axis.len();
    let target = round3(step);

    let mut inserted = 0_usize;
    let mut i = 1;
    while i < axis.len() {
        let gap = round3((axis[i] - axis[i - 1]).abs());
        if (gap - target).abs() < COORD_TOLERANCE {
            i += 1;
            continue;
        }
        inserted += 1;
        if inserted > max_insertions {
            return Err(ScanError::GridInconsistency(format!(
                "gap filling did not converge after {inserted} insertions (step {step}, span {span})"
            )));
        }
        let midpoint = (axis[i] + axis[i - 1]) / 2.0;
        axis.insert(i, midpoint);
    }
    Ok(())
}

/// The regular grid recovered from a target point list: one repaired axis
/// per dimension, each carrying its inferred pitch.
#[derive(Debug, Clone)]
pub struct InferredGrid {
    x_axis: Axis,
    y_axis: Axis,
}

impl InferredGrid {
    /// Infer the grid covering `points`.
    ///
    /// Per dimension: infer the pitch, seed an axis from the sorted distinct
    /// coordinates, then gap-fill it to uniform spacing. Every input point
    /// maps onto the result by construction.
    pub fn from_points(points: &TargetPointList) -> ScanResult<Self> {
        let xs: Vec<f64> = points.x_coords().collect();
        let ys: Vec<f64> = points.y_coords().collect();

        let x_step = infer_pixel_step(&xs)?;
        let y_step = infer_pixel_step(&ys)?;

        let mut x_values = sorted_distinct(&xs);
        let mut y_values = sorted_distinct(&ys);
        fill_gaps(&mut x_values, x_step)?;
        fill_gaps(&mut y_values, y_step)?;

        Ok(Self {
            x_axis: Axis::from_values(x_values, x_step),
            y_axis: Axis::from_values(y_values, y_step),
        })
    }

    /// The repaired x axis.
    pub fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    /// The repaired y axis.
    pub fn y_axis(&self) -> &Axis {
        &self.y_axis
    }

    /// Pixel indices of a physical coordinate, if it lies on the grid.
    pub fn index_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        Some((self.x_axis.index_of(x)?, self.y_axis.index_of(y)?))
    }

    /// Spread per-point values onto the grid for display.
    ///
    /// Cells with no corresponding point stay 0, as do points whose value
    /// has not been measured yet (a `values` slice shorter than the point
    /// list). A point off the grid is a `GridInconsistency`; it means the
    /// grid was inferred from a different list.
    pub fn rasterize(
        &self,
        points: &TargetPointList,
        values: &[f64],
    ) -> ScanResult<ScanBuffer> {
        let mut buffer = ScanBuffer::new(self.x_axis.len(), self.y_axis.len());
        for (k, &(x, y)) in points.points().iter().enumerate() {
            let (xi, yi) = self.index_of(x, y).ok_or_else(|| {
                ScanError::GridInconsistency(format!(
                    "point ({x}, {y}) does not lie on the inferred grid"
                ))
            })?;
            if let Some(&value) = values.get(k) {
                buffer.set(xi, yi, value);
            }
        }
        Ok(buffer)
    }
}

/// Ascending distinct coordinates. Inputs are already 3-decimal rounded, so
/// exact dedup is safe.
fn sorted_distinct(coords: &[f64]) -> Vec<f64> {
    let mut values: Vec<f64> = coords.to_vec();
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    a = a.abs();
    b = b.abs();
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
