use std::ops::RangeInclusive;

use crate::axis::AxisSpec;
use crate::points::TargetPointList;

/// Validates that an integration time is usable as a detector window.
///
/// # Arguments
///
/// * `ms` - The integration time in milliseconds.
///
/// # Returns
///
/// * `Ok(())` if the integration time is positive and finite.
/// * `Err(&'static str)` if it is not.
pub fn is_valid_integration_time(ms: f64) -> Result<(), &'static str> {
    if ms.is_finite() && ms > 0.0 {
        Ok(())
    } else {
        Err("Integration time must be a positive number of milliseconds")
    }
}

/// Validates that a position lies inside the actuator's voltage window.
///
/// # Arguments
///
/// * `value` - The position to validate, in volts.
/// * `window` - The inclusive voltage window.
///
/// # Returns
///
/// * `Ok(())` if the position is inside the window.
/// * `Err(&'static str)` if the position is outside the window.
pub fn is_in_voltage_window(value: f64, window: RangeInclusive<f64>) -> Result<(), &'static str> {
    if window.contains(&value) {
        Ok(())
    } else {
        Err("Position is outside the actuator voltage window")
    }
}

/// Validates that every position an axis will generate lies inside the
/// actuator's voltage window. Positions are bounded by the axis endpoints,
/// so checking both endpoints covers the whole axis.
///
/// # Arguments
///
/// * `spec` - The axis specification to validate.
/// * `window` - The inclusive voltage window.
///
/// # Returns
///
/// * `Ok(())` if the whole axis fits in the window.
/// * `Err(&'static str)` if either endpoint falls outside the window.
pub fn axis_within_window(
    spec: &AxisSpec,
    window: RangeInclusive<f64>,
) -> Result<(), &'static str> {
    is_in_voltage_window(spec.start, window.clone())?;
    is_in_voltage_window(spec.end, window)
}

/// Validates that every target point lies inside the actuator's voltage
/// window.
///
/// # Arguments
///
/// * `points` - The target list to validate.
/// * `window` - The inclusive voltage window.
///
/// # Returns
///
/// * `Ok(())` if every point fits in the window.
/// * `Err(&'static str)` if any coordinate falls outside the window.
pub fn points_within_window(
    points: &TargetPointList,
    window: RangeInclusive<f64>,
) -> Result<(), &'static str> {
    for &(x, y) in points.points() {
        is_in_voltage_window(x, window.clone())?;
        is_in_voltage_window(y, window.clone())?;
    }
    Ok(())
}

/// Validates that a target list holds at least one point.
///
/// # Arguments
///
/// * `points` - The target list to validate.
///
/// # Returns
///
/// * `Ok(())` if the list is non-empty.
/// * `Err(&'static str)` if the list is empty.
pub fn has_points(points: &TargetPointList) -> Result<(), &'static str> {
    if !points.is_empty() {
        Ok(())
    } else {
        Err("Target list holds no points")
    }
}
