//! Grid inference over custom point patterns: pitch recovery, gap
//! filling, and mapping measured points back onto the rebuilt grid.

use confocal_daq::error::ScanError;
use confocal_daq::grid::{fill_gaps, infer_pixel_step, InferredGrid};
use confocal_daq::points::TargetPointList;

#[test]
fn test_pitch_is_the_gcd_of_scaled_coordinates() {
    assert_eq!(infer_pixel_step(&[0.0, 0.25, 0.5, 1.0]).unwrap(), 0.25);
    assert_eq!(infer_pixel_step(&[0.1, 0.3, 0.7]).unwrap(), 0.1);
    // Sign does not matter.
    assert_eq!(infer_pixel_step(&[-0.5, 0.0, 0.5]).unwrap(), 0.5);
}

#[test]
fn test_too_few_distinct_coordinates_is_insufficient_data() {
    let err = infer_pixel_step(&[0.5, 0.5, 0.5]).unwrap_err();
    assert!(matches!(err, ScanError::InsufficientData { distinct: 1 }));

    // Coordinates that collapse below 3-decimal resolution count as one.
    let err = infer_pixel_step(&[0.0001, 0.0002]).unwrap_err();
    assert!(matches!(err, ScanError::InsufficientData { distinct: 1 }));
}

#[test]
fn test_gap_filling_inserts_midpoints_until_uniform() {
    let mut axis = vec![0.0, 0.25, 0.75];
    fill_gaps(&mut axis, 0.25).unwrap();
    assert_eq!(axis, vec![0.0, 0.25, 0.5, 0.75]);
}

#[test]
fn test_gap_that_never_halves_to_the_pitch_fails() {
    // 0.3 is three pitches wide; halving can never produce 0.1.
    let mut axis = vec![0.0, 0.3];
    let err = fill_gaps(&mut axis, 0.1).unwrap_err();
    assert!(matches!(err, ScanError::GridInconsistency(_)));
}

#[test]
fn test_grid_from_l_shaped_pattern() {
    let points = TargetPointList::new([
        (0.0, 0.0),
        (0.5, 0.0),
        (1.0, 0.0),
        (0.0, 0.5),
        (0.0, 1.0),
    ]);
    let grid = InferredGrid::from_points(&points).unwrap();

    assert_eq!(grid.x_axis().values(), &[0.0, 0.5, 1.0]);
    assert_eq!(grid.y_axis().values(), &[0.0, 0.5, 1.0]);
    assert_eq!(grid.x_axis().step(), 0.5);

    let buffer = grid
        .rasterize(&points, &[1.0, 2.0, 3.0, 4.0, 5.0])
        .unwrap();
    assert_eq!(buffer.get(0, 0), 1.0);
    assert_eq!(buffer.get(1, 0), 2.0);
    assert_eq!(buffer.get(2, 0), 3.0);
    assert_eq!(buffer.get(0, 1), 4.0);
    assert_eq!(buffer.get(0, 2), 5.0);
    // Cells with no target stay zero.
    assert_eq!(buffer.get(1, 1), 0.0);
    assert_eq!(buffer.get(2, 2), 0.0);
}

#[test]
fn test_grid_repairs_a_missing_column() {
    // x jumps from 0.25 to 0.75: one column of the 0.25-pitch grid is
    // absent from the pattern and must be filled in.
    let points = TargetPointList::new([(0.0, 0.0), (0.25, 0.0), (0.75, 0.5)]);
    let grid = InferredGrid::from_points(&points).unwrap();

    assert_eq!(grid.x_axis().values(), &[0.0, 0.25, 0.5, 0.75]);
    assert_eq!(grid.y_axis().values(), &[0.0, 0.5]);

    let buffer = grid.rasterize(&points, &[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(buffer.get(0, 0), 1.0);
    assert_eq!(buffer.get(1, 0), 2.0);
    assert_eq!(buffer.get(3, 1), 3.0);
    // The repaired column holds no measurements.
    assert_eq!(buffer.get(2, 0), 0.0);
    assert_eq!(buffer.get(2, 1), 0.0);
}

#[test]
fn test_grid_covers_negative_coordinates() {
    let points = TargetPointList::new([(-0.5, -0.5), (0.0, -0.5), (0.5, 0.0)]);
    let grid = InferredGrid::from_points(&points).unwrap();

    assert_eq!(grid.x_axis().values(), &[-0.5, 0.0, 0.5]);
    assert_eq!(grid.y_axis().values(), &[-0.5, 0.0]);
    assert_eq!(grid.index_of(0.5, -0.5), Some((2, 0)));
}

#[test]
fn test_pattern_with_an_odd_gap_fails_instead_of_looping() {
    // x spans 0 to 1.0 at pitch 0.25, but the 0.75 gap is an odd multiple.
    let points = TargetPointList::new([(0.0, 0.0), (0.25, 0.0), (1.0, 0.5)]);
    let err = InferredGrid::from_points(&points).unwrap_err();
    assert!(matches!(err, ScanError::GridInconsistency(_)));
}

#[test]
fn test_rasterize_rejects_points_off_the_grid() {
    let on_grid = TargetPointList::new([(0.0, 0.0), (0.5, 0.0), (0.0, 0.5)]);
    let grid = InferredGrid::from_points(&on_grid).unwrap();

    let off_grid = TargetPointList::new([(0.3, 0.0)]);
    let err = grid.rasterize(&off_grid, &[1.0]).unwrap_err();
    assert!(matches!(err, ScanError::GridInconsistency(_)));
}

#[test]
fn test_unmeasured_trailing_points_rasterize_as_zero() {
    let points = TargetPointList::new([(0.0, 0.0), (0.5, 0.0), (0.0, 0.5)]);
    let grid = InferredGrid::from_points(&points).unwrap();

    // Only the first point has been measured so far.
    let buffer = grid.rasterize(&points, &[7.0]).unwrap();
    assert_eq!(buffer.get(0, 0), 7.0);
    assert_eq!(buffer.get(1, 0), 0.0);
    assert_eq!(buffer.get(0, 1), 0.0);
}
