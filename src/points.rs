//! Caller-supplied target point lists for custom (non-grid) scans.
//!
//! Patterns arrive from collaborators as paired coordinate arrays; the
//! upload file shape is `{"x_coord": [..], "y_coord": [..]}`. Coordinates
//! are rounded to 3 decimals on ingestion so later pixel-pitch inference
//! sees stable values.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::axis::round3;
use crate::error::{ScanError, ScanResult};

/// An ordered list of (x, y) scan targets, 3-decimal rounded.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPointList {
    points: Vec<(f64, f64)>,
}

/// On-disk upload shape for custom coordinates.
#[derive(Debug, Deserialize)]
struct CustomCoordsFile {
    x_coord: Vec<f64>,
    y_coord: Vec<f64>,
}

impl TargetPointList {
    /// Ingest a point sequence, rounding every coordinate to 3 decimals.
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self {
            points: points
                .into_iter()
                .map(|(x, y)| (round3(x), round3(y)))
                .collect(),
        }
    }

    /// Load a target list from a custom-coordinates JSON file.
    ///
    /// The file must hold `x_coord` and `y_coord` arrays of equal, non-zero
    /// length; anything else is a configuration error.
    pub fn from_json_file(path: &Path) -> ScanResult<Self> {
        let text = fs::read_to_string(path)?;
        let file: CustomCoordsFile = serde_json::from_str(&text)?;
        if file.x_coord.len() != file.y_coord.len() {
            return Err(ScanError::Configuration(format!(
                "custom coordinates arrays differ in length: {} x values vs {} y values",
                file.x_coord.len(),
                file.y_coord.len()
            )));
        }
        if file.x_coord.is_empty() {
            return Err(ScanError::Configuration(
                "custom coordinates file holds no points".to_string(),
            ));
        }
        Ok(Self::new(
            file.x_coord.into_iter().zip(file.y_coord),
        ))
    }

    /// The rounded target points, in scan order.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the list holds no targets.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// x coordinates in scan order.
    pub fn x_coords(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|&(x, _)| x)
    }

    /// y coordinates in scan order.
    pub fn y_coords(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|&(_, y)| y)
    }
}
