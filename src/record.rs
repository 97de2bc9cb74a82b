//! Scan record persistence.
//!
//! A [`ScanRecord`] is the on-disk form of one finished grid scan: the
//! axes, their steps, the full measurement grid, and optional sections for
//! detected peaks and for custom point patterns measured over the same
//! field. Records serialize as pretty-printed JSON with deterministic key
//! order, so saving, loading, and saving again reproduces the file byte
//! for byte.
//!
//! ## File Naming
//!
//! Artifacts share a stem of `<folder>/<base><scan_id><suffix>`: the
//! record itself gets `.json`, and a sibling rendered image takes whatever
//! extension the renderer writes. The peak-finding pass appends
//! [`PEAKFINDING_SUFFIX`]; each custom pattern appends
//! [`custom_suffix`]`(n)`.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ScanResult;
use crate::hardware::Renderer;
use crate::model::{ScanBuffer, ScanDataModel};
use crate::peaks::PeakSet;
use crate::points::TargetPointList;

/// Suffix for records produced by a peak-finding pass.
pub const PEAKFINDING_SUFFIX: &str = "_peakfinding";

/// Suffix for records carrying custom pattern `n`.
pub fn custom_suffix(n: u32) -> String {
    format!("_custom_{n}")
}

/// Timestamp-based scan identity, `YYYYmmddHHMMSS` in local time.
pub fn generate_scan_id() -> String {
    Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Artifact stem `<folder>/<base><scan_id><suffix>`.
pub fn artifact_stem(folder: &Path, base: &str, scan_id: &str, suffix: &str) -> PathBuf {
    folder.join(format!("{base}{scan_id}{suffix}"))
}

fn stem_with_extension(stem: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Persisted peak coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakRecord {
    /// Peak x coordinates, strongest first.
    pub peaks_x_coords: Vec<f64>,
    /// Peak y coordinates, strongest first.
    pub peaks_y_coords: Vec<f64>,
}

impl PeakRecord {
    /// Rebuild the peak set this record was written from.
    pub fn to_peak_set(&self) -> ScanResult<PeakSet> {
        PeakSet::from_coords(self.peaks_x_coords.clone(), self.peaks_y_coords.clone())
    }
}

impl From<&PeakSet> for PeakRecord {
    fn from(peaks: &PeakSet) -> Self {
        Self {
            peaks_x_coords: peaks.x_coords().to_vec(),
            peaks_y_coords: peaks.y_coords().to_vec(),
        }
    }
}

/// Persisted custom point pattern: target coordinates plus one entry per
/// completed acquisition, keyed by sub-scan number.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomPointsRecord {
    /// Target x coordinates, in scan order.
    pub x_coords: Vec<f64>,
    /// Target y coordinates, in scan order.
    pub y_coords: Vec<f64>,
    /// Measured values per acquisition, flattened so each sub-scan number
    /// appears as its own JSON key.
    #[serde(flatten)]
    pub acquisitions: BTreeMap<String, Vec<f64>>,
}

/// One finished grid scan, ready for disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Per-sample integration window, milliseconds.
    pub integration_time_ms: f64,
    /// x axis positions.
    pub x_axis: Vec<f64>,
    /// y axis positions.
    pub y_axis: Vec<f64>,
    /// x pixel pitch.
    pub x_step: f64,
    /// y pixel pitch.
    pub y_step: f64,
    /// Measurement grid, one inner array per x position.
    pub scan_data: Vec<Vec<f64>>,
    /// When the record was written, in UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    /// Peaks detected over this grid, when a peak-finding pass ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peaks: Option<PeakRecord>,
    /// Custom pattern sections, keyed `custom_points_<n>`.
    #[serde(flatten)]
    pub custom_points: BTreeMap<String, CustomPointsRecord>,
}

impl ScanRecord {
    /// Snapshot a data model.
    pub fn from_model(model: &ScanDataModel, integration_time_ms: f64) -> Self {
        Self {
            integration_time_ms,
            x_axis: model.x_axis().values().to_vec(),
            y_axis: model.y_axis().values().to_vec(),
            x_step: model.x_axis().step(),
            y_step: model.y_axis().step(),
            scan_data: model.buffer().to_rows(),
            saved_at: None,
            peaks: None,
            custom_points: BTreeMap::new(),
        }
    }

    /// Stamp the record with the current time.
    pub fn with_saved_at_now(mut self) -> Self {
        self.saved_at = Some(Utc::now());
        self
    }

    /// Attach detected peaks.
    pub fn set_peaks(&mut self, peaks: &PeakSet) {
        self.peaks = Some(PeakRecord::from(peaks));
    }

    /// Attach a custom pattern and its completed acquisitions as section
    /// `custom_points_<pattern_num>`.
    pub fn add_custom_points(
        &mut self,
        pattern_num: u32,
        points: &TargetPointList,
        acquisitions: &BTreeMap<u32, Vec<f64>>,
    ) {
        let section = CustomPointsRecord {
            x_coords: points.x_coords().collect(),
            y_coords: points.y_coords().collect(),
            acquisitions: acquisitions
                .iter()
                .map(|(num, values)| (num.to_string(), values.clone()))
                .collect(),
        };
        self.custom_points
            .insert(format!("custom_points_{pattern_num}"), section);
    }

    /// Rebuild the measurement grid.
    pub fn to_buffer(&self) -> ScanResult<ScanBuffer> {
        ScanBuffer::from_rows(&self.scan_data)
    }

    /// Write the record as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> ScanResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!(path = %path.display(), "scan record written");
        Ok(())
    }

    /// Read a record back from disk.
    pub fn load(path: &Path) -> ScanResult<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Write the record and the renderer's current frame side by side.
///
/// Both artifacts share `stem`; the record gets `.json` and the image gets
/// the renderer's extension. Returns the record path.
pub fn save_with_image(
    record: &ScanRecord,
    renderer: &dyn Renderer,
    stem: &Path,
) -> ScanResult<PathBuf> {
    let record_path = stem_with_extension(stem, "json");
    record.save(&record_path)?;
    let image_path = stem_with_extension(stem, renderer.image_extension());
    renderer.save_image(&image_path)?;
    info!(path = %image_path.display(), "scan image written");
    Ok(record_path)
}
