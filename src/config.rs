//! Configuration loading with Figment.
//!
//! Settings come from `config/confocal.toml` (base configuration) merged
//! with environment variables prefixed `CONFOCAL_`. Nested keys use a
//! double underscore: `CONFOCAL_SCAN__X_STEP=0.1` overrides `scan.x_step`.
//! Every field has a default, so the engine runs with no file at all.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::axis::AxisSpec;
use crate::validation::{axis_within_window, is_valid_integration_time};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Grid and traversal settings.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Scan mirror limits.
    #[serde(default)]
    pub actuator: ActuatorConfig,
    /// Detector simulation settings.
    #[serde(default)]
    pub detector: DetectorConfig,
    /// Where scan artifacts land.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Grid and traversal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// x axis start, volts.
    #[serde(default = "default_axis_start")]
    pub x_start: f64,
    /// x axis end, volts.
    #[serde(default = "default_axis_end")]
    pub x_end: f64,
    /// x pixel pitch, volts.
    #[serde(default = "default_axis_step")]
    pub x_step: f64,
    /// y axis start, volts.
    #[serde(default = "default_axis_start")]
    pub y_start: f64,
    /// y axis end, volts.
    #[serde(default = "default_axis_end")]
    pub y_end: f64,
    /// y pixel pitch, volts.
    #[serde(default = "default_axis_step")]
    pub y_step: f64,
    /// Per-sample integration window, milliseconds.
    #[serde(default = "default_integration_time_ms")]
    pub integration_time_ms: f64,
    /// Redraw the live view at the end of every fast-axis column too.
    #[serde(default)]
    pub fast: bool,
    /// Live-view redraw cadence, in samples.
    #[serde(default = "default_live_redraw_every")]
    pub live_redraw_every: usize,
    /// Colormap name handed to the renderer.
    #[serde(default = "default_colormap")]
    pub colormap: String,
}

/// Scan mirror limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// Lower deflection bound, volts.
    #[serde(default = "default_min_voltage")]
    pub min_voltage: f64,
    /// Upper deflection bound, volts.
    #[serde(default = "default_max_voltage")]
    pub max_voltage: f64,
}

/// One simulated emitter for the mock detector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpotConfig {
    /// Center x, volts.
    pub x: f64,
    /// Center y, volts.
    pub y: f64,
    /// Peak count rate, counts/s.
    pub amplitude: f64,
    /// Spot radius, volts.
    pub sigma: f64,
}

/// Detector simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Flat background rate, counts/s.
    #[serde(default = "default_background")]
    pub background: f64,
    /// Relative noise amplitude; 0 disables noise.
    #[serde(default = "default_noise")]
    pub noise: f64,
    /// Noise generator seed.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Emitters in the simulated field.
    #[serde(default = "default_spots")]
    pub spots: Vec<SpotConfig>,
}

/// Where scan artifacts land.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for records and images.
    #[serde(default = "default_output_folder")]
    pub folder: PathBuf,
    /// Record base name, prepended to the scan id.
    #[serde(default = "default_base_name")]
    pub base_name: String,
}

// Default value functions
fn default_axis_start() -> f64 {
    -1.0
}

fn default_axis_end() -> f64 {
    1.0
}

fn default_axis_step() -> f64 {
    0.05
}

fn default_integration_time_ms() -> f64 {
    30.0
}

fn default_live_redraw_every() -> usize {
    10
}

fn default_colormap() -> String {
    "magma".to_string()
}

fn default_min_voltage() -> f64 {
    -10.0
}

fn default_max_voltage() -> f64 {
    10.0
}

fn default_background() -> f64 {
    50.0
}

fn default_noise() -> f64 {
    0.02
}

fn default_seed() -> u64 {
    7
}

fn default_spots() -> Vec<SpotConfig> {
    vec![
        SpotConfig {
            x: 0.3,
            y: -0.2,
            amplitude: 1200.0,
            sigma: 0.08,
        },
        SpotConfig {
            x: -0.4,
            y: 0.5,
            amplitude: 800.0,
            sigma: 0.12,
        },
    ]
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("data/scans")
}

fn default_base_name() -> String {
    "scan".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            x_start: default_axis_start(),
            x_end: default_axis_end(),
            x_step: default_axis_step(),
            y_start: default_axis_start(),
            y_end: default_axis_end(),
            y_step: default_axis_step(),
            integration_time_ms: default_integration_time_ms(),
            fast: false,
            live_redraw_every: default_live_redraw_every(),
            colormap: default_colormap(),
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            min_voltage: default_min_voltage(),
            max_voltage: default_max_voltage(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            background: default_background(),
            noise: default_noise(),
            seed: default_seed(),
            spots: default_spots(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: default_output_folder(),
            base_name: default_base_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `config/confocal.toml` and `CONFOCAL_`
    /// environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from("config/confocal.toml")
    }

    /// Load configuration from a specific file path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("CONFOCAL_").split("__"))
            .extract()
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), String> {
        self.x_axis_spec().validate().map_err(|e| e.to_string())?;
        self.y_axis_spec().validate().map_err(|e| e.to_string())?;
        is_valid_integration_time(self.scan.integration_time_ms).map_err(str::to_string)?;

        if self.scan.live_redraw_every == 0 {
            return Err("live_redraw_every must be at least 1".to_string());
        }
        if self.scan.colormap.trim().is_empty() {
            return Err("colormap must not be empty".to_string());
        }
        if self.actuator.min_voltage >= self.actuator.max_voltage {
            return Err(format!(
                "Actuator window is empty: min_voltage {} is not below max_voltage {}",
                self.actuator.min_voltage, self.actuator.max_voltage
            ));
        }

        axis_within_window(&self.x_axis_spec(), self.voltage_window())
            .map_err(|e| format!("x axis: {e}"))?;
        axis_within_window(&self.y_axis_spec(), self.voltage_window())
            .map_err(|e| format!("y axis: {e}"))?;
        Ok(())
    }

    /// The configured x axis.
    pub fn x_axis_spec(&self) -> AxisSpec {
        AxisSpec::new(self.scan.x_start, self.scan.x_end, self.scan.x_step)
    }

    /// The configured y axis.
    pub fn y_axis_spec(&self) -> AxisSpec {
        AxisSpec::new(self.scan.y_start, self.scan.y_end, self.scan.y_step)
    }

    /// The actuator's inclusive voltage window.
    pub fn voltage_window(&self) -> RangeInclusive<f64> {
        self.actuator.min_voltage..=self.actuator.max_voltage
    }
}
