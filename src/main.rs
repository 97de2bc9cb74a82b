//! CLI entry point for the confocal scan engine.
//!
//! Provides a command-line interface for:
//! - Running raster scans against the simulated instrument
//! - Driving custom point patterns (one pass or looped)
//! - Printing the effective layered configuration
//!
//! # Usage
//!
//! Run a scan and find peaks:
//! ```bash
//! confocal_daq scan --threshold-fraction 2.5
//! ```
//!
//! Visit a point pattern once:
//! ```bash
//! confocal_daq pattern targets.json --mode once
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use confocal_daq::config::AppConfig;
use confocal_daq::grid::InferredGrid;
use confocal_daq::hardware::{
    GaussianSpot, LocalMaxima, MockCounter, MockMirror, MockRenderer, RenderRequest, Renderer,
};
use confocal_daq::logging::init_tracing;
use confocal_daq::model::{Extent, PointScanModel, ScanDataModel};
use confocal_daq::peaks::{self, PeakNavigator};
use confocal_daq::points::TargetPointList;
use confocal_daq::record::{
    artifact_stem, custom_suffix, generate_scan_id, save_with_image, ScanRecord,
    PEAKFINDING_SUFFIX,
};
use confocal_daq::scan::{
    self, PointSample, PointSequenceScanner, RasterScanner, Sample, ScanInterrupt, ScanObserver,
    SequenceMode, TerminationReason,
};
use confocal_daq::validation::{has_points, points_within_window};

#[derive(Parser)]
#[command(name = "confocal_daq")]
#[command(about = "2-axis scanning engine with a simulated instrument", long_about = None)]
struct Cli {
    /// Configuration file; CONFOCAL_* environment variables override it
    #[arg(long, default_value = "config/confocal.toml")]
    config: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a raster scan over the configured grid, then find peaks
    Scan {
        /// Output directory override
        #[arg(long)]
        out: Option<PathBuf>,

        /// Redraw the live view after every fast-axis column
        #[arg(long)]
        fast: bool,

        /// Request cancellation after this many samples (0 = run to completion)
        #[arg(long, default_value = "0")]
        cancel_after: usize,

        /// Integration window override, milliseconds
        #[arg(long)]
        integration_ms: Option<f64>,

        /// Peak threshold, as a multiple of the frame mean
        #[arg(long, default_value = "2.0")]
        threshold_fraction: f64,

        /// Minimum peak separation, pixels
        #[arg(long, default_value = "2")]
        min_separation: usize,
    },

    /// Visit a custom point pattern from a coordinates JSON file
    Pattern {
        /// JSON file holding x_coord and y_coord arrays
        points: PathBuf,

        /// Traversal mode
        #[arg(long, value_enum, default_value = "once")]
        mode: PatternMode,

        /// Output directory override
        #[arg(long)]
        out: Option<PathBuf>,

        /// Request cancellation after this many point visits (0 = never)
        #[arg(long, default_value = "0")]
        cancel_after: usize,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PatternMode {
    /// One measuring pass over the list
    Once,
    /// Cycle the list until interrupted
    Loop,
}

impl From<PatternMode> for SequenceMode {
    fn from(mode: PatternMode) -> Self {
        match mode {
            PatternMode::Once => SequenceMode::Once,
            PatternMode::Loop => SequenceMode::Loop,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level).map_err(anyhow::Error::msg)?;

    let config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    config
        .validate()
        .map_err(|reason| anyhow!("invalid configuration: {reason}"))?;

    match cli.command {
        Commands::Scan {
            out,
            fast,
            cancel_after,
            integration_ms,
            threshold_fraction,
            min_separation,
        } => run_scan(
            &config,
            out,
            fast,
            cancel_after,
            integration_ms,
            threshold_fraction,
            min_separation,
        ),
        Commands::Pattern {
            points,
            mode,
            out,
            cancel_after,
        } => run_pattern(&config, &points, mode.into(), out, cancel_after),
        Commands::Config => show_config(&config),
    }
}

/// Wire up the simulated instrument described by the configuration.
fn build_instrument(config: &AppConfig) -> (MockMirror, MockCounter) {
    let mirror = MockMirror::new(config.actuator.min_voltage, config.actuator.max_voltage);
    let counter = MockCounter::new(mirror.beam())
        .with_spots(config.detector.spots.iter().map(|spot| GaussianSpot {
            x: spot.x,
            y: spot.y,
            amplitude: spot.amplitude,
            sigma: spot.sigma,
        }))
        .with_background(config.detector.background)
        .with_noise(config.detector.noise, config.detector.seed);
    (mirror, counter)
}

/// Progress reporter for raster scans. Raises the interrupt once the
/// requested number of samples has been taken.
struct ScanProgress {
    total: usize,
    report_every: usize,
    cancel_after: usize,
    interrupt: ScanInterrupt,
}

impl ScanObserver for ScanProgress {
    fn on_sample(&mut self, sample: &Sample) {
        if sample.seq == 1 || sample.seq == self.total || sample.seq % self.report_every == 0 {
            println!(
                "   sample {:>5}/{} at ({:+.3}, {:+.3}) V reads {:.1}",
                sample.seq, self.total, sample.x, sample.y, sample.value
            );
        }
        if self.cancel_after > 0 && sample.seq >= self.cancel_after {
            self.interrupt.request_stop();
        }
    }
}

/// Progress reporter for point patterns, counting visits across passes.
struct PatternProgress {
    visited: usize,
    cancel_after: usize,
    interrupt: ScanInterrupt,
}

impl ScanObserver for PatternProgress {
    fn on_point(&mut self, point: &PointSample) {
        self.visited += 1;
        println!(
            "   point {:>3} at ({:+.3}, {:+.3}) V reads {:.1}",
            point.index, point.x, point.y, point.value
        );
        if self.cancel_after > 0 && self.visited >= self.cancel_after {
            self.interrupt.request_stop();
        }
    }
}

fn run_scan(
    config: &AppConfig,
    out: Option<PathBuf>,
    fast: bool,
    cancel_after: usize,
    integration_ms: Option<f64>,
    threshold_fraction: f64,
    min_separation: usize,
) -> Result<()> {
    let x_axis = config.x_axis_spec().build()?;
    let y_axis = config.y_axis_spec().build()?;
    let integration_time_ms = integration_ms.unwrap_or(config.scan.integration_time_ms);

    let mut model = ScanDataModel::new(x_axis, y_axis);
    let (mut mirror, mut counter) = build_instrument(config);
    let mut renderer = MockRenderer::new();

    let total = model.x_axis().len() * model.y_axis().len();
    println!(
        "🔬 Raster scan: {} x {} pixels, {} ms per sample",
        model.x_axis().len(),
        model.y_axis().len(),
        integration_time_ms
    );

    let interrupt = ScanInterrupt::new();
    let mut progress = ScanProgress {
        total,
        report_every: (total / 10).max(1),
        cancel_after,
        interrupt: interrupt.clone(),
    };

    let scanner = RasterScanner::new(integration_time_ms)
        .with_fast_scan(fast || config.scan.fast)
        .with_live_redraw_every(config.scan.live_redraw_every)
        .with_colormap(config.scan.colormap.as_str());
    let reason = scanner.run(
        &mut model,
        &mut mirror,
        &mut counter,
        Some(&mut renderer),
        &mut progress,
        &interrupt,
    )?;

    match reason {
        TerminationReason::Completed => {
            println!("✅ Scan completed: {} samples", model.data_stream().len());
        }
        TerminationReason::Cancelled => {
            println!("🛑 Scan cancelled after {} samples", model.data_stream().len());
        }
    }
    let (low, high) = model.color_range().bounds();
    println!("   color range: {low:.1} to {high:.1}");

    let peaks = peaks::detect(&model, &LocalMaxima, threshold_fraction, min_separation);
    println!(
        "🔎 {} peak(s) above {:.2}x the frame mean",
        peaks.len(),
        threshold_fraction
    );

    let mut record = ScanRecord::from_model(&model, integration_time_ms).with_saved_at_now();
    let suffix = if peaks.is_empty() {
        String::new()
    } else {
        record.set_peaks(&peaks);
        PEAKFINDING_SUFFIX.to_string()
    };

    if !peaks.is_empty() {
        let mut navigator = PeakNavigator::new(peaks);
        let target = navigator.go_to_index(0)?;
        let readback = scan::point_readout(
            &mut mirror,
            &mut counter,
            target.x,
            target.y,
            integration_time_ms,
        )?;
        println!(
            "   strongest peak at ({:+.3}, {:+.3}) V reads {readback:.1}",
            target.x, target.y
        );
    }

    let folder = out.unwrap_or_else(|| config.output.folder.clone());
    fs::create_dir_all(&folder)
        .with_context(|| format!("creating output directory {}", folder.display()))?;
    let stem = artifact_stem(&folder, &config.output.base_name, &generate_scan_id(), &suffix);
    let record_path = save_with_image(&record, &renderer, &stem)?;
    println!("💾 Record written to {}", record_path.display());
    Ok(())
}

fn run_pattern(
    config: &AppConfig,
    points_path: &Path,
    mode: SequenceMode,
    out: Option<PathBuf>,
    cancel_after: usize,
) -> Result<()> {
    let points = TargetPointList::from_json_file(points_path)
        .with_context(|| format!("loading target points from {}", points_path.display()))?;
    has_points(&points).map_err(anyhow::Error::msg)?;
    points_within_window(&points, config.voltage_window()).map_err(anyhow::Error::msg)?;

    println!(
        "🧭 Point pattern: {} target(s) from {}",
        points.len(),
        points_path.display()
    );

    let (mut mirror, mut counter) = build_instrument(config);
    let mut model = PointScanModel::new(points.clone());
    let interrupt = ScanInterrupt::new();
    let mut progress = PatternProgress {
        visited: 0,
        cancel_after,
        interrupt: interrupt.clone(),
    };

    let scanner = PointSequenceScanner::new(config.scan.integration_time_ms, mode);
    let reason = scanner.run(&mut model, &mut mirror, &mut counter, &mut progress, &interrupt)?;
    match reason {
        TerminationReason::Completed => println!("✅ Pattern pass completed"),
        TerminationReason::Cancelled => println!("🛑 Pattern interrupted"),
    }

    if mode == SequenceMode::Loop {
        // Looping accumulates nothing, so there is no record to write.
        if let Some((index, value)) = model.last_point() {
            println!("   last visit: point {index} read {value:.1}");
        }
        return Ok(());
    }

    let grid = InferredGrid::from_points(&points)?;
    let buffer = grid.rasterize(&points, model.values())?;
    println!(
        "🗺️  Inferred grid: {} x {} pixels",
        grid.x_axis().len(),
        grid.y_axis().len()
    );

    let extent = Extent {
        x_min: grid.x_axis().first().unwrap_or(0.0),
        x_max: grid.x_axis().last().unwrap_or(0.0),
        y_min: grid.y_axis().first().unwrap_or(0.0),
        y_max: grid.y_axis().last().unwrap_or(0.0),
    };
    let (low, high) = model.color_range().bounds();
    let mut renderer = MockRenderer::new();
    renderer.render(&RenderRequest {
        buffer: &buffer,
        extent,
        color_low: low,
        color_high: high,
        colormap: config.scan.colormap.as_str(),
    })?;

    let mut record = ScanRecord {
        integration_time_ms: config.scan.integration_time_ms,
        x_axis: grid.x_axis().values().to_vec(),
        y_axis: grid.y_axis().values().to_vec(),
        x_step: grid.x_axis().step(),
        y_step: grid.y_axis().step(),
        scan_data: buffer.to_rows(),
        saved_at: None,
        peaks: None,
        custom_points: BTreeMap::new(),
    }
    .with_saved_at_now();
    record.add_custom_points(1, &points, model.completed_scans());

    let folder = out.unwrap_or_else(|| config.output.folder.clone());
    fs::create_dir_all(&folder)
        .with_context(|| format!("creating output directory {}", folder.display()))?;
    let stem = artifact_stem(
        &folder,
        &config.output.base_name,
        &generate_scan_id(),
        &custom_suffix(1),
    );
    let record_path = save_with_image(&record, &renderer, &stem)?;
    println!("💾 Record written to {}", record_path.display());
    Ok(())
}

/// Print the effective configuration, after file and environment merging.
fn show_config(config: &AppConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("rendering configuration")?;
    print!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_flag() {
        let cli = Cli::try_parse_from(["confocal_daq", "--log-level", "debug", "config"]).unwrap();
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::Config));

        let cli = Cli::try_parse_from(["confocal_daq", "config"]).unwrap();
        assert_eq!(cli.log_level, "info");
    }
}
