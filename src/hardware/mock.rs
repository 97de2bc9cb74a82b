//! Mock hardware implementations.
//!
//! Simulated devices for tests, benches, and the demo CLI, so the engine
//! can run without a physical scan head:
//!
//! - [`MockMirror`]: 2-axis actuator with a configurable voltage window
//! - [`MockCounter`]: detector reading a field of synthetic emitters
//! - [`FlakyDetector`]: detector that fails on cue, for fault-path tests
//! - [`MockRenderer`]: recording renderer with a PGM image writer
//!
//! `MockMirror` and `MockCounter` share a [`SharedBeam`] cell, so the
//! counter sees whatever position the mirror was last driven to. That is
//! the same coupling the physical beam path has: the detector itself never
//! knows where it is pointed.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::error::{HardwareError, HardwareResult};
use crate::hardware::capabilities::{Actuator, Detector, RenderRequest, Renderer};
use crate::model::Extent;

// A poisoned mock lock still holds valid data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Beam position shared between a mirror and the detectors it aims.
#[derive(Debug, Clone, Default)]
pub struct SharedBeam(Arc<Mutex<(f64, f64)>>);

impl SharedBeam {
    /// A beam parked at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current beam position as `(x, y)`.
    pub fn get(&self) -> (f64, f64) {
        *lock(&self.0)
    }

    fn set(&self, x: f64, y: f64) {
        *lock(&self.0) = (x, y);
    }
}

// =============================================================================
// MockMirror - Simulated Scan Mirror
// =============================================================================

/// Mock 2-axis scan mirror.
///
/// Moves instantly, enforces a symmetric voltage window, and logs every
/// commanded position so tests can assert traversal order.
#[derive(Debug)]
pub struct MockMirror {
    beam: SharedBeam,
    min: f64,
    max: f64,
    log: Vec<(f64, f64)>,
}

impl MockMirror {
    /// A mirror with the given voltage window, parked at the origin.
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            beam: SharedBeam::new(),
            min,
            max,
            log: Vec::new(),
        }
    }

    /// Handle to the beam position, for aiming a [`MockCounter`].
    pub fn beam(&self) -> SharedBeam {
        self.beam.clone()
    }

    /// Every position commanded so far, in order.
    pub fn move_log(&self) -> &[(f64, f64)] {
        &self.log
    }
}

impl Default for MockMirror {
    /// The ±10 V window of a typical galvo driver.
    fn default() -> Self {
        Self::new(-10.0, 10.0)
    }
}

impl Actuator for MockMirror {
    fn move_to(&mut self, x: f64, y: f64) -> HardwareResult<()> {
        if x < self.min || x > self.max || y < self.min || y > self.max {
            return Err(HardwareError::ActuatorRange {
                x,
                y,
                min: self.min,
                max: self.max,
            });
        }
        trace!(x, y, "mirror move");
        self.beam.set(x, y);
        self.log.push((x, y));
        Ok(())
    }

    fn position(&self) -> (f64, f64) {
        self.beam.get()
    }
}

// =============================================================================
// MockCounter - Simulated Photon Counter
// =============================================================================

/// One synthetic emitter in a [`MockCounter`] field.
#[derive(Debug, Clone, Copy)]
pub struct GaussianSpot {
    /// Center x position, volts.
    pub x: f64,
    /// Center y position, volts.
    pub y: f64,
    /// Peak count rate, counts/s.
    pub amplitude: f64,
    /// Spot radius (one standard deviation), volts.
    pub sigma: f64,
}

/// Mock photon counter reading a field of Gaussian spots.
///
/// Each reading is the sum of every spot's response at the current beam
/// position plus a flat background, optionally perturbed by multiplicative
/// noise from a seeded generator so runs stay reproducible.
#[derive(Debug)]
pub struct MockCounter {
    beam: SharedBeam,
    spots: Vec<GaussianSpot>,
    background: f64,
    noise: f64,
    rng: StdRng,
    reads: u64,
}

impl MockCounter {
    /// A noise-free counter aimed by `beam`, with no spots and zero
    /// background.
    pub fn new(beam: SharedBeam) -> Self {
        Self {
            beam,
            spots: Vec::new(),
            background: 0.0,
            noise: 0.0,
            rng: StdRng::seed_from_u64(0),
            reads: 0,
        }
    }

    /// Add emitters to the field.
    pub fn with_spots(mut self, spots: impl IntoIterator<Item = GaussianSpot>) -> Self {
        self.spots.extend(spots);
        self
    }

    /// Flat background rate added to every reading, counts/s.
    pub fn with_background(mut self, counts_per_sec: f64) -> Self {
        self.background = counts_per_sec;
        self
    }

    /// Multiplicative noise of the given relative amplitude, drawn from a
    /// generator seeded with `seed`.
    pub fn with_noise(mut self, relative: f64, seed: u64) -> Self {
        self.noise = relative;
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Number of measurements taken so far.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Noiseless response at `(x, y)`.
    pub fn response_at(&self, x: f64, y: f64) -> f64 {
        let spots: f64 = self
            .spots
            .iter()
            .map(|spot| {
                let d2 = (x - spot.x).powi(2) + (y - spot.y).powi(2);
                spot.amplitude * (-d2 / (2.0 * spot.sigma * spot.sigma)).exp()
            })
            .sum();
        self.background + spots
    }
}

impl Detector for MockCounter {
    fn measure(&mut self, integration_time_ms: f64) -> HardwareResult<f64> {
        if !integration_time_ms.is_finite() || integration_time_ms <= 0.0 {
            return Err(HardwareError::Device(format!(
                "integration time must be positive, got {integration_time_ms} ms"
            )));
        }
        let (x, y) = self.beam.get();
        let mut rate = self.response_at(x, y);
        if self.noise > 0.0 {
            rate *= 1.0 + self.rng.gen_range(-self.noise..self.noise);
        }
        self.reads += 1;
        trace!(x, y, rate, "counter read");
        Ok(rate)
    }
}

// =============================================================================
// FlakyDetector - Fault Injection
// =============================================================================

/// Detector that succeeds a fixed number of times, then times out on every
/// further read. For exercising mid-scan fault handling.
#[derive(Debug)]
pub struct FlakyDetector {
    good_reads: usize,
    taken: usize,
    value: f64,
}

impl FlakyDetector {
    /// Succeed `good_reads` times with `value`, then start failing.
    pub fn new(good_reads: usize, value: f64) -> Self {
        Self {
            good_reads,
            taken: 0,
            value,
        }
    }
}

impl Detector for FlakyDetector {
    fn measure(&mut self, integration_time_ms: f64) -> HardwareResult<f64> {
        if self.taken >= self.good_reads {
            return Err(HardwareError::Timeout {
                waited_ms: integration_time_ms * 3.0,
                integration_time_ms,
            });
        }
        self.taken += 1;
        Ok(self.value)
    }
}

// =============================================================================
// MockRenderer - Recording Image Sink
// =============================================================================

#[derive(Debug, Clone)]
struct Frame {
    rows: Vec<Vec<f64>>,
    low: f64,
    high: f64,
    extent: Extent,
    colormap: String,
}

/// Recording renderer with an 8-bit PGM writer.
///
/// Keeps the most recent frame and counts renders so tests can assert the
/// redraw cadence. `save_image` writes the kept frame as an ASCII portable
/// graymap, which archives next to a scan record without image crates.
#[derive(Debug, Default)]
pub struct MockRenderer {
    renders: usize,
    frame: Option<Frame>,
}

impl MockRenderer {
    /// A renderer with no frame shown yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames rendered so far.
    pub fn renders(&self) -> usize {
        self.renders
    }

    /// Color bounds of the most recent frame, if any.
    pub fn last_bounds(&self) -> Option<(f64, f64)> {
        self.frame.as_ref().map(|frame| (frame.low, frame.high))
    }

    /// Colormap requested for the most recent frame, if any.
    pub fn last_colormap(&self) -> Option<&str> {
        self.frame.as_ref().map(|frame| frame.colormap.as_str())
    }

    /// Physical extent of the most recent frame, if any.
    pub fn last_extent(&self) -> Option<Extent> {
        self.frame.as_ref().map(|frame| frame.extent)
    }
}

impl Renderer for MockRenderer {
    fn render(&mut self, request: &RenderRequest<'_>) -> HardwareResult<()> {
        self.renders += 1;
        self.frame = Some(Frame {
            rows: request.buffer.to_rows(),
            low: request.color_low,
            high: request.color_high,
            extent: request.extent,
            colormap: request.colormap.to_string(),
        });
        Ok(())
    }

    fn save_image(&self, path: &Path) -> HardwareResult<()> {
        let frame = self
            .frame
            .as_ref()
            .ok_or_else(|| HardwareError::Device("no frame rendered yet".into()))?;
        let pgm = encode_pgm(&frame.rows, frame.low, frame.high);
        fs::write(path, pgm)
            .map_err(|err| HardwareError::Device(format!("image write failed: {err}")))
    }
}

/// ASCII PGM, gray levels mapped linearly from the color bounds. Physical
/// y runs bottom to top, so image rows are emitted in descending y order.
fn encode_pgm(rows: &[Vec<f64>], low: f64, high: f64) -> String {
    let nx = rows.len();
    let ny = rows.first().map_or(0, Vec::len);
    let mut out = format!("P2\n{nx} {ny}\n255\n");
    let span = high - low;
    for yi in (0..ny).rev() {
        let mut line = String::new();
        for row in rows {
            let level = if span > 0.0 {
                (((row[yi] - low) / span).clamp(0.0, 1.0) * 255.0).round() as u8
            } else {
                0
            };
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&level.to_string());
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScanBuffer;

    fn spot_at(x: f64, y: f64) -> GaussianSpot {
        GaussianSpot {
            x,
            y,
            amplitude: 1000.0,
            sigma: 0.1,
        }
    }

    #[test]
    fn mirror_rejects_targets_outside_the_window() {
        let mut mirror = MockMirror::new(-1.0, 1.0);
        mirror.move_to(0.5, -0.5).unwrap();
        let err = mirror.move_to(1.5, 0.0).unwrap_err();
        assert!(matches!(err, HardwareError::ActuatorRange { .. }));
        // Failed move leaves the position where it was.
        assert_eq!(mirror.position(), (0.5, -0.5));
    }

    #[test]
    fn mirror_logs_every_commanded_move() {
        let mut mirror = MockMirror::default();
        mirror.move_to(1.0, 2.0).unwrap();
        mirror.move_to(3.0, 4.0).unwrap();
        assert_eq!(mirror.move_log(), &[(1.0, 2.0), (3.0, 4.0)]);
    }

    #[test]
    fn counter_follows_the_beam() {
        let mut mirror = MockMirror::default();
        let mut counter = MockCounter::new(mirror.beam()).with_spots([spot_at(1.0, 1.0)]);

        mirror.move_to(1.0, 1.0).unwrap();
        let on_spot = counter.measure(5.0).unwrap();
        mirror.move_to(-5.0, -5.0).unwrap();
        let off_spot = counter.measure(5.0).unwrap();

        assert!((on_spot - 1000.0).abs() < 1e-9);
        assert!(off_spot < 1e-6);
        assert_eq!(counter.reads(), 2);
    }

    #[test]
    fn counter_rejects_nonpositive_integration_window() {
        let mut counter = MockCounter::new(SharedBeam::new());
        assert!(matches!(
            counter.measure(0.0),
            Err(HardwareError::Device(_))
        ));
        assert!(counter.measure(-5.0).is_err());
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let beam = SharedBeam::new();
        let mut a = MockCounter::new(beam.clone())
            .with_background(100.0)
            .with_noise(0.05, 42);
        let mut b = MockCounter::new(beam)
            .with_background(100.0)
            .with_noise(0.05, 42);
        for _ in 0..16 {
            assert_eq!(a.measure(1.0).unwrap(), b.measure(1.0).unwrap());
        }
    }

    #[test]
    fn flaky_detector_faults_on_cue() {
        let mut detector = FlakyDetector::new(2, 7.0);
        assert_eq!(detector.measure(10.0).unwrap(), 7.0);
        assert_eq!(detector.measure(10.0).unwrap(), 7.0);
        assert!(matches!(
            detector.measure(10.0),
            Err(HardwareError::Timeout { .. })
        ));
    }

    #[test]
    fn renderer_counts_frames_and_keeps_bounds() {
        let mut renderer = MockRenderer::new();
        let buffer = ScanBuffer::new(2, 2);
        let request = RenderRequest {
            buffer: &buffer,
            extent: Extent {
                x_min: 0.0,
                x_max: 1.0,
                y_min: 0.0,
                y_max: 1.0,
            },
            color_low: 0.0,
            color_high: 10.0,
            colormap: "gray",
        };
        renderer.render(&request).unwrap();
        renderer.render(&request).unwrap();
        assert_eq!(renderer.renders(), 2);
        assert_eq!(renderer.last_bounds(), Some((0.0, 10.0)));
        assert_eq!(renderer.last_colormap(), Some("gray"));
    }

    #[test]
    fn saved_image_is_a_graymap_of_the_frame() {
        let mut renderer = MockRenderer::new();
        let mut buffer = ScanBuffer::new(2, 2);
        buffer.set(0, 1, 10.0); // top-left of the image
        let request = RenderRequest {
            buffer: &buffer,
            extent: Extent {
                x_min: 0.0,
                x_max: 1.0,
                y_min: 0.0,
                y_max: 1.0,
            },
            color_low: 0.0,
            color_high: 10.0,
            colormap: "gray",
        };
        renderer.render(&request).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.pgm");
        renderer.save_image(&path).unwrap();

        let pgm = fs::read_to_string(&path).unwrap();
        assert_eq!(pgm, "P2\n2 2\n255\n255 0\n0 0\n");
    }

    #[test]
    fn save_before_render_is_a_device_fault() {
        let renderer = MockRenderer::new();
        let result = renderer.save_image(Path::new("/tmp/never-written.pgm"));
        assert!(matches!(result, Err(HardwareError::Device(_))));
    }
}
