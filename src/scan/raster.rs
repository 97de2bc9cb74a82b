//! Serpentine grid scanning.
//!
//! ## Traversal
//!
//! The slow axis (x) walks its positions in order. The fast axis (y) runs
//! upward on even x columns and downward on odd ones, so consecutive
//! samples are always one pixel apart and the mirror never flies back
//! across the full field between columns.
//!
//! ## Live View
//!
//! When a renderer is attached, the engine redraws every
//! `live_redraw_every` samples, additionally at the end of each fast-axis
//! column in fast mode, and one final time on every exit path so the
//! display always matches the buffer when `run` returns.

use tracing::info;

use crate::error::ScanResult;
use crate::hardware::{Actuator, Detector, RenderRequest, Renderer};
use crate::model::ScanDataModel;
use crate::scan::{Sample, ScanInterrupt, ScanObserver, TerminationReason};

/// Default redraw cadence, in samples.
pub const DEFAULT_LIVE_REDRAW_EVERY: usize = 10;

/// Default display colormap.
pub const DEFAULT_COLORMAP: &str = "magma";

/// Grid scan engine: serpentine traversal, cooperative cancellation,
/// live-view refresh.
#[derive(Debug, Clone)]
pub struct RasterScanner {
    integration_time_ms: f64,
    fast: bool,
    live_redraw_every: usize,
    colormap: String,
}

impl RasterScanner {
    /// An engine with the given integration window, normal speed, and the
    /// default redraw cadence.
    pub fn new(integration_time_ms: f64) -> Self {
        Self {
            integration_time_ms,
            fast: false,
            live_redraw_every: DEFAULT_LIVE_REDRAW_EVERY,
            colormap: DEFAULT_COLORMAP.to_string(),
        }
    }

    /// Enable fast mode: the live view additionally refreshes at the end
    /// of every fast-axis column.
    pub fn with_fast_scan(mut self, fast: bool) -> Self {
        self.fast = fast;
        self
    }

    /// Redraw the live view every `samples` samples (minimum 1).
    pub fn with_live_redraw_every(mut self, samples: usize) -> Self {
        self.live_redraw_every = samples.max(1);
        self
    }

    /// Colormap name handed to the renderer with every frame.
    pub fn with_colormap(mut self, colormap: impl Into<String>) -> Self {
        self.colormap = colormap.into();
        self
    }

    /// Sweep the model's grid.
    ///
    /// Claims the model for the duration of the scan, visits every cell in
    /// serpentine order, and releases the model on every exit path. Only a
    /// completed sweep parks the beam back at the origin; cancellation and
    /// faults leave it in place. Returns how the scan ended, or the first
    /// device fault encountered.
    pub fn run(
        &self,
        model: &mut ScanDataModel,
        actuator: &mut dyn Actuator,
        detector: &mut dyn Detector,
        renderer: Option<&mut dyn Renderer>,
        observer: &mut dyn ScanObserver,
        interrupt: &ScanInterrupt,
    ) -> ScanResult<TerminationReason> {
        model.begin_scan()?;
        info!(
            nx = model.x_axis().len(),
            ny = model.y_axis().len(),
            integration_time_ms = self.integration_time_ms,
            fast = self.fast,
            "raster scan started"
        );

        let mut renderer = renderer;
        let outcome = self.sweep(model, actuator, detector, &mut renderer, observer, interrupt);
        let final_redraw = refresh(&mut renderer, model, &self.colormap);
        model.finish_scan();

        let reason = outcome?;
        final_redraw?;
        if reason == TerminationReason::Completed {
            actuator.move_to(0.0, 0.0)?;
        }
        info!(%reason, samples = model.data_stream().len(), "raster scan finished");
        Ok(reason)
    }

    fn sweep(
        &self,
        model: &mut ScanDataModel,
        actuator: &mut dyn Actuator,
        detector: &mut dyn Detector,
        renderer: &mut Option<&mut dyn Renderer>,
        observer: &mut dyn ScanObserver,
        interrupt: &ScanInterrupt,
    ) -> ScanResult<TerminationReason> {
        let xs = model.x_axis().values().to_vec();
        let ys = model.y_axis().values().to_vec();
        let ny = ys.len();
        let mut seq = 0usize;

        for (xi, &x) in xs.iter().enumerate() {
            for k in 0..ny {
                let yi = if xi % 2 == 0 { k } else { ny - 1 - k };
                if interrupt.is_requested() {
                    info!(samples = seq, "scan interrupted");
                    return Ok(TerminationReason::Cancelled);
                }
                actuator.move_to(x, ys[yi])?;
                let value = detector.measure(self.integration_time_ms)?;
                model.record_sample(xi, yi, value);
                seq += 1;
                observer.on_sample(&Sample {
                    x_index: xi,
                    y_index: yi,
                    x,
                    y: ys[yi],
                    value,
                    seq,
                });
                if seq % self.live_redraw_every == 0 {
                    refresh(renderer, model, &self.colormap)?;
                }
            }
            if self.fast {
                refresh(renderer, model, &self.colormap)?;
            }
        }
        Ok(TerminationReason::Completed)
    }
}

fn refresh(
    renderer: &mut Option<&mut dyn Renderer>,
    model: &ScanDataModel,
    colormap: &str,
) -> ScanResult<()> {
    if let Some(renderer) = renderer.as_mut() {
        let (color_low, color_high) = model.color_range().bounds();
        renderer.render(&RenderRequest {
            buffer: model.buffer(),
            extent: model.extent(),
            color_low,
            color_high,
            colormap,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisSpec;
    use crate::error::{HardwareError, ScanError};
    use crate::hardware::{FlakyDetector, GaussianSpot, MockCounter, MockMirror, MockRenderer};

    fn model_3x3() -> ScanDataModel {
        let x = AxisSpec::new(0.0, 1.0, 0.5).build().unwrap();
        let y = AxisSpec::new(0.0, 1.0, 0.5).build().unwrap();
        ScanDataModel::new(x, y)
    }

    struct CancelAfter {
        after: usize,
        interrupt: ScanInterrupt,
    }

    impl ScanObserver for CancelAfter {
        fn on_sample(&mut self, sample: &Sample) {
            if sample.seq >= self.after {
                self.interrupt.request_stop();
            }
        }
    }

    #[test]
    fn traversal_is_serpentine_and_parks_at_origin() {
        let mut model = model_3x3();
        let mut mirror = MockMirror::default();
        let mut counter = MockCounter::new(mirror.beam()).with_background(1.0);
        let scanner = RasterScanner::new(1.0);

        let reason = scanner
            .run(
                &mut model,
                &mut mirror,
                &mut counter,
                None,
                &mut (),
                &ScanInterrupt::new(),
            )
            .unwrap();

        assert_eq!(reason, TerminationReason::Completed);
        assert_eq!(
            mirror.move_log(),
            &[
                (0.0, 0.0),
                (0.0, 0.5),
                (0.0, 1.0),
                (0.5, 1.0),
                (0.5, 0.5),
                (0.5, 0.0),
                (1.0, 0.0),
                (1.0, 0.5),
                (1.0, 1.0),
                (0.0, 0.0), // park
            ]
        );
        assert!(!model.is_scanning());
    }

    #[test]
    fn cancellation_freezes_the_sample_prefix() {
        let mut model = model_3x3();
        let mut mirror = MockMirror::default();
        let mut counter = MockCounter::new(mirror.beam()).with_background(2.0);
        let interrupt = ScanInterrupt::new();
        let mut observer = CancelAfter {
            after: 4,
            interrupt: interrupt.clone(),
        };

        let reason = RasterScanner::new(1.0)
            .run(
                &mut model,
                &mut mirror,
                &mut counter,
                None,
                &mut observer,
                &interrupt,
            )
            .unwrap();

        assert_eq!(reason, TerminationReason::Cancelled);
        assert_eq!(model.data_stream().len(), 4);
        // No park: the beam stays at the fourth serpentine position.
        assert_eq!(mirror.move_log().len(), 4);
        assert_eq!(mirror.position(), (0.5, 1.0));
        assert!(!model.is_scanning());
    }

    #[test]
    fn detector_fault_stops_the_scan_and_releases_the_model() {
        let mut model = model_3x3();
        let mut mirror = MockMirror::default();
        let mut detector = FlakyDetector::new(3, 5.0);

        let err = RasterScanner::new(1.0)
            .run(
                &mut model,
                &mut mirror,
                &mut detector,
                None,
                &mut (),
                &ScanInterrupt::new(),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            ScanError::Hardware(HardwareError::Timeout { .. })
        ));
        assert_eq!(model.data_stream().len(), 3);
        assert!(!model.is_scanning());
    }

    #[test]
    fn second_scan_on_a_busy_model_is_refused() {
        let mut model = model_3x3();
        model.begin_scan().unwrap();
        model.record_sample(0, 0, 9.0);

        let mut mirror = MockMirror::default();
        let mut counter = MockCounter::new(mirror.beam());
        let err = RasterScanner::new(1.0)
            .run(
                &mut model,
                &mut mirror,
                &mut counter,
                None,
                &mut (),
                &ScanInterrupt::new(),
            )
            .unwrap_err();

        assert!(matches!(err, ScanError::ConcurrentScan));
        // The running scan's data is untouched and its claim still holds.
        assert_eq!(model.buffer().get(0, 0), 9.0);
        assert!(model.is_scanning());
        assert!(mirror.move_log().is_empty());
    }

    #[test]
    fn redraw_cadence_counts_samples_and_column_ends() {
        let mut mirror = MockMirror::default();
        let mut counter = MockCounter::new(mirror.beam()).with_background(1.0);

        let mut model = model_3x3();
        let mut renderer = MockRenderer::new();
        RasterScanner::new(1.0)
            .with_live_redraw_every(5)
            .run(
                &mut model,
                &mut mirror,
                &mut counter,
                Some(&mut renderer),
                &mut (),
                &ScanInterrupt::new(),
            )
            .unwrap();
        // 9 samples: one cadence redraw at 5, plus the final frame.
        assert_eq!(renderer.renders(), 2);

        let mut model = model_3x3();
        let mut renderer = MockRenderer::new();
        RasterScanner::new(1.0)
            .with_live_redraw_every(5)
            .with_fast_scan(true)
            .run(
                &mut model,
                &mut mirror,
                &mut counter,
                Some(&mut renderer),
                &mut (),
                &ScanInterrupt::new(),
            )
            .unwrap();
        // Fast mode adds one redraw per column.
        assert_eq!(renderer.renders(), 5);
    }

    #[test]
    fn autoscale_matches_the_stream_extremes() {
        let mut model = model_3x3();
        let mut mirror = MockMirror::default();
        let mut counter = MockCounter::new(mirror.beam())
            .with_background(50.0)
            .with_spots([GaussianSpot {
                x: 0.5,
                y: 0.5,
                amplitude: 900.0,
                sigma: 0.3,
            }])
            .with_noise(0.05, 7);

        RasterScanner::new(1.0)
            .run(
                &mut model,
                &mut mirror,
                &mut counter,
                None,
                &mut (),
                &ScanInterrupt::new(),
            )
            .unwrap();

        let min = model.data_stream().iter().copied().fold(f64::INFINITY, f64::min);
        let max = model
            .data_stream()
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(model.color_range().bounds(), (min, max));
    }
}
