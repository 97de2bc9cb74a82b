//! Point-sequence scanning.
//!
//! Visits the points of a [`TargetPointList`](crate::points::TargetPointList)
//! in list order. [`SequenceMode::Once`] is a measuring acquisition: every
//! value lands in the model's buffer and the finished pass is filed under a
//! fresh sub-scan number. [`SequenceMode::Loop`] is a repositioning pass
//! that cycles the list until interrupted, keeping only the most recent
//! reading for live display.

use tracing::info;

use crate::error::ScanResult;
use crate::hardware::{Actuator, Detector};
use crate::model::PointScanModel;
use crate::scan::{PointSample, ScanInterrupt, ScanObserver, TerminationReason};

/// How a point sequence is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMode {
    /// One measuring pass over the list.
    Once,
    /// Cycle the list until interrupted, without accumulating data.
    Loop,
}

/// Point-sequence scan engine.
#[derive(Debug, Clone)]
pub struct PointSequenceScanner {
    integration_time_ms: f64,
    mode: SequenceMode,
}

impl PointSequenceScanner {
    /// An engine with the given integration window and traversal mode.
    pub fn new(integration_time_ms: f64, mode: SequenceMode) -> Self {
        Self {
            integration_time_ms,
            mode,
        }
    }

    /// Drive the model's target list.
    ///
    /// In `Once` mode a completed or cancelled pass is stored under its
    /// sub-scan number (a cancelled pass keeps the prefix measured so far);
    /// a device fault stores nothing, though the number stays consumed. In
    /// `Loop` mode the normal exit is cancellation, and an empty list
    /// completes immediately instead of spinning.
    pub fn run(
        &self,
        model: &mut PointScanModel,
        actuator: &mut dyn Actuator,
        detector: &mut dyn Detector,
        observer: &mut dyn ScanObserver,
        interrupt: &ScanInterrupt,
    ) -> ScanResult<TerminationReason> {
        match self.mode {
            SequenceMode::Once => self.run_once(model, actuator, detector, observer, interrupt),
            SequenceMode::Loop => self.run_loop(model, actuator, detector, observer, interrupt),
        }
    }

    fn run_once(
        &self,
        model: &mut PointScanModel,
        actuator: &mut dyn Actuator,
        detector: &mut dyn Detector,
        observer: &mut dyn ScanObserver,
        interrupt: &ScanInterrupt,
    ) -> ScanResult<TerminationReason> {
        let scan_num = model.begin_acquisition()?;
        info!(scan_num, points = model.points().len(), "point acquisition started");

        let targets: Vec<(f64, f64)> = model.points().points().to_vec();
        let outcome: ScanResult<TerminationReason> = (|| {
            for (index, (x, y)) in targets.iter().copied().enumerate() {
                if interrupt.is_requested() {
                    info!(scan_num, visited = index, "point acquisition interrupted");
                    return Ok(TerminationReason::Cancelled);
                }
                actuator.move_to(x, y)?;
                let value = detector.measure(self.integration_time_ms)?;
                model.record_point(index, value);
                observer.on_point(&PointSample { index, x, y, value });
            }
            Ok(TerminationReason::Completed)
        })();

        model.finish_scan();
        let reason = outcome?;
        model.store_acquisition(scan_num);
        info!(scan_num, %reason, "point acquisition stored");
        Ok(reason)
    }

    fn run_loop(
        &self,
        model: &mut PointScanModel,
        actuator: &mut dyn Actuator,
        detector: &mut dyn Detector,
        observer: &mut dyn ScanObserver,
        interrupt: &ScanInterrupt,
    ) -> ScanResult<TerminationReason> {
        model.begin_positioning()?;
        if model.points().is_empty() {
            model.finish_scan();
            return Ok(TerminationReason::Completed);
        }
        info!(points = model.points().len(), "positioning loop started");

        let targets: Vec<(f64, f64)> = model.points().points().to_vec();
        let outcome: ScanResult<TerminationReason> = (|| loop {
            for (index, (x, y)) in targets.iter().copied().enumerate() {
                if interrupt.is_requested() {
                    return Ok(TerminationReason::Cancelled);
                }
                actuator.move_to(x, y)?;
                let value = detector.measure(self.integration_time_ms)?;
                model.note_position(index, value);
                observer.on_point(&PointSample { index, x, y, value });
            }
        })();

        model.finish_scan();
        let reason = outcome?;
        info!(%reason, "positioning loop finished");
        Ok(reason)
    }
}
