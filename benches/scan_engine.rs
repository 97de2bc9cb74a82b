//! Criterion benchmarks for scan engine hot paths.
//!
//! These benchmarks establish baselines for the per-sample sweep overhead
//! and for grid inference, which runs on every custom pattern load.
//!
//! Key metrics:
//! - Sweep throughput (samples/sec) against the mock instrument
//! - Pitch inference and gap-filling latency over growing point lists
//! - Peak search latency over a full frame
//!
//! Run with: cargo bench --bench scan_engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use confocal_daq::axis::AxisSpec;
use confocal_daq::grid::{fill_gaps, infer_pixel_step};
use confocal_daq::hardware::{GaussianSpot, LocalMaxima, MockCounter, MockMirror, PeakFinder};
use confocal_daq::model::{ScanBuffer, ScanDataModel};
use confocal_daq::scan::{RasterScanner, ScanInterrupt};

/// Benchmark a full serpentine sweep over the mock instrument.
///
/// This measures the whole per-sample path: interrupt poll, actuator move,
/// detector read, model bookkeeping, and autoscale update. No renderer is
/// attached, so the numbers reflect the engine itself.
fn raster_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("raster_sweep");

    for (name, n) in [("16x16", 16_usize), ("32x32", 32), ("64x64", 64)] {
        let end = (n - 1) as f64 * 0.01;
        let x_axis = AxisSpec::new(0.0, end, 0.01).build().unwrap();
        let y_axis = AxisSpec::new(0.0, end, 0.01).build().unwrap();
        let interrupt = ScanInterrupt::new();

        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::new("sweep", name), &n, |b, _| {
            b.iter(|| {
                let mut mirror = MockMirror::default();
                let mut counter = MockCounter::new(mirror.beam())
                    .with_background(50.0)
                    .with_spots([GaussianSpot {
                        x: end / 2.0,
                        y: end / 2.0,
                        amplitude: 1000.0,
                        sigma: end / 10.0,
                    }])
                    .with_noise(0.02, 7);
                let mut model = ScanDataModel::new(x_axis.clone(), y_axis.clone());

                let reason = RasterScanner::new(1.0)
                    .run(
                        &mut model,
                        &mut mirror,
                        &mut counter,
                        None,
                        &mut (),
                        &interrupt,
                    )
                    .unwrap();
                black_box(reason);
            });
        });
    }

    group.finish();
}

/// Benchmark pixel-pitch inference over growing coordinate lists.
///
/// Pitch recovery is a GCD reduction over the distinct scaled coordinates;
/// this tracks how it scales with pattern size.
fn pitch_inference(c: &mut Criterion) {
    let mut group = c.benchmark_group("pitch_inference");

    for n in [16_usize, 256, 4096] {
        let coords: Vec<f64> = (0..n).map(|i| i as f64 * 0.005).collect();

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("infer_pixel_step", n), &n, |b, _| {
            b.iter(|| infer_pixel_step(black_box(&coords)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark gap filling on an axis missing every other position.
///
/// Each gap is twice the pitch, so every repair is a single midpoint
/// insertion; the cost is dominated by the in-place vector inserts.
fn gap_filling(c: &mut Criterion) {
    let mut group = c.benchmark_group("gap_filling");

    for n in [64_usize, 512, 2048] {
        let sparse: Vec<f64> = (0..n).map(|i| (2 * i) as f64 * 0.002).collect();

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("fill_gaps", n), &n, |b, _| {
            b.iter(|| {
                let mut axis = sparse.clone();
                fill_gaps(&mut axis, 0.002).unwrap();
                black_box(axis);
            });
        });
    }

    group.finish();
}

/// Benchmark the local-maxima peak search over a synthetic frame.
///
/// The frame carries two bright spots over a structured background, so the
/// search exercises both the neighbor test and suppression.
fn peak_search(c: &mut Criterion) {
    let n = 128_usize;
    let mut buffer = ScanBuffer::new(n, n);
    for xi in 0..n {
        for yi in 0..n {
            let x = xi as f64 * 0.01;
            let y = yi as f64 * 0.01;
            let spots = 100.0 * (-((x - 0.3).powi(2) + (y - 0.4).powi(2)) / 0.0008).exp()
                + 80.0 * (-((x - 0.9).powi(2) + (y - 0.7).powi(2)) / 0.0008).exp();
            let ripple = ((xi * 31 + yi * 17) % 7) as f64;
            buffer.set(xi, yi, 10.0 + spots + ripple);
        }
    }
    let threshold = 2.0 * buffer.mean();
    let finder = LocalMaxima;

    c.bench_function("local_maxima_128x128", |b| {
        b.iter(|| black_box(finder.find_peaks(black_box(&buffer), threshold, 2)));
    });
}

criterion_group!(
    benches,
    raster_sweep,
    pitch_inference,
    gap_filling,
    peak_search
);
criterion_main!(benches);
