//! Grid local-maxima search with non-maximum suppression.

use crate::hardware::capabilities::PeakFinder;
use crate::model::ScanBuffer;

/// Peak finder over the raw measurement grid.
///
/// A cell qualifies as a candidate when its value is strictly above the
/// threshold and no 8-neighbor exceeds it (ties survive, so plateau edges
/// qualify too). Candidates are then visited strongest-first and each
/// accepted peak suppresses every weaker candidate within `min_separation`
/// cells on both axes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalMaxima;

impl PeakFinder for LocalMaxima {
    fn find_peaks(
        &self,
        buffer: &ScanBuffer,
        threshold_abs: f64,
        min_separation: usize,
    ) -> Vec<(usize, usize)> {
        let (nx, ny) = buffer.dims();
        let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
        for xi in 0..nx {
            for yi in 0..ny {
                let value = buffer.get(xi, yi);
                if value > threshold_abs && is_local_max(buffer, xi, yi, value) {
                    candidates.push((xi, yi, value));
                }
            }
        }

        // Strongest first; index order breaks ties so output is stable.
        candidates.sort_by(|a, b| {
            b.2.total_cmp(&a.2)
                .then(a.0.cmp(&b.0))
                .then(a.1.cmp(&b.1))
        });

        let mut peaks: Vec<(usize, usize)> = Vec::new();
        for (xi, yi, _) in candidates {
            let suppressed = peaks.iter().any(|&(px, py)| {
                px.abs_diff(xi) <= min_separation && py.abs_diff(yi) <= min_separation
            });
            if !suppressed {
                peaks.push((xi, yi));
            }
        }
        peaks
    }
}

fn is_local_max(buffer: &ScanBuffer, xi: usize, yi: usize, value: f64) -> bool {
    let (nx, ny) = buffer.dims();
    let x_lo = xi.saturating_sub(1);
    let y_lo = yi.saturating_sub(1);
    let x_hi = (xi + 1).min(nx - 1);
    let y_hi = (yi + 1).min(ny - 1);
    for nxi in x_lo..=x_hi {
        for nyi in y_lo..=y_hi {
            if (nxi, nyi) != (xi, yi) && buffer.get(nxi, nyi) > value {
                return false;
            }
        }
    }
    true
}
