//! Detection of execution time growing faster than declared.
//!
//! A workload whose cost is linear in its declared steps spends a constant
//! time per unit of work once a fixed per-call setup cost is taken out.
//! Anything that makes the per-unit cost climb (a hidden loop, a sort, a
//! quadratic scan) is CPU work the workload did not declare.
//!
//! The analysis runs in three stages:
//!
//! 1. **Setup removal.** A line `a + b·N` is fitted to the elapsed times,
//!    weighting every sample by its relative error so the small sizes pin
//!    down the intercept. The intercept, clamped to `[0, min elapsed]`, is
//!    the setup cost and is subtracted from every sample.
//! 2. **Smoothing.** The remaining time per unit is passed through
//!    [`batch_filter`]. With the setup cost gone there is no steep edge at
//!    small N for the filter to ring on.
//! 3. **Flat reference.** Every smoothed value is compared with the lowest
//!    earlier value taken at a trustworthy size. A rise by more than
//!    [`GROWTH_TOLERANCE`] times that baseline (scaled by the configured
//!    multiplier) flags the run.
//!
//! A baseline is trustworthy when `N >= GROWTH_ANCHOR_MIN_N` and the work
//! in the sample at least matches the setup cost. Below either bound the
//! per-unit reading is mostly timer resolution or fitting error.
//!
//! # Sensitivity
//!
//! Per-unit cost of `N·log N` work grows with `log N`, so it doubles once
//! the run reaches the square of the baseline size. Any run long enough to
//! cover that range flags it. Quadratic and `N^1.5` cost cross the
//! reference within a few doublings.
//!
//! # Example
//!
//! ```
//! use safety_oracle::analysis::dangerous_growth;
//!
//! let sizes: Vec<u64> = (0..12).map(|i| 1 << i).collect();
//! let linear: Vec<f64> = sizes.iter().map(|&n| 50_000.0 + 1_000.0 * n as f64).collect();
//! let n_log_n: Vec<f64> = sizes
//!     .iter()
//!     .map(|&n| n as f64 * (n as f64).log2())
//!     .collect();
//!
//! assert!(!dangerous_growth(&linear, &sizes, 1.0));
//! assert!(dangerous_growth(&n_log_n, &sizes, 1.0));
//! ```
//!
//! [`GROWTH_TOLERANCE`]: crate::constants::GROWTH_TOLERANCE
//! [`batch_filter`]: crate::analysis::batch_filter

use crate::adaptive::RunSeries;
use crate::analysis::batch_filter;
use crate::constants::{GROWTH_ANCHOR_MIN_N, GROWTH_TOLERANCE};

/// Reference for a value following `prev` at size `prev_n`, at size `n`.
///
/// Returns `prev × log(n)/log(prev_n) × scale`, or `None` when
/// `prev_n <= 1` (the log ratio is undefined there). The controller uses
/// it on raw elapsed times to spot scheduling spikes.
pub fn log_reference(prev: f64, prev_n: u64, n: u64, scale: f64) -> Option<f64> {
    if prev_n <= 1 || n == 0 {
        return None;
    }
    Some(prev * (n as f64).ln() / (prev_n as f64).ln() * scale)
}

/// Fixed per-call cost of a series, in the units of `elapsed`.
///
/// Intercept of the line `a + b·N` fitted by least squares with weights
/// `1 / elapsed²`, clamped to `[0, min elapsed]`. Samples with no elapsed
/// time carry no information and are skipped; fewer than two distinct
/// sizes give zero.
pub fn setup_cost(elapsed: &[f64], sizes: &[u64]) -> f64 {
    debug_assert_eq!(elapsed.len(), sizes.len());

    let (mut s, mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let mut first_n = None;
    let mut distinct = false;
    for (&t, &n) in elapsed.iter().zip(sizes) {
        if t <= 0.0 || !t.is_finite() {
            continue;
        }
        match first_n {
            None => first_n = Some(n),
            Some(first) => distinct |= first != n,
        }

        let (x, w) = (n as f64, 1.0 / (t * t));
        s += w;
        sx += w * x;
        sy += w * t;
        sxx += w * x * x;
        sxy += w * x * t;
    }
    if !distinct {
        return 0.0;
    }

    let det = s * sxx - sx * sx;
    if det <= 0.0 {
        return 0.0;
    }
    let intercept = (sxx * sy - sx * sxy) / det;
    let floor = elapsed.iter().copied().fold(f64::INFINITY, f64::min);
    intercept.clamp(0.0, floor.max(0.0))
}

/// Whether a smoothed per-unit series rises above its flat reference.
///
/// `anchors[i]` marks the values allowed to serve as the baseline. Value
/// `i` is flagged when it exceeds `GROWTH_TOLERANCE × scale` times the
/// lowest positive anchor before it.
pub fn exceeds_reference(filtered: &[f64], anchors: &[bool], scale: f64) -> bool {
    debug_assert_eq!(filtered.len(), anchors.len());
    let limit = GROWTH_TOLERANCE * scale;

    let mut baseline: Option<f64> = None;
    for (&value, &anchor) in filtered.iter().zip(anchors) {
        if baseline.is_some_and(|base| value > base * limit) {
            return true;
        }
        if anchor && value > 0.0 {
            baseline = Some(baseline.map_or(value, |base| base.min(value)));
        }
    }
    false
}

/// Flag dangerous growth in raw elapsed times taken at the given sizes.
pub fn dangerous_growth(elapsed: &[f64], sizes: &[u64], scale: f64) -> bool {
    let setup = setup_cost(elapsed, sizes);
    let per_unit: Vec<f64> = elapsed
        .iter()
        .zip(sizes)
        .map(|(&t, &n)| (t - setup).max(0.0) / n.max(1) as f64)
        .collect();
    let anchors: Vec<bool> = elapsed
        .iter()
        .zip(sizes)
        .map(|(&t, &n)| n >= GROWTH_ANCHOR_MIN_N && t - setup >= setup)
        .collect();
    exceeds_reference(&batch_filter(&per_unit), &anchors, scale)
}

/// Growth analysis over a run's samples.
#[derive(Debug, Clone, Copy)]
pub struct GrowthAnalyzer {
    scale: f64,
}

impl Default for GrowthAnalyzer {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl GrowthAnalyzer {
    /// Analyzer with the given tolerance multiplier.
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    /// Whether the series shows undeclared CPU growth.
    pub fn analyze(&self, series: &RunSeries) -> bool {
        let flagged = dangerous_growth(&series.elapsed_ns(), &series.sizes(), self.scale);
        if flagged {
            tracing::debug!(samples = series.len(), "dangerous growth detected");
        }
        flagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doublings(count: u32) -> Vec<u64> {
        (0..count).map(|i| 1u64 << i).collect()
    }

    fn costs(sizes: &[u64], cost: impl Fn(f64) -> f64) -> Vec<f64> {
        sizes.iter().map(|&n| cost(n as f64)).collect()
    }

    #[test]
    fn test_reference_undefined_at_one() {
        assert_eq!(log_reference(10.0, 1, 2, 1.0), None);
        assert_eq!(log_reference(10.0, 0, 2, 1.0), None);
        let r = log_reference(10.0, 4, 16, 1.0).unwrap();
        assert!((r - 20.0).abs() < 1e-9);
        let r = log_reference(10.0, 4, 16, 1.5).unwrap();
        assert!((r - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_setup_cost_recovered() {
        let sizes = doublings(14);
        for setup in [0.0, 5_000.0, 50_000.0, 1_000_000.0] {
            let times = costs(&sizes, |n| setup + 1_000.0 * n);
            let fitted = setup_cost(&times, &sizes);
            assert!((fitted - setup).abs() < 1e-6 * setup.max(1.0), "{fitted} vs {setup}");
        }
    }

    #[test]
    fn test_setup_cost_clamped() {
        let sizes = doublings(12);
        // Convex cost fits a negative intercept.
        let quadratic = costs(&sizes, |n| n * n);
        assert_eq!(setup_cost(&quadratic, &sizes), 0.0);

        assert_eq!(setup_cost(&[0.0, 0.0, 0.0], &[1, 2, 4]), 0.0);
        assert_eq!(setup_cost(&[5.0, 5.0], &[4, 4]), 0.0);
    }

    #[test]
    fn test_flat_reference() {
        let anchors = [true; 5];
        assert!(!exceeds_reference(&[4.0, 3.0, 5.0, 6.0, 6.0], &anchors, 1.0));
        assert!(exceeds_reference(&[4.0, 3.0, 5.0, 6.0, 6.5], &anchors, 1.0));
        assert!(!exceeds_reference(&[4.0, 3.0, 5.0, 6.0, 6.5], &anchors, 1.5));
    }

    #[test]
    fn test_only_anchors_set_baseline() {
        let values = [1.0, 10.0, 19.0];
        assert!(exceeds_reference(&values, &[true, true, true], 1.0));
        assert!(!exceeds_reference(&values, &[false, true, true], 1.0));
        assert!(!exceeds_reference(&values, &[false, false, false], 1.0));
    }

    #[test]
    fn test_linear_with_setup_not_flagged() {
        let sizes = doublings(17);
        for setup in [0.0, 5_000.0, 50_000.0, 200_000.0, 1_000_000.0] {
            let times = costs(&sizes, |n| setup + 1_000.0 * n);
            assert!(!dangerous_growth(&times, &sizes, 1.0), "setup {setup}");
        }
    }

    #[test]
    fn test_superlinear_flagged() {
        let sizes = doublings(17);
        assert!(dangerous_growth(&costs(&sizes, |n| n * n), &sizes, 1.0));
        assert!(dangerous_growth(&costs(&sizes, |n| n.powf(1.5)), &sizes, 1.0));
        assert!(dangerous_growth(
            &costs(&sizes, |n| 10.0 * n * n.log2().ceil()),
            &sizes,
            1.0
        ));
    }

    #[test]
    fn test_short_series_cannot_anchor() {
        // Nothing reaches the baseline size.
        let sizes = [1, 2, 4, 8];
        assert!(!dangerous_growth(&[1.0, 4.0, 16.0, 64.0], &sizes, 1.0));
    }

    #[test]
    fn test_empty_and_single() {
        assert!(!dangerous_growth(&[], &[], 1.0));
        assert!(!dangerous_growth(&[5.0], &[1], 1.0));
    }
}
