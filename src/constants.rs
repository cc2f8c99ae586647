//! Default budgets and fixed filter coefficients.

use std::time::Duration;

/// Default cap on the summed sample size across one run.
pub const DEFAULT_MAX_N: u64 = 100_000;

/// Default cap on cumulative measured bytes across one run (200 MiB).
pub const DEFAULT_MAX_MEMORY_BYTES: u64 = 200 * (1 << 20);

/// Default wall-clock budget for one run.
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(1);

/// Numerator coefficients of the smoothing filter.
///
/// Second-order Butterworth low-pass at a quarter of the Nyquist rate,
/// normalised so that `A` below omits the leading 1.
pub const FILTER_B: [f64; 3] = [
    0.097_631_072_937_817_49,
    0.195_262_145_875_634_98,
    0.097_631_072_937_817_49,
];

/// Denominator coefficients of the smoothing filter (leading 1 implied).
pub const FILTER_A: [f64; 2] = [-0.942_809_041_582_063_2, 0.333_333_333_333_333_3];

/// Samples reflected at each boundary before filtering.
pub const FILTER_PAD: usize = 6;

/// Shortest series the filter will smooth; shorter input passes through.
pub const FILTER_MIN_LEN: usize = FILTER_PAD + 1;

/// Factor by which smoothed per-unit cost may rise above its lowest earlier
/// value before the growth analysis flags it.
pub const GROWTH_TOLERANCE: f64 = 2.0;

/// Smallest sample size whose per-unit cost may serve as the growth
/// baseline. Below it, timer resolution dominates the reading.
pub const GROWTH_ANCHOR_MIN_N: u64 = 16;
