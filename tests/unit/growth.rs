//! Properties of the growth analysis.

use std::time::Duration;

use safety_oracle::adaptive::{RunSeries, Sample};
use safety_oracle::analysis::{dangerous_growth, setup_cost, GrowthAnalyzer};

fn doublings(count: u32) -> Vec<u64> {
    (0..count).map(|i| 1u64 << i).collect()
}

fn series(sizes: &[u64], cost: impl Fn(u64) -> u64) -> RunSeries {
    let mut series = RunSeries::new();
    for &n in sizes {
        series.push(Sample {
            n,
            elapsed: Duration::from_nanos(cost(n)),
            measured_alloc_bytes: 0,
            declared_alloc_bytes: 0,
            declared_steps: n,
        });
    }
    series
}

fn ceil_log2(n: u64) -> u64 {
    u64::from(n.next_power_of_two().trailing_zeros())
}

#[test]
fn analyzer_over_run_series() {
    let sizes = doublings(14);
    let analyzer = GrowthAnalyzer::default();

    assert!(!analyzer.analyze(&series(&sizes, |n| 1000 * n)));
    assert!(!analyzer.analyze(&series(&sizes, |n| 1000 * n + 5_000)));
    assert!(analyzer.analyze(&series(&sizes, |n| n * n)));
}

#[test]
fn setup_cost_does_not_look_like_growth() {
    let sizes = doublings(17);
    let analyzer = GrowthAnalyzer::default();
    for setup in [50_000, 200_000, 1_000_000] {
        assert!(
            !analyzer.analyze(&series(&sizes, |n| 1000 * n + setup)),
            "setup {setup} ns"
        );
    }
}

#[test]
fn n_log_n_flagged() {
    let analyzer = GrowthAnalyzer::default();
    for count in [10, 15, 17] {
        let sizes = doublings(count);
        for c in [1, 10, 100, 1000] {
            assert!(
                analyzer.analyze(&series(&sizes, |n| c * n * ceil_log2(n))),
                "c = {c}, {count} samples"
            );
        }
    }
}

#[test]
fn n_log_n_with_setup_flagged_on_long_runs() {
    let sizes = doublings(17);
    let times = series(&sizes, |n| 1000 * n * ceil_log2(n) + 50_000);
    assert!(GrowthAnalyzer::default().analyze(&times));
}

#[test]
fn tolerance_multiplier_loosens_reference() {
    let sizes = doublings(12);
    // Per-unit cost rises from 4 at the baseline to 11: a factor below three.
    let times = series(&sizes, |n| 100 * n * ceil_log2(n));
    assert!(GrowthAnalyzer::new(1.0).analyze(&times));
    assert!(!GrowthAnalyzer::new(1.5).analyze(&times));
}

#[test]
fn setup_cost_matches_intercept() {
    let sizes = doublings(12);
    let times: Vec<f64> = sizes.iter().map(|&n| 75_000.0 + 250.0 * n as f64).collect();
    assert!((setup_cost(&times, &sizes) - 75_000.0).abs() < 1e-3);
}

#[test]
fn repeated_sizes_never_flag() {
    let sizes = [32, 32, 32, 32];
    assert!(!dangerous_growth(&[40.0, 40.0, 40.0, 40.0], &sizes, 1.0));
}

#[test]
fn empty_series_not_flagged() {
    assert!(!GrowthAnalyzer::default().analyze(&RunSeries::new()));
}
