//! Hard budgets and abort behaviour of the controller.

use std::time::Duration;

use safety_oracle::adaptive::{
    ControllerConfig, ControllerOutcome, RunOutput, StopReason, WorkloadController,
};
use safety_oracle::measurement::{Clock, NullProbe};
use safety_oracle::{Aborted, Iteration, ManualClock, Recorder};

fn config() -> ControllerConfig {
    ControllerConfig {
        pin_cpu: false,
        ..ControllerConfig::default()
    }
}

fn run<F>(config: ControllerConfig, clock: &ManualClock, workload: F) -> ControllerOutcome
where
    F: FnMut(&mut Iteration<'_>) -> Result<(), Aborted>,
{
    let mut probe = NullProbe;
    let mut recorder = Recorder::new();
    WorkloadController::new(config, clock, &mut probe).run(&mut recorder, workload)
}

fn linear(clock: &ManualClock, ns_per_n: u64) -> impl FnMut(&mut Iteration<'_>) -> Result<(), Aborted> {
    let clock = clock.clone();
    move |iter| {
        clock.advance_nanos(ns_per_n * iter.n());
        Ok(())
    }
}

fn completed(outcome: ControllerOutcome) -> RunOutput {
    match outcome {
        ControllerOutcome::Completed(output) => output,
        ControllerOutcome::Aborted { samples_taken, .. } => {
            panic!("run aborted after {samples_taken} samples")
        }
    }
}

// ============================================================================
// Budgets
// ============================================================================

#[test]
fn sample_budget_is_never_exceeded() {
    for max_n in [1, 7, 1_000, 100_000] {
        let clock = ManualClock::new();
        let output = completed(run(
            ControllerConfig {
                max_n,
                ..config()
            },
            &clock,
            linear(&clock, 10),
        ));
        assert!(output.n_sum() <= max_n, "max_n = {max_n}");
        assert_eq!(output.stop, StopReason::SampleBudget);
    }
}

#[test]
fn sample_budget_filled_exactly_when_tail_fits() {
    let clock = ManualClock::new();
    let output = completed(run(
        ControllerConfig {
            max_n: 1_000,
            ..config()
        },
        &clock,
        linear(&clock, 10),
    ));
    assert_eq!(
        output.series.sizes(),
        vec![1, 2, 4, 8, 16, 32, 64, 128, 256, 489]
    );
    assert_eq!(output.n_sum(), 1_000);
}

#[test]
fn sizes_start_at_one_and_never_decrease() {
    let clock = ManualClock::new();
    let output = completed(run(config(), &clock, linear(&clock, 1_000)));

    let sizes = output.series.sizes();
    assert_eq!(sizes[0], 1);
    assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
    assert!(sizes.windows(2).all(|w| w[1] <= 2 * w[0]));
}

#[test]
fn time_budget_overshoots_by_at_most_one_sample() {
    let budget = Duration::from_millis(10);
    let clock = ManualClock::new();
    let output = completed(run(
        ControllerConfig {
            time_budget: budget,
            ..config()
        },
        &clock,
        linear(&clock, 1_000),
    ));

    assert_eq!(output.stop, StopReason::TimeBudget);
    assert!(output.n_sum() < 100_000);
    let last = output.series.last().map(|s| s.elapsed).unwrap_or_default();
    assert!(output.elapsed < budget + last);
    assert_eq!(output.elapsed, clock.now());
}

#[test]
fn stalled_clock_never_binds_time() {
    // A workload too cheap to register leaves only the sample budget.
    let clock = ManualClock::new();
    let output = completed(run(config(), &clock, |_| Ok(())));
    assert_eq!(output.stop, StopReason::SampleBudget);
    assert_eq!(output.n_sum(), 100_000);
}

// ============================================================================
// Aborts
// ============================================================================

#[test]
fn workload_abort_discards_series() {
    let clock = ManualClock::new();
    let outcome = run(config(), &clock, |iter| {
        if iter.n() == 8 {
            return Err(iter.fatal("fixture exhausted"));
        }
        Ok(())
    });

    match outcome {
        ControllerOutcome::Aborted { samples_taken, .. } => assert_eq!(samples_taken, 3),
        ControllerOutcome::Completed(_) => panic!("expected an abort"),
    }
}

#[test]
fn sink_failure_aborts_after_call() {
    let clock = ManualClock::new();
    let mut calls = 0;
    let outcome = run(config(), &clock, |iter| {
        calls += 1;
        if iter.n() == 4 {
            iter.error("unexpected state");
        }
        Ok(())
    });

    assert!(outcome.is_aborted());
    assert_eq!(calls, 3);
}
