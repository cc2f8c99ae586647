//! The adaptive sampling loop.
//!
//! Each pass of the loop:
//! 1. Picks the next sample size from the budgets left and the last sample
//! 2. Snapshots the ledger and keep-alive tracker, reads the probe
//! 3. Times one call of the workload, reads the probe again
//! 4. Retries once if the call looks like a scheduling spike
//! 5. Appends the sample to the series
//!
//! The loop ends when a hard budget runs out, or aborts when the workload
//! asks it to or the reporting sink has recorded a failure.

use std::time::Duration;

use crate::adaptive::{RunSeries, Sample};
use crate::analysis::log_reference;
use crate::config::Config;
use crate::measurement::{
    AffinityGuard, AffinityResult, Clock, KeepAlive, KeepAliveMark, MemoryProbe, ProbeMode,
};
use crate::reporter::Reporter;
use crate::workload::{Aborted, Iteration, Ledger};

/// Budgets and knobs for one controller run.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Cap on the summed sample size.
    pub max_n: u64,
    /// Cap on cumulative measured bytes.
    pub max_memory_bytes: u64,
    /// Wall-clock budget.
    pub time_budget: Duration,
    /// How the probe is read.
    pub probe_mode: ProbeMode,
    /// Multiplier on the spike reference curve.
    pub noise_reference_scale: f64,
    /// Pin the thread for the duration of the loop.
    pub pin_cpu: bool,
    /// Raise thread priority for the duration of the loop.
    pub elevate_priority: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ControllerConfig {
    /// Derive controller settings from a run configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_n: config.max_n,
            max_memory_bytes: config.max_memory_bytes,
            time_budget: config.time_budget,
            probe_mode: config.probe_mode(),
            noise_reference_scale: config.noise_reference_scale,
            pin_cpu: config.pin_cpu,
            elevate_priority: config.elevate_priority,
        }
    }
}

/// Which budget ended the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Summed sample size reached the cap.
    SampleBudget,
    /// Measured bytes reached the cap.
    MemoryBudget,
    /// Wall-clock budget used up.
    TimeBudget,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::SampleBudget => write!(f, "sample budget exhausted"),
            StopReason::MemoryBudget => write!(f, "memory budget exhausted"),
            StopReason::TimeBudget => write!(f, "time budget exhausted"),
        }
    }
}

/// Everything a completed loop hands to verification.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Retained samples.
    pub series: RunSeries,
    /// Measured bytes net of tracker overhead, floored at zero.
    pub alloc_sum: u64,
    /// Final ledger.
    pub ledger: Ledger,
    /// Tracker overhead removed from `alloc_sum`.
    pub tracker_overhead: u64,
    /// Whether the probe reported real allocations.
    pub probe_active: bool,
    /// Whether the thread was pinned.
    pub pinned: bool,
    /// Wall time of the whole loop.
    pub elapsed: Duration,
    /// Why the loop ended.
    pub stop: StopReason,
}

impl RunOutput {
    /// Sum of retained sample sizes.
    pub fn n_sum(&self) -> u64 {
        self.series.n_sum()
    }
}

/// Result of a controller run.
#[derive(Debug, Clone)]
pub enum ControllerOutcome {
    /// A budget ran out; the series is ready for verification.
    Completed(RunOutput),
    /// The workload or the sink stopped the run. Nothing is verified.
    Aborted {
        /// Samples retained before the abort.
        samples_taken: usize,
        /// Wall time until the abort.
        elapsed: Duration,
    },
}

impl ControllerOutcome {
    /// Output of a completed run.
    pub fn completed(self) -> Option<RunOutput> {
        match self {
            ControllerOutcome::Completed(output) => Some(output),
            ControllerOutcome::Aborted { .. } => None,
        }
    }

    /// Whether the run was aborted.
    pub fn is_aborted(&self) -> bool {
        matches!(self, ControllerOutcome::Aborted { .. })
    }
}

/// Drives a workload through growing sample sizes.
pub struct WorkloadController<'a> {
    config: ControllerConfig,
    clock: &'a dyn Clock,
    probe: &'a mut dyn MemoryProbe,
}

/// Mutable per-run state shared by the measuring helpers.
struct RunState<'r> {
    ledger: Ledger,
    keep_alive: KeepAlive,
    reporter: &'r mut dyn Reporter,
}

/// Ledger and tracker position before a call.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    ledger: Ledger,
    keep_alive: KeepAliveMark,
}

impl RunState<'_> {
    /// Undo everything a discarded call added to the ledger and tracker.
    fn rollback(&mut self, checkpoint: Checkpoint) {
        self.ledger.restore(checkpoint.ledger);
        self.keep_alive.rollback(checkpoint.keep_alive);
    }
}

impl<'a> WorkloadController<'a> {
    /// Create a controller over the given clock and probe.
    pub fn new(
        config: ControllerConfig,
        clock: &'a dyn Clock,
        probe: &'a mut dyn MemoryProbe,
    ) -> Self {
        Self {
            config,
            clock,
            probe,
        }
    }

    /// Run the loop to completion or abort.
    pub fn run<F>(&mut self, reporter: &mut dyn Reporter, mut workload: F) -> ControllerOutcome
    where
        F: FnMut(&mut Iteration<'_>) -> Result<(), Aborted>,
    {
        let start = self.clock.now();
        let probe_active = self.probe.is_active();

        let pin = self.config.pin_cpu.then(AffinityGuard::try_pin);
        let pinned = matches!(pin, Some(AffinityResult::Pinned(_)));
        if let Some(AffinityResult::NotPinned { reason }) = &pin {
            tracing::debug!("running unpinned: {reason}");
        }
        let _priority = self.elevate_priority();

        let mut state = RunState {
            ledger: Ledger::new(),
            keep_alive: KeepAlive::new(),
            reporter,
        };
        let mut series = RunSeries::new();

        let stop = loop {
            if state.reporter.failed() {
                return self.aborted(&series, start);
            }
            let elapsed = self.clock.now().saturating_sub(start);

            if series.n_sum() >= self.config.max_n {
                break StopReason::SampleBudget;
            }
            if series.measured_sum() >= self.config.max_memory_bytes {
                break StopReason::MemoryBudget;
            }
            if elapsed >= self.config.time_budget {
                break StopReason::TimeBudget;
            }

            let n = match series.last() {
                None => 1,
                Some(prev) => {
                    let next = self.next_n(prev, &series, elapsed);
                    if next < prev.n {
                        tracing::debug!(prev = prev.n, next, "next size below previous, stopping");
                        break self.binding_budget(prev, &series, elapsed);
                    }
                    next
                }
            };

            let (sample, checkpoint) =
                match self.measure(&mut state, &mut workload, n, probe_active) {
                    Ok(measured) => measured,
                    Err(Aborted) => return self.aborted(&series, start),
                };

            let sample = match series.last().and_then(|prev| self.spike_reference(prev, n)) {
                Some(reference) if sample.elapsed_ns() > reference => {
                    if self.retry_fits(start, &sample) {
                        tracing::debug!(
                            n,
                            elapsed_ns = sample.elapsed_ns(),
                            reference,
                            "spike, retrying"
                        );
                        self.retry(
                            &mut state,
                            &mut workload,
                            sample,
                            checkpoint,
                            reference,
                            probe_active,
                        )
                    } else {
                        state.reporter.log(&format!(
                            "spike at N={n} kept without retry: {:.0} ns against a \
                             {:.0} ns reference, no time left to repeat it",
                            sample.elapsed_ns(),
                            reference
                        ));
                        Ok(sample)
                    }
                }
                _ => Ok(sample),
            };
            let sample = match sample {
                Ok(sample) => sample,
                Err(Aborted) => return self.aborted(&series, start),
            };

            tracing::debug!(
                n,
                elapsed_ns = sample.elapsed_ns(),
                measured = sample.measured_alloc_bytes,
                "sample"
            );
            series.push(sample);
        };

        let tracker_overhead = state.keep_alive.overhead();
        let alloc_sum = series.measured_sum().saturating_sub(tracker_overhead);
        let elapsed = self.clock.now().saturating_sub(start);
        tracing::debug!(samples = series.len(), n_sum = series.n_sum(), %stop, "controller finished");

        ControllerOutcome::Completed(RunOutput {
            series,
            alloc_sum,
            ledger: state.ledger,
            tracker_overhead,
            probe_active,
            pinned,
            elapsed,
            stop,
        })
    }

    /// Largest admissible next size, floored at 1.
    fn next_n(&self, prev: &Sample, series: &RunSeries, elapsed: Duration) -> u64 {
        let mut next = prev
            .n
            .saturating_mul(2)
            .min(self.sample_cap(series));
        if let Some(cap) = self.memory_cap(prev, series) {
            next = next.min(cap);
        }
        if let Some(cap) = self.time_cap(prev, elapsed) {
            next = next.min(cap);
        }
        next.max(1)
    }

    fn sample_cap(&self, series: &RunSeries) -> u64 {
        self.config.max_n.saturating_sub(series.n_sum())
    }

    /// Sizes the remaining memory budget admits at the last observed rate.
    fn memory_cap(&self, prev: &Sample, series: &RunSeries) -> Option<u64> {
        let per_n = prev.bytes_per_unit();
        (per_n > 0.0).then(|| {
            let remaining = self
                .config
                .max_memory_bytes
                .saturating_sub(series.measured_sum());
            (remaining as f64 / per_n) as u64
        })
    }

    /// Sizes the remaining time budget admits at the last observed rate.
    fn time_cap(&self, prev: &Sample, elapsed: Duration) -> Option<u64> {
        let per_n = prev.ns_per_unit();
        (per_n > 0.0).then(|| {
            let remaining = self.config.time_budget.saturating_sub(elapsed);
            (remaining.as_nanos() as f64 / per_n) as u64
        })
    }

    /// Budget that stopped growth when the next size fell below the last.
    fn binding_budget(&self, prev: &Sample, series: &RunSeries, elapsed: Duration) -> StopReason {
        if self.sample_cap(series) < prev.n {
            StopReason::SampleBudget
        } else if self.memory_cap(prev, series).is_some_and(|cap| cap < prev.n) {
            StopReason::MemoryBudget
        } else {
            debug_assert!(self.time_cap(prev, elapsed).is_some_and(|cap| cap < prev.n));
            StopReason::TimeBudget
        }
    }

    /// Spike threshold for size `n` following `prev`, in nanoseconds.
    fn spike_reference(&self, prev: &Sample, n: u64) -> Option<f64> {
        log_reference(prev.elapsed_ns(), prev.n, n, self.config.noise_reference_scale)
    }

    /// Whether re-running `sample` at its observed cost stays within the
    /// time budget. A spike that does not fit is kept as measured and
    /// logged to the reporter.
    fn retry_fits(&self, start: Duration, sample: &Sample) -> bool {
        let elapsed = self.clock.now().saturating_sub(start);
        elapsed.saturating_add(sample.elapsed) <= self.config.time_budget
    }

    /// Discard a spiking call and run the same size again.
    ///
    /// A second spike is kept, with the smaller of the two elapsed times.
    fn retry<F>(
        &mut self,
        state: &mut RunState<'_>,
        workload: &mut F,
        first: Sample,
        checkpoint: Checkpoint,
        reference: f64,
        probe_active: bool,
    ) -> Result<Sample, Aborted>
    where
        F: FnMut(&mut Iteration<'_>) -> Result<(), Aborted>,
    {
        state.rollback(checkpoint);
        let (second, _) = self.measure(state, workload, first.n, probe_active)?;
        if second.elapsed_ns() > reference {
            tracing::debug!(n = first.n, "spike repeated, keeping the smaller time");
            Ok(Sample {
                elapsed: first.elapsed.min(second.elapsed),
                ..second
            })
        } else {
            Ok(second)
        }
    }

    /// Time one call of the workload at size `n`.
    fn measure<F>(
        &mut self,
        state: &mut RunState<'_>,
        workload: &mut F,
        n: u64,
        probe_active: bool,
    ) -> Result<(Sample, Checkpoint), Aborted>
    where
        F: FnMut(&mut Iteration<'_>) -> Result<(), Aborted>,
    {
        let checkpoint = Checkpoint {
            ledger: state.ledger,
            keep_alive: state.keep_alive.mark(),
        };
        let mode = self.config.probe_mode;

        let mem_before = self.probe.read(mode);
        let t0 = self.clock.now();
        let result = {
            let mut iter = Iteration::new(
                n,
                &mut state.ledger,
                &mut state.keep_alive,
                &mut *state.reporter,
            );
            workload(&mut iter)
        };
        let t1 = self.clock.now();
        let mem_after = self.probe.read(mode);
        state.keep_alive.clear();

        if result.is_err() || state.reporter.failed() {
            tracing::debug!(n, "workload aborted the run");
            return Err(Aborted);
        }

        let sample = Sample {
            n,
            elapsed: t1.saturating_sub(t0),
            measured_alloc_bytes: if probe_active {
                mem_after.saturating_sub(mem_before)
            } else {
                0
            },
            declared_alloc_bytes: state.ledger.allocs() - checkpoint.ledger.allocs(),
            declared_steps: state.ledger.steps() - checkpoint.ledger.steps(),
        };
        Ok((sample, checkpoint))
    }

    #[cfg(feature = "thread-priority")]
    fn elevate_priority(&self) -> Option<crate::measurement::priority::PriorityResult> {
        self.config
            .elevate_priority
            .then(crate::measurement::priority::PriorityGuard::try_elevate)
    }

    #[cfg(not(feature = "thread-priority"))]
    fn elevate_priority(&self) -> Option<()> {
        None
    }

    fn aborted(&self, series: &RunSeries, start: Duration) -> ControllerOutcome {
        let elapsed = self.clock.now().saturating_sub(start);
        tracing::debug!(samples = series.len(), "controller aborted");
        ControllerOutcome::Aborted {
            samples_taken: series.len(),
            elapsed,
        }
    }
}
