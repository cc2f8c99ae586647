//! Main `SafetyOracle` entry point and builder.

use std::time::Duration;

use crate::adaptive::{ControllerConfig, ControllerOutcome, WorkloadController};
use crate::analysis::SafetyVerifier;
use crate::config::Config;
use crate::measurement::{AllocatorProbe, Clock, MemoryProbe, SystemClock};
use crate::preflight::preflight_checks;
use crate::reporter::{Recorder, Reporter};
use crate::result::{Metadata, Outcome, Report, VerificationResult};
use crate::types::SafetyFlags;
use crate::workload::{Aborted, Iteration};

/// Main entry point for verifying a workload's declared costs.
///
/// # Example
///
/// ```ignore
/// use safety_oracle::{Safety, SafetyOracle};
///
/// let report = SafetyOracle::new()
///     .require(Safety::MemSafe)
///     .max_allocs(8)
///     .test(|iter| {
///         let n = iter.n() as usize;
///         let buf = Vec::<u8>::with_capacity(8 * n);
///         iter.ledger().add_allocs(8 * n as u64);
///         iter.keep_alive(buf);
///         Ok(())
///     });
/// assert!(report.passed());
/// ```
pub struct SafetyOracle {
    config: Config,
    clock: Box<dyn Clock>,
    probe: Box<dyn MemoryProbe>,
}

impl Default for SafetyOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SafetyOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyOracle")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SafetyOracle {
    /// Create with default configuration, the system clock and the
    /// allocator probe.
    pub fn new() -> Self {
        Self::from_config(Config::default())
    }

    /// Create with small budgets. See [`Config::quick`].
    pub fn quick() -> Self {
        Self::from_config(Config::quick())
    }

    /// Create with generous budgets. See [`Config::thorough`].
    pub fn thorough() -> Self {
        Self::from_config(Config::thorough())
    }

    /// Create from an explicit configuration.
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            clock: Box::new(SystemClock::new()),
            probe: Box::new(AllocatorProbe::new()),
        }
    }

    /// Require safety flags.
    pub fn require(mut self, flags: impl Into<SafetyFlags>) -> Self {
        self.config = self.config.require_safety(flags);
        self
    }

    /// Set the maximum mean allocations per N.
    pub fn max_allocs(mut self, bytes: u64) -> Self {
        self.config = self.config.max_allocs(bytes);
        self
    }

    /// Set the maximum mean execution steps per N.
    pub fn max_execution_steps(mut self, steps: u64) -> Self {
        self.config = self.config.max_execution_steps(steps);
        self
    }

    /// Set the minimum mean execution steps per N.
    pub fn min_execution_steps(mut self, steps: u64) -> Self {
        self.config = self.config.min_execution_steps(steps);
        self
    }

    /// Set the cap on summed sample size.
    pub fn max_n(mut self, max: u64) -> Self {
        self.config = self.config.max_n(max);
        self
    }

    /// Set the cap on cumulative measured bytes.
    pub fn max_memory_bytes(mut self, bytes: u64) -> Self {
        self.config = self.config.max_memory_bytes(bytes);
        self
    }

    /// Set the wall-clock budget.
    pub fn time_budget(mut self, budget: Duration) -> Self {
        self.config = self.config.time_budget(budget);
        self
    }

    /// Set the spike-rejection reference multiplier.
    pub fn noise_reference_scale(mut self, scale: f64) -> Self {
        self.config = self.config.noise_reference_scale(scale);
        self
    }

    /// Set the growth-analysis tolerance multiplier.
    pub fn growth_reference_scale(mut self, scale: f64) -> Self {
        self.config = self.config.growth_reference_scale(scale);
        self
    }

    /// Enable or disable CPU pinning.
    pub fn pin_cpu(mut self, pin: bool) -> Self {
        self.config = self.config.pin_cpu(pin);
        self
    }

    /// Enable or disable thread priority elevation.
    pub fn elevate_priority(mut self, elevate: bool) -> Self {
        self.config = self.config.elevate_priority(elevate);
        self
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the memory probe.
    pub fn with_probe(mut self, probe: impl MemoryProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Verify `workload` and collect everything into a [`Report`].
    pub fn test<F>(&mut self, workload: F) -> Report
    where
        F: FnMut(&mut Iteration<'_>) -> Result<(), Aborted>,
    {
        let mut recorder = Recorder::new();
        let (result, metadata) = self.run(&mut recorder, workload);

        let outcome = match &result {
            None => Outcome::Aborted,
            Some(r) if r.passed() => Outcome::Pass,
            Some(_) => Outcome::Fail,
        };
        tracing::info!(
            %outcome,
            samples = metadata.samples,
            n_sum = metadata.n_sum,
            "safety verification finished"
        );

        let (errors, logs) = recorder.into_parts();
        Report {
            outcome,
            result: result.unwrap_or_default(),
            metadata,
            errors,
            logs,
        }
    }

    /// Verify `workload`, sending failures and logs to `reporter`.
    ///
    /// Returns `None` when the run was aborted.
    pub fn test_with_reporter<F>(
        &mut self,
        reporter: &mut dyn Reporter,
        workload: F,
    ) -> Option<VerificationResult>
    where
        F: FnMut(&mut Iteration<'_>) -> Result<(), Aborted>,
    {
        self.run(reporter, workload).0
    }

    fn run<F>(
        &mut self,
        reporter: &mut dyn Reporter,
        workload: F,
    ) -> (Option<VerificationResult>, Metadata)
    where
        F: FnMut(&mut Iteration<'_>) -> Result<(), Aborted>,
    {
        let mode = self.config.probe_mode();
        let mut metadata = Metadata::empty(mode);

        if let Err(e) = self.config.validate() {
            reporter.error(&format!("invalid configuration: {e}"));
            return (None, metadata);
        }

        let _run_lock = self.probe.lock_run();
        let probe_active = self.probe.is_active();
        for warning in preflight_checks(&self.config, probe_active) {
            reporter.log(&warning.description());
        }

        let mut controller = WorkloadController::new(
            ControllerConfig::from_config(&self.config),
            self.clock.as_ref(),
            self.probe.as_mut(),
        );
        let output = match controller.run(reporter, workload) {
            ControllerOutcome::Completed(output) => output,
            ControllerOutcome::Aborted {
                samples_taken,
                elapsed,
            } => {
                metadata.samples = samples_taken;
                metadata.elapsed = elapsed;
                metadata.probe_active = probe_active;
                return (None, metadata);
            }
        };

        metadata = Metadata {
            samples: output.series.len(),
            n_sum: output.n_sum(),
            elapsed: output.elapsed,
            probe_mode: mode,
            probe_active: output.probe_active,
            pinned: output.pinned,
        };
        reporter.log(&format!(
            "{} samples, N total {}, {}",
            metadata.samples, metadata.n_sum, output.stop
        ));

        let result = SafetyVerifier::new(&self.config).verify_run(&output, reporter);
        (Some(result), metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::{ManualClock, NullProbe};
    use crate::types::Safety;

    fn oracle() -> SafetyOracle {
        SafetyOracle::new()
            .pin_cpu(false)
            .max_n(1_000)
            .with_clock(ManualClock::new())
            .with_probe(NullProbe)
    }

    #[test]
    fn test_steps_within_bounds_pass() {
        let report = oracle()
            .min_execution_steps(2)
            .max_execution_steps(2)
            .test(|iter| {
                let n = iter.n();
                iter.ledger().add_steps(2 * n);
                Ok(())
            });
        assert!(report.passed(), "{:?}", report.errors);
        assert_eq!(report.result.mean_execution_steps_per_n, 2);
        assert!(report.metadata.n_sum <= 1_000);
        assert!(!report.metadata.probe_active);
    }

    #[test]
    fn test_steps_above_max_fail() {
        let report = oracle().max_execution_steps(1).test(|iter| {
            let n = iter.n();
            iter.ledger().add_steps(3 * n);
            Ok(())
        });
        assert_eq!(report.outcome, Outcome::Fail);
        assert!(report.has_failure("execution steps are above maximum"));
    }

    #[test]
    fn test_abort_yields_empty_result() {
        let report = oracle().test(|iter| {
            if iter.n() >= 4 {
                return Err(iter.fatal("cannot continue"));
            }
            Ok(())
        });
        assert_eq!(report.outcome, Outcome::Aborted);
        assert_eq!(report.result, VerificationResult::default());
        assert_eq!(report.errors, vec!["cannot continue".to_string()]);
        assert_eq!(report.metadata.samples, 2);
    }

    #[test]
    fn test_invalid_config_aborts() {
        let mut config = Config::default();
        config.max_memory_bytes = 0;
        let report = SafetyOracle::from_config(config)
            .with_probe(NullProbe)
            .test(|_| Ok(()));
        assert_eq!(report.outcome, Outcome::Aborted);
        assert!(report.has_failure("max_memory_bytes must be positive"));
    }

    #[test]
    fn test_custom_reporter_sees_failures() {
        let mut rec = Recorder::new();
        let result = oracle()
            .max_execution_steps(0)
            .test_with_reporter(&mut rec, |iter| {
                let n = iter.n();
                iter.ledger().add_steps(n);
                Ok(())
            });
        let result = result.unwrap();
        assert!(!result.passed());
        assert!(rec.failed());
    }

    #[test]
    fn test_already_failed_reporter_aborts() {
        let mut rec = Recorder::new();
        rec.error("earlier failure");
        let result = oracle().test_with_reporter(&mut rec, |_| Ok(()));
        assert!(result.is_none());
    }

    #[test]
    fn test_inactive_probe_logged() {
        let report = oracle().require(Safety::MemSafe).test(|_| Ok(()));
        assert!(report.passed());
        assert!(report
            .logs
            .iter()
            .any(|l| l.contains("memory probe is inactive")));
    }
}
