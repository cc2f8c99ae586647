//! Cross-checking measurements against declarations and thresholds.
//!
//! Verification works on run totals, not on individual samples. Every
//! total is divided by the summed sample size and rounded to the nearest
//! integer, so a workload is judged by its mean cost per unit of `N`.
//!
//! The checks are independent and all of them run:
//!
//! - **Measured maximum**: mean measured bytes against `max_allocs`.
//! - **Declared maximum**: mean declared bytes against `max_allocs`, under
//!   `MemSafe`.
//! - **Honest declaration**: measured total against declared total, under
//!   `MemSafe`. An excess below half a byte per unit is tolerated since it
//!   rounds away in the means.
//! - **Step bounds**: mean declared steps against `max_execution_steps`
//!   and `min_execution_steps`.
//! - **CPU growth**: under `CPUSafe` with no step maximum, the growth flag
//!   from [`GrowthAnalyzer`] fails the run.
//!
//! Measured checks are skipped when the memory probe was inactive.
//!
//! # Example
//!
//! ```
//! use safety_oracle::analysis::{Aggregates, SafetyVerifier};
//! use safety_oracle::{Config, Recorder, Safety};
//!
//! let config = Config::new().require_safety(Safety::MemSafe);
//! let totals = Aggregates {
//!     n_sum: 100,
//!     measured_allocs: 800,
//!     declared_allocs: 0,
//!     declared_steps: 0,
//!     probe_active: true,
//! };
//!
//! let mut recorder = Recorder::new();
//! let result = SafetyVerifier::new(&config).verify(&totals, false, &mut recorder);
//! assert!(!result.passed());
//! assert_eq!(result.mean_measured_allocs_per_n, 8);
//! assert!(recorder.failures()[0].starts_with("measured memory above declared"));
//! ```

use crate::adaptive::RunOutput;
use crate::analysis::GrowthAnalyzer;
use crate::config::Config;
use crate::reporter::Reporter;
use crate::result::{VerificationResult, Violation};
use crate::types::Safety;

/// Totals a verification works from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aggregates {
    /// Sum of retained sample sizes.
    pub n_sum: u64,
    /// Measured bytes, net of tracker overhead.
    pub measured_allocs: u64,
    /// Declared bytes.
    pub declared_allocs: u64,
    /// Declared steps.
    pub declared_steps: u64,
    /// Whether `measured_allocs` reflects real allocations.
    pub probe_active: bool,
}

impl Aggregates {
    /// Totals of a completed controller run.
    pub fn from_run(output: &RunOutput) -> Self {
        Self {
            n_sum: output.n_sum(),
            measured_allocs: output.alloc_sum,
            declared_allocs: output.ledger.allocs(),
            declared_steps: output.ledger.steps(),
            probe_active: output.probe_active,
        }
    }
}

/// `total / n_sum`, rounded to nearest. Zero when `n_sum` is zero.
pub fn rounded_mean(total: u64, n_sum: u64) -> u64 {
    if n_sum == 0 {
        return 0;
    }
    let mean = (u128::from(total) + u128::from(n_sum / 2)) / u128::from(n_sum);
    u64::try_from(mean).unwrap_or(u64::MAX)
}

/// Turns run totals into pass/fail assertions.
#[derive(Debug, Clone, Copy)]
pub struct SafetyVerifier<'c> {
    config: &'c Config,
}

impl<'c> SafetyVerifier<'c> {
    /// Verifier applying the thresholds of `config`.
    pub fn new(config: &'c Config) -> Self {
        Self { config }
    }

    /// Evaluate every check and report each failure to `reporter`.
    ///
    /// Checks are independent; one failing never hides another. The CPU
    /// growth flag is the caller's to compute, see [`verify_run`].
    ///
    /// [`verify_run`]: Self::verify_run
    pub fn verify(
        &self,
        totals: &Aggregates,
        cpu_growth_flag: bool,
        reporter: &mut dyn Reporter,
    ) -> VerificationResult {
        let n_sum = totals.n_sum;
        if n_sum == 0 {
            reporter.log("no samples taken, nothing to verify");
            return VerificationResult::default();
        }

        let cfg = self.config;
        let mem_safe = cfg.required_safety.has(Safety::MemSafe);
        let mut result = VerificationResult {
            mean_measured_allocs_per_n: rounded_mean(totals.measured_allocs, n_sum),
            mean_declared_allocs_per_n: rounded_mean(totals.declared_allocs, n_sum),
            mean_execution_steps_per_n: rounded_mean(totals.declared_steps, n_sum),
            cpu_growth_flag,
            failures: Vec::new(),
        };

        if let Some(max) = cfg.max_allocs_per_n {
            let mean = result.mean_measured_allocs_per_n;
            if totals.probe_active && mean > max {
                result.failures.push(Violation::MeasuredAboveMax { mean, max });
            }
            let mean = result.mean_declared_allocs_per_n;
            if mem_safe && mean > max {
                result.failures.push(Violation::DeclaredAboveMax { mean, max });
            }
        }

        if mem_safe && totals.probe_active && totals.measured_allocs > totals.declared_allocs {
            let excess = totals.measured_allocs - totals.declared_allocs;
            // Tolerate an excess that rounds to zero per N.
            if u128::from(excess) * 2 >= u128::from(n_sum) {
                result.failures.push(Violation::MeasuredAboveDeclared {
                    measured: totals.measured_allocs,
                    declared: totals.declared_allocs,
                });
            }
        }

        let steps = result.mean_execution_steps_per_n;
        if let Some(max) = cfg.max_steps_per_n {
            if steps > max {
                result.failures.push(Violation::StepsAboveMax { mean: steps, max });
            }
        }
        if let Some(min) = cfg.min_steps_per_n {
            if steps < min {
                result.failures.push(Violation::StepsBelowMin { mean: steps, min });
            }
        }

        if cfg.required_safety.has(Safety::CPUSafe)
            && cfg.max_steps_per_n.is_none()
            && cpu_growth_flag
        {
            result.failures.push(Violation::UndeclaredCpuGrowth);
        }

        for failure in &result.failures {
            reporter.error(&failure.to_string());
        }
        result
    }

    /// Run the growth analysis over a completed run, then [`verify`](Self::verify).
    pub fn verify_run(&self, output: &RunOutput, reporter: &mut dyn Reporter) -> VerificationResult {
        let flag = GrowthAnalyzer::new(self.config.growth_reference_scale).analyze(&output.series);
        self.verify(&Aggregates::from_run(output), flag, reporter)
    }
}
