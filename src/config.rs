//! Configuration for a verification run.
//!
//! All thresholds are optional and default to "unbounded"; a missing
//! threshold disables the corresponding check rather than raising an error.

use std::time::Duration;

use crate::constants::{DEFAULT_MAX_MEMORY_BYTES, DEFAULT_MAX_N, DEFAULT_TIME_BUDGET};
use crate::measurement::ProbeMode;
use crate::types::{Safety, SafetyFlags};

/// Configuration options for [`SafetyOracle`](crate::SafetyOracle).
///
/// Set once before the run begins; the oracle never mutates it mid-run.
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Declared guarantees and thresholds
    // =========================================================================
    /// Safety flags the workload must live up to.
    ///
    /// `MemSafe` switches the memory probe to precise mode and enables the
    /// declared-vs-measured allocation checks. `CPUSafe` enables the growth
    /// analysis when no explicit step bound is configured.
    pub required_safety: SafetyFlags,

    /// Maximum mean allocated bytes per unit of work.
    pub max_allocs_per_n: Option<u64>,

    /// Maximum mean declared execution steps per unit of work.
    pub max_steps_per_n: Option<u64>,

    /// Minimum mean declared execution steps per unit of work.
    pub min_steps_per_n: Option<u64>,

    // =========================================================================
    // Hard budgets
    // =========================================================================
    /// Cap on the summed sample size across the run. Default: 100,000.
    pub max_n: u64,

    /// Cap on cumulative measured bytes across the run. Default: 200 MiB.
    ///
    /// The sample in flight when the cap is crossed is still recorded, so a
    /// run may overshoot by at most one sample's allocations.
    pub max_memory_bytes: u64,

    /// Wall-clock budget for the run. Default: 1 second.
    pub time_budget: Duration,

    // =========================================================================
    // Reference curves
    // =========================================================================
    /// Multiplier applied to the `log(N)/log(prevN)` curve when deciding
    /// whether a sample is a scheduling spike. Default: 1.0.
    pub noise_reference_scale: f64,

    /// Multiplier on how far smoothed per-unit cost may rise above its
    /// lowest earlier value before the growth analysis flags the run.
    /// Default: 1.0, which allows a factor of two.
    pub growth_reference_scale: f64,

    // =========================================================================
    // Noise reduction
    // =========================================================================
    /// Pin the measuring thread to its current CPU while the loop runs.
    pub pin_cpu: bool,

    /// Raise the measuring thread's priority while the loop runs.
    ///
    /// Has no effect without the `thread-priority` feature.
    pub elevate_priority: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            required_safety: SafetyFlags::NONE,
            max_allocs_per_n: None,
            max_steps_per_n: None,
            min_steps_per_n: None,

            max_n: DEFAULT_MAX_N,
            max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
            time_budget: DEFAULT_TIME_BUDGET,

            noise_reference_scale: 1.0,
            growth_reference_scale: 1.0,

            pin_cpu: true,
            elevate_priority: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Small budgets for fast feedback during development.
    ///
    /// - 10,000 summed N
    /// - 32 MiB measured
    /// - 250 ms wall clock
    pub fn quick() -> Self {
        Self {
            max_n: 10_000,
            max_memory_bytes: 32 * (1 << 20),
            time_budget: Duration::from_millis(250),
            ..Default::default()
        }
    }

    /// Generous budgets for investigating a suspected regression.
    ///
    /// - 1,000,000 summed N
    /// - 1 GiB measured
    /// - 10 s wall clock
    pub fn thorough() -> Self {
        Self {
            max_n: 1_000_000,
            max_memory_bytes: 1 << 30,
            time_budget: Duration::from_secs(10),
            ..Default::default()
        }
    }

    // =========================================================================
    // Builder methods
    // =========================================================================

    /// Add flags to the required safety set.
    pub fn require_safety(mut self, flags: impl Into<SafetyFlags>) -> Self {
        self.required_safety = self.required_safety.union(flags.into());
        self
    }

    /// Set the maximum mean allocations per N.
    pub fn max_allocs(mut self, bytes: u64) -> Self {
        self.max_allocs_per_n = Some(bytes);
        self
    }

    /// Set the maximum mean execution steps per N.
    pub fn max_execution_steps(mut self, steps: u64) -> Self {
        if let Some(min) = self.min_steps_per_n {
            assert!(steps >= min, "max_execution_steps must be >= min_execution_steps");
        }
        self.max_steps_per_n = Some(steps);
        self
    }

    /// Set the minimum mean execution steps per N.
    pub fn min_execution_steps(mut self, steps: u64) -> Self {
        if let Some(max) = self.max_steps_per_n {
            assert!(steps <= max, "min_execution_steps must be <= max_execution_steps");
        }
        self.min_steps_per_n = Some(steps);
        self
    }

    /// Set the cap on summed sample size.
    pub fn max_n(mut self, max: u64) -> Self {
        assert!(max > 0, "max_n must be positive");
        self.max_n = max;
        self
    }

    /// Set the cap on cumulative measured bytes.
    pub fn max_memory_bytes(mut self, bytes: u64) -> Self {
        assert!(bytes > 0, "max_memory_bytes must be positive");
        self.max_memory_bytes = bytes;
        self
    }

    /// Set the wall-clock budget.
    pub fn time_budget(mut self, budget: Duration) -> Self {
        assert!(!budget.is_zero(), "time_budget must be positive");
        self.time_budget = budget;
        self
    }

    /// Set the spike-rejection reference multiplier.
    pub fn noise_reference_scale(mut self, scale: f64) -> Self {
        assert!(scale.is_finite() && scale > 0.0, "noise_reference_scale must be positive");
        self.noise_reference_scale = scale;
        self
    }

    /// Set the growth-analysis tolerance multiplier.
    pub fn growth_reference_scale(mut self, scale: f64) -> Self {
        assert!(scale.is_finite() && scale > 0.0, "growth_reference_scale must be positive");
        self.growth_reference_scale = scale;
        self
    }

    /// Enable or disable CPU pinning.
    pub fn pin_cpu(mut self, pin: bool) -> Self {
        self.pin_cpu = pin;
        self
    }

    /// Enable or disable thread priority elevation.
    pub fn elevate_priority(mut self, elevate: bool) -> Self {
        self.elevate_priority = elevate;
        self
    }

    // =========================================================================
    // Resolution methods
    // =========================================================================

    /// Memory probe mode implied by the required safety flags.
    pub fn probe_mode(&self) -> ProbeMode {
        if self.required_safety.has(Safety::MemSafe) {
            ProbeMode::Precise
        } else {
            ProbeMode::Approximate
        }
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_n == 0 {
            return Err(ConfigError::ZeroBudget("max_n"));
        }
        if self.max_memory_bytes == 0 {
            return Err(ConfigError::ZeroBudget("max_memory_bytes"));
        }
        if self.time_budget.is_zero() {
            return Err(ConfigError::ZeroBudget("time_budget"));
        }
        if let (Some(min), Some(max)) = (self.min_steps_per_n, self.max_steps_per_n) {
            if min > max {
                return Err(ConfigError::StepBoundsInverted { min, max });
            }
        }
        for (name, scale) in [
            ("noise_reference_scale", self.noise_reference_scale),
            ("growth_reference_scale", self.growth_reference_scale),
        ] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(ConfigError::InvalidScale { name, value: scale });
            }
        }
        Ok(())
    }
}

/// Reasons a [`Config`] is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A hard budget is zero, so the run could never take a sample.
    #[error("{0} must be positive")]
    ZeroBudget(&'static str),

    /// Minimum steps per N exceeds the maximum.
    #[error("min_execution_steps ({min}) exceeds max_execution_steps ({max})")]
    StepBoundsInverted {
        /// Configured minimum.
        min: u64,
        /// Configured maximum.
        max: u64,
    },

    /// A reference-curve multiplier is not a positive finite number.
    #[error("{name} must be positive and finite, got {value}")]
    InvalidScale {
        /// Field name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
}
