//! Result types of a verification run.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::measurement::ProbeMode;

// ============================================================================
// Outcome - The top-level verdict
// ============================================================================

/// Verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Every applicable check held.
    Pass,
    /// At least one check failed; see [`VerificationResult::failures`].
    Fail,
    /// The workload or the reporting sink stopped the run before it
    /// finished. Nothing was verified.
    Aborted,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "PASS"),
            Outcome::Fail => write!(f, "FAIL"),
            Outcome::Aborted => write!(f, "ABORTED"),
        }
    }
}

// ============================================================================
// Violation - One failed check
// ============================================================================

/// A check that failed.
///
/// The `Display` form is the failure message handed to the reporting sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Violation {
    /// Mean measured bytes per N exceed the configured maximum.
    MeasuredAboveMax {
        /// Rounded mean.
        mean: u64,
        /// Configured maximum.
        max: u64,
    },
    /// Mean declared bytes per N exceed the configured maximum.
    DeclaredAboveMax {
        /// Rounded mean.
        mean: u64,
        /// Configured maximum.
        max: u64,
    },
    /// The workload allocated more than it declared.
    MeasuredAboveDeclared {
        /// Measured total, net of tracker overhead.
        measured: u64,
        /// Declared total.
        declared: u64,
    },
    /// Mean declared steps per N exceed the configured maximum.
    StepsAboveMax {
        /// Rounded mean.
        mean: u64,
        /// Configured maximum.
        max: u64,
    },
    /// Mean declared steps per N fall short of the configured minimum.
    StepsBelowMin {
        /// Rounded mean.
        mean: u64,
        /// Configured minimum.
        min: u64,
    },
    /// Execution time grows faster than the declared steps explain.
    UndeclaredCpuGrowth,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MeasuredAboveMax { mean, max } => write!(
                f,
                "measured memory above maximum ({mean} > {max} bytes per N)"
            ),
            Violation::DeclaredAboveMax { mean, max } => write!(
                f,
                "declared allocations above maximum ({mean} > {max} bytes per N)"
            ),
            Violation::MeasuredAboveDeclared { measured, declared } => write!(
                f,
                "measured memory above declared allocations ({measured} > {declared} bytes)"
            ),
            Violation::StepsAboveMax { mean, max } => write!(
                f,
                "execution steps are above maximum ({mean} > {max} per N)"
            ),
            Violation::StepsBelowMin { mean, min } => write!(
                f,
                "execution steps are below minimum ({mean} < {min} per N)"
            ),
            Violation::UndeclaredCpuGrowth => write!(
                f,
                "execution uses CPU time not accounted for by declared steps"
            ),
        }
    }
}

// ============================================================================
// VerificationResult - Aggregates and failures
// ============================================================================

/// Per-N means and the checks that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Rounded mean measured bytes per N.
    pub mean_measured_allocs_per_n: u64,
    /// Rounded mean declared bytes per N.
    pub mean_declared_allocs_per_n: u64,
    /// Rounded mean declared steps per N.
    pub mean_execution_steps_per_n: u64,
    /// Whether the growth analysis flagged the timing series.
    pub cpu_growth_flag: bool,
    /// Every failed check, in evaluation order.
    pub failures: Vec<Violation>,
}

impl VerificationResult {
    /// Whether no check failed.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failure messages.
    pub fn messages(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }
}

// ============================================================================
// Metadata and Report
// ============================================================================

/// How the run went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Samples retained.
    pub samples: usize,
    /// Sum of retained sample sizes.
    pub n_sum: u64,
    /// Wall time of the sampling loop.
    #[serde(with = "duration_nanos")]
    pub elapsed: Duration,
    /// How memory was probed.
    pub probe_mode: ProbeMode,
    /// Whether the probe observed real allocations.
    pub probe_active: bool,
    /// Whether the thread was pinned during sampling.
    pub pinned: bool,
}

impl Metadata {
    /// Metadata of a run that took no samples.
    pub fn empty(probe_mode: ProbeMode) -> Self {
        Self {
            samples: 0,
            n_sum: 0,
            elapsed: Duration::ZERO,
            probe_mode,
            probe_active: false,
            pinned: false,
        }
    }
}

/// Everything [`SafetyOracle::test`](crate::SafetyOracle::test) produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Verdict.
    pub outcome: Outcome,
    /// Aggregates and failures. Zeroed when aborted.
    pub result: VerificationResult,
    /// Run details.
    pub metadata: Metadata,
    /// Failure messages recorded by the sink, including any the workload
    /// recorded itself.
    pub errors: Vec<String>,
    /// Log lines recorded by the sink.
    pub logs: Vec<String>,
}

impl Report {
    /// Whether the verdict is [`Outcome::Pass`].
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Pass
    }

    /// Whether any failure message contains `needle`.
    pub fn has_failure(&self, needle: &str) -> bool {
        self.errors.iter().any(|e| e.contains(needle))
    }
}

mod duration_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_nanos)
    }
}
