//! Checks run before the sampling loop starts.
//!
//! None of these stop the run. Each warning is logged through the reporting
//! sink so the reader knows which guarantees the result actually carries.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::types::{Safety, SafetyFlags};

/// Flags this harness has checks for.
const CHECKED_FLAGS: SafetyFlags = SafetyFlags::NONE
    .with(Safety::MemSafe)
    .with(Safety::CPUSafe);

/// Warning produced before sampling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreflightWarning {
    /// The memory probe sees no allocations, most likely because no counting
    /// allocator is installed. Measured bytes read as zero and the checks
    /// built on them are skipped.
    ProbeInactive {
        /// Whether `MemSafe` was required, making the gap significant.
        mem_safe_required: bool,
    },

    /// Required flags that no check here covers.
    UncheckedFlags {
        /// The flags, rendered for display.
        flags: String,
    },

    /// Built without optimizations; timings are inflated and noisier.
    DebugBuild,
}

impl PreflightWarning {
    /// Whether the warning weakens a guarantee the caller asked for.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            PreflightWarning::ProbeInactive {
                mem_safe_required: true
            }
        )
    }

    /// Human-readable description.
    pub fn description(&self) -> String {
        match self {
            PreflightWarning::ProbeInactive { mem_safe_required } => {
                let mut text = String::from(
                    "memory probe is inactive (is CountingAllocator the global allocator?); \
                     measured allocations are not checked",
                );
                if *mem_safe_required {
                    text.push_str(", MemSafe falls back to declared accounting only");
                }
                text
            }
            PreflightWarning::UncheckedFlags { flags } => {
                format!("no verification is performed for required flags: {flags}")
            }
            PreflightWarning::DebugBuild => {
                "built without optimizations; timing growth analysis may be noisy".to_string()
            }
        }
    }
}

impl std::fmt::Display for PreflightWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}

/// Collect the warnings that apply to a run of `config`.
pub fn preflight_checks(config: &Config, probe_active: bool) -> Vec<PreflightWarning> {
    let mut warnings = Vec::new();

    if !probe_active {
        warnings.push(PreflightWarning::ProbeInactive {
            mem_safe_required: config.required_safety.has(Safety::MemSafe),
        });
    }

    let unchecked = CHECKED_FLAGS.missing(config.required_safety);
    if !unchecked.is_empty() {
        warnings.push(PreflightWarning::UncheckedFlags {
            flags: unchecked.to_string(),
        });
    }

    if cfg!(debug_assertions) && config.required_safety.has(Safety::CPUSafe) {
        warnings.push(PreflightWarning::DebugBuild);
    }

    for warning in &warnings {
        tracing::warn!("{}", warning.description());
    }
    warnings
}
