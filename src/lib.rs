//! # safety-oracle
//!
//! Verify that instrumented routines really cost what they declare.
//!
//! Sandboxed routines declare capability guarantees (bounded memory, bounded
//! CPU, bounded wall time, no uncontrolled I/O) and report their own
//! resource use into a ledger. This crate runs such a routine at growing
//! sample sizes, measures what it actually allocates and how its execution
//! time grows, and checks the measurements against the declarations:
//! - Mean measured and declared bytes per unit of work against a maximum
//! - Measured bytes against declared bytes (`MemSafe`)
//! - Declared steps per unit against a minimum and maximum
//! - Time growth against the declared steps (`CPUSafe`)
//!
//! ## Measuring allocations
//!
//! Measured bytes come from [`CountingAllocator`], which must be installed
//! as the global allocator of the test binary. Without it the probe reads
//! nothing, a preflight warning is logged, and only declared accounting is
//! checked.
//!
//! ## Quick Start
//!
//! ```ignore
//! use safety_oracle::{assert_safe, CountingAllocator, Safety, SafetyOracle};
//!
//! #[global_allocator]
//! static ALLOC: CountingAllocator = CountingAllocator::new();
//!
//! #[test]
//! fn buffer_fill_is_mem_safe() {
//!     let report = SafetyOracle::new()
//!         .require(Safety::MemSafe | Safety::CPUSafe)
//!         .max_allocs(4)
//!         .test(|iter| {
//!             let n = iter.n();
//!             let buf = Vec::<u8>::with_capacity(4 * n as usize);
//!             iter.ledger().add_allocs(4 * n);
//!             iter.ledger().add_steps(n);
//!             iter.keep_alive(buf);
//!             Ok(())
//!         });
//!     assert_safe!(report);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod constants;
mod oracle;
mod reporter;
mod result;
mod types;
mod workload;

// Functional modules
pub mod adaptive;
pub mod analysis;
pub mod measurement;
pub mod output;
pub mod preflight;

// Re-exports for public API
pub use config::{Config, ConfigError};
pub use constants::{DEFAULT_MAX_MEMORY_BYTES, DEFAULT_MAX_N, DEFAULT_TIME_BUDGET};
pub use measurement::{CountingAllocator, ManualClock, ProbeMode};
pub use oracle::SafetyOracle;
pub use reporter::{Recorder, Reporter};
pub use result::{Metadata, Outcome, Report, VerificationResult, Violation};
pub use types::{ParseSafetyError, Safety, SafetyFlags};
pub use workload::{Aborted, Iteration, Ledger};

// ============================================================================
// Assertion Macros
// ============================================================================

/// Panic unless the report passed.
///
/// The panic message carries the formatted report.
///
/// # Example
/// ```ignore
/// let report = SafetyOracle::new().max_allocs(0).test(|_| Ok(()));
/// assert_safe!(report);
/// ```
#[macro_export]
macro_rules! assert_safe {
    ($report:expr) => {
        match &$report {
            report => match report.outcome {
                $crate::Outcome::Pass => {}
                $crate::Outcome::Fail => {
                    panic!(
                        "Safety violation detected!\n\n{}",
                        $crate::output::format_report(report)
                    );
                }
                $crate::Outcome::Aborted => {
                    panic!(
                        "Verification aborted: {}\n\n{}",
                        report.errors.join("; "),
                        $crate::output::format_report(report)
                    );
                }
            },
        }
    };
}

/// Panic unless the report failed with a message containing `$needle`.
///
/// # Example
/// ```ignore
/// let report = SafetyOracle::new().max_allocs(3).test(four_bytes_per_unit);
/// assert_violation!(report, "above maximum");
/// ```
#[macro_export]
macro_rules! assert_violation {
    ($report:expr) => {
        match &$report {
            report => {
                if report.outcome != $crate::Outcome::Fail {
                    panic!(
                        "Expected a safety violation, got {}\n\n{}",
                        report.outcome,
                        $crate::output::format_report(report)
                    );
                }
            }
        }
    };
    ($report:expr, $needle:expr) => {
        match &$report {
            report => {
                $crate::assert_violation!(report);
                if !report.has_failure($needle) {
                    panic!(
                        "Expected a violation containing {:?}, got {:?}",
                        $needle, report.errors
                    );
                }
            }
        }
    };
}
