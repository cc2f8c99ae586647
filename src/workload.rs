//! What a workload sees while it runs.
//!
//! A workload is a closure called once per sample with an [`Iteration`].
//! It performs `n` units of work and declares what that work cost by
//! writing to the [`Ledger`]: bytes allocated and execution steps taken.
//! The controller compares those declarations with what it measures.
//!
//! Values the workload wants counted as retained memory go through
//! [`Iteration::keep_alive`]. They stay alive until the probe has taken
//! its reading after the call, then they are dropped. Anything dropped
//! before the call returns is a temporary and is invisible to the precise
//! probe mode.
//!
//! A workload stops the run by returning [`Aborted`], usually through
//! [`Iteration::fatal`]. A failure recorded with [`Iteration::error`] also
//! stops the run, once the call returns.
//!
//! # Example
//!
//! ```
//! use safety_oracle::{Aborted, Iteration};
//!
//! /// Sums a fixture, failing the run if the fixture is too short.
//! fn sum_prefix(fixture: &[u64]) -> impl FnMut(&mut Iteration<'_>) -> Result<(), Aborted> + '_ {
//!     move |iter| {
//!         let n = iter.n() as usize;
//!         let Some(prefix) = fixture.get(..n) else {
//!             return Err(iter.fatal("fixture too short"));
//!         };
//!         std::hint::black_box(prefix.iter().sum::<u64>());
//!         iter.ledger().add_steps(n as u64);
//!         Ok(())
//!     }
//! }
//! ```

use std::any::Any;

use crate::measurement::KeepAlive;
use crate::reporter::Reporter;

/// Declared resource counters.
///
/// Only the workload writes to the ledger. The controller reads it between
/// calls and may roll it back to an earlier snapshot when it discards a
/// sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ledger {
    allocs: u64,
    steps: u64,
}

impl Ledger {
    /// Create a zeroed ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `bytes` of allocation.
    #[inline]
    pub fn add_allocs(&mut self, bytes: u64) {
        self.allocs = self.allocs.saturating_add(bytes);
    }

    /// Declare `steps` units of execution.
    #[inline]
    pub fn add_steps(&mut self, steps: u64) {
        self.steps = self.steps.saturating_add(steps);
    }

    /// Total declared allocation bytes.
    pub fn allocs(&self) -> u64 {
        self.allocs
    }

    /// Total declared execution steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub(crate) fn restore(&mut self, snapshot: Ledger) {
        *self = snapshot;
    }
}

/// Returned by a workload to stop the run.
///
/// The run then yields no verification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("workload aborted the run")]
pub struct Aborted;

/// Context handed to the workload for one call.
///
/// ```
/// use safety_oracle::{Aborted, Iteration};
///
/// fn copy_bytes(iter: &mut Iteration<'_>) -> Result<(), Aborted> {
///     let n = iter.n() as usize;
///     let buf = vec![0u8; n];
///     iter.ledger().add_allocs(n as u64);
///     iter.ledger().add_steps(n as u64);
///     iter.keep_alive(buf);
///     Ok(())
/// }
/// ```
pub struct Iteration<'a> {
    n: u64,
    ledger: &'a mut Ledger,
    keep_alive: &'a mut KeepAlive,
    reporter: &'a mut dyn Reporter,
}

impl<'a> Iteration<'a> {
    pub(crate) fn new(
        n: u64,
        ledger: &'a mut Ledger,
        keep_alive: &'a mut KeepAlive,
        reporter: &'a mut dyn Reporter,
    ) -> Self {
        Self {
            n,
            ledger,
            keep_alive,
            reporter,
        }
    }

    /// Units of work requested for this call.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Declared resource counters.
    pub fn ledger(&mut self) -> &mut Ledger {
        self.ledger
    }

    /// Keep `value` alive until this call has been measured.
    pub fn keep_alive<T: Any>(&mut self, value: T) {
        self.keep_alive.retain(value);
    }

    /// Record a failure. The run stops after this call returns.
    pub fn error(&mut self, message: &str) {
        self.reporter.error(message);
    }

    /// Record an informational line.
    pub fn log(&mut self, message: &str) {
        self.reporter.log(message);
    }

    /// Whether a failure has been recorded.
    pub fn failed(&self) -> bool {
        self.reporter.failed()
    }

    /// Record `message` as a failure and return the abort sentinel.
    ///
    /// Meant for `return Err(iter.fatal("..."))`.
    pub fn fatal(&mut self, message: &str) -> Aborted {
        self.reporter.error(message);
        Aborted
    }
}

impl std::fmt::Debug for Iteration<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Iteration")
            .field("n", &self.n)
            .field("ledger", &self.ledger)
            .field("keep_alive", &self.keep_alive)
            .finish_non_exhaustive()
    }
}
