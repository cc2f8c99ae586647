//! Analysis of a completed run.
//!
//! This module provides:
//! - [`batch_filter`]: zero-phase smoothing of a timing series
//! - [`GrowthAnalyzer`]: detection of undeclared CPU growth
//! - [`SafetyVerifier`]: the declared-versus-measured checks
//!
//! Analysis starts once the controller has finished. The growth analyzer
//! reduces the run's elapsed times to a single flag, then the verifier
//! turns that flag and the run totals into a list of violations. Nothing
//! here measures or times anything, so every function can be driven from
//! hand-written series.

mod filter;
mod growth;
mod verify;

pub use filter::{batch_filter, FilterState};
pub use growth::{
    dangerous_growth, exceeds_reference, log_reference, setup_cost, GrowthAnalyzer,
};
pub use verify::{rounded_mean, Aggregates, SafetyVerifier};
