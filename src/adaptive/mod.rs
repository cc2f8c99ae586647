//! Adaptive sample-size control.
//!
//! The controller starts at one unit of work and doubles the sample size
//! each iteration, shrinking the step whenever the memory or time left would
//! not cover another doubling at the last observed rate. Sizes never
//! decrease: once the budgets only admit a smaller size, the run ends.
//!
//! Calls that take far longer than the previous sample predicts are treated
//! as scheduling noise and retried once at the same size. Everything the
//! discarded call declared or retained is rolled back first. A repeated
//! spike is kept, capped at the smaller of the two times, so a genuine
//! regression is not hidden by retrying until it goes away.

mod loop_runner;
mod state;

pub use loop_runner::{
    ControllerConfig, ControllerOutcome, RunOutput, StopReason, WorkloadController,
};
pub use state::{RunSeries, Sample};
