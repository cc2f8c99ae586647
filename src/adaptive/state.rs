//! Samples and the series the controller accumulates.

use std::time::Duration;

use serde::Serialize;

/// One measured call of the workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sample {
    /// Units of work requested.
    pub n: u64,
    /// Wall time of the call.
    pub elapsed: Duration,
    /// Bytes the probe observed across the call.
    pub measured_alloc_bytes: u64,
    /// Bytes the workload declared during the call.
    pub declared_alloc_bytes: u64,
    /// Steps the workload declared during the call.
    pub declared_steps: u64,
}

impl Sample {
    /// Elapsed time in nanoseconds.
    pub fn elapsed_ns(&self) -> f64 {
        self.elapsed.as_nanos() as f64
    }

    /// Elapsed nanoseconds per unit of work.
    pub fn ns_per_unit(&self) -> f64 {
        self.elapsed_ns() / self.n.max(1) as f64
    }

    /// Measured bytes per unit of work.
    pub fn bytes_per_unit(&self) -> f64 {
        self.measured_alloc_bytes as f64 / self.n.max(1) as f64
    }
}

/// Samples of one run, in the order they were taken.
///
/// Sample sizes never decrease along the series. Running totals cover
/// exactly the samples retained; a discarded retry never reaches the series.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSeries {
    samples: Vec<Sample>,
    n_sum: u64,
    measured_sum: u64,
}

impl RunSeries {
    /// Create an empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample and update the totals.
    pub fn push(&mut self, sample: Sample) {
        debug_assert!(
            self.samples.last().map_or(true, |last| last.n <= sample.n),
            "sample sizes must not decrease"
        );
        self.n_sum = self.n_sum.saturating_add(sample.n);
        self.measured_sum = self.measured_sum.saturating_add(sample.measured_alloc_bytes);
        self.samples.push(sample);
    }

    /// All samples.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Most recent sample.
    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no sample has been taken.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sum of sample sizes.
    pub fn n_sum(&self) -> u64 {
        self.n_sum
    }

    /// Sum of measured bytes, before tracker overhead is removed.
    pub fn measured_sum(&self) -> u64 {
        self.measured_sum
    }

    /// Sample sizes, in order.
    pub fn sizes(&self) -> Vec<u64> {
        self.samples.iter().map(|s| s.n).collect()
    }

    /// Elapsed nanoseconds, in order.
    pub fn elapsed_ns(&self) -> Vec<f64> {
        self.samples.iter().map(Sample::elapsed_ns).collect()
    }
}
