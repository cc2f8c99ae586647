//! Zero-phase smoothing of timing series.
//!
//! A second-order low-pass filter is run forward over the series and then
//! backward over the result. The two passes cancel each other's phase lag,
//! so trends in the output line up with the input sample for sample.
//!
//! The filter needs the whole series up front; it is not a streaming
//! operation.
//!
//! # Edges
//!
//! Both ends of the series are extended by reflection before filtering, so
//! the filter starts from a value close to the data instead of zero. A
//! steep edge inside the series still makes the output overshoot by a few
//! percent on either side. The growth analysis removes the one edge it
//! would otherwise see, a fixed setup cost dominating the smallest sizes,
//! before it smooths anything.
//!
//! # Example
//!
//! ```
//! use safety_oracle::analysis::batch_filter;
//!
//! // A ramp with one outlier.
//! let mut series: Vec<f64> = (0..16).map(f64::from).collect();
//! series[8] += 20.0;
//!
//! let smoothed = batch_filter(&series);
//! assert_eq!(smoothed.len(), series.len());
//! assert!(smoothed[8] < series[8]);
//! ```

use crate::constants::{FILTER_A, FILTER_B, FILTER_MIN_LEN, FILTER_PAD};

/// Coefficients and internal memory of one filtering pass.
///
/// Direct form II transposed: two delay registers `w` carry state from one
/// input to the next. Call [`reset`](Self::reset) before every pass; state
/// is never shared between passes.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    b: [f64; 3],
    a: [f64; 2],
    w: [f64; 2],
}

impl Default for FilterState {
    fn default() -> Self {
        Self::with_coefficients(FILTER_B, FILTER_A)
    }
}

impl FilterState {
    /// Filter with the built-in low-pass coefficients and zeroed memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter with custom coefficients.
    ///
    /// `a` omits the leading denominator coefficient, which must be 1.
    pub fn with_coefficients(b: [f64; 3], a: [f64; 2]) -> Self {
        Self { b, a, w: [0.0; 2] }
    }

    /// Gain at zero frequency.
    pub fn dc_gain(&self) -> f64 {
        (self.b[0] + self.b[1] + self.b[2]) / (1.0 + self.a[0] + self.a[1])
    }

    /// Steady-state memory for a unit step input.
    ///
    /// Scaling this by the first input starts the filter as if that value
    /// had been applied forever, which suppresses the start-up transient.
    pub fn steady_state(&self) -> [f64; 2] {
        let k = self.dc_gain();
        [
            self.b[1] + self.b[2] - (self.a[0] + self.a[1]) * k,
            self.b[2] - self.a[1] * k,
        ]
    }

    /// Reset the memory to the steady state for a constant `level`.
    pub fn reset(&mut self, level: f64) {
        let [z0, z1] = self.steady_state();
        self.w = [z0 * level, z1 * level];
    }

    /// Current memory.
    pub fn memory(&self) -> [f64; 2] {
        self.w
    }

    /// Filter one input.
    #[inline]
    pub fn step(&mut self, x: f64) -> f64 {
        let y = self.b[0] * x + self.w[0];
        self.w[0] = self.b[1] * x - self.a[0] * y + self.w[1];
        self.w[1] = self.b[2] * x - self.a[1] * y;
        y
    }

    /// Run one pass over `xs`, seeded from its first element.
    pub fn pass(&mut self, xs: &[f64]) -> Vec<f64> {
        self.reset(xs.first().copied().unwrap_or(0.0));
        xs.iter().map(|&x| self.step(x)).collect()
    }
}

/// Smooth `series` with a forward-backward pass of the low-pass filter.
///
/// The output has the same length as the input. Series shorter than seven
/// samples are returned unchanged. A constant series comes back constant.
///
/// ```
/// use safety_oracle::analysis::batch_filter;
///
/// let flat = vec![3.0; 12];
/// let smoothed = batch_filter(&flat);
/// assert!(smoothed.iter().all(|v| (v - 3.0).abs() < 1e-9));
///
/// assert_eq!(batch_filter(&[1.0, 9.0, 1.0]), vec![1.0, 9.0, 1.0]);
/// ```
pub fn batch_filter(series: &[f64]) -> Vec<f64> {
    let len = series.len();
    if len < FILTER_MIN_LEN {
        return series.to_vec();
    }

    let first = series[0];
    let last = series[len - 1];

    // Odd reflection about each edge value.
    let mut extended = Vec::with_capacity(len + 2 * FILTER_PAD);
    extended.extend((1..=FILTER_PAD).rev().map(|i| 2.0 * first - series[i]));
    extended.extend_from_slice(series);
    extended.extend((1..=FILTER_PAD).map(|i| 2.0 * last - series[len - 1 - i]));

    let mut state = FilterState::new();
    let mut forward = state.pass(&extended);
    forward.reverse();
    let mut backward = state.pass(&forward);
    backward.reverse();

    backward.drain(FILTER_PAD..FILTER_PAD + len).collect()
}
