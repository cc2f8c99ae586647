//! Reporting sinks.

/// Where a run sends failures and log lines.
///
/// Any test-reporting backend can implement this. Once [`failed`]
/// returns `true`, the controller stops at the next sample boundary and the
/// run produces no verification result.
///
/// [`failed`]: Reporter::failed
pub trait Reporter {
    /// Record a failure.
    fn error(&mut self, message: &str);

    /// Record an informational line.
    fn log(&mut self, message: &str);

    /// Whether any failure has been recorded.
    fn failed(&self) -> bool;
}

/// In-memory [`Reporter`] that mirrors everything into `tracing`.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    failures: Vec<String>,
    logs: Vec<String>,
}

impl Recorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Failures recorded so far, in order.
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Log lines recorded so far, in order.
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    /// Split into `(failures, logs)`.
    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.failures, self.logs)
    }
}

impl Reporter for Recorder {
    fn error(&mut self, message: &str) {
        tracing::warn!("{message}");
        self.failures.push(message.to_string());
    }

    fn log(&mut self, message: &str) {
        tracing::debug!("{message}");
        self.logs.push(message.to_string());
    }

    fn failed(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn error(&mut self, message: &str) {
        (**self).error(message);
    }

    fn log(&mut self, message: &str) {
        (**self).log(message);
    }

    fn failed(&self) -> bool {
        (**self).failed()
    }
}
