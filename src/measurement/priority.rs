//! Raising the measuring thread's scheduling priority.
//!
//! Best effort: without the needed privileges the attempt fails and the run
//! continues at normal priority.

use thread_priority::{ThreadPriority, ThreadPriorityValue};

/// Priority requested while sampling. High, but short of the maximum.
const ELEVATED_PRIORITY: u8 = 75;

/// Outcome of an elevation attempt.
#[derive(Debug)]
pub enum PriorityResult {
    /// Elevated; the old priority is restored when the guard drops.
    Elevated(PriorityGuard),
    /// Not elevated.
    NotElevated {
        /// Why elevation failed.
        reason: String,
    },
}

/// Restores the thread's priority on drop.
#[derive(Debug)]
pub struct PriorityGuard {
    original: ThreadPriority,
}

impl PriorityGuard {
    /// Try to raise the current thread's priority.
    pub fn try_elevate() -> PriorityResult {
        let original = match thread_priority::get_current_thread_priority() {
            Ok(p) => p,
            Err(e) => {
                return PriorityResult::NotElevated {
                    reason: format!("could not read thread priority: {e:?}"),
                }
            }
        };

        let target = match ThreadPriorityValue::try_from(ELEVATED_PRIORITY) {
            Ok(v) => ThreadPriority::Crossplatform(v),
            Err(_) => {
                return PriorityResult::NotElevated {
                    reason: "invalid priority value".to_string(),
                }
            }
        };

        match thread_priority::set_current_thread_priority(target) {
            Ok(()) => {
                tracing::debug!(?original, ?target, "elevated thread priority");
                PriorityResult::Elevated(PriorityGuard { original })
            }
            Err(e) => {
                tracing::debug!("thread priority elevation refused: {e:?}");
                PriorityResult::NotElevated {
                    reason: format!("elevation refused (privileges?): {e:?}"),
                }
            }
        }
    }
}

impl Drop for PriorityGuard {
    fn drop(&mut self) {
        match thread_priority::set_current_thread_priority(self.original.clone()) {
            Ok(()) => tracing::debug!(original = ?self.original, "restored thread priority"),
            Err(e) => tracing::warn!("failed to restore thread priority: {e:?}"),
        }
    }
}
