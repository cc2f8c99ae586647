//! Pinning the measuring thread to one CPU.
//!
//! Migrating between cores mid-sample shows up as a timing spike. The
//! controller holds an [`AffinityGuard`] for the whole sampling loop so the
//! scheduler keeps the thread where it started.
//!
//! Only Linux is supported (`sched_setaffinity`, no privileges needed).
//! Elsewhere [`AffinityGuard::try_pin`] reports why it could not pin and the
//! run continues unpinned.

/// Outcome of a pinning attempt.
#[derive(Debug)]
pub enum AffinityResult {
    /// Pinned; the original mask is restored when the guard drops.
    Pinned(AffinityGuard),
    /// Not pinned; sampling proceeds anyway.
    NotPinned {
        /// Why pinning failed.
        reason: String,
    },
}

impl AffinityResult {
    /// Whether the attempt succeeded.
    pub fn is_pinned(&self) -> bool {
        matches!(self, AffinityResult::Pinned(_))
    }
}

/// Restores the thread's CPU mask on drop.
pub struct AffinityGuard {
    #[cfg(target_os = "linux")]
    original_mask: libc::cpu_set_t,
    #[cfg(target_os = "linux")]
    cpu: usize,
}

impl AffinityGuard {
    /// Pin the current thread to the CPU it is running on.
    pub fn try_pin() -> AffinityResult {
        #[cfg(target_os = "linux")]
        {
            Self::try_pin_linux()
        }

        #[cfg(not(target_os = "linux"))]
        {
            AffinityResult::NotPinned {
                reason: "CPU pinning is only implemented on Linux".to_string(),
            }
        }
    }

    /// CPU the thread is pinned to.
    #[cfg(target_os = "linux")]
    pub fn cpu(&self) -> usize {
        self.cpu
    }

    #[cfg(target_os = "linux")]
    fn try_pin_linux() -> AffinityResult {
        use std::mem::{size_of, MaybeUninit};

        let set_size = size_of::<libc::cpu_set_t>();

        // SAFETY: every pointer handed to libc refers to a live, properly
        // sized cpu_set_t owned by this frame.
        unsafe {
            let mut original = MaybeUninit::<libc::cpu_set_t>::uninit();
            if libc::sched_getaffinity(0, set_size, original.as_mut_ptr()) != 0 {
                return AffinityResult::NotPinned {
                    reason: format!(
                        "sched_getaffinity failed: {}",
                        std::io::Error::last_os_error()
                    ),
                };
            }
            let original_mask = original.assume_init();

            let cpu = libc::sched_getcpu();
            if cpu < 0 {
                return AffinityResult::NotPinned {
                    reason: format!("sched_getcpu failed: {}", std::io::Error::last_os_error()),
                };
            }
            let cpu = cpu as usize;

            let mut only_this: libc::cpu_set_t = std::mem::zeroed();
            libc::CPU_ZERO(&mut only_this);
            libc::CPU_SET(cpu, &mut only_this);

            if libc::sched_setaffinity(0, set_size, &only_this) != 0 {
                return AffinityResult::NotPinned {
                    reason: format!(
                        "sched_setaffinity failed: {}",
                        std::io::Error::last_os_error()
                    ),
                };
            }

            tracing::debug!(cpu, "pinned measuring thread");
            AffinityResult::Pinned(AffinityGuard { original_mask, cpu })
        }
    }
}

#[cfg(target_os = "linux")]
impl Drop for AffinityGuard {
    fn drop(&mut self) {
        // SAFETY: original_mask was filled in by sched_getaffinity.
        let rc = unsafe {
            libc::sched_setaffinity(
                0,
                std::mem::size_of::<libc::cpu_set_t>(),
                &self.original_mask,
            )
        };
        if rc != 0 {
            tracing::warn!(
                "failed to restore CPU affinity: {}",
                std::io::Error::last_os_error()
            );
        } else {
            tracing::debug!("restored CPU affinity");
        }
    }
}

impl std::fmt::Debug for AffinityGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("AffinityGuard");
        #[cfg(target_os = "linux")]
        s.field("cpu", &self.cpu);
        s.finish()
    }
}
