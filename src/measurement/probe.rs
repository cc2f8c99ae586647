//! Memory probes.
//!
//! The controller never talks to an allocator directly. It reads a
//! [`MemoryProbe`] before and after every call and charges the difference
//! to that sample. Two readings are available, selected by [`ProbeMode`]:
//!
//! - **Precise**: live bytes after a settling pass. Memory the workload
//!   frees before returning is invisible, so only retained bytes count.
//! - **Approximate**: a cumulative allocation counter. Temporaries count in
//!   full, which makes the reading an upper bound.
//!
//! # Platform Behavior
//!
//! [`AllocatorProbe`] reads the process-wide counters of
//! [`CountingAllocator`] and only reports real numbers when that allocator
//! is installed as the `#[global_allocator]`. Otherwise
//! [`is_active`](MemoryProbe::is_active) returns `false`, measured bytes
//! stay at zero and the run falls back to declared accounting. Rust has no
//! collector, so [`collect`](MemoryProbe::collect) is a no-op here; hosts
//! embedding a garbage-collected runtime can implement it.
//!
//! # Example
//!
//! ```
//! use safety_oracle::measurement::{MemoryProbe, ProbeMode};
//!
//! /// Probe over a byte counter the embedder maintains.
//! struct Arena {
//!     live: u64,
//!     total: u64,
//! }
//!
//! impl MemoryProbe for Arena {
//!     fn live_bytes(&self) -> u64 {
//!         self.live
//!     }
//!
//!     fn allocated_bytes(&self) -> u64 {
//!         self.total
//!     }
//! }
//!
//! let mut arena = Arena { live: 64, total: 4096 };
//! assert_eq!(arena.read(ProbeMode::Precise), 64);
//! assert_eq!(arena.read(ProbeMode::Approximate), 4096);
//! assert!(arena.lock_run().is_none());
//! ```

use serde::{Deserialize, Serialize};

use super::alloc::{CountingAllocator, RunLock};

/// How the probe reads memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeMode {
    /// Settle the heap first, then read live bytes. Exact but expensive.
    Precise,
    /// Read a cumulative allocation counter. Cheap upper bound.
    Approximate,
}

impl std::fmt::Display for ProbeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeMode::Precise => write!(f, "precise"),
            ProbeMode::Approximate => write!(f, "approximate"),
        }
    }
}

/// Source of memory readings for the controller.
///
/// In precise mode the controller calls [`collect`](MemoryProbe::collect)
/// twice before each reading, the second pass settling anything the first
/// one deferred. Hosts without a collector leave it as a no-op.
pub trait MemoryProbe {
    /// Run a full collection pass.
    fn collect(&mut self) {}

    /// Bytes currently live.
    fn live_bytes(&self) -> u64;

    /// Bytes allocated since some fixed origin. Never decreases.
    fn allocated_bytes(&self) -> u64;

    /// Whether readings reflect real allocations.
    ///
    /// An inactive probe makes measured bytes meaningless; the run then
    /// falls back to declared accounting only.
    fn is_active(&self) -> bool {
        true
    }

    /// Exclusive access to the probe's counters for one run.
    ///
    /// Probes over process-wide state return a guard so that concurrent
    /// runs in the same process do not see each other's allocations. The
    /// oracle holds it from before the first reading until verification
    /// ends.
    fn lock_run(&self) -> Option<RunLock> {
        None
    }

    /// Reading appropriate for `mode`.
    fn read(&mut self, mode: ProbeMode) -> u64 {
        match mode {
            ProbeMode::Precise => {
                self.collect();
                self.collect();
                self.live_bytes()
            }
            ProbeMode::Approximate => self.allocated_bytes(),
        }
    }
}

/// Probe over the counters kept by [`CountingAllocator`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AllocatorProbe;

impl AllocatorProbe {
    /// Create the probe.
    pub fn new() -> Self {
        AllocatorProbe
    }
}

impl MemoryProbe for AllocatorProbe {
    fn live_bytes(&self) -> u64 {
        CountingAllocator::live()
    }

    fn allocated_bytes(&self) -> u64 {
        CountingAllocator::allocated()
    }

    fn lock_run(&self) -> Option<RunLock> {
        Some(CountingAllocator::lock_run())
    }

    /// Allocates a small box and checks the counter moved.
    fn is_active(&self) -> bool {
        let before = CountingAllocator::allocated();
        let probe = std::hint::black_box(Box::new([0u8; 16]));
        let after = CountingAllocator::allocated();
        drop(probe);
        after > before
    }
}

/// Probe that always reads zero.
///
/// Useful where only declared accounting matters.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProbe;

impl MemoryProbe for NullProbe {
    fn live_bytes(&self) -> u64 {
        0
    }

    fn allocated_bytes(&self) -> u64 {
        0
    }

    fn is_active(&self) -> bool {
        false
    }
}
