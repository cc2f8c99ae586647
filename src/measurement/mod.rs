//! Measurement infrastructure.
//!
//! This module provides:
//! - Injectable wall clocks ([`SystemClock`], [`ManualClock`])
//! - Memory probes over an allocation-counting global allocator
//! - The keep-alive tracker and its overhead accounting
//! - RAII guards that pin the thread and raise its priority while sampling

pub mod affinity;
mod alloc;
mod clock;
mod keep_alive;
#[cfg(feature = "thread-priority")]
pub mod priority;
mod probe;

pub use affinity::{AffinityGuard, AffinityResult};
pub use alloc::{CountingAllocator, RunLock};
pub use clock::{Clock, ManualClock, SystemClock};
pub use keep_alive::{KeepAlive, KeepAliveMark};
pub use probe::{AllocatorProbe, MemoryProbe, NullProbe, ProbeMode};
