//! Allocation-counting global allocator.
//!
//! Install [`CountingAllocator`] as the `#[global_allocator]` of a test
//! binary to give the memory probe something to read:
//!
//! ```ignore
//! use safety_oracle::measurement::CountingAllocator;
//!
//! #[global_allocator]
//! static ALLOC: CountingAllocator = CountingAllocator::new();
//! ```
//!
//! # Process-wide Counters
//!
//! The counters are shared by every thread in the process. A workload that
//! hands its allocations to a worker thread (or a thread pool) is measured
//! like one that allocates inline.
//!
//! The price is that allocations made by unrelated threads during a run
//! are counted as well. [`CountingAllocator::lock_run`] serializes
//! measured runs within the process, so two oracles never read each
//! other's workloads. Background threads outside any run (a test harness
//! reporting results, say) still add a few bytes; spread over a run's
//! summed N they round away in the per-N means.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

static ALLOCATED: AtomicU64 = AtomicU64::new(0);
static FREED: AtomicU64 = AtomicU64::new(0);

static RUN_LOCK: Mutex<()> = Mutex::new(());

/// Global allocator wrapper that counts bytes on top of [`System`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingAllocator;

impl CountingAllocator {
    /// Create the allocator.
    pub const fn new() -> Self {
        CountingAllocator
    }

    /// Bytes allocated by any thread since the process started.
    pub fn allocated() -> u64 {
        ALLOCATED.load(Ordering::Relaxed)
    }

    /// Bytes freed by any thread since the process started.
    pub fn freed() -> u64 {
        FREED.load(Ordering::Relaxed)
    }

    /// Allocated minus freed, floored at zero.
    ///
    /// The two counters are read one after the other; a free landing in
    /// between can briefly put the freed counter ahead.
    pub fn live() -> u64 {
        let allocated = Self::allocated();
        allocated.saturating_sub(Self::freed())
    }

    /// Block until no other measured run holds the counters.
    ///
    /// The lock is not reentrant: starting a run from inside a workload
    /// deadlocks. A run that panicked does not poison it.
    pub fn lock_run() -> RunLock {
        RunLock {
            _guard: RUN_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
        }
    }
}

/// Exclusive hold on the allocation counters for one run.
///
/// Released on drop.
#[derive(Debug)]
pub struct RunLock {
    _guard: MutexGuard<'static, ()>,
}

#[inline]
fn count(counter: &AtomicU64, bytes: usize) {
    counter.fetch_add(bytes as u64, Ordering::Relaxed);
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            count(&ALLOCATED, layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            count(&ALLOCATED, layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        count(&FREED, layout.size());
        unsafe { System.dealloc(ptr, layout) };
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            count(&ALLOCATED, new_size);
            count(&FREED, layout.size());
        }
        new_ptr
    }
}
