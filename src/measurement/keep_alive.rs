//! Retention of workload values across one measurement.

use std::any::Any;
use std::mem::size_of;

/// Values a workload asked to keep alive until its call has been measured.
///
/// Retaining a value costs the harness a box plus, now and then, a larger
/// backing block for the list itself. Both are counted as tracker overhead
/// so they can be taken back out of the measured total.
#[derive(Default)]
pub struct KeepAlive {
    values: Vec<Box<dyn Any>>,
    overhead: u64,
}

/// Position in a [`KeepAlive`] to roll back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveMark {
    len: usize,
    overhead: u64,
}

impl KeepAlive {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain `value` until the next [`clear`](Self::clear) or rollback.
    pub fn retain<T: Any>(&mut self, value: T) {
        let boxed: Box<dyn Any> = Box::new(value);
        self.overhead = self.overhead.saturating_add(size_of::<T>() as u64);

        let capacity = self.values.capacity();
        self.values.push(boxed);
        if self.values.capacity() != capacity {
            let block = self.values.capacity() * size_of::<Box<dyn Any>>();
            self.overhead = self.overhead.saturating_add(block as u64);
        }
    }

    /// Number of values currently retained.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bytes attributed to the tracker itself so far.
    pub fn overhead(&self) -> u64 {
        self.overhead
    }

    /// Remember the current position.
    pub fn mark(&self) -> KeepAliveMark {
        KeepAliveMark {
            len: self.values.len(),
            overhead: self.overhead,
        }
    }

    /// Drop everything retained after `mark` and forget its overhead.
    ///
    /// The list keeps its capacity, so a grown block stays grown.
    pub fn rollback(&mut self, mark: KeepAliveMark) {
        self.values.truncate(mark.len);
        self.overhead = mark.overhead;
    }

    /// Release every retained value, keeping capacity and overhead.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl std::fmt::Debug for KeepAlive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeepAlive")
            .field("len", &self.values.len())
            .field("capacity", &self.values.capacity())
            .field("overhead", &self.overhead)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLOT: u64 = size_of::<Box<dyn Any>>() as u64;

    #[test]
    fn test_overhead_counts_box_and_growth() {
        let mut keep = KeepAlive::new();
        keep.retain(7u64);

        let cap = keep.values.capacity() as u64;
        assert_eq!(keep.len(), 1);
        assert_eq!(keep.overhead(), 8 + cap * SLOT);

        // No growth while capacity lasts.
        let before = keep.overhead();
        keep.retain(1u32);
        if keep.values.capacity() as u64 == cap {
            assert_eq!(keep.overhead(), before + 4);
        }
    }

    #[test]
    fn test_zero_sized_values_cost_only_growth() {
        let mut keep = KeepAlive::new();
        keep.retain(());
        let cap = keep.values.capacity() as u64;
        assert_eq!(keep.overhead(), cap * SLOT);
    }

    #[test]
    fn test_rollback_restores_len_and_overhead() {
        let mut keep = KeepAlive::new();
        keep.retain(vec![1u8; 4]);
        let mark = keep.mark();

        keep.retain(String::from("discard me"));
        keep.retain(3u16);
        assert_eq!(keep.len(), 3);

        keep.rollback(mark);
        assert_eq!(keep.len(), 1);
        assert_eq!(keep.mark(), mark);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut keep = KeepAlive::new();
        keep.retain(1u8);
        let cap = keep.values.capacity();
        let overhead = keep.overhead();

        keep.clear();
        assert!(keep.is_empty());
        assert_eq!(keep.values.capacity(), cap);
        assert_eq!(keep.overhead(), overhead);
    }
}
