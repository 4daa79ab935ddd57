//! Tree operation statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked by a tree.
///
/// All fields are atomic so a `SharedBTree` can hand out a reference
/// without holding its lock. We use `Ordering::Relaxed` throughout: the
/// counters are independent and only ever read as a rough picture.
///
/// # Example
/// ```
/// use diskbtree::TreeStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = TreeStats::new();
/// stats.splits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().splits, 1);
/// ```
#[derive(Debug)]
pub struct TreeStats {
    /// Node records read from the store.
    pub nodes_read: AtomicU64,

    /// Node records written to the store.
    pub nodes_written: AtomicU64,

    /// Node slots handed out by the allocator.
    pub nodes_allocated: AtomicU64,

    /// Allocations served from freed space instead of the end of the store.
    /// Slots reserved ahead of a split count by where they were reserved.
    pub nodes_reused: AtomicU64,

    /// Emptied leaves returned to the free list.
    pub nodes_freed: AtomicU64,

    /// Node splits.
    pub splits: AtomicU64,

    /// Splits that created a new root.
    pub root_promotions: AtomicU64,
}

impl TreeStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            nodes_read: AtomicU64::new(0),
            nodes_written: AtomicU64::new(0),
            nodes_allocated: AtomicU64::new(0),
            nodes_reused: AtomicU64::new(0),
            nodes_freed: AtomicU64::new(0),
            splits: AtomicU64::new(0),
            root_promotions: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            nodes_read: self.nodes_read.load(Ordering::Relaxed),
            nodes_written: self.nodes_written.load(Ordering::Relaxed),
            nodes_allocated: self.nodes_allocated.load(Ordering::Relaxed),
            nodes_reused: self.nodes_reused.load(Ordering::Relaxed),
            nodes_freed: self.nodes_freed.load(Ordering::Relaxed),
            splits: self.splits.load(Ordering::Relaxed),
            root_promotions: self.root_promotions.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.nodes_read.store(0, Ordering::Relaxed);
        self.nodes_written.store(0, Ordering::Relaxed);
        self.nodes_allocated.store(0, Ordering::Relaxed);
        self.nodes_reused.store(0, Ordering::Relaxed);
        self.nodes_freed.store(0, Ordering::Relaxed);
        self.splits.store(0, Ordering::Relaxed);
        self.root_promotions.store(0, Ordering::Relaxed);
    }
}

impl Default for TreeStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of [`TreeStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub nodes_read: u64,
    pub nodes_written: u64,
    pub nodes_allocated: u64,
    pub nodes_reused: u64,
    pub nodes_freed: u64,
    pub splits: u64,
    pub root_promotions: u64,
}

impl StatsSnapshot {
    /// Fraction of allocations served from freed space (0.0 to 1.0).
    pub fn reuse_rate(&self) -> f64 {
        if self.nodes_allocated == 0 {
            0.0
        } else {
            self.nodes_reused as f64 / self.nodes_allocated as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ reads: {}, writes: {}, splits: {}, freed: {}, reuse_rate: {:.2}% }}",
            self.nodes_read,
            self.nodes_written,
            self.splits,
            self.nodes_freed,
            self.reuse_rate() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = TreeStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
        assert_eq!(stats.snapshot().reuse_rate(), 0.0);
    }

    #[test]
    fn test_stats_bump_and_snapshot() {
        let stats = TreeStats::new();
        for _ in 0..4 {
            TreeStats::bump(&stats.nodes_allocated);
        }
        TreeStats::bump(&stats.nodes_reused);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.nodes_allocated, 4);
        assert_eq!(snapshot.reuse_rate(), 0.25);
    }

    #[test]
    fn test_stats_reset() {
        let stats = TreeStats::new();
        stats.splits.fetch_add(100, Ordering::Relaxed);

        stats.reset();

        assert_eq!(stats.splits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_stats_display() {
        let stats = TreeStats::new();
        stats.nodes_read.fetch_add(80, Ordering::Relaxed);
        stats.splits.fetch_add(5, Ordering::Relaxed);
        stats.nodes_allocated.fetch_add(10, Ordering::Relaxed);
        stats.nodes_reused.fetch_add(5, Ordering::Relaxed);

        let display = format!("{}", stats.snapshot());

        assert!(display.contains("reads: 80"));
        assert!(display.contains("splits: 5"));
        assert!(display.contains("50.00%"));
    }
}
