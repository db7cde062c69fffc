//! Runtime statistics collection
//!
//! Atomic counters describing propagation work.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Propagation counters - atomic for thread-safe access
#[derive(Debug, Default)]
pub struct RuntimeStats {
    /// Passes drained to completion
    pub passes: AtomicU64,
    /// Derived node evaluations, including initial ones
    pub recomputations: AtomicU64,
    /// Source writes
    pub writes: AtomicU64,
    /// Passes abandoned at the recomputation limit
    pub aborted_passes: AtomicU64,
}

/// Snapshot of runtime stats (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuntimeStatsSnapshot {
    /// Passes drained to completion
    pub passes: u64,
    /// Derived node evaluations
    pub recomputations: u64,
    /// Source writes
    pub writes: u64,
    /// Passes abandoned at the recomputation limit
    pub aborted_passes: u64,
    /// Nodes currently registered in the graph
    pub live_nodes: usize,
}

impl RuntimeStats {
    /// Create new stats counter
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_pass(&self) {
        self.passes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_recomputation(&self) {
        self.recomputations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_abort(&self) {
        self.aborted_passes.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of current stats
    pub fn snapshot(&self, live_nodes: usize) -> RuntimeStatsSnapshot {
        RuntimeStatsSnapshot {
            passes: self.passes.load(Ordering::Relaxed),
            recomputations: self.recomputations.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            aborted_passes: self.aborted_passes.load(Ordering::Relaxed),
            live_nodes,
        }
    }
}

impl RuntimeStatsSnapshot {
    /// Recomputations since an earlier snapshot
    pub fn recomputations_since(&self, earlier: &RuntimeStatsSnapshot) -> u64 {
        self.recomputations.saturating_sub(earlier.recomputations)
    }
}
