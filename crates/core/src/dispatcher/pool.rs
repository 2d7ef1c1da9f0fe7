//! Worker pool bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics;

use super::types::PoolStatus;

/// Counters for the worker pool.
#[derive(Default)]
pub(super) struct PoolStats {
    active: AtomicU64,
    queued: AtomicU64,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
}

impl PoolStats {
    pub fn enqueue(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
        metrics::JOBS_QUEUED.inc();
    }

    /// Moves a job from queued to active.
    pub fn activate(&self) {
        self.queued.fetch_sub(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
        metrics::JOBS_QUEUED.dec();
        metrics::JOBS_ACTIVE.inc();
    }

    /// Drops a job that never got a permit.
    pub fn abandon(&self, failed: bool) {
        self.queued.fetch_sub(1, Ordering::Relaxed);
        metrics::JOBS_QUEUED.dec();
        if failed {
            self.total_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn finish(&self, succeeded: bool) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        metrics::JOBS_ACTIVE.dec();
        if succeeded {
            self.total_processed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn to_status(&self, running: bool, max_concurrent: usize) -> PoolStatus {
        PoolStatus {
            running,
            active_jobs: self.active.load(Ordering::Relaxed) as usize,
            max_concurrent,
            queued_jobs: self.queued.load(Ordering::Relaxed) as usize,
            total_processed: self.total_processed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
        }
    }
}
