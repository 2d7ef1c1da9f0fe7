//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Dispatcher (submissions, rejections)
//! - Upload cache (stores, dedup hits, reclaims)
//! - Executor (strategy attempts, escalations, job duration)
//! - Sweeper (removed jobs)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Dispatcher Metrics
// =============================================================================

/// Jobs accepted for conversion, by pair.
pub static JOBS_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("transmute_jobs_submitted_total", "Total jobs accepted"),
        &["source", "destination"],
    )
    .unwrap()
});

/// Submissions rejected before a job was created.
pub static SUBMISSIONS_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "transmute_submissions_rejected_total",
            "Total submissions rejected by validation",
        ),
        &["reason"], // "unknown_format", "unsupported_pair", "too_large", "unsafe_filename", "empty"
    )
    .unwrap()
});

/// Jobs waiting for a worker permit.
pub static JOBS_QUEUED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("transmute_jobs_queued", "Jobs waiting for a worker").unwrap()
});

/// Jobs currently converting.
pub static JOBS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("transmute_jobs_active", "Jobs currently converting").unwrap()
});

// =============================================================================
// Upload Cache Metrics
// =============================================================================

/// Uploads written to storage.
pub static UPLOADS_STORED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("transmute_uploads_stored_total", "Total new uploads persisted").unwrap()
});

/// Uploads resolved to an existing cache entry.
pub static UPLOAD_DEDUP_HITS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "transmute_upload_dedup_hits_total",
        "Total uploads that reused an existing entry",
    )
    .unwrap()
});

/// Cache entries deleted after their refcount reached zero.
pub static UPLOADS_RECLAIMED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "transmute_uploads_reclaimed_total",
        "Total unreferenced uploads deleted",
    )
    .unwrap()
});

// =============================================================================
// Executor Metrics
// =============================================================================

/// Strategy invocations by strategy and result.
pub static STRATEGY_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "transmute_strategy_attempts_total",
            "Total strategy invocations",
        ),
        &["strategy", "result"], // "success", "degraded", "soft_failure", "error", "panic", "timeout"
    )
    .unwrap()
});

/// Moves from one strategy to the next after a failure.
pub static ESCALATIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "transmute_escalations_total",
        "Total escalations to a fallback strategy",
    )
    .unwrap()
});

/// Job wall-clock duration from start of conversion to terminal state.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "transmute_job_duration_seconds",
            "Duration of job execution",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["result"], // "completed", "degraded", "error", "cancelled"
    )
    .unwrap()
});

// =============================================================================
// Sweeper Metrics
// =============================================================================

/// Terminal jobs removed by the sweeper.
pub static JOBS_SWEPT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "transmute_jobs_swept_total",
        "Total expired jobs removed by the sweeper",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Dispatcher
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(SUBMISSIONS_REJECTED.clone()),
        Box::new(JOBS_QUEUED.clone()),
        Box::new(JOBS_ACTIVE.clone()),
        // Upload cache
        Box::new(UPLOADS_STORED.clone()),
        Box::new(UPLOAD_DEDUP_HITS.clone()),
        Box::new(UPLOADS_RECLAIMED.clone()),
        // Executor
        Box::new(STRATEGY_ATTEMPTS.clone()),
        Box::new(ESCALATIONS.clone()),
        Box::new(JOB_DURATION.clone()),
        // Sweeper
        Box::new(JOBS_SWEPT.clone()),
    ]
}
