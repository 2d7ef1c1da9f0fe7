//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the Transmute server:
//! - HTTP request metrics (latency, counts)
//! - Job and upload cache state (collected dynamically)
//! - Core metrics from the dispatcher, executor and sweeper

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;
use tracing::warn;

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "transmute_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("transmute_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "transmute_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Job Metrics (collected dynamically)
// =============================================================================

/// Jobs by current status.
pub static JOBS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("transmute_jobs_by_status", "Current job count by status"),
        &["status"],
    )
    .unwrap()
});

/// Entries held by the upload cache.
pub static UPLOAD_CACHE_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "transmute_upload_cache_entries",
        "Number of stored uploads",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    let local: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        Box::new(JOBS_BY_STATUS.clone()),
        Box::new(UPLOAD_CACHE_ENTRIES.clone()),
    ];

    // Core metrics (dispatcher, executor, upload cache, sweeper)
    for metric in local.into_iter().chain(transmute_core::metrics::all_metrics()) {
        if let Err(e) = registry.register(metric) {
            warn!(error = %e, "Failed to register metric");
        }
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
pub fn collect_dynamic_metrics(state: &AppState) {
    let store = state.dispatcher().store();
    let counts = store.count_by_status();
    for (status, count) in [
        ("pending", counts.pending),
        ("converting", counts.converting),
        ("completed", counts.completed),
        ("error", counts.error),
    ] {
        JOBS_BY_STATUS
            .with_label_values(&[status])
            .set(count as i64);
    }
    UPLOAD_CACHE_ENTRIES.set(store.uploads().len() as i64);
}

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});

static HASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9a-fA-F]{64}").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = UUID_RE.replace_all(path, "{id}");
    let result = HASH_RE.replace_all(&result, "{hash}");
    result.into_owned()
}
