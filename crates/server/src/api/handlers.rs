use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use transmute_core::{dispatcher::PoolStatus, job::JobCounts, strategy::SupportedFormat, SanitizedConfig};

use crate::metrics;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

#[derive(Serialize)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: &'static [EndpointInfo],
}

const fn endpoint(
    method: &'static str,
    path: &'static str,
    description: &'static str,
) -> EndpointInfo {
    EndpointInfo {
        method,
        path,
        description,
    }
}

const ENDPOINTS: &[EndpointInfo] = &[
    endpoint("POST", "/api/v1/convert", "Convert a file"),
    endpoint("GET", "/api/v1/status/{id}", "Check conversion status"),
    endpoint("GET", "/api/v1/download/{id}", "Download the converted file"),
    endpoint("GET", "/api/v1/jobs", "List jobs"),
    endpoint("DELETE", "/api/v1/jobs/{id}", "Delete a job and its files"),
    endpoint("GET", "/api/v1/formats", "Supported conversions"),
    endpoint("GET", "/api/v1/pool", "Worker pool status"),
    endpoint("GET", "/api/v1/config", "Effective configuration"),
    endpoint("GET", "/api/v1/metrics", "Prometheus metrics"),
    endpoint("GET", "/api/v1/health", "Health check"),
];

pub async fn info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Transmute conversion service",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS,
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Transmute conversion service is running".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn list_formats(State(state): State<Arc<AppState>>) -> Json<Vec<SupportedFormat>> {
    Json(state.dispatcher().supported_formats())
}

/// Worker pool status plus job counts
#[derive(Serialize)]
pub struct PoolResponse {
    #[serde(flatten)]
    pub pool: PoolStatus,
    pub jobs: JobCounts,
    pub cached_uploads: usize,
}

pub async fn pool_status(State(state): State<Arc<AppState>>) -> Json<PoolResponse> {
    let dispatcher = state.dispatcher();
    Json(PoolResponse {
        pool: dispatcher.pool_status(),
        jobs: dispatcher.store().count_by_status(),
        cached_uploads: dispatcher.store().uploads().len(),
    })
}

/// Prometheus scrape endpoint
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    metrics::collect_dynamic_metrics(&state);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::encode_metrics(),
    )
}
