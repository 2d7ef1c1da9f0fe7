use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::{handlers, jobs, middleware::metrics_middleware};
use crate::state::AppState;

/// Room for multipart boundaries and form fields on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let max_upload = usize::try_from(state.config().dispatcher.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    let enable_cors = state.config().server.enable_cors;

    // API routes
    let api_routes = Router::new()
        // Service info
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/formats", get(handlers::list_formats))
        .route("/pool", get(handlers::pool_status))
        .route("/metrics", get(handlers::metrics))
        // Jobs
        .route("/convert", post(jobs::convert))
        .route("/status/{id}", get(jobs::get_status))
        .route("/download/{id}", get(jobs::download))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{id}", delete(jobs::delete_job))
        .layer(DefaultBodyLimit::max(max_upload))
        .with_state(state);

    let router = Router::new()
        .route("/", get(handlers::info))
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}
