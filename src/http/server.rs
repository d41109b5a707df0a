// LogSleuth - http/server.rs
//
// Axum router wiring every route in §6 onto `AppState`, with a request trace
// layer following the existing logging conventions (§10.1).

use crate::app::state::AppState;
use crate::http::handlers;
use crate::util::constants::MAX_UPLOAD_BYTES;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root_info))
        .route("/api/health", get(handlers::health))
        .route(
            "/api/logs/upload",
            post(handlers::upload).route_layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES as usize)),
        )
        .route("/api/logs/ingest", post(handlers::ingest))
        .route("/api/logs/ingest/fluent-bit", post(handlers::ingest_fluent_bit))
        .route("/api/logs/query", post(handlers::query))
        .route("/api/templates", get(handlers::templates))
        .route("/api/stats", get(handlers::stats))
        .route("/api/files", get(handlers::files))
        .route("/api/files/:file_id/stats", get(handlers::file_stats))
        .route("/api/anomalies", get(handlers::anomalies))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
