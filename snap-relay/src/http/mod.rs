//! HTTP endpoints for snap-relay.
//!
//! Snapshot routes are mounted both at the root and under `/api/v1`.

mod admin;
pub mod health;
mod metrics;
mod snapshots;

use crate::server::SnapshotRelay;
use crate::session::ws_handler;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use snap_types::ErrorBody;
use std::sync::Arc;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Optional `api_key` query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct KeyQuery {
    /// Shared API key.
    pub api_key: Option<String>,
}

impl KeyQuery {
    /// Key from the `x-api-key` header, falling back to the query string.
    pub fn presented<'a>(&'a self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .or(self.api_key.as_deref())
    }
}

/// Build the HTTP router with all endpoints.
pub fn build_router(relay: Arc<SnapshotRelay>) -> Router {
    let body_limit = relay.config().limits.max_body_bytes;
    let snapshot_routes = Router::new()
        .route("/snapshots", post(snapshots::create_handler))
        .route("/snapshots/:id", get(snapshots::get_handler))
        .route("/rooms", get(snapshots::rooms_handler));

    Router::new()
        .merge(snapshot_routes.clone())
        .nest("/api/v1", snapshot_routes)
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/admin/clear", post(admin::clear_handler))
        .route("/ws", get(ws_handler))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(Extension(relay))
}

async fn not_found() -> impl IntoResponse {
    let body = ErrorBody {
        error: "not found".to_string(),
    };
    (StatusCode::NOT_FOUND, Json(body))
}
