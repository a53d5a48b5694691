//! Health check endpoint.

use crate::error::Result;
use crate::server::SnapshotRelay;
use axum::{Extension, Json};
use snap_types::HealthResponse;
use std::sync::Arc;

/// Health check handler. Unauthenticated.
pub async fn health_handler(
    Extension(relay): Extension<Arc<SnapshotRelay>>,
) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        ok: true,
        snapshots: relay.snapshot_count().await?,
        rooms: relay.rooms().room_names(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: relay.uptime_secs(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::http::build_router;
    use crate::http::tests::{body_json, get, test_relay};
    use crate::request::NewSnapshot;
    use axum::http::StatusCode;
    use serde_json::json;
    use tokio::sync::mpsc;
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn reports_counts_and_rooms() {
        let relay = test_relay(Some("secret")).await;
        relay
            .create_snapshot(NewSnapshot::new("demo", "x", json!({})))
            .await
            .unwrap();
        let (tx, _rx) = mpsc::channel(1);
        relay.rooms().register("lobby", tx);

        let response = build_router(relay).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["snapshots"], 1);
        assert_eq!(body["rooms"], json!(["lobby"]));
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["uptime_seconds"].is_u64());
    }
}
