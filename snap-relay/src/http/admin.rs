//! Admin endpoints.

use super::KeyQuery;
use crate::error::Result;
use crate::server::SnapshotRelay;
use axum::extract::Query;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use snap_types::ClearResponse;
use std::sync::Arc;

/// `POST /admin/clear`. Irreversible.
pub async fn clear_handler(
    Extension(relay): Extension<Arc<SnapshotRelay>>,
    Query(query): Query<KeyQuery>,
    headers: HeaderMap,
) -> Result<Json<ClearResponse>> {
    relay.authorize_admin(query.presented(&headers))?;
    relay.clear().await?;
    Ok(Json(ClearResponse { ok: true }))
}
