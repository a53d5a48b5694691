//! Snapshot upload, fetch and room listing.

use super::KeyQuery;
use crate::error::Result;
use crate::request::NewSnapshot;
use crate::server::SnapshotRelay;
use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use snap_types::{CreateSnapshotResponse, RoomsResponse, SnapshotRecord};
use std::sync::Arc;

/// `POST /snapshots`.
///
/// The key is checked before the body is looked at, so an unauthorized
/// request never creates a record.
pub async fn create_handler(
    Extension(relay): Extension<Arc<SnapshotRelay>>,
    Query(query): Query<KeyQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<CreateSnapshotResponse>> {
    relay.authorize(query.presented(&headers))?;
    let new = NewSnapshot::from_body(&body)?;
    let id = relay.create_snapshot(new).await?;
    Ok(Json(CreateSnapshotResponse { id }))
}

/// `GET /snapshots/:id`. Returns the full record, ciphertext included.
pub async fn get_handler(
    Extension(relay): Extension<Arc<SnapshotRelay>>,
    Path(id): Path<String>,
) -> Result<Json<SnapshotRecord>> {
    Ok(Json(relay.snapshot(&id).await?))
}

/// `GET /rooms`.
pub async fn rooms_handler(Extension(relay): Extension<Arc<SnapshotRelay>>) -> Json<RoomsResponse> {
    Json(RoomsResponse {
        rooms: relay.rooms().room_names(),
    })
}
