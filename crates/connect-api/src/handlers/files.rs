//! Signed download endpoint for locally stored objects.
//!
//! The signature in the query string is the only credential; no session
//! is required.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::Utc;
use connect_core::ConnectError;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{ApiError, ApiResult};
use crate::state::ConnectState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SignedQuery {
    /// Unix timestamp after which the link is dead.
    pub expires: i64,
    pub signature: String,
}

#[utoipa::path(
    get,
    path = "/files/{key}",
    tag = "Files",
    params(("key" = String, Path, description = "Object key"), SignedQuery),
    responses(
        (status = 200, description = "File content"),
        (status = 403, description = "Bad or expired signature"),
        (status = 404, description = "Object not found")
    )
)]
pub async fn download(
    State(state): State<ConnectState>,
    Path(key): Path<String>,
    Query(query): Query<SignedQuery>,
) -> ApiResult<impl IntoResponse> {
    let files = state.files.as_ref().ok_or_else(|| {
        ApiError::Connect(ConnectError::NotFound {
            resource: "Object".to_string(),
            id: None,
        })
    })?;

    if !files.verify(&key, query.expires, &query.signature, Utc::now()) {
        tracing::debug!(key = %key, "Rejected signed download");
        return Err(ApiError::Connect(ConnectError::Forbidden));
    }

    let bytes = files.read(&key).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}
