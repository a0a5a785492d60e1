//! Dashboard notifications.

use axum::{extract::State, Extension, Json};
use chrono::Utc;
use connect_governance::services::Notification;
use connect_governance::Actor;

use crate::error::ApiResult;
use crate::state::ConnectState;

/// Urgent notifications for the caller, most severe first.
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Notifications",
    responses(
        (status = 200, description = "Notifications", body = serde_json::Value)
    ),
    security(("bearer_auth" = []))
)]
pub async fn notifications(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<Notification>>> {
    let items = state.notifications.urgent_for(&actor, Utc::now()).await?;
    Ok(Json(items))
}
