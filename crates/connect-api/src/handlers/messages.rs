//! Facility messaging handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use connect_core::{FacilityId, MessageId};
use connect_governance::services::Message;
use connect_governance::Actor;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiResult;
use crate::middleware::ClientMetadata;
use crate::models::{InboxQuery, Paginated, PaginationQuery, SendMessageRequest, UnreadCountResponse};
use crate::state::ConnectState;

/// Send a message to the facility's counterpart.
#[utoipa::path(
    post,
    path = "/messages",
    tag = "Messages",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = serde_json::Value),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Not a party to the facility")
    ),
    security(("bearer_auth" = []))
)]
pub async fn send_message(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    ClientMetadata(metadata): ClientMetadata,
    Json(request): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    request.validate()?;
    let facility_id = FacilityId::from_uuid(request.facility_id);
    let message = state
        .messages
        .send(&actor, facility_id, request.into_message(), metadata)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Messages addressed to the caller, newest first.
#[utoipa::path(
    get,
    path = "/messages",
    tag = "Messages",
    params(InboxQuery),
    responses(
        (status = 200, description = "Inbox", body = serde_json::Value)
    ),
    security(("bearer_auth" = []))
)]
pub async fn inbox(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<InboxQuery>,
) -> ApiResult<Json<Paginated<Message>>> {
    let options = query.options();
    let (items, total) = state
        .messages
        .inbox(&actor, query.unread_only, &options)
        .await?;
    Ok(Json(Paginated::new(items, total, &options)))
}

#[utoipa::path(
    get,
    path = "/messages/unread-count",
    tag = "Messages",
    responses(
        (status = 200, description = "Unread count", body = UnreadCountResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn unread_count(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<UnreadCountResponse>> {
    let unread = state.messages.unread_count(actor.id()).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

/// Conversation of a facility, newest first.
#[utoipa::path(
    get,
    path = "/facilities/{id}/messages",
    tag = "Messages",
    params(("id" = Uuid, Path, description = "Facility ID"), PaginationQuery),
    responses(
        (status = 200, description = "Thread", body = serde_json::Value),
        (status = 404, description = "Facility not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn facility_thread(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    Path(facility_id): Path<Uuid>,
    Query(query): Query<PaginationQuery>,
) -> ApiResult<Json<Paginated<Message>>> {
    let options = query.options();
    let (items, total) = state
        .messages
        .thread(&actor, FacilityId::from_uuid(facility_id), &options)
        .await?;
    Ok(Json(Paginated::new(items, total, &options)))
}

/// Mark a received message read. Repeating it keeps the first timestamp.
#[utoipa::path(
    post,
    path = "/messages/{id}/read",
    tag = "Messages",
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message read", body = serde_json::Value),
        (status = 404, description = "Message not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_read(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Message>> {
    let message = state
        .messages
        .mark_read(&actor, MessageId::from_uuid(id))
        .await?;
    Ok(Json(message))
}
