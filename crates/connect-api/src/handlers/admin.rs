//! Administrator handlers: registration decisions and the audit log.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use connect_core::ActorId;
use connect_governance::{Actor, ApprovalDecision, AuditEntry};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiResult;
use crate::middleware::ClientMetadata;
use crate::models::{
    ActorDecisionResponse, AuditQuery, DecisionRequest, Paginated, PaginationQuery,
    PendingActorResponse,
};
use crate::state::ConnectState;

/// Registrations awaiting a decision.
#[utoipa::path(
    get,
    path = "/admin/users/pending",
    tag = "Admin",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Pending registrations", body = serde_json::Value),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not an administrator")
    ),
    security(("bearer_auth" = []))
)]
pub async fn pending_users(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<PaginationQuery>,
) -> ApiResult<Json<Paginated<PendingActorResponse>>> {
    let options = query.options();
    let (records, total) = state.actors.pending_actors(&actor, &options).await?;
    Ok(Json(Paginated::new(
        records.into_iter().map(Into::into).collect(),
        total,
        &options,
    )))
}

/// Approve or reject a registration. Exactly one decision wins.
#[utoipa::path(
    post,
    path = "/admin/users/{id}/decision",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Actor ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = ActorDecisionResponse),
        (status = 400, description = "Already decided or invalid request"),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Actor not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn decide_user(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    ClientMetadata(metadata): ClientMetadata,
    Path(id): Path<Uuid>,
    Json(request): Json<DecisionRequest>,
) -> ApiResult<Json<ActorDecisionResponse>> {
    request.validate()?;
    let decision = ApprovalDecision::try_from(request)?;
    let record = state
        .actors
        .decide_actor(&actor, ActorId::from_uuid(id), decision, metadata)
        .await?;
    Ok(Json(record.into()))
}

/// Query the audit log in recording order.
#[utoipa::path(
    get,
    path = "/admin/audit",
    tag = "Admin",
    params(AuditQuery),
    responses(
        (status = 200, description = "Page of audit entries", body = serde_json::Value),
        (status = 403, description = "Not an administrator")
    ),
    security(("bearer_auth" = []))
)]
pub async fn audit_log(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Paginated<AuditEntry>>> {
    let options = query.options();
    let (entries, total) = state.audit.query_for(&actor, &query.into()).await?;
    Ok(Json(Paginated::new(entries, total, &options)))
}
