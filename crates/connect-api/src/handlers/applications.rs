//! Facility application handlers for the target BHP.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use connect_core::FacilityApplicationId;
use connect_governance::services::FacilityApplication;
use connect_governance::{Actor, ApprovalDecision};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiResult;
use crate::middleware::ClientMetadata;
use crate::models::{ApplicationListQuery, DecisionRequest, Paginated};
use crate::state::ConnectState;

/// Applications addressed to the calling BHP.
#[utoipa::path(
    get,
    path = "/facility-applications",
    tag = "Facility Applications",
    params(ApplicationListQuery),
    responses(
        (status = 200, description = "Applications", body = serde_json::Value),
        (status = 403, description = "Not a BHP")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_applications(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ApplicationListQuery>,
) -> ApiResult<Json<Paginated<FacilityApplication>>> {
    let options = query.options();
    let (items, total) = state
        .facilities
        .list_applications(&actor, query.status, &options)
        .await?;
    Ok(Json(Paginated::new(items, total, &options)))
}

/// Approve or reject an application. Approval creates the facility.
#[utoipa::path(
    post,
    path = "/facility-applications/{id}/decision",
    tag = "Facility Applications",
    params(("id" = Uuid, Path, description = "Facility application ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = serde_json::Value),
        (status = 400, description = "Already decided or invalid request"),
        (status = 403, description = "Not the target BHP"),
        (status = 404, description = "Application not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn decide_application(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    ClientMetadata(metadata): ClientMetadata,
    Path(id): Path<Uuid>,
    Json(request): Json<DecisionRequest>,
) -> ApiResult<Json<FacilityApplication>> {
    request.validate()?;
    let decision = ApprovalDecision::try_from(request)?;
    let application = state
        .facilities
        .decide_application(
            &actor,
            FacilityApplicationId::from_uuid(id),
            decision,
            metadata,
        )
        .await?;
    Ok(Json(application))
}
