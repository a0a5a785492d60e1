//! Facility handlers.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use connect_core::FacilityId;
use connect_governance::services::Facility;
use connect_governance::{Action, Actor};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiResult;
use crate::middleware::ClientMetadata;
use crate::models::UpdateFacilityRequest;
use crate::state::ConnectState;

/// Facilities visible to the caller.
#[utoipa::path(
    get,
    path = "/facilities",
    tag = "Facilities",
    responses(
        (status = 200, description = "Facilities", body = serde_json::Value),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_facilities(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<Facility>>> {
    Ok(Json(state.facilities.list(&actor).await?))
}

#[utoipa::path(
    get,
    path = "/facilities/{id}",
    tag = "Facilities",
    params(("id" = Uuid, Path, description = "Facility ID")),
    responses(
        (status = 200, description = "Facility", body = serde_json::Value),
        (status = 404, description = "Facility not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_facility(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Facility>> {
    let facility = state
        .facilities
        .load_for(&actor, FacilityId::from_uuid(id), Action::Read)
        .await?;
    Ok(Json(facility))
}

/// Rename a facility or change its address.
#[utoipa::path(
    put,
    path = "/facilities/{id}",
    tag = "Facilities",
    params(("id" = Uuid, Path, description = "Facility ID")),
    request_body = UpdateFacilityRequest,
    responses(
        (status = 200, description = "Facility updated", body = serde_json::Value),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Facility not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_facility(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    ClientMetadata(metadata): ClientMetadata,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateFacilityRequest>,
) -> ApiResult<Json<Facility>> {
    request.validate()?;
    let facility = state
        .facilities
        .update(&actor, FacilityId::from_uuid(id), request.into(), metadata)
        .await?;
    Ok(Json(facility))
}
