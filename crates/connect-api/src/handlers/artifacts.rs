//! Compliance artifact handlers.
//!
//! File content travels as standard base64 in JSON bodies. Downloads go
//! through short-lived signed URLs, never through these handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use connect_core::{ArtifactId, FacilityId};
use connect_governance::services::{
    ArtifactScope, ArtifactVersion, ArtifactView, ComplianceArtifact, SignedUrl, UploadInput,
    UploadTarget,
};
use connect_governance::{Actor, ArtifactCategory, DenyReason, GovernanceError};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::ClientMetadata;
use crate::models::{
    ArtifactListQuery, CredentialUploadRequest, NewArtifactUploadRequest, RequestArtifactRequest,
    UploadRequest,
};
use crate::state::ConnectState;

fn decode_upload(request: UploadRequest) -> ApiResult<UploadInput> {
    let bytes = STANDARD
        .decode(request.content_base64.trim())
        .map_err(|_| ApiError::field("content_base64", "Content is not valid base64"))?;
    Ok(UploadInput {
        bytes,
        content_type: request.content_type.trim().to_string(),
        expires_at: if request.no_expiration {
            None
        } else {
            request.expires_at
        },
        no_expiration: request.no_expiration,
    })
}

fn own_profile_scope(actor: &Actor) -> ApiResult<ArtifactScope> {
    actor
        .bhp_profile_id()
        .map(ArtifactScope::BhpProfile)
        .ok_or_else(|| GovernanceError::Forbidden(DenyReason::RoleNotPermitted).into())
}

/// Ask a facility for a document.
#[utoipa::path(
    post,
    path = "/facilities/{id}/artifacts/requests",
    tag = "Artifacts",
    params(("id" = Uuid, Path, description = "Facility ID")),
    request_body = RequestArtifactRequest,
    responses(
        (status = 201, description = "Artifact requested", body = serde_json::Value),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Not the overseeing BHP")
    ),
    security(("bearer_auth" = []))
)]
pub async fn request_artifact(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    ClientMetadata(metadata): ClientMetadata,
    Path(facility_id): Path<Uuid>,
    Json(request): Json<RequestArtifactRequest>,
) -> ApiResult<(StatusCode, Json<ComplianceArtifact>)> {
    request.validate()?;
    let artifact = state
        .artifacts
        .request(
            &actor,
            FacilityId::from_uuid(facility_id),
            request.into(),
            metadata,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(artifact)))
}

/// Upload a new version of an existing or requested artifact.
#[utoipa::path(
    post,
    path = "/artifacts/{id}/upload",
    tag = "Artifacts",
    params(("id" = Uuid, Path, description = "Artifact ID")),
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Version uploaded", body = serde_json::Value),
        (status = 400, description = "Invalid content or expiry"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Artifact not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_artifact(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    ClientMetadata(metadata): ClientMetadata,
    Path(id): Path<Uuid>,
    Json(request): Json<UploadRequest>,
) -> ApiResult<Json<ComplianceArtifact>> {
    request.validate()?;
    let input = decode_upload(request)?;
    let artifact = state
        .artifacts
        .upload(
            &actor,
            UploadTarget::Existing(ArtifactId::from_uuid(id)),
            input,
            metadata,
        )
        .await?;
    Ok(Json(artifact))
}

/// Upload a facility or employee document nobody requested.
#[utoipa::path(
    post,
    path = "/facilities/{id}/artifacts",
    tag = "Artifacts",
    params(("id" = Uuid, Path, description = "Facility ID")),
    request_body = NewArtifactUploadRequest,
    responses(
        (status = 201, description = "Artifact uploaded", body = serde_json::Value),
        (status = 400, description = "Invalid content or category"),
        (status = 403, description = "Access denied")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_facility_artifact(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    ClientMetadata(metadata): ClientMetadata,
    Path(facility_id): Path<Uuid>,
    Json(request): Json<NewArtifactUploadRequest>,
) -> ApiResult<(StatusCode, Json<ComplianceArtifact>)> {
    request.validate()?;
    let target = UploadTarget::New {
        scope: ArtifactScope::Facility(FacilityId::from_uuid(facility_id)),
        category: request.category,
        title: request.title.trim().to_string(),
        employee_name: request.employee_name,
    };
    let input = decode_upload(request.upload)?;
    let artifact = state
        .artifacts
        .upload(&actor, target, input, metadata)
        .await?;
    Ok((StatusCode::CREATED, Json(artifact)))
}

/// Artifacts of a facility with their derived expiry status.
#[utoipa::path(
    get,
    path = "/facilities/{id}/artifacts",
    tag = "Artifacts",
    params(("id" = Uuid, Path, description = "Facility ID"), ArtifactListQuery),
    responses(
        (status = 200, description = "Artifacts", body = serde_json::Value),
        (status = 404, description = "Facility not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_facility_artifacts(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    Path(facility_id): Path<Uuid>,
    Query(query): Query<ArtifactListQuery>,
) -> ApiResult<Json<Vec<ArtifactView>>> {
    let views = state
        .artifacts
        .list(
            &actor,
            ArtifactScope::Facility(FacilityId::from_uuid(facility_id)),
            query.category,
            Utc::now(),
        )
        .await?;
    Ok(Json(views))
}

/// Time-limited download link for the current version.
#[utoipa::path(
    get,
    path = "/artifacts/{id}/url",
    tag = "Artifacts",
    params(("id" = Uuid, Path, description = "Artifact ID")),
    responses(
        (status = 200, description = "Signed URL", body = serde_json::Value),
        (status = 404, description = "Artifact or upload not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn signed_url(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SignedUrl>> {
    let url = state
        .artifacts
        .signed_url(&actor, ArtifactId::from_uuid(id))
        .await?;
    Ok(Json(url))
}

/// Upload history, newest first.
#[utoipa::path(
    get,
    path = "/artifacts/{id}/versions",
    tag = "Artifacts",
    params(("id" = Uuid, Path, description = "Artifact ID")),
    responses(
        (status = 200, description = "Versions", body = serde_json::Value),
        (status = 404, description = "Artifact not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn artifact_versions(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ArtifactVersion>>> {
    let versions = state
        .artifacts
        .versions(&actor, ArtifactId::from_uuid(id))
        .await?;
    Ok(Json(versions))
}

/// Mark an artifact INACTIVE. Stored objects are purged by reconciliation.
#[utoipa::path(
    delete,
    path = "/artifacts/{id}",
    tag = "Artifacts",
    params(("id" = Uuid, Path, description = "Artifact ID")),
    responses(
        (status = 204, description = "Artifact deactivated"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Artifact not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_artifact(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    ClientMetadata(metadata): ClientMetadata,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .artifacts
        .delete(&actor, ArtifactId::from_uuid(id), metadata)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The calling BHP's professional credentials.
#[utoipa::path(
    get,
    path = "/me/credentials",
    tag = "Artifacts",
    responses(
        (status = 200, description = "Credentials", body = serde_json::Value),
        (status = 403, description = "Not a BHP")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_credentials(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<ArtifactView>>> {
    let scope = own_profile_scope(&actor)?;
    let views = state
        .artifacts
        .list(&actor, scope, Some(ArtifactCategory::Credential), Utc::now())
        .await?;
    Ok(Json(views))
}

/// Upload a new professional credential.
#[utoipa::path(
    post,
    path = "/me/credentials",
    tag = "Artifacts",
    request_body = CredentialUploadRequest,
    responses(
        (status = 201, description = "Credential uploaded", body = serde_json::Value),
        (status = 400, description = "Invalid content"),
        (status = 403, description = "Not a BHP")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_credential(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    ClientMetadata(metadata): ClientMetadata,
    Json(request): Json<CredentialUploadRequest>,
) -> ApiResult<(StatusCode, Json<ComplianceArtifact>)> {
    request.validate()?;
    let target = UploadTarget::New {
        scope: own_profile_scope(&actor)?,
        category: ArtifactCategory::Credential,
        title: request.title.trim().to_string(),
        employee_name: None,
    };
    let input = decode_upload(request.upload)?;
    let artifact = state
        .artifacts
        .upload(&actor, target, input, metadata)
        .await?;
    Ok((StatusCode::CREATED, Json(artifact)))
}
