//! Intake and ASAM document handlers.
//!
//! The facility's BHRF drafts and submits; only the overseeing BHP decides.
//! Transitions are enforced by the workflow machine.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use connect_core::{ConnectError, FacilityId, SubjectId, WorkflowDocumentId};
use connect_governance::services::{NewWorkflowDocument, WorkflowFilter};
use connect_governance::{Actor, WorkflowDocument, WorkflowStatus};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::ClientMetadata;
use crate::models::{
    CreateDocumentRequest, DocumentDecisionRequest, DocumentListQuery, Paginated,
    SaveDocumentRequest,
};
use crate::state::ConnectState;

/// Start a draft for a resident of the facility.
#[utoipa::path(
    post,
    path = "/facilities/{id}/documents",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Facility ID")),
    request_body = CreateDocumentRequest,
    responses(
        (status = 201, description = "Draft created", body = serde_json::Value),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Facility not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_document(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    ClientMetadata(metadata): ClientMetadata,
    Path(facility_id): Path<Uuid>,
    Json(request): Json<CreateDocumentRequest>,
) -> ApiResult<(StatusCode, Json<WorkflowDocument>)> {
    request.validate()?;
    let doc = state
        .workflows
        .create_draft(
            &actor,
            FacilityId::from_uuid(facility_id),
            NewWorkflowDocument {
                kind: request.kind,
                subject_id: request.subject_id.map(SubjectId::from_uuid),
                subject_name: request.subject_name.trim().to_string(),
                content: request.content,
            },
            metadata,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

/// Documents of a facility, most recently updated first.
#[utoipa::path(
    get,
    path = "/facilities/{id}/documents",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Facility ID"), DocumentListQuery),
    responses(
        (status = 200, description = "Documents", body = serde_json::Value),
        (status = 404, description = "Facility not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_documents(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    Path(facility_id): Path<Uuid>,
    Query(query): Query<DocumentListQuery>,
) -> ApiResult<Json<Paginated<WorkflowDocument>>> {
    let options = query.options();
    let filter = WorkflowFilter {
        kind: query.kind,
        status: query.status,
        subject_id: query.subject_id.map(SubjectId::from_uuid),
        ..Default::default()
    };
    let (items, total) = state
        .workflows
        .list(&actor, FacilityId::from_uuid(facility_id), filter, &options)
        .await?;
    Ok(Json(Paginated::new(items, total, &options)))
}

#[utoipa::path(
    get,
    path = "/documents/{id}",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document", body = serde_json::Value),
        (status = 404, description = "Document not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_document(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WorkflowDocument>> {
    let doc = state
        .workflows
        .get(&actor, WorkflowDocumentId::from_uuid(id))
        .await?;
    Ok(Json(doc))
}

/// Save a draft, or edit a decided document when its edit policy allows.
#[utoipa::path(
    put,
    path = "/documents/{id}",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body = SaveDocumentRequest,
    responses(
        (status = 200, description = "Document saved", body = serde_json::Value),
        (status = 400, description = "Edit not allowed in the current state"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Document not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn save_document(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    ClientMetadata(metadata): ClientMetadata,
    Path(id): Path<Uuid>,
    Json(request): Json<SaveDocumentRequest>,
) -> ApiResult<Json<WorkflowDocument>> {
    let id = WorkflowDocumentId::from_uuid(id);
    let current = state.workflows.get(&actor, id).await?;

    let doc = if current.status == WorkflowStatus::Draft {
        state
            .workflows
            .save_draft(&actor, id, request.content, request.draft_step, metadata)
            .await?
    } else {
        state
            .workflows
            .edit(&actor, id, request.content, metadata)
            .await?
    };
    Ok(Json(doc))
}

#[utoipa::path(
    post,
    path = "/documents/{id}/submit",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document submitted", body = serde_json::Value),
        (status = 400, description = "Not a draft"),
        (status = 409, description = "Resident already has an active document of this kind")
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_document(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    ClientMetadata(metadata): ClientMetadata,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WorkflowDocument>> {
    let doc = state
        .workflows
        .submit(&actor, WorkflowDocumentId::from_uuid(id), metadata)
        .await?;
    Ok(Json(doc))
}

/// Decide a submitted document. CONDITIONAL and DENIED need a reason.
#[utoipa::path(
    post,
    path = "/documents/{id}/decision",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body = DocumentDecisionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = serde_json::Value),
        (status = 400, description = "Not submitted or reason missing"),
        (status = 403, description = "Not the overseeing BHP")
    ),
    security(("bearer_auth" = []))
)]
pub async fn decide_document(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    ClientMetadata(metadata): ClientMetadata,
    Path(id): Path<Uuid>,
    Json(request): Json<DocumentDecisionRequest>,
) -> ApiResult<Json<WorkflowDocument>> {
    request.validate()?;
    let doc = state
        .workflows
        .decide(
            &actor,
            WorkflowDocumentId::from_uuid(id),
            request.outcome,
            request.reason,
            metadata,
        )
        .await?;
    Ok(Json(doc))
}

/// Render a document through the configured PDF renderer.
#[utoipa::path(
    get,
    path = "/documents/{id}/pdf",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "PDF export"),
        (status = 404, description = "Document not found or rendering not configured")
    ),
    security(("bearer_auth" = []))
)]
pub async fn export_document(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let doc = state
        .workflows
        .get(&actor, WorkflowDocumentId::from_uuid(id))
        .await?;
    let renderer = state.renderer.as_ref().ok_or_else(|| {
        ApiError::Connect(ConnectError::NotFound {
            resource: "PdfRenderer".to_string(),
            id: None,
        })
    })?;

    let data = serde_json::to_value(&doc)
        .map_err(|e| ApiError::Connect(ConnectError::Internal { message: e.to_string() }))?;
    let template = doc.kind.as_str().to_ascii_lowercase();
    let bytes = renderer.render(&template, &data).await?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes))
}
