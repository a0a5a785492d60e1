//! Dashboard models: decisions, workflow documents, artifacts, messages, audit.

use chrono::{DateTime, Utc};
use connect_core::ActorId;
use connect_governance::services::{ArtifactRequest, FacilityUpdate, NewMessage};
use connect_governance::{
    ApprovalDecision, ApprovalStatus, ArtifactCategory, AuditAction, AuditFilter, ListOptions,
    WorkflowKind, WorkflowOutcome, WorkflowStatus,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

// ============================================================================
// Pagination
// ============================================================================

/// Pagination parameters.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PaginationQuery {
    /// Maximum number of results (default: 50, max: 100).
    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<i64>,

    /// Number of results to skip.
    #[param(minimum = 0)]
    pub offset: Option<i64>,
}

impl PaginationQuery {
    #[must_use]
    pub fn options(&self) -> ListOptions {
        ListOptions {
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

/// A page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, options: &ListOptions) -> Self {
        Self {
            items,
            total,
            limit: options.limit,
            offset: options.offset,
        }
    }
}

// ============================================================================
// Approval decisions
// ============================================================================

/// Verdict on a registration or facility application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionKind {
    Approve,
    Reject,
}

/// Approve or reject a pending registration or facility application.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DecisionRequest {
    pub decision: DecisionKind,

    /// Required when rejecting.
    #[validate(length(max = 2000, message = "Reason must not exceed 2000 characters"))]
    pub reason: Option<String>,
}

impl TryFrom<DecisionRequest> for ApprovalDecision {
    type Error = ApiError;

    fn try_from(request: DecisionRequest) -> Result<Self, Self::Error> {
        match request.decision {
            DecisionKind::Approve => Ok(ApprovalDecision::Approve),
            DecisionKind::Reject => match request.reason {
                Some(reason) if !reason.trim().is_empty() => Ok(ApprovalDecision::Reject {
                    reason: reason.trim().to_string(),
                }),
                _ => Err(ApiError::field("reason", "A reason is required when rejecting")),
            },
        }
    }
}

/// Query for facility applications.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ApplicationListQuery {
    /// PENDING, APPROVED or REJECTED.
    #[param(value_type = Option<String>)]
    pub status: Option<ApprovalStatus>,

    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<i64>,

    #[param(minimum = 0)]
    pub offset: Option<i64>,
}

impl ApplicationListQuery {
    #[must_use]
    pub fn options(&self) -> ListOptions {
        PaginationQuery {
            limit: self.limit,
            offset: self.offset,
        }
        .options()
    }
}

// ============================================================================
// Facilities
// ============================================================================

/// Update a facility's descriptive fields.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateFacilityRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Address must not exceed 500 characters"))]
    pub address: Option<String>,
}

impl From<UpdateFacilityRequest> for FacilityUpdate {
    fn from(request: UpdateFacilityRequest) -> Self {
        Self {
            name: request.name,
            address: request.address,
        }
    }
}

// ============================================================================
// Workflow documents
// ============================================================================

/// Start an Intake or ASAM draft.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDocumentRequest {
    /// INTAKE or ASAM.
    #[schema(value_type = String, example = "INTAKE")]
    pub kind: WorkflowKind,

    /// Existing resident. A new resident is created when absent.
    pub subject_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255, message = "Subject name must be 1-255 characters"))]
    pub subject_name: String,

    /// Initial form content.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub content: serde_json::Value,
}

/// Query for workflow documents of a facility.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct DocumentListQuery {
    /// INTAKE or ASAM.
    #[param(value_type = Option<String>)]
    pub kind: Option<WorkflowKind>,

    /// DRAFT, SUBMITTED, APPROVED, CONDITIONAL or DENIED.
    #[param(value_type = Option<String>)]
    pub status: Option<WorkflowStatus>,

    pub subject_id: Option<Uuid>,

    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<i64>,

    #[param(minimum = 0)]
    pub offset: Option<i64>,
}

impl DocumentListQuery {
    #[must_use]
    pub fn options(&self) -> ListOptions {
        PaginationQuery {
            limit: self.limit,
            offset: self.offset,
        }
        .options()
    }
}

/// Save a draft, or edit a decided document where policy allows.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SaveDocumentRequest {
    #[schema(value_type = Object)]
    pub content: serde_json::Value,

    /// Wizard step reached. Drafts only.
    pub draft_step: Option<i32>,
}

/// Decide a submitted document.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DocumentDecisionRequest {
    /// APPROVED, CONDITIONAL or DENIED.
    #[schema(value_type = String, example = "APPROVED")]
    pub outcome: WorkflowOutcome,

    /// Required for CONDITIONAL and DENIED.
    #[validate(length(max = 2000, message = "Reason must not exceed 2000 characters"))]
    pub reason: Option<String>,
}

// ============================================================================
// Compliance artifacts
// ============================================================================

/// Ask a facility for a document.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RequestArtifactRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    /// FACILITY_DOCUMENT or EMPLOYEE_DOCUMENT.
    #[schema(value_type = String, example = "FACILITY_DOCUMENT")]
    pub category: ArtifactCategory,

    #[validate(length(max = 255, message = "Employee name must not exceed 255 characters"))]
    pub employee_name: Option<String>,
}

impl From<RequestArtifactRequest> for ArtifactRequest {
    fn from(request: RequestArtifactRequest) -> Self {
        Self {
            title: request.title,
            category: request.category,
            employee_name: request.employee_name,
        }
    }
}

/// File content and expiry of an upload.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UploadRequest {
    /// Standard base64 of the file bytes.
    #[validate(length(min = 1, message = "File content is required"))]
    pub content_base64: String,

    #[validate(length(min = 1, max = 255, message = "Content type is required"))]
    pub content_type: String,

    pub expires_at: Option<DateTime<Utc>>,

    /// Set for documents that never expire. `expires_at` is ignored then.
    #[serde(default)]
    pub no_expiration: bool,
}

/// Upload a brand new artifact.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewArtifactUploadRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[schema(value_type = String, example = "EMPLOYEE_DOCUMENT")]
    pub category: ArtifactCategory,

    #[validate(length(max = 255, message = "Employee name must not exceed 255 characters"))]
    pub employee_name: Option<String>,

    #[serde(flatten)]
    #[validate(nested)]
    pub upload: UploadRequest,
}

/// Upload a professional credential to the caller's BHP profile.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CredentialUploadRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[serde(flatten)]
    #[validate(nested)]
    pub upload: UploadRequest,
}

/// Query for artifact listings.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ArtifactListQuery {
    /// Restrict to one category.
    #[param(value_type = Option<String>)]
    pub category: Option<ArtifactCategory>,
}

// ============================================================================
// Messages
// ============================================================================

/// Send a message within a facility relationship.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SendMessageRequest {
    pub facility_id: Uuid,

    /// Defaults to the facility's counterpart.
    pub recipient_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255, message = "Subject must be 1-255 characters"))]
    pub subject: String,

    #[validate(length(min = 1, max = 10000, message = "Body must be 1-10000 characters"))]
    pub body: String,
}

impl SendMessageRequest {
    #[must_use]
    pub fn into_message(self) -> NewMessage {
        NewMessage {
            recipient_id: self.recipient_id.map(ActorId::from_uuid),
            subject: self.subject,
            body: self.body,
        }
    }
}

/// Query for the inbox.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,

    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<i64>,

    #[param(minimum = 0)]
    pub offset: Option<i64>,
}

impl InboxQuery {
    #[must_use]
    pub fn options(&self) -> ListOptions {
        PaginationQuery {
            limit: self.limit,
            offset: self.offset,
        }
        .options()
    }
}

/// Unread message count.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

// ============================================================================
// Audit
// ============================================================================

/// Audit log query.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AuditQuery {
    pub actor_id: Option<Uuid>,

    /// Audit action, e.g. USER_APPROVED.
    #[param(value_type = Option<String>)]
    pub action: Option<AuditAction>,

    pub entity_type: Option<String>,

    pub entity_id: Option<Uuid>,

    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,

    /// Inclusive upper bound.
    pub to: Option<DateTime<Utc>>,

    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<i64>,

    #[param(minimum = 0)]
    pub offset: Option<i64>,
}

impl AuditQuery {
    #[must_use]
    pub fn options(&self) -> ListOptions {
        PaginationQuery {
            limit: self.limit,
            offset: self.offset,
        }
        .options()
    }
}

impl From<AuditQuery> for AuditFilter {
    fn from(query: AuditQuery) -> Self {
        let options = query.options();
        Self {
            actor_id: query.actor_id.map(ActorId::from_uuid),
            action: query.action,
            entity_type: query.entity_type,
            entity_id: query.entity_id,
            from: query.from,
            to: query.to,
            limit: usize::try_from(options.limit).ok(),
            offset: usize::try_from(options.offset).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_is_clamped() {
        let options = PaginationQuery {
            limit: Some(10_000),
            offset: Some(-5),
        }
        .options();
        assert_eq!(options.limit, MAX_LIMIT);
        assert_eq!(options.offset, 0);
        assert_eq!(PaginationQuery::default().options().limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_reject_requires_reason() {
        let err = ApprovalDecision::try_from(DecisionRequest {
            decision: DecisionKind::Reject,
            reason: Some("   ".to_string()),
        })
        .unwrap_err();
        assert!(err.to_string().contains("reason"));

        let ok = ApprovalDecision::try_from(DecisionRequest {
            decision: DecisionKind::Reject,
            reason: Some(" incomplete license ".to_string()),
        })
        .unwrap();
        assert_eq!(
            ok,
            ApprovalDecision::Reject {
                reason: "incomplete license".to_string()
            }
        );
    }

    #[test]
    fn test_decision_body_uses_uppercase() {
        let request: DecisionRequest =
            serde_json::from_str(r#"{"decision":"APPROVE"}"#).unwrap();
        assert_eq!(request.decision, DecisionKind::Approve);
        assert!(serde_json::from_str::<DecisionRequest>(r#"{"decision":"approve"}"#).is_err());
    }
}
