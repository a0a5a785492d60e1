//! Append-only audit log.
//!
//! Every accepted state transition is recorded after it commits. Recording
//! is best-effort: a failure is logged at `warn` and handed back to the
//! caller, which drops it explicitly.
//!
//! # Example
//!
//! ```rust,ignore
//! use connect_governance::audit::{AuditAction, AuditInput, AuditRecorder, InMemoryAuditStore};
//! use std::sync::Arc;
//!
//! let recorder = AuditRecorder::new(Arc::new(InMemoryAuditStore::new()));
//! let _ = recorder
//!     .record(AuditInput {
//!         actor_id: Some(admin_id),
//!         action: AuditAction::UserApproved,
//!         entity_type: "User".to_string(),
//!         entity_id: Some(user_id.into_inner()),
//!         ..Default::default()
//!     })
//!     .await;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use connect_core::{ActorId, AuditEntryId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::actor::Actor;
use crate::error::{GovernanceError, Result};
use crate::gate::{authorize, Action, Target};
use crate::types::{WorkflowKind, WorkflowOutcome};

/// Value recorded when request metadata is unavailable.
pub const UNKNOWN: &str = "unknown";

/// Audited action. Closed set, stored as SCREAMING_SNAKE text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    #[default]
    UserRegistered,
    UserApproved,
    UserRejected,
    MfaEnabled,
    FacilityApplicationApproved,
    FacilityApplicationRejected,
    FacilityUpdated,
    IntakeCreated,
    IntakeUpdated,
    IntakeSubmitted,
    IntakeApproved,
    IntakeConditional,
    IntakeDenied,
    AsamCreated,
    AsamUpdated,
    AsamSubmitted,
    AsamApproved,
    AsamConditional,
    AsamDenied,
    ArtifactRequested,
    DocumentUploaded,
    DocumentDeleted,
    DocumentPurged,
    MessageSent,
}

text_enum!(AuditAction {
    UserRegistered => "USER_REGISTERED",
    UserApproved => "USER_APPROVED",
    UserRejected => "USER_REJECTED",
    MfaEnabled => "MFA_ENABLED",
    FacilityApplicationApproved => "FACILITY_APPLICATION_APPROVED",
    FacilityApplicationRejected => "FACILITY_APPLICATION_REJECTED",
    FacilityUpdated => "FACILITY_UPDATED",
    IntakeCreated => "INTAKE_CREATED",
    IntakeUpdated => "INTAKE_UPDATED",
    IntakeSubmitted => "INTAKE_SUBMITTED",
    IntakeApproved => "INTAKE_APPROVED",
    IntakeConditional => "INTAKE_CONDITIONAL",
    IntakeDenied => "INTAKE_DENIED",
    AsamCreated => "ASAM_CREATED",
    AsamUpdated => "ASAM_UPDATED",
    AsamSubmitted => "ASAM_SUBMITTED",
    AsamApproved => "ASAM_APPROVED",
    AsamConditional => "ASAM_CONDITIONAL",
    AsamDenied => "ASAM_DENIED",
    ArtifactRequested => "ARTIFACT_REQUESTED",
    DocumentUploaded => "DOCUMENT_UPLOADED",
    DocumentDeleted => "DOCUMENT_DELETED",
    DocumentPurged => "DOCUMENT_PURGED",
    MessageSent => "MESSAGE_SENT",
});

/// Lifecycle step of a workflow document, for audit naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    Created,
    Updated,
    Submitted,
    Decided(WorkflowOutcome),
}

impl AuditAction {
    /// Audit action for a workflow document step.
    #[must_use]
    pub fn workflow(kind: WorkflowKind, step: WorkflowStep) -> Self {
        use WorkflowOutcome as O;
        match (kind, step) {
            (WorkflowKind::Intake, WorkflowStep::Created) => Self::IntakeCreated,
            (WorkflowKind::Intake, WorkflowStep::Updated) => Self::IntakeUpdated,
            (WorkflowKind::Intake, WorkflowStep::Submitted) => Self::IntakeSubmitted,
            (WorkflowKind::Intake, WorkflowStep::Decided(O::Approved)) => Self::IntakeApproved,
            (WorkflowKind::Intake, WorkflowStep::Decided(O::Conditional)) => {
                Self::IntakeConditional
            }
            (WorkflowKind::Intake, WorkflowStep::Decided(O::Denied)) => Self::IntakeDenied,
            (WorkflowKind::Asam, WorkflowStep::Created) => Self::AsamCreated,
            (WorkflowKind::Asam, WorkflowStep::Updated) => Self::AsamUpdated,
            (WorkflowKind::Asam, WorkflowStep::Submitted) => Self::AsamSubmitted,
            (WorkflowKind::Asam, WorkflowStep::Decided(O::Approved)) => Self::AsamApproved,
            (WorkflowKind::Asam, WorkflowStep::Decided(O::Conditional)) => Self::AsamConditional,
            (WorkflowKind::Asam, WorkflowStep::Decided(O::Denied)) => Self::AsamDenied,
        }
    }
}

/// Caller network metadata captured per request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A recorded audit entry. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    /// `None` for system actions (reconciliation).
    pub actor_id: Option<ActorId>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

/// Input for recording an audit entry.
#[derive(Debug, Clone, Default)]
pub struct AuditInput {
    pub actor_id: Option<ActorId>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    pub metadata: RequestMetadata,
}

/// Filter for audit queries. Results are in recording order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditFilter {
    pub actor_id: Option<ActorId>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AuditFilter {
    fn matches(&self, e: &AuditEntry) -> bool {
        self.actor_id.is_none_or(|id| e.actor_id == Some(id))
            && self.action.is_none_or(|a| e.action == a)
            && self
                .entity_type
                .as_ref()
                .is_none_or(|t| &e.entity_type == t)
            && self.entity_id.is_none_or(|id| e.entity_id == Some(id))
            && self.from.is_none_or(|d| e.created_at >= d)
            && self.to.is_none_or(|d| e.created_at <= d)
    }
}

/// Append-only audit storage.
#[async_trait::async_trait]
pub trait AuditStore: Send + Sync {
    /// Append an entry.
    async fn append(&self, input: AuditInput) -> Result<AuditEntry>;

    /// Query entries in recording order.
    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>>;

    /// Entries matching `filter`, ignoring its limit and offset.
    async fn count_matching(&self, filter: &AuditFilter) -> Result<i64>;
}

/// In-memory audit store for testing.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
    failing: AtomicBool,
}

impl InMemoryAuditStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent append fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of recorded entries.
    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// All entries in recording order.
    pub async fn all(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait::async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, input: AuditInput) -> Result<AuditEntry> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GovernanceError::Storage("audit store unavailable".to_string()));
        }

        let entry = AuditEntry {
            id: AuditEntryId::new(),
            actor_id: input.actor_id,
            action: input.action,
            entity_type: input.entity_type,
            entity_id: input.entity_id,
            details: input.details,
            ip_address: input.metadata.ip_address.unwrap_or_else(|| UNKNOWN.to_string()),
            user_agent: input.metadata.user_agent.unwrap_or_else(|| UNKNOWN.to_string()),
            created_at: Utc::now(),
        };

        self.entries.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| filter.matches(e))
            .skip(filter.offset.unwrap_or(0))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count_matching(&self, filter: &AuditFilter) -> Result<i64> {
        let entries = self.entries.read().await;
        Ok(entries.iter().filter(|e| filter.matches(e)).count() as i64)
    }
}

/// Records audit entries on behalf of the services.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Record an entry. Failures are logged and returned for the caller to drop.
    pub async fn record(&self, input: AuditInput) -> Result<AuditEntry> {
        let action = input.action;
        let entity_id = input.entity_id;
        self.store.append(input).await.inspect_err(|e| {
            tracing::warn!(
                target: "audit",
                action = %action,
                entity_id = ?entity_id,
                error = %e,
                "Failed to record audit entry"
            );
        })
    }

    /// Query the log as `actor`, with the total matching `filter`. Admin only.
    pub async fn query_for(
        &self,
        actor: &Actor,
        filter: &AuditFilter,
    ) -> Result<(Vec<AuditEntry>, i64)> {
        authorize(actor, Action::ViewAdminAggregate, &Target::AdminView)?;
        let entries = self.store.query(filter).await?;
        let total = self.store.count_matching(filter).await?;
        Ok((entries, total))
    }
}
