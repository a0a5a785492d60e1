//! Workflow document service.
//!
//! Loads a document, runs [`transition`], and persists the result with a
//! compare-and-set on the status it was loaded in. Of two concurrent
//! decisions exactly one wins; the other reloads, sees the terminal state
//! and fails with `InvalidTransition`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use connect_core::{FacilityId, SubjectId, WorkflowDocumentId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::directory::DirectoryStore;
use super::ListOptions;
use crate::actor::Actor;
use crate::audit::{AuditAction, AuditInput, AuditRecorder, RequestMetadata, WorkflowStep};
use crate::error::{GovernanceError, Result};
use crate::gate::{authorize_visible, Action, FacilityRef, Target};
use crate::types::{WorkflowKind, WorkflowOutcome, WorkflowStatus};
use crate::workflow::{transition, EditPolicies, WorkflowDocument, WorkflowEvent};

// ============================================================================
// Domain Types
// ============================================================================

/// Input for creating a draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkflowDocument {
    pub kind: WorkflowKind,
    /// Existing resident; a new one is minted when absent.
    pub subject_id: Option<SubjectId>,
    pub subject_name: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

/// Filter options for listing workflow documents.
#[derive(Debug, Clone, Default)]
pub struct WorkflowFilter {
    pub facility_id: Option<FacilityId>,
    pub kind: Option<WorkflowKind>,
    pub subject_id: Option<SubjectId>,
    pub status: Option<WorkflowStatus>,
}

impl WorkflowFilter {
    fn matches(&self, d: &WorkflowDocument) -> bool {
        self.facility_id.is_none_or(|id| d.facility_id == id)
            && self.kind.is_none_or(|k| d.kind == k)
            && self.subject_id.is_none_or(|id| d.subject_id == id)
            && self.status.is_none_or(|s| d.status == s)
    }
}

/// Whether `a` and `b` compete for the single active slot: same facility,
/// kind and subject.
#[must_use]
pub fn same_active_slot(a: &WorkflowDocument, b: &WorkflowDocument) -> bool {
    a.facility_id == b.facility_id && a.kind == b.kind && a.subject_id == b.subject_id
}

/// The error both stores return when a second document would become active
/// for one subject of a facility.
#[must_use]
pub fn active_document_conflict(kind: WorkflowKind) -> GovernanceError {
    GovernanceError::Conflict(format!(
        "An active {} already exists for this subject",
        kind.label()
    ))
}

// ============================================================================
// Store Trait
// ============================================================================

/// Storage backend for workflow documents.
#[async_trait::async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Insert `doc` unless an active document of the same kind exists for
    /// the same subject in the same facility. Returns `false` when one does.
    async fn insert_if_no_active(&self, doc: &WorkflowDocument) -> Result<bool>;

    async fn get(&self, id: WorkflowDocumentId) -> Result<Option<WorkflowDocument>>;

    /// Most recently updated first.
    async fn list(
        &self,
        filter: &WorkflowFilter,
        options: &ListOptions,
    ) -> Result<Vec<WorkflowDocument>>;

    async fn count(&self, filter: &WorkflowFilter) -> Result<i64>;

    /// Replace `doc` if its stored status still equals `expected`.
    ///
    /// Returns `None` when the status moved on. Fails with
    /// [`active_document_conflict`] when `doc` would become a second active
    /// document in its slot.
    async fn replace(
        &self,
        doc: &WorkflowDocument,
        expected: WorkflowStatus,
    ) -> Result<Option<WorkflowDocument>>;
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

/// In-memory workflow store for testing.
#[derive(Debug, Default, Clone)]
pub struct InMemoryWorkflowStore {
    documents: Arc<RwLock<HashMap<WorkflowDocumentId, WorkflowDocument>>>,
}

impl InMemoryWorkflowStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn insert_if_no_active(&self, doc: &WorkflowDocument) -> Result<bool> {
        let mut documents = self.documents.write().await;
        let blocked = documents
            .values()
            .any(|d| same_active_slot(d, doc) && d.status.is_active());
        if blocked {
            return Ok(false);
        }
        documents.insert(doc.id, doc.clone());
        Ok(true)
    }

    async fn get(&self, id: WorkflowDocumentId) -> Result<Option<WorkflowDocument>> {
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &WorkflowFilter,
        options: &ListOptions,
    ) -> Result<Vec<WorkflowDocument>> {
        let documents = self.documents.read().await;
        let mut results: Vec<_> = documents
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(results
            .into_iter()
            .skip(options.offset as usize)
            .take(options.limit as usize)
            .collect())
    }

    async fn count(&self, filter: &WorkflowFilter) -> Result<i64> {
        let documents = self.documents.read().await;
        Ok(documents.values().filter(|d| filter.matches(d)).count() as i64)
    }

    async fn replace(
        &self,
        doc: &WorkflowDocument,
        expected: WorkflowStatus,
    ) -> Result<Option<WorkflowDocument>> {
        let mut documents = self.documents.write().await;
        if documents.get(&doc.id).map(|d| d.status) != Some(expected) {
            return Ok(None);
        }
        if doc.status.is_active()
            && documents
                .values()
                .any(|d| d.id != doc.id && same_active_slot(d, doc) && d.status.is_active())
        {
            return Err(active_document_conflict(doc.kind));
        }
        documents.insert(doc.id, doc.clone());
        Ok(Some(doc.clone()))
    }
}

// ============================================================================
// Service
// ============================================================================

/// Service for Intake and ASAM documents.
pub struct WorkflowService {
    store: Arc<dyn WorkflowStore>,
    directory: Arc<dyn DirectoryStore>,
    audit: AuditRecorder,
    policies: EditPolicies,
}

impl WorkflowService {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        directory: Arc<dyn DirectoryStore>,
        audit: AuditRecorder,
        policies: EditPolicies,
    ) -> Self {
        Self {
            store,
            directory,
            audit,
            policies,
        }
    }

    async fn facility_ref(&self, id: FacilityId) -> Result<FacilityRef> {
        self.directory
            .get_facility(id)
            .await?
            .map(|f| f.gate_ref())
            .ok_or_else(|| GovernanceError::not_found("Facility", id))
    }

    async fn load(
        &self,
        actor: &Actor,
        id: WorkflowDocumentId,
        action: Action,
    ) -> Result<(WorkflowDocument, FacilityRef)> {
        let doc = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| GovernanceError::not_found("WorkflowDocument", id))?;
        let facility = self.facility_ref(doc.facility_id).await?;
        authorize_visible(actor, action, &Target::Facility(facility), "WorkflowDocument", id)?;
        Ok((doc, facility))
    }

    async fn record(
        &self,
        actor: &Actor,
        doc: &WorkflowDocument,
        step: WorkflowStep,
        metadata: RequestMetadata,
    ) {
        let _ = self
            .audit
            .record(AuditInput {
                actor_id: Some(actor.id()),
                action: AuditAction::workflow(doc.kind, step),
                entity_type: doc.kind.label().to_string(),
                entity_id: Some(doc.id.into_inner()),
                details: Some(serde_json::json!({
                    "facility_id": doc.facility_id,
                    "subject_id": doc.subject_id,
                    "status": doc.status,
                    "reason": doc.decision_reason,
                })),
                metadata,
            })
            .await;
    }

    /// Start a draft. Refused while an active document of the same kind
    /// exists for the subject in this facility. Other facilities' subjects
    /// never collide with this one.
    pub async fn create_draft(
        &self,
        actor: &Actor,
        facility_id: FacilityId,
        input: NewWorkflowDocument,
        metadata: RequestMetadata,
    ) -> Result<WorkflowDocument> {
        if input.subject_name.trim().is_empty() {
            return Err(GovernanceError::validation("subject_name", "Must not be empty"));
        }
        let facility = self.facility_ref(facility_id).await?;
        authorize_visible(
            actor,
            Action::Author,
            &Target::Facility(facility),
            "Facility",
            facility_id,
        )?;

        let content = if input.content.is_null() {
            serde_json::json!({})
        } else {
            input.content
        };
        let doc = WorkflowDocument::new_draft(
            input.kind,
            facility_id,
            input.subject_id.unwrap_or_default(),
            input.subject_name.trim(),
            actor.id(),
            content,
            Utc::now(),
        );

        if !self.store.insert_if_no_active(&doc).await? {
            return Err(active_document_conflict(doc.kind));
        }

        tracing::info!(
            actor_id = %actor.id(),
            document_id = %doc.id,
            kind = %doc.kind,
            facility_id = %facility_id,
            "Workflow draft created"
        );
        self.record(actor, &doc, WorkflowStep::Created, metadata).await;
        Ok(doc)
    }

    /// Read a document. Documents outside the actor's facilities are not found.
    pub async fn get(&self, actor: &Actor, id: WorkflowDocumentId) -> Result<WorkflowDocument> {
        Ok(self.load(actor, id, Action::Read).await?.0)
    }

    /// Documents of a facility, with the total matching `filter`.
    pub async fn list(
        &self,
        actor: &Actor,
        facility_id: FacilityId,
        mut filter: WorkflowFilter,
        options: &ListOptions,
    ) -> Result<(Vec<WorkflowDocument>, i64)> {
        let facility = self.facility_ref(facility_id).await?;
        authorize_visible(
            actor,
            Action::Read,
            &Target::Facility(facility),
            "Facility",
            facility_id,
        )?;
        filter.facility_id = Some(facility_id);
        let items = self.store.list(&filter, options).await?;
        let total = self.store.count(&filter).await?;
        Ok((items, total))
    }

    async fn apply(
        &self,
        actor: &Actor,
        id: WorkflowDocumentId,
        event: WorkflowEvent,
    ) -> Result<WorkflowDocument> {
        let (doc, facility) = self.load(actor, id, Action::Read).await?;
        let event_name = event.name();
        let next = transition(
            &doc,
            event,
            actor,
            &facility,
            self.policies.for_kind(doc.kind),
            Utc::now(),
        )?;

        match self.store.replace(&next, doc.status).await? {
            Some(saved) => Ok(saved),
            None => {
                let current = self
                    .store
                    .get(id)
                    .await?
                    .map_or(doc.status, |d| d.status);
                tracing::info!(
                    document_id = %id,
                    event = event_name,
                    status = %current,
                    "Lost concurrent workflow transition"
                );
                Err(GovernanceError::invalid_transition(current, event_name))
            }
        }
    }

    /// Save wizard progress on a draft.
    pub async fn save_draft(
        &self,
        actor: &Actor,
        id: WorkflowDocumentId,
        content: serde_json::Value,
        draft_step: Option<i32>,
        metadata: RequestMetadata,
    ) -> Result<WorkflowDocument> {
        let doc = self
            .apply(actor, id, WorkflowEvent::SaveDraft { content, draft_step })
            .await?;
        self.record(actor, &doc, WorkflowStep::Updated, metadata).await;
        Ok(doc)
    }

    /// Replace content outside the draft flow, subject to the kind's edit policy.
    pub async fn edit(
        &self,
        actor: &Actor,
        id: WorkflowDocumentId,
        content: serde_json::Value,
        metadata: RequestMetadata,
    ) -> Result<WorkflowDocument> {
        let doc = self.apply(actor, id, WorkflowEvent::Edit { content }).await?;
        self.record(actor, &doc, WorkflowStep::Updated, metadata).await;
        Ok(doc)
    }

    /// DRAFT → SUBMITTED. Refused with a conflict while another document of
    /// the same kind is active for the subject.
    pub async fn submit(
        &self,
        actor: &Actor,
        id: WorkflowDocumentId,
        metadata: RequestMetadata,
    ) -> Result<WorkflowDocument> {
        let doc = self.apply(actor, id, WorkflowEvent::Submit).await?;
        tracing::info!(actor_id = %actor.id(), document_id = %id, kind = %doc.kind, "Workflow submitted");
        self.record(actor, &doc, WorkflowStep::Submitted, metadata).await;
        Ok(doc)
    }

    /// SUBMITTED → APPROVED | CONDITIONAL | DENIED, once.
    pub async fn decide(
        &self,
        actor: &Actor,
        id: WorkflowDocumentId,
        outcome: WorkflowOutcome,
        reason: Option<String>,
        metadata: RequestMetadata,
    ) -> Result<WorkflowDocument> {
        let doc = self
            .apply(actor, id, WorkflowEvent::Decide { outcome, reason })
            .await?;
        tracing::info!(
            actor_id = %actor.id(),
            document_id = %id,
            kind = %doc.kind,
            outcome = %outcome,
            "Workflow decided"
        );
        self.record(actor, &doc, WorkflowStep::Decided(outcome), metadata)
            .await;
        Ok(doc)
    }
}
