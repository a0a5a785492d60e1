//! Workflow documents (Intake, ASAM assessment).
//!
//! A document belongs to one facility and one subject (resident). It is
//! authored by the facility's BHRF and decided by the facility's BHP:
//!
//! ```text
//! DRAFT --submit--> SUBMITTED --decide--> APPROVED | CONDITIONAL | DENIED
//! ```
//!
//! [`machine::transition`] is the pure transition function; the service
//! layer persists its result with a compare-and-set on the prior status.

pub mod machine;
pub mod policy;

use chrono::{DateTime, Utc};
use connect_core::{ActorId, FacilityId, FacilityScoped, SubjectId, WorkflowDocumentId};
use serde::{Deserialize, Serialize};

use crate::types::{WorkflowKind, WorkflowStatus};

pub use machine::{transition, WorkflowEvent};
pub use policy::{EditPolicies, EditPolicy};

/// An Intake or ASAM assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    pub id: WorkflowDocumentId,
    pub kind: WorkflowKind,
    pub facility_id: FacilityId,
    /// Resident the document is about.
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub status: WorkflowStatus,
    /// Last wizard step saved by the author.
    pub draft_step: i32,
    /// Form content, opaque to the workflow.
    pub content: serde_json::Value,
    pub author_id: ActorId,
    pub submitted_at: Option<DateTime<Utc>>,
    pub decided_by: Option<ActorId>,
    pub decided_at: Option<DateTime<Utc>>,
    /// Required for CONDITIONAL and DENIED.
    pub decision_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDocument {
    /// A fresh draft.
    #[must_use]
    pub fn new_draft(
        kind: WorkflowKind,
        facility_id: FacilityId,
        subject_id: SubjectId,
        subject_name: impl Into<String>,
        author_id: ActorId,
        content: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: WorkflowDocumentId::new(),
            kind,
            facility_id,
            subject_id,
            subject_name: subject_name.into(),
            status: WorkflowStatus::Draft,
            draft_step: 0,
            content,
            author_id,
            submitted_at: None,
            decided_by: None,
            decided_at: None,
            decision_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl FacilityScoped for WorkflowDocument {
    fn facility_id(&self) -> FacilityId {
        self.facility_id
    }
}
