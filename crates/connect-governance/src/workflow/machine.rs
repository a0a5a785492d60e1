//! Pure transition function for workflow documents.
//!
//! Checks run in a fixed order: gate, then input validation, then state.
//! A decision on an already decided document fails on state first, whatever
//! reason accompanies it.
//! Nothing is mutated on failure; on success the caller receives the next
//! version of the document and persists it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::policy::EditPolicy;
use super::WorkflowDocument;
use crate::actor::Actor;
use crate::approval::validate_reason;
use crate::error::{GovernanceError, Result};
use crate::gate::{authorize, Action, FacilityRef, Target};
use crate::types::{WorkflowOutcome, WorkflowStatus};

/// Something that happens to a workflow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// Save wizard progress while in DRAFT.
    SaveDraft {
        content: serde_json::Value,
        draft_step: Option<i32>,
    },
    /// DRAFT → SUBMITTED.
    Submit,
    /// SUBMITTED → APPROVED | CONDITIONAL | DENIED.
    Decide {
        outcome: WorkflowOutcome,
        reason: Option<String>,
    },
    /// Replace content, subject to the kind's edit policy.
    Edit { content: serde_json::Value },
}

impl WorkflowEvent {
    /// Name used in transition errors and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SaveDraft { .. } => "save_draft",
            Self::Submit => "submit",
            Self::Decide { .. } => "decide",
            Self::Edit { .. } => "edit",
        }
    }

    fn action(&self, status: WorkflowStatus) -> Action {
        match self {
            Self::SaveDraft { .. } | Self::Submit => Action::Author,
            Self::Decide { .. } => Action::Decide,
            Self::Edit { .. } if status == WorkflowStatus::Draft => Action::Author,
            Self::Edit { .. } => Action::Write,
        }
    }
}

/// Compute the next version of `doc` for `event`.
///
/// `facility` must describe `doc.facility_id`; `policy` is the edit policy
/// for `doc.kind`.
pub fn transition(
    doc: &WorkflowDocument,
    event: WorkflowEvent,
    actor: &Actor,
    facility: &FacilityRef,
    policy: EditPolicy,
    now: DateTime<Utc>,
) -> Result<WorkflowDocument> {
    debug_assert_eq!(doc.facility_id, facility.facility_id);
    authorize(actor, event.action(doc.status), &Target::Facility(*facility))?;

    let invalid = || GovernanceError::invalid_transition(doc.status, event.name());
    let mut next = doc.clone();

    match &event {
        WorkflowEvent::SaveDraft {
            content,
            draft_step,
        } => {
            if doc.status != WorkflowStatus::Draft {
                return Err(invalid());
            }
            next.content = content.clone();
            if let Some(step) = draft_step {
                if *step < 0 {
                    return Err(GovernanceError::validation(
                        "draft_step",
                        "Draft step cannot be negative",
                    ));
                }
                next.draft_step = *step;
            }
        }
        WorkflowEvent::Submit => {
            if doc.status != WorkflowStatus::Draft {
                return Err(invalid());
            }
            next.status = WorkflowStatus::Submitted;
            next.submitted_at = Some(now);
        }
        WorkflowEvent::Decide { outcome, reason } => {
            if doc.status.is_terminal() {
                return Err(invalid());
            }
            let reason = match (outcome.requires_reason(), reason) {
                (true, Some(r)) => Some(validate_reason(r)?),
                (true, None) => {
                    return Err(GovernanceError::validation(
                        "reason",
                        format!("A reason is required for {outcome}"),
                    ))
                }
                (false, r) => r.as_deref().map(str::trim).filter(|r| !r.is_empty()).map(String::from),
            };
            if doc.status != WorkflowStatus::Submitted {
                return Err(invalid());
            }
            next.status = outcome.status();
            next.decided_by = Some(actor.id());
            next.decided_at = Some(now);
            next.decision_reason = reason;
        }
        WorkflowEvent::Edit { content } => {
            if !policy.allows_edit(doc.status) {
                return Err(invalid());
            }
            next.content = content.clone();
        }
    }

    next.updated_at = now;
    Ok(next)
}
