//! Per-kind edit policy for workflow documents.

use serde::{Deserialize, Serialize};

use crate::types::{WorkflowKind, WorkflowStatus};

/// Whether a document of a given kind may be edited once it left DRAFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPolicy {
    pub editable_after_submit: bool,
    pub editable_after_decision: bool,
}

impl EditPolicy {
    /// Whether content may change in `status`. Drafts are always editable.
    #[must_use]
    pub fn allows_edit(&self, status: WorkflowStatus) -> bool {
        match status {
            WorkflowStatus::Draft => true,
            WorkflowStatus::Submitted => self.editable_after_submit,
            WorkflowStatus::Approved | WorkflowStatus::Conditional | WorkflowStatus::Denied => {
                self.editable_after_decision
            }
        }
    }
}

/// Edit policies for every workflow kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPolicies {
    pub intake: EditPolicy,
    pub asam: EditPolicy,
}

impl Default for EditPolicies {
    fn default() -> Self {
        Self {
            intake: EditPolicy {
                editable_after_submit: false,
                editable_after_decision: false,
            },
            asam: EditPolicy {
                editable_after_submit: true,
                editable_after_decision: true,
            },
        }
    }
}

impl EditPolicies {
    #[must_use]
    pub fn for_kind(&self, kind: WorkflowKind) -> EditPolicy {
        match kind {
            WorkflowKind::Intake => self.intake,
            WorkflowKind::Asam => self.asam,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intake_is_locked_after_submit() {
        let policy = EditPolicies::default().for_kind(WorkflowKind::Intake);
        assert!(policy.allows_edit(WorkflowStatus::Draft));
        assert!(!policy.allows_edit(WorkflowStatus::Submitted));
        assert!(!policy.allows_edit(WorkflowStatus::Approved));
    }

    #[test]
    fn test_default_asam_stays_editable() {
        let policy = EditPolicies::default().for_kind(WorkflowKind::Asam);
        assert!(policy.allows_edit(WorkflowStatus::Submitted));
        assert!(policy.allows_edit(WorkflowStatus::Conditional));
    }
}
