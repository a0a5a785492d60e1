//! PENDING → APPROVED / REJECTED decisions.
//!
//! Shared by actor registration and facility applications. Both are decided
//! exactly once; a rejection must carry a reason.

use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, Result};
use crate::types::ApprovalStatus;

/// Minimum length of a rejection, conditional or denial reason after trimming.
pub const MIN_REASON_LEN: usize = 10;

/// Validate and normalise a decision reason.
pub fn validate_reason(reason: &str) -> Result<String> {
    let trimmed = reason.trim();
    if trimmed.chars().count() < MIN_REASON_LEN {
        return Err(GovernanceError::validation(
            "reason",
            format!("Reason must be at least {MIN_REASON_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// A decision on a pending registration or application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalDecision {
    Approve,
    Reject { reason: String },
}

impl ApprovalDecision {
    /// Status after the decision is applied.
    #[must_use]
    pub fn status(&self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject { .. } => ApprovalStatus::Rejected,
        }
    }

    /// Event name used in transition errors.
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject { .. } => "reject",
        }
    }
}

/// Outcome of a validated decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decided {
    pub status: ApprovalStatus,
    pub reason: Option<String>,
}

/// Apply `decision` to `current`.
///
/// The reason is validated first so a short reason never reaches the store,
/// then the state is checked. Only PENDING may be decided.
pub fn decide(current: ApprovalStatus, decision: &ApprovalDecision) -> Result<Decided> {
    let reason = match decision {
        ApprovalDecision::Approve => None,
        ApprovalDecision::Reject { reason } => Some(validate_reason(reason)?),
    };

    if current != ApprovalStatus::Pending {
        return Err(GovernanceError::invalid_transition(
            current,
            decision.event_name(),
        ));
    }

    Ok(Decided {
        status: decision.status(),
        reason,
    })
}
