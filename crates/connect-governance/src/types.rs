//! Type definitions for the governance domain.
//!
//! Closed enums for every status and classification the system stores.
//! Each one round-trips through the uppercase text form used in storage
//! and on the wire.

use serde::{Deserialize, Serialize};

// ============================================================================
// Identity
// ============================================================================

/// Account role. Closed set; adding a role is a compile-time change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Bhp,
    Bhrf,
}

text_enum!(Role {
    Admin => "ADMIN",
    Bhp => "BHP",
    Bhrf => "BHRF",
});

/// Registration approval status of an actor, also used for facility applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(ApprovalStatus {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

impl ApprovalStatus {
    /// Terminal states accept no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

// ============================================================================
// Workflow documents
// ============================================================================

/// Kind of workflow document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowKind {
    Intake,
    Asam,
}

text_enum!(WorkflowKind {
    Intake => "INTAKE",
    Asam => "ASAM",
});

impl WorkflowKind {
    /// Human-readable label used in audit entity types.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Intake => "Intake",
            Self::Asam => "AsamAssessment",
        }
    }
}

/// Lifecycle state of a workflow document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Draft,
    Submitted,
    Approved,
    Conditional,
    Denied,
}

text_enum!(WorkflowStatus {
    Draft => "DRAFT",
    Submitted => "SUBMITTED",
    Approved => "APPROVED",
    Conditional => "CONDITIONAL",
    Denied => "DENIED",
});

impl WorkflowStatus {
    /// States that block a new document of the same kind for the same subject.
    pub const ACTIVE: &'static [WorkflowStatus] = &[
        WorkflowStatus::Submitted,
        WorkflowStatus::Approved,
        WorkflowStatus::Conditional,
    ];

    /// Decided states.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Conditional | Self::Denied)
    }

    /// Whether this state counts as an active decision.
    #[must_use]
    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

/// Outcome chosen by the deciding BHP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowOutcome {
    Approved,
    Conditional,
    Denied,
}

text_enum!(WorkflowOutcome {
    Approved => "APPROVED",
    Conditional => "CONDITIONAL",
    Denied => "DENIED",
});

impl WorkflowOutcome {
    /// Resulting document status.
    #[must_use]
    pub fn status(&self) -> WorkflowStatus {
        match self {
            Self::Approved => WorkflowStatus::Approved,
            Self::Conditional => WorkflowStatus::Conditional,
            Self::Denied => WorkflowStatus::Denied,
        }
    }

    /// Conditional and denied outcomes must carry a reason.
    #[must_use]
    pub fn requires_reason(&self) -> bool {
        !matches!(self, Self::Approved)
    }
}

// ============================================================================
// Compliance artifacts
// ============================================================================

/// What a compliance artifact is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactCategory {
    /// Facility-level document (license, inspection report).
    FacilityDocument,
    /// Document about a facility employee (CPR card, background check).
    EmployeeDocument,
    /// BHP professional credential.
    Credential,
}

text_enum!(ArtifactCategory {
    FacilityDocument => "FACILITY_DOCUMENT",
    EmployeeDocument => "EMPLOYEE_DOCUMENT",
    Credential => "CREDENTIAL",
});

impl ArtifactCategory {
    /// Credentials hang off a BHP profile; everything else off a facility.
    #[must_use]
    pub fn is_profile_scoped(&self) -> bool {
        matches!(self, Self::Credential)
    }
}

/// Stored lifecycle state of a compliance artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactState {
    /// Requested by the BHP, nothing uploaded yet.
    Requested,
    /// At least one version uploaded.
    Uploaded,
    /// Deleted by a user, awaiting reconciliation.
    Inactive,
}

text_enum!(ArtifactState {
    Requested => "REQUESTED",
    Uploaded => "UPLOADED",
    Inactive => "INACTIVE",
});

/// Expiry status derived from `expires_at`. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Valid,
    ExpiringSoon,
    Expired,
}

text_enum!(ComplianceStatus {
    Valid => "VALID",
    ExpiringSoon => "EXPIRING_SOON",
    Expired => "EXPIRED",
});

// ============================================================================
// Notifications
// ============================================================================

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Urgent,
}

text_enum!(Severity {
    Info => "info",
    Warning => "warning",
    Urgent => "urgent",
});
