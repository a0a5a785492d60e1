//! Domain logic for BHP Connect.
//!
//! This crate holds the role-scoped authorization gate and the approval
//! state machines that every dashboard operation passes through.
//!
//! # Core
//!
//! - [`gate`] decides whether an [`actor::Actor`] may perform an
//!   [`gate::Action`] on a [`gate::Target`]
//! - [`approval`] is the PENDING → APPROVED | REJECTED machine shared by
//!   actor registrations and facility applications
//! - [`workflow`] is the DRAFT → SUBMITTED → decided machine for Intake and
//!   ASAM documents
//! - [`audit`] records every state-changing operation
//! - [`compliance`] derives artifact expiry status
//!
//! # Services
//!
//! The [`services`] module provides business logic for:
//! - [`services::ActorService`] - registration, resolution, registration decisions, MFA
//! - [`services::FacilityService`] - facilities and facility applications
//! - [`services::WorkflowService`] - Intake and ASAM documents
//! - [`services::ArtifactService`] - compliance documents and credentials
//! - [`services::MessageService`] - facility messages
//! - [`services::NotificationService`] - dashboard notifications
//!
//! # Collaborators
//!
//! [`storage::ObjectStorage`], [`email::EmailSender`] and
//! [`render::PdfRenderer`] are the seams to external services.

#[macro_use]
mod macros;

pub mod actor;
pub mod approval;
pub mod audit;
pub mod compliance;
pub mod email;
pub mod error;
pub mod gate;
pub mod render;
pub mod services;
pub mod storage;
pub mod types;
pub mod workflow;

// Re-export commonly used types
pub use actor::{Actor, ActorRecord, AvailableBhp, BhpProfile, BhrfProfile};
pub use approval::{ApprovalDecision, Decided};
pub use audit::{
    AuditAction, AuditEntry, AuditFilter, AuditInput, AuditRecorder, AuditStore,
    InMemoryAuditStore, RequestMetadata,
};
pub use email::{EmailSender, LoggingEmailSender, MockEmailSender, OutgoingEmail};
pub use error::{GovernanceError, Result};
pub use gate::{authorize, can_access, Action, Decision, DenyReason, FacilityRef, Target};
pub use render::{MockPdfRenderer, PdfRenderer};
pub use services::ListOptions;
pub use storage::{InMemoryObjectStorage, LocalObjectStorage, ObjectStorage};
pub use types::{
    ApprovalStatus, ArtifactCategory, ArtifactState, ComplianceStatus, Role, Severity,
    WorkflowKind, WorkflowOutcome, WorkflowStatus,
};
pub use workflow::{EditPolicies, EditPolicy, WorkflowDocument, WorkflowEvent};
