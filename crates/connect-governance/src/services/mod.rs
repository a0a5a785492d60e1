//! Service layer for BHP Connect.
//!
//! Each service owns its store trait and an in-memory implementation, and
//! runs every operation through the authorization gate before touching the
//! store.

pub mod actor;
pub mod artifact;
pub mod directory;
pub mod facility;
pub mod message;
pub mod notification;
pub mod workflow;

/// Options for list operations.
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// Maximum number of results.
    pub limit: i64,
    /// Number of results to skip.
    pub offset: i64,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

// Re-export commonly used types
pub use actor::ActorService;
pub use artifact::{
    ArtifactFilter, ArtifactRequest, ArtifactScope, ArtifactService, ArtifactStore,
    ArtifactVersion, ArtifactView, ComplianceArtifact, InMemoryArtifactStore, ReconcileReport,
    SignedUrl, UploadInput, UploadTarget,
};
pub use directory::{
    ActorFilter, ApplicationFilter, DirectoryStore, Facility, FacilityApplication,
    FacilityFilter, FacilityUpdate, InMemoryDirectoryStore, NewBhp, NewBhrf, RegisteredBhrf,
};
pub use facility::FacilityService;
pub use message::{
    InMemoryMessageStore, Message, MessageFilter, MessageService, MessageStore, NewMessage,
};
pub use notification::{Notification, NotificationService, RULES};
pub use workflow::{
    active_document_conflict, same_active_slot, InMemoryWorkflowStore, NewWorkflowDocument,
    WorkflowFilter, WorkflowService, WorkflowStore,
};
