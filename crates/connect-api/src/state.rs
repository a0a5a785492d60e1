//! Shared handler state.

use std::sync::Arc;

use chrono::Duration;
use connect_auth::PasswordHasher;
use connect_governance::services::{
    ActorService, ArtifactService, ArtifactStore, DirectoryStore, FacilityService,
    MessageService, MessageStore, NotificationService, WorkflowService, WorkflowStore,
};
use connect_governance::{
    AuditRecorder, AuditStore, EditPolicies, EmailSender, LocalObjectStorage, ObjectStorage,
    PdfRenderer,
};

use crate::session::SessionKeys;

/// Storage backends and collaborators the services are built over.
pub struct Backends {
    pub directory: Arc<dyn DirectoryStore>,
    pub workflows: Arc<dyn WorkflowStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub messages: Arc<dyn MessageStore>,
    pub audit: Arc<dyn AuditStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub email: Arc<dyn EmailSender>,
}

/// State shared by every handler.
#[derive(Clone)]
pub struct ConnectState {
    pub actors: Arc<ActorService>,
    pub facilities: Arc<FacilityService>,
    pub workflows: Arc<WorkflowService>,
    pub artifacts: Arc<ArtifactService>,
    pub messages: Arc<MessageService>,
    pub notifications: Arc<NotificationService>,
    pub audit: AuditRecorder,
    pub sessions: SessionKeys,
    pub passwords: PasswordHasher,
    /// Serves signed download URLs when objects live on local disk.
    pub files: Option<Arc<LocalObjectStorage>>,
    pub renderer: Option<Arc<dyn PdfRenderer>>,
}

impl ConnectState {
    pub fn new(backends: Backends, sessions: SessionKeys, signed_url_ttl: Duration) -> Self {
        let audit = AuditRecorder::new(backends.audit);
        Self {
            actors: Arc::new(ActorService::new(
                backends.directory.clone(),
                audit.clone(),
                backends.email,
            )),
            facilities: Arc::new(FacilityService::new(backends.directory.clone(), audit.clone())),
            workflows: Arc::new(WorkflowService::new(
                backends.workflows,
                backends.directory.clone(),
                audit.clone(),
                EditPolicies::default(),
            )),
            artifacts: Arc::new(ArtifactService::new(
                backends.artifacts.clone(),
                backends.directory.clone(),
                backends.storage,
                audit.clone(),
                signed_url_ttl,
            )),
            messages: Arc::new(MessageService::new(
                backends.messages.clone(),
                backends.directory.clone(),
                audit.clone(),
            )),
            notifications: Arc::new(NotificationService::new(
                backends.directory,
                backends.artifacts,
                backends.messages,
            )),
            audit,
            sessions,
            passwords: PasswordHasher::new(),
            files: None,
            renderer: None,
        }
    }

    /// Serve `/files/*key` from local storage.
    #[must_use]
    pub fn with_files(mut self, files: Arc<LocalObjectStorage>) -> Self {
        self.files = Some(files);
        self
    }

    /// Enable `GET /documents/:id/pdf`.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn PdfRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn with_password_hasher(mut self, passwords: PasswordHasher) -> Self {
        self.passwords = passwords;
        self
    }
}
