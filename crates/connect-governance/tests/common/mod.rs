//! Common test utilities for connect-governance integration tests.
//!
//! Every test builds its own [`TestContext`] over fresh in-memory stores.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use connect_core::ActorId;
use connect_governance::services::{
    ActorService, ArtifactFilter, ArtifactService, ArtifactStore, Facility, FacilityService,
    InMemoryArtifactStore, InMemoryDirectoryStore, InMemoryMessageStore, InMemoryWorkflowStore,
    MessageService, NewBhp, NewBhrf, NotificationService, WorkflowService,
};
use connect_governance::{
    Actor, ActorRecord, ApprovalDecision, ApprovalStatus, AuditRecorder, EditPolicies,
    InMemoryAuditStore, InMemoryObjectStorage, MockEmailSender, RequestMetadata, Role,
};

/// Stores and services wired the way the server wires them.
pub struct TestContext {
    pub directory: Arc<InMemoryDirectoryStore>,
    pub audit_store: Arc<InMemoryAuditStore>,
    pub workflow_store: Arc<InMemoryWorkflowStore>,
    pub artifact_store: Arc<InMemoryArtifactStore>,
    pub message_store: Arc<InMemoryMessageStore>,
    pub storage: Arc<InMemoryObjectStorage>,
    pub email: MockEmailSender,
    pub actors: ActorService,
    pub facilities: FacilityService,
    pub workflows: WorkflowService,
    pub artifacts: ArtifactService,
    pub messages: MessageService,
    pub notifications: NotificationService,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_email(MockEmailSender::new())
    }

    pub fn with_email(email: MockEmailSender) -> Self {
        let directory = Arc::new(InMemoryDirectoryStore::new());
        let audit_store = Arc::new(InMemoryAuditStore::new());
        let workflow_store = Arc::new(InMemoryWorkflowStore::new());
        let artifact_store = Arc::new(InMemoryArtifactStore::new());
        let message_store = Arc::new(InMemoryMessageStore::new());
        let storage = Arc::new(InMemoryObjectStorage::new());
        let audit = AuditRecorder::new(audit_store.clone());

        Self {
            actors: ActorService::new(directory.clone(), audit.clone(), Arc::new(email.clone())),
            facilities: FacilityService::new(directory.clone(), audit.clone()),
            workflows: WorkflowService::new(
                workflow_store.clone(),
                directory.clone(),
                audit.clone(),
                EditPolicies::default(),
            ),
            artifacts: ArtifactService::new(
                artifact_store.clone(),
                directory.clone(),
                storage.clone(),
                audit.clone(),
                Duration::minutes(15),
            ),
            messages: MessageService::new(message_store.clone(), directory.clone(), audit),
            notifications: NotificationService::new(
                directory.clone(),
                artifact_store.clone(),
                message_store.clone(),
            ),
            directory,
            audit_store,
            workflow_store,
            artifact_store,
            message_store,
            storage,
            email,
        }
    }

    /// Seed an approved admin.
    pub async fn admin(&self) -> Actor {
        let now = Utc::now();
        let id = ActorId::new();
        self.directory
            .insert_actor(ActorRecord {
                id,
                email: format!("admin-{id}@bhp-connect.test"),
                display_name: "Admin".to_string(),
                password_hash: String::new(),
                role: Role::Admin,
                approval_status: ApprovalStatus::Approved,
                rejection_reason: None,
                bhp_profile_id: None,
                bhrf_profile_id: None,
                active: true,
                mfa_secret: None,
                mfa_enabled: false,
                decided_by: None,
                decided_at: None,
                created_at: now,
                updated_at: now,
            })
            .await;
        self.actors.resolve(id).await.expect("admin resolves")
    }

    /// Register a BHP and leave it PENDING.
    pub async fn pending_bhp(&self, name: &str) -> Actor {
        let record = self
            .actors
            .register_bhp(
                NewBhp {
                    email: format!("{}-{}@bhp.test", name.to_lowercase(), ActorId::new()),
                    display_name: name.to_string(),
                    password_hash: "hash".to_string(),
                    organisation_name: Some(format!("{name} Health")),
                    phone: None,
                },
                RequestMetadata::default(),
            )
            .await
            .expect("register BHP");
        self.actors.resolve(record.id).await.expect("BHP resolves")
    }

    /// Register a BHP and approve it.
    pub async fn approved_bhp(&self, admin: &Actor, name: &str) -> Actor {
        let bhp = self.pending_bhp(name).await;
        self.actors
            .decide_actor(admin, bhp.id(), ApprovalDecision::Approve, RequestMetadata::default())
            .await
            .expect("approve BHP");
        self.actors.resolve(bhp.id()).await.expect("BHP resolves")
    }

    /// Register a BHRF under `bhp`, approve the account and the facility
    /// application, and return the resolved BHRF with its facility.
    pub async fn bhrf_with_facility(
        &self,
        admin: &Actor,
        bhp: &Actor,
        facility_name: &str,
    ) -> (Actor, Facility) {
        let registered = self
            .actors
            .register_bhrf(
                NewBhrf {
                    email: format!("bhrf-{}@facility.test", ActorId::new()),
                    display_name: format!("{facility_name} Operator"),
                    password_hash: "hash".to_string(),
                    bhp_id: bhp.bhp_profile_id().expect("BHP profile"),
                    facility_name: facility_name.to_string(),
                    address: Some("1 Main St".to_string()),
                },
                RequestMetadata::default(),
            )
            .await
            .expect("register BHRF");
        self.actors
            .decide_actor(
                admin,
                registered.actor.id,
                ApprovalDecision::Approve,
                RequestMetadata::default(),
            )
            .await
            .expect("approve BHRF account");
        let application = self
            .facilities
            .decide_application(
                bhp,
                registered.application.id,
                ApprovalDecision::Approve,
                RequestMetadata::default(),
            )
            .await
            .expect("approve facility application");

        let bhrf = self
            .actors
            .resolve(registered.actor.id)
            .await
            .expect("BHRF resolves");
        let facility_id = application.facility_id.expect("facility created");
        let facility = self
            .facilities
            .load_for(&bhrf, facility_id, connect_governance::Action::Read)
            .await
            .expect("BHRF reads own facility");
        (bhrf, facility)
    }

    /// Whether the artifact store holds no artifacts at all, inactive included.
    pub async fn artifact_store_is_empty(&self) -> bool {
        self.artifact_store
            .count(&ArtifactFilter::default())
            .await
            .expect("count artifacts")
            == 0
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
