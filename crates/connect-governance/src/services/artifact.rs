//! Compliance artifacts: facility documents, employee documents and BHP
//! credentials.
//!
//! Uploads write the object first and then record the artifact and its
//! version in one store operation. Deletion is two-phase: `delete` marks the
//! artifact INACTIVE, and [`ArtifactService::reconcile_orphans`] later purges
//! inactive rows and removes their objects best-effort.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use connect_core::{ActorId, ArtifactId, ArtifactVersionId, BhpProfileId, FacilityId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::directory::DirectoryStore;
use crate::actor::Actor;
use crate::audit::{AuditAction, AuditInput, AuditRecorder, RequestMetadata};
use crate::compliance::derive_status;
use crate::error::{GovernanceError, Result};
use crate::gate::{authorize_visible, Action, Target};
use crate::storage::{object_key, ObjectStorage};
use crate::types::{ArtifactCategory, ArtifactState, ComplianceStatus};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// ============================================================================
// Domain Types
// ============================================================================

/// What an artifact hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum ArtifactScope {
    Facility(FacilityId),
    BhpProfile(BhpProfileId),
}

impl ArtifactScope {
    /// Underlying id, used as the first object key segment.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        match self {
            Self::Facility(id) => id.into_inner(),
            Self::BhpProfile(id) => id.into_inner(),
        }
    }
}

/// A tracked compliance document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceArtifact {
    pub id: ArtifactId,
    pub scope: ArtifactScope,
    pub category: ArtifactCategory,
    pub title: String,
    /// Employee the document is about, for employee documents.
    pub employee_name: Option<String>,
    pub state: ArtifactState,
    /// Key of the current version.
    pub storage_key: Option<String>,
    pub content_type: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub no_expiration: bool,
    pub requested_by: Option<ActorId>,
    pub uploaded_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ComplianceArtifact {
    /// Expiry status at `now`.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> ComplianceStatus {
        derive_status(self.expires_at, self.no_expiration, now)
    }
}

/// One uploaded version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactVersion {
    pub id: ArtifactVersionId,
    pub artifact_id: ArtifactId,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_by: ActorId,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Artifact with its derived status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactView {
    #[serde(flatten)]
    pub artifact: ComplianceArtifact,
    pub status: ComplianceStatus,
}

/// Input for requesting a document from a facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRequest {
    pub title: String,
    pub category: ArtifactCategory,
    pub employee_name: Option<String>,
}

/// Where an upload goes.
#[derive(Debug, Clone)]
pub enum UploadTarget {
    /// A new version of an existing (possibly requested) artifact.
    Existing(ArtifactId),
    /// A brand new artifact.
    New {
        scope: ArtifactScope,
        category: ArtifactCategory,
        title: String,
        employee_name: Option<String>,
    },
}

/// Uploaded content and expiry.
#[derive(Debug, Clone)]
pub struct UploadInput {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub no_expiration: bool,
}

/// Expiry and current-version fields applied by an upload.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub version: ArtifactVersion,
    pub expires_at: Option<DateTime<Utc>>,
    pub no_expiration: bool,
}

/// A time-limited download link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Filter options for listing artifacts.
#[derive(Debug, Clone, Default)]
pub struct ArtifactFilter {
    pub scope: Option<ArtifactScope>,
    pub category: Option<ArtifactCategory>,
    pub state: Option<ArtifactState>,
    /// Exclude INACTIVE artifacts.
    pub active_only: bool,
    /// `expires_at < expires_before`. Never matches `no_expiration` artifacts.
    pub expires_before: Option<DateTime<Utc>>,
    /// `expires_at >= expires_from`. Never matches `no_expiration` artifacts.
    pub expires_from: Option<DateTime<Utc>>,
}

impl ArtifactFilter {
    fn matches(&self, a: &ComplianceArtifact) -> bool {
        let expiry_filtered = self.expires_before.is_some() || self.expires_from.is_some();
        if expiry_filtered && (a.no_expiration || a.expires_at.is_none()) {
            return false;
        }
        self.scope.is_none_or(|s| a.scope == s)
            && self.category.is_none_or(|c| a.category == c)
            && self.state.is_none_or(|s| a.state == s)
            && (!self.active_only || a.state != ArtifactState::Inactive)
            && self
                .expires_before
                .is_none_or(|d| a.expires_at.is_some_and(|at| at < d))
            && self
                .expires_from
                .is_none_or(|d| a.expires_at.is_some_and(|at| at >= d))
    }
}

/// An artifact removed by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgedArtifact {
    pub id: ArtifactId,
    pub storage_keys: Vec<String>,
}

/// Outcome of [`ArtifactService::reconcile_orphans`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub purged_artifacts: usize,
    pub deleted_objects: usize,
    pub failed_object_deletes: usize,
}

// ============================================================================
// Store Trait
// ============================================================================

/// Storage backend for compliance artifacts.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn insert(&self, artifact: &ComplianceArtifact) -> Result<()>;

    async fn get(&self, id: ArtifactId) -> Result<Option<ComplianceArtifact>>;

    /// Oldest first.
    async fn list(&self, filter: &ArtifactFilter) -> Result<Vec<ComplianceArtifact>>;

    async fn count(&self, filter: &ArtifactFilter) -> Result<i64>;

    /// Mark an active artifact UPLOADED with a new version, atomically.
    ///
    /// Returns `None` if the artifact is missing or INACTIVE.
    async fn record_upload(
        &self,
        id: ArtifactId,
        upload: &UploadRecord,
        now: DateTime<Utc>,
    ) -> Result<Option<ComplianceArtifact>>;

    /// Insert a new UPLOADED artifact together with its first version.
    async fn insert_uploaded(
        &self,
        artifact: &ComplianceArtifact,
        version: &ArtifactVersion,
    ) -> Result<()>;

    /// Newest first.
    async fn versions(&self, id: ArtifactId) -> Result<Vec<ArtifactVersion>>;

    /// Mark an active artifact INACTIVE. `None` if missing or already inactive.
    async fn deactivate(
        &self,
        id: ArtifactId,
        now: DateTime<Utc>,
    ) -> Result<Option<ComplianceArtifact>>;

    /// Delete every INACTIVE artifact and its versions, returning their keys.
    async fn purge_inactive(&self) -> Result<Vec<PurgedArtifact>>;
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

#[derive(Debug, Default)]
struct ArtifactTables {
    artifacts: HashMap<ArtifactId, ComplianceArtifact>,
    versions: HashMap<ArtifactId, Vec<ArtifactVersion>>,
}

/// In-memory artifact store for testing.
#[derive(Debug, Default, Clone)]
pub struct InMemoryArtifactStore {
    state: Arc<RwLock<ArtifactTables>>,
}

impl InMemoryArtifactStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn insert(&self, artifact: &ComplianceArtifact) -> Result<()> {
        self.state
            .write()
            .await
            .artifacts
            .insert(artifact.id, artifact.clone());
        Ok(())
    }

    async fn get(&self, id: ArtifactId) -> Result<Option<ComplianceArtifact>> {
        Ok(self.state.read().await.artifacts.get(&id).cloned())
    }

    async fn list(&self, filter: &ArtifactFilter) -> Result<Vec<ComplianceArtifact>> {
        let state = self.state.read().await;
        let mut results: Vec<_> = state
            .artifacts
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        results.sort_by_key(|a| a.created_at);
        Ok(results)
    }

    async fn count(&self, filter: &ArtifactFilter) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state.artifacts.values().filter(|a| filter.matches(a)).count() as i64)
    }

    async fn record_upload(
        &self,
        id: ArtifactId,
        upload: &UploadRecord,
        now: DateTime<Utc>,
    ) -> Result<Option<ComplianceArtifact>> {
        let mut state = self.state.write().await;
        let updated = match state.artifacts.get_mut(&id) {
            Some(artifact) if artifact.state != ArtifactState::Inactive => {
                artifact.state = ArtifactState::Uploaded;
                artifact.storage_key = Some(upload.version.storage_key.clone());
                artifact.content_type = Some(upload.version.content_type.clone());
                artifact.expires_at = upload.expires_at;
                artifact.no_expiration = upload.no_expiration;
                artifact.uploaded_by = Some(upload.version.uploaded_by);
                artifact.updated_at = now;
                artifact.clone()
            }
            _ => return Ok(None),
        };
        state
            .versions
            .entry(id)
            .or_default()
            .push(upload.version.clone());
        Ok(Some(updated))
    }

    async fn insert_uploaded(
        &self,
        artifact: &ComplianceArtifact,
        version: &ArtifactVersion,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.artifacts.insert(artifact.id, artifact.clone());
        state.versions.insert(artifact.id, vec![version.clone()]);
        Ok(())
    }

    async fn versions(&self, id: ArtifactId) -> Result<Vec<ArtifactVersion>> {
        let state = self.state.read().await;
        let mut versions = state.versions.get(&id).cloned().unwrap_or_default();
        versions.reverse();
        Ok(versions)
    }

    async fn deactivate(
        &self,
        id: ArtifactId,
        now: DateTime<Utc>,
    ) -> Result<Option<ComplianceArtifact>> {
        let mut state = self.state.write().await;
        Ok(match state.artifacts.get_mut(&id) {
            Some(artifact) if artifact.state != ArtifactState::Inactive => {
                artifact.state = ArtifactState::Inactive;
                artifact.updated_at = now;
                Some(artifact.clone())
            }
            _ => None,
        })
    }

    async fn purge_inactive(&self) -> Result<Vec<PurgedArtifact>> {
        let mut state = self.state.write().await;
        let inactive: Vec<ArtifactId> = state
            .artifacts
            .values()
            .filter(|a| a.state == ArtifactState::Inactive)
            .map(|a| a.id)
            .collect();

        let mut purged = Vec::with_capacity(inactive.len());
        for id in inactive {
            state.artifacts.remove(&id);
            let storage_keys = state
                .versions
                .remove(&id)
                .unwrap_or_default()
                .into_iter()
                .map(|v| v.storage_key)
                .collect();
            purged.push(PurgedArtifact { id, storage_keys });
        }
        Ok(purged)
    }
}

// ============================================================================
// Service
// ============================================================================

/// Service for compliance artifacts.
pub struct ArtifactService {
    store: Arc<dyn ArtifactStore>,
    directory: Arc<dyn DirectoryStore>,
    storage: Arc<dyn ObjectStorage>,
    audit: AuditRecorder,
    signed_url_ttl: Duration,
}

impl ArtifactService {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        directory: Arc<dyn DirectoryStore>,
        storage: Arc<dyn ObjectStorage>,
        audit: AuditRecorder,
        signed_url_ttl: Duration,
    ) -> Self {
        Self {
            store,
            directory,
            storage,
            audit,
            signed_url_ttl,
        }
    }

    async fn target(&self, scope: ArtifactScope) -> Result<Target> {
        match scope {
            ArtifactScope::Facility(id) => self
                .directory
                .get_facility(id)
                .await?
                .map(|f| Target::Facility(f.gate_ref()))
                .ok_or_else(|| GovernanceError::not_found("Facility", id)),
            ArtifactScope::BhpProfile(id) => Ok(Target::BhpProfile(id)),
        }
    }

    async fn load(
        &self,
        actor: &Actor,
        id: ArtifactId,
        action: Action,
    ) -> Result<ComplianceArtifact> {
        let artifact = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| GovernanceError::not_found("ComplianceArtifact", id))?;
        let target = self.target(artifact.scope).await?;
        authorize_visible(actor, action, &target, "ComplianceArtifact", id)?;
        Ok(artifact)
    }

    fn check_scope(scope: ArtifactScope, category: ArtifactCategory) -> Result<()> {
        let profile_scope = matches!(scope, ArtifactScope::BhpProfile(_));
        if profile_scope != category.is_profile_scoped() {
            return Err(GovernanceError::validation(
                "category",
                format!("{category} does not belong to this scope"),
            ));
        }
        Ok(())
    }

    /// Ask a facility for a document. BHP only.
    pub async fn request(
        &self,
        actor: &Actor,
        facility_id: FacilityId,
        input: ArtifactRequest,
        metadata: RequestMetadata,
    ) -> Result<ComplianceArtifact> {
        if input.title.trim().is_empty() {
            return Err(GovernanceError::validation("title", "Must not be empty"));
        }
        let scope = ArtifactScope::Facility(facility_id);
        Self::check_scope(scope, input.category)?;
        let target = self.target(scope).await?;
        authorize_visible(actor, Action::Request, &target, "Facility", facility_id)?;

        let now = Utc::now();
        let artifact = ComplianceArtifact {
            id: ArtifactId::new(),
            scope,
            category: input.category,
            title: input.title.trim().to_string(),
            employee_name: input.employee_name,
            state: ArtifactState::Requested,
            storage_key: None,
            content_type: None,
            expires_at: None,
            no_expiration: false,
            requested_by: Some(actor.id()),
            uploaded_by: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(&artifact).await?;

        let _ = self
            .audit
            .record(AuditInput {
                actor_id: Some(actor.id()),
                action: AuditAction::ArtifactRequested,
                entity_type: "ComplianceArtifact".to_string(),
                entity_id: Some(artifact.id.into_inner()),
                details: Some(serde_json::json!({
                    "facility_id": facility_id,
                    "category": artifact.category,
                    "title": artifact.title,
                })),
                metadata,
            })
            .await;
        Ok(artifact)
    }

    /// Upload a new artifact or a new version of an existing one.
    pub async fn upload(
        &self,
        actor: &Actor,
        target: UploadTarget,
        input: UploadInput,
        metadata: RequestMetadata,
    ) -> Result<ComplianceArtifact> {
        if input.bytes.is_empty() {
            return Err(GovernanceError::validation("content", "File is empty"));
        }
        if input.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(GovernanceError::validation(
                "content",
                format!("File exceeds {MAX_UPLOAD_BYTES} bytes"),
            ));
        }
        if input.content_type.trim().is_empty() {
            return Err(GovernanceError::validation("content_type", "Must not be empty"));
        }

        let existing = match &target {
            UploadTarget::Existing(id) => {
                let artifact = self.load(actor, *id, Action::Write).await?;
                if artifact.state == ArtifactState::Inactive {
                    return Err(GovernanceError::invalid_transition(artifact.state, "upload"));
                }
                Some(artifact)
            }
            UploadTarget::New {
                scope,
                category,
                title,
                ..
            } => {
                if title.trim().is_empty() {
                    return Err(GovernanceError::validation("title", "Must not be empty"));
                }
                Self::check_scope(*scope, *category)?;
                let gate_target = self.target(*scope).await?;
                authorize_visible(actor, Action::Write, &gate_target, "Scope", scope.uuid())?;
                None
            }
        };

        let now = Utc::now();
        let (artifact_id, scope) = match (&existing, &target) {
            (Some(a), _) => (a.id, a.scope),
            (None, UploadTarget::New { scope, .. }) => (ArtifactId::new(), *scope),
            (None, UploadTarget::Existing(id)) => {
                return Err(GovernanceError::not_found("ComplianceArtifact", id))
            }
        };
        let version = ArtifactVersion {
            id: ArtifactVersionId::new(),
            artifact_id,
            storage_key: object_key(
                scope.uuid(),
                artifact_id.into_inner(),
                Uuid::new_v4(),
            ),
            content_type: input.content_type.trim().to_string(),
            size_bytes: input.bytes.len() as i64,
            uploaded_by: actor.id(),
            expires_at: input.expires_at,
            created_at: now,
        };

        let key = self
            .storage
            .put(&version.storage_key, input.bytes, &version.content_type)
            .await?;

        let recorded = match (existing, target) {
            (Some(_), _) => {
                let upload = UploadRecord {
                    version: version.clone(),
                    expires_at: input.expires_at,
                    no_expiration: input.no_expiration,
                };
                self.store
                    .record_upload(artifact_id, &upload, now)
                    .await
                    .and_then(|r| {
                        r.ok_or_else(|| {
                            GovernanceError::invalid_transition(ArtifactState::Inactive, "upload")
                        })
                    })
            }
            (
                None,
                UploadTarget::New {
                    scope,
                    category,
                    title,
                    employee_name,
                },
            ) => {
                let artifact = ComplianceArtifact {
                    id: artifact_id,
                    scope,
                    category,
                    title: title.trim().to_string(),
                    employee_name,
                    state: ArtifactState::Uploaded,
                    storage_key: Some(version.storage_key.clone()),
                    content_type: Some(version.content_type.clone()),
                    expires_at: input.expires_at,
                    no_expiration: input.no_expiration,
                    requested_by: None,
                    uploaded_by: Some(actor.id()),
                    created_at: now,
                    updated_at: now,
                };
                self.store
                    .insert_uploaded(&artifact, &version)
                    .await
                    .map(|()| artifact)
            }
            (None, UploadTarget::Existing(id)) => {
                Err(GovernanceError::not_found("ComplianceArtifact", id))
            }
        };

        let artifact = match recorded {
            Ok(artifact) => artifact,
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&key).await {
                    tracing::warn!(
                        key = %key,
                        error = %cleanup,
                        "Failed to remove object after rejected upload"
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            actor_id = %actor.id(),
            artifact_id = %artifact.id,
            version_id = %version.id,
            size_bytes = version.size_bytes,
            "Artifact uploaded"
        );
        let _ = self
            .audit
            .record(AuditInput {
                actor_id: Some(actor.id()),
                action: AuditAction::DocumentUploaded,
                entity_type: "ComplianceArtifact".to_string(),
                entity_id: Some(artifact.id.into_inner()),
                details: Some(serde_json::json!({
                    "version_id": version.id,
                    "category": artifact.category,
                    "expires_at": artifact.expires_at,
                })),
                metadata,
            })
            .await;
        Ok(artifact)
    }

    /// Signed download link for the current version.
    pub async fn signed_url(&self, actor: &Actor, id: ArtifactId) -> Result<SignedUrl> {
        let artifact = self.load(actor, id, Action::Read).await?;
        let key = match (&artifact.state, &artifact.storage_key) {
            (ArtifactState::Uploaded, Some(key)) => key,
            _ => return Err(GovernanceError::not_found("ArtifactVersion", id)),
        };
        let url = self.storage.signed_get(key, self.signed_url_ttl).await?;
        Ok(SignedUrl {
            url,
            expires_at: Utc::now() + self.signed_url_ttl,
        })
    }

    /// Active artifacts of a scope with their derived status.
    pub async fn list(
        &self,
        actor: &Actor,
        scope: ArtifactScope,
        category: Option<ArtifactCategory>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ArtifactView>> {
        let target = self.target(scope).await?;
        authorize_visible(actor, Action::Read, &target, "Scope", scope.uuid())?;

        let filter = ArtifactFilter {
            scope: Some(scope),
            category,
            active_only: true,
            ..Default::default()
        };
        Ok(self
            .store
            .list(&filter)
            .await?
            .into_iter()
            .map(|artifact| ArtifactView {
                status: artifact.status_at(now),
                artifact,
            })
            .collect())
    }

    /// Upload history of an artifact.
    pub async fn versions(&self, actor: &Actor, id: ArtifactId) -> Result<Vec<ArtifactVersion>> {
        self.load(actor, id, Action::Read).await?;
        self.store.versions(id).await
    }

    /// Mark an artifact INACTIVE. Objects stay until reconciliation.
    pub async fn delete(
        &self,
        actor: &Actor,
        id: ArtifactId,
        metadata: RequestMetadata,
    ) -> Result<ComplianceArtifact> {
        let artifact = self.load(actor, id, Action::Write).await?;
        let updated = self
            .store
            .deactivate(id, Utc::now())
            .await?
            .ok_or_else(|| GovernanceError::invalid_transition(ArtifactState::Inactive, "delete"))?;

        tracing::info!(actor_id = %actor.id(), artifact_id = %id, "Artifact deactivated");
        let _ = self
            .audit
            .record(AuditInput {
                actor_id: Some(actor.id()),
                action: AuditAction::DocumentDeleted,
                entity_type: "ComplianceArtifact".to_string(),
                entity_id: Some(id.into_inner()),
                details: Some(serde_json::json!({ "previous_state": artifact.state })),
                metadata,
            })
            .await;
        Ok(updated)
    }

    /// Purge INACTIVE artifacts and delete their objects.
    ///
    /// Object deletion failures are logged and counted; they never undo the purge.
    pub async fn reconcile_orphans(&self) -> Result<ReconcileReport> {
        let purged = self.store.purge_inactive().await?;
        let mut report = ReconcileReport {
            purged_artifacts: purged.len(),
            ..Default::default()
        };

        for artifact in &purged {
            for key in &artifact.storage_keys {
                match self.storage.delete(key).await {
                    Ok(()) => report.deleted_objects += 1,
                    Err(e) => {
                        report.failed_object_deletes += 1;
                        tracing::warn!(
                            artifact_id = %artifact.id,
                            key = %key,
                            error = %e,
                            "Failed to delete orphaned object"
                        );
                    }
                }
            }
            let _ = self
                .audit
                .record(AuditInput {
                    actor_id: None,
                    action: AuditAction::DocumentPurged,
                    entity_type: "ComplianceArtifact".to_string(),
                    entity_id: Some(artifact.id.into_inner()),
                    details: Some(serde_json::json!({ "objects": artifact.storage_keys.len() })),
                    ..Default::default()
                })
                .await;
        }

        tracing::info!(
            purged = report.purged_artifacts,
            deleted_objects = report.deleted_objects,
            failed_object_deletes = report.failed_object_deletes,
            "Orphan reconciliation finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(scope: ArtifactScope, expires_at: Option<DateTime<Utc>>) -> ComplianceArtifact {
        let now = Utc::now();
        ComplianceArtifact {
            id: ArtifactId::new(),
            scope,
            category: ArtifactCategory::FacilityDocument,
            title: "Fire inspection".to_string(),
            employee_name: None,
            state: ArtifactState::Uploaded,
            storage_key: None,
            content_type: None,
            expires_at,
            no_expiration: false,
            requested_by: None,
            uploaded_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_expiry_filter_bounds() {
        let now = Utc::now();
        let scope = ArtifactScope::Facility(FacilityId::new());
        let filter = ArtifactFilter {
            expires_from: Some(now),
            expires_before: Some(now + Duration::days(7)),
            ..Default::default()
        };

        assert!(filter.matches(&artifact(scope, Some(now))));
        assert!(filter.matches(&artifact(scope, Some(now + Duration::days(6)))));
        assert!(!filter.matches(&artifact(scope, Some(now + Duration::days(7)))));
        assert!(!filter.matches(&artifact(scope, Some(now - Duration::seconds(1)))));
        assert!(!filter.matches(&artifact(scope, None)));

        let mut forever = artifact(scope, Some(now + Duration::days(1)));
        forever.no_expiration = true;
        assert!(!filter.matches(&forever));
    }

    #[tokio::test]
    async fn test_purge_returns_every_version_key() {
        let store = InMemoryArtifactStore::new();
        let scope = ArtifactScope::Facility(FacilityId::new());
        let a = artifact(scope, None);
        let version = |key: &str| ArtifactVersion {
            id: ArtifactVersionId::new(),
            artifact_id: a.id,
            storage_key: key.to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 3,
            uploaded_by: ActorId::new(),
            expires_at: None,
            created_at: Utc::now(),
        };
        store.insert_uploaded(&a, &version("k1")).await.unwrap();
        store
            .record_upload(
                a.id,
                &UploadRecord {
                    version: version("k2"),
                    expires_at: None,
                    no_expiration: true,
                },
                Utc::now(),
            )
            .await
            .unwrap()
            .unwrap();

        assert!(store.purge_inactive().await.unwrap().is_empty());
        store.deactivate(a.id, Utc::now()).await.unwrap().unwrap();
        assert!(store.deactivate(a.id, Utc::now()).await.unwrap().is_none());

        let purged = store.purge_inactive().await.unwrap();
        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].storage_keys, vec!["k1".to_string(), "k2".to_string()]);
        assert!(store.get(a.id).await.unwrap().is_none());
    }

    #[test]
    fn test_credentials_only_on_profiles() {
        let facility = ArtifactScope::Facility(FacilityId::new());
        let profile = ArtifactScope::BhpProfile(BhpProfileId::new());
        assert!(ArtifactService::check_scope(facility, ArtifactCategory::Credential).is_err());
        assert!(ArtifactService::check_scope(profile, ArtifactCategory::Credential).is_ok());
        assert!(ArtifactService::check_scope(profile, ArtifactCategory::EmployeeDocument).is_err());
    }
}
