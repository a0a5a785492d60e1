//! Directory of actors, profiles, facilities and facility applications.
//!
//! The directory store owns every record the gate needs to resolve an
//! ownership chain. Writes that touch several records (BHRF registration,
//! application approval) are atomic.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use connect_core::{
    ActorId, BhpProfileId, BhrfProfileId, FacilityApplicationId, FacilityId, FacilityScoped,
    ProfileScoped,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::ListOptions;
use crate::actor::{ActorRecord, AvailableBhp, BhpProfile, BhrfProfile};
use crate::approval::Decided;
use crate::error::{GovernanceError, Result};
use crate::gate::FacilityRef;
use crate::types::{ApprovalStatus, Role};

// ============================================================================
// Domain Types
// ============================================================================

/// A residential facility, overseen by one BHP and operated by one BHRF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    /// Overseeing BHP profile.
    pub bhp_id: BhpProfileId,
    /// Operating BHRF profile.
    pub bhrf_profile_id: BhrfProfileId,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Facility {
    /// Ownership facts for the gate.
    #[must_use]
    pub fn gate_ref(&self) -> FacilityRef {
        FacilityRef {
            facility_id: self.id,
            bhp_id: self.bhp_id,
        }
    }
}

impl FacilityScoped for Facility {
    fn facility_id(&self) -> FacilityId {
        self.id
    }
}

impl ProfileScoped for Facility {
    fn bhp_profile_id(&self) -> BhpProfileId {
        self.bhp_id
    }
}

/// Request by a BHRF to be overseen by a BHP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityApplication {
    pub id: FacilityApplicationId,
    /// Target BHP profile; the only party that may decide.
    pub bhp_id: BhpProfileId,
    pub bhrf_profile_id: BhrfProfileId,
    pub applicant_actor_id: ActorId,
    pub facility_name: String,
    pub address: Option<String>,
    pub status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub decided_by: Option<ActorId>,
    pub decided_at: Option<DateTime<Utc>>,
    /// Facility created on approval.
    pub facility_id: Option<FacilityId>,
    pub created_at: DateTime<Utc>,
}

impl ProfileScoped for FacilityApplication {
    fn bhp_profile_id(&self) -> BhpProfileId {
        self.bhp_id
    }
}

/// Input for registering a BHP.
#[derive(Debug, Clone)]
pub struct NewBhp {
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub organisation_name: Option<String>,
    pub phone: Option<String>,
}

/// Input for registering a BHRF together with its facility application.
#[derive(Debug, Clone)]
pub struct NewBhrf {
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub bhp_id: BhpProfileId,
    pub facility_name: String,
    pub address: Option<String>,
}

/// Result of a BHRF registration.
#[derive(Debug, Clone)]
pub struct RegisteredBhrf {
    pub actor: ActorRecord,
    pub profile: BhrfProfile,
    pub application: FacilityApplication,
}

/// Filter options for listing actors.
#[derive(Debug, Clone, Default)]
pub struct ActorFilter {
    pub role: Option<Role>,
    pub status: Option<ApprovalStatus>,
}

/// Filter options for listing facility applications.
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub bhp_id: Option<BhpProfileId>,
    pub status: Option<ApprovalStatus>,
}

/// Filter options for listing facilities.
#[derive(Debug, Clone, Default)]
pub struct FacilityFilter {
    pub bhp_id: Option<BhpProfileId>,
    pub facility_id: Option<FacilityId>,
}

/// Mutable facility fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacilityUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
}

// ============================================================================
// Store Trait
// ============================================================================

/// Storage backend for the directory.
#[async_trait::async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Create a PENDING BHP actor and its profile. `Conflict` on duplicate email.
    async fn create_bhp(&self, input: NewBhp) -> Result<(ActorRecord, BhpProfile)>;

    /// Create a PENDING BHRF actor, its profile and a PENDING application, atomically.
    async fn create_bhrf(&self, input: NewBhrf) -> Result<RegisteredBhrf>;

    async fn get_actor(&self, id: ActorId) -> Result<Option<ActorRecord>>;

    /// Case-insensitive lookup.
    async fn find_actor_by_email(&self, email: &str) -> Result<Option<ActorRecord>>;

    async fn list_actors(
        &self,
        filter: &ActorFilter,
        options: &ListOptions,
    ) -> Result<Vec<ActorRecord>>;

    async fn count_actors(&self, filter: &ActorFilter) -> Result<i64>;

    /// Apply a registration decision if the actor is still PENDING.
    ///
    /// Returns `None` when the actor is missing or already decided.
    async fn decide_actor(
        &self,
        id: ActorId,
        decided: &Decided,
        decided_by: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Option<ActorRecord>>;

    /// Store the TOTP secret and enabled flag.
    async fn set_mfa(
        &self,
        id: ActorId,
        secret: Option<String>,
        enabled: bool,
    ) -> Result<Option<ActorRecord>>;

    async fn get_bhp_profile(&self, id: BhpProfileId) -> Result<Option<BhpProfile>>;

    /// Profiles of APPROVED, active BHP actors, ordered by name.
    async fn list_available_bhps(&self) -> Result<Vec<AvailableBhp>>;

    async fn get_bhrf_profile(&self, id: BhrfProfileId) -> Result<Option<BhrfProfile>>;

    /// Facility operated by a BHRF profile, if its application was approved.
    async fn facility_for_bhrf(&self, id: BhrfProfileId) -> Result<Option<FacilityId>>;

    async fn get_facility(&self, id: FacilityId) -> Result<Option<Facility>>;

    async fn list_facilities(&self, filter: &FacilityFilter) -> Result<Vec<Facility>>;

    async fn update_facility(
        &self,
        id: FacilityId,
        update: FacilityUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Facility>>;

    async fn get_application(
        &self,
        id: FacilityApplicationId,
    ) -> Result<Option<FacilityApplication>>;

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        options: &ListOptions,
    ) -> Result<Vec<FacilityApplication>>;

    async fn count_applications(&self, filter: &ApplicationFilter) -> Result<i64>;

    /// Approve a PENDING application, creating its facility, atomically.
    ///
    /// Returns `None` when the application is missing or already decided.
    async fn approve_application(
        &self,
        id: FacilityApplicationId,
        decided_by: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Option<(FacilityApplication, Facility)>>;

    /// Reject a PENDING application.
    async fn reject_application(
        &self,
        id: FacilityApplicationId,
        reason: &str,
        decided_by: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Option<FacilityApplication>>;
}

// ============================================================================
// In-Memory Store (for testing)
// ============================================================================

#[derive(Debug, Default)]
struct DirectoryState {
    actors: HashMap<ActorId, ActorRecord>,
    bhp_profiles: HashMap<BhpProfileId, BhpProfile>,
    bhrf_profiles: HashMap<BhrfProfileId, BhrfProfile>,
    facilities: HashMap<FacilityId, Facility>,
    applications: HashMap<FacilityApplicationId, FacilityApplication>,
}

impl DirectoryState {
    fn email_taken(&self, email: &str) -> bool {
        self.actors
            .values()
            .any(|a| a.email.eq_ignore_ascii_case(email))
    }

    fn new_actor(
        email: String,
        display_name: String,
        password_hash: String,
        role: Role,
        now: DateTime<Utc>,
    ) -> ActorRecord {
        ActorRecord {
            id: ActorId::new(),
            email,
            display_name,
            password_hash,
            role,
            approval_status: ApprovalStatus::Pending,
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
        }
    }
}

/// In-memory directory store for testing.
///
/// All records sit behind one lock so multi-record writes are atomic.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDirectoryStore {
    state: Arc<RwLock<DirectoryState>>,
}

impl InMemoryDirectoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an actor record directly (seeding admins in tests).
    pub async fn insert_actor(&self, actor: ActorRecord) {
        self.state.write().await.actors.insert(actor.id, actor);
    }
}

fn matches_actor(filter: &ActorFilter, a: &ActorRecord) -> bool {
    filter.role.is_none_or(|r| a.role == r) && filter.status.is_none_or(|s| a.approval_status == s)
}

fn matches_application(filter: &ApplicationFilter, a: &FacilityApplication) -> bool {
    filter.bhp_id.is_none_or(|id| a.bhp_id == id) && filter.status.is_none_or(|s| a.status == s)
}

#[async_trait::async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    async fn create_bhp(&self, input: NewBhp) -> Result<(ActorRecord, BhpProfile)> {
        let mut state = self.state.write().await;
        if state.email_taken(&input.email) {
            return Err(GovernanceError::Conflict("Email already registered".to_string()));
        }

        let now = Utc::now();
        let mut actor = DirectoryState::new_actor(
            input.email,
            input.display_name,
            input.password_hash,
            Role::Bhp,
            now,
        );
        let profile = BhpProfile {
            id: BhpProfileId::new(),
            actor_id: actor.id,
            organisation_name: input.organisation_name,
            phone: input.phone,
            created_at: now,
        };
        actor.bhp_profile_id = Some(profile.id);

        state.actors.insert(actor.id, actor.clone());
        state.bhp_profiles.insert(profile.id, profile.clone());
        Ok((actor, profile))
    }

    async fn create_bhrf(&self, input: NewBhrf) -> Result<RegisteredBhrf> {
        let mut state = self.state.write().await;
        if state.email_taken(&input.email) {
            return Err(GovernanceError::Conflict("Email already registered".to_string()));
        }
        if !state.bhp_profiles.contains_key(&input.bhp_id) {
            return Err(GovernanceError::not_found("BhpProfile", input.bhp_id));
        }

        let now = Utc::now();
        let mut actor = DirectoryState::new_actor(
            input.email,
            input.display_name,
            input.password_hash,
            Role::Bhrf,
            now,
        );
        let profile = BhrfProfile {
            id: BhrfProfileId::new(),
            actor_id: actor.id,
            created_at: now,
        };
        actor.bhrf_profile_id = Some(profile.id);
        let application = FacilityApplication {
            id: FacilityApplicationId::new(),
            bhp_id: input.bhp_id,
            bhrf_profile_id: profile.id,
            applicant_actor_id: actor.id,
            facility_name: input.facility_name,
            address: input.address,
            status: ApprovalStatus::Pending,
            rejection_reason: None,
            decided_by: None,
            decided_at: None,
            facility_id: None,
            created_at: now,
        };

        state.actors.insert(actor.id, actor.clone());
        state.bhrf_profiles.insert(profile.id, profile.clone());
        state.applications.insert(application.id, application.clone());
        Ok(RegisteredBhrf {
            actor,
            profile,
            application,
        })
    }

    async fn get_actor(&self, id: ActorId) -> Result<Option<ActorRecord>> {
        Ok(self.state.read().await.actors.get(&id).cloned())
    }

    async fn find_actor_by_email(&self, email: &str) -> Result<Option<ActorRecord>> {
        let state = self.state.read().await;
        Ok(state
            .actors
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_actors(
        &self,
        filter: &ActorFilter,
        options: &ListOptions,
    ) -> Result<Vec<ActorRecord>> {
        let state = self.state.read().await;
        let mut results: Vec<_> = state
            .actors
            .values()
            .filter(|a| matches_actor(filter, a))
            .cloned()
            .collect();
        results.sort_by_key(|a| a.created_at);
        Ok(results
            .into_iter()
            .skip(options.offset as usize)
            .take(options.limit as usize)
            .collect())
    }

    async fn count_actors(&self, filter: &ActorFilter) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .actors
            .values()
            .filter(|a| matches_actor(filter, a))
            .count() as i64)
    }

    async fn decide_actor(
        &self,
        id: ActorId,
        decided: &Decided,
        decided_by: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Option<ActorRecord>> {
        let mut state = self.state.write().await;
        let Some(actor) = state.actors.get_mut(&id) else {
            return Ok(None);
        };
        if actor.approval_status != ApprovalStatus::Pending {
            return Ok(None);
        }
        actor.approval_status = decided.status;
        actor.rejection_reason = decided.reason.clone();
        actor.decided_by = Some(decided_by);
        actor.decided_at = Some(now);
        actor.updated_at = now;
        Ok(Some(actor.clone()))
    }

    async fn set_mfa(
        &self,
        id: ActorId,
        secret: Option<String>,
        enabled: bool,
    ) -> Result<Option<ActorRecord>> {
        let mut state = self.state.write().await;
        Ok(state.actors.get_mut(&id).map(|actor| {
            actor.mfa_secret = secret;
            actor.mfa_enabled = enabled;
            actor.updated_at = Utc::now();
            actor.clone()
        }))
    }

    async fn get_bhp_profile(&self, id: BhpProfileId) -> Result<Option<BhpProfile>> {
        Ok(self.state.read().await.bhp_profiles.get(&id).cloned())
    }

    async fn list_available_bhps(&self) -> Result<Vec<AvailableBhp>> {
        let state = self.state.read().await;
        let mut results: Vec<_> = state
            .bhp_profiles
            .values()
            .filter_map(|p| {
                let actor = state.actors.get(&p.actor_id)?;
                (actor.active && actor.approval_status == ApprovalStatus::Approved).then(|| {
                    AvailableBhp {
                        bhp_profile_id: p.id,
                        display_name: actor.display_name.clone(),
                        organisation_name: p.organisation_name.clone(),
                    }
                })
            })
            .collect();
        results.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(results)
    }

    async fn get_bhrf_profile(&self, id: BhrfProfileId) -> Result<Option<BhrfProfile>> {
        Ok(self.state.read().await.bhrf_profiles.get(&id).cloned())
    }

    async fn facility_for_bhrf(&self, id: BhrfProfileId) -> Result<Option<FacilityId>> {
        let state = self.state.read().await;
        Ok(state
            .facilities
            .values()
            .find(|f| f.bhrf_profile_id == id)
            .map(|f| f.id))
    }

    async fn get_facility(&self, id: FacilityId) -> Result<Option<Facility>> {
        Ok(self.state.read().await.facilities.get(&id).cloned())
    }

    async fn list_facilities(&self, filter: &FacilityFilter) -> Result<Vec<Facility>> {
        let state = self.state.read().await;
        let mut results: Vec<_> = state
            .facilities
            .values()
            .filter(|f| filter.bhp_id.is_none_or(|id| f.bhp_id == id))
            .filter(|f| filter.facility_id.is_none_or(|id| f.id == id))
            .cloned()
            .collect();
        results.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(results)
    }

    async fn update_facility(
        &self,
        id: FacilityId,
        update: FacilityUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Facility>> {
        let mut state = self.state.write().await;
        Ok(state.facilities.get_mut(&id).map(|facility| {
            if let Some(name) = update.name {
                facility.name = name;
            }
            if let Some(address) = update.address {
                facility.address = Some(address);
            }
            facility.updated_at = now;
            facility.clone()
        }))
    }

    async fn get_application(
        &self,
        id: FacilityApplicationId,
    ) -> Result<Option<FacilityApplication>> {
        Ok(self.state.read().await.applications.get(&id).cloned())
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        options: &ListOptions,
    ) -> Result<Vec<FacilityApplication>> {
        let state = self.state.read().await;
        let mut results: Vec<_> = state
            .applications
            .values()
            .filter(|a| matches_application(filter, a))
            .cloned()
            .collect();
        results.sort_by_key(|a| a.created_at);
        Ok(results
            .into_iter()
            .skip(options.offset as usize)
            .take(options.limit as usize)
            .collect())
    }

    async fn count_applications(&self, filter: &ApplicationFilter) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .applications
            .values()
            .filter(|a| matches_application(filter, a))
            .count() as i64)
    }

    async fn approve_application(
        &self,
        id: FacilityApplicationId,
        decided_by: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Option<(FacilityApplication, Facility)>> {
        let mut state = self.state.write().await;
        let Some(application) = state.applications.get_mut(&id) else {
            return Ok(None);
        };
        if application.status != ApprovalStatus::Pending {
            return Ok(None);
        }

        let facility = Facility {
            id: FacilityId::new(),
            bhp_id: application.bhp_id,
            bhrf_profile_id: application.bhrf_profile_id,
            name: application.facility_name.clone(),
            address: application.address.clone(),
            created_at: now,
            updated_at: now,
        };
        application.status = ApprovalStatus::Approved;
        application.decided_by = Some(decided_by);
        application.decided_at = Some(now);
        application.facility_id = Some(facility.id);
        let application = application.clone();

        state.facilities.insert(facility.id, facility.clone());
        Ok(Some((application, facility)))
    }

    async fn reject_application(
        &self,
        id: FacilityApplicationId,
        reason: &str,
        decided_by: ActorId,
        now: DateTime<Utc>,
    ) -> Result<Option<FacilityApplication>> {
        let mut state = self.state.write().await;
        let Some(application) = state.applications.get_mut(&id) else {
            return Ok(None);
        };
        if application.status != ApprovalStatus::Pending {
            return Ok(None);
        }
        application.status = ApprovalStatus::Rejected;
        application.rejection_reason = Some(reason.to_string());
        application.decided_by = Some(decided_by);
        application.decided_at = Some(now);
        Ok(Some(application.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_bhp(email: &str) -> NewBhp {
        NewBhp {
            email: email.to_string(),
            display_name: "Dr. Rivera".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            organisation_name: Some("Rivera Behavioral".to_string()),
            phone: None,
        }
    }

    fn new_bhrf(email: &str, bhp_id: BhpProfileId) -> NewBhrf {
        NewBhrf {
            email: email.to_string(),
            display_name: "Sunrise House".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            bhp_id,
            facility_name: "Sunrise House".to_string(),
            address: Some("1 Main St".to_string()),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict_case_insensitive() {
        let store = InMemoryDirectoryStore::new();
        store.create_bhp(new_bhp("dr@example.com")).await.unwrap();
        let err = store.create_bhp(new_bhp("DR@example.com")).await.unwrap_err();
        assert!(matches!(err, GovernanceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_bhrf_registration_creates_pending_application() {
        let store = InMemoryDirectoryStore::new();
        let (_, bhp) = store.create_bhp(new_bhp("dr@example.com")).await.unwrap();
        let reg = store
            .create_bhrf(new_bhrf("house@example.com", bhp.id))
            .await
            .unwrap();

        assert_eq!(reg.actor.bhrf_profile_id, Some(reg.profile.id));
        assert_eq!(reg.application.status, ApprovalStatus::Pending);
        assert_eq!(
            store
                .count_applications(&ApplicationFilter {
                    bhp_id: Some(bhp.id),
                    status: Some(ApprovalStatus::Pending),
                })
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_bhrf_registration_requires_existing_bhp() {
        let store = InMemoryDirectoryStore::new();
        let err = store
            .create_bhrf(new_bhrf("house@example.com", BhpProfileId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::NotFound { .. }));
        assert!(store
            .find_actor_by_email("house@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_approve_application_links_facility_once() {
        let store = InMemoryDirectoryStore::new();
        let (bhp_actor, bhp) = store.create_bhp(new_bhp("dr@example.com")).await.unwrap();
        let reg = store
            .create_bhrf(new_bhrf("house@example.com", bhp.id))
            .await
            .unwrap();

        let (application, facility) = store
            .approve_application(reg.application.id, bhp_actor.id, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(application.facility_id, Some(facility.id));
        assert_eq!(facility.bhp_id, bhp.id);
        assert_eq!(
            store.facility_for_bhrf(reg.profile.id).await.unwrap(),
            Some(facility.id)
        );

        let again = store
            .approve_application(reg.application.id, bhp_actor.id, Utc::now())
            .await
            .unwrap();
        assert!(again.is_none());
        assert_eq!(
            store.list_facilities(&FacilityFilter::default()).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_decide_actor_is_compare_and_set() {
        let store = InMemoryDirectoryStore::new();
        let (actor, _) = store.create_bhp(new_bhp("dr@example.com")).await.unwrap();
        let approve = Decided {
            status: ApprovalStatus::Approved,
            reason: None,
        };

        let admin = ActorId::new();
        assert!(store
            .decide_actor(actor.id, &approve, admin, Utc::now())
            .await
            .unwrap()
            .is_some());
        assert!(store
            .decide_actor(actor.id, &approve, admin, Utc::now())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_available_bhps_only_lists_approved() {
        let store = InMemoryDirectoryStore::new();
        let (approved, _) = store.create_bhp(new_bhp("a@example.com")).await.unwrap();
        store.create_bhp(new_bhp("b@example.com")).await.unwrap();
        store
            .decide_actor(
                approved.id,
                &Decided {
                    status: ApprovalStatus::Approved,
                    reason: None,
                },
                ActorId::new(),
                Utc::now(),
            )
            .await
            .unwrap();

        let listed = store.list_available_bhps().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(Some(listed[0].bhp_profile_id), approved.bhp_profile_id);
    }
}
