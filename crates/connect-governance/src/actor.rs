//! Actors and their profiles.
//!
//! [`ActorRecord`] is the stored account row. [`Actor`] is the resolved
//! request context handed to every component: a closed enum over the three
//! roles, carrying exactly the ownership links the gate needs.

use chrono::{DateTime, Utc};
use connect_core::{ActorId, BhpProfileId, BhrfProfileId, FacilityId};
use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, Result};
use crate::types::{ApprovalStatus, Role};

// ============================================================================
// Stored records
// ============================================================================

/// An account as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRecord {
    /// Unique identifier.
    pub id: ActorId,
    /// Login email, unique.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Argon2id PHC hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Role, fixed at registration.
    pub role: Role,
    /// Registration approval status.
    pub approval_status: ApprovalStatus,
    /// Reason given on rejection.
    pub rejection_reason: Option<String>,
    /// Linked BHP profile (BHP actors only).
    pub bhp_profile_id: Option<BhpProfileId>,
    /// Linked BHRF profile (BHRF actors only).
    pub bhrf_profile_id: Option<BhrfProfileId>,
    /// Soft-disable flag. Actors are never deleted.
    pub active: bool,
    /// Base32 TOTP secret, set by MFA setup.
    #[serde(skip_serializing)]
    pub mfa_secret: Option<String>,
    /// Whether a TOTP code is required at login.
    pub mfa_enabled: bool,
    /// Admin who decided the registration.
    pub decided_by: Option<ActorId>,
    /// When the registration was decided.
    pub decided_at: Option<DateTime<Utc>>,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// When last updated.
    pub updated_at: DateTime<Utc>,
}

impl ActorRecord {
    /// Build the request context for this account.
    ///
    /// `facility` is the facility linked to the BHRF profile, if any; it is
    /// ignored for other roles.
    pub fn to_actor(&self, facility: Option<FacilityId>) -> Result<Actor> {
        let actor = match self.role {
            Role::Admin => Actor::Admin(AdminActor {
                id: self.id,
                approval_status: self.approval_status,
            }),
            Role::Bhp => Actor::Bhp(BhpActor {
                id: self.id,
                approval_status: self.approval_status,
                bhp_profile_id: self.bhp_profile_id.ok_or_else(|| {
                    GovernanceError::Storage(format!("BHP actor {} has no profile", self.id))
                })?,
            }),
            Role::Bhrf => Actor::Bhrf(BhrfActor {
                id: self.id,
                approval_status: self.approval_status,
                bhrf_profile_id: self.bhrf_profile_id.ok_or_else(|| {
                    GovernanceError::Storage(format!("BHRF actor {} has no profile", self.id))
                })?,
                facility_id: facility,
            }),
        };
        Ok(actor)
    }
}

/// Profile of a Behavioral Health Professional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BhpProfile {
    /// Unique identifier.
    pub id: BhpProfileId,
    /// Owning actor.
    pub actor_id: ActorId,
    /// Organisation shown on the registration form.
    pub organisation_name: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// When created.
    pub created_at: DateTime<Utc>,
}

/// Profile of a residential facility operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BhrfProfile {
    /// Unique identifier.
    pub id: BhrfProfileId,
    /// Owning actor.
    pub actor_id: ActorId,
    /// When created.
    pub created_at: DateTime<Utc>,
}

/// Public listing entry for the BHRF registration form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableBhp {
    /// Profile to reference in the facility application.
    pub bhp_profile_id: BhpProfileId,
    /// Display name.
    pub display_name: String,
    /// Organisation, if any.
    pub organisation_name: Option<String>,
}

// ============================================================================
// Request context
// ============================================================================

/// Administrator context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminActor {
    pub id: ActorId,
    pub approval_status: ApprovalStatus,
}

/// BHP context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BhpActor {
    pub id: ActorId,
    pub approval_status: ApprovalStatus,
    pub bhp_profile_id: BhpProfileId,
}

/// BHRF context. `facility_id` stays `None` until the application is approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BhrfActor {
    pub id: ActorId,
    pub approval_status: ApprovalStatus,
    pub bhrf_profile_id: BhrfProfileId,
    pub facility_id: Option<FacilityId>,
}

/// The resolved caller, passed explicitly into every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Admin(AdminActor),
    Bhp(BhpActor),
    Bhrf(BhrfActor),
}

impl Actor {
    #[must_use]
    pub fn id(&self) -> ActorId {
        match self {
            Self::Admin(a) => a.id,
            Self::Bhp(b) => b.id,
            Self::Bhrf(r) => r.id,
        }
    }

    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::Admin(_) => Role::Admin,
            Self::Bhp(_) => Role::Bhp,
            Self::Bhrf(_) => Role::Bhrf,
        }
    }

    #[must_use]
    pub fn approval_status(&self) -> ApprovalStatus {
        match self {
            Self::Admin(a) => a.approval_status,
            Self::Bhp(b) => b.approval_status,
            Self::Bhrf(r) => r.approval_status,
        }
    }

    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.approval_status() == ApprovalStatus::Approved
    }

    /// BHP profile, for BHP actors.
    #[must_use]
    pub fn bhp_profile_id(&self) -> Option<BhpProfileId> {
        match self {
            Self::Bhp(b) => Some(b.bhp_profile_id),
            _ => None,
        }
    }

    /// Linked facility, for BHRF actors whose application was approved.
    #[must_use]
    pub fn bhrf_facility_id(&self) -> Option<FacilityId> {
        match self {
            Self::Bhrf(r) => r.facility_id,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(role: Role) -> ActorRecord {
        let now = Utc::now();
        ActorRecord {
            id: ActorId::new(),
            email: "someone@example.com".to_string(),
            display_name: "Someone".to_string(),
            password_hash: "$argon2id$".to_string(),
            role,
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
        }
    }

    #[test]
    fn test_bhp_record_resolves_with_profile() {
        let mut rec = record(Role::Bhp);
        let profile = BhpProfileId::new();
        rec.bhp_profile_id = Some(profile);

        let actor = rec.to_actor(None).unwrap();
        assert_eq!(actor.role(), Role::Bhp);
        assert_eq!(actor.bhp_profile_id(), Some(profile));
        assert!(actor.is_approved());
    }

    #[test]
    fn test_bhp_record_without_profile_is_an_error() {
        let rec = record(Role::Bhp);
        assert!(matches!(rec.to_actor(None), Err(GovernanceError::Storage(_))));
    }

    #[test]
    fn test_bhrf_record_carries_facility() {
        let mut rec = record(Role::Bhrf);
        rec.bhrf_profile_id = Some(BhrfProfileId::new());
        let facility = FacilityId::new();

        let actor = rec.to_actor(Some(facility)).unwrap();
        assert_eq!(actor.bhrf_facility_id(), Some(facility));
        assert_eq!(actor.bhp_profile_id(), None);
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let mut rec = record(Role::Admin);
        rec.mfa_secret = Some("JBSWY3DPEHPK3PXP".to_string());
        let json = serde_json::to_value(&rec).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("mfa_secret").is_none());
    }
}
