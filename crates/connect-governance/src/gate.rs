//! Authorization gate.
//!
//! [`can_access`] answers "may this actor perform this action on this
//! target?" with no side effects. Rules are evaluated in order and the
//! first match wins:
//!
//! 1. Self-service on the actor's own account (status page, sign-out) is
//!    always allowed, whatever the approval status.
//! 2. An actor that is not APPROVED is denied everything else.
//! 3. ADMIN may decide registrations and read aggregate admin views, and
//!    nothing else.
//! 4. Facility targets require the ownership chain to reach the facility,
//!    then apply the per-role action split.
//! 5. BHP-profile targets require the caller to own the profile.
//! 6. Default deny (fail-closed).

use std::fmt;

use connect_core::{BhpProfileId, FacilityId};
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::error::{GovernanceError, Result};

/// What the caller is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read the own account status page.
    ViewOwnStatus,
    /// End the session.
    SignOut,
    /// Approve or reject an actor registration.
    DecideRegistration,
    /// Read aggregate admin views, including the audit log.
    ViewAdminAggregate,
    /// Read a scoped entity.
    Read,
    /// Mutate a scoped entity outside the authoring flow: messages, uploads,
    /// artifact deletion and policy-checked edits.
    Write,
    /// Create, draft or submit a workflow document.
    Author,
    /// Decide a workflow document or facility application.
    Decide,
    /// Request a compliance artifact from a facility.
    Request,
    /// Update the facility record itself. Overseeing BHP only.
    ManageFacility,
}

impl Action {
    /// Actions an actor may always take on their own account.
    #[must_use]
    pub fn is_self_service(&self) -> bool {
        matches!(self, Self::ViewOwnStatus | Self::SignOut)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ViewOwnStatus => "view_own_status",
            Self::SignOut => "sign_out",
            Self::DecideRegistration => "decide_registration",
            Self::ViewAdminAggregate => "view_admin_aggregate",
            Self::Read => "read",
            Self::Write => "write",
            Self::Author => "author",
            Self::Decide => "decide",
            Self::Request => "request",
            Self::ManageFacility => "manage_facility",
        };
        f.write_str(s)
    }
}

/// Ownership facts of a facility, enough for the gate to decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacilityRef {
    pub facility_id: FacilityId,
    pub bhp_id: BhpProfileId,
}

/// What the action is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The caller's own account.
    OwnAccount,
    /// Cross-tenant aggregate views (pending users, audit log).
    AdminView,
    /// Anything scoped to a facility.
    Facility(FacilityRef),
    /// Anything scoped to a BHP profile directly.
    BhpProfile(BhpProfileId),
}

/// Why the gate said no. Logged, never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    NotApproved,
    AdminScope,
    NotOwner,
    RoleNotPermitted,
    NoRule,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotApproved => "actor not approved",
            Self::AdminScope => "outside admin scope",
            Self::NotOwner => "ownership chain does not reach target",
            Self::RoleNotPermitted => "role may not perform action",
            Self::NoRule => "no rule allows action",
        };
        f.write_str(s)
    }
}

/// Gate outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decide whether `actor` may perform `action` on `target`.
#[must_use]
pub fn can_access(actor: &Actor, action: Action, target: &Target) -> Decision {
    if action.is_self_service() {
        return match target {
            Target::OwnAccount => Decision::Allow,
            _ => Decision::Deny(DenyReason::NoRule),
        };
    }

    if !actor.is_approved() {
        return Decision::Deny(DenyReason::NotApproved);
    }

    match (actor, target) {
        (Actor::Admin(_), Target::AdminView) => match action {
            Action::DecideRegistration | Action::ViewAdminAggregate => Decision::Allow,
            _ => Decision::Deny(DenyReason::AdminScope),
        },
        (Actor::Admin(_), _) => Decision::Deny(DenyReason::AdminScope),

        (Actor::Bhp(bhp), Target::Facility(facility)) => {
            if facility.bhp_id != bhp.bhp_profile_id {
                return Decision::Deny(DenyReason::NotOwner);
            }
            match action {
                Action::Read
                | Action::Write
                | Action::Decide
                | Action::Request
                | Action::ManageFacility => Decision::Allow,
                _ => Decision::Deny(DenyReason::RoleNotPermitted),
            }
        }
        (Actor::Bhrf(bhrf), Target::Facility(facility)) => {
            if bhrf.facility_id != Some(facility.facility_id) {
                return Decision::Deny(DenyReason::NotOwner);
            }
            match action {
                Action::Read | Action::Write | Action::Author => Decision::Allow,
                _ => Decision::Deny(DenyReason::RoleNotPermitted),
            }
        }

        (Actor::Bhp(bhp), Target::BhpProfile(profile)) => {
            if *profile != bhp.bhp_profile_id {
                return Decision::Deny(DenyReason::NotOwner);
            }
            match action {
                Action::Read | Action::Write | Action::Decide | Action::Request => {
                    Decision::Allow
                }
                _ => Decision::Deny(DenyReason::RoleNotPermitted),
            }
        }
        (Actor::Bhrf(_), Target::BhpProfile(_)) => Decision::Deny(DenyReason::NotOwner),

        _ => Decision::Deny(DenyReason::NoRule),
    }
}

/// [`can_access`] as a `Result`, logging the denial.
pub fn authorize(actor: &Actor, action: Action, target: &Target) -> Result<()> {
    match can_access(actor, action, target) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            tracing::debug!(
                target: "gate",
                actor_id = %actor.id(),
                role = %actor.role(),
                action = %action,
                reason = %reason,
                "Access denied"
            );
            Err(GovernanceError::Forbidden(reason))
        }
    }
}

/// [`authorize`] for targets loaded by id.
///
/// When the actor may not even read the target, the result is `NotFound`
/// so the target's existence is not revealed. Unapproved actors still get
/// `Forbidden`.
pub fn authorize_visible(
    actor: &Actor,
    action: Action,
    target: &Target,
    resource: &'static str,
    id: impl fmt::Display,
) -> Result<()> {
    match can_access(actor, Action::Read, target) {
        Decision::Allow => authorize(actor, action, target),
        Decision::Deny(DenyReason::NotApproved) => {
            Err(GovernanceError::Forbidden(DenyReason::NotApproved))
        }
        Decision::Deny(reason) => {
            tracing::debug!(
                target: "gate",
                actor_id = %actor.id(),
                action = %action,
                reason = %reason,
                "Target hidden from actor"
            );
            Err(GovernanceError::not_found(resource, id))
        }
    }
}
