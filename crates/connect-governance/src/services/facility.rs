//! Facilities and facility applications.

use std::sync::Arc;

use chrono::Utc;
use connect_core::{FacilityApplicationId, FacilityId};

use super::directory::{
    ApplicationFilter, DirectoryStore, Facility, FacilityApplication, FacilityFilter,
    FacilityUpdate,
};
use super::ListOptions;
use crate::actor::Actor;
use crate::approval::{self, ApprovalDecision};
use crate::audit::{AuditAction, AuditInput, AuditRecorder, RequestMetadata};
use crate::error::{GovernanceError, Result};
use crate::gate::{authorize, authorize_visible, can_access, Action, DenyReason, Target};
use crate::types::ApprovalStatus;

/// Service for facilities and the applications that create them.
pub struct FacilityService {
    directory: Arc<dyn DirectoryStore>,
    audit: AuditRecorder,
}

impl FacilityService {
    pub fn new(directory: Arc<dyn DirectoryStore>, audit: AuditRecorder) -> Self {
        Self { directory, audit }
    }

    /// Load a facility the actor may perform `action` on.
    ///
    /// A facility the actor may not even read is reported as not found.
    pub async fn load_for(
        &self,
        actor: &Actor,
        id: FacilityId,
        action: Action,
    ) -> Result<Facility> {
        let facility = self
            .directory
            .get_facility(id)
            .await?
            .ok_or_else(|| GovernanceError::not_found("Facility", id))?;
        authorize_visible(
            actor,
            action,
            &Target::Facility(facility.gate_ref()),
            "Facility",
            id,
        )?;
        Ok(facility)
    }

    /// Facilities visible to the actor.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<Facility>> {
        let filter = match actor {
            Actor::Bhp(bhp) => FacilityFilter {
                bhp_id: Some(bhp.bhp_profile_id),
                ..Default::default()
            },
            Actor::Bhrf(bhrf) => match bhrf.facility_id {
                Some(id) => FacilityFilter {
                    facility_id: Some(id),
                    ..Default::default()
                },
                None => return Ok(Vec::new()),
            },
            Actor::Admin(_) => return Ok(Vec::new()),
        };
        let facilities = self.directory.list_facilities(&filter).await?;
        Ok(facilities
            .into_iter()
            .filter(|f| can_access(actor, Action::Read, &Target::Facility(f.gate_ref())).is_allowed())
            .collect())
    }

    /// Update facility details. BHP owner only.
    pub async fn update(
        &self,
        actor: &Actor,
        id: FacilityId,
        update: FacilityUpdate,
        metadata: RequestMetadata,
    ) -> Result<Facility> {
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(GovernanceError::validation("name", "Must not be empty"));
            }
        }
        self.load_for(actor, id, Action::ManageFacility).await?;

        let updated = self
            .directory
            .update_facility(id, update, Utc::now())
            .await?
            .ok_or_else(|| GovernanceError::not_found("Facility", id))?;

        let _ = self
            .audit
            .record(AuditInput {
                actor_id: Some(actor.id()),
                action: AuditAction::FacilityUpdated,
                entity_type: "Facility".to_string(),
                entity_id: Some(id.into_inner()),
                details: Some(serde_json::json!({ "name": updated.name, "address": updated.address })),
                metadata,
            })
            .await;
        Ok(updated)
    }

    /// Applications addressed to the calling BHP.
    pub async fn list_applications(
        &self,
        actor: &Actor,
        status: Option<ApprovalStatus>,
        options: &ListOptions,
    ) -> Result<(Vec<FacilityApplication>, i64)> {
        let bhp_id = actor
            .bhp_profile_id()
            .ok_or(GovernanceError::Forbidden(DenyReason::RoleNotPermitted))?;
        authorize(actor, Action::Read, &Target::BhpProfile(bhp_id))?;

        let filter = ApplicationFilter {
            bhp_id: Some(bhp_id),
            status,
        };
        let items = self.directory.list_applications(&filter, options).await?;
        let total = self.directory.count_applications(&filter).await?;
        Ok((items, total))
    }

    /// Approve or reject a pending application. Referenced BHP only, exactly once.
    pub async fn decide_application(
        &self,
        actor: &Actor,
        id: FacilityApplicationId,
        decision: ApprovalDecision,
        metadata: RequestMetadata,
    ) -> Result<FacilityApplication> {
        let application = self
            .directory
            .get_application(id)
            .await?
            .ok_or_else(|| GovernanceError::not_found("FacilityApplication", id))?;
        authorize_visible(
            actor,
            Action::Decide,
            &Target::BhpProfile(application.bhp_id),
            "FacilityApplication",
            id,
        )?;

        let decided = approval::decide(application.status, &decision)?;
        let now = Utc::now();

        let outcome = match decided.reason.as_deref() {
            None => self
                .directory
                .approve_application(id, actor.id(), now)
                .await?
                .map(|(app, facility)| (app, Some(facility))),
            Some(reason) => self
                .directory
                .reject_application(id, reason, actor.id(), now)
                .await?
                .map(|app| (app, None)),
        };

        let Some((updated, facility)) = outcome else {
            let status = self
                .directory
                .get_application(id)
                .await?
                .map_or(application.status, |a| a.status);
            return Err(GovernanceError::invalid_transition(
                status,
                decision.event_name(),
            ));
        };

        let action = if facility.is_some() {
            AuditAction::FacilityApplicationApproved
        } else {
            AuditAction::FacilityApplicationRejected
        };
        tracing::info!(
            actor_id = %actor.id(),
            application_id = %id,
            status = %updated.status,
            facility_id = ?updated.facility_id,
            "Facility application decided"
        );
        let _ = self
            .audit
            .record(AuditInput {
                actor_id: Some(actor.id()),
                action,
                entity_type: "FacilityApplication".to_string(),
                entity_id: Some(id.into_inner()),
                details: Some(serde_json::json!({
                    "facility_id": updated.facility_id,
                    "reason": updated.rejection_reason,
                })),
                metadata,
            })
            .await;

        Ok(updated)
    }
}
