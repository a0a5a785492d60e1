//! Actor registration, resolution and registration decisions.

use std::sync::Arc;

use chrono::Utc;
use connect_core::ActorId;

use super::directory::{ActorFilter, DirectoryStore, NewBhp, NewBhrf, RegisteredBhrf};
use super::ListOptions;
use crate::actor::{Actor, ActorRecord, AvailableBhp};
use crate::approval::{self, ApprovalDecision};
use crate::audit::{AuditAction, AuditInput, AuditRecorder, RequestMetadata};
use crate::email::{EmailSender, OutgoingEmail};
use crate::error::{GovernanceError, Result};
use crate::gate::{authorize, Action, Target};
use crate::types::{ApprovalStatus, Role};

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GovernanceError::validation(field, "Must not be empty"));
    }
    Ok(())
}

/// Service for actor accounts.
pub struct ActorService {
    directory: Arc<dyn DirectoryStore>,
    audit: AuditRecorder,
    email: Arc<dyn EmailSender>,
}

impl ActorService {
    pub fn new(
        directory: Arc<dyn DirectoryStore>,
        audit: AuditRecorder,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            directory,
            audit,
            email,
        }
    }

    /// Register a BHP. The password must already be hashed.
    pub async fn register_bhp(
        &self,
        input: NewBhp,
        metadata: RequestMetadata,
    ) -> Result<ActorRecord> {
        require_text("display_name", &input.display_name)?;
        let (actor, profile) = self.directory.create_bhp(input).await?;

        tracing::info!(actor_id = %actor.id, bhp_profile_id = %profile.id, "BHP registered");
        let _ = self
            .audit
            .record(AuditInput {
                actor_id: Some(actor.id),
                action: AuditAction::UserRegistered,
                entity_type: "User".to_string(),
                entity_id: Some(actor.id.into_inner()),
                details: Some(serde_json::json!({ "role": Role::Bhp })),
                metadata,
            })
            .await;

        Ok(actor)
    }

    /// Register a BHRF and its facility application against an approved BHP.
    pub async fn register_bhrf(
        &self,
        input: NewBhrf,
        metadata: RequestMetadata,
    ) -> Result<RegisteredBhrf> {
        require_text("display_name", &input.display_name)?;
        require_text("facility_name", &input.facility_name)?;

        let target_approved = match self.directory.get_bhp_profile(input.bhp_id).await? {
            Some(profile) => self
                .directory
                .get_actor(profile.actor_id)
                .await?
                .is_some_and(|a| a.active && a.approval_status == ApprovalStatus::Approved),
            None => false,
        };
        if !target_approved {
            return Err(GovernanceError::not_found("BhpProfile", input.bhp_id));
        }

        let registered = self.directory.create_bhrf(input).await?;

        tracing::info!(
            actor_id = %registered.actor.id,
            application_id = %registered.application.id,
            bhp_profile_id = %registered.application.bhp_id,
            "BHRF registered"
        );
        let _ = self
            .audit
            .record(AuditInput {
                actor_id: Some(registered.actor.id),
                action: AuditAction::UserRegistered,
                entity_type: "User".to_string(),
                entity_id: Some(registered.actor.id.into_inner()),
                details: Some(serde_json::json!({
                    "role": Role::Bhrf,
                    "facility_application_id": registered.application.id,
                })),
                metadata,
            })
            .await;

        Ok(registered)
    }

    /// Approved BHPs a BHRF may apply to.
    pub async fn available_bhps(&self) -> Result<Vec<AvailableBhp>> {
        self.directory.list_available_bhps().await
    }

    /// Resolve a session subject into the request context.
    ///
    /// Missing and soft-disabled accounts are `Unauthorized`.
    pub async fn resolve(&self, actor_id: ActorId) -> Result<Actor> {
        let record = self.active_record(actor_id).await?;
        let facility = match record.bhrf_profile_id {
            Some(profile) => self.directory.facility_for_bhrf(profile).await?,
            None => None,
        };
        record.to_actor(facility)
    }

    /// Own account record, for the status page.
    pub async fn own_record(&self, actor: &Actor) -> Result<ActorRecord> {
        authorize(actor, Action::ViewOwnStatus, &Target::OwnAccount)?;
        self.active_record(actor.id()).await
    }

    async fn active_record(&self, actor_id: ActorId) -> Result<ActorRecord> {
        self.directory
            .get_actor(actor_id)
            .await?
            .filter(|a| a.active)
            .ok_or_else(|| GovernanceError::Unauthorized("Unknown or disabled account".to_string()))
    }

    /// Account lookup for login.
    pub async fn find_for_login(&self, email: &str) -> Result<Option<ActorRecord>> {
        Ok(self
            .directory
            .find_actor_by_email(email.trim())
            .await?
            .filter(|a| a.active))
    }

    /// Actors awaiting a registration decision. Admin only.
    pub async fn pending_actors(
        &self,
        actor: &Actor,
        options: &ListOptions,
    ) -> Result<(Vec<ActorRecord>, i64)> {
        authorize(actor, Action::ViewAdminAggregate, &Target::AdminView)?;
        let filter = ActorFilter {
            status: Some(ApprovalStatus::Pending),
            ..Default::default()
        };
        let items = self.directory.list_actors(&filter, options).await?;
        let total = self.directory.count_actors(&filter).await?;
        Ok((items, total))
    }

    /// Approve or reject a pending registration. Admin only, exactly once.
    pub async fn decide_actor(
        &self,
        actor: &Actor,
        target_id: ActorId,
        decision: ApprovalDecision,
        metadata: RequestMetadata,
    ) -> Result<ActorRecord> {
        authorize(actor, Action::DecideRegistration, &Target::AdminView)?;

        let current = self
            .directory
            .get_actor(target_id)
            .await?
            .ok_or_else(|| GovernanceError::not_found("User", target_id))?;
        let decided = approval::decide(current.approval_status, &decision)?;

        let Some(updated) = self
            .directory
            .decide_actor(target_id, &decided, actor.id(), Utc::now())
            .await?
        else {
            let status = self
                .directory
                .get_actor(target_id)
                .await?
                .map_or(current.approval_status, |a| a.approval_status);
            return Err(GovernanceError::invalid_transition(
                status,
                decision.event_name(),
            ));
        };

        let action = match updated.approval_status {
            ApprovalStatus::Rejected => AuditAction::UserRejected,
            _ => AuditAction::UserApproved,
        };
        tracing::info!(
            actor_id = %actor.id(),
            target_id = %target_id,
            status = %updated.approval_status,
            "Registration decided"
        );
        let _ = self
            .audit
            .record(AuditInput {
                actor_id: Some(actor.id()),
                action,
                entity_type: "User".to_string(),
                entity_id: Some(target_id.into_inner()),
                details: Some(serde_json::json!({
                    "status": updated.approval_status,
                    "reason": updated.rejection_reason,
                })),
                metadata,
            })
            .await;

        self.notify_decision(&updated).await;
        Ok(updated)
    }

    async fn notify_decision(&self, record: &ActorRecord) {
        let (subject, html) = match &record.rejection_reason {
            None => (
                "Your BHP Connect registration was approved".to_string(),
                format!("<p>Hello {},</p><p>Your account is now active.</p>", record.display_name),
            ),
            Some(reason) => (
                "Your BHP Connect registration was not approved".to_string(),
                format!(
                    "<p>Hello {},</p><p>Your registration was rejected: {reason}</p>",
                    record.display_name
                ),
            ),
        };
        let email = OutgoingEmail {
            to: vec![record.email.clone()],
            subject,
            html,
        };
        if let Err(e) = self.email.send(email).await {
            tracing::warn!(
                actor_id = %record.id,
                error = %e,
                "Failed to send registration decision email"
            );
        }
    }

    /// Store a freshly generated TOTP secret. MFA stays disabled until confirmed.
    pub async fn store_mfa_secret(&self, actor: &Actor, secret: String) -> Result<()> {
        authorize(actor, Action::ViewOwnStatus, &Target::OwnAccount)?;
        self.directory
            .set_mfa(actor.id(), Some(secret), false)
            .await?
            .ok_or_else(|| GovernanceError::not_found("User", actor.id()))?;
        Ok(())
    }

    /// Pending TOTP secret for confirmation.
    pub async fn mfa_secret(&self, actor: &Actor) -> Result<Option<String>> {
        Ok(self.own_record(actor).await?.mfa_secret)
    }

    /// Turn MFA on once the caller proved possession of the secret.
    pub async fn enable_mfa(&self, actor: &Actor, metadata: RequestMetadata) -> Result<()> {
        let record = self.own_record(actor).await?;
        let secret = record
            .mfa_secret
            .ok_or_else(|| GovernanceError::validation("code", "MFA setup has not been started"))?;
        self.directory
            .set_mfa(actor.id(), Some(secret), true)
            .await?
            .ok_or_else(|| GovernanceError::not_found("User", actor.id()))?;

        let _ = self
            .audit
            .record(AuditInput {
                actor_id: Some(actor.id()),
                action: AuditAction::MfaEnabled,
                entity_type: "User".to_string(),
                entity_id: Some(actor.id().into_inner()),
                metadata,
                ..Default::default()
            })
            .await;
        Ok(())
    }
}
