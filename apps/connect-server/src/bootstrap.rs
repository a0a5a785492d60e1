//! First administrator bootstrap.
//!
//! Administrators cannot register through the API. When
//! `BOOTSTRAP_ADMIN_EMAIL` and `BOOTSTRAP_ADMIN_PASSWORD` are set, startup
//! creates that account unless the email is already taken.

use chrono::Utc;
use connect_auth::{AuthError, PasswordHasher};
use connect_core::ActorId;
use connect_db::PgDirectoryStore;
use connect_governance::services::DirectoryStore;
use connect_governance::{ActorRecord, ApprovalStatus, GovernanceError, Role};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::BootstrapAdmin;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Failed to hash bootstrap admin password: {0}")]
    Hash(#[from] AuthError),

    #[error("Failed to create bootstrap admin: {0}")]
    Store(#[from] GovernanceError),
}

/// Create the bootstrap admin if missing. Returns whether it was created.
#[instrument(skip_all, name = "admin_bootstrap")]
pub async fn ensure_admin(
    directory: &PgDirectoryStore,
    admin: &BootstrapAdmin,
    passwords: &PasswordHasher,
) -> Result<bool, BootstrapError> {
    let email = admin.email.trim().to_lowercase();
    if let Some(existing) = directory.find_actor_by_email(&email).await? {
        info!(actor_id = %existing.id, role = %existing.role, "Bootstrap admin already present");
        return Ok(false);
    }

    let now = Utc::now();
    let record = ActorRecord {
        id: ActorId::new(),
        email,
        display_name: "Administrator".to_string(),
        password_hash: passwords.hash(&admin.password)?,
        role: Role::Admin,
        approval_status: ApprovalStatus::Approved,
        rejection_reason: None,
        bhp_profile_id: None,
        bhrf_profile_id: None,
        active: true,
        mfa_secret: None,
        mfa_enabled: false,
        decided_by: None,
        decided_at: Some(now),
        created_at: now,
        updated_at: now,
    };
    directory.insert_record(&record).await?;

    info!(actor_id = %record.id, "Bootstrap admin created");
    Ok(true)
}
