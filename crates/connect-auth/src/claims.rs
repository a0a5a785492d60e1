//! Session claims issued at login.
//!
//! `SessionClaims` carries the RFC 7519 registered claims plus the BHP
//! Connect identity snapshot: role, approval status and the linked profile.

use chrono::{Duration, Utc};
use connect_core::{ActorId, BhpProfileId, BhrfProfileId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer written into every token unless overridden.
pub const DEFAULT_ISSUER: &str = "bhp-connect";

/// Session token claims.
///
/// # Example
///
/// ```rust
/// use connect_auth::SessionClaims;
/// use connect_core::ActorId;
///
/// let actor = ActorId::new();
/// let claims = SessionClaims::builder()
///     .subject(actor.to_string())
///     .role("BHRF")
///     .approval_status("APPROVED")
///     .expires_in_secs(3600)
///     .build();
///
/// assert_eq!(claims.actor_id(), Some(actor));
/// assert!(claims.has_role("BHRF"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    /// Subject - the actor ID.
    pub sub: String,

    /// Issuer - who created the token.
    pub iss: String,

    /// Audience - intended recipients.
    #[serde(default)]
    pub aud: Vec<String>,

    /// Expiration time as Unix timestamp.
    pub exp: i64,

    /// Issued at as Unix timestamp.
    pub iat: i64,

    /// JWT ID - unique identifier for this token.
    pub jti: String,

    /// Role at login time (`ADMIN`, `BHP` or `BHRF`).
    pub role: String,

    /// Approval status at login time.
    pub approval_status: String,

    /// Linked BHP profile, present for BHP actors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bhp_profile_id: Option<Uuid>,

    /// Linked BHRF profile, present for BHRF actors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bhrf_profile_id: Option<Uuid>,

    /// Actor email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl SessionClaims {
    /// Create a new builder for constructing session claims.
    #[must_use]
    pub fn builder() -> SessionClaimsBuilder {
        SessionClaimsBuilder::default()
    }

    /// Check if the token is expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Parse the subject as an actor ID.
    #[must_use]
    pub fn actor_id(&self) -> Option<ActorId> {
        self.sub.parse().ok()
    }

    /// Check the role snapshot.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role.eq_ignore_ascii_case(role)
    }

    /// Linked BHP profile as a typed ID.
    #[must_use]
    pub fn bhp_profile(&self) -> Option<BhpProfileId> {
        self.bhp_profile_id.map(BhpProfileId::from_uuid)
    }

    /// Linked BHRF profile as a typed ID.
    #[must_use]
    pub fn bhrf_profile(&self) -> Option<BhrfProfileId> {
        self.bhrf_profile_id.map(BhrfProfileId::from_uuid)
    }
}

/// Builder for constructing session claims.
#[derive(Debug, Default)]
pub struct SessionClaimsBuilder {
    sub: Option<String>,
    iss: Option<String>,
    aud: Vec<String>,
    exp: Option<i64>,
    iat: Option<i64>,
    jti: Option<String>,
    role: Option<String>,
    approval_status: Option<String>,
    bhp_profile_id: Option<Uuid>,
    bhrf_profile_id: Option<Uuid>,
    email: Option<String>,
}

impl SessionClaimsBuilder {
    /// Set the subject (actor ID).
    #[must_use]
    pub fn subject(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Set the issuer.
    #[must_use]
    pub fn issuer(mut self, iss: impl Into<String>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Set the audience.
    #[must_use]
    pub fn audience(mut self, aud: Vec<impl Into<String>>) -> Self {
        self.aud = aud.into_iter().map(Into::into).collect();
        self
    }

    /// Set expiration time as Unix timestamp.
    #[must_use]
    pub fn expiration(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Set expiration time as seconds from now.
    #[must_use]
    pub fn expires_in_secs(mut self, secs: i64) -> Self {
        self.exp = Some(Utc::now().timestamp() + secs);
        self
    }

    /// Set expiration time using a Duration.
    #[must_use]
    pub fn expires_in(mut self, duration: Duration) -> Self {
        self.exp = Some((Utc::now() + duration).timestamp());
        self
    }

    /// Set the JWT ID.
    #[must_use]
    pub fn jwt_id(mut self, jti: impl Into<String>) -> Self {
        self.jti = Some(jti.into());
        self
    }

    /// Set the role snapshot.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the approval status snapshot.
    #[must_use]
    pub fn approval_status(mut self, status: impl Into<String>) -> Self {
        self.approval_status = Some(status.into());
        self
    }

    /// Set the linked BHP profile.
    #[must_use]
    pub fn bhp_profile(mut self, id: BhpProfileId) -> Self {
        self.bhp_profile_id = Some(id.into_inner());
        self
    }

    /// Set the linked BHRF profile.
    #[must_use]
    pub fn bhrf_profile(mut self, id: BhrfProfileId) -> Self {
        self.bhrf_profile_id = Some(id.into_inner());
        self
    }

    /// Set the actor's email address.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Build the session claims.
    ///
    /// # Defaults
    ///
    /// - `iss`: [`DEFAULT_ISSUER`]
    /// - `exp`: 8 hours from now
    /// - `iat`: current time
    /// - `jti`: new UUID v4
    /// - `approval_status`: `PENDING`
    #[must_use]
    pub fn build(self) -> SessionClaims {
        let now = Utc::now().timestamp();

        SessionClaims {
            sub: self.sub.unwrap_or_default(),
            iss: self.iss.unwrap_or_else(|| DEFAULT_ISSUER.to_string()),
            aud: self.aud,
            exp: self.exp.unwrap_or(now + 8 * 3600),
            iat: self.iat.unwrap_or(now),
            jti: self.jti.unwrap_or_else(|| Uuid::new_v4().to_string()),
            role: self.role.unwrap_or_default(),
            approval_status: self
                .approval_status
                .unwrap_or_else(|| "PENDING".to_string()),
            bhp_profile_id: self.bhp_profile_id,
            bhrf_profile_id: self.bhrf_profile_id,
            email: self.email,
        }
    }
}
