//! Registration, login and account models.

use chrono::{DateTime, Utc};
use connect_governance::ActorRecord;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Request to register a Behavioral Health Professional.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterBhpRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub display_name: String,

    #[validate(length(max = 255, message = "Organisation must not exceed 255 characters"))]
    pub organisation_name: Option<String>,

    #[validate(length(max = 32, message = "Phone must not exceed 32 characters"))]
    pub phone: Option<String>,
}

/// Request to register a facility operator together with its facility application.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterBhrfRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub display_name: String,

    /// BHP profile chosen from `GET /auth/bhps`.
    pub bhp_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Facility name must be 1-255 characters"))]
    pub facility_name: String,

    #[validate(length(max = 500, message = "Address must not exceed 500 characters"))]
    pub address: Option<String>,
}

/// Result of a registration. The account starts PENDING.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegistrationResponse {
    pub actor_id: Uuid,
    pub role: String,
    pub approval_status: String,
    /// Facility application created alongside a BHRF registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility_application_id: Option<Uuid>,
}

/// Entry of the public BHP listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailableBhpResponse {
    pub bhp_id: Uuid,
    pub display_name: String,
    pub organisation_name: Option<String>,
}

/// Login request.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,

    /// Current TOTP code, required once MFA is enabled.
    pub code: Option<String>,
}

/// Issued session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
    pub role: String,
    pub approval_status: String,
}

/// Own account status page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub approval_status: String,
    pub rejection_reason: Option<String>,
    pub mfa_enabled: bool,
    pub bhp_profile_id: Option<Uuid>,
    pub bhrf_profile_id: Option<Uuid>,
    /// Facility linked to a BHRF once its application was approved.
    pub facility_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl MeResponse {
    pub fn new(record: ActorRecord, facility_id: Option<Uuid>) -> Self {
        Self {
            id: record.id.into_inner(),
            email: record.email,
            display_name: record.display_name,
            role: record.role.to_string(),
            approval_status: record.approval_status.to_string(),
            rejection_reason: record.rejection_reason,
            mfa_enabled: record.mfa_enabled,
            bhp_profile_id: record.bhp_profile_id.map(Into::into),
            bhrf_profile_id: record.bhrf_profile_id.map(Into::into),
            facility_id,
            created_at: record.created_at,
        }
    }
}

/// Pending registration as shown to administrators.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PendingActorResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<ActorRecord> for PendingActorResponse {
    fn from(record: ActorRecord) -> Self {
        Self {
            id: record.id.into_inner(),
            email: record.email,
            display_name: record.display_name,
            role: record.role.to_string(),
            created_at: record.created_at,
        }
    }
}

/// Result of deciding a registration.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActorDecisionResponse {
    pub id: Uuid,
    pub approval_status: String,
    pub rejection_reason: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl From<ActorRecord> for ActorDecisionResponse {
    fn from(record: ActorRecord) -> Self {
        Self {
            id: record.id.into_inner(),
            approval_status: record.approval_status.to_string(),
            rejection_reason: record.rejection_reason,
            decided_at: record.decided_at,
        }
    }
}

/// TOTP enrolment material.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MfaSetupResponse {
    /// Base32 secret for manual entry.
    pub secret: String,
    /// `otpauth://` URI for QR codes.
    pub otpauth_uri: String,
}

/// Confirm MFA enrolment with a current code.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MfaEnableRequest {
    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub code: String,
}
