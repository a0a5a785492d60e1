//! Registration and login handlers.
//!
//! These routes are public. Accounts start PENDING and can only reach their
//! own status page until an administrator approves them.

use axum::{extract::State, http::StatusCode, Json};
use connect_auth::verify_totp_code;
use connect_core::BhpProfileId;
use connect_governance::services::{NewBhp, NewBhrf};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::ClientMetadata;
use crate::models::{
    AvailableBhpResponse, LoginRequest, RegisterBhpRequest, RegisterBhrfRequest,
    RegistrationResponse, TokenResponse,
};
use crate::state::ConnectState;

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials".to_string())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Register a Behavioral Health Professional.
#[utoipa::path(
    post,
    path = "/auth/register/bhp",
    tag = "Auth",
    request_body = RegisterBhpRequest,
    responses(
        (status = 201, description = "Registered, pending approval", body = RegistrationResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register_bhp(
    State(state): State<ConnectState>,
    ClientMetadata(metadata): ClientMetadata,
    Json(request): Json<RegisterBhpRequest>,
) -> ApiResult<(StatusCode, Json<RegistrationResponse>)> {
    request.validate()?;
    let password_hash = state.passwords.hash(&request.password)?;

    let record = state
        .actors
        .register_bhp(
            NewBhp {
                email: request.email.trim().to_lowercase(),
                display_name: request.display_name.trim().to_string(),
                password_hash,
                organisation_name: trimmed(request.organisation_name),
                phone: trimmed(request.phone),
            },
            metadata,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            actor_id: record.id.into_inner(),
            role: record.role.to_string(),
            approval_status: record.approval_status.to_string(),
            facility_application_id: None,
        }),
    ))
}

/// Register a facility operator and apply for oversight by a BHP.
#[utoipa::path(
    post,
    path = "/auth/register/bhrf",
    tag = "Auth",
    request_body = RegisterBhrfRequest,
    responses(
        (status = 201, description = "Registered, pending approval", body = RegistrationResponse),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "BHP not found or not accepting facilities"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register_bhrf(
    State(state): State<ConnectState>,
    ClientMetadata(metadata): ClientMetadata,
    Json(request): Json<RegisterBhrfRequest>,
) -> ApiResult<(StatusCode, Json<RegistrationResponse>)> {
    request.validate()?;
    let password_hash = state.passwords.hash(&request.password)?;

    let registered = state
        .actors
        .register_bhrf(
            NewBhrf {
                email: request.email.trim().to_lowercase(),
                display_name: request.display_name.trim().to_string(),
                password_hash,
                bhp_id: BhpProfileId::from_uuid(request.bhp_id),
                facility_name: request.facility_name.trim().to_string(),
                address: trimmed(request.address),
            },
            metadata,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationResponse {
            actor_id: registered.actor.id.into_inner(),
            role: registered.actor.role.to_string(),
            approval_status: registered.actor.approval_status.to_string(),
            facility_application_id: Some(registered.application.id.into_inner()),
        }),
    ))
}

/// BHPs a facility may apply to.
#[utoipa::path(
    get,
    path = "/auth/bhps",
    tag = "Auth",
    responses(
        (status = 200, description = "Approved BHPs", body = Vec<AvailableBhpResponse>)
    )
)]
pub async fn available_bhps(
    State(state): State<ConnectState>,
) -> ApiResult<Json<Vec<AvailableBhpResponse>>> {
    let bhps = state.actors.available_bhps().await?;
    Ok(Json(
        bhps.into_iter()
            .map(|b| AvailableBhpResponse {
                bhp_id: b.bhp_profile_id.into_inner(),
                display_name: b.display_name,
                organisation_name: b.organisation_name,
            })
            .collect(),
    ))
}

/// Exchange credentials for a session token.
///
/// Pending and rejected accounts may log in; the dashboard gate keeps them
/// on their status page.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials or MFA code")
    )
)]
pub async fn login(
    State(state): State<ConnectState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    request.validate()?;

    let Some(record) = state.actors.find_for_login(&request.email).await? else {
        state.passwords.verify_dummy(&request.password);
        tracing::info!("Login failed: unknown email");
        return Err(invalid_credentials());
    };

    // A malformed stored hash counts as a mismatch.
    let password_ok = state
        .passwords
        .verify(&request.password, &record.password_hash)
        .unwrap_or(false);
    if !password_ok {
        tracing::info!(actor_id = %record.id, "Login failed: bad password");
        return Err(invalid_credentials());
    }

    if record.mfa_enabled {
        let secret = record.mfa_secret.as_deref().ok_or_else(invalid_credentials)?;
        let code = request
            .code
            .as_deref()
            .ok_or_else(|| ApiError::Unauthorized("MFA code required".to_string()))?;
        if !verify_totp_code(secret, code.trim())? {
            tracing::info!(actor_id = %record.id, "Login failed: bad MFA code");
            return Err(invalid_credentials());
        }
    }

    let access_token = state.sessions.issue(&record)?;
    tracing::info!(actor_id = %record.id, role = %record.role, "Login succeeded");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.sessions.ttl_secs(),
        role: record.role.to_string(),
        approval_status: record.approval_status.to_string(),
    }))
}
