//! Own account: status page and MFA enrolment.
//!
//! Reachable with any valid session, including PENDING and REJECTED ones.

use axum::{extract::State, Extension, Json};
use connect_auth::{generate_totp_secret, verify_totp_code};
use connect_governance::Actor;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::ClientMetadata;
use crate::models::{MeResponse, MfaEnableRequest, MfaSetupResponse};
use crate::state::ConnectState;

const TOTP_ISSUER: &str = "BHP Connect";

/// Own account and approval status.
#[utoipa::path(
    get,
    path = "/me",
    tag = "Account",
    responses(
        (status = 200, description = "Own account", body = MeResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<MeResponse>> {
    let record = state.actors.own_record(&actor).await?;
    Ok(Json(MeResponse::new(
        record,
        actor.bhrf_facility_id().map(Into::into),
    )))
}

/// Start TOTP enrolment. Replaces any unconfirmed secret.
#[utoipa::path(
    post,
    path = "/me/mfa/setup",
    tag = "Account",
    responses(
        (status = 200, description = "Secret generated", body = MfaSetupResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mfa_setup(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<MfaSetupResponse>> {
    let record = state.actors.own_record(&actor).await?;
    if record.mfa_enabled {
        return Err(ApiError::field("mfa", "MFA is already enabled"));
    }

    let setup = generate_totp_secret(TOTP_ISSUER, &record.email)?;
    state
        .actors
        .store_mfa_secret(&actor, setup.secret.clone())
        .await?;

    Ok(Json(MfaSetupResponse {
        secret: setup.secret,
        otpauth_uri: setup.otpauth_uri,
    }))
}

/// Confirm enrolment with a current code.
#[utoipa::path(
    post,
    path = "/me/mfa/enable",
    tag = "Account",
    request_body = MfaEnableRequest,
    responses(
        (status = 204, description = "MFA enabled"),
        (status = 400, description = "Invalid code or setup not started"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mfa_enable(
    State(state): State<ConnectState>,
    Extension(actor): Extension<Actor>,
    ClientMetadata(metadata): ClientMetadata,
    Json(request): Json<MfaEnableRequest>,
) -> ApiResult<axum::http::StatusCode> {
    request.validate()?;
    let secret = state
        .actors
        .mfa_secret(&actor)
        .await?
        .ok_or_else(|| ApiError::field("code", "MFA setup has not been started"))?;

    if !verify_totp_code(&secret, request.code.trim())? {
        return Err(ApiError::field("code", "Invalid code"));
    }

    state.actors.enable_mfa(&actor, metadata).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
