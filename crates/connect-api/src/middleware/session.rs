//! Session authentication middleware.
//!
//! Validates the Bearer token, then re-resolves the actor from storage and
//! inserts the resulting [`Actor`] into request extensions. Role and approval
//! status are never taken from the token, so a revoked or re-decided account
//! takes effect on the next request.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use connect_governance::Actor;

use crate::error::{ApiError, ApiResult};
use crate::state::ConnectState;

/// Extract the Bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> ApiResult<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header format".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(ApiError::Unauthorized("Empty bearer token".to_string()));
    }
    Ok(token)
}

/// Session middleware.
///
/// ```rust,ignore
/// let router = Router::new()
///     .route("/me", get(me))
///     .route_layer(middleware::from_fn_with_state(state.clone(), session_middleware));
/// ```
pub async fn session_middleware(
    State(state): State<ConnectState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = bearer_token(request.headers())?;
    let claims = state.sessions.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Session token rejected");
        ApiError::from(e)
    })?;

    let actor_id = claims
        .actor_id()
        .ok_or_else(|| ApiError::Unauthorized("Invalid token subject".to_string()))?;
    let actor: Actor = state.actors.resolve(actor_id).await?;

    tracing::debug!(
        actor_id = %actor.id(),
        role = %actor.role(),
        approval_status = %actor.approval_status(),
        "Session resolved"
    );

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}
