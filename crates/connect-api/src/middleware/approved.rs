//! Dashboard guard: only APPROVED actors get past it.

use axum::{extract::Request, middleware::Next, response::Response};
use connect_governance::{Actor, DenyReason, GovernanceError};

use crate::error::{ApiError, ApiResult};

/// Reject sessions whose actor is not APPROVED.
///
/// Must run inside [`super::session_middleware`].
pub async fn require_approved(request: Request, next: Next) -> ApiResult<Response> {
    let actor = request
        .extensions()
        .get::<Actor>()
        .copied()
        .ok_or_else(|| ApiError::Unauthorized("No session".to_string()))?;

    if !actor.is_approved() {
        tracing::debug!(
            actor_id = %actor.id(),
            approval_status = %actor.approval_status(),
            "Dashboard access denied"
        );
        return Err(GovernanceError::Forbidden(DenyReason::NotApproved).into());
    }
    Ok(next.run(request).await)
}
