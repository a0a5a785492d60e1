//! API error types.
//!
//! Every failure is funnelled through [`ConnectError`] so that the status
//! code and the `error` code in the body always agree.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use connect_auth::AuthError;
use connect_core::ConnectError;
use connect_governance::GovernanceError;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// API error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error code for client handling.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// Offending field, for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// API error type.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Domain error from the governance crate.
    #[error(transparent)]
    Governance(#[from] GovernanceError),

    /// Token or credential failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Request body failed `validator` rules.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Already classified error.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// No usable session.
    #[error("Authentication required: {0}")]
    Unauthorized(String),
}

impl ApiError {
    /// Shorthand for a single-field validation failure.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect(ConnectError::validation(field, message))
    }

    fn into_connect(self) -> ConnectError {
        match self {
            Self::Governance(e) => e.into(),
            Self::Auth(e) if e.is_jwt_error() => ConnectError::Unauthorized {
                message: Some("Invalid or expired token".to_string()),
            },
            Self::Auth(e) => ConnectError::Internal {
                message: e.to_string(),
            },
            Self::Validation(errors) => first_field_error(&errors),
            Self::Connect(e) => e,
            Self::Unauthorized(message) => ConnectError::Unauthorized {
                message: Some(message),
            },
        }
    }
}

/// First offending field of a `validator` report, by field name.
fn first_field_error(errors: &validator::ValidationErrors) -> ConnectError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    match fields.first() {
        Some((field, errs)) => {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref().map(ToString::to_string))
                .or_else(|| errs.first().map(|e| e.code.to_string()))
                .unwrap_or_else(|| "invalid".to_string());
            ConnectError::validation(field.to_string(), message)
        }
        None => ConnectError::validation("body", "invalid"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.into_connect();
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let (message, field) = match &err {
            ConnectError::Internal { message } => {
                tracing::error!(error = %message, "Internal error");
                ("An internal error occurred".to_string(), None)
            }
            ConnectError::ValidationFailed { field, message } => {
                (message.clone(), Some(field.clone()))
            }
            ConnectError::Forbidden => ("Access denied".to_string(), None),
            other => (other.to_string(), None),
        };

        let body = ErrorResponse {
            error: err.error_code().to_string(),
            message,
            field,
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use connect_governance::DenyReason;
    use validator::Validate;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_forbidden_body_hides_reason() {
        let (status, body) =
            body_of(GovernanceError::Forbidden(DenyReason::NotOwner).into()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
        assert!(!body["message"].as_str().unwrap().contains("owner"));
    }

    #[tokio::test]
    async fn test_storage_error_is_generic_500() {
        let (status, body) =
            body_of(GovernanceError::Storage("connection reset by peer".to_string()).into())
                .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn test_expired_token_is_401() {
        let (status, body) = body_of(AuthError::TokenExpired.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 10, message = "Must be at least 10 characters"))]
        reason: String,
    }

    #[tokio::test]
    async fn test_validator_errors_carry_field() {
        let errors = Sample {
            reason: "short".to_string(),
        }
        .validate()
        .unwrap_err();
        let (status, body) = body_of(errors.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "reason");
        assert_eq!(body["message"], "Must be at least 10 characters");
    }
}
