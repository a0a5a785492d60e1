//! Error Types
//!
//! The error taxonomy shared by every BHP Connect crate. Each variant maps
//! to exactly one HTTP status so that the API layer never has to guess.
//!
//! # Example
//!
//! ```
//! use connect_core::{ConnectError, Result};
//!
//! fn find_facility(id: &str) -> Result<String> {
//!     if id.is_empty() {
//!         return Err(ConnectError::NotFound {
//!             resource: "Facility".to_string(),
//!             id: None,
//!         });
//!     }
//!     Ok(format!("Facility {}", id))
//! }
//! ```

use serde::Serialize;
use thiserror::Error;

/// Standardized error type for BHP Connect.
///
/// # Variants
///
/// - `Unauthorized` - No or invalid session (HTTP 401)
/// - `Forbidden` - Authenticated but the authorization gate denied (HTTP 403)
/// - `NotFound` - Entity absent or hidden (HTTP 404)
/// - `ValidationFailed` - Input schema violation (HTTP 400)
/// - `InvalidTransition` - State machine rejected the move (HTTP 400)
/// - `Conflict` - Uniqueness violation (HTTP 409)
/// - `Internal` - Storage or collaborator failure (HTTP 500)
#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectError {
    /// No session, or the session token could not be validated.
    #[error("Unauthorized{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Unauthorized {
        /// Optional message providing more context
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// The authorization gate denied the action.
    ///
    /// Never carries detail about the target so that existence is not revealed.
    #[error("Forbidden")]
    Forbidden,

    /// Requested resource was not found or is not visible to the caller.
    #[error("{resource} not found{}", id.as_ref().map(|i| format!(": {i}")).unwrap_or_default())]
    NotFound {
        /// The type of resource that was not found (e.g., "Facility")
        resource: String,
        /// Optional identifier of the resource
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Input validation failure on a single field.
    #[error("Validation error on field '{field}': {message}")]
    ValidationFailed {
        /// The field that failed validation
        field: String,
        /// Description of the validation failure
        message: String,
    },

    /// The requested state transition is not allowed from the current state.
    #[error("Invalid transition from {from} on {event}")]
    InvalidTransition {
        /// Current state of the entity
        from: String,
        /// Event that was rejected
        event: String,
    },

    /// A uniqueness or active-record constraint was violated.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflict
        message: String,
    },

    /// Storage or collaborator failure.
    ///
    /// The message is for operators; the API layer replaces it with a
    /// generic one before it reaches the caller.
    #[error("Internal error: {message}")]
    Internal {
        /// Operator-facing description
        message: String,
    },
}

impl ConnectError {
    /// Shorthand for a `NotFound` with an identifier.
    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.to_string()),
        }
    }

    /// Shorthand for a `ValidationFailed`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    /// HTTP status code this error maps to.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized { .. } => 401,
            Self::Forbidden => 403,
            Self::NotFound { .. } => 404,
            Self::ValidationFailed { .. } | Self::InvalidTransition { .. } => 400,
            Self::Conflict { .. } => 409,
            Self::Internal { .. } => 500,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound { .. } => "not_found",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Conflict { .. } => "conflict",
            Self::Internal { .. } => "internal_error",
        }
    }
}

/// Type alias for Results using `ConnectError`.
pub type Result<T> = std::result::Result<T, ConnectError>;

#[cfg(test)]
mod tests {
    use super::*;

    mod display_tests {
        use super::*;

        #[test]
        fn test_unauthorized_without_message() {
            let error = ConnectError::Unauthorized { message: None };
            assert_eq!(error.to_string(), "Unauthorized");
        }

        #[test]
        fn test_unauthorized_with_message() {
            let error = ConnectError::Unauthorized {
                message: Some("Invalid token".to_string()),
            };
            assert_eq!(error.to_string(), "Unauthorized: Invalid token");
        }

        #[test]
        fn test_not_found_with_id() {
            let error = ConnectError::not_found("Facility", "fac-1");
            assert_eq!(error.to_string(), "Facility not found: fac-1");
        }

        #[test]
        fn test_validation_format() {
            let error = ConnectError::validation("reason", "too short");
            assert_eq!(
                error.to_string(),
                "Validation error on field 'reason': too short"
            );
        }

        #[test]
        fn test_invalid_transition_format() {
            let error = ConnectError::InvalidTransition {
                from: "approved".to_string(),
                event: "decide".to_string(),
            };
            assert_eq!(error.to_string(), "Invalid transition from approved on decide");
        }
    }

    mod status_tests {
        use super::*;

        #[test]
        fn test_status_codes_follow_taxonomy() {
            let cases = [
                (ConnectError::Unauthorized { message: None }, 401),
                (ConnectError::Forbidden, 403),
                (ConnectError::not_found("Intake", "x"), 404),
                (ConnectError::validation("email", "invalid"), 400),
                (
                    ConnectError::InvalidTransition {
                        from: "denied".to_string(),
                        event: "submit".to_string(),
                    },
                    400,
                ),
                (
                    ConnectError::Conflict {
                        message: "email taken".to_string(),
                    },
                    409,
                ),
                (
                    ConnectError::Internal {
                        message: "pool closed".to_string(),
                    },
                    500,
                ),
            ];

            for (error, status) in cases {
                assert_eq!(error.status_code(), status, "{error}");
            }
        }

        #[test]
        fn test_error_codes_are_snake_case() {
            assert_eq!(ConnectError::Forbidden.error_code(), "forbidden");
            assert_eq!(
                ConnectError::validation("f", "m").error_code(),
                "validation_failed"
            );
        }
    }

    mod serde_tests {
        use super::*;

        #[test]
        fn test_forbidden_serialization() {
            let json = serde_json::to_string(&ConnectError::Forbidden).unwrap();
            assert_eq!(json, "{\"type\":\"forbidden\"}");
        }

        #[test]
        fn test_validation_serialization() {
            let json = serde_json::to_string(&ConnectError::validation("email", "invalid")).unwrap();
            assert!(json.contains("\"type\":\"validation_failed\""));
            assert!(json.contains("\"field\":\"email\""));
        }

        #[test]
        fn test_unauthorized_skips_none_message() {
            let json =
                serde_json::to_string(&ConnectError::Unauthorized { message: None }).unwrap();
            assert!(!json.contains("message"));
        }
    }
}
