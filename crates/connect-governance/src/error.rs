//! Error types for governance operations.

use connect_core::ConnectError;
use thiserror::Error;

use crate::gate::DenyReason;

/// Errors produced by the governance domain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GovernanceError {
    /// The authorization gate denied the action.
    #[error("Forbidden: {0}")]
    Forbidden(DenyReason),

    /// The entity does not exist or is not visible to the caller.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Entity kind.
        resource: &'static str,
        /// Requested identifier.
        id: String,
    },

    /// Input failed validation before any state was touched.
    #[error("Validation failed on '{field}': {message}")]
    Validation {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The state machine refused the move.
    #[error("Invalid transition from {from} on {event}")]
    InvalidTransition {
        /// Current state.
        from: String,
        /// Rejected event.
        event: String,
    },

    /// Uniqueness or active-record conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad credentials or an unknown session subject.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Backing store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Object storage or email failure.
    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

impl GovernanceError {
    /// Shorthand for `NotFound`.
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Shorthand for `Validation`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for `InvalidTransition`.
    pub fn invalid_transition(from: impl ToString, event: impl ToString) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            event: event.to_string(),
        }
    }
}

impl From<GovernanceError> for ConnectError {
    fn from(err: GovernanceError) -> Self {
        match err {
            GovernanceError::Forbidden(_) => ConnectError::Forbidden,
            GovernanceError::NotFound { resource, id } => ConnectError::NotFound {
                resource: resource.to_string(),
                id: Some(id),
            },
            GovernanceError::Validation { field, message } => {
                ConnectError::ValidationFailed { field, message }
            }
            GovernanceError::InvalidTransition { from, event } => {
                ConnectError::InvalidTransition { from, event }
            }
            GovernanceError::Conflict(message) => ConnectError::Conflict { message },
            GovernanceError::Unauthorized(message) => ConnectError::Unauthorized {
                message: Some(message),
            },
            GovernanceError::Storage(message) | GovernanceError::Collaborator(message) => {
                ConnectError::Internal { message }
            }
        }
    }
}

/// Result type for governance operations.
pub type Result<T> = std::result::Result<T, GovernanceError>;
