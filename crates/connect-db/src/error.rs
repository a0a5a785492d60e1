//! Error types for the connect-db crate.
//!
//! Wraps `SQLx` errors with the operation that failed.

use connect_governance::GovernanceError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish or acquire a database connection.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A database migration failed to apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    /// A database query failed to execute.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),

    /// A stored value does not decode into a domain value.
    #[error("Corrupt row: {0}")]
    Decode(String),
}

impl DbError {
    /// Check if this error indicates a connection problem.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_))
    }

    /// Check if this error indicates a migration problem.
    #[must_use]
    pub fn is_migration_error(&self) -> bool {
        matches!(self, DbError::MigrationFailed(_))
    }

    /// Check if this error is a unique constraint violation.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::QueryFailed(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<DbError> for GovernanceError {
    fn from(err: DbError) -> Self {
        tracing::error!(error = %err, "Database operation failed");
        GovernanceError::Storage(err.to_string())
    }
}

/// Map a query error into the domain error.
pub(crate) fn query(err: sqlx::Error) -> GovernanceError {
    DbError::QueryFailed(err).into()
}

/// Parse a stored text enum.
pub(crate) fn decode<T>(column: &str, value: &str) -> Result<T, GovernanceError>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| DbError::Decode(format!("{column}: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_becomes_storage_error() {
        let err: GovernanceError = DbError::Decode("role: Unknown Role: OWNER".to_string()).into();
        assert!(matches!(err, GovernanceError::Storage(ref m) if m.contains("OWNER")));
    }

    #[test]
    fn test_decode_known_and_unknown_values() {
        use connect_governance::Role;
        assert_eq!(decode::<Role>("role", "BHRF").unwrap(), Role::Bhrf);
        assert!(decode::<Role>("role", "OWNER").is_err());
    }

    #[test]
    fn test_row_not_found_is_not_unique_violation() {
        let err = DbError::QueryFailed(sqlx::Error::RowNotFound);
        assert!(!err.is_unique_violation());
        assert!(!err.is_connection_error());
    }
}
