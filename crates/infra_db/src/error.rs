//! Database error types
//!
//! This module defines the error types that can occur during database operations,
//! and how they cross the port boundary as [`PortError`].

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("Entity not found: {entity} with id '{id}'")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Concurrent update lost, e.g. a serialization failure
    #[error("Concurrent update: {0}")]
    Conflict(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be turned back into a domain value
    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: String, message: String },

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DatabaseError {
    /// Creates a not found error for a specific entity type and identifier
    ///
    /// ```rust
    /// use infra_db::DatabaseError;
    ///
    /// let error = DatabaseError::not_found("Proposal", "PRP-123");
    /// assert!(error.to_string().contains("Proposal"));
    /// ```
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn corrupt(table: &str, message: impl std::fmt::Display) -> Self {
        DatabaseError::CorruptRow {
            table: table.to_string(),
            message: message.to_string(),
        }
    }

    /// Checks if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }

    /// Checks if this error is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::DuplicateEntry(_)
                | DatabaseError::ForeignKeyViolation(_)
                | DatabaseError::ConstraintViolation(_)
        )
    }

    /// Checks if this error is a connection-related issue
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }
}

/// Maps SQLx errors to DatabaseError variants by PostgreSQL error code
///
/// <https://www.postgresql.org/docs/current/errcodes-appendix.html>
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound {
                entity: "record".to_string(),
                id: "unknown".to_string(),
            },
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
                DatabaseError::ConnectionFailed(error.to_string())
            }
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    Some("23505") => DatabaseError::DuplicateEntry(message),
                    Some("23503") => DatabaseError::ForeignKeyViolation(message),
                    Some("23514") => DatabaseError::ConstraintViolation(message),
                    Some("40001") | Some("40P01") => DatabaseError::Conflict(message),
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationFailed(error.to_string())
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(error: serde_json::Error) -> Self {
        DatabaseError::CorruptRow {
            table: "json column".to_string(),
            message: error.to_string(),
        }
    }
}

impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound { entity, id } => PortError::NotFound {
                entity_type: entity,
                id,
            },
            DatabaseError::DuplicateEntry(message) | DatabaseError::Conflict(message) => {
                PortError::conflict(message)
            }
            DatabaseError::ForeignKeyViolation(message)
            | DatabaseError::ConstraintViolation(message) => PortError::validation(message),
            DatabaseError::ConnectionFailed(message) => PortError::connection(message),
            DatabaseError::PoolExhausted => PortError::unavailable("database pool"),
            other => PortError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_port_not_found() {
        let port: PortError = DatabaseError::not_found("QuoteRequest", "QRQ-1").into();
        assert!(port.is_not_found());
        assert!(port.to_string().contains("QuoteRequest"));
    }

    #[test]
    fn test_pool_exhaustion_is_transient() {
        let port: PortError = DatabaseError::PoolExhausted.into();
        assert!(port.is_transient());
        assert!(DatabaseError::PoolExhausted.is_connection_error());
    }

    #[test]
    fn test_duplicate_is_conflict() {
        let error = DatabaseError::DuplicateEntry("insurers_name_key".to_string());
        assert!(error.is_constraint_violation());
        let port: PortError = error.into();
        assert!(port.is_conflict());
    }

    #[test]
    fn test_corrupt_row_is_internal() {
        let port: PortError = DatabaseError::corrupt("proposals", "unknown status 'X'").into();
        assert!(matches!(port, PortError::Internal { .. }));
    }

    #[test]
    fn test_row_not_found_from_sqlx() {
        assert!(DatabaseError::from(sqlx::Error::RowNotFound).is_not_found());
    }
}
