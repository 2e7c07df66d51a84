//! Database error types
//!
//! SQLx failures are classified by PostgreSQL error code and then folded into
//! the ledger's [`StoreError`] at the port boundary.

use domain_ledger::StoreError;
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
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Transaction error
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be mapped onto a ledger type
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DatabaseError {
    /// Creates a not found error for a specific entity type and identifier
    ///
    /// # Example
    ///
    /// ```rust
    /// use infra_db::DatabaseError;
    ///
    /// let error = DatabaseError::not_found("Journal batch", "JV-INV-20260101-AB12CD34");
    /// assert!(error.to_string().contains("Journal batch"));
    /// ```
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound(format!("{} with id '{}' not found", entity, id))
    }

    /// Wraps a column value that does not parse into its ledger type
    pub fn bad_column(column: &str, detail: impl std::fmt::Display) -> Self {
        DatabaseError::SerializationError(format!("{}: {}", column, detail))
    }

    /// Checks if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
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

/// Maps SQLx errors onto variants by PostgreSQL error code
///
/// <https://www.postgresql.org/docs/current/errcodes-appendix.html>
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::Io(e) => DatabaseError::ConnectionFailed(e.to_string()),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    Some("23505") => DatabaseError::DuplicateEntry(message),
                    Some("23503") => DatabaseError::ForeignKeyViolation(message),
                    Some("23514") => DatabaseError::ConstraintViolation(message),
                    Some("40001") | Some("40P01") => DatabaseError::TransactionFailed(message),
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DatabaseError::SerializationError(error.to_string())
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

/// Constraint violations become conflicts so the ledger core can tell a
/// duplicate posting from a broken connection
impl From<DatabaseError> for StoreError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound(msg) => StoreError::NotFound(msg),
            DatabaseError::DuplicateEntry(msg)
            | DatabaseError::ForeignKeyViolation(msg)
            | DatabaseError::ConstraintViolation(msg) => StoreError::Conflict(msg),
            DatabaseError::TransactionFailed(msg) => StoreError::TransactionFailed(msg),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Shorthand for query call sites: `.map_err(store_err)?`
pub(crate) fn store_err(error: sqlx::Error) -> StoreError {
    DatabaseError::from(error).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_violations_become_conflicts() {
        let err: StoreError = DatabaseError::DuplicateEntry("batch_number".into()).into();
        assert!(matches!(err, StoreError::Conflict(_)));

        let err: StoreError = DatabaseError::ForeignKeyViolation("account_id".into()).into();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = DatabaseError::from(sqlx::Error::RowNotFound);
        assert!(err.is_not_found());
        assert!(matches!(StoreError::from(err), StoreError::NotFound(_)));
    }

    #[test]
    fn test_pool_timeout_is_a_connection_error() {
        let err = DatabaseError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_connection_error());
        assert!(matches!(StoreError::from(err), StoreError::Backend(_)));
    }
}
