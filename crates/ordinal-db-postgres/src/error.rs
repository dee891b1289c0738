//! Error types for the PostgreSQL priority store.

use ordinal_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for unique violation (23505).
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL error code for check violation (23514).
pub const PG_CHECK_VIOLATION: &str = "23514";

/// PostgreSQL error code for serialization failure (40001).
pub const PG_SERIALIZATION_FAILURE: &str = "40001";

/// PostgreSQL error code for deadlock detected (40P01).
pub const PG_DEADLOCK_DETECTED: &str = "40P01";

/// PostgreSQL error code for query canceled, e.g. by statement_timeout (57014).
pub const PG_QUERY_CANCELED: &str = "57014";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Checks if a sqlx error is a rank collision or lock conflict that aborted the transaction.
pub fn is_conflict(err: &SqlxError) -> bool {
    [
        PG_UNIQUE_VIOLATION,
        PG_SERIALIZATION_FAILURE,
        PG_DEADLOCK_DETECTED,
        PG_QUERY_CANCELED,
    ]
    .iter()
    .any(|code| has_pg_error_code(err, code))
}

/// Maps a sqlx error raised while running `operation` into the shared taxonomy.
pub(crate) fn storage_error(operation: &str, err: SqlxError) -> StorageError {
    if has_pg_error_code(&err, PG_CHECK_VIOLATION) {
        return StorageError::invalid_item(format!("{operation}: {err}"));
    }
    if is_conflict(&err) {
        return StorageError::transaction_error(format!("{operation}: {err}"));
    }
    match err {
        SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) | SqlxError::Tls(_) => {
            StorageError::connection_error(format!("{operation}: {err}"))
        }
        other => StorageError::internal(format!("{operation}: {other}")),
    }
}

/// Errors specific to the PostgreSQL priority store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx_core::error::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Pool error.
    #[error("Pool error: {message}")]
    Pool { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new pool error.
    #[must_use]
    pub fn pool(message: impl Into<String>) -> Self {
        Self::Pool {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => StorageError::connection_error(e.to_string()),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
            PostgresError::Pool { message } => {
                StorageError::connection_error(format!("Pool error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
