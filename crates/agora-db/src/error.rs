//! Database error types for agora-db.

use agora_core::errors::CoreError;
use agora_democracy::DemocracyError;
use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed or returned malformed data.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Invalid state encountered (e.g., a request that contradicts stored data).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A domain rule rejected the operation before any write.
    #[error(transparent)]
    Democracy(#[from] DemocracyError),

    /// Validation or lookup failure from core types.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    /// The domain error, if this is one.
    #[must_use]
    pub const fn as_democracy(&self) -> Option<&DemocracyError> {
        match self {
            Self::Democracy(e) => Some(e),
            _ => None,
        }
    }
}
