//! Database error types for rental-db.

use thiserror::Error;

/// Errors from database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed or a column could not be decoded.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// Lookup by id found nothing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A storage-level constraint refused the write (unique index, trigger).
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// Invalid state encountered (e.g., bad data in DB).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Map a libSQL error raised by a constraint or trigger to `Constraint`
    /// when its message contains `marker`; pass everything else through.
    pub(crate) fn constraint_or(error: libsql::Error, marker: &str) -> Self {
        let message = error.to_string();
        if message.contains(marker) {
            Self::Constraint(message)
        } else {
            Self::LibSql(error)
        }
    }
}
