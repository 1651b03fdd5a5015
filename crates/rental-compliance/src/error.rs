//! Compliance error types.

use std::path::PathBuf;

use thiserror::Error;

use rental_core::errors::{CoreError, ErrorClass};
use rental_db::error::DatabaseError;

#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The signing key is missing, malformed, or unreadable.
    #[error("Signing key error: {0}")]
    Key(String),

    /// Hash chain break or content hash mismatch. Halts automated cleanup.
    #[error("Compliance breach: {0}")]
    IntegrityBreach(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ComplianceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify for the HTTP boundary.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Database(DatabaseError::NotFound { .. }) => ErrorClass::NotFound,
            Self::Database(DatabaseError::Constraint(_)) => ErrorClass::Conflict,
            Self::Database(_) | Self::Io { .. } => ErrorClass::Transient,
            Self::Key(_) | Self::IntegrityBreach(_) => ErrorClass::Integrity,
            Self::Serialization(_) | Self::Validation(_) => ErrorClass::Validation,
            Self::Core(e) => e.class(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breach_is_a_server_fault() {
        let err = ComplianceError::IntegrityBreach("chain broken at seq 4".into());
        assert_eq!(err.class(), ErrorClass::Integrity);
        assert_eq!(err.class().http_status(), 500);
    }

    #[test]
    fn missing_record_is_not_found() {
        let err = ComplianceError::Database(DatabaseError::NotFound {
            entity: "archive record",
            id: "arc-1".into(),
        });
        assert_eq!(err.class().http_status(), 404);
    }

    #[test]
    fn core_errors_keep_their_class() {
        let err = ComplianceError::from(CoreError::Validation("bad".into()));
        assert_eq!(err.class(), ErrorClass::Validation);
    }
}
