//! Cross-cutting error types for RentalCore.
//!
//! Domain-specific errors (`DatabaseError`, `ComplianceError`, `BookingError`)
//! live in their own crates. They all classify themselves into an
//! [`ErrorClass`] so callers at the HTTP boundary can pick a status code
//! without matching on every variant.

use serde::Serialize;
use thiserror::Error;

/// Errors that can be raised by any RentalCore crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    /// Data failed validation (format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse error taxonomy shared by the compliance and booking layers.
///
/// - `Validation`, `Conflict`, `NotFound`: caller mistakes, reported
///   synchronously, never retried.
/// - `Integrity`: hash chain or content hash mismatch. Halts automated cleanup
///   and must reach an administrator.
/// - `Transient`: database or filesystem unavailable. Fatal for the single
///   operation; no retry loop exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Validation,
    Conflict,
    NotFound,
    Integrity,
    Transient,
}

impl ErrorClass {
    /// HTTP status code for this class.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Integrity => 500,
            Self::Transient => 503,
        }
    }

    /// Whether the failure indicates data corruption rather than a user mistake.
    #[must_use]
    pub const fn is_server_fault(self) -> bool {
        matches!(self, Self::Integrity | Self::Transient)
    }
}

impl CoreError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::InvalidTransition { .. } | Self::Validation(_) => ErrorClass::Validation,
            Self::Other(_) => ErrorClass::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_is_server_side() {
        assert_eq!(ErrorClass::Integrity.http_status(), 500);
        assert!(ErrorClass::Integrity.is_server_fault());
        assert!(!ErrorClass::Conflict.is_server_fault());
        assert_eq!(ErrorClass::Conflict.http_status(), 409);
    }

    #[test]
    fn core_error_classes() {
        let err = CoreError::Validation("end before start".into());
        assert_eq!(err.class(), ErrorClass::Validation);
        let err = CoreError::NotFound {
            entity_type: "job".into(),
            id: "job-1".into(),
        };
        assert_eq!(err.class(), ErrorClass::NotFound);
        assert_eq!(err.to_string(), "Entity not found: job job-1");
    }
}
