//! Booking error types.

use thiserror::Error;

use rental_core::enums::{DeviceStatus, JobStatus};
use rental_core::errors::{CoreError, ErrorClass};
use rental_db::error::DatabaseError;

use crate::availability::ConflictingJob;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// The device's own status forbids assignment.
    #[error("device {device_id} is {status}, not free")]
    DeviceUnavailable {
        device_id: String,
        status: DeviceStatus,
    },

    /// The device is booked by another active job over an overlapping range.
    #[error("device {device_id} cannot be assigned to job {job_id}: {}", describe(conflicts))]
    Conflict {
        device_id: String,
        job_id: String,
        conflicts: Vec<ConflictingJob>,
    },

    #[error("device {device_id} is already assigned to job {job_id}")]
    AlreadyAssigned { job_id: String, device_id: String },

    #[error("device {device_id} is not assigned to job {job_id}")]
    NotAssigned { job_id: String, device_id: String },

    /// The job no longer accepts assignment changes.
    #[error("job {job_id} is {status}")]
    JobClosed { job_id: String, status: JobStatus },
}

fn describe(conflicts: &[ConflictingJob]) -> String {
    if conflicts.is_empty() {
        return "booked by another job over an overlapping range".to_string();
    }
    let jobs: Vec<String> = conflicts
        .iter()
        .map(|c| format!("job {} ({}) {}", c.job_id, c.title, c.range))
        .collect();
    format!("overlaps {}", jobs.join(", "))
}

impl BookingError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Database(DatabaseError::NotFound { .. }) | Self::NotAssigned { .. } => {
                ErrorClass::NotFound
            }
            Self::Database(DatabaseError::Constraint(_))
            | Self::DeviceUnavailable { .. }
            | Self::Conflict { .. }
            | Self::AlreadyAssigned { .. } => ErrorClass::Conflict,
            Self::Database(_) => ErrorClass::Transient,
            Self::Core(e) => e.class(),
            Self::JobClosed { .. } => ErrorClass::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rental_core::availability::DateRange;

    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn conflict_message_names_job_and_range() {
        let err = BookingError::Conflict {
            device_id: "dev-1".into(),
            job_id: "job-2".into(),
            conflicts: vec![ConflictingJob {
                job_id: "job-1".into(),
                title: "Festival".into(),
                status: JobStatus::Open,
                range: DateRange::new(d("2024-06-01"), d("2024-06-05")).unwrap(),
            }],
        };
        assert_eq!(
            err.to_string(),
            "device dev-1 cannot be assigned to job job-2: overlaps job job-1 (Festival) 2024-06-01..=2024-06-05"
        );
        assert_eq!(err.class(), ErrorClass::Conflict);
        assert_eq!(err.class().http_status(), 409);
    }

    #[test]
    fn not_found_classes() {
        let err = BookingError::NotAssigned {
            job_id: "job-1".into(),
            device_id: "dev-1".into(),
        };
        assert_eq!(err.class(), ErrorClass::NotFound);
        let err = BookingError::Database(DatabaseError::NotFound {
            entity: "job",
            id: "job-x".into(),
        });
        assert_eq!(err.class(), ErrorClass::NotFound);
    }
}
