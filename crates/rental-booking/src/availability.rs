//! Availability verdicts.
//!
//! A device is assignable to a job when the device is `free`, the job is
//! still open or in progress, the pair is not already linked, and no other
//! active job holds the device over an overlapping (closed) date range.

use serde::Serialize;

use rental_core::availability::{Booking, DateRange};
use rental_core::enums::{DeviceStatus, JobStatus};

use crate::error::BookingError;

/// Another job holding the device over an overlapping range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictingJob {
    pub job_id: String,
    pub title: String,
    pub status: JobStatus,
    pub range: DateRange,
}

impl From<&Booking> for ConflictingJob {
    fn from(booking: &Booking) -> Self {
        Self {
            job_id: booking.job_id.clone(),
            title: booking.job_title.clone(),
            status: booking.status,
            range: booking.range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnavailableReason {
    DeviceStatus { status: DeviceStatus },
    Booked { conflicts: Vec<ConflictingJob> },
    AlreadyAssigned,
    JobClosed { status: JobStatus },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "availability", rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unavailable(UnavailableReason),
}

impl Availability {
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl UnavailableReason {
    /// The error reported when an assignment is attempted anyway.
    #[must_use]
    pub fn into_error(self, job_id: &str, device_id: &str) -> BookingError {
        match self {
            Self::DeviceStatus { status } => BookingError::DeviceUnavailable {
                device_id: device_id.to_string(),
                status,
            },
            Self::Booked { conflicts } => BookingError::Conflict {
                device_id: device_id.to_string(),
                job_id: job_id.to_string(),
                conflicts,
            },
            Self::AlreadyAssigned => BookingError::AlreadyAssigned {
                job_id: job_id.to_string(),
                device_id: device_id.to_string(),
            },
            Self::JobClosed { status } => BookingError::JobClosed {
                job_id: job_id.to_string(),
                status,
            },
        }
    }
}
