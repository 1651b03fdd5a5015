//! Date ranges and device booking conflicts.
//!
//! Ranges are closed on both ends: a job ending on day N and another starting
//! on day N conflict. A device stays booked through its whole end date and is
//! only free again the following day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::enums::JobStatus;
use crate::errors::CoreError;

/// Inclusive `[start, end]` date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the end date precedes the start date.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::Validation(format!(
                "end date {end} is before start date {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Build a range from dates already known to be ordered (e.g., loaded from
    /// a row that passed `new` on insert). Swaps them if they are not.
    #[must_use]
    pub fn from_ordered(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Closed-interval overlap: `self.start <= other.end && self.end >= other.start`.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, counting both ends.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// An existing booking of a device, as returned by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub job_id: String,
    pub job_title: String,
    pub status: JobStatus,
    pub range: DateRange,
}

/// Bookings that prevent assigning the device to `candidate_job` over
/// `candidate`: a different job, still open or in progress, whose range
/// overlaps.
#[must_use]
pub fn find_conflicts<'a>(
    candidate_job: &str,
    candidate: &DateRange,
    existing: &'a [Booking],
) -> Vec<&'a Booking> {
    existing
        .iter()
        .filter(|b| b.job_id != candidate_job)
        .filter(|b| b.status.blocks_devices())
        .filter(|b| b.range.overlaps(candidate))
        .collect()
}
