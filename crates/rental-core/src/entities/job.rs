use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::availability::DateRange;
use crate::enums::{AssignmentState, DiscountType, JobStatus};

/// A rental booking.
///
/// `revenue` and `final_revenue` are derived fields, always recomputed
/// together from the assigned devices and the discount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub customer_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: JobStatus,
    pub discount: Decimal,
    pub discount_type: DiscountType,
    pub revenue: Decimal,
    pub final_revenue: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    #[must_use]
    pub fn date_range(&self) -> DateRange {
        DateRange::from_ordered(self.start_date, self.end_date)
    }
}

/// Join row between a job and a device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobDevice {
    pub job_id: String,
    pub device_id: String,
    /// Per-assignment price override. Ignored unless positive.
    pub custom_price: Option<Decimal>,
    pub assigned_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl JobDevice {
    #[must_use]
    pub const fn state(&self) -> AssignmentState {
        if self.returned_at.is_some() {
            AssignmentState::Returned
        } else {
            AssignmentState::Assigned
        }
    }
}
