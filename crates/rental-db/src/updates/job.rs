//! Job update builder.
//!
//! Revenue fields are deliberately absent: they are only ever written by
//! `RentalDb::set_job_revenue` after a full recalculation.

use serde::Serialize;

use rental_core::enums::JobStatus;
use rental_core::revenue::Discount;

#[derive(Debug, Clone, Default, Serialize)]
pub struct JobUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Discount>,
}

impl JobUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.customer_id.is_none()
            && self.status.is_none()
            && self.discount.is_none()
    }
}

pub struct JobUpdateBuilder(JobUpdate);

impl Default for JobUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JobUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(JobUpdate::default())
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.0.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn customer_id(mut self, customer_id: Option<String>) -> Self {
        self.0.customer_id = Some(customer_id);
        self
    }

    #[must_use]
    pub const fn status(mut self, status: JobStatus) -> Self {
        self.0.status = Some(status);
        self
    }

    #[must_use]
    pub const fn discount(mut self, discount: Discount) -> Self {
        self.0.discount = Some(discount);
        self
    }

    #[must_use]
    pub fn build(self) -> JobUpdate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use rental_core::enums::DiscountType;

    use super::*;

    #[test]
    fn serializes_changed_fields_only() {
        let update = JobUpdateBuilder::new()
            .status(JobStatus::InProgress)
            .build();
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"status": "in_progress"}));
        assert!(JobUpdate::default().is_empty());
    }

    #[test]
    fn discount_carries_kind() {
        let discount = Discount::new(Decimal::from(15), DiscountType::Amount).unwrap();
        let update = JobUpdateBuilder::new().discount(discount).build();
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["discount"]["kind"], json!("amount"));
    }
}
