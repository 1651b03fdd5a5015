//! Booking engine: device assignment, job lifecycle, and revenue rollup.
//!
//! Assignment is check-then-insert, but the insert itself is conditional on
//! the device still being free and is guarded by the `job_devices` overlap
//! trigger, so a double booking is refused by storage even when two callers
//! race past the check. Within one process all device-state changes are also
//! serialized by `device_lock`.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;

use rental_compliance::{AuditLogger, AuditRecord};
use rental_core::audit_detail::{AssignmentDetail, RevenueDetail, StatusChangedDetail};
use rental_core::availability::{DateRange, find_conflicts};
use rental_core::entities::{Actor, Device, Job, JobDevice, Product};
use rental_core::enums::{AssignmentState, DeviceStatus, EventType, JobStatus};
use rental_core::errors::CoreError;
use rental_core::ids::{PREFIX_DEVICE, PREFIX_JOB, PREFIX_PRODUCT};
use rental_core::revenue::{Discount, RevenueBreakdown, calculate, check_amount};
use rental_db::RentalDb;
use rental_db::error::DatabaseError;
use rental_db::repos::assignment::DEVICE_CONFLICT;
use rental_db::updates::job::JobUpdateBuilder;

use crate::availability::{Availability, ConflictingJob, UnavailableReason};
use crate::error::BookingError;

/// Fields for a new job. Dates are validated by [`BookingEngine::create_job`].
#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub customer_id: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub discount: Discount,
}

/// Result of a single assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignOutcome {
    pub assignment: JobDevice,
    pub revenue: RevenueBreakdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedDevice {
    pub device_id: String,
    pub reason: String,
}

/// Result of [`BookingEngine::bulk_assign`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkAssignReport {
    pub assigned: Vec<String>,
    pub rejected: Vec<RejectedDevice>,
    pub revenue: RevenueBreakdown,
}

pub struct BookingEngine {
    db: Arc<RentalDb>,
    audit: Option<Arc<AuditLogger>>,
    device_lock: Mutex<()>,
}

impl BookingEngine {
    #[must_use]
    pub fn new(db: Arc<RentalDb>) -> Self {
        Self {
            db,
            audit: None,
            device_lock: Mutex::new(()),
        }
    }

    /// Record every assignment change and job transition in the audit chain.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    // -- inventory ---------------------------------------------------------

    /// # Errors
    ///
    /// Returns `BookingError::Core` (`Validation`) for an empty name or a
    /// rate that is negative or above `max_amount`.
    pub async fn create_product(&self, name: &str, flat_rate: Decimal) -> Result<Product, BookingError> {
        require_name("product name", name)?;
        check_amount("flat rate", flat_rate)?;
        let product = Product {
            id: self.db.generate_id(PREFIX_PRODUCT).await?,
            name: name.to_string(),
            flat_rate,
            created_at: Utc::now(),
        };
        self.db.insert_product(&product).await?;
        tracing::debug!(id = %product.id, %flat_rate, "product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `BookingError::Database` (`NotFound`) for an unknown product and
    /// `Constraint` for a duplicate serial number.
    pub async fn create_device(
        &self,
        name: &str,
        product_id: Option<&str>,
        serial_number: Option<&str>,
    ) -> Result<Device, BookingError> {
        require_name("device name", name)?;
        if let Some(product_id) = product_id {
            self.db.get_product(product_id).await?;
        }
        let now = Utc::now();
        let device = Device {
            id: self.db.generate_id(PREFIX_DEVICE).await?,
            name: name.to_string(),
            product_id: product_id.map(String::from),
            serial_number: serial_number.map(String::from),
            status: DeviceStatus::Free,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_device(&device).await?;
        tracing::debug!(id = %device.id, "device created");
        Ok(device)
    }

    /// # Errors
    ///
    /// Returns `BookingError::Core` (`Validation`) when the end date precedes
    /// the start date or the title is empty.
    pub async fn create_job(&self, new: NewJob, actor: &Actor) -> Result<Job, BookingError> {
        require_name("job title", &new.title)?;
        let range = DateRange::new(new.start_date, new.end_date)?;
        let now = Utc::now();
        let job = Job {
            id: self.db.generate_id(PREFIX_JOB).await?,
            title: new.title,
            customer_id: new.customer_id,
            start_date: range.start(),
            end_date: range.end(),
            status: JobStatus::Open,
            discount: new.discount.value(),
            discount_type: new.discount.kind(),
            revenue: Decimal::ZERO,
            final_revenue: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_job(&job).await?;
        self.track(
            AuditRecord::new(EventType::Create, "job", &job.id, "create job", actor.clone())
                .new_value(&job),
        )
        .await;
        tracing::info!(id = %job.id, %range, "job created");
        Ok(job)
    }

    /// # Errors
    ///
    /// Returns `BookingError::Database` (`NotFound`) for an unknown job.
    pub async fn get_job(&self, job_id: &str) -> Result<Job, BookingError> {
        Ok(self.db.get_job(job_id).await?)
    }

    /// # Errors
    ///
    /// Returns `BookingError::Database` (`NotFound`) for an unknown device.
    pub async fn get_device(&self, device_id: &str) -> Result<Device, BookingError> {
        Ok(self.db.get_device(device_id).await?)
    }

    /// # Errors
    ///
    /// Returns `BookingError::Database` if the query fails.
    pub async fn list_devices(
        &self,
        status: Option<DeviceStatus>,
        limit: u32,
    ) -> Result<Vec<Device>, BookingError> {
        Ok(self.db.list_devices(status, limit).await?)
    }

    /// # Errors
    ///
    /// Returns `BookingError::Database` if the query fails.
    pub async fn list_jobs(&self, status: Option<JobStatus>, limit: u32) -> Result<Vec<Job>, BookingError> {
        Ok(self.db.list_jobs(status, limit).await?)
    }

    /// # Errors
    ///
    /// Returns `BookingError::Database` if the query fails.
    pub async fn assignments(&self, job_id: &str) -> Result<Vec<JobDevice>, BookingError> {
        Ok(self.db.assignments_for_job(job_id).await?)
    }

    // -- availability ------------------------------------------------------

    /// Whether `device_id` could be assigned to `job_id` right now. Read-only.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Database` (`NotFound`) for an unknown job or device.
    pub async fn check_availability(
        &self,
        device_id: &str,
        job_id: &str,
    ) -> Result<Availability, BookingError> {
        let job = self.db.get_job(job_id).await?;
        let device = self.db.get_device(device_id).await?;
        self.availability_of(&device, &job).await
    }

    async fn availability_of(&self, device: &Device, job: &Job) -> Result<Availability, BookingError> {
        if !job.status.blocks_devices() {
            return Ok(Availability::Unavailable(UnavailableReason::JobClosed { status: job.status }));
        }
        if self.db.get_assignment(&job.id, &device.id).await?.is_some() {
            return Ok(Availability::Unavailable(UnavailableReason::AlreadyAssigned));
        }
        if device.status != DeviceStatus::Free {
            return Ok(Availability::Unavailable(UnavailableReason::DeviceStatus {
                status: device.status,
            }));
        }
        let conflicts = self.conflicts_for(&device.id, job).await?;
        if !conflicts.is_empty() {
            return Ok(Availability::Unavailable(UnavailableReason::Booked { conflicts }));
        }
        Ok(Availability::Available)
    }

    async fn conflicts_for(&self, device_id: &str, job: &Job) -> Result<Vec<ConflictingJob>, BookingError> {
        let bookings = self.db.bookings_for_device(device_id).await?;
        Ok(find_conflicts(&job.id, &job.date_range(), &bookings)
            .into_iter()
            .map(ConflictingJob::from)
            .collect())
    }

    // -- assignment --------------------------------------------------------

    /// Attach a device to a job and recompute the job's revenue.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Conflict` naming the overlapping jobs,
    /// `DeviceUnavailable`, `AlreadyAssigned` or `JobClosed` when the device
    /// cannot be assigned, and `Core` (`Validation`) for a negative or
    /// oversized price.
    pub async fn assign(
        &self,
        job_id: &str,
        device_id: &str,
        custom_price: Option<Decimal>,
        actor: &Actor,
    ) -> Result<AssignOutcome, BookingError> {
        let _guard = self.device_lock.lock().await;
        let job = self.db.get_job(job_id).await?;
        let assignment = self.assign_one(&job, device_id, custom_price).await?;
        let revenue = self.recalculate(&job).await?;
        self.track_assignment(EventType::Assign, &assignment, &revenue, actor).await;
        Ok(AssignOutcome { assignment, revenue })
    }

    /// Assign several devices in order; each is checked on its own and
    /// revenue is recomputed once at the end.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Database` for an unknown job or a storage
    /// failure. Per-device refusals are reported in `rejected`.
    pub async fn bulk_assign(
        &self,
        job_id: &str,
        devices: &[(String, Option<Decimal>)],
        actor: &Actor,
    ) -> Result<BulkAssignReport, BookingError> {
        let _guard = self.device_lock.lock().await;
        let job = self.db.get_job(job_id).await?;
        let mut assigned = Vec::new();
        let mut rejected = Vec::new();
        let mut links = Vec::new();

        for (device_id, custom_price) in devices {
            match self.assign_one(&job, device_id, *custom_price).await {
                Ok(link) => {
                    assigned.push(device_id.clone());
                    links.push(link);
                }
                Err(e) if e.class().is_server_fault() => return Err(e),
                Err(e) => {
                    tracing::warn!(job = job_id, device = %device_id, error = %e, "bulk assignment rejected");
                    rejected.push(RejectedDevice {
                        device_id: device_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let revenue = self.recalculate(&job).await?;
        for link in &links {
            self.track_assignment(EventType::Assign, link, &revenue, actor).await;
        }
        Ok(BulkAssignReport {
            assigned,
            rejected,
            revenue,
        })
    }

    async fn assign_one(
        &self,
        job: &Job,
        device_id: &str,
        custom_price: Option<Decimal>,
    ) -> Result<JobDevice, BookingError> {
        if let Some(price) = custom_price {
            check_amount("custom price", price)?;
        }
        let device = self.db.get_device(device_id).await?;
        if let Availability::Unavailable(reason) = self.availability_of(&device, job).await? {
            tracing::warn!(job = %job.id, device = device_id, ?reason, "device unavailable");
            return Err(reason.into_error(&job.id, device_id));
        }

        let link = JobDevice {
            job_id: job.id.clone(),
            device_id: device_id.to_string(),
            custom_price,
            assigned_at: Utc::now(),
            returned_at: None,
        };
        match self.db.insert_assignment_if_free(&link).await {
            Ok(true) => {}
            Ok(false) => {
                let status = self.db.get_device(device_id).await?.status;
                return Err(BookingError::DeviceUnavailable {
                    device_id: device_id.to_string(),
                    status,
                });
            }
            Err(DatabaseError::Constraint(message)) if message.contains(DEVICE_CONFLICT) => {
                tracing::warn!(job = %job.id, device = device_id, "double booking refused by storage");
                return Err(BookingError::Conflict {
                    device_id: device_id.to_string(),
                    job_id: job.id.clone(),
                    conflicts: self.conflicts_for(device_id, job).await?,
                });
            }
            Err(DatabaseError::Constraint(_)) => {
                return Err(BookingError::AlreadyAssigned {
                    job_id: job.id.clone(),
                    device_id: device_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        // A device added to a running job leaves the shelf immediately.
        if job.status == JobStatus::InProgress {
            self.db
                .set_device_status(device_id, DeviceStatus::CheckedOut, Utc::now())
                .await?;
        }
        tracing::debug!(job = %job.id, device = device_id, "device assigned");
        Ok(link)
    }

    /// Detach a device from an open or in-progress job.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::NotAssigned` when the pair is not linked and
    /// `JobClosed` for completed or cancelled jobs.
    pub async fn unassign(
        &self,
        job_id: &str,
        device_id: &str,
        actor: &Actor,
    ) -> Result<RevenueBreakdown, BookingError> {
        let _guard = self.device_lock.lock().await;
        let job = self.db.get_job(job_id).await?;
        if !job.status.blocks_devices() {
            return Err(BookingError::JobClosed {
                job_id: job.id,
                status: job.status,
            });
        }
        let link = self.require_assignment(job_id, device_id).await?;
        if !self.db.delete_assignment(job_id, device_id).await? {
            return Err(BookingError::NotAssigned {
                job_id: job_id.to_string(),
                device_id: device_id.to_string(),
            });
        }
        if link.returned_at.is_none() {
            self.release_device(device_id, job_id).await?;
        }
        let revenue = self.recalculate(&job).await?;
        self.track_assignment(EventType::Unassign, &link, &revenue, actor).await;
        tracing::debug!(job = job_id, device = device_id, "device unassigned");
        Ok(revenue)
    }

    /// Mark an assignment returned. The device stays on the job's invoice but
    /// no longer blocks other bookings.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::NotAssigned` when the pair is not linked and
    /// `Core` (`InvalidTransition`) if it was already returned.
    pub async fn return_device(
        &self,
        job_id: &str,
        device_id: &str,
        actor: &Actor,
    ) -> Result<JobDevice, BookingError> {
        let _guard = self.device_lock.lock().await;
        let job = self.db.get_job(job_id).await?;
        let link = self.require_assignment(job_id, device_id).await?;
        let from = link.state();
        if !from.can_transition_to(AssignmentState::Returned) {
            return Err(CoreError::InvalidTransition {
                entity_type: "assignment".into(),
                id: format!("{job_id}/{device_id}"),
                from: from.to_string(),
                to: AssignmentState::Returned.to_string(),
            }
            .into());
        }

        let now = Utc::now();
        self.db.mark_assignment_returned(job_id, device_id, now).await?;
        self.release_device(device_id, job_id).await?;
        self.recalculate(&job).await?;

        let detail = StatusChangedDetail {
            from: from.to_string(),
            to: AssignmentState::Returned.to_string(),
            reason: None,
        };
        self.track(
            AuditRecord::new(EventType::Update, "job", job_id, format!("return device {device_id}"), actor.clone())
                .new_value(&detail),
        )
        .await;
        Ok(JobDevice {
            returned_at: Some(now),
            ..link
        })
    }

    async fn require_assignment(&self, job_id: &str, device_id: &str) -> Result<JobDevice, BookingError> {
        self.db
            .get_assignment(job_id, device_id)
            .await?
            .ok_or_else(|| BookingError::NotAssigned {
                job_id: job_id.to_string(),
                device_id: device_id.to_string(),
            })
    }

    /// Put a checked-out device back on the shelf unless another running job
    /// still holds it.
    async fn release_device(&self, device_id: &str, job_id: &str) -> Result<(), BookingError> {
        let device = self.db.get_device(device_id).await?;
        if device.status == DeviceStatus::CheckedOut
            && !self.db.device_checked_out_elsewhere(device_id, job_id).await?
        {
            self.db
                .set_device_status(device_id, DeviceStatus::Free, Utc::now())
                .await?;
        }
        Ok(())
    }

    // -- job lifecycle -----------------------------------------------------

    /// Move a job along `open → in_progress → completed`, or cancel it.
    ///
    /// Starting a job checks out its devices; completing or cancelling it
    /// returns them. The status and device changes commit together.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Core` (`InvalidTransition`) for a disallowed
    /// move and `DeviceUnavailable` if a device cannot be checked out.
    pub async fn transition_job(
        &self,
        job_id: &str,
        to: JobStatus,
        actor: &Actor,
    ) -> Result<Job, BookingError> {
        let _guard = self.device_lock.lock().await;
        let job = self.db.get_job(job_id).await?;
        if !job.status.can_transition_to(to) {
            return Err(CoreError::InvalidTransition {
                entity_type: "job".into(),
                id: job_id.to_string(),
                from: job.status.to_string(),
                to: to.to_string(),
            }
            .into());
        }

        let active: Vec<JobDevice> = self
            .db
            .assignments_for_job(job_id)
            .await?
            .into_iter()
            .filter(|a| a.returned_at.is_none())
            .collect();

        if to == JobStatus::InProgress {
            for link in &active {
                let device = self.db.get_device(&link.device_id).await?;
                let held_elsewhere = device.status == DeviceStatus::CheckedOut
                    && self.db.device_checked_out_elsewhere(&device.id, job_id).await?;
                if !matches!(device.status, DeviceStatus::Free | DeviceStatus::CheckedOut) || held_elsewhere {
                    return Err(BookingError::DeviceUnavailable {
                        device_id: device.id,
                        status: device.status,
                    });
                }
            }
        }

        let updated = self.db.transition_job_status(job_id, to, Utc::now()).await?;

        let detail = StatusChangedDetail {
            from: job.status.to_string(),
            to: to.to_string(),
            reason: None,
        };
        self.track(
            AuditRecord::new(EventType::Update, "job", job_id, format!("job {} -> {to}", job.status), actor.clone())
                .new_value(&detail),
        )
        .await;
        tracing::info!(job = job_id, from = %job.status, %to, devices = active.len(), "job transitioned");
        Ok(updated)
    }

    // -- revenue -----------------------------------------------------------

    /// Change the job discount and recompute revenue.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Database` (`NotFound`) for an unknown job.
    pub async fn update_discount(
        &self,
        job_id: &str,
        discount: Discount,
        actor: &Actor,
    ) -> Result<RevenueBreakdown, BookingError> {
        let _guard = self.device_lock.lock().await;
        let before = self.db.get_job(job_id).await?;
        let job = self
            .db
            .update_job(job_id, &JobUpdateBuilder::new().discount(discount).build(), Utc::now())
            .await?;
        let revenue = self.recalculate(&job).await?;

        let old = Discount::new(before.discount, before.discount_type)?;
        let record = AuditRecord::new(EventType::Update, "job", job_id, "update discount", actor.clone())
            .old_value(&old)
            .and_then(|r| r.new_value(&discount))
            .and_then(|r| {
                r.context(
                    "revenue",
                    &RevenueDetail {
                        revenue: revenue.revenue,
                        final_revenue: revenue.final_revenue,
                    },
                )
            });
        self.track(record).await;
        Ok(revenue)
    }

    /// Recompute and store `revenue` and `final_revenue` from the job's
    /// current device set and discount.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::Database` (`NotFound`) for an unknown job.
    pub async fn recalculate_revenue(&self, job_id: &str) -> Result<RevenueBreakdown, BookingError> {
        let job = self.db.get_job(job_id).await?;
        self.recalculate(&job).await
    }

    async fn recalculate(&self, job: &Job) -> Result<RevenueBreakdown, BookingError> {
        // Re-read: the discount may have changed since `job` was loaded.
        let current = self.db.get_job(&job.id).await?;
        let discount = Discount::new(current.discount, current.discount_type)?;
        let inputs = self.db.revenue_inputs(&current.id).await?;
        let breakdown = calculate(&inputs, discount)?;
        self.db
            .set_job_revenue(&current.id, breakdown.revenue, breakdown.final_revenue, Utc::now())
            .await?;
        tracing::debug!(
            job = %current.id,
            revenue = %breakdown.revenue,
            final_revenue = %breakdown.final_revenue,
            "revenue recalculated"
        );
        Ok(breakdown)
    }

    // -- audit -------------------------------------------------------------

    async fn track_assignment(
        &self,
        event_type: EventType,
        link: &JobDevice,
        revenue: &RevenueBreakdown,
        actor: &Actor,
    ) {
        let detail = AssignmentDetail {
            job_id: link.job_id.clone(),
            device_id: link.device_id.clone(),
            custom_price: link.custom_price,
        };
        let verb = if event_type == EventType::Assign { "assign" } else { "unassign" };
        let record = AuditRecord::new(
            event_type,
            "job",
            &link.job_id,
            format!("{verb} device {}", link.device_id),
            actor.clone(),
        )
        .new_value(&detail)
        .and_then(|r| {
            r.context(
                "revenue",
                &RevenueDetail {
                    revenue: revenue.revenue,
                    final_revenue: revenue.final_revenue,
                },
            )
        });
        self.track(record).await;
    }

    /// Audit failures are logged, never propagated.
    async fn track(&self, record: Result<AuditRecord, rental_compliance::ComplianceError>) {
        let Some(audit) = &self.audit else {
            return;
        };
        let result = match record {
            Ok(record) => audit.record(record).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::error!(error = %e, "failed to audit booking change");
        }
    }
}

fn require_name(what: &str, value: &str) -> Result<(), BookingError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{what} must not be empty")).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use rental_core::enums::DiscountType;

    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn engine() -> BookingEngine {
        BookingEngine::new(Arc::new(RentalDb::open_local(":memory:").await.unwrap()))
    }

    async fn job(engine: &BookingEngine, title: &str, start: &str, end: &str) -> Job {
        job_with_discount(engine, title, start, end, Discount::none()).await
    }

    async fn job_with_discount(
        engine: &BookingEngine,
        title: &str,
        start: &str,
        end: &str,
        discount: Discount,
    ) -> Job {
        engine
            .create_job(
                NewJob {
                    title: title.into(),
                    customer_id: Some("cust-1".into()),
                    start_date: d(start),
                    end_date: d(end),
                    discount,
                },
                &Actor::system(),
            )
            .await
            .unwrap()
    }

    async fn device(engine: &BookingEngine, rate: i64) -> Device {
        let product = engine.create_product("Moving head", Decimal::from(rate)).await.unwrap();
        engine.create_device("MH-1", Some(&product.id), None).await.unwrap()
    }

    #[rstest]
    #[case::overlaps_first("2024-01-05", "2024-01-08", Some("A"))]
    #[case::touches_second_start("2024-01-11", "2024-01-11", Some("B"))]
    #[case::touches_first_end("2024-01-10", "2024-01-10", Some("A"))]
    #[case::after_both("2024-01-21", "2024-01-25", None)]
    #[tokio::test]
    async fn closed_interval_boundaries(
        #[case] start: &str,
        #[case] end: &str,
        #[case] conflict_with: Option<&str>,
    ) {
        let engine = engine().await;
        let actor = Actor::system();
        let dev = device(&engine, 100).await;
        let a = job(&engine, "A", "2024-01-01", "2024-01-10").await;
        let b = job(&engine, "B", "2024-01-11", "2024-01-20").await;
        engine.assign(&a.id, &dev.id, None, &actor).await.unwrap();
        engine.assign(&b.id, &dev.id, None, &actor).await.unwrap();

        let candidate = job(&engine, "C", start, end).await;
        let result = engine.assign(&candidate.id, &dev.id, None, &actor).await;
        match conflict_with {
            None => assert!(result.is_ok(), "{result:?}"),
            Some(title) => match result {
                Err(BookingError::Conflict { conflicts, .. }) => {
                    assert_eq!(conflicts.len(), 1);
                    assert_eq!(conflicts[0].title, title);
                }
                other => panic!("expected conflict with {title}, got {other:?}"),
            },
        }
    }

    #[tokio::test]
    async fn check_availability_is_read_only() {
        let engine = engine().await;
        let dev = device(&engine, 100).await;
        let a = job(&engine, "A", "2024-06-01", "2024-06-05").await;
        let b = job(&engine, "B", "2024-06-03", "2024-06-10").await;

        assert_eq!(
            engine.check_availability(&dev.id, &a.id).await.unwrap(),
            Availability::Available
        );
        assert!(engine.assignments(&a.id).await.unwrap().is_empty());

        engine.assign(&a.id, &dev.id, None, &Actor::system()).await.unwrap();
        match engine.check_availability(&dev.id, &b.id).await.unwrap() {
            Availability::Unavailable(UnavailableReason::Booked { conflicts }) => {
                assert_eq!(conflicts[0].job_id, a.id);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            engine.check_availability(&dev.id, &a.id).await.unwrap(),
            Availability::Unavailable(UnavailableReason::AlreadyAssigned)
        );
    }

    #[tokio::test]
    async fn device_in_maintenance_is_not_assignable() {
        let engine = engine().await;
        let dev = device(&engine, 100).await;
        let a = job(&engine, "A", "2024-06-01", "2024-06-05").await;
        engine
            .db
            .set_device_status(&dev.id, DeviceStatus::Maintenance, Utc::now())
            .await
            .unwrap();

        let err = engine.assign(&a.id, &dev.id, None, &Actor::system()).await.unwrap_err();
        assert!(matches!(
            err,
            BookingError::DeviceUnavailable {
                status: DeviceStatus::Maintenance,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn revenue_uses_custom_price_and_percent_discount() {
        let engine = engine().await;
        let actor = Actor::system();
        let discount = Discount::new(Decimal::from(10), DiscountType::Percent).unwrap();
        let j = job_with_discount(&engine, "A", "2024-06-01", "2024-06-05", discount).await;
        let d1 = device(&engine, 100).await;
        let d2 = device(&engine, 80).await;

        engine.assign(&j.id, &d1.id, None, &actor).await.unwrap();
        let outcome = engine
            .assign(&j.id, &d2.id, Some(Decimal::from(50)), &actor)
            .await
            .unwrap();
        assert_eq!(outcome.revenue.revenue, Decimal::from(150));
        assert_eq!(outcome.revenue.final_revenue, outcome.revenue.revenue * Decimal::new(9, 1));

        let stored = engine.get_job(&j.id).await.unwrap();
        assert_eq!(stored.revenue, Decimal::from(150));
        assert_eq!(stored.final_revenue, Decimal::from(135));

        let again = engine.recalculate_revenue(&j.id).await.unwrap();
        assert_eq!(again, outcome.revenue);
    }

    #[tokio::test]
    async fn amount_discount_floors_at_zero() {
        let engine = engine().await;
        let actor = Actor::system();
        let j = job(&engine, "A", "2024-06-01", "2024-06-05").await;
        let dev = device(&engine, 100).await;
        engine.assign(&j.id, &dev.id, None, &actor).await.unwrap();

        let discount = Discount::new(Decimal::from(250), DiscountType::Amount).unwrap();
        let revenue = engine.update_discount(&j.id, discount, &actor).await.unwrap();
        assert_eq!(revenue.revenue, Decimal::from(100));
        assert_eq!(revenue.final_revenue, Decimal::ZERO);
    }

    #[tokio::test]
    async fn negative_custom_price_is_rejected() {
        let engine = engine().await;
        let j = job(&engine, "A", "2024-06-01", "2024-06-05").await;
        let dev = device(&engine, 100).await;
        let err = engine
            .assign(&j.id, &dev.id, Some(Decimal::from(-1)), &Actor::system())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Core(CoreError::Validation(_))));
        assert!(engine.assignments(&j.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_amounts_are_rejected_before_storage() {
        let engine = engine().await;
        let err = engine.create_product("Truss", Decimal::MAX).await.unwrap_err();
        assert!(matches!(err, BookingError::Core(CoreError::Validation(_))));

        let j = job(&engine, "A", "2024-06-01", "2024-06-05").await;
        let dev = device(&engine, 100).await;
        let err = engine
            .assign(&j.id, &dev.id, Some(Decimal::MAX), &Actor::system())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Core(CoreError::Validation(_))));
        assert!(engine.assignments(&j.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bulk_assign_reports_each_device() {
        let engine = engine().await;
        let actor = Actor::system();
        let a = job(&engine, "A", "2024-06-01", "2024-06-05").await;
        let b = job(&engine, "B", "2024-06-04", "2024-06-08").await;
        let d1 = device(&engine, 100).await;
        let d2 = device(&engine, 40).await;
        let d3 = device(&engine, 25).await;
        engine.assign(&a.id, &d2.id, None, &actor).await.unwrap();

        let report = engine
            .bulk_assign(
                &b.id,
                &[
                    (d1.id.clone(), None),
                    (d2.id.clone(), None),
                    (d3.id.clone(), Some(Decimal::from(30))),
                    ("dev-missing".to_string(), None),
                ],
                &actor,
            )
            .await
            .unwrap();
        assert_eq!(report.assigned, vec![d1.id.clone(), d3.id.clone()]);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.rejected[0].device_id, d2.id);
        assert!(report.rejected[0].reason.contains(&a.id));
        assert_eq!(report.revenue.revenue, Decimal::from(130));
    }

    #[tokio::test]
    async fn unassign_recomputes_and_requires_link() {
        let engine = engine().await;
        let actor = Actor::system();
        let j = job(&engine, "A", "2024-06-01", "2024-06-05").await;
        let d1 = device(&engine, 100).await;
        let d2 = device(&engine, 60).await;
        engine.assign(&j.id, &d1.id, None, &actor).await.unwrap();
        engine.assign(&j.id, &d2.id, None, &actor).await.unwrap();

        let revenue = engine.unassign(&j.id, &d1.id, &actor).await.unwrap();
        assert_eq!(revenue.revenue, Decimal::from(60));
        assert!(matches!(
            engine.unassign(&j.id, &d1.id, &actor).await,
            Err(BookingError::NotAssigned { .. })
        ));
    }

    #[tokio::test]
    async fn returned_device_no_longer_blocks() {
        let engine = engine().await;
        let actor = Actor::system();
        let a = job(&engine, "A", "2024-06-01", "2024-06-05").await;
        let b = job(&engine, "B", "2024-06-03", "2024-06-10").await;
        let dev = device(&engine, 100).await;
        engine.assign(&a.id, &dev.id, None, &actor).await.unwrap();

        let returned = engine.return_device(&a.id, &dev.id, &actor).await.unwrap();
        assert_eq!(returned.state(), AssignmentState::Returned);
        // Returned devices stay on the invoice.
        assert_eq!(engine.get_job(&a.id).await.unwrap().revenue, Decimal::from(100));

        engine.assign(&b.id, &dev.id, None, &actor).await.unwrap();
        assert!(matches!(
            engine.return_device(&a.id, &dev.id, &actor).await,
            Err(BookingError::Core(CoreError::InvalidTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn job_lifecycle_moves_devices() {
        let engine = engine().await;
        let actor = Actor::system();
        let j = job(&engine, "A", "2024-06-01", "2024-06-05").await;
        let d1 = device(&engine, 100).await;
        let d2 = device(&engine, 50).await;
        engine.assign(&j.id, &d1.id, None, &actor).await.unwrap();

        engine.transition_job(&j.id, JobStatus::InProgress, &actor).await.unwrap();
        assert_eq!(engine.get_device(&d1.id).await.unwrap().status, DeviceStatus::CheckedOut);

        // Added while running: checked out right away.
        engine.assign(&j.id, &d2.id, None, &actor).await.unwrap();
        assert_eq!(engine.get_device(&d2.id).await.unwrap().status, DeviceStatus::CheckedOut);

        let done = engine.transition_job(&j.id, JobStatus::Completed, &actor).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        for dev in [&d1, &d2] {
            assert_eq!(engine.get_device(&dev.id).await.unwrap().status, DeviceStatus::Free);
        }
        assert!(engine.assignments(&j.id).await.unwrap().iter().all(|a| a.returned_at.is_some()));
        assert_eq!(engine.get_job(&j.id).await.unwrap().final_revenue, Decimal::from(150));

        let err = engine.transition_job(&j.id, JobStatus::Open, &actor).await.unwrap_err();
        assert!(matches!(err, BookingError::Core(CoreError::InvalidTransition { .. })));
        assert!(matches!(
            engine.unassign(&j.id, &d1.id, &actor).await,
            Err(BookingError::JobClosed { .. })
        ));
    }

    #[tokio::test]
    async fn cancelled_job_releases_its_booking() {
        let engine = engine().await;
        let actor = Actor::system();
        let a = job(&engine, "A", "2024-06-01", "2024-06-05").await;
        let b = job(&engine, "B", "2024-06-01", "2024-06-05").await;
        let dev = device(&engine, 100).await;
        engine.assign(&a.id, &dev.id, None, &actor).await.unwrap();
        engine.transition_job(&a.id, JobStatus::Cancelled, &actor).await.unwrap();
        engine.assign(&b.id, &dev.id, None, &actor).await.unwrap();
    }

    #[tokio::test]
    async fn create_job_validates_input() {
        let engine = engine().await;
        let err = engine
            .create_job(
                NewJob {
                    title: "Backwards".into(),
                    customer_id: None,
                    start_date: d("2024-06-05"),
                    end_date: d("2024-06-01"),
                    discount: Discount::none(),
                },
                &Actor::system(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Core(CoreError::Validation(_))));
        assert!(engine.create_product("", Decimal::ONE).await.is_err());
        assert!(engine.create_product("Truss", Decimal::from(-5)).await.is_err());
        assert!(matches!(
            engine.create_device("Orphan", Some("prd-missing"), None).await,
            Err(BookingError::Database(DatabaseError::NotFound { .. }))
        ));
    }
}
