//! Job/device assignment repository.
//!
//! The `job_devices_no_overlap` trigger is the storage-level exclusion
//! constraint: an insert that would give a device two unreturned, overlapping
//! assignments to open or in-progress jobs aborts with `device_conflict`.

use chrono::{DateTime, Utc};

use rental_core::availability::{Booking, DateRange};
use rental_core::entities::JobDevice;
use rental_core::revenue::LineInput;

use crate::RentalDb;
use crate::error::DatabaseError;
use crate::helpers::{
    format_timestamp, get_opt_string, parse_date, parse_datetime, parse_decimal, parse_enum,
    parse_optional_datetime, parse_optional_decimal,
};

const SELECT_COLS: &str = "job_id, device_id, custom_price, assigned_at, returned_at";

/// Trigger message raised on a double booking.
pub const DEVICE_CONFLICT: &str = "device_conflict";

fn row_to_assignment(row: &libsql::Row) -> Result<JobDevice, DatabaseError> {
    Ok(JobDevice {
        job_id: row.get(0)?,
        device_id: row.get(1)?,
        custom_price: parse_optional_decimal(get_opt_string(row, 2)?.as_deref())?,
        assigned_at: parse_datetime(&row.get::<String>(3)?)?,
        returned_at: parse_optional_datetime(get_opt_string(row, 4)?.as_deref())?,
    })
}

impl RentalDb {
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_assignment(
        &self,
        job_id: &str,
        device_id: &str,
    ) -> Result<Option<JobDevice>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {SELECT_COLS} FROM job_devices WHERE job_id = ?1 AND device_id = ?2"),
                [job_id, device_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_assignment(&row)?)),
            None => Ok(None),
        }
    }

    /// All assignments of a job, in assignment order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn assignments_for_job(&self, job_id: &str) -> Result<Vec<JobDevice>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM job_devices WHERE job_id = ?1
                     ORDER BY assigned_at ASC, device_id ASC"
                ),
                [job_id],
            )
            .await?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next().await? {
            assignments.push(row_to_assignment(&row)?);
        }
        Ok(assignments)
    }

    /// Insert the join row only if the device is still `free`. Returns `false`
    /// when the device status no longer allows it (nothing inserted).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Constraint` containing [`DEVICE_CONFLICT`] when
    /// the overlap trigger refuses the insert, or when the pair already exists.
    pub async fn insert_assignment_if_free(
        &self,
        assignment: &JobDevice,
    ) -> Result<bool, DatabaseError> {
        let inserted = self
            .conn
            .execute(
                "INSERT INTO job_devices (job_id, device_id, custom_price, assigned_at, returned_at)
                 SELECT ?1, ?2, ?3, ?4, NULL
                 WHERE EXISTS (SELECT 1 FROM devices WHERE id = ?2 AND status = 'free')",
                libsql::params![
                    assignment.job_id.as_str(),
                    assignment.device_id.as_str(),
                    assignment.custom_price.map(|p| p.to_string()),
                    format_timestamp(assignment.assigned_at)
                ],
            )
            .await
            .map_err(|e| {
                let message = e.to_string();
                if message.contains(DEVICE_CONFLICT) || message.contains("constraint failed") {
                    DatabaseError::Constraint(message)
                } else {
                    DatabaseError::LibSql(e)
                }
            })?;
        Ok(inserted > 0)
    }

    /// Returns whether a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the DELETE fails.
    pub async fn delete_assignment(
        &self,
        job_id: &str,
        device_id: &str,
    ) -> Result<bool, DatabaseError> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM job_devices WHERE job_id = ?1 AND device_id = ?2",
                [job_id, device_id],
            )
            .await?;
        Ok(deleted > 0)
    }

    /// Stamp `returned_at` on an unreturned assignment. Returns whether one
    /// was updated.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the UPDATE fails.
    pub async fn mark_assignment_returned(
        &self,
        job_id: &str,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let changed = self
            .conn
            .execute(
                "UPDATE job_devices SET returned_at = ?3
                 WHERE job_id = ?1 AND device_id = ?2 AND returned_at IS NULL",
                libsql::params![job_id, device_id, format_timestamp(now)],
            )
            .await?;
        Ok(changed > 0)
    }

    /// Unreturned bookings of a device, with their job's range and status.
    ///
    /// This is the availability query contract: the caller decides which of
    /// these conflict with a candidate range.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn bookings_for_device(&self, device_id: &str) -> Result<Vec<Booking>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT j.id, j.title, j.status, j.start_date, j.end_date
                 FROM job_devices jd
                 JOIN jobs j ON j.id = jd.job_id
                 WHERE jd.device_id = ?1 AND jd.returned_at IS NULL
                 ORDER BY j.start_date ASC",
                [device_id],
            )
            .await?;
        let mut bookings = Vec::new();
        while let Some(row) = rows.next().await? {
            let start = parse_date(&row.get::<String>(3)?)?;
            let end = parse_date(&row.get::<String>(4)?)?;
            bookings.push(Booking {
                job_id: row.get(0)?,
                job_title: row.get(1)?,
                status: parse_enum(&row.get::<String>(2)?)?,
                range: DateRange::from_ordered(start, end),
            });
        }
        Ok(bookings)
    }

    /// Revenue calculator input for every device attached to a job (returned
    /// devices included; unassigned ones are gone). Devices without a product
    /// are charged a flat rate of zero.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn revenue_inputs(&self, job_id: &str) -> Result<Vec<LineInput>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT jd.device_id, COALESCE(p.flat_rate, '0'), jd.custom_price
                 FROM job_devices jd
                 JOIN devices d ON d.id = jd.device_id
                 LEFT JOIN products p ON p.id = d.product_id
                 WHERE jd.job_id = ?1
                 ORDER BY jd.assigned_at ASC, jd.device_id ASC",
                [job_id],
            )
            .await?;
        let mut inputs = Vec::new();
        while let Some(row) = rows.next().await? {
            inputs.push(LineInput {
                device_id: row.get(0)?,
                flat_rate: parse_decimal(&row.get::<String>(1)?)?,
                custom_price: parse_optional_decimal(get_opt_string(&row, 2)?.as_deref())?,
            });
        }
        Ok(inputs)
    }

    /// Whether the device is still out on another in-progress job.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn device_checked_out_elsewhere(
        &self,
        device_id: &str,
        excluding_job: &str,
    ) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM job_devices jd
                 JOIN jobs j ON j.id = jd.job_id
                 WHERE jd.device_id = ?1 AND jd.job_id != ?2
                   AND jd.returned_at IS NULL AND j.status = 'in_progress'
                 LIMIT 1",
                [device_id, excluding_job],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }
}
