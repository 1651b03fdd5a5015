//! Job repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use rental_core::entities::Job;
use rental_core::enums::{DeviceStatus, JobStatus};

use crate::RentalDb;
use crate::error::DatabaseError;
use crate::helpers::{
    format_date, format_timestamp, get_opt_string, parse_date, parse_datetime, parse_decimal,
    parse_enum,
};
use crate::updates::job::JobUpdate;

const SELECT_COLS: &str = "id, title, customer_id, start_date, end_date, status, discount, \
     discount_type, revenue, final_revenue, created_at, updated_at";

fn row_to_job(row: &libsql::Row) -> Result<Job, DatabaseError> {
    Ok(Job {
        id: row.get(0)?,
        title: row.get(1)?,
        customer_id: get_opt_string(row, 2)?,
        start_date: parse_date(&row.get::<String>(3)?)?,
        end_date: parse_date(&row.get::<String>(4)?)?,
        status: parse_enum(&row.get::<String>(5)?)?,
        discount: parse_decimal(&row.get::<String>(6)?)?,
        discount_type: parse_enum(&row.get::<String>(7)?)?,
        revenue: parse_decimal(&row.get::<String>(8)?)?,
        final_revenue: parse_decimal(&row.get::<String>(9)?)?,
        created_at: parse_datetime(&row.get::<String>(10)?)?,
        updated_at: parse_datetime(&row.get::<String>(11)?)?,
    })
}

impl RentalDb {
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails (including the
    /// `start_date <= end_date` CHECK).
    pub async fn insert_job(&self, job: &Job) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO jobs ({SELECT_COLS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                libsql::params![
                    job.id.as_str(),
                    job.title.as_str(),
                    job.customer_id.as_deref(),
                    format_date(job.start_date),
                    format_date(job.end_date),
                    job.status.as_str(),
                    job.discount.to_string(),
                    job.discount_type.as_str(),
                    job.revenue.to_string(),
                    job.final_revenue.to_string(),
                    format_timestamp(job.created_at),
                    format_timestamp(job.updated_at)
                ],
            )
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no job has this id.
    pub async fn get_job(&self, id: &str) -> Result<Job, DatabaseError> {
        let mut rows = self
            .conn
            .query(&format!("SELECT {SELECT_COLS} FROM jobs WHERE id = ?1"), [id])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("job", id))?;
        row_to_job(&row)
    }

    /// Jobs ordered by start date, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: u32,
    ) -> Result<Vec<Job>, DatabaseError> {
        let mut rows = match status {
            Some(status) => {
                self.conn
                    .query(
                        &format!(
                            "SELECT {SELECT_COLS} FROM jobs WHERE status = ?1
                             ORDER BY start_date ASC, id ASC LIMIT ?2"
                        ),
                        libsql::params![status.as_str(), i64::from(limit)],
                    )
                    .await?
            }
            None => {
                self.conn
                    .query(
                        &format!(
                            "SELECT {SELECT_COLS} FROM jobs ORDER BY start_date ASC, id ASC LIMIT ?1"
                        ),
                        [i64::from(limit)],
                    )
                    .await?
            }
        };
        let mut jobs = Vec::new();
        while let Some(row) = rows.next().await? {
            jobs.push(row_to_job(&row)?);
        }
        Ok(jobs)
    }

    /// Apply the `Some` fields of `update` and return the updated job.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no job has this id.
    pub async fn update_job(
        &self,
        job_id: &str,
        update: &JobUpdate,
        now: DateTime<Utc>,
    ) -> Result<Job, DatabaseError> {
        let mut sets = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();
        let mut idx = 1usize;

        if let Some(ref title) = update.title {
            sets.push(format!("title = ?{idx}"));
            params.push(title.clone().into());
            idx += 1;
        }
        if let Some(ref customer_id) = update.customer_id {
            sets.push(format!("customer_id = ?{idx}"));
            params.push(customer_id.clone().map_or(libsql::Value::Null, Into::into));
            idx += 1;
        }
        if let Some(status) = update.status {
            sets.push(format!("status = ?{idx}"));
            params.push(status.as_str().into());
            idx += 1;
        }
        if let Some(discount) = update.discount {
            sets.push(format!("discount = ?{idx}"));
            params.push(discount.value().to_string().into());
            idx += 1;
            sets.push(format!("discount_type = ?{idx}"));
            params.push(discount.kind().as_str().into());
            idx += 1;
        }

        if sets.is_empty() {
            return self.get_job(job_id).await;
        }

        sets.push(format!("updated_at = ?{idx}"));
        params.push(format_timestamp(now).into());
        idx += 1;

        params.push(job_id.into());
        let sql = format!("UPDATE jobs SET {} WHERE id = ?{idx}", sets.join(", "));
        let changed = self
            .conn
            .execute(&sql, libsql::params_from_iter(params))
            .await?;
        if changed == 0 {
            return Err(DatabaseError::not_found("job", job_id));
        }
        self.get_job(job_id).await
    }

    /// Set a job's status together with the device changes that go with it,
    /// in one transaction. `in_progress` checks out every unreturned device;
    /// `completed` and `cancelled` return the job's links and free each device
    /// that no other running job still holds.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` for an unknown job. Nothing is
    /// changed if any statement fails.
    pub async fn transition_job_status(
        &self,
        job_id: &str,
        to: JobStatus,
        now: DateTime<Utc>,
    ) -> Result<Job, DatabaseError> {
        let stamp = format_timestamp(now);
        let tx = self.conn.transaction().await?;
        let result = async {
            let changed = tx
                .execute(
                    "UPDATE jobs SET status = ?2, updated_at = ?3 WHERE id = ?1",
                    libsql::params![job_id, to.as_str(), stamp.as_str()],
                )
                .await?;
            if changed == 0 {
                return Err(DatabaseError::not_found("job", job_id));
            }

            match to {
                JobStatus::InProgress => {
                    tx.execute(
                        "UPDATE devices SET status = ?2, updated_at = ?3
                         WHERE id IN (SELECT device_id FROM job_devices
                                      WHERE job_id = ?1 AND returned_at IS NULL)",
                        libsql::params![job_id, DeviceStatus::CheckedOut.as_str(), stamp.as_str()],
                    )
                    .await?;
                }
                JobStatus::Completed | JobStatus::Cancelled => {
                    let mut device_ids = Vec::new();
                    let mut rows = tx
                        .query(
                            "SELECT device_id FROM job_devices
                             WHERE job_id = ?1 AND returned_at IS NULL",
                            [job_id],
                        )
                        .await?;
                    while let Some(row) = rows.next().await? {
                        device_ids.push(row.get::<String>(0)?);
                    }
                    drop(rows);

                    tx.execute(
                        "UPDATE job_devices SET returned_at = ?2
                         WHERE job_id = ?1 AND returned_at IS NULL",
                        libsql::params![job_id, stamp.as_str()],
                    )
                    .await?;
                    for device_id in &device_ids {
                        tx.execute(
                            "UPDATE devices SET status = ?2, updated_at = ?4
                             WHERE id = ?1 AND status = ?3
                               AND NOT EXISTS (
                                   SELECT 1 FROM job_devices jd
                                   JOIN jobs j ON j.id = jd.job_id
                                   WHERE jd.device_id = ?1 AND jd.returned_at IS NULL
                                     AND j.status = 'in_progress')",
                            libsql::params![
                                device_id.as_str(),
                                DeviceStatus::Free.as_str(),
                                DeviceStatus::CheckedOut.as_str(),
                                stamp.as_str()
                            ],
                        )
                        .await?;
                    }
                }
                JobStatus::Open => {}
            }
            Ok::<(), DatabaseError>(())
        }
        .await;

        match result {
            Ok(()) => tx.commit().await?,
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(e);
            }
        }
        tracing::debug!(job = job_id, %to, "job status changed");
        self.get_job(job_id).await
    }

    /// Store freshly recalculated revenue figures.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no job has this id.
    pub async fn set_job_revenue(
        &self,
        job_id: &str,
        revenue: Decimal,
        final_revenue: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let changed = self
            .conn
            .execute(
                "UPDATE jobs SET revenue = ?2, final_revenue = ?3, updated_at = ?4 WHERE id = ?1",
                libsql::params![
                    job_id,
                    revenue.to_string(),
                    final_revenue.to_string(),
                    format_timestamp(now)
                ],
            )
            .await?;
        if changed == 0 {
            return Err(DatabaseError::not_found("job", job_id));
        }
        Ok(())
    }
}
