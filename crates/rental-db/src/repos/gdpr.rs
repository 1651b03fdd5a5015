//! Consent record and data subject request repository.

use chrono::{DateTime, Utc};

use rental_core::entities::{ConsentRecord, DataSubjectRequest};
use rental_core::enums::{ConsentType, RequestStatus};

use crate::RentalDb;
use crate::error::DatabaseError;
use crate::helpers::{
    format_timestamp, get_bool, get_opt_string, parse_datetime, parse_enum,
    parse_optional_datetime,
};

const CONSENT_COLS: &str =
    "id, customer_id, consent_type, granted, legal_basis, granted_at, withdrawn_at, ip_address";
const REQUEST_COLS: &str =
    "id, customer_id, request_type, status, notes, requested_at, completed_at, updated_at";

fn row_to_consent(row: &libsql::Row) -> Result<ConsentRecord, DatabaseError> {
    Ok(ConsentRecord {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        consent_type: parse_enum(&row.get::<String>(2)?)?,
        granted: get_bool(row, 3)?,
        legal_basis: row.get(4)?,
        granted_at: parse_datetime(&row.get::<String>(5)?)?,
        withdrawn_at: parse_optional_datetime(get_opt_string(row, 6)?.as_deref())?,
        ip_address: get_opt_string(row, 7)?,
    })
}

fn row_to_request(row: &libsql::Row) -> Result<DataSubjectRequest, DatabaseError> {
    Ok(DataSubjectRequest {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        request_type: parse_enum(&row.get::<String>(2)?)?,
        status: parse_enum(&row.get::<String>(3)?)?,
        notes: get_opt_string(row, 4)?,
        requested_at: parse_datetime(&row.get::<String>(5)?)?,
        completed_at: parse_optional_datetime(get_opt_string(row, 6)?.as_deref())?,
        updated_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

impl RentalDb {
    // -----------------------------------------------------------------------
    // Consent
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn insert_consent(&self, consent: &ConsentRecord) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO consent_records ({CONSENT_COLS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                libsql::params![
                    consent.id.as_str(),
                    consent.customer_id.as_str(),
                    consent.consent_type.as_str(),
                    i64::from(consent.granted),
                    consent.legal_basis.as_str(),
                    format_timestamp(consent.granted_at),
                    consent.withdrawn_at.map(format_timestamp),
                    consent.ip_address.as_deref()
                ],
            )
            .await?;
        Ok(())
    }

    /// The most recent consent record for a customer and consent type.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn latest_consent(
        &self,
        customer_id: &str,
        consent_type: ConsentType,
    ) -> Result<Option<ConsentRecord>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {CONSENT_COLS} FROM consent_records
                     WHERE customer_id = ?1 AND consent_type = ?2
                     ORDER BY granted_at DESC, rowid DESC LIMIT 1"
                ),
                [customer_id, consent_type.as_str()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_consent(&row)?)),
            None => Ok(None),
        }
    }

    /// All consent records of a customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn consents_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Vec<ConsentRecord>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {CONSENT_COLS} FROM consent_records WHERE customer_id = ?1
                     ORDER BY granted_at DESC, rowid DESC"
                ),
                [customer_id],
            )
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_consent(&row)?);
        }
        Ok(records)
    }

    /// Stamp `withdrawn_at` on a consent record that is not yet withdrawn.
    /// Returns whether a row changed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the UPDATE fails.
    pub async fn withdraw_consent_record(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let changed = self
            .conn
            .execute(
                "UPDATE consent_records SET withdrawn_at = ?2 WHERE id = ?1 AND withdrawn_at IS NULL",
                libsql::params![id, format_timestamp(at)],
            )
            .await?;
        Ok(changed > 0)
    }

    // -----------------------------------------------------------------------
    // Data subject requests
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn insert_request(&self, request: &DataSubjectRequest) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO data_subject_requests ({REQUEST_COLS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                libsql::params![
                    request.id.as_str(),
                    request.customer_id.as_str(),
                    request.request_type.as_str(),
                    request.status.as_str(),
                    request.notes.as_deref(),
                    format_timestamp(request.requested_at),
                    request.completed_at.map(format_timestamp),
                    format_timestamp(request.updated_at)
                ],
            )
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no request has this id.
    pub async fn get_request(&self, id: &str) -> Result<DataSubjectRequest, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {REQUEST_COLS} FROM data_subject_requests WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("data subject request", id))?;
        row_to_request(&row)
    }

    /// Set the status (and, for terminal states, `completed_at`).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no request has this id.
    pub async fn update_request_status(
        &self,
        id: &str,
        status: RequestStatus,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DataSubjectRequest, DatabaseError> {
        let completed_at = status.is_terminal().then(|| format_timestamp(now));
        let changed = self
            .conn
            .execute(
                "UPDATE data_subject_requests
                 SET status = ?2, notes = COALESCE(?3, notes), completed_at = ?4, updated_at = ?5
                 WHERE id = ?1",
                libsql::params![id, status.as_str(), notes, completed_at, format_timestamp(now)],
            )
            .await?;
        if changed == 0 {
            return Err(DatabaseError::not_found("data subject request", id));
        }
        self.get_request(id).await
    }

    /// Requests of a customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn requests_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Vec<DataSubjectRequest>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {REQUEST_COLS} FROM data_subject_requests WHERE customer_id = ?1
                     ORDER BY requested_at DESC"
                ),
                [customer_id],
            )
            .await?;
        let mut requests = Vec::new();
        while let Some(row) = rows.next().await? {
            requests.push(row_to_request(&row)?);
        }
        Ok(requests)
    }
}
