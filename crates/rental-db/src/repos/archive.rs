//! Archive record repository.
//!
//! Rows are immutable once written (trigger `archive_records_immutable`);
//! they may only be deleted by retention cleanup.

use chrono::{DateTime, Utc};

use rental_core::entities::ArchivedRecord;

use crate::RentalDb;
use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, get_bool, get_opt_string, parse_datetime, parse_optional_datetime};

const SELECT_COLS: &str = "id, document_type, document_id, payload, content_hash, archived_at, \
     archived_by, retention_date, signature_id, immutable, file_path";

fn row_to_record(row: &libsql::Row) -> Result<ArchivedRecord, DatabaseError> {
    Ok(ArchivedRecord {
        id: row.get(0)?,
        document_type: row.get(1)?,
        document_id: row.get(2)?,
        payload: row.get(3)?,
        content_hash: row.get(4)?,
        archived_at: parse_datetime(&row.get::<String>(5)?)?,
        archived_by: get_opt_string(row, 6)?,
        retention_date: parse_optional_datetime(get_opt_string(row, 7)?.as_deref())?,
        signature_id: get_opt_string(row, 8)?,
        immutable: get_bool(row, 9)?,
        file_path: row.get(10)?,
    })
}

impl RentalDb {
    async fn collect_records(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<ArchivedRecord>, DatabaseError> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn insert_archive_record(&self, record: &ArchivedRecord) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO archive_records ({SELECT_COLS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                ),
                libsql::params![
                    record.id.as_str(),
                    record.document_type.as_str(),
                    record.document_id.as_str(),
                    record.payload.as_str(),
                    record.content_hash.as_str(),
                    format_timestamp(record.archived_at),
                    record.archived_by.as_deref(),
                    record.retention_date.map(format_timestamp),
                    record.signature_id.as_deref(),
                    i64::from(record.immutable),
                    record.file_path.as_str()
                ],
            )
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if no record has this id.
    pub async fn get_archive_record(&self, id: &str) -> Result<ArchivedRecord, DatabaseError> {
        self.collect_records(
            &format!("SELECT {SELECT_COLS} FROM archive_records WHERE id = ?1"),
            [id],
        )
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| DatabaseError::not_found("archive record", id))
    }

    /// All archived versions of one document, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn archive_records_for_document(
        &self,
        document_type: &str,
        document_id: &str,
    ) -> Result<Vec<ArchivedRecord>, DatabaseError> {
        self.collect_records(
            &format!(
                "SELECT {SELECT_COLS} FROM archive_records
                 WHERE document_type = ?1 AND document_id = ?2
                 ORDER BY archived_at ASC"
            ),
            [document_type, document_id],
        )
        .await
    }

    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_archive_records(&self) -> Result<Vec<ArchivedRecord>, DatabaseError> {
        self.collect_records(
            &format!("SELECT {SELECT_COLS} FROM archive_records ORDER BY archived_at ASC"),
            (),
        )
        .await
    }

    /// Records whose retention date lies strictly before `now`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn expired_archive_records(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ArchivedRecord>, DatabaseError> {
        self.collect_records(
            &format!(
                "SELECT {SELECT_COLS} FROM archive_records
                 WHERE retention_date IS NOT NULL AND retention_date < ?1
                 ORDER BY retention_date ASC"
            ),
            [format_timestamp(now)],
        )
        .await
    }

    /// Records stored without a retention date.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn archive_records_missing_retention(
        &self,
    ) -> Result<Vec<ArchivedRecord>, DatabaseError> {
        self.collect_records(
            &format!(
                "SELECT {SELECT_COLS} FROM archive_records
                 WHERE retention_date IS NULL OR retention_date = ''"
            ),
            (),
        )
        .await
    }

    /// Distinct document types that have at least one archive record.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn archived_document_types(&self) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT DISTINCT document_type FROM archive_records ORDER BY document_type",
                (),
            )
            .await?;
        let mut types = Vec::new();
        while let Some(row) = rows.next().await? {
            types.push(row.get::<String>(0)?);
        }
        Ok(types)
    }

    /// Returns whether a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the DELETE fails.
    pub async fn delete_archive_record(&self, id: &str) -> Result<bool, DatabaseError> {
        let deleted = self
            .conn
            .execute("DELETE FROM archive_records WHERE id = ?1", [id])
            .await?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::test_support::helpers::test_db;

    fn record(id: &str, retention: Option<DateTime<Utc>>) -> ArchivedRecord {
        ArchivedRecord {
            id: id.into(),
            document_type: "invoice".into(),
            document_id: "inv-1".into(),
            payload: r#"{"total":"100"}"#.into(),
            content_hash: "abc".into(),
            archived_at: Utc::now(),
            archived_by: Some("alice".into()),
            retention_date: retention,
            signature_id: None,
            immutable: true,
            file_path: format!("/tmp/{id}.json"),
        }
    }

    #[tokio::test]
    async fn roundtrip_and_immutability() {
        let db = test_db().await;
        let rec = record("arc-1", Some(Utc::now() + Duration::days(10)));
        db.insert_archive_record(&rec).await.unwrap();
        assert_eq!(db.get_archive_record("arc-1").await.unwrap(), rec);

        let update = db
            .conn()
            .execute("UPDATE archive_records SET payload = '{}' WHERE id = 'arc-1'", ())
            .await;
        assert!(update.is_err());
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let db = test_db().await;
        let err = db.get_archive_record("arc-missing").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn expiry_and_missing_retention_queries() {
        let db = test_db().await;
        let now = Utc::now();
        db.insert_archive_record(&record("arc-old", Some(now - Duration::days(1))))
            .await
            .unwrap();
        db.insert_archive_record(&record("arc-new", Some(now + Duration::days(1))))
            .await
            .unwrap();
        db.insert_archive_record(&record("arc-none", None)).await.unwrap();

        let expired = db.expired_archive_records(now).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, "arc-old");

        let missing = db.archive_records_missing_retention().await.unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, "arc-none");

        assert_eq!(db.archived_document_types().await.unwrap(), vec!["invoice"]);
        assert_eq!(
            db.archive_records_for_document("invoice", "inv-1").await.unwrap().len(),
            3
        );
        assert!(db.delete_archive_record("arc-old").await.unwrap());
    }
}
