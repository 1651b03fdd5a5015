//! Retention policy repository.
//!
//! At most one active policy per document type, enforced by the partial
//! unique index `idx_retention_policies_active`.

use chrono::{DateTime, Utc};

use rental_core::entities::RetentionPolicy;

use crate::RentalDb;
use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, get_bool, get_u32, parse_datetime};

const SELECT_COLS: &str =
    "id, document_type, retention_years, legal_basis, auto_delete, active, created_at, updated_at";

fn row_to_policy(row: &libsql::Row) -> Result<RetentionPolicy, DatabaseError> {
    Ok(RetentionPolicy {
        id: row.get(0)?,
        document_type: row.get(1)?,
        retention_years: get_u32(row, 2)?,
        legal_basis: row.get(3)?,
        auto_delete: get_bool(row, 4)?,
        active: get_bool(row, 5)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
        updated_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

async fn insert_policy(
    conn: &libsql::Connection,
    policy: &RetentionPolicy,
) -> Result<(), DatabaseError> {
    conn.execute(
        &format!("INSERT INTO retention_policies ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        libsql::params![
            policy.id.as_str(),
            policy.document_type.as_str(),
            i64::from(policy.retention_years),
            policy.legal_basis.as_str(),
            i64::from(policy.auto_delete),
            i64::from(policy.active),
            format_timestamp(policy.created_at),
            format_timestamp(policy.updated_at)
        ],
    )
    .await
    .map_err(|e| DatabaseError::constraint_or(e, "UNIQUE"))?;
    Ok(())
}

impl RentalDb {
    /// Insert a policy as-is.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Constraint` if it is active and another active
    /// policy already exists for the document type.
    pub async fn insert_retention_policy(
        &self,
        policy: &RetentionPolicy,
    ) -> Result<(), DatabaseError> {
        insert_policy(&self.conn, policy).await
    }

    /// Deactivate the current active policy for `policy.document_type` (if
    /// any) and insert `policy` as the new active one, atomically.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if either statement fails; the previous policy
    /// stays active in that case.
    pub async fn replace_active_policy(
        &self,
        policy: &RetentionPolicy,
    ) -> Result<(), DatabaseError> {
        let tx = self.conn.transaction().await?;
        let result = async {
            tx.execute(
                "UPDATE retention_policies SET active = 0, updated_at = ?2
                 WHERE document_type = ?1 AND active = 1",
                libsql::params![
                    policy.document_type.as_str(),
                    format_timestamp(policy.updated_at)
                ],
            )
            .await?;
            insert_policy(&tx, policy).await
        }
        .await;

        match result {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }

    /// Deactivate the active policy for a document type. Returns whether one
    /// existed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the UPDATE fails.
    pub async fn deactivate_retention_policy(
        &self,
        document_type: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let changed = self
            .conn
            .execute(
                "UPDATE retention_policies SET active = 0, updated_at = ?2
                 WHERE document_type = ?1 AND active = 1",
                libsql::params![document_type, format_timestamp(now)],
            )
            .await?;
        Ok(changed > 0)
    }

    /// The active policy for a document type, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn active_retention_policy(
        &self,
        document_type: &str,
    ) -> Result<Option<RetentionPolicy>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM retention_policies
                     WHERE document_type = ?1 AND active = 1"
                ),
                [document_type],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_policy(&row)?)),
            None => Ok(None),
        }
    }

    /// All policies ordered by document type, newest first within a type.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_retention_policies(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<RetentionPolicy>, DatabaseError> {
        let filter = if include_inactive { "" } else { "WHERE active = 1" };
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM retention_policies {filter}
                     ORDER BY document_type ASC, created_at DESC"
                ),
                (),
            )
            .await?;
        let mut policies = Vec::new();
        while let Some(row) = rows.next().await? {
            policies.push(row_to_policy(&row)?);
        }
        Ok(policies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::test_db;

    fn policy(id: &str, doc: &str, years: u32) -> RetentionPolicy {
        let now = Utc::now();
        RetentionPolicy {
            id: id.into(),
            document_type: doc.into(),
            retention_years: years,
            legal_basis: "HGB §257".into(),
            auto_delete: false,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn second_active_policy_is_rejected() {
        let db = test_db().await;
        db.insert_retention_policy(&policy("pol-1", "invoice", 10))
            .await
            .unwrap();
        let err = db
            .insert_retention_policy(&policy("pol-2", "invoice", 8))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Constraint(_)), "{err}");
    }

    #[tokio::test]
    async fn replace_keeps_history() {
        let db = test_db().await;
        db.insert_retention_policy(&policy("pol-1", "invoice", 10))
            .await
            .unwrap();
        db.replace_active_policy(&policy("pol-2", "invoice", 8))
            .await
            .unwrap();

        let active = db.active_retention_policy("invoice").await.unwrap().unwrap();
        assert_eq!(active.id, "pol-2");
        assert_eq!(active.retention_years, 8);

        let all = db.list_retention_policies(true).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(db.list_retention_policies(false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deactivate_leaves_no_active_policy() {
        let db = test_db().await;
        db.insert_retention_policy(&policy("pol-1", "receipt", 10))
            .await
            .unwrap();
        assert!(db.deactivate_retention_policy("receipt", Utc::now()).await.unwrap());
        assert!(!db.deactivate_retention_policy("receipt", Utc::now()).await.unwrap());
        assert!(db.active_retention_policy("receipt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_years_violates_check() {
        let db = test_db().await;
        assert!(db.insert_retention_policy(&policy("pol-1", "contract", 0)).await.is_err());
    }
}
