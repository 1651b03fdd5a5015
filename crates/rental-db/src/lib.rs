//! # rental-db
//!
//! libSQL database operations for RentalCore.
//!
//! Holds all relational state: the hash-chained audit log and its anchor,
//! retention policies, archive records, digital signatures, products,
//! devices, jobs, job/device assignments, consent records, and data subject
//! requests. Repositories are `impl RentalDb` blocks under [`repos`].
//!
//! Callers above this crate (the compliance and booking layers) own the
//! business rules; this crate only guarantees what the schema itself can
//! enforce: append-only audit rows, immutable archive rows, one active
//! retention policy per document type, and no overlapping active bookings of
//! one device.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod updates;

#[cfg(test)]
mod test_support;

use error::DatabaseError;
use libsql::Builder;

pub use repos::audit::{AuditFilter, ChainAnchor};

/// Central database handle for all RentalCore state.
///
/// Wraps a libSQL database and a single shared connection.
pub struct RentalDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl RentalDb {
    /// Open a local database at the given path, or `:memory:`.
    ///
    /// Runs migrations automatically.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Foreign keys are per-connection in SQLite.
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let rental_db = Self { db, conn };
        rental_db.run_migrations().await?;
        tracing::debug!(path, "database opened");
        Ok(rental_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Generate a prefixed ID via libSQL. Returns e.g., `"job-a3f8b2c1"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT '{prefix}-' || lower(hex(randomblob(4)))"),
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::test_support::helpers::test_db;

    #[tokio::test]
    async fn open_local_creates_schema() {
        let db = test_db().await;

        let tables = [
            "audit_events",
            "audit_chain_anchor",
            "retention_policies",
            "archive_records",
            "digital_signatures",
            "products",
            "devices",
            "jobs",
            "job_devices",
            "consent_records",
            "data_subject_requests",
        ];
        for table in &tables {
            let mut rows = db
                .conn()
                .query(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    [*table],
                )
                .await
                .unwrap();
            let row = rows.next().await.unwrap();
            assert!(row.is_some(), "table '{table}' should exist");
        }
    }

    #[tokio::test]
    async fn generate_id_correct_format() {
        let db = test_db().await;
        let id = db.generate_id("job").await.unwrap();
        assert!(id.starts_with("job-"), "ID should start with 'job-': {id}");
        assert_eq!(id.len(), 12);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn generate_id_all_prefixes() {
        let db = test_db().await;
        for prefix in rental_core::ids::ALL_PREFIXES {
            let id = db.generate_id(prefix).await.unwrap();
            assert!(id.starts_with(&format!("{prefix}-")));
        }
    }

    #[tokio::test]
    async fn generate_id_uniqueness() {
        let db = test_db().await;
        let mut ids = HashSet::new();
        for _ in 0..100 {
            let id = db.generate_id("tst").await.unwrap();
            assert!(ids.insert(id.clone()), "Duplicate ID generated: {id}");
        }
    }

    #[tokio::test]
    async fn idempotent_migrations() {
        let db = test_db().await;
        db.run_migrations().await.unwrap();
        let anchor = db.chain_anchor().await.unwrap();
        assert_eq!(anchor.anchor_hash, "");
        assert_eq!(anchor.pruned_through_seq, 0);
    }

    #[tokio::test]
    async fn file_backed_database_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rental.db");
        let path = path.to_str().unwrap();
        {
            let db = RentalDb::open_local(path).await.unwrap();
            db.conn()
                .execute(
                    "INSERT INTO products (id, name, flat_rate, created_at) VALUES ('prd-1', 'Beamer', '100', '2024-01-01T00:00:00Z')",
                    (),
                )
                .await
                .unwrap();
        }
        let db = RentalDb::open_local(path).await.unwrap();
        let product = db.get_product("prd-1").await.unwrap();
        assert_eq!(product.name, "Beamer");
    }
}
