//! GoBD Archive.
//!
//! Snapshots business documents into write-once files under
//! `{archive_dir}/{document_type}/{record_id}.json`, signs them with the
//! Digital Signature Manager, and records them in `archive_records`. The
//! content hash covers the canonical JSON payload and must match both the
//! stored payload and the file on disk.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use rental_core::audit_detail::ArchiveDetail;
use rental_core::digest::{canonical_json, sha256_hex};
use rental_core::entities::{Actor, ArchivedRecord};
use rental_core::enums::EventType;
use rental_core::ids::PREFIX_ARCHIVE;
use rental_db::RentalDb;

use crate::audit::{AuditLogger, AuditRecord};
use crate::error::ComplianceError;
use crate::retention::RetentionManager;
use crate::signature::SignatureManager;

/// Result of checking one archive record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityCheck {
    pub record_id: String,
    /// Stored payload still hashes to the stored content hash.
    pub payload_ok: bool,
    /// File on disk still hashes to the stored content hash.
    pub file_ok: bool,
    pub signature_ok: bool,
}

impl IntegrityCheck {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.payload_ok && self.file_ok && self.signature_ok
    }
}

pub struct GoBdArchive {
    db: Arc<RentalDb>,
    retention: Arc<RetentionManager>,
    signatures: Arc<SignatureManager>,
    audit: Arc<AuditLogger>,
    archive_dir: PathBuf,
    signer: String,
}

impl GoBdArchive {
    #[must_use]
    pub fn new(
        db: Arc<RentalDb>,
        retention: Arc<RetentionManager>,
        signatures: Arc<SignatureManager>,
        audit: Arc<AuditLogger>,
        archive_dir: PathBuf,
        signer: impl Into<String>,
    ) -> Self {
        Self {
            db,
            retention,
            signatures,
            audit,
            archive_dir,
            signer: signer.into(),
        }
    }

    #[must_use]
    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Archive a snapshot of a document.
    ///
    /// The file is written first, then signed, then the record is persisted,
    /// and only then is the ARCHIVE event logged. If signing or persisting
    /// fails the file is removed again.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Validation` for a document type that is not
    /// a plain path segment, `ComplianceError::Io` if the file cannot be
    /// written, and `ComplianceError::Database` if signing, persisting or
    /// auditing fails.
    pub async fn archive<T: Serialize + ?Sized>(
        &self,
        document_type: &str,
        document_id: &str,
        payload: &T,
        actor: Actor,
    ) -> Result<ArchivedRecord, ComplianceError> {
        validate_document_type(document_type)?;
        if document_id.trim().is_empty() {
            return Err(ComplianceError::Validation(
                "document id must not be empty".into(),
            ));
        }

        let canonical = canonical_json(payload)?;
        let content_hash = sha256_hex(&canonical);
        let id = self.db.generate_id(PREFIX_ARCHIVE).await?;
        let archived_at = Utc::now();
        let retention_date = self
            .retention
            .retention_date_for_at(document_type, archived_at)
            .await?;

        let file_path = self.archive_dir.join(document_type).join(format!("{id}.json"));
        write_immutable(&file_path, canonical.as_bytes())?;

        let signature = match self
            .signatures
            .sign_hash(document_type, document_id, &content_hash, &self.signer, archived_at)
            .await
        {
            Ok(sig) => sig,
            Err(e) => {
                remove_orphan(&file_path);
                return Err(e);
            }
        };

        let record = ArchivedRecord {
            id,
            document_type: document_type.to_string(),
            document_id: document_id.to_string(),
            payload: canonical,
            content_hash,
            archived_at,
            archived_by: actor.user_id.clone().or_else(|| actor.username.clone()),
            retention_date: Some(retention_date),
            signature_id: Some(signature.id),
            immutable: true,
            file_path: file_path.display().to_string(),
        };
        if let Err(e) = self.db.insert_archive_record(&record).await {
            tracing::error!(record = %record.id, error = %e, "archive record not persisted, removing file");
            remove_orphan(&file_path);
            return Err(e.into());
        }

        let detail = ArchiveDetail {
            record_id: record.id.clone(),
            document_type: record.document_type.clone(),
            document_id: record.document_id.clone(),
            content_hash: record.content_hash.clone(),
            signature_id: record.signature_id.clone(),
        };
        self.audit
            .record(
                AuditRecord::new(
                    EventType::Archive,
                    document_type,
                    document_id,
                    format!("archive {document_type} {document_id}"),
                    actor,
                )
                .new_value(&detail)?,
            )
            .await?;

        tracing::info!(
            record = %record.id,
            document_type,
            document_id,
            retention = %retention_date.date_naive(),
            "document archived"
        );
        Ok(record)
    }

    /// Recompute the content hash from the stored payload and, independently,
    /// from the file on disk, and check the signature.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Database` (`NotFound`) for an unknown record
    /// and `ComplianceError::Io` if the file exists but cannot be read.
    pub async fn verify_integrity(&self, record_id: &str) -> Result<IntegrityCheck, ComplianceError> {
        let record = self.db.get_archive_record(record_id).await?;
        self.check(&record).await
    }

    async fn check(&self, record: &ArchivedRecord) -> Result<IntegrityCheck, ComplianceError> {
        let payload_hash = sha256_hex(&record.payload);
        let payload_ok = payload_hash == record.content_hash;

        let path = Path::new(&record.file_path);
        let file_ok = match fs::read(path) {
            Ok(bytes) => sha256_hex(&bytes) == record.content_hash,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::error!(record = %record.id, path = %path.display(), "archive file missing");
                false
            }
            Err(e) => return Err(ComplianceError::io(path, e)),
        };

        let signature_ok = match record.signature_id.as_deref() {
            Some(signature_id) => {
                let signature = self.signatures.get(signature_id).await?;
                signature.document_type == record.document_type
                    && signature.document_id == record.document_id
                    && self.signatures.verify_hash(&signature, &payload_hash)
            }
            None => false,
        };

        let check = IntegrityCheck {
            record_id: record.id.clone(),
            payload_ok,
            file_ok,
            signature_ok,
        };
        if !check.is_valid() {
            tracing::error!(
                record = %record.id,
                payload_ok,
                file_ok,
                signature_ok,
                "archive integrity check failed"
            );
        }
        Ok(check)
    }

    /// Check every record; returns the ones that failed.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError` if a record cannot be read.
    pub async fn verify_all(&self) -> Result<Vec<IntegrityCheck>, ComplianceError> {
        let mut failed = Vec::new();
        for record in self.db.list_archive_records().await? {
            let check = self.check(&record).await?;
            if !check.is_valid() {
                failed.push(check);
            }
        }
        Ok(failed)
    }

    /// # Errors
    ///
    /// Returns `ComplianceError::Database` (`NotFound`) for an unknown record.
    pub async fn get(&self, record_id: &str) -> Result<ArchivedRecord, ComplianceError> {
        Ok(self.db.get_archive_record(record_id).await?)
    }

    /// Archived versions of one document, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the query fails.
    pub async fn list_for_document(
        &self,
        document_type: &str,
        document_id: &str,
    ) -> Result<Vec<ArchivedRecord>, ComplianceError> {
        Ok(self
            .db
            .archive_records_for_document(document_type, document_id)
            .await?)
    }
}

fn validate_document_type(document_type: &str) -> Result<(), ComplianceError> {
    let valid = !document_type.is_empty()
        && document_type
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ComplianceError::Validation(format!(
            "invalid document type {document_type:?}: use lowercase letters, digits, '_' or '-'"
        )))
    }
}

fn write_immutable(path: &Path, bytes: &[u8]) -> Result<(), ComplianceError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ComplianceError::io(parent, e))?;
    }
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| ComplianceError::io(path, e))?;
    let written = file
        .write_all(bytes)
        .and_then(|()| file.sync_all())
        .map_err(|e| ComplianceError::io(path, e));
    if let Err(e) = written {
        remove_orphan(path);
        return Err(e);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o444)) {
            tracing::warn!("failed to chmod 0444 {}: {e}", path.display());
        }
    }
    Ok(())
}

fn remove_orphan(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::error!(path = %path.display(), error = %e, "failed to remove orphaned archive file");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::test_support::helpers::compliance;

    fn invoice() -> serde_json::Value {
        json!({"invoice_id": "inv-1", "customer": "ACME", "total": "100.00"})
    }

    #[tokio::test]
    async fn archive_then_verify() {
        let dir = TempDir::new().unwrap();
        let c = compliance(&dir).await;
        let record = c
            .archive
            .archive("invoice", "inv-1", &invoice(), Actor::user("usr-1", "alice"))
            .await
            .unwrap();

        assert!(record.immutable);
        assert_eq!(record.archived_by.as_deref(), Some("usr-1"));
        assert!(record.signature_id.is_some());
        assert!(Path::new(&record.file_path).starts_with(dir.path()));
        assert_eq!(fs::read_to_string(&record.file_path).unwrap(), record.payload);

        let check = c.archive.verify_integrity(&record.id).await.unwrap();
        assert!(check.is_valid(), "{check:?}");
        assert!(c.archive.verify_all().await.unwrap().is_empty());

        let events = c.audit.events_for("invoice", "inv-1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Archive);
        assert_eq!(events[0].new_values.as_ref().unwrap()["record_id"], json!(record.id));
    }

    #[tokio::test]
    async fn tampered_file_fails_verification() {
        let dir = TempDir::new().unwrap();
        let c = compliance(&dir).await;
        let record = c
            .archive
            .archive("invoice", "inv-1", &invoice(), Actor::system())
            .await
            .unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&record.file_path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o444);
            fs::set_permissions(&record.file_path, fs::Permissions::from_mode(0o644)).unwrap();
        }
        fs::write(&record.file_path, r#"{"total":"1.00"}"#).unwrap();

        let check = c.archive.verify_integrity(&record.id).await.unwrap();
        assert!(check.payload_ok);
        assert!(!check.file_ok);
        assert!(check.signature_ok);
        assert!(!check.is_valid());

        let failed = c.archive.verify_all().await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].record_id, record.id);
    }

    #[tokio::test]
    async fn missing_file_fails_verification() {
        let dir = TempDir::new().unwrap();
        let c = compliance(&dir).await;
        let record = c
            .archive
            .archive("invoice", "inv-1", &invoice(), Actor::system())
            .await
            .unwrap();
        fs::remove_file(&record.file_path).unwrap();
        assert!(!c.archive.verify_integrity(&record.id).await.unwrap().file_ok);
    }

    #[tokio::test]
    async fn tampered_payload_row_fails_verification() {
        let dir = TempDir::new().unwrap();
        let c = compliance(&dir).await;
        let record = c
            .archive
            .archive("invoice", "inv-1", &invoice(), Actor::system())
            .await
            .unwrap();

        c.db.conn()
            .execute("DROP TRIGGER IF EXISTS archive_records_immutable", ())
            .await
            .unwrap();
        c.db.conn()
            .execute(
                "UPDATE archive_records SET payload = '{}' WHERE id = ?1",
                [record.id.as_str()],
            )
            .await
            .unwrap();

        let check = c.archive.verify_integrity(&record.id).await.unwrap();
        assert!(!check.payload_ok);
        assert!(check.file_ok);
        assert!(!check.signature_ok);
    }

    #[tokio::test]
    async fn failed_insert_removes_the_file() {
        let dir = TempDir::new().unwrap();
        let c = compliance(&dir).await;
        c.db.conn().execute("DROP TABLE archive_records", ()).await.unwrap();

        let result = c
            .archive
            .archive("invoice", "inv-1", &invoice(), Actor::system())
            .await;
        assert!(matches!(result, Err(ComplianceError::Database(_))));

        let invoice_dir = c.archive.archive_dir().join("invoice");
        let leftovers = fs::read_dir(&invoice_dir).map_or(0, Iterator::count);
        assert_eq!(leftovers, 0, "orphaned archive file left behind");
        assert!(c.audit.events_for("invoice", "inv-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn versions_are_listed_in_order() {
        let dir = TempDir::new().unwrap();
        let c = compliance(&dir).await;
        let first = c
            .archive
            .archive("invoice", "inv-1", &invoice(), Actor::system())
            .await
            .unwrap();
        let second = c
            .archive
            .archive("invoice", "inv-1", &json!({"total": "90.00"}), Actor::system())
            .await
            .unwrap();

        let versions = c.archive.list_for_document("invoice", "inv-1").await.unwrap();
        let ids: Vec<_> = versions.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
        assert_eq!(c.archive.get(&second.id).await.unwrap(), second);
    }

    #[rstest]
    #[case::traversal("../etc")]
    #[case::separator("invoice/2024")]
    #[case::empty("")]
    #[case::upper("Invoice")]
    #[tokio::test]
    async fn rejects_unsafe_document_types(#[case] document_type: &str) {
        let dir = TempDir::new().unwrap();
        let c = compliance(&dir).await;
        let result = c
            .archive
            .archive(document_type, "inv-1", &invoice(), Actor::system())
            .await;
        assert!(matches!(result, Err(ComplianceError::Validation(_))));
    }
}
