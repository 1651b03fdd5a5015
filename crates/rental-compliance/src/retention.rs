//! Retention Manager.
//!
//! Maps document types to retention periods. Every lookup fails toward
//! keeping data: an unknown document type is retained for the configured
//! default period and is never auto-deleted.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use serde::Serialize;

use rental_config::ComplianceConfig;
use rental_core::audit_detail::CleanupDetail;
use rental_core::entities::{Actor, RetentionPolicy};
use rental_core::enums::{EventType, Severity};
use rental_core::ids::PREFIX_POLICY;
use rental_db::RentalDb;
use rental_db::error::DatabaseError;

use crate::archive::GoBdArchive;
use crate::audit::{AuditLogger, AuditRecord};
use crate::error::ComplianceError;

/// Document types that must always have an active policy.
pub const REQUIRED_DOCUMENT_TYPES: &[&str] = &["invoice", "receipt", "contract", "customer_data"];

/// Policies seeded on first start: `(document_type, years, legal_basis, auto_delete)`.
pub const DEFAULT_POLICIES: &[(&str, u32, &str, bool)] = &[
    ("invoice", 10, "§147 AO, §257 HGB", false),
    ("receipt", 10, "§147 AO, §257 HGB", false),
    ("contract", 10, "§147 AO, §257 HGB", false),
    ("customer_data", 6, "Art. 17 GDPR, §257 HGB", true),
];

/// A record left in place by cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub document_type: String,
    pub document_id: String,
    pub reason: String,
}

/// Outcome of a cleanup run. In a dry run the lists name what would be
/// deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub dry_run: bool,
    pub deleted_archives: Vec<String>,
    pub deleted_events: usize,
    pub skipped: Vec<SkippedRecord>,
    /// Expired, deletable events kept because an older event must stay.
    pub deferred_events: usize,
    /// Expired, deletable records whose deletion failed. They are retried on
    /// the next run.
    pub failed: Vec<SkippedRecord>,
    /// Files of deleted records that could not be removed from disk.
    pub orphaned_files: Vec<String>,
}

/// A compliance problem found by [`RetentionManager::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceIssue {
    pub severity: Severity,
    pub document_type: String,
    pub document_id: Option<String>,
    pub message: String,
}

pub struct RetentionManager {
    db: Arc<RentalDb>,
    default_years: u32,
    grace_months: u32,
}

impl RetentionManager {
    #[must_use]
    pub fn new(db: Arc<RentalDb>, config: &ComplianceConfig) -> Self {
        Self {
            db,
            default_years: config.default_retention_years,
            grace_months: config.grace_period_months,
        }
    }

    /// Insert the default policies for document types without an active
    /// policy. Returns the number inserted.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if a lookup or insert fails.
    pub async fn seed_defaults(&self, now: DateTime<Utc>) -> Result<usize, ComplianceError> {
        let mut inserted = 0;
        for &(document_type, years, legal_basis, auto_delete) in DEFAULT_POLICIES {
            if self.db.active_retention_policy(document_type).await?.is_some() {
                continue;
            }
            let policy = RetentionPolicy {
                id: self.db.generate_id(PREFIX_POLICY).await?,
                document_type: document_type.to_string(),
                retention_years: years,
                legal_basis: legal_basis.to_string(),
                auto_delete,
                active: true,
                created_at: now,
                updated_at: now,
            };
            match self.db.insert_retention_policy(&policy).await {
                Ok(()) => inserted += 1,
                // Seeded concurrently by another caller.
                Err(DatabaseError::Constraint(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        if inserted > 0 {
            tracing::info!(inserted, "seeded default retention policies");
        }
        Ok(inserted)
    }

    /// `now + policy years` for the document type.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the policy lookup fails.
    pub async fn retention_date_for(
        &self,
        document_type: &str,
    ) -> Result<DateTime<Utc>, ComplianceError> {
        self.retention_date_for_at(document_type, Utc::now()).await
    }

    /// [`Self::retention_date_for`] relative to an explicit `now`.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the policy lookup fails.
    pub async fn retention_date_for_at(
        &self,
        document_type: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ComplianceError> {
        let years = match self.db.active_retention_policy(document_type).await? {
            Some(policy) => policy.retention_years,
            None => {
                tracing::debug!(document_type, years = self.default_years, "no retention policy, using default");
                self.default_years
            }
        };
        Ok(add_years(now, years))
    }

    /// Whether expired documents of this type may be deleted automatically.
    /// Denied when no active policy exists.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the policy lookup fails.
    pub async fn can_auto_delete(&self, document_type: &str) -> Result<bool, ComplianceError> {
        Ok(self
            .db
            .active_retention_policy(document_type)
            .await?
            .is_some_and(|p| p.auto_delete))
    }

    /// Replace the active policy for a document type.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Validation` for an empty document type, zero
    /// years or an empty legal basis, `ComplianceError::Database` otherwise.
    pub async fn set_policy(
        &self,
        document_type: &str,
        retention_years: u32,
        legal_basis: &str,
        auto_delete: bool,
    ) -> Result<RetentionPolicy, ComplianceError> {
        if document_type.trim().is_empty() {
            return Err(ComplianceError::Validation(
                "document type must not be empty".into(),
            ));
        }
        if retention_years == 0 {
            return Err(ComplianceError::Validation(format!(
                "retention period for {document_type} must be at least one year"
            )));
        }
        if legal_basis.trim().is_empty() {
            return Err(ComplianceError::Validation(format!(
                "legal basis for {document_type} must not be empty"
            )));
        }

        let now = Utc::now();
        let policy = RetentionPolicy {
            id: self.db.generate_id(PREFIX_POLICY).await?,
            document_type: document_type.to_string(),
            retention_years,
            legal_basis: legal_basis.to_string(),
            auto_delete,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.db.replace_active_policy(&policy).await?;
        tracing::info!(document_type, retention_years, auto_delete, "retention policy set");
        Ok(policy)
    }

    /// Returns whether an active policy existed.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the update fails.
    pub async fn deactivate_policy(&self, document_type: &str) -> Result<bool, ComplianceError> {
        Ok(self
            .db
            .deactivate_retention_policy(document_type, Utc::now())
            .await?)
    }

    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the query fails.
    pub async fn active_policy(
        &self,
        document_type: &str,
    ) -> Result<Option<RetentionPolicy>, ComplianceError> {
        Ok(self.db.active_retention_policy(document_type).await?)
    }

    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the query fails.
    pub async fn list_policies(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<RetentionPolicy>, ComplianceError> {
        Ok(self.db.list_retention_policies(include_inactive).await?)
    }

    /// Delete expired archive records and audit events whose document type
    /// permits it.
    ///
    /// The audit chain and every archive record are verified first; any
    /// failure aborts the run before anything is deleted. Records whose policy
    /// denies deletion are skipped and logged, never force-deleted. A record
    /// that cannot be deleted is reported in `failed` and the run continues.
    /// The RETENTION_CLEANUP event is recorded for whatever was deleted, even
    /// when pruning the audit chain fails afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::IntegrityBreach` if the audit chain is broken
    /// or an archive record fails its integrity check, and
    /// `ComplianceError::Database` if a lookup or the audit prune fails.
    pub async fn cleanup(
        &self,
        audit: &AuditLogger,
        archive: &GoBdArchive,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<CleanupReport, ComplianceError> {
        let chain = audit.verify_chain_integrity().await?;
        if !chain.valid {
            let at = chain
                .break_at
                .map_or_else(|| "unknown".to_string(), |b| format!("seq {} ({})", b.seq, b.event_id));
            tracing::error!(%at, "audit chain broken, retention cleanup halted");
            return Err(ComplianceError::IntegrityBreach(format!(
                "audit chain broken at {at}; cleanup halted"
            )));
        }

        let failed_checks = archive.verify_all().await?;
        if !failed_checks.is_empty() {
            let ids: Vec<&str> = failed_checks.iter().map(|c| c.record_id.as_str()).collect();
            tracing::error!(records = ?ids, "archive integrity check failed, retention cleanup halted");
            return Err(ComplianceError::IntegrityBreach(format!(
                "archive records failed integrity check: {}; cleanup halted",
                ids.join(", ")
            )));
        }

        let mut report = CleanupReport {
            dry_run,
            ..CleanupReport::default()
        };

        for record in self.db.expired_archive_records(now).await? {
            if !self.can_auto_delete(&record.document_type).await? {
                tracing::warn!(
                    record = %record.id,
                    document_type = %record.document_type,
                    "expired archive record kept: policy does not permit auto-delete"
                );
                report.skipped.push(SkippedRecord {
                    document_type: record.document_type.clone(),
                    document_id: record.document_id.clone(),
                    reason: "auto-delete not permitted".into(),
                });
                continue;
            }
            if dry_run {
                report.deleted_archives.push(record.id);
                continue;
            }

            // Row first: a leftover file is harmless, a row without its file
            // fails every later integrity check.
            if let Err(e) = self.db.delete_archive_record(&record.id).await {
                tracing::error!(record = %record.id, error = %e, "failed to delete expired archive record");
                report.failed.push(SkippedRecord {
                    document_type: record.document_type,
                    document_id: record.document_id,
                    reason: format!("delete failed: {e}"),
                });
                continue;
            }
            if let Err(e) = remove_archive_file(Path::new(&record.file_path)) {
                tracing::error!(record = %record.id, error = %e, "archive record deleted but file left behind");
                report.orphaned_files.push(record.file_path.clone());
            }
            tracing::info!(record = %record.id, "expired archive record deleted");
            report.deleted_archives.push(record.id);
        }

        let pruned = match audit.prune_expired(now, dry_run).await {
            Ok(pruned) => pruned,
            Err(e) => {
                tracing::error!(error = %e, "audit prune failed after archive cleanup");
                if !dry_run {
                    record_cleanup(audit, &report).await?;
                }
                return Err(e);
            }
        };
        report.deleted_events = pruned.deleted;
        report.deferred_events = pruned.deferred;
        report.skipped.extend(pruned.skipped);

        if !dry_run {
            record_cleanup(audit, &report).await?;
        }

        tracing::info!(
            dry_run,
            archives = report.deleted_archives.len(),
            events = report.deleted_events,
            skipped = report.skipped.len(),
            deferred = report.deferred_events,
            failed = report.failed.len(),
            orphaned = report.orphaned_files.len(),
            "retention cleanup finished"
        );
        Ok(report)
    }

    /// Report compliance problems without changing anything. Issues are
    /// ordered by severity, most severe first.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if a query fails.
    pub async fn validate(&self, now: DateTime<Utc>) -> Result<Vec<ComplianceIssue>, ComplianceError> {
        let mut issues = Vec::new();

        for &document_type in REQUIRED_DOCUMENT_TYPES {
            if self.db.active_retention_policy(document_type).await?.is_none() {
                issues.push(ComplianceIssue {
                    severity: Severity::Critical,
                    document_type: document_type.to_string(),
                    document_id: None,
                    message: format!("no active retention policy for required type {document_type}"),
                });
            }
        }

        for record in self.db.archive_records_missing_retention().await? {
            issues.push(ComplianceIssue {
                severity: Severity::High,
                document_type: record.document_type,
                document_id: Some(record.document_id),
                message: format!("archive record {} has no retention date", record.id),
            });
        }

        let grace_cutoff = now
            .checked_sub_months(Months::new(self.grace_months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        for record in self.db.expired_archive_records(grace_cutoff).await? {
            let expired = record
                .retention_date
                .map_or_else(String::new, |d| d.date_naive().to_string());
            issues.push(ComplianceIssue {
                severity: Severity::Medium,
                document_type: record.document_type,
                document_id: Some(record.document_id),
                message: format!(
                    "archive record {} expired on {expired}, more than {} months ago",
                    record.id, self.grace_months
                ),
            });
        }

        for document_type in self.db.archived_document_types().await? {
            let already_flagged = REQUIRED_DOCUMENT_TYPES.contains(&document_type.as_str())
                && issues.iter().any(|i| {
                    i.severity == Severity::Critical && i.document_type == document_type
                });
            if already_flagged {
                continue;
            }
            if self.db.active_retention_policy(&document_type).await?.is_none() {
                issues.push(ComplianceIssue {
                    severity: Severity::High,
                    message: format!("archived type {document_type} has no active retention policy"),
                    document_type,
                    document_id: None,
                });
            }
        }

        issues.sort_by(|a, b| b.severity.cmp(&a.severity));
        for issue in &issues {
            tracing::warn!(severity = %issue.severity, document_type = %issue.document_type, "{}", issue.message);
        }
        Ok(issues)
    }
}

fn add_years(now: DateTime<Utc>, years: u32) -> DateTime<Utc> {
    now.checked_add_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

async fn record_cleanup(audit: &AuditLogger, report: &CleanupReport) -> Result<(), ComplianceError> {
    let detail = CleanupDetail {
        deleted_archives: report.deleted_archives.len(),
        deleted_events: report.deleted_events,
        skipped: report.skipped.len(),
        deferred_events: report.deferred_events,
        failed: report.failed.len(),
        orphaned_files: report.orphaned_files.len(),
    };
    audit
        .record(
            AuditRecord::new(
                EventType::RetentionCleanup,
                "retention",
                "cleanup",
                "retention cleanup",
                Actor::system(),
            )
            .new_value(&detail)?,
        )
        .await?;
    Ok(())
}

fn remove_archive_file(path: &Path) -> Result<(), ComplianceError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "archive file already gone");
            Ok(())
        }
        Err(e) => Err(ComplianceError::io(path, e)),
    }
}
