//! Typed audit payloads.
//!
//! Audit events store their old/new snapshots and context as generic JSON.
//! Call sites build one of these structs and only convert to
//! `serde_json::Value` at the persistence boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Snapshot for `EventType::Assign` and `EventType::Unassign`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentDetail {
    pub job_id: String,
    pub device_id: String,
    pub custom_price: Option<Decimal>,
}

/// Snapshot for status transitions of jobs, devices, and GDPR requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChangedDetail {
    pub from: String,
    pub to: String,
    pub reason: Option<String>,
}

/// Snapshot of a job's derived revenue fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevenueDetail {
    pub revenue: Decimal,
    pub final_revenue: Decimal,
}

/// New-value snapshot for `EventType::Archive`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveDetail {
    pub record_id: String,
    pub document_type: String,
    pub document_id: String,
    pub content_hash: String,
    pub signature_id: Option<String>,
}

/// New-value snapshot for `EventType::RetentionCleanup`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanupDetail {
    pub deleted_archives: usize,
    pub deleted_events: usize,
    pub skipped: usize,
    pub deferred_events: usize,
    pub failed: usize,
    pub orphaned_files: usize,
}

/// Snapshot for `EventType::Consent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsentDetail {
    pub customer_id: String,
    pub consent_type: String,
    pub granted: bool,
}

/// New-value snapshot for `EventType::Export`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportDetail {
    pub path: String,
    pub events: usize,
}

/// Context for events derived from HTTP requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestDetail {
    pub method: String,
    pub path: String,
    pub status: u16,
}
