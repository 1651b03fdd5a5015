use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of a business document kept for legal retention.
///
/// `content_hash` must match both `payload` and the file at `file_path`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchivedRecord {
    pub id: String,
    pub document_type: String,
    pub document_id: String,
    /// Canonical JSON of the archived document.
    pub payload: String,
    pub content_hash: String,
    pub archived_at: DateTime<Utc>,
    pub archived_by: Option<String>,
    /// `None` only for records imported before retention tracking existed.
    pub retention_date: Option<DateTime<Utc>>,
    pub signature_id: Option<String>,
    pub immutable: bool,
    pub file_path: String,
}
