use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How long documents of one type must be kept, and whether they may be
/// deleted automatically afterwards. At most one policy per document type is
/// active at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub id: String,
    pub document_type: String,
    pub retention_years: u32,
    pub legal_basis: String,
    pub auto_delete: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
