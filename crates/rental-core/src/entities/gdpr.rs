use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{ConsentType, RequestStatus, RequestType};

/// A customer's consent decision for one purpose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsentRecord {
    pub id: String,
    pub customer_id: String,
    pub consent_type: ConsentType,
    pub granted: bool,
    pub legal_basis: String,
    pub granted_at: DateTime<Utc>,
    pub withdrawn_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
}

impl ConsentRecord {
    #[must_use]
    pub const fn is_effective(&self) -> bool {
        self.granted && self.withdrawn_at.is_none()
    }
}

/// A GDPR data subject request (access, erasure, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataSubjectRequest {
    pub id: String,
    pub customer_id: String,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
