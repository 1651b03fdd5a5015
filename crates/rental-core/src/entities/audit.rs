use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::HashInput;
use crate::enums::EventType;

/// Who performed a tracked action.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Option<String>,
    pub username: Option<String>,
}

impl Actor {
    #[must_use]
    pub fn user(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            username: Some(username.into()),
        }
    }

    /// Actor used for automated jobs (retention cleanup, startup seeding).
    #[must_use]
    pub fn system() -> Self {
        Self {
            user_id: None,
            username: Some("system".to_string()),
        }
    }
}

/// Request metadata captured alongside an audit event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<String>,
}

/// One immutable, hash-chained record of a tracked action.
///
/// `seq` is the insertion order and the only order the chain is verified in;
/// `timestamp` is informational and may be skewed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
    pub id: String,
    pub seq: i64,
    pub event_type: EventType,
    pub object_type: String,
    pub object_id: String,
    pub actor: Actor,
    pub action: String,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub request: RequestContext,
    pub context: BTreeMap<String, serde_json::Value>,
    pub hash: String,
    pub previous_hash: String,
    pub compliance_flag: bool,
    pub retention_date: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// The fields covered by `hash`.
    #[must_use]
    pub fn hash_input(&self) -> HashInput<'_> {
        HashInput {
            event_type: self.event_type,
            object_type: &self.object_type,
            object_id: &self.object_id,
            actor_id: self.actor.user_id.as_deref(),
            action: &self.action,
            previous_hash: &self.previous_hash,
            timestamp: self.timestamp,
            old_values: self.old_values.as_ref(),
            new_values: self.new_values.as_ref(),
        }
    }
}
