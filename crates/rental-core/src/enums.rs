//! Status enums, event types, and classification enums for RentalCore.
//!
//! Storage enums use `snake_case` serialization, except `EventType` which keeps
//! the upper-case names used in compliance exports. Status enums with state
//! machines provide `allowed_next_states()` to enforce valid transitions at the
//! application layer.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// EventType
// ---------------------------------------------------------------------------

/// Kind of action recorded in the audit chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Create,
    Read,
    Update,
    Delete,
    Archive,
    Sign,
    Login,
    Logout,
    Export,
    Consent,
    RetentionCleanup,
    Assign,
    Unassign,
}

impl EventType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Archive => "ARCHIVE",
            Self::Sign => "SIGN",
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::Export => "EXPORT",
            Self::Consent => "CONSENT",
            Self::RetentionCleanup => "RETENTION_CLEANUP",
            Self::Assign => "ASSIGN",
            Self::Unassign => "UNASSIGN",
        }
    }

    /// Whether events of this type are flagged as compliance-relevant.
    #[must_use]
    pub const fn is_compliance_relevant(self) -> bool {
        matches!(
            self,
            Self::Archive | Self::Sign | Self::Export | Self::Consent | Self::Delete
        )
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DeviceStatus
// ---------------------------------------------------------------------------

/// Physical state of a rentable device.
///
/// ```text
/// free ⇄ checked_out
/// free ⇄ maintenance
/// free | maintenance → retired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Free,
    CheckedOut,
    Maintenance,
    Retired,
}

impl DeviceStatus {
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Free => &[Self::CheckedOut, Self::Maintenance, Self::Retired],
            Self::CheckedOut => &[Self::Free],
            Self::Maintenance => &[Self::Free, Self::Retired],
            Self::Retired => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::CheckedOut => "checked_out",
            Self::Maintenance => "maintenance",
            Self::Retired => "retired",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Status of a rental job.
///
/// ```text
/// open → in_progress → completed
/// open | in_progress → cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Open => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Cancelled],
            Self::Completed => &[],
            Self::Cancelled => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Jobs in these states hold their devices exclusively for their date range.
    #[must_use]
    pub const fn blocks_devices(self) -> bool {
        matches!(self, Self::Open | Self::InProgress)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DiscountType
// ---------------------------------------------------------------------------

/// How a job's discount value is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `discount` is a percentage of revenue (0-100).
    #[default]
    Percent,
    /// `discount` is a fixed amount subtracted from revenue.
    Amount,
}

impl DiscountType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Amount => "amount",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AssignmentState
// ---------------------------------------------------------------------------

/// State of one (device, job) pair.
///
/// ```text
/// unassigned → assigned → returned
///                       → unassigned
/// ```
///
/// `Unassigned` is never stored: it is the absence of a join row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentState {
    Unassigned,
    Assigned,
    Returned,
}

impl AssignmentState {
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Unassigned => &[Self::Assigned],
            Self::Assigned => &[Self::Returned, Self::Unassigned],
            Self::Returned => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::Assigned => "assigned",
            Self::Returned => "returned",
        }
    }
}

impl fmt::Display for AssignmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity of a compliance issue found by retention validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConsentType
// ---------------------------------------------------------------------------

/// Purpose a customer consents to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    DataProcessing,
    Marketing,
    Newsletter,
    ThirdPartySharing,
}

impl ConsentType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DataProcessing => "data_processing",
            Self::Marketing => "marketing",
            Self::Newsletter => "newsletter",
            Self::ThirdPartySharing => "third_party_sharing",
        }
    }
}

impl fmt::Display for ConsentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RequestType
// ---------------------------------------------------------------------------

/// Kind of GDPR data subject request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Access,
    Erasure,
    Rectification,
    Portability,
}

impl RequestType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Erasure => "erasure",
            Self::Rectification => "rectification",
            Self::Portability => "portability",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RequestStatus
// ---------------------------------------------------------------------------

/// Status of a data subject request.
///
/// ```text
/// pending → in_progress → completed
/// pending | in_progress → rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl RequestStatus {
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::InProgress, Self::Rejected],
            Self::InProgress => &[Self::Completed, Self::Rejected],
            Self::Completed => &[],
            Self::Rejected => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_serializes_upper_case() {
        let json = serde_json::to_string(&EventType::RetentionCleanup).unwrap();
        assert_eq!(json, "\"RETENTION_CLEANUP\"");
        let back: EventType = serde_json::from_str("\"ARCHIVE\"").unwrap();
        assert_eq!(back, EventType::Archive);
    }

    #[test]
    fn as_str_matches_serde() {
        for status in [
            JobStatus::Open,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Cancelled,
        ] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json.as_str(), Some(status.as_str()));
        }
        for status in [
            DeviceStatus::Free,
            DeviceStatus::CheckedOut,
            DeviceStatus::Maintenance,
            DeviceStatus::Retired,
        ] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json.as_str(), Some(status.as_str()));
        }
    }

    #[test]
    fn job_transitions() {
        assert!(JobStatus::Open.can_transition_to(JobStatus::InProgress));
        assert!(JobStatus::Open.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Open.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::InProgress.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Completed.allowed_next_states().is_empty());
    }

    #[test]
    fn only_open_and_in_progress_block_devices() {
        assert!(JobStatus::Open.blocks_devices());
        assert!(JobStatus::InProgress.blocks_devices());
        assert!(!JobStatus::Completed.blocks_devices());
        assert!(!JobStatus::Cancelled.blocks_devices());
    }

    #[test]
    fn assignment_state_machine() {
        assert!(AssignmentState::Unassigned.can_transition_to(AssignmentState::Assigned));
        assert!(AssignmentState::Assigned.can_transition_to(AssignmentState::Returned));
        assert!(AssignmentState::Assigned.can_transition_to(AssignmentState::Unassigned));
        assert!(!AssignmentState::Returned.can_transition_to(AssignmentState::Assigned));
    }

    #[test]
    fn retired_device_is_terminal() {
        assert!(DeviceStatus::Retired.allowed_next_states().is_empty());
        assert!(!DeviceStatus::CheckedOut.can_transition_to(DeviceStatus::Maintenance));
    }

    #[test]
    fn severity_orders_by_urgency() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn compliance_relevant_event_types() {
        assert!(EventType::Archive.is_compliance_relevant());
        assert!(EventType::Delete.is_compliance_relevant());
        assert!(!EventType::Read.is_compliance_relevant());
        assert!(!EventType::Assign.is_compliance_relevant());
    }

    #[test]
    fn request_status_terminal() {
        assert!(RequestStatus::Completed.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Pending.can_transition_to(RequestStatus::Rejected));
        assert!(!RequestStatus::Pending.can_transition_to(RequestStatus::Completed));
    }
}
