//! Audit hash chain: digest computation and verification.
//!
//! Each event's hash covers its own identifying fields plus the previous
//! event's hash, so any edit, deletion, or reordering inside the chain
//! changes every hash after it. The chain is ordered by insertion (`seq`),
//! never by timestamp.
//!
//! The first event links to the *anchor*: the empty string for a chain that
//! has never been pruned, or the hash of the last event removed by retention
//! cleanup.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::digest::{canonical_json, sha256_hex};
use crate::entities::AuditEvent;
use crate::enums::EventType;

/// Anchor of a chain that has never been pruned.
pub const GENESIS_ANCHOR: &str = "";

/// The fields an audit hash is computed over.
#[derive(Debug, Clone, Copy)]
pub struct HashInput<'a> {
    pub event_type: EventType,
    pub object_type: &'a str,
    pub object_id: &'a str,
    pub actor_id: Option<&'a str>,
    pub action: &'a str,
    pub previous_hash: &'a str,
    pub timestamp: DateTime<Utc>,
    pub old_values: Option<&'a serde_json::Value>,
    pub new_values: Option<&'a serde_json::Value>,
}

/// Render a timestamp with nanosecond precision, as covered by the hash and
/// as stored in the database.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn snapshot(value: Option<&serde_json::Value>) -> String {
    // Values already came out of serde_json, so canonicalization cannot fail.
    value
        .and_then(|v| canonical_json(v).ok())
        .unwrap_or_default()
}

/// Compute the SHA-256 hash of an audit event.
#[must_use]
pub fn compute_hash(input: &HashInput<'_>) -> String {
    let material = [
        input.event_type.as_str().to_string(),
        input.object_type.to_string(),
        input.object_id.to_string(),
        input.actor_id.unwrap_or_default().to_string(),
        input.action.to_string(),
        input.previous_hash.to_string(),
        format_timestamp(input.timestamp),
        snapshot(input.old_values),
        snapshot(input.new_values),
    ]
    .join("|");
    sha256_hex(material)
}

/// Why verification stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BreakReason {
    /// The stored hash does not match the recomputed one: the event was edited.
    HashMismatch { stored: String, computed: String },
    /// The previous-hash link does not match the predecessor: an event was
    /// removed, inserted, or reordered.
    LinkMismatch { expected: String, found: String },
}

/// First point at which the chain failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainBreak {
    pub seq: i64,
    pub event_id: String,
    pub reason: BreakReason,
}

/// Result of walking the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub valid: bool,
    /// Number of events checked, including the failing one.
    pub checked: usize,
    pub break_at: Option<ChainBreak>,
}

/// Incremental verifier, so callers can stream events from storage without
/// holding the whole chain in memory.
#[derive(Debug)]
pub struct ChainVerifier {
    expected_previous: String,
    checked: usize,
    break_at: Option<ChainBreak>,
}

impl ChainVerifier {
    #[must_use]
    pub fn new(anchor: &str) -> Self {
        Self {
            expected_previous: anchor.to_string(),
            checked: 0,
            break_at: None,
        }
    }

    /// Check the next event in insertion order.
    ///
    /// Returns `false` once a break has been found; further events are ignored.
    pub fn push(&mut self, event: &AuditEvent) -> bool {
        if self.break_at.is_some() {
            return false;
        }
        self.checked += 1;

        if event.previous_hash != self.expected_previous {
            self.break_at = Some(ChainBreak {
                seq: event.seq,
                event_id: event.id.clone(),
                reason: BreakReason::LinkMismatch {
                    expected: self.expected_previous.clone(),
                    found: event.previous_hash.clone(),
                },
            });
            return false;
        }

        let computed = compute_hash(&event.hash_input());
        if computed != event.hash {
            self.break_at = Some(ChainBreak {
                seq: event.seq,
                event_id: event.id.clone(),
                reason: BreakReason::HashMismatch {
                    stored: event.hash.clone(),
                    computed,
                },
            });
            return false;
        }

        self.expected_previous.clone_from(&event.hash);
        true
    }

    #[must_use]
    pub fn finish(self) -> ChainReport {
        ChainReport {
            valid: self.break_at.is_none(),
            checked: self.checked,
            break_at: self.break_at,
        }
    }
}

/// Verify a complete chain given in insertion order.
#[must_use]
pub fn verify_chain(events: &[AuditEvent], anchor: &str) -> ChainReport {
    let mut verifier = ChainVerifier::new(anchor);
    for event in events {
        if !verifier.push(event) {
            break;
        }
    }
    verifier.finish()
}
