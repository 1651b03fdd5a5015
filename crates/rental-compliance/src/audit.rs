//! Audit Logger: the append-only, hash-chained event log.
//!
//! The logger owns the chain tail (hash of the last persisted event). Every
//! operation that reads or moves the tail runs under one async mutex: append,
//! verification, pruning and export all see a consistent chain.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use rental_core::audit_detail::ExportDetail;
use rental_core::chain::{ChainReport, ChainVerifier, compute_hash};
use rental_core::entities::{Actor, AuditEvent, RequestContext};
use rental_core::enums::EventType;
use rental_core::ids::PREFIX_AUDIT;
use rental_db::{AuditFilter, RentalDb};

use crate::error::ComplianceError;
use crate::retention::{RetentionManager, SkippedRecord};

const PAGE_SIZE: u32 = 500;

/// One action to be recorded. Built at the call site with typed payloads and
/// converted to JSON only here.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub event_type: EventType,
    pub object_type: String,
    pub object_id: String,
    pub action: String,
    pub actor: Actor,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub request: RequestContext,
    pub context: BTreeMap<String, serde_json::Value>,
}

impl AuditRecord {
    pub fn new(
        event_type: EventType,
        object_type: impl Into<String>,
        object_id: impl Into<String>,
        action: impl Into<String>,
        actor: Actor,
    ) -> Self {
        Self {
            event_type,
            object_type: object_type.into(),
            object_id: object_id.into(),
            action: action.into(),
            actor,
            old_values: None,
            new_values: None,
            request: RequestContext::default(),
            context: BTreeMap::new(),
        }
    }

    /// # Errors
    ///
    /// Returns `ComplianceError::Serialization` if the value is not JSON-representable.
    pub fn old_value<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, ComplianceError> {
        self.old_values = Some(serde_json::to_value(value)?);
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `ComplianceError::Serialization` if the value is not JSON-representable.
    pub fn new_value<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, ComplianceError> {
        self.new_values = Some(serde_json::to_value(value)?);
        Ok(self)
    }

    #[must_use]
    pub fn snapshots(
        mut self,
        old: Option<serde_json::Value>,
        new: Option<serde_json::Value>,
    ) -> Self {
        self.old_values = old;
        self.new_values = new;
        self
    }

    #[must_use]
    pub fn request(mut self, request: RequestContext) -> Self {
        self.request = request;
        self
    }

    /// # Errors
    ///
    /// Returns `ComplianceError::Serialization` if the value is not JSON-representable.
    pub fn context<T: Serialize + ?Sized>(
        mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Self, ComplianceError> {
        self.context.insert(key.into(), serde_json::to_value(value)?);
        Ok(self)
    }
}

/// What [`AuditLogger::prune_expired`] removed or kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    pub deleted: usize,
    pub deferred: usize,
    pub skipped: Vec<SkippedRecord>,
}

pub struct AuditLogger {
    db: Arc<RentalDb>,
    retention: Arc<RetentionManager>,
    tail: Mutex<String>,
}

impl AuditLogger {
    /// Rebuild the chain tail from storage: the last event's hash, or the
    /// chain anchor when no events remain.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the tail cannot be read.
    pub async fn new(
        db: Arc<RentalDb>,
        retention: Arc<RetentionManager>,
    ) -> Result<Self, ComplianceError> {
        let tail = match db.last_audit_event().await? {
            Some(event) => event.hash,
            None => db.chain_anchor().await?.anchor_hash,
        };
        tracing::debug!(tail = %tail, "audit chain tail loaded");
        Ok(Self {
            db,
            retention,
            tail: Mutex::new(tail),
        })
    }

    /// Hash of the last persisted event (or the anchor of an empty chain).
    pub async fn tail_hash(&self) -> String {
        self.tail.lock().await.clone()
    }

    /// Append an event to the chain.
    ///
    /// The event is persisted before this returns. If persisting fails the
    /// tail is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the retention lookup or the
    /// insert fails.
    pub async fn record(&self, record: AuditRecord) -> Result<AuditEvent, ComplianceError> {
        let retention_date = self
            .retention
            .retention_date_for(&record.object_type)
            .await?;
        let id = self.db.generate_id(PREFIX_AUDIT).await?;

        let mut tail = self.tail.lock().await;
        let mut event = AuditEvent {
            id,
            seq: 0,
            compliance_flag: record.event_type.is_compliance_relevant(),
            event_type: record.event_type,
            object_type: record.object_type,
            object_id: record.object_id,
            actor: record.actor,
            action: record.action,
            old_values: record.old_values,
            new_values: record.new_values,
            request: record.request,
            context: record.context,
            hash: String::new(),
            previous_hash: tail.clone(),
            retention_date,
            timestamp: Utc::now(),
        };
        event.hash = compute_hash(&event.hash_input());

        match self.db.insert_audit_event(&event).await {
            Ok(seq) => {
                event.seq = seq;
                tail.clone_from(&event.hash);
                tracing::debug!(
                    id = %event.id,
                    seq,
                    event_type = %event.event_type,
                    object = %format!("{}/{}", event.object_type, event.object_id),
                    "audit event recorded"
                );
                Ok(event)
            }
            Err(e) => {
                tracing::error!(id = %event.id, error = %e, "failed to persist audit event");
                Err(e.into())
            }
        }
    }

    /// Walk the whole chain in insertion order and stop at the first break.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if events cannot be read. A broken
    /// chain is reported in the returned `ChainReport`, not as an error.
    pub async fn verify_chain_integrity(&self) -> Result<ChainReport, ComplianceError> {
        let _tail = self.tail.lock().await;
        let anchor = self.db.chain_anchor().await?;
        let mut verifier = ChainVerifier::new(&anchor.anchor_hash);
        let mut after = 0;
        'pages: loop {
            let page = self.db.audit_events_after(after, PAGE_SIZE).await?;
            let Some(last) = page.last() else {
                break;
            };
            after = last.seq;
            for event in &page {
                if !verifier.push(event) {
                    break 'pages;
                }
            }
        }
        let report = verifier.finish();
        if let Some(ref brk) = report.break_at {
            tracing::error!(seq = brk.seq, event = %brk.event_id, "audit chain broken");
        }
        Ok(report)
    }

    /// Remove the longest oldest-first run of events that are past their
    /// retention date and whose object type permits auto-deletion, moving the
    /// chain anchor to the last removed hash.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if a read or the prune fails.
    pub async fn prune_expired(
        &self,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<PruneOutcome, ComplianceError> {
        let _tail = self.tail.lock().await;
        let mut outcome = PruneOutcome::default();
        let mut permits: HashMap<String, bool> = HashMap::new();
        let mut through: Option<(i64, String)> = None;
        let mut blocked = false;
        let mut after = 0;

        loop {
            let page = self.db.audit_events_after(after, PAGE_SIZE).await?;
            let Some(last) = page.last() else {
                break;
            };
            after = last.seq;
            for event in page {
                let expired = event.retention_date < now;
                let allowed = expired && self.permits(&mut permits, &event.object_type).await?;
                if !blocked {
                    if allowed {
                        outcome.deleted += 1;
                        through = Some((event.seq, event.hash));
                        continue;
                    }
                    blocked = true;
                }
                if allowed {
                    outcome.deferred += 1;
                } else if expired {
                    outcome.skipped.push(SkippedRecord {
                        document_type: event.object_type,
                        document_id: event.id,
                        reason: "auto-delete not permitted".into(),
                    });
                }
            }
        }

        if let Some((seq, hash)) = through {
            if !dry_run {
                let deleted = self.db.prune_audit_prefix(seq, &hash, now).await?;
                tracing::info!(through_seq = seq, deleted, "expired audit events pruned");
            }
        }
        if outcome.deferred > 0 {
            tracing::warn!(deferred = outcome.deferred, "expired audit events kept behind a retained event");
        }
        Ok(outcome)
    }

    async fn permits(
        &self,
        cache: &mut HashMap<String, bool>,
        object_type: &str,
    ) -> Result<bool, ComplianceError> {
        if let Some(&allowed) = cache.get(object_type) {
            return Ok(allowed);
        }
        let allowed = self.retention.can_auto_delete(object_type).await?;
        cache.insert(object_type.to_string(), allowed);
        Ok(allowed)
    }

    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the query fails.
    pub async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, ComplianceError> {
        Ok(self.db.query_audit_events(filter).await?)
    }

    /// All events for one object, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the query fails.
    pub async fn events_for(
        &self,
        object_type: &str,
        object_id: &str,
    ) -> Result<Vec<AuditEvent>, ComplianceError> {
        let filter = AuditFilter {
            object_type: Some(object_type.to_string()),
            object_id: Some(object_id.to_string()),
            limit: Some(u32::MAX),
            ..AuditFilter::default()
        };
        self.query(&filter).await
    }

    /// Write the complete chain to `path` as JSON lines in insertion order,
    /// then record the export itself. Returns the number of exported events.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Io` if the file cannot be written and
    /// `ComplianceError::Database` if events cannot be read or the export
    /// event cannot be recorded.
    pub async fn export_jsonl(&self, path: &Path, actor: Actor) -> Result<usize, ComplianceError> {
        let events = {
            let _tail = self.tail.lock().await;
            let mut events = Vec::new();
            let mut after = 0;
            loop {
                let page = self.db.audit_events_after(after, PAGE_SIZE).await?;
                let Some(last) = page.last() else {
                    break;
                };
                after = last.seq;
                events.extend(page);
            }
            events
        };

        serde_jsonlines::write_json_lines(path, &events).map_err(|e| ComplianceError::io(path, e))?;
        let detail = ExportDetail {
            path: path.display().to_string(),
            events: events.len(),
        };
        self.record(
            AuditRecord::new(EventType::Export, "audit_log", "export", "export audit chain", actor)
                .new_value(&detail)?,
        )
        .await?;
        tracing::info!(path = %path.display(), events = events.len(), "audit chain exported");
        Ok(events.len())
    }
}
