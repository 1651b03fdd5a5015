//! Compliance Middleware: the orchestrator HTTP handlers call after a request
//! completes.
//!
//! Requests are mapped to audit events by method (POST → CREATE, GET → READ,
//! PUT/PATCH → UPDATE, DELETE → DELETE). Failed responses and static assets
//! are not audited.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;

use rental_core::audit_detail::RequestDetail;
use rental_core::entities::{Actor, ArchivedRecord, AuditEvent, RequestContext};
use rental_core::enums::EventType;

use crate::archive::GoBdArchive;
use crate::audit::{AuditLogger, AuditRecord};
use crate::error::ComplianceError;

const API_PREFIX: &str = "/api/v1";
const UNAUDITED_PREFIXES: &[&str] = &["/static/"];
const UNAUDITED_PATHS: &[&str] = &["/favicon.ico", "/health"];

/// A completed HTTP request as seen by the middleware.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub actor: Actor,
    pub request: RequestContext,
}

/// Reference to the object a request or mutation touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub object_type: String,
    pub object_id: String,
}

impl ObjectRef {
    pub fn new(object_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRequest {
    pub event_type: EventType,
    pub object: ObjectRef,
}

impl RequestRecord {
    /// The audit event this request maps to, or `None` if it is not audited.
    #[must_use]
    pub fn classify(&self) -> Option<ClassifiedRequest> {
        if !(200..300).contains(&self.status) {
            return None;
        }
        let path = self.path.split('?').next().unwrap_or_default();
        if UNAUDITED_PATHS.contains(&path) || UNAUDITED_PREFIXES.iter().any(|p| path.starts_with(p)) {
            return None;
        }
        let event_type = match self.method.to_ascii_uppercase().as_str() {
            "POST" => EventType::Create,
            "GET" => EventType::Read,
            "PUT" | "PATCH" => EventType::Update,
            "DELETE" => EventType::Delete,
            _ => return None,
        };

        let relative = path.strip_prefix(API_PREFIX).unwrap_or(path);
        let mut segments = relative.split('/').filter(|s| !s.is_empty());
        let object_type = segments.next()?;
        let object_id = segments.next().unwrap_or_default();
        Some(ClassifiedRequest {
            event_type,
            object: ObjectRef::new(object_type, object_id),
        })
    }
}

#[derive(Clone)]
pub struct ComplianceMiddleware {
    audit: Arc<AuditLogger>,
    archive: Arc<GoBdArchive>,
}

impl ComplianceMiddleware {
    #[must_use]
    pub const fn new(audit: Arc<AuditLogger>, archive: Arc<GoBdArchive>) -> Self {
        Self { audit, archive }
    }

    /// Audit a completed request. Returns `None` for requests that are not
    /// audited.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError` if the event cannot be recorded.
    pub async fn record_request(
        &self,
        record: &RequestRecord,
    ) -> Result<Option<AuditEvent>, ComplianceError> {
        let Some(classified) = record.classify() else {
            return Ok(None);
        };
        let detail = RequestDetail {
            method: record.method.to_ascii_uppercase(),
            path: record.path.clone(),
            status: record.status,
        };
        let event = self
            .audit
            .record(
                AuditRecord::new(
                    classified.event_type,
                    classified.object.object_type,
                    classified.object.object_id,
                    format!("{} {}", detail.method, detail.path),
                    record.actor.clone(),
                )
                .request(record.request.clone())
                .context("http", &detail)?,
            )
            .await?;
        Ok(Some(event))
    }

    /// [`Self::record_request`] on a background task. Failures are logged,
    /// not returned.
    #[must_use]
    pub fn spawn_record_request(&self, record: RequestRecord) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.record_request(&record).await {
                tracing::error!(
                    method = %record.method,
                    path = %record.path,
                    error = %e,
                    "failed to audit request"
                );
            }
        })
    }

    /// Audit a domain mutation with typed before/after snapshots.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError` if a snapshot cannot be serialized or the
    /// event cannot be recorded.
    pub async fn track_mutation<T: Serialize + ?Sized>(
        &self,
        event_type: EventType,
        object: ObjectRef,
        actor: Actor,
        request: RequestContext,
        old: Option<&T>,
        new: Option<&T>,
    ) -> Result<AuditEvent, ComplianceError> {
        let action = format!("{} {}", event_type.as_str().to_ascii_lowercase(), object.object_type);
        let mut record = AuditRecord::new(event_type, object.object_type, object.object_id, action, actor)
            .request(request);
        if let Some(old) = old {
            record = record.old_value(old)?;
        }
        if let Some(new) = new {
            record = record.new_value(new)?;
        }
        self.audit.record(record).await
    }

    /// Archive (and thereby sign and audit) an invoice snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError` if archiving fails.
    pub async fn archive_invoice<T: Serialize + ?Sized>(
        &self,
        invoice_id: &str,
        payload: &T,
        actor: Actor,
    ) -> Result<ArchivedRecord, ComplianceError> {
        self.archive.archive("invoice", invoice_id, payload, actor).await
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

    fn request(method: &str, path: &str, status: u16) -> RequestRecord {
        RequestRecord {
            method: method.into(),
            path: path.into(),
            status,
            actor: Actor::user("usr-1", "alice"),
            request: RequestContext {
                ip_address: Some("198.51.100.7".into()),
                user_agent: Some("curl/8".into()),
                session_id: Some("sess-1".into()),
            },
        }
    }

    #[rstest]
    #[case::create("POST", "/api/v1/jobs", 201, Some((EventType::Create, "jobs", "")))]
    #[case::read("GET", "/api/v1/jobs/job-1", 200, Some((EventType::Read, "jobs", "job-1")))]
    #[case::put("PUT", "/devices/dev-1", 200, Some((EventType::Update, "devices", "dev-1")))]
    #[case::patch("patch", "/api/v1/jobs/job-1/devices", 204, Some((EventType::Update, "jobs", "job-1")))]
    #[case::delete("DELETE", "/api/v1/jobs/job-1?force=1", 200, Some((EventType::Delete, "jobs", "job-1")))]
    #[case::failed("POST", "/api/v1/jobs", 409, None)]
    #[case::static_asset("GET", "/static/app.css", 200, None)]
    #[case::favicon("GET", "/favicon.ico", 200, None)]
    #[case::health("GET", "/health", 200, None)]
    #[case::options("OPTIONS", "/api/v1/jobs", 204, None)]
    #[case::root("GET", "/api/v1", 200, None)]
    fn classification(
        #[case] method: &str,
        #[case] path: &str,
        #[case] status: u16,
        #[case] expected: Option<(EventType, &str, &str)>,
    ) {
        let got = request(method, path, status).classify();
        let expected = expected.map(|(event_type, object_type, object_id)| ClassifiedRequest {
            event_type,
            object: ObjectRef::new(object_type, object_id),
        });
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn records_request_with_context() {
        let dir = TempDir::new().unwrap();
        let c = compliance(&dir).await;
        let event = c
            .middleware
            .record_request(&request("PUT", "/api/v1/jobs/job-1", 200))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event_type, EventType::Update);
        assert_eq!(event.object_id, "job-1");
        assert_eq!(event.request.session_id.as_deref(), Some("sess-1"));
        assert_eq!(event.context["http"]["status"], 200);

        let skipped = c
            .middleware
            .record_request(&request("GET", "/static/logo.png", 200))
            .await
            .unwrap();
        assert!(skipped.is_none());
    }

    #[tokio::test]
    async fn spawned_recording_completes() {
        let dir = TempDir::new().unwrap();
        let c = compliance(&dir).await;
        c.middleware
            .spawn_record_request(request("DELETE", "/api/v1/devices/dev-9", 200))
            .await
            .unwrap();
        let events = c.audit.events_for("devices", "dev-9").await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].compliance_flag);
    }

    #[tokio::test]
    async fn tracks_typed_mutations() {
        let dir = TempDir::new().unwrap();
        let c = compliance(&dir).await;
        let before = json!({"status": "open"});
        let after = json!({"status": "in_progress"});
        let event = c
            .middleware
            .track_mutation(
                EventType::Update,
                ObjectRef::new("job", "job-1"),
                Actor::system(),
                RequestContext::default(),
                Some(&before),
                Some(&after),
            )
            .await
            .unwrap();
        assert_eq!(event.old_values, Some(before));
        assert_eq!(event.new_values, Some(after));
        assert_eq!(event.action, "update job");
    }

    #[tokio::test]
    async fn archives_invoices() {
        let dir = TempDir::new().unwrap();
        let c = compliance(&dir).await;
        let record = c
            .middleware
            .archive_invoice("inv-7", &json!({"total": "10.00"}), Actor::system())
            .await
            .unwrap();
        assert_eq!(record.document_type, "invoice");
        assert!(c.archive.verify_integrity(&record.id).await.unwrap().is_valid());
    }
}
