//! Audit event repository.
//!
//! Append-only storage for the hash-chained audit log. Rows are never
//! updated (a trigger refuses it); the only deletion path is
//! [`RentalDb::prune_audit_prefix`], which removes the oldest events and
//! moves the chain anchor forward in the same transaction.

use chrono::{DateTime, Utc};
use serde::Serialize;

use rental_core::entities::{Actor, AuditEvent, RequestContext};
use rental_core::enums::EventType;

use crate::RentalDb;
use crate::error::DatabaseError;
use crate::helpers::{
    format_timestamp, get_bool, get_opt_string, parse_datetime, parse_enum, parse_optional_json,
    to_json,
};

const SELECT_COLS: &str = "seq, id, event_type, object_type, object_id, user_id, username, \
     action, old_values, new_values, ip_address, user_agent, session_id, context, hash, \
     previous_hash, compliance_flag, retention_date, timestamp";

fn row_to_event(row: &libsql::Row) -> Result<AuditEvent, DatabaseError> {
    let context = match get_opt_string(row, 13)? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| DatabaseError::Query(format!("Invalid audit context JSON: {e}")))?,
        None => Default::default(),
    };
    Ok(AuditEvent {
        seq: row.get(0)?,
        id: row.get(1)?,
        event_type: parse_enum(&row.get::<String>(2)?)?,
        object_type: row.get(3)?,
        object_id: row.get(4)?,
        actor: Actor {
            user_id: get_opt_string(row, 5)?,
            username: get_opt_string(row, 6)?,
        },
        action: row.get(7)?,
        old_values: parse_optional_json(get_opt_string(row, 8)?.as_deref())?,
        new_values: parse_optional_json(get_opt_string(row, 9)?.as_deref())?,
        request: RequestContext {
            ip_address: get_opt_string(row, 10)?,
            user_agent: get_opt_string(row, 11)?,
            session_id: get_opt_string(row, 12)?,
        },
        context,
        hash: row.get(14)?,
        previous_hash: row.get(15)?,
        compliance_flag: get_bool(row, 16)?,
        retention_date: parse_datetime(&row.get::<String>(17)?)?,
        timestamp: parse_datetime(&row.get::<String>(18)?)?,
    })
}

/// Filter criteria for audit queries. Results are newest first.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    pub object_type: Option<String>,
    pub object_id: Option<String>,
    pub event_type: Option<EventType>,
    pub user_id: Option<String>,
    pub compliance_only: bool,
    pub limit: Option<u32>,
}

/// Where the verifiable chain starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainAnchor {
    /// Hash the first remaining event must link to.
    pub anchor_hash: String,
    /// Highest `seq` removed by retention cleanup (0 if none).
    pub pruned_through_seq: i64,
    pub updated_at: DateTime<Utc>,
}

impl RentalDb {
    /// Append an event and return its assigned `seq`. `event.seq` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the INSERT fails.
    pub async fn insert_audit_event(&self, event: &AuditEvent) -> Result<i64, DatabaseError> {
        let old_values = event.old_values.as_ref().map(to_json).transpose()?;
        let new_values = event.new_values.as_ref().map(to_json).transpose()?;
        let context = to_json(&event.context)?;

        let mut rows = self
            .conn
            .query(
                "INSERT INTO audit_events (id, event_type, object_type, object_id, user_id, username,
                     action, old_values, new_values, ip_address, user_agent, session_id, context,
                     hash, previous_hash, compliance_flag, retention_date, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                 RETURNING seq",
                libsql::params![
                    event.id.as_str(),
                    event.event_type.as_str(),
                    event.object_type.as_str(),
                    event.object_id.as_str(),
                    event.actor.user_id.as_deref(),
                    event.actor.username.as_deref(),
                    event.action.as_str(),
                    old_values,
                    new_values,
                    event.request.ip_address.as_deref(),
                    event.request.user_agent.as_deref(),
                    event.request.session_id.as_deref(),
                    context,
                    event.hash.as_str(),
                    event.previous_hash.as_str(),
                    i64::from(event.compliance_flag),
                    format_timestamp(event.retention_date),
                    format_timestamp(event.timestamp)
                ],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<i64>(0)?)
    }

    /// The most recently inserted event, if any.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn last_audit_event(&self) -> Result<Option<AuditEvent>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {SELECT_COLS} FROM audit_events ORDER BY seq DESC LIMIT 1"),
                (),
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_event(&row)?)),
            None => Ok(None),
        }
    }

    /// Up to `limit` events with `seq > after_seq`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn audit_events_after(
        &self,
        after_seq: i64,
        limit: u32,
    ) -> Result<Vec<AuditEvent>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM audit_events WHERE seq > ?1 ORDER BY seq ASC LIMIT ?2"
                ),
                libsql::params![after_seq, i64::from(limit)],
            )
            .await?;
        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(row_to_event(&row)?);
        }
        Ok(events)
    }

    /// Query events with optional filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_audit_events(
        &self,
        filter: &AuditFilter,
    ) -> Result<Vec<AuditEvent>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref ot) = filter.object_type {
            params.push(libsql::Value::Text(ot.clone()));
            conditions.push(format!("object_type = ?{}", params.len()));
        }
        if let Some(ref oid) = filter.object_id {
            params.push(libsql::Value::Text(oid.clone()));
            conditions.push(format!("object_id = ?{}", params.len()));
        }
        if let Some(et) = filter.event_type {
            params.push(libsql::Value::Text(et.as_str().to_string()));
            conditions.push(format!("event_type = ?{}", params.len()));
        }
        if let Some(ref uid) = filter.user_id {
            params.push(libsql::Value::Text(uid.clone()));
            conditions.push(format!("user_id = ?{}", params.len()));
        }
        if filter.compliance_only {
            conditions.push("compliance_flag = 1".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let limit = filter.limit.unwrap_or(100);
        let sql = format!(
            "SELECT {SELECT_COLS} FROM audit_events {where_clause} ORDER BY seq DESC LIMIT {limit}"
        );

        let mut rows = self
            .conn
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(row_to_event(&row)?);
        }
        Ok(events)
    }

    /// Number of events currently stored.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn count_audit_events(&self) -> Result<i64, DatabaseError> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM audit_events", ())
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<i64>(0)?)
    }

    /// Read the chain anchor row.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn chain_anchor(&self) -> Result<ChainAnchor, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT anchor_hash, pruned_through_seq, updated_at FROM audit_chain_anchor WHERE id = 1",
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(ChainAnchor {
            anchor_hash: row.get(0)?,
            pruned_through_seq: row.get(1)?,
            updated_at: parse_datetime(&row.get::<String>(2)?)?,
        })
    }

    /// Delete every event with `seq <= through_seq` and record `anchor_hash`
    /// (the hash of the event at `through_seq`) as the new chain anchor, in one
    /// transaction. Returns the number of deleted events.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if either statement fails; nothing is deleted
    /// in that case.
    pub async fn prune_audit_prefix(
        &self,
        through_seq: i64,
        anchor_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let tx = self.conn.transaction().await?;
        let result = async {
            let deleted = tx
                .execute("DELETE FROM audit_events WHERE seq <= ?1", [through_seq])
                .await?;
            tx.execute(
                "UPDATE audit_chain_anchor
                 SET anchor_hash = ?1, pruned_through_seq = ?2, updated_at = ?3
                 WHERE id = 1",
                libsql::params![anchor_hash, through_seq, format_timestamp(now)],
            )
            .await?;
            Ok::<u64, DatabaseError>(deleted)
        }
        .await;

        match result {
            Ok(deleted) => {
                tx.commit().await?;
                tracing::debug!(through_seq, deleted, "audit prefix pruned");
                Ok(deleted)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use rental_core::chain::compute_hash;

    use super::*;
    use crate::test_support::helpers::test_db;

    fn make_event(n: usize, previous_hash: &str, ts: DateTime<Utc>) -> AuditEvent {
        let mut context = BTreeMap::new();
        context.insert("route".to_string(), json!("/api/v1/jobs"));
        let mut event = AuditEvent {
            id: format!("aud-{n:08x}"),
            seq: 0,
            event_type: EventType::Create,
            object_type: "job".into(),
            object_id: format!("job-{n}"),
            actor: Actor::user("usr-1", "alice"),
            action: "create job".into(),
            old_values: None,
            new_values: Some(json!({"title": "Festival"})),
            request: RequestContext {
                ip_address: Some("10.0.0.1".into()),
                user_agent: None,
                session_id: Some("sess-1".into()),
            },
            context,
            hash: String::new(),
            previous_hash: previous_hash.into(),
            compliance_flag: false,
            retention_date: ts + Duration::days(3650),
            timestamp: ts,
        };
        event.hash = compute_hash(&event.hash_input());
        event
    }

    #[tokio::test]
    async fn insert_assigns_increasing_seq_and_roundtrips() {
        let db = test_db().await;
        let now = Utc::now();
        let first = make_event(1, "", now);
        let seq1 = db.insert_audit_event(&first).await.unwrap();
        let second = make_event(2, &first.hash, now);
        let seq2 = db.insert_audit_event(&second).await.unwrap();
        assert!(seq2 > seq1);

        let loaded = db.last_audit_event().await.unwrap().unwrap();
        assert_eq!(loaded.seq, seq2);
        assert_eq!(loaded.timestamp, second.timestamp);
        assert_eq!(loaded.context, second.context);
        assert_eq!(compute_hash(&loaded.hash_input()), second.hash);
    }

    #[tokio::test]
    async fn rows_are_append_only() {
        let db = test_db().await;
        db.insert_audit_event(&make_event(1, "", Utc::now()))
            .await
            .unwrap();
        let result = db
            .conn()
            .execute("UPDATE audit_events SET action = 'tampered'", ())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn query_filters() {
        let db = test_db().await;
        let now = Utc::now();
        let mut prev = String::new();
        for n in 0..4 {
            let mut ev = make_event(n, &prev, now);
            if n == 3 {
                ev.event_type = EventType::Archive;
                ev.compliance_flag = true;
                ev.object_type = "invoice".into();
                ev.hash = compute_hash(&ev.hash_input());
            }
            db.insert_audit_event(&ev).await.unwrap();
            prev = ev.hash;
        }

        let all = db.query_audit_events(&AuditFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);
        assert!(all[0].seq > all[3].seq, "newest first");

        let compliance = db
            .query_audit_events(&AuditFilter {
                compliance_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(compliance.len(), 1);
        assert_eq!(compliance[0].object_type, "invoice");

        let one = db
            .query_audit_events(&AuditFilter {
                object_type: Some("job".into()),
                object_id: Some("job-1".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn prune_moves_anchor() {
        let db = test_db().await;
        let now = Utc::now();
        let mut hashes = Vec::new();
        let mut prev = String::new();
        for n in 0..5 {
            let ev = make_event(n, &prev, now);
            db.insert_audit_event(&ev).await.unwrap();
            prev.clone_from(&ev.hash);
            hashes.push(ev.hash);
        }

        let events = db.audit_events_after(0, 100).await.unwrap();
        let cut = events[1].seq;
        let deleted = db.prune_audit_prefix(cut, &hashes[1], now).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(db.count_audit_events().await.unwrap(), 3);

        let anchor = db.chain_anchor().await.unwrap();
        assert_eq!(anchor.anchor_hash, hashes[1]);
        assert_eq!(anchor.pruned_through_seq, cut);

        let remaining = db.audit_events_after(0, 100).await.unwrap();
        assert_eq!(remaining[0].previous_hash, anchor.anchor_hash);
    }
}
