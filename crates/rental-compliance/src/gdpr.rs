//! GDPR consent tracking and data subject requests.
//!
//! Every mutation is written to the audit chain: consent changes as CONSENT
//! events on `customer_data`, requests as CREATE/UPDATE events on
//! `data_subject_request`.

use std::sync::Arc;

use chrono::Utc;

use rental_core::audit_detail::{ConsentDetail, StatusChangedDetail};
use rental_core::entities::{Actor, ConsentRecord, DataSubjectRequest, RequestContext};
use rental_core::enums::{ConsentType, EventType, RequestStatus, RequestType};
use rental_core::errors::CoreError;
use rental_core::ids::{PREFIX_CONSENT, PREFIX_REQUEST};
use rental_db::RentalDb;

use crate::audit::{AuditLogger, AuditRecord};
use crate::error::ComplianceError;

const CONSENT_OBJECT: &str = "customer_data";
const REQUEST_OBJECT: &str = "data_subject_request";

pub struct GdprManager {
    db: Arc<RentalDb>,
    audit: Arc<AuditLogger>,
}

impl GdprManager {
    #[must_use]
    pub const fn new(db: Arc<RentalDb>, audit: Arc<AuditLogger>) -> Self {
        Self { db, audit }
    }

    /// Record that a customer granted consent for one purpose.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Validation` for an empty customer id or legal
    /// basis, `ComplianceError::Database` if persisting or auditing fails.
    pub async fn record_consent(
        &self,
        customer_id: &str,
        consent_type: ConsentType,
        legal_basis: &str,
        actor: Actor,
        request: RequestContext,
    ) -> Result<ConsentRecord, ComplianceError> {
        if customer_id.trim().is_empty() {
            return Err(ComplianceError::Validation("customer id must not be empty".into()));
        }
        if legal_basis.trim().is_empty() {
            return Err(ComplianceError::Validation("legal basis must not be empty".into()));
        }

        let consent = ConsentRecord {
            id: self.db.generate_id(PREFIX_CONSENT).await?,
            customer_id: customer_id.to_string(),
            consent_type,
            granted: true,
            legal_basis: legal_basis.to_string(),
            granted_at: Utc::now(),
            withdrawn_at: None,
            ip_address: request.ip_address.clone(),
        };
        self.db.insert_consent(&consent).await?;

        self.audit_consent(&consent, true, actor, request).await?;
        tracing::info!(customer_id, consent_type = %consent_type, "consent granted");
        Ok(consent)
    }

    /// Withdraw the customer's current consent for a purpose.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Core` (`NotFound`) when no effective consent
    /// exists, `ComplianceError::Database` if persisting or auditing fails.
    pub async fn withdraw_consent(
        &self,
        customer_id: &str,
        consent_type: ConsentType,
        actor: Actor,
        request: RequestContext,
    ) -> Result<ConsentRecord, ComplianceError> {
        let mut consent = self
            .db
            .latest_consent(customer_id, consent_type)
            .await?
            .filter(ConsentRecord::is_effective)
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "consent".into(),
                id: format!("{customer_id}/{consent_type}"),
            })?;

        let now = Utc::now();
        self.db.withdraw_consent_record(&consent.id, now).await?;
        consent.withdrawn_at = Some(now);

        self.audit_consent(&consent, false, actor, request).await?;
        tracing::info!(customer_id, consent_type = %consent_type, "consent withdrawn");
        Ok(consent)
    }

    async fn audit_consent(
        &self,
        consent: &ConsentRecord,
        granted: bool,
        actor: Actor,
        request: RequestContext,
    ) -> Result<(), ComplianceError> {
        let detail = ConsentDetail {
            customer_id: consent.customer_id.clone(),
            consent_type: consent.consent_type.as_str().to_string(),
            granted,
        };
        let action = if granted { "grant consent" } else { "withdraw consent" };
        self.audit
            .record(
                AuditRecord::new(EventType::Consent, CONSENT_OBJECT, &consent.customer_id, action, actor)
                    .new_value(&detail)?
                    .request(request),
            )
            .await?;
        Ok(())
    }

    /// Whether the latest decision for the pair is a grant that has not been
    /// withdrawn.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the lookup fails.
    pub async fn has_consent(
        &self,
        customer_id: &str,
        consent_type: ConsentType,
    ) -> Result<bool, ComplianceError> {
        Ok(self
            .db
            .latest_consent(customer_id, consent_type)
            .await?
            .is_some_and(|c| c.is_effective()))
    }

    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the query fails.
    pub async fn consents_for(&self, customer_id: &str) -> Result<Vec<ConsentRecord>, ComplianceError> {
        Ok(self.db.consents_for_customer(customer_id).await?)
    }

    /// # Errors
    ///
    /// Returns `ComplianceError::Validation` for an empty customer id,
    /// `ComplianceError::Database` if persisting or auditing fails.
    pub async fn open_request(
        &self,
        customer_id: &str,
        request_type: RequestType,
        notes: Option<&str>,
        actor: Actor,
    ) -> Result<DataSubjectRequest, ComplianceError> {
        if customer_id.trim().is_empty() {
            return Err(ComplianceError::Validation("customer id must not be empty".into()));
        }
        let now = Utc::now();
        let request = DataSubjectRequest {
            id: self.db.generate_id(PREFIX_REQUEST).await?,
            customer_id: customer_id.to_string(),
            request_type,
            status: RequestStatus::Pending,
            notes: notes.map(String::from),
            requested_at: now,
            completed_at: None,
            updated_at: now,
        };
        self.db.insert_request(&request).await?;

        self.audit
            .record(
                AuditRecord::new(
                    EventType::Create,
                    REQUEST_OBJECT,
                    &request.id,
                    format!("open {request_type} request for {customer_id}"),
                    actor,
                )
                .new_value(&request)?,
            )
            .await?;
        tracing::info!(id = %request.id, customer_id, request_type = %request_type, "data subject request opened");
        Ok(request)
    }

    /// Move a request along `pending → in_progress → completed | rejected`.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError::Core` (`InvalidTransition`) for a disallowed
    /// move, `ComplianceError::Database` for an unknown id or failed write.
    pub async fn transition_request(
        &self,
        request_id: &str,
        to: RequestStatus,
        notes: Option<&str>,
        actor: Actor,
    ) -> Result<DataSubjectRequest, ComplianceError> {
        let current = self.db.get_request(request_id).await?;
        if !current.status.can_transition_to(to) {
            return Err(CoreError::InvalidTransition {
                entity_type: REQUEST_OBJECT.into(),
                id: request_id.to_string(),
                from: current.status.to_string(),
                to: to.to_string(),
            }
            .into());
        }

        let updated = self
            .db
            .update_request_status(request_id, to, notes, Utc::now())
            .await?;
        let detail = StatusChangedDetail {
            from: current.status.to_string(),
            to: to.to_string(),
            reason: notes.map(String::from),
        };
        self.audit
            .record(
                AuditRecord::new(
                    EventType::Update,
                    REQUEST_OBJECT,
                    request_id,
                    format!("request {} → {}", current.status, to),
                    actor,
                )
                .new_value(&detail)?,
            )
            .await?;
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns `ComplianceError::Database` if the query fails.
    pub async fn requests_for(
        &self,
        customer_id: &str,
    ) -> Result<Vec<DataSubjectRequest>, ComplianceError> {
        Ok(self.db.requests_for_customer(customer_id).await?)
    }
}
