//! # rental-compliance
//!
//! The integrity ledger: hash-chained audit log, retention policies, GoBD
//! archive with Ed25519 signatures, and GDPR consent tracking.
//!
//! Components depend on each other leaves first: [`SignatureManager`] →
//! [`RetentionManager`] → [`AuditLogger`] → [`GoBdArchive`] →
//! [`ComplianceMiddleware`]. [`Compliance::init`] wires them together.

pub mod archive;
pub mod audit;
pub mod error;
pub mod gdpr;
pub mod middleware;
pub mod retention;
pub mod signature;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use chrono::Utc;

use rental_config::ComplianceConfig;
use rental_db::RentalDb;

pub use archive::{GoBdArchive, IntegrityCheck};
pub use audit::{AuditLogger, AuditRecord};
pub use error::ComplianceError;
pub use gdpr::GdprManager;
pub use middleware::{ComplianceMiddleware, ObjectRef, RequestRecord};
pub use retention::{CleanupReport, ComplianceIssue, RetentionManager};
pub use signature::SignatureManager;

/// All compliance components, sharing one database handle.
#[derive(Clone)]
pub struct Compliance {
    pub db: Arc<RentalDb>,
    pub signatures: Arc<SignatureManager>,
    pub retention: Arc<RetentionManager>,
    pub audit: Arc<AuditLogger>,
    pub archive: Arc<GoBdArchive>,
    pub gdpr: Arc<GdprManager>,
    pub middleware: ComplianceMiddleware,
}

impl Compliance {
    /// Load or generate the signing key, seed default retention policies and
    /// restore the audit chain tail.
    ///
    /// # Errors
    ///
    /// Returns `ComplianceError` if the key cannot be loaded or created, or
    /// if seeding or reading the chain tail fails.
    pub async fn init(db: Arc<RentalDb>, config: &ComplianceConfig) -> Result<Self, ComplianceError> {
        let signatures = Arc::new(SignatureManager::load_or_generate(
            Arc::clone(&db),
            &config.key_dir,
        )?);
        let retention = Arc::new(RetentionManager::new(Arc::clone(&db), config));
        retention.seed_defaults(Utc::now()).await?;
        let audit = Arc::new(AuditLogger::new(Arc::clone(&db), Arc::clone(&retention)).await?);
        let archive = Arc::new(GoBdArchive::new(
            Arc::clone(&db),
            Arc::clone(&retention),
            Arc::clone(&signatures),
            Arc::clone(&audit),
            config.archive_dir.clone(),
            config.signer.clone(),
        ));
        let gdpr = Arc::new(GdprManager::new(Arc::clone(&db), Arc::clone(&audit)));
        let middleware = ComplianceMiddleware::new(Arc::clone(&audit), Arc::clone(&archive));

        tracing::debug!(key_id = signatures.key_id(), "compliance components ready");
        Ok(Self {
            db,
            signatures,
            retention,
            audit,
            archive,
            gdpr,
            middleware,
        })
    }
}
