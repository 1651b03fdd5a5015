//! Shared test utilities for rental-compliance unit tests.

pub(crate) mod helpers {
    use std::sync::Arc;

    use tempfile::TempDir;

    use rental_config::ComplianceConfig;
    use rental_db::RentalDb;

    use crate::{AuditLogger, Compliance, RetentionManager};

    pub async fn test_db() -> Arc<RentalDb> {
        Arc::new(RentalDb::open_local(":memory:").await.unwrap())
    }

    pub fn config(dir: &TempDir) -> ComplianceConfig {
        ComplianceConfig {
            archive_dir: dir.path().join("archive"),
            key_dir: dir.path().join("keys"),
            ..ComplianceConfig::default()
        }
    }

    pub fn retention(db: Arc<RentalDb>) -> RetentionManager {
        RetentionManager::new(db, &ComplianceConfig::default())
    }

    /// Logger over an unseeded retention manager.
    pub async fn audit_logger(db: Arc<RentalDb>) -> AuditLogger {
        let retention = Arc::new(retention(Arc::clone(&db)));
        AuditLogger::new(db, retention).await.unwrap()
    }

    pub async fn compliance(dir: &TempDir) -> Compliance {
        Compliance::init(test_db().await, &config(dir)).await.unwrap()
    }
}
