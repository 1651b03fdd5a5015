use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use rental_booking::BookingEngine;
use rental_compliance::Compliance;
use rental_config::RentalConfig;
use rental_core::entities::Actor;
use rental_db::RentalDb;

use crate::cli::GlobalFlags;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub config: RentalConfig,
    pub compliance: Compliance,
    pub engine: BookingEngine,
}

impl AppContext {
    /// Open the database, load or create the signing key, seed retention
    /// defaults and restore the audit chain tail.
    pub async fn init(config: RentalConfig) -> anyhow::Result<Self> {
        if !config.database.is_in_memory() {
            if let Some(parent) = Path::new(&config.database.path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create database directory {}", parent.display())
                    })?;
                }
            }
        }

        let db = Arc::new(
            RentalDb::open_local(&config.database.path)
                .await
                .with_context(|| format!("failed to open database at {}", config.database.path))?,
        );
        let compliance = Compliance::init(Arc::clone(&db), &config.compliance)
            .await
            .context("failed to initialize compliance components")?;
        let engine = BookingEngine::new(db).with_audit(Arc::clone(&compliance.audit));

        Ok(Self {
            config,
            compliance,
            engine,
        })
    }

    /// Identity for audit events, falling back to `general.default_actor`.
    #[must_use]
    pub fn actor(&self, flags: &GlobalFlags) -> Actor {
        flags.actor(self.config.general.default_actor.as_deref())
    }
}
