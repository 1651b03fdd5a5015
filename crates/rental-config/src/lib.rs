//! # rental-config
//!
//! Layered configuration loading for RentalCore using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`RENTALCORE_*` prefix, `__` as separator)
//! 2. Project-level `.rentalcore/config.toml`
//! 3. User-level `~/.config/rentalcore/config.toml`
//! 4. Built-in defaults
//!
//! `RENTALCORE_COMPLIANCE__DEFAULT_RETENTION_YEARS` maps to
//! `compliance.default_retention_years`, `RENTALCORE_DATABASE__PATH` to
//! `database.path`, and so on.

mod compliance;
mod database;
mod error;
mod general;

pub use compliance::ComplianceConfig;
pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "RENTALCORE_";
const PROJECT_CONFIG: &str = ".rentalcore/config.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RentalConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub compliance: ComplianceConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl RentalConfig {
    /// Load configuration from TOML files and environment variables.
    ///
    /// Does not read `.env`; use [`Self::load_with_dotenv`] for that.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a source cannot be parsed, or
    /// `ConfigError::InvalidValue` if the merged result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Load configuration after importing `.env` from the working tree.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Extract and validate from an arbitrary figment.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(PROJECT_CONFIG);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Check cross-field constraints after merging.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.general.default_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "general.default_limit".into(),
                reason: "must be at least 1".into(),
            });
        }
        if let Some(actor) = &self.general.default_actor {
            if actor.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "general.default_actor".into(),
                    reason: "must not be blank when set".into(),
                });
            }
        }
        self.compliance.validate()
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rentalcore").join("config.toml"))
    }

    /// Walk up from `CARGO_MANIFEST_DIR` (when set) looking for `.env`, then
    /// fall back to the current directory. Missing files are ignored.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }
        let _ = dotenvy::dotenv();
    }
}
