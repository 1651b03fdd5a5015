//! Compliance subsystem configuration: archive storage, signing keys, and
//! retention defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_archive_dir() -> PathBuf {
    PathBuf::from(".rentalcore/archive")
}

fn default_key_dir() -> PathBuf {
    PathBuf::from(".rentalcore/keys")
}

/// Retention applied when a document type has no active policy.
const fn default_retention_years() -> u32 {
    10
}

/// How long past its retention date a document may linger before validation
/// reports it.
const fn default_grace_period_months() -> u32 {
    6
}

fn default_signer() -> String {
    "rentalcore".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ComplianceConfig {
    /// Directory for immutable archive payload files.
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,

    /// Directory holding the signing key (created with 0700).
    #[serde(default = "default_key_dir")]
    pub key_dir: PathBuf,

    #[serde(default = "default_retention_years")]
    pub default_retention_years: u32,

    #[serde(default = "default_grace_period_months")]
    pub grace_period_months: u32,

    /// Signer identity recorded on archive signatures.
    #[serde(default = "default_signer")]
    pub signer: String,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            archive_dir: default_archive_dir(),
            key_dir: default_key_dir(),
            default_retention_years: default_retention_years(),
            grace_period_months: default_grace_period_months(),
            signer: default_signer(),
        }
    }
}

impl ComplianceConfig {
    /// Reject values that would make retention unsafe.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a zero retention period, a zero
    /// grace period, or an empty signer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_retention_years == 0 {
            return Err(ConfigError::InvalidValue {
                field: "compliance.default_retention_years".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.grace_period_months == 0 {
            return Err(ConfigError::InvalidValue {
                field: "compliance.grace_period_months".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.signer.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "compliance.signer".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = ComplianceConfig::default();
        assert_eq!(config.default_retention_years, 10);
        assert_eq!(config.grace_period_months, 6);
        assert_eq!(config.signer, "rentalcore");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_retention_is_rejected() {
        let config = ComplianceConfig {
            default_retention_years: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_retention_years"));
    }

    #[test]
    fn zero_grace_period_is_rejected() {
        let config = ComplianceConfig {
            grace_period_months: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
