use anyhow::Context;
use figment::providers::{Format, Toml};
use rental_config::RentalConfig;

use crate::cli::GlobalFlags;

/// Load `.env`, then the layered config. A `--config` file is merged last and
/// wins over every other source.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<RentalConfig> {
    dotenvy::dotenv().ok();

    let mut figment = RentalConfig::figment();
    if let Some(path) = &flags.config {
        if !path.is_file() {
            anyhow::bail!("config file '{}' does not exist", path.display());
        }
        figment = figment.merge(Toml::file(path));
    }

    RentalConfig::from_figment(&figment).context("failed to load rentalcore configuration")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cli::OutputFormat;

    fn flags(config: Option<PathBuf>) -> GlobalFlags {
        GlobalFlags {
            format: OutputFormat::Json,
            limit: None,
            config,
            actor: None,
        }
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = load_config(&flags(Some(PathBuf::from("/nonexistent/rentalcore.toml"))))
            .expect_err("should fail");
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn explicit_config_file_is_merged() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[database]\npath = \":memory:\"\n\n[compliance]\nsigner = \"audit-team\"\n",
        )
        .unwrap();

        let config = load_config(&flags(Some(path))).expect("config should load");
        assert!(config.database.is_in_memory());
        assert_eq!(config.compliance.signer, "audit-team");
    }
}
