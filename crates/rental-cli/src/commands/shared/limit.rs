use rental_config::GeneralConfig;

use crate::cli::GlobalFlags;

/// Row limit for list commands: the subcommand's `--limit`, then the global
/// one, then `general.default_limit`. A zero limit falls back to the default.
#[must_use]
pub fn list_limit(local: Option<u32>, flags: &GlobalFlags, general: &GeneralConfig) -> u32 {
    local
        .or(flags.limit)
        .filter(|&limit| limit > 0)
        .unwrap_or(general.default_limit)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::list_limit;
    use crate::cli::{GlobalFlags, OutputFormat};
    use rental_config::GeneralConfig;

    #[rstest]
    #[case::local_wins(Some(5), Some(10), 5)]
    #[case::global_when_local_missing(None, Some(10), 10)]
    #[case::default_when_unset(None, None, 50)]
    #[case::zero_falls_back(Some(0), Some(10), 50)]
    fn resolves_limit(#[case] local: Option<u32>, #[case] global: Option<u32>, #[case] expected: u32) {
        let flags = GlobalFlags {
            format: OutputFormat::Json,
            limit: global,
            config: None,
            actor: None,
        };
        assert_eq!(list_limit(local, &flags, &GeneralConfig::default()), expected);
    }
}
