//! General application configuration.

use serde::{Deserialize, Serialize};

const fn default_limit() -> u32 {
    50
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Row limit for list/query commands.
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Username put on audit events when the caller names none. Unset means
    /// the events are attributed to `system`.
    #[serde(default)]
    pub default_actor: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_actor: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = GeneralConfig::default();
        assert_eq!(config.default_limit, 50);
        assert_eq!(config.default_actor, None);
    }
}
