use std::path::PathBuf;

use clap::ValueEnum;
use rental_core::entities::Actor;

/// Shared output mode across all commands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Raw,
}

/// Global flags available before or after subcommands.
#[derive(Clone, Debug)]
pub struct GlobalFlags {
    pub format: OutputFormat,
    pub limit: Option<u32>,
    pub config: Option<PathBuf>,
    pub actor: Option<String>,
}

impl GlobalFlags {
    /// The identity recorded on audit events written by this invocation.
    /// `--actor` wins over the configured fallback.
    #[must_use]
    pub fn actor(&self, fallback: Option<&str>) -> Actor {
        self.actor
            .as_deref()
            .or(fallback)
            .map_or_else(Actor::system, |name| Actor::user(name, name))
    }
}
