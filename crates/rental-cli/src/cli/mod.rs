use std::path::PathBuf;

use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `rentalcore` binary.
#[derive(Debug, Parser)]
#[command(
    name = "rentalcore",
    version,
    about = "RentalCore - equipment rental bookings with a tamper-evident compliance ledger"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Max results to return
    #[arg(short, long, global = true)]
    pub limit: Option<u32>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Extra config file merged over the default sources
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// User recorded on audit events (defaults to "system")
    #[arg(long, global = true)]
    pub actor: Option<String>,
}

impl Cli {
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            limit: self.limit,
            config: self.config.clone(),
            actor: self.actor.clone(),
        }
    }
}
