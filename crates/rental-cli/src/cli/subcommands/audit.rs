use std::path::PathBuf;

use clap::Subcommand;

/// Audit chain commands.
#[derive(Clone, Debug, Subcommand)]
pub enum AuditCommands {
    /// Walk the whole chain and report the first break.
    Verify,
    /// List events, newest first.
    List {
        #[arg(long)]
        object_type: Option<String>,
        #[arg(long)]
        object_id: Option<String>,
        /// Event type, e.g. assign or retention_cleanup
        #[arg(long)]
        event_type: Option<String>,
        #[arg(long)]
        user: Option<String>,
        /// Only compliance-relevant events
        #[arg(long)]
        compliance_only: bool,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Export the chain as JSON Lines.
    Export {
        /// Destination file
        path: PathBuf,
    },
}
