use clap::Subcommand;

use crate::cli::subcommands::{
    ArchiveCommands, AuditCommands, DeviceCommands, GdprCommands, JobCommands, ProductCommands,
    RetentionCommands,
};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Create the database, signing key and default retention policies.
    Init,
    /// Audit chain.
    Audit {
        #[command(subcommand)]
        action: AuditCommands,
    },
    /// Retention policies and cleanup.
    Retention {
        #[command(subcommand)]
        action: RetentionCommands,
    },
    /// GoBD document archive.
    Archive {
        #[command(subcommand)]
        action: ArchiveCommands,
    },
    /// Products.
    Product {
        #[command(subcommand)]
        action: ProductCommands,
    },
    /// Devices.
    Device {
        #[command(subcommand)]
        action: DeviceCommands,
    },
    /// Jobs, assignments and revenue.
    Job {
        #[command(subcommand)]
        action: JobCommands,
    },
    /// GDPR consent and data subject requests.
    Gdpr {
        #[command(subcommand)]
        action: GdprCommands,
    },
}
