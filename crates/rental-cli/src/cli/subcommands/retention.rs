use clap::Subcommand;

/// Retention policy commands.
#[derive(Clone, Debug, Subcommand)]
pub enum RetentionCommands {
    /// List policies.
    Policies {
        /// Include replaced and deactivated policies
        #[arg(long)]
        all: bool,
    },
    /// Replace the active policy for a document type.
    Set {
        document_type: String,
        #[arg(long)]
        years: u32,
        #[arg(long)]
        legal_basis: String,
        #[arg(long)]
        auto_delete: bool,
    },
    /// Delete expired records the policies allow to be deleted.
    Cleanup {
        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
    /// Report missing policies and overdue records.
    Validate,
}
