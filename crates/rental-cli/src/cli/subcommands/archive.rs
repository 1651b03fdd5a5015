use std::path::PathBuf;

use clap::Subcommand;

/// Archive commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ArchiveCommands {
    /// Archive and sign a JSON document.
    Create {
        /// Document type, e.g. invoice
        document_type: String,
        document_id: String,
        /// JSON file holding the payload
        #[arg(long, conflicts_with = "json")]
        file: Option<PathBuf>,
        /// Inline JSON payload
        #[arg(long)]
        json: Option<String>,
    },
    /// Check one record's file, content hash and signature.
    Verify { id: String },
    /// Check every record; lists only the failures.
    VerifyAll,
    /// List archived versions of a document.
    List {
        document_type: String,
        document_id: String,
    },
}
