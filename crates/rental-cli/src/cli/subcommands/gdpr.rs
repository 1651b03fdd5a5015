use clap::Subcommand;

/// GDPR commands.
#[derive(Clone, Debug, Subcommand)]
pub enum GdprCommands {
    /// Record a granted consent.
    Consent {
        customer: String,
        /// data_processing, marketing, newsletter, third_party_sharing
        consent_type: String,
        #[arg(long)]
        legal_basis: String,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        user_agent: Option<String>,
    },
    /// Withdraw the effective consent.
    Withdraw {
        customer: String,
        consent_type: String,
    },
    /// Show a customer's consent history.
    Consents { customer: String },
    /// Open a data subject request.
    Request {
        customer: String,
        /// access, erasure, rectification, portability
        request_type: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Move a data subject request to another status.
    RequestStatus {
        id: String,
        /// in_progress, completed, rejected
        status: String,
        #[arg(long)]
        notes: Option<String>,
    },
}
