use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct InitResponse {
    database: String,
    archive_dir: String,
    key_id: String,
    public_key: String,
    active_policies: usize,
    chain_tail: String,
}

/// Handle `rentalcore init`. Everything is created by `AppContext::init`;
/// this reports what is in place.
pub async fn handle(ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let compliance = &ctx.compliance;
    let policies = compliance.retention.list_policies(false).await?;
    std::fs::create_dir_all(compliance.archive.archive_dir())?;

    let response = InitResponse {
        database: ctx.config.database.path.clone(),
        archive_dir: compliance.archive.archive_dir().display().to_string(),
        key_id: compliance.signatures.key_id().to_string(),
        public_key: compliance.signatures.public_key_hex(),
        active_policies: policies.len(),
        chain_tail: compliance.audit.tail_hash().await,
    };
    tracing::info!(key_id = %response.key_id, policies = response.active_policies, "rentalcore initialized");
    output(&response, flags.format)
}
