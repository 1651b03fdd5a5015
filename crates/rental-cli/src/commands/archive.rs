use anyhow::Context;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ArchiveCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `rentalcore archive`.
pub async fn handle(
    action: &ArchiveCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let archive = &ctx.compliance.archive;
    match action {
        ArchiveCommands::Create {
            document_type,
            document_id,
            file,
            json,
        } => {
            let raw = match (file, json) {
                (Some(path), None) => std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, Some(inline)) => inline.clone(),
                _ => anyhow::bail!("provide the payload with either --file or --json"),
            };
            let payload: serde_json::Value =
                serde_json::from_str(&raw).context("archive payload is not valid JSON")?;
            let record = archive
                .archive(document_type, document_id, &payload, ctx.actor(flags))
                .await?;
            output(&record, flags.format)
        }
        ArchiveCommands::Verify { id } => {
            let check = archive.verify_integrity(id).await?;
            output(&check, flags.format)?;
            if !check.is_valid() {
                anyhow::bail!("archive record {id} failed integrity verification");
            }
            Ok(())
        }
        ArchiveCommands::VerifyAll => {
            let failures = archive.verify_all().await?;
            output(&failures, flags.format)?;
            if !failures.is_empty() {
                anyhow::bail!("{} archive record(s) failed integrity verification", failures.len());
            }
            Ok(())
        }
        ArchiveCommands::List {
            document_type,
            document_id,
        } => {
            let versions = archive.list_for_document(document_type, document_id).await?;
            output(&versions, flags.format)
        }
    }
}
