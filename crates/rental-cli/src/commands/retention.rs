use chrono::Utc;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::RetentionCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `rentalcore retention`.
pub async fn handle(
    action: &RetentionCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let retention = &ctx.compliance.retention;
    match action {
        RetentionCommands::Policies { all } => {
            let policies = retention.list_policies(*all).await?;
            output(&policies, flags.format)
        }
        RetentionCommands::Set {
            document_type,
            years,
            legal_basis,
            auto_delete,
        } => {
            let policy = retention
                .set_policy(document_type, *years, legal_basis, *auto_delete)
                .await?;
            output(&policy, flags.format)
        }
        RetentionCommands::Cleanup { dry_run } => {
            let report = retention
                .cleanup(
                    &ctx.compliance.audit,
                    &ctx.compliance.archive,
                    Utc::now(),
                    *dry_run,
                )
                .await?;
            output(&report, flags.format)
        }
        RetentionCommands::Validate => {
            let issues = retention.validate(Utc::now()).await?;
            output(&issues, flags.format)
        }
    }
}
