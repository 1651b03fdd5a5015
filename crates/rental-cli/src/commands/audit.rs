use anyhow::Context;
use rental_db::AuditFilter;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::AuditCommands;
use crate::commands::shared::limit::list_limit;
use crate::commands::shared::parse::parse_event_type;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct ExportResponse {
    path: String,
    events: usize,
}

/// Handle `rentalcore audit`.
pub async fn handle(
    action: &AuditCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let audit = &ctx.compliance.audit;
    match action {
        AuditCommands::Verify => {
            let report = audit.verify_chain_integrity().await?;
            output(&report, flags.format)?;
            if let Some(brk) = &report.break_at {
                anyhow::bail!(
                    "audit chain broken at seq {} (event {})",
                    brk.seq,
                    brk.event_id
                );
            }
            Ok(())
        }
        AuditCommands::List {
            object_type,
            object_id,
            event_type,
            user,
            compliance_only,
            limit,
        } => {
            let filter = AuditFilter {
                object_type: object_type.clone(),
                object_id: object_id.clone(),
                event_type: event_type.as_deref().map(parse_event_type).transpose()?,
                user_id: user.clone(),
                compliance_only: *compliance_only,
                limit: Some(list_limit(*limit, flags, &ctx.config.general)),
            };
            let events = audit.query(&filter).await?;
            output(&events, flags.format)
        }
        AuditCommands::Export { path } => {
            let events = audit
                .export_jsonl(path, ctx.actor(flags))
                .await
                .with_context(|| format!("failed to export audit chain to {}", path.display()))?;
            output(
                &ExportResponse {
                    path: path.display().to_string(),
                    events,
                },
                flags.format,
            )
        }
    }
}
