use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(command: Commands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Init => commands::init::handle(ctx, flags).await,
        Commands::Audit { action } => commands::audit::handle(&action, ctx, flags).await,
        Commands::Retention { action } => commands::retention::handle(&action, ctx, flags).await,
        Commands::Archive { action } => commands::archive::handle(&action, ctx, flags).await,
        Commands::Product { action } => commands::product::handle(&action, ctx, flags).await,
        Commands::Device { action } => commands::device::handle(&action, ctx, flags).await,
        Commands::Job { action } => commands::job::handle(&action, ctx, flags).await,
        Commands::Gdpr { action } => commands::gdpr::handle(&action, ctx, flags).await,
    }
}
