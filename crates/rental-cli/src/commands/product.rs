use crate::cli::GlobalFlags;
use crate::cli::subcommands::ProductCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `rentalcore product`.
pub async fn handle(
    action: &ProductCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        ProductCommands::Create { name, rate } => {
            let product = ctx.engine.create_product(name, *rate).await?;
            output(&product, flags.format)
        }
    }
}
