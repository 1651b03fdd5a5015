use rental_core::enums::DeviceStatus;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::DeviceCommands;
use crate::commands::shared::limit::list_limit;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

/// Handle `rentalcore device`.
pub async fn handle(
    action: &DeviceCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        DeviceCommands::Create {
            name,
            product,
            serial,
        } => {
            let device = ctx
                .engine
                .create_device(name, product.as_deref(), serial.as_deref())
                .await?;
            output(&device, flags.format)
        }
        DeviceCommands::List { status, limit } => {
            let status = status
                .as_deref()
                .map(|raw| parse_enum::<DeviceStatus>(raw, "device status"))
                .transpose()?;
            let limit = list_limit(*limit, flags, &ctx.config.general);
            let devices = ctx.engine.list_devices(status, limit).await?;
            output(&devices, flags.format)
        }
    }
}
