use clap::Subcommand;

/// Device commands.
#[derive(Clone, Debug, Subcommand)]
pub enum DeviceCommands {
    /// Register a device.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        product: Option<String>,
        #[arg(long)]
        serial: Option<String>,
    },
    /// List devices.
    List {
        /// free, checked_out, maintenance, retired
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
}
