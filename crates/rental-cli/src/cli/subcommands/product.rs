use clap::Subcommand;
use rust_decimal::Decimal;

/// Product commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ProductCommands {
    /// Create a product with a flat rental rate.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        rate: Decimal,
    },
}
