use chrono::NaiveDate;
use clap::Subcommand;
use rust_decimal::Decimal;

/// Job commands.
#[derive(Clone, Debug, Subcommand)]
pub enum JobCommands {
    /// Create a job over an inclusive date range.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        customer: Option<String>,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// Last day (inclusive), YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        discount: Option<Decimal>,
        /// percent or amount
        #[arg(long, default_value = "percent")]
        discount_type: String,
    },
    /// Get a job with its assignments.
    Get { id: String },
    /// List jobs.
    List {
        /// open, in_progress, completed, cancelled
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Assign one or more devices to a job.
    Assign {
        job: String,
        #[arg(required = true)]
        devices: Vec<String>,
        /// Custom price overriding the product rate
        #[arg(long)]
        price: Option<Decimal>,
    },
    /// Remove a device from a job.
    Unassign { job: String, device: String },
    /// Mark a device returned.
    Return { job: String, device: String },
    /// Move a job to another status.
    Transition {
        job: String,
        /// in_progress, completed, cancelled
        status: String,
    },
    /// Change the job discount.
    Discount {
        job: String,
        value: Decimal,
        /// percent or amount
        #[arg(long, default_value = "percent")]
        kind: String,
    },
    /// Recompute and show the revenue breakdown.
    Revenue { job: String },
}
