use rental_booking::NewJob;
use rental_core::entities::{Job, JobDevice};
use rental_core::enums::{DiscountType, JobStatus};
use rental_core::revenue::Discount;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::JobCommands;
use crate::commands::shared::limit::list_limit;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct JobDetail {
    #[serde(flatten)]
    job: Job,
    devices: Vec<JobDevice>,
}

/// Handle `rentalcore job`.
pub async fn handle(
    action: &JobCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let engine = &ctx.engine;
    let actor = ctx.actor(flags);
    match action {
        JobCommands::Create {
            title,
            customer,
            start,
            end,
            discount,
            discount_type,
        } => {
            let kind: DiscountType = parse_enum(discount_type, "discount type")?;
            let discount = match discount {
                Some(value) => Discount::new(*value, kind)?,
                None => Discount::none(),
            };
            let job = engine
                .create_job(
                    NewJob {
                        title: title.clone(),
                        customer_id: customer.clone(),
                        start_date: *start,
                        end_date: *end,
                        discount,
                    },
                    &actor,
                )
                .await?;
            output(&job, flags.format)
        }
        JobCommands::Get { id } => {
            let job = engine.get_job(id).await?;
            let devices = engine.assignments(id).await?;
            output(&JobDetail { job, devices }, flags.format)
        }
        JobCommands::List { status, limit } => {
            let status = status
                .as_deref()
                .map(|raw| parse_enum::<JobStatus>(raw, "job status"))
                .transpose()?;
            let limit = list_limit(*limit, flags, &ctx.config.general);
            let jobs = engine.list_jobs(status, limit).await?;
            output(&jobs, flags.format)
        }
        JobCommands::Assign {
            job,
            devices,
            price,
        } => {
            if let [device] = devices.as_slice() {
                let outcome = engine.assign(job, device, *price, &actor).await?;
                return output(&outcome, flags.format);
            }
            let requests: Vec<_> = devices.iter().map(|d| (d.clone(), *price)).collect();
            let report = engine.bulk_assign(job, &requests, &actor).await?;
            output(&report, flags.format)
        }
        JobCommands::Unassign { job, device } => {
            let revenue = engine.unassign(job, device, &actor).await?;
            output(&revenue, flags.format)
        }
        JobCommands::Return { job, device } => {
            let link = engine.return_device(job, device, &actor).await?;
            output(&link, flags.format)
        }
        JobCommands::Transition { job, status } => {
            let to: JobStatus = parse_enum(status, "job status")?;
            let updated = engine.transition_job(job, to, &actor).await?;
            output(&updated, flags.format)
        }
        JobCommands::Discount { job, value, kind } => {
            let kind: DiscountType = parse_enum(kind, "discount type")?;
            let revenue = engine
                .update_discount(job, Discount::new(*value, kind)?, &actor)
                .await?;
            output(&revenue, flags.format)
        }
        JobCommands::Revenue { job } => {
            let revenue = engine.recalculate_revenue(job).await?;
            output(&revenue, flags.format)
        }
    }
}
