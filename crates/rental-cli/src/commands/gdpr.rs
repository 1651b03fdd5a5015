use rental_core::entities::RequestContext;
use rental_core::enums::{ConsentType, RequestStatus, RequestType};

use crate::cli::GlobalFlags;
use crate::cli::subcommands::GdprCommands;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

/// Handle `rentalcore gdpr`.
pub async fn handle(
    action: &GdprCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let gdpr = &ctx.compliance.gdpr;
    match action {
        GdprCommands::Consent {
            customer,
            consent_type,
            legal_basis,
            ip,
            user_agent,
        } => {
            let consent_type: ConsentType = parse_enum(consent_type, "consent type")?;
            let request = RequestContext {
                ip_address: ip.clone(),
                user_agent: user_agent.clone(),
                session_id: None,
            };
            let consent = gdpr
                .record_consent(customer, consent_type, legal_basis, ctx.actor(flags), request)
                .await?;
            output(&consent, flags.format)
        }
        GdprCommands::Withdraw {
            customer,
            consent_type,
        } => {
            let consent_type: ConsentType = parse_enum(consent_type, "consent type")?;
            let consent = gdpr
                .withdraw_consent(customer, consent_type, ctx.actor(flags), RequestContext::default())
                .await?;
            output(&consent, flags.format)
        }
        GdprCommands::Consents { customer } => {
            let consents = gdpr.consents_for(customer).await?;
            output(&consents, flags.format)
        }
        GdprCommands::Request {
            customer,
            request_type,
            notes,
        } => {
            let request_type: RequestType = parse_enum(request_type, "request type")?;
            let request = gdpr
                .open_request(customer, request_type, notes.as_deref(), ctx.actor(flags))
                .await?;
            output(&request, flags.format)
        }
        GdprCommands::RequestStatus { id, status, notes } => {
            let to: RequestStatus = parse_enum(status, "request status")?;
            let request = gdpr
                .transition_request(id, to, notes.as_deref(), ctx.actor(flags))
                .await?;
            output(&request, flags.format)
        }
    }
}
