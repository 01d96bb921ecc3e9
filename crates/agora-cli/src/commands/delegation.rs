use agora_core::entities::Delegation;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::DelegationCommands;
use crate::commands::shared::lookup::user_id;
use crate::commands::shared::parse::parse_optional_instant;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct DelegationListResponse {
    delegations: Vec<Delegation>,
}

/// Handle `agora delegation`.
pub async fn handle(
    action: &DelegationCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        DelegationCommands::Create {
            principal,
            agent,
            scope,
        } => {
            let principal = user_id(ctx, principal).await?;
            let agent = user_id(ctx, agent).await?;
            let delegation = ctx
                .service
                .create_delegation(&principal, &agent, scope)
                .await?;
            output(&delegation, flags.format)
        }
        DelegationCommands::Revoke { id, at } => {
            let at = parse_optional_instant(at.as_deref())?;
            let delegation = ctx.service.revoke_delegation(id, at).await?;
            output(&delegation, flags.format)
        }
        DelegationCommands::Get { id } => {
            let delegation = ctx.service.get_delegation(id).await?;
            output(&delegation, flags.format)
        }
        DelegationCommands::Active {
            principal,
            scope,
            at,
        } => {
            let principal = user_id(ctx, principal).await?;
            let at = parse_optional_instant(at.as_deref())?;
            let delegations = ctx
                .service
                .find_active(&principal, scope.as_deref(), at)
                .await?;
            output(&DelegationListResponse { delegations }, flags.format)
        }
        DelegationCommands::Incoming { agent, at } => {
            let agent = user_id(ctx, agent).await?;
            let at = parse_optional_instant(at.as_deref())?;
            let delegations = ctx.service.find_incoming(&agent, at).await?;
            output(&DelegationListResponse { delegations }, flags.format)
        }
        DelegationCommands::RevokeAll { user, instance } => {
            let user = user_id(ctx, user).await?;
            let delegations = ctx
                .service
                .revoke_delegations(&user, instance.as_deref())
                .await?;
            output(&DelegationListResponse { delegations }, flags.format)
        }
        DelegationCommands::History { principal } => {
            let principal = user_id(ctx, principal).await?;
            let delegations = ctx.service.delegation_history(&principal).await?;
            output(&DelegationListResponse { delegations }, flags.format)
        }
        DelegationCommands::Graph { at } => {
            let at = parse_optional_instant(at.as_deref())?;
            let snapshot = ctx.service.graph_snapshot(at).await?;
            let mut delegations: Vec<Delegation> = snapshot.edges().cloned().collect();
            delegations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
            output(&DelegationListResponse { delegations }, flags.format)
        }
    }
}
