use agora_core::entities::Decision;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::PositionCommands;
use crate::commands::shared::lookup::user_id;
use crate::commands::shared::parse::parse_optional_instant;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct DecisionListResponse {
    decisions: Vec<Decision>,
}

/// Handle `agora position`.
pub async fn handle(
    action: &PositionCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        PositionCommands::Effective { user, poll, at } => {
            let user = user_id(ctx, user).await?;
            let at = parse_optional_instant(at.as_deref())?;
            let effective = ctx.service.result_for(&user, poll, at).await?;
            output(&effective, flags.format)
        }
        PositionCommands::Current { user, poll } => {
            let user = user_id(ctx, user).await?;
            let decision = ctx.service.current_decision(&user, poll).await?;
            output(&decision, flags.format)
        }
        PositionCommands::History { user, poll } => {
            let user = user_id(ctx, user).await?;
            let decisions = ctx.service.decision_history(&user, poll).await?;
            output(&DecisionListResponse { decisions }, flags.format)
        }
        PositionCommands::List { user } => {
            let user = user_id(ctx, user).await?;
            let decisions = ctx.service.decisions_for_user(&user).await?;
            output(&DecisionListResponse { decisions }, flags.format)
        }
    }
}
