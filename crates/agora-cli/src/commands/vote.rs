use agora_core::enums::Position;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::VoteArgs;
use crate::commands::shared::lookup::user_id;
use crate::context::AppContext;
use crate::output::output;

/// Handle `agora vote`.
pub async fn handle(args: &VoteArgs, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    let position: Position = args.position.parse()?;
    let user = user_id(ctx, &args.user).await?;
    let decision = ctx.service.record_decision(&user, &args.poll, position).await?;
    output(&decision, flags.format)
}
