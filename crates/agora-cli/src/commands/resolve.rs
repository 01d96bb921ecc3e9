use agora_democracy::Resolution;
use chrono::Utc;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ResolveArgs;
use crate::commands::shared::lookup::user_id;
use crate::commands::shared::parse::parse_optional_instant;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct ResolveResponse {
    #[serde(flatten)]
    resolution: Resolution,
    /// Zero when the user cannot vote in the scope.
    votes_in_scope: usize,
}

/// Handle `agora resolve`.
pub async fn handle(
    args: &ResolveArgs,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let response = resolve(args, ctx).await?;
    output(&response, flags.format)
}

/// Both lookups run at the same instant so their counts agree.
async fn resolve(args: &ResolveArgs, ctx: &AppContext) -> anyhow::Result<ResolveResponse> {
    let user = user_id(ctx, &args.user).await?;
    let at = parse_optional_instant(args.at.as_deref())?.unwrap_or_else(Utc::now);
    let resolution = ctx.service.resolve(&user, &args.scope, Some(at)).await?;
    let resolution = if args.strict {
        resolution.into_acyclic()?
    } else {
        resolution
    };
    let votes_in_scope = ctx
        .service
        .votes_in_scope(&user, &args.scope, Some(at))
        .await?;
    Ok(ResolveResponse {
        resolution,
        votes_in_scope,
    })
}
