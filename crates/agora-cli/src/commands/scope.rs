use agora_core::entities::Scope;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ScopeCommands;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct ScopeListResponse {
    scopes: Vec<Scope>,
}

/// Handle `agora scope`.
pub async fn handle(
    action: &ScopeCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        ScopeCommands::Create { key, title, parent } => {
            let scope = ctx
                .service
                .create_scope(key, title, parent.as_deref())
                .await?;
            output(&scope, flags.format)
        }
        ScopeCommands::Get { scope } => {
            let scope = ctx.service.find_scope(scope).await?;
            output(&scope, flags.format)
        }
        ScopeCommands::List => {
            let scopes = ctx.service.list_scopes().await?;
            output(&ScopeListResponse { scopes }, flags.format)
        }
    }
}
