use crate::context::AppContext;

/// Resolve a user name or ID to the user's ID.
pub async fn user_id(ctx: &AppContext, name_or_id: &str) -> anyhow::Result<String> {
    Ok(ctx.service.find_user(name_or_id).await?.id)
}
