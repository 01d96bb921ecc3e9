use agora_core::entities::{Membership, User};
use agora_core::enums::{Group, Permission};
use agora_core::locale::Locale;
use agora_db::updates::user::UserUpdateBuilder;
use anyhow::bail;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::UserCommands;
use crate::commands::shared::limit::effective_limit;
use crate::commands::shared::lookup::user_id;
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct UserListResponse {
    users: Vec<User>,
}

#[derive(Debug, Serialize)]
struct MembershipListResponse {
    memberships: Vec<Membership>,
}

#[derive(Debug, Serialize)]
struct EmailResponse {
    user_id: String,
    activation_code: Option<String>,
}

#[derive(Debug, Serialize)]
struct PermissionResponse {
    user_id: String,
    permission: Permission,
    scope: String,
    granted: bool,
}

/// Handle `agora user`.
pub async fn handle(
    action: &UserCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let limit = effective_limit(flags.limit, ctx.default_limit());
    match action {
        UserCommands::Create {
            name,
            email,
            password,
        } => {
            let user = ctx
                .service
                .create_user(name, email.as_deref(), password.as_deref())
                .await?;
            output(&user, flags.format)
        }
        UserCommands::Get { user } => {
            let user = ctx.service.find_user(user).await?;
            output(&user, flags.format)
        }
        UserCommands::List { include_deleted } => {
            let users = ctx.service.list_users(*include_deleted, limit).await?;
            output(&UserListResponse { users }, flags.format)
        }
        UserCommands::Complete { prefix } => {
            let users = ctx.service.complete_users(prefix, limit).await?;
            output(&UserListResponse { users }, flags.format)
        }
        UserCommands::Update {
            user,
            display_name,
            clear_display_name,
            bio,
            clear_bio,
            locale,
            clear_locale,
        } => {
            let id = user_id(ctx, user).await?;
            let mut builder = UserUpdateBuilder::new();
            if display_name.is_some() || *clear_display_name {
                builder = builder.display_name(display_name.clone());
            }
            if bio.is_some() || *clear_bio {
                builder = builder.bio(bio.clone());
            }
            if locale.is_some() || *clear_locale {
                let parsed = locale.as_deref().map(str::parse::<Locale>).transpose()?;
                builder = builder.locale(parsed);
            }
            let update = builder.build();
            if update.is_empty() {
                bail!("nothing to update: pass --display-name, --bio, --locale, or a --clear-* flag");
            }
            let user = ctx.service.update_user(&id, update).await?;
            output(&user, flags.format)
        }
        UserCommands::Password { user, password } => {
            let id = user_id(ctx, user).await?;
            ctx.service.set_password(&id, password).await?;
            output(&serde_json::json!({ "user_id": id, "password_set": true }), flags.format)
        }
        UserCommands::Login { user, password } => {
            let Some(user) = ctx.service.authenticate(user, password).await? else {
                bail!("invalid user name or password");
            };
            output(&user, flags.format)
        }
        UserCommands::Email { user, email } => {
            let id = user_id(ctx, user).await?;
            let activation_code = ctx.service.set_email(&id, email.as_deref()).await?;
            output(
                &EmailResponse {
                    user_id: id,
                    activation_code,
                },
                flags.format,
            )
        }
        UserCommands::Activate { user, code } => {
            let id = user_id(ctx, user).await?;
            let user = ctx.service.activate_email(&id, code).await?;
            output(&user, flags.format)
        }
        UserCommands::Delete { user } => {
            let id = user_id(ctx, user).await?;
            let user = ctx.service.delete_user(&id).await?;
            output(&user, flags.format)
        }
        UserCommands::Group { user, group, scope } => {
            let id = user_id(ctx, user).await?;
            let group = parse_enum::<Group>(group, "group")?;
            let membership = ctx.service.set_group(&id, scope.as_deref(), group).await?;
            output(&membership, flags.format)
        }
        UserCommands::Memberships {
            user,
            include_expired,
        } => {
            let id = user_id(ctx, user).await?;
            let memberships = ctx.service.memberships_for(&id, *include_expired).await?;
            output(&MembershipListResponse { memberships }, flags.format)
        }
        UserCommands::Can {
            user,
            permission,
            scope,
        } => {
            let id = user_id(ctx, user).await?;
            let permission = parse_enum::<Permission>(permission, "permission")?;
            let scope_id = ctx.service.find_scope(scope).await?.id;
            let granted = ctx.service.has_permission(&id, permission, &scope_id).await?;
            output(
                &PermissionResponse {
                    user_id: id,
                    permission,
                    scope: scope_id,
                    granted,
                },
                flags.format,
            )
        }
    }
}
