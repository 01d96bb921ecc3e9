use agora_core::entities::Poll;
use agora_core::enums::PollKind;
use agora_db::repos::poll::NewPoll;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::PollCommands;
use crate::commands::shared::limit::effective_limit;
use crate::commands::shared::lookup::user_id;
use crate::commands::shared::parse::parse_optional_instant;
use crate::context::AppContext;
use crate::output::output;

#[derive(Debug, Serialize)]
struct PollListResponse {
    polls: Vec<Poll>,
}

/// Handle `agora poll`.
pub async fn handle(
    action: &PollCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        PollCommands::Create {
            creator,
            scope,
            subject,
            kind,
            min,
            max,
            begin,
            end,
        } => {
            let (default_min, default_max) = ctx.service.default_rating_range();
            let kind = poll_kind(kind, *min, *max, (default_min, default_max))?;
            let new = NewPoll {
                creator_id: user_id(ctx, creator).await?,
                scope: scope.clone(),
                subject: subject.clone(),
                kind,
                begin_time: parse_optional_instant(begin.as_deref())?,
                end_time: parse_optional_instant(end.as_deref())?,
            };
            let poll = ctx.service.create_poll(new).await?;
            output(&poll, flags.format)
        }
        PollCommands::Get { id } => {
            let poll = ctx.service.get_poll(id).await?;
            output(&poll, flags.format)
        }
        PollCommands::List {
            scope,
            include_deleted,
        } => {
            let limit = effective_limit(flags.limit, ctx.default_limit());
            let polls = ctx
                .service
                .list_polls(scope.as_deref(), *include_deleted, limit)
                .await?;
            output(&PollListResponse { polls }, flags.format)
        }
        PollCommands::Close { id, at } => {
            let at = parse_optional_instant(at.as_deref())?;
            let poll = ctx.service.close_poll(id, at).await?;
            output(&poll, flags.format)
        }
        PollCommands::Delete { id } => {
            let poll = ctx.service.delete_poll(id).await?;
            output(&poll, flags.format)
        }
    }
}

/// Rate polls fall back to the configured range for missing bounds.
fn poll_kind(
    kind: &str,
    min: Option<i64>,
    max: Option<i64>,
    defaults: (i64, i64),
) -> anyhow::Result<PollKind> {
    let kind = kind.trim().to_ascii_lowercase();
    let (min, max) = if kind == "rate" {
        (Some(min.unwrap_or(defaults.0)), Some(max.unwrap_or(defaults.1)))
    } else {
        (min, max)
    };
    Ok(PollKind::from_parts(&kind, min, max)?)
}

#[cfg(test)]
mod tests {
    use agora_core::enums::PollKind;
    use pretty_assertions::assert_eq;

    use super::poll_kind;

    #[test]
    fn rate_bounds_default_from_config() {
        assert_eq!(
            poll_kind("rate", None, Some(5), (-1, 1)).expect("rate"),
            PollKind::Rate { min: -1, max: 5 }
        );
        assert_eq!(
            poll_kind("Rate", None, None, (-1, 1)).expect("rate"),
            PollKind::Rate { min: -1, max: 1 }
        );
    }

    #[test]
    fn binary_kinds_ignore_bounds() {
        assert_eq!(poll_kind("repeal", Some(3), None, (-1, 1)).expect("repeal"), PollKind::Repeal);
        assert!(poll_kind("referendum", None, None, (-1, 1)).is_err());
        assert!(poll_kind("rate", Some(5), Some(1), (-1, 1)).is_err());
    }
}
