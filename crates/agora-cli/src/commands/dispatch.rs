use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;
use crate::context::AppContext;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(command: Commands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::User { action } => commands::user::handle(&action, ctx, flags).await,
        Commands::Scope { action } => commands::scope::handle(&action, ctx, flags).await,
        Commands::Delegation { action } => commands::delegation::handle(&action, ctx, flags).await,
        Commands::Poll { action } => commands::poll::handle(&action, ctx, flags).await,
        Commands::Vote(args) => commands::vote::handle(&args, ctx, flags).await,
        Commands::Position { action } => commands::position::handle(&action, ctx, flags).await,
        Commands::Resolve(args) => commands::resolve::handle(&args, ctx, flags).await,
        Commands::Tally(args) => commands::tally::handle(&args, ctx, flags).await,
        Commands::Audit(args) => commands::audit::handle(&args, ctx, flags).await,
    }
}

#[cfg(test)]
mod tests {
    use agora_config::{AgoraConfig, DatabaseConfig};
    use agora_core::enums::Group;
    use clap::Parser;

    use super::dispatch;
    use crate::cli::Cli;
    use crate::context::AppContext;

    async fn memory_context() -> AppContext {
        let config = AgoraConfig {
            database: DatabaseConfig {
                path: ":memory:".into(),
            },
            ..AgoraConfig::default()
        };
        AppContext::init(config).await.expect("context should open")
    }

    async fn run(ctx: &AppContext, args: &[&str]) -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(std::iter::once("agora").chain(args.iter().copied()))?;
        let flags = cli.global_flags();
        dispatch(cli.command, ctx, &flags).await
    }

    #[tokio::test]
    async fn delegate_vote_and_tally_by_name() {
        let ctx = memory_context().await;
        run(&ctx, &["--format", "raw", "scope", "create", "city", "--title", "City"])
            .await
            .expect("scope");
        for name in ["alice", "bob"] {
            run(&ctx, &["--format", "raw", "user", "create", name]).await.expect("user");
            run(&ctx, &["--format", "raw", "user", "group", name, "voter", "--scope", "city"])
                .await
                .expect("group");
        }
        run(&ctx, &["--format", "raw", "delegation", "create", "alice", "bob", "--scope", "city"])
            .await
            .expect("delegate");

        let bob = ctx.service.find_user("bob").await.expect("bob");
        let alice = ctx.service.find_user("alice").await.expect("alice");
        let memberships = ctx.service.memberships_for(&bob.id, false).await.expect("memberships");
        assert_eq!(memberships[0].group, Group::Voter);

        let poll = ctx
            .service
            .create_poll(agora_db::repos::poll::NewPoll {
                creator_id: bob.id.clone(),
                scope: "city".into(),
                subject: "Plant more trees".into(),
                kind: agora_core::enums::PollKind::Adopt,
                begin_time: None,
                end_time: None,
            })
            .await
            .expect("poll");
        run(&ctx, &["--format", "raw", "vote", "bob", &poll.id, "yes"]).await.expect("vote");
        run(&ctx, &["--format", "raw", "resolve", "alice", "--scope", "city", "--strict"])
            .await
            .expect("resolve");

        let tally = ctx.service.tally(&poll.id).await.expect("tally");
        assert_eq!(tally.adopt, 2);
        let effective = ctx.service.result_for(&alice.id, &poll.id, None).await.expect("effective");
        assert!(effective.is_delegated());
    }

    #[tokio::test]
    async fn unknown_user_is_an_error() {
        let ctx = memory_context().await;
        let err = run(&ctx, &["delegation", "history", "nobody"]).await.expect_err("missing user");
        assert!(err.to_string().contains("nobody"));
    }
}
