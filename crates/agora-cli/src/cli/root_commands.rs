use clap::{Args, Subcommand};

use crate::cli::subcommands::{
    DelegationCommands, PollCommands, PositionCommands, ScopeCommands, UserCommands,
};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// User accounts and group memberships.
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
    /// Scope tree.
    Scope {
        #[command(subcommand)]
        action: ScopeCommands,
    },
    /// Delegation edges.
    Delegation {
        #[command(subcommand)]
        action: DelegationCommands,
    },
    /// Polls.
    Poll {
        #[command(subcommand)]
        action: PollCommands,
    },
    /// Record a position on a poll.
    Vote(VoteArgs),
    /// Inspect recorded and effective positions.
    Position {
        #[command(subcommand)]
        action: PositionCommands,
    },
    /// Resolve a user's delegation chain in a scope.
    Resolve(ResolveArgs),
    /// Count a poll.
    Tally(TallyArgs),
    /// Query the audit trail.
    Audit(AuditArgs),
}

#[derive(Clone, Debug, Args)]
pub struct VoteArgs {
    /// User name or ID.
    pub user: String,
    /// Poll ID.
    pub poll: String,
    /// adopt, reject, abstain, or an integer rating.
    #[arg(allow_hyphen_values = true)]
    pub position: String,
}

#[derive(Clone, Debug, Args)]
pub struct ResolveArgs {
    /// User name or ID.
    pub user: String,
    /// Scope key or ID.
    #[arg(long)]
    pub scope: String,
    /// Resolve as of this instant (RFC 3339 or YYYY-MM-DD).
    #[arg(long)]
    pub at: Option<String>,
    /// Fail instead of falling back to the user when the chain loops.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Clone, Debug, Args)]
pub struct TallyArgs {
    /// Poll ID.
    pub poll: String,
}

#[derive(Clone, Debug, Args)]
pub struct AuditArgs {
    /// Entity type: user, membership, scope, delegation, poll, decision.
    #[arg(long)]
    pub entity_type: Option<String>,
    #[arg(long)]
    pub entity_id: Option<String>,
    /// Action: created, updated, revoked, superseded, voted, ...
    #[arg(long)]
    pub action: Option<String>,
}
