use clap::Subcommand;

/// Delegation commands. User arguments take a name or ID; scopes a key or ID;
/// instants RFC 3339 or `YYYY-MM-DD`.
#[derive(Clone, Debug, Subcommand)]
pub enum DelegationCommands {
    /// Delegate `principal`'s vote to `agent` in a scope.
    Create {
        principal: String,
        agent: String,
        #[arg(long)]
        scope: String,
    },
    /// Revoke a delegation.
    Revoke {
        id: String,
        #[arg(long)]
        at: Option<String>,
    },
    /// Get a delegation by ID.
    Get { id: String },
    /// Outgoing edges of a user, optionally only those covering a scope.
    Active {
        principal: String,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        at: Option<String>,
    },
    /// Incoming edges of a user.
    Incoming {
        agent: String,
        #[arg(long)]
        at: Option<String>,
    },
    /// Revoke every active edge of a user in both directions.
    RevokeAll {
        user: String,
        /// Limit to one instance (scope key or ID).
        #[arg(long)]
        instance: Option<String>,
    },
    /// All edges a user ever created.
    History { principal: String },
    /// Every edge active at an instant.
    Graph {
        #[arg(long)]
        at: Option<String>,
    },
}
