use clap::Subcommand;

/// Poll commands.
#[derive(Clone, Debug, Subcommand)]
pub enum PollCommands {
    /// Create a poll.
    Create {
        /// Creator name or ID.
        #[arg(long)]
        creator: String,
        /// Scope key or ID.
        #[arg(long)]
        scope: String,
        #[arg(long)]
        subject: String,
        /// adopt, repeal, or rate.
        #[arg(long, default_value = "adopt")]
        kind: String,
        /// Lowest rating (rate polls; defaults from config).
        #[arg(long, allow_hyphen_values = true)]
        min: Option<i64>,
        /// Highest rating (rate polls; defaults from config).
        #[arg(long, allow_hyphen_values = true)]
        max: Option<i64>,
        #[arg(long)]
        begin: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Get a poll.
    Get { id: String },
    /// List polls, optionally in a scope and its sub-scopes.
    List {
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        include_deleted: bool,
    },
    /// Close a poll.
    Close {
        id: String,
        #[arg(long)]
        at: Option<String>,
    },
    /// Delete a poll.
    Delete { id: String },
}
