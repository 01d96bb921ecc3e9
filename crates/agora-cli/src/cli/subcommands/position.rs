use clap::Subcommand;

/// Position inspection commands.
#[derive(Clone, Debug, Subcommand)]
pub enum PositionCommands {
    /// The decision that counts for a user, their own or delegated.
    Effective {
        user: String,
        poll: String,
        #[arg(long)]
        at: Option<String>,
    },
    /// The user's own current decision.
    Current { user: String, poll: String },
    /// Every decision the user recorded on a poll, oldest first.
    History { user: String, poll: String },
    /// The user's current decision on every poll.
    List { user: String },
}
