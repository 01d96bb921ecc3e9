use clap::Subcommand;

/// Scope tree commands.
#[derive(Clone, Debug, Subcommand)]
pub enum ScopeCommands {
    /// Create a scope. Without --parent it is an instance root.
    Create {
        key: String,
        #[arg(long)]
        title: String,
        /// Parent scope key or ID.
        #[arg(long)]
        parent: Option<String>,
    },
    /// Get a scope by key or ID.
    Get { scope: String },
    /// List scopes.
    List,
}
