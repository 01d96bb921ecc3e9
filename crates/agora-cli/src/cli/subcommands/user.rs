use clap::Subcommand;

/// User account commands. `user` arguments take a user name or ID.
#[derive(Clone, Debug, Subcommand)]
pub enum UserCommands {
    /// Create a user.
    Create {
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Get a user.
    Get { user: String },
    /// List users by name.
    List {
        #[arg(long)]
        include_deleted: bool,
    },
    /// Complete a user name prefix.
    Complete { prefix: String },
    /// Update profile fields.
    Update {
        user: String,
        #[arg(long, conflicts_with = "clear_display_name")]
        display_name: Option<String>,
        #[arg(long)]
        clear_display_name: bool,
        #[arg(long, conflicts_with = "clear_bio")]
        bio: Option<String>,
        #[arg(long)]
        clear_bio: bool,
        /// Locale such as `de_DE` or `en`.
        #[arg(long, conflicts_with = "clear_locale")]
        locale: Option<String>,
        #[arg(long)]
        clear_locale: bool,
    },
    /// Replace the password.
    Password {
        user: String,
        #[arg(long)]
        password: String,
    },
    /// Check a password and record the access time.
    Login {
        user: String,
        #[arg(long)]
        password: String,
    },
    /// Set or clear the email address. Prints the activation code.
    Email {
        user: String,
        /// Omit to clear the address.
        #[arg(long)]
        email: Option<String>,
    },
    /// Confirm an email address with its activation code.
    Activate { user: String, code: String },
    /// Delete a user and revoke their delegations.
    Delete { user: String },
    /// Set the user's group in an instance (global without --scope).
    Group {
        user: String,
        /// default, observer, voter, supervisor, admin.
        group: String,
        #[arg(long)]
        scope: Option<String>,
    },
    /// List group memberships.
    Memberships {
        user: String,
        #[arg(long)]
        include_expired: bool,
    },
    /// Check a permission in a scope.
    Can {
        user: String,
        /// vote.cast, delegation.create, delegation.show, poll.create, ...
        permission: String,
        #[arg(long)]
        scope: String,
    },
}
