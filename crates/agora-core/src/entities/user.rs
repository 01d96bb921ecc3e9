use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::locale::Locale;

/// A user account. The password hash and pending activation code stay in
/// storage and are never part of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub user_name: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    /// `true` once the current email has been confirmed.
    pub email_activated: bool,
    pub locale: Option<Locale>,
    pub created_at: DateTime<Utc>,
    pub access_time: Option<DateTime<Utc>>,
    pub delete_time: Option<DateTime<Utc>>,
}

impl User {
    /// Trimmed display name when non-blank, else the user name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.user_name)
    }

    #[must_use]
    pub fn is_deleted(&self, at: DateTime<Utc>) -> bool {
        self.delete_time.is_some_and(|deleted| deleted <= at)
    }

    #[must_use]
    pub const fn is_email_activated(&self) -> bool {
        self.email.is_some() && self.email_activated
    }
}
