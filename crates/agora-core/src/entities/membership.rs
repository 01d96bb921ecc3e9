use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{Group, Permission};

/// A user's group in a scope. `scope_id == None` is a global membership.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Membership {
    pub id: String,
    pub user_id: String,
    pub scope_id: Option<String>,
    pub group: Group,
    pub created_at: DateTime<Utc>,
    pub expire_time: Option<DateTime<Utc>>,
}

impl Membership {
    #[must_use]
    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        self.expire_time.is_some_and(|expires| expires <= at)
    }

    /// Whether this membership grants `permission` at `at`, ignoring scope.
    #[must_use]
    pub fn grants(&self, permission: Permission, at: DateTime<Utc>) -> bool {
        !self.is_expired(at) && self.group.grants(permission)
    }
}
