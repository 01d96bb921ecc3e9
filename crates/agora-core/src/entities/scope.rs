use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A node in the scope tree: an instance (root), a topic, or a sub-topic.
///
/// The parent link is fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Scope {
    pub id: String,
    /// Unique human-readable key, e.g. `city` or `city/transport`.
    pub key: String,
    pub title: String,
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Scope {
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
