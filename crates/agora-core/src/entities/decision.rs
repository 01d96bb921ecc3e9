use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Position;

/// One append-only vote record. The newest record per (user, poll) is the
/// current decision.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Decision {
    pub id: String,
    pub user_id: String,
    pub poll_id: String,
    pub position: Position,
    pub created_at: DateTime<Utc>,
}
