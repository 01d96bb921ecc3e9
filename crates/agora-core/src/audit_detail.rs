//! Typed audit detail payloads.
//!
//! Each audit action can carry a structured `detail` JSON blob. These types
//! give the common shapes a schema.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{Group, Position};

/// Detail for `AuditAction::Created` on a delegation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DelegationCreatedDetail {
    pub principal_id: String,
    pub agent_id: String,
    pub scope_id: String,
    /// The edge this one replaced on the same exact scope, if any.
    pub supersedes: Option<String>,
}

/// Detail for `AuditAction::Revoked` and `AuditAction::Superseded`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DelegationRevokedDetail {
    pub revoke_time: DateTime<Utc>,
    pub reason: RevokeReason,
}

/// Why a delegation stopped being active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RevokeReason {
    Withdrawn,
    Superseded,
    PermissionLost,
    AccountDeleted,
}

/// Detail for `AuditAction::GroupChanged`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct GroupChangedDetail {
    pub scope_id: Option<String>,
    pub from: Option<Group>,
    pub to: Group,
    /// Delegations revoked because the user lost `vote.cast`.
    pub revoked_delegations: u32,
}

/// Detail for `AuditAction::Voted`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct VotedDetail {
    pub poll_id: String,
    pub position: Position,
    pub previous: Option<Position>,
}

/// Detail for `AuditAction::Updated`: names of the changed fields.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct UpdatedDetail {
    pub fields: Vec<String>,
}
