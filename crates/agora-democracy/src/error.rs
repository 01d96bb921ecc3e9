//! Democracy engine error types.

use agora_core::enums::Permission;
use thiserror::Error;

/// Errors raised by delegation, decision, and tally operations.
///
/// `DelegationCycle` is recoverable: the resolver reports cycles inside
/// [`crate::Resolution`] and only surfaces this variant to callers that ask
/// for a strict walk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DemocracyError {
    #[error("User {0} cannot delegate to themselves")]
    SelfDelegation(String),

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Delegation cycle: {}", .path.join(" -> "))]
    DelegationCycle { path: Vec<String> },

    #[error("Poll {0} is not open for voting")]
    PollClosed(String),

    #[error("Poll not found: {0}")]
    PollNotFound(String),

    #[error("Invalid position '{position}' for poll {poll_id}")]
    InvalidPosition { poll_id: String, position: String },

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User {user_id} lacks permission {permission} in scope {scope_id}")]
    PermissionDenied {
        user_id: String,
        permission: Permission,
        scope_id: String,
    },
}
