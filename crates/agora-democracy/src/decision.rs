//! Decision engine: direct votes combined with delegated stance.

use std::collections::HashMap;

use agora_core::entities::{Decision, Poll};
use agora_core::enums::Position;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::DemocracyError;
use crate::graph::DelegationGraph;
use crate::resolver::Resolver;

/// Current decisions on one poll at one instant: the newest record per user.
#[derive(Debug, Clone, Default)]
pub struct DecisionSet {
    current: HashMap<String, Decision>,
}

impl DecisionSet {
    /// Keep, per user, the newest record for `poll_id` created at or before `at`.
    pub fn new(
        poll_id: &str,
        records: impl IntoIterator<Item = Decision>,
        at: DateTime<Utc>,
    ) -> Self {
        let mut current: HashMap<String, Decision> = HashMap::new();
        for record in records {
            if record.poll_id != poll_id || record.created_at > at {
                continue;
            }
            let newer = current.get(&record.user_id).is_none_or(|existing| {
                (record.created_at, &record.id) > (existing.created_at, &existing.id)
            });
            if newer {
                current.insert(record.user_id.clone(), record);
            }
        }
        Self { current }
    }

    #[must_use]
    pub fn get(&self, user: &str) -> Option<&Decision> {
        self.current.get(user)
    }

    #[must_use]
    pub fn has(&self, user: &str) -> bool {
        self.current.contains_key(user)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

/// Fail with `PollClosed` unless `poll` accepts votes at `at`.
///
/// # Errors
///
/// Returns `DemocracyError::PollClosed` before `begin_time`, from
/// `end_time` on, and once deleted.
pub fn ensure_open(poll: &Poll, at: DateTime<Utc>) -> Result<(), DemocracyError> {
    if poll.is_open(at) {
        Ok(())
    } else {
        Err(DemocracyError::PollClosed(poll.id.clone()))
    }
}

/// Fail with `InvalidPosition` unless `position` lies in the poll's domain.
///
/// # Errors
///
/// Returns `DemocracyError::InvalidPosition` for a rating on an adopt/repeal
/// poll, a binary position on a rate poll, or a rating out of range.
pub fn validate_position(poll: &Poll, position: Position) -> Result<(), DemocracyError> {
    if poll.kind.accepts(position) {
        Ok(())
    } else {
        Err(DemocracyError::InvalidPosition {
            poll_id: poll.id.clone(),
            position: position.to_string(),
        })
    }
}

/// How a user's vote on a poll is determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EffectiveDecision {
    /// The user voted directly.
    Own { decision: Decision },
    /// A delegate down the chain voted.
    Delegated {
        decision: Decision,
        terminal_id: String,
        chain: Vec<String>,
    },
    /// Nobody on the chain voted.
    Undecided {
        terminal_id: String,
        chain: Vec<String>,
    },
    /// The chain loops before reaching anyone who voted. Counts as abstain.
    Cycle { cycle: Vec<String> },
}

impl EffectiveDecision {
    #[must_use]
    pub const fn position(&self) -> Option<Position> {
        match self {
            Self::Own { decision } | Self::Delegated { decision, .. } => Some(decision.position),
            Self::Cycle { .. } => Some(Position::Abstain),
            Self::Undecided { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_delegated(&self) -> bool {
        matches!(self, Self::Delegated { .. })
    }
}

/// The decision that counts for `user` in `scope`.
///
/// Walks the delegation chain and stops at the first user with a current
/// decision, so an intermediate delegate who voted decides for everyone
/// routed through them.
///
/// # Errors
///
/// Returns `DemocracyError::InvalidScope` for an unknown scope.
pub fn effective_decision<G: DelegationGraph>(
    resolver: &Resolver<'_, G>,
    decisions: &DecisionSet,
    user: &str,
    scope: &str,
) -> Result<EffectiveDecision, DemocracyError> {
    if let Some(own) = decisions.get(user) {
        return Ok(EffectiveDecision::Own {
            decision: own.clone(),
        });
    }

    let walk = resolver.resolve_until(user, scope, |u| decisions.has(u))?;
    if let Some(cycle) = walk.cycle {
        return Ok(EffectiveDecision::Cycle { cycle });
    }
    Ok(match decisions.get(&walk.terminal_id) {
        Some(decision) => EffectiveDecision::Delegated {
            decision: decision.clone(),
            terminal_id: walk.terminal_id,
            chain: walk.chain,
        },
        None => EffectiveDecision::Undecided {
            terminal_id: walk.terminal_id,
            chain: walk.chain,
        },
    })
}
