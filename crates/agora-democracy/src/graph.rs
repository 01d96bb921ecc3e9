//! Delegation graph snapshots.

use std::collections::HashMap;

use agora_core::entities::Delegation;
use chrono::{DateTime, Utc};

/// Read access to the active delegation edges at one instant.
pub trait DelegationGraph {
    /// Active edges where `principal` delegates.
    fn outgoing(&self, principal: &str) -> &[Delegation];

    /// Active edges where `agent` receives.
    fn incoming(&self, agent: &str) -> &[Delegation];
}

/// Active edges at `at`, indexed in both directions.
///
/// Built from one read of the edge store, so a walk over it never observes a
/// concurrent write.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    by_principal: HashMap<String, Vec<Delegation>>,
    by_agent: HashMap<String, Vec<Delegation>>,
    edges: usize,
}

impl GraphSnapshot {
    /// Keep the edges of `delegations` that are active at `at`.
    pub fn new(delegations: impl IntoIterator<Item = Delegation>, at: DateTime<Utc>) -> Self {
        let mut snapshot = Self::default();
        for edge in delegations.into_iter().filter(|d| d.is_active(at)) {
            snapshot
                .by_agent
                .entry(edge.agent_id.clone())
                .or_default()
                .push(edge.clone());
            snapshot
                .by_principal
                .entry(edge.principal_id.clone())
                .or_default()
                .push(edge);
            snapshot.edges += 1;
        }
        snapshot
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.edges
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.edges == 0
    }

    /// All active edges, grouped by principal.
    pub fn edges(&self) -> impl Iterator<Item = &Delegation> {
        self.by_principal.values().flatten()
    }
}

impl DelegationGraph for GraphSnapshot {
    fn outgoing(&self, principal: &str) -> &[Delegation] {
        self.by_principal.get(principal).map(Vec::as_slice).unwrap_or_default()
    }

    fn incoming(&self, agent: &str) -> &[Delegation] {
        self.by_agent.get(agent).map(Vec::as_slice).unwrap_or_default()
    }
}
