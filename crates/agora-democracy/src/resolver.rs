//! Delegation resolution.
//!
//! A walk starts at a user and repeatedly follows the user's *selected* edge
//! for the target scope: among active edges whose scope contains the target,
//! the most specific wins, then the most recent, then the greatest ID. The
//! walk ends at a user without a selected edge (the terminal), or earlier when
//! a caller-supplied predicate says so. A visited set guards every hop, so a
//! walk takes at most one step per distinct user.

use std::collections::HashSet;

use agora_core::entities::Delegation;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DemocracyError;
use crate::graph::DelegationGraph;
use crate::scope::ScopeTree;

/// Outcome of one walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Walk {
    /// The user whose stance decides. On a cycle this is the starting user.
    pub terminal_id: String,
    /// Users visited, starting user first, terminal last.
    pub chain: Vec<String>,
    /// IDs of the edges followed, one per hop.
    pub delegations: Vec<String>,
    /// The offending path when the walk ran into a cycle.
    pub cycle: Option<Vec<String>>,
}

impl Walk {
    #[must_use]
    pub fn is_delegated(&self) -> bool {
        !self.delegations.is_empty()
    }
}

/// Full answer for `(user, scope, at)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Resolution {
    pub user_id: String,
    pub scope_id: String,
    pub terminal_id: String,
    pub chain: Vec<String>,
    pub delegations: Vec<String>,
    /// Votes `user_id` carries in the scope: itself plus every principal
    /// whose selected edges route through it. Always 1 on a cycle.
    pub represented_count: usize,
    pub cycle: Option<Vec<String>>,
}

impl Resolution {
    /// Turn a detected cycle into an error.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::DelegationCycle` when the walk hit a cycle.
    pub fn into_acyclic(self) -> Result<Self, DemocracyError> {
        match self.cycle {
            Some(path) => Err(DemocracyError::DelegationCycle { path }),
            None => Ok(self),
        }
    }
}

pub struct Resolver<'a, G> {
    scopes: &'a ScopeTree,
    graph: &'a G,
}

impl<'a, G: DelegationGraph> Resolver<'a, G> {
    #[must_use]
    pub const fn new(scopes: &'a ScopeTree, graph: &'a G) -> Self {
        Self { scopes, graph }
    }

    /// The edge `principal` follows for `scope`, if any.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` if `scope` or an edge scope is
    /// not in the tree.
    pub fn select_edge(
        &self,
        principal: &str,
        scope: &str,
    ) -> Result<Option<&'a Delegation>, DemocracyError> {
        let mut best: Option<(usize, &'a Delegation)> = None;
        for edge in self.graph.outgoing(principal) {
            if !self.scopes.contains(&edge.scope_id, scope)? {
                continue;
            }
            let depth = self.scopes.specificity(&edge.scope_id)?;
            let better = best.is_none_or(|(best_depth, current)| {
                (depth, edge.created_at, &edge.id) > (best_depth, current.created_at, &current.id)
            });
            if better {
                best = Some((depth, edge));
            }
        }
        Ok(best.map(|(_, edge)| edge))
    }

    /// Walk from `user` until a user without a selected edge.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` for an unknown scope.
    pub fn walk(&self, user: &str, scope: &str) -> Result<Walk, DemocracyError> {
        self.resolve_until(user, scope, |_| false)
    }

    /// Walk from `user`, stopping at the first user for which `stop` holds
    /// (the starting user included).
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` for an unknown scope.
    pub fn resolve_until<F>(&self, user: &str, scope: &str, stop: F) -> Result<Walk, DemocracyError>
    where
        F: Fn(&str) -> bool,
    {
        self.scopes.specificity(scope)?;

        let mut visited: HashSet<&str> = HashSet::from([user]);
        let mut chain = vec![user.to_string()];
        let mut delegations = Vec::new();
        let mut current = user;

        loop {
            if stop(current) {
                break;
            }
            let Some(edge) = self.select_edge(current, scope)? else {
                break;
            };
            let agent = edge.agent_id.as_str();
            if !visited.insert(agent) {
                let mut path = chain;
                path.push(agent.to_string());
                warn!(user, scope, cycle = %path.join(" -> "), "delegation cycle; falling back to own stance");
                return Ok(Walk {
                    terminal_id: user.to_string(),
                    chain: vec![user.to_string()],
                    delegations: Vec::new(),
                    cycle: Some(path),
                });
            }
            debug!(from = current, to = agent, delegation = %edge.id, "following delegation");
            chain.push(agent.to_string());
            delegations.push(edge.id.clone());
            current = agent;
        }

        Ok(Walk {
            terminal_id: current.to_string(),
            chain,
            delegations,
            cycle: None,
        })
    }

    /// Resolve `user` in `scope` with its represented count.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` for an unknown scope.
    pub fn resolve(&self, user: &str, scope: &str) -> Result<Resolution, DemocracyError> {
        let walk = self.walk(user, scope)?;
        let represented_count = if walk.cycle.is_some() {
            1
        } else {
            self.represented_count(user, scope)?
        };
        Ok(Resolution {
            user_id: user.to_string(),
            scope_id: scope.to_string(),
            terminal_id: walk.terminal_id,
            chain: walk.chain,
            delegations: walk.delegations,
            represented_count,
            cycle: walk.cycle,
        })
    }

    /// 1 + every principal reachable from `agent` through incoming edges that
    /// are each principal's selected edge for `scope`.
    ///
    /// For a terminal agent this equals the number of users whose walk ends
    /// at it.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` for an unknown scope.
    pub fn represented_count(&self, agent: &str, scope: &str) -> Result<usize, DemocracyError> {
        self.scopes.specificity(scope)?;

        let mut visited: HashSet<&str> = HashSet::from([agent]);
        let mut stack = vec![agent];
        while let Some(current) = stack.pop() {
            for edge in self.graph.incoming(current) {
                let principal = edge.principal_id.as_str();
                if visited.contains(principal) {
                    continue;
                }
                let selected = self.select_edge(principal, scope)?;
                if selected.is_some_and(|s| s.id == edge.id) {
                    visited.insert(principal);
                    stack.push(principal);
                }
            }
        }
        Ok(visited.len())
    }
}
