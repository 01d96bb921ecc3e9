//! Engine orchestration: resolution, effective decisions and tallies over
//! snapshots loaded under one read gate.
//!
//! Nothing is cached between calls, so a revocation committed before a call
//! is always visible to it.

use agora_core::enums::Permission;
use agora_democracy::{EffectiveDecision, Resolution, Resolver, Tally, effective_decision, tally};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::DatabaseError;
use crate::helpers::now;
use crate::service::AgoraService;

impl AgoraService {
    /// Resolve `user_id` in `scope` (ID or key) at `at` (default now).
    ///
    /// A cycle is not an error: the resolution names the user as their own
    /// terminal and carries the cycle path.
    ///
    /// # Errors
    ///
    /// Returns `InvalidScope` for an unknown scope and `UserNotFound` for an
    /// unknown user.
    pub async fn resolve(
        &self,
        user_id: &str,
        scope: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Resolution, DatabaseError> {
        let _gate = self.read_gate().await;
        let conn = self.db().conn();
        let at = at.unwrap_or_else(now);
        let scope = self.require_scope_in(conn, scope).await?;
        self.get_user_in(conn, user_id).await?;

        let tree = self.scope_tree_in(conn).await?;
        let graph = self.graph_snapshot_in(conn, at).await?;
        Ok(Resolver::new(&tree, &graph).resolve(user_id, &scope.id)?)
    }

    /// The decision that counts for `user_id` on a poll at `at` (default the
    /// poll's tally instant).
    ///
    /// # Errors
    ///
    /// Returns `PollNotFound` for a missing or deleted poll and
    /// `UserNotFound` for an unknown user.
    pub async fn result_for(
        &self,
        user_id: &str,
        poll_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<EffectiveDecision, DatabaseError> {
        let _gate = self.read_gate().await;
        let conn = self.db().conn();
        let now = now();
        let poll = self.active_poll_in(conn, poll_id, now).await?;
        self.get_user_in(conn, user_id).await?;
        let at = at.unwrap_or_else(|| poll.tally_instant(now));

        let tree = self.scope_tree_in(conn).await?;
        let graph = self.graph_snapshot_in(conn, at).await?;
        let decisions = self.decision_set_in(conn, poll_id, at).await?;
        let resolver = Resolver::new(&tree, &graph);
        Ok(effective_decision(&resolver, &decisions, user_id, &poll.scope_id)?)
    }

    /// Count a poll at its tally instant: its end time once closed, else now.
    ///
    /// Every user with `vote.cast` in the poll scope at that instant counts
    /// once, through their own vote or the vote their chain resolves to.
    ///
    /// # Errors
    ///
    /// Returns `PollNotFound` for a missing or deleted poll.
    pub async fn tally(&self, poll_id: &str) -> Result<Tally, DatabaseError> {
        let _gate = self.read_gate().await;
        let conn = self.db().conn();
        let now = now();
        let poll = self.active_poll_in(conn, poll_id, now).await?;
        let at = poll.tally_instant(now);

        let tree = self.scope_tree_in(conn).await?;
        let access = self.access_index_in(conn, at).await?;
        let eligible = access.eligible(&tree, &poll.scope_id, at)?;
        let graph = self.graph_snapshot_in(conn, at).await?;
        let decisions = self.decision_set_in(conn, poll_id, at).await?;
        debug!(
            poll = %poll_id,
            eligible = eligible.len(),
            decisions = decisions.len(),
            edges = graph.len(),
            "tally snapshot loaded"
        );

        let resolver = Resolver::new(&tree, &graph);
        Ok(tally(&poll, &eligible, &resolver, &decisions, self.policy(), at)?)
    }

    /// Votes `user_id` carries in `scope`: 0 without `vote.cast`, else
    /// themselves plus everyone whose chain resolves to them.
    ///
    /// # Errors
    ///
    /// Returns `InvalidScope` for an unknown scope and `UserNotFound` for an
    /// unknown user.
    pub async fn votes_in_scope(
        &self,
        user_id: &str,
        scope: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<usize, DatabaseError> {
        let _gate = self.read_gate().await;
        let conn = self.db().conn();
        let at = at.unwrap_or_else(now);
        let scope = self.require_scope_in(conn, scope).await?;
        self.get_user_in(conn, user_id).await?;

        let tree = self.scope_tree_in(conn).await?;
        let access = self.access_index_in(conn, at).await?;
        if !access.can(&tree, user_id, Permission::VoteCast, &scope.id, at)? {
            return Ok(0);
        }
        let graph = self.graph_snapshot_in(conn, at).await?;
        Ok(Resolver::new(&tree, &graph).represented_count(user_id, &scope.id)?)
    }
}
