//! Delegation edge store.
//!
//! Edges are never deleted: withdrawal, supersession and permission loss
//! set `revoke_time`. At most one edge per principal and exact scope has no
//! revoke time, enforced by a partial unique index.

use agora_core::audit_detail::{DelegationCreatedDetail, DelegationRevokedDetail, RevokeReason};
use agora_core::entities::{Delegation, Scope};
use agora_core::enums::{AuditAction, EntityType, Permission};
use agora_core::errors::CoreError;
use agora_core::ids::PREFIX_DELEGATION;
use agora_democracy::{DemocracyError, GraphSnapshot};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::helpers::{format_datetime, get_opt_datetime, now, parse_datetime, to_detail};
use crate::service::AgoraService;

const SELECT_COLS: &str = "id, principal_id, agent_id, scope_id, created_at, revoke_time";

/// Edges active at `?1`.
const ACTIVE_AT: &str = "created_at <= ?1 AND (revoke_time IS NULL OR revoke_time > ?1)";

fn row_to_delegation(row: &libsql::Row) -> Result<Delegation, DatabaseError> {
    Ok(Delegation {
        id: row.get::<String>(0)?,
        principal_id: row.get::<String>(1)?,
        agent_id: row.get::<String>(2)?,
        scope_id: row.get::<String>(3)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
        revoke_time: get_opt_datetime(row, 5)?,
    })
}

async fn collect(mut rows: libsql::Rows) -> Result<Vec<Delegation>, DatabaseError> {
    let mut edges = Vec::new();
    while let Some(row) = rows.next().await? {
        edges.push(row_to_delegation(&row)?);
    }
    Ok(edges)
}

impl AgoraService {
    /// Let `agent_id` decide for `principal_id` inside `scope` (ID or key).
    ///
    /// Every check runs before the first write. An open edge from the
    /// principal on the same exact scope is superseded in the same
    /// transaction; re-delegating to the same agent returns that edge.
    ///
    /// # Errors
    ///
    /// In check order: `SelfDelegation`, `InvalidScope`, `UserNotFound`
    /// (missing or deleted principal or agent), and `PermissionDenied` when
    /// the principal lacks `delegation.create` or the agent lacks
    /// `vote.cast` in the scope.
    pub async fn create_delegation(
        &self,
        principal_id: &str,
        agent_id: &str,
        scope: &str,
    ) -> Result<Delegation, DatabaseError> {
        if principal_id == agent_id {
            return Err(DemocracyError::SelfDelegation(principal_id.to_string()).into());
        }

        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<Delegation, DatabaseError> = async {
            let now = now();
            let scope = self.require_scope_in(&tx, scope).await?;
            self.live_user_in(&tx, principal_id, now).await?;
            self.live_user_in(&tx, agent_id, now).await?;

            let tree = self.scope_tree_in(&tx).await?;
            let access = self.access_index_in(&tx, now).await?;
            access.require(&tree, principal_id, Permission::DelegationCreate, &scope.id, now)?;
            access.require(&tree, agent_id, Permission::VoteCast, &scope.id, now)?;

            let previous = self.open_edge_in(&tx, principal_id, &scope.id).await?;
            if let Some(ref previous) = previous {
                if previous.agent_id == agent_id {
                    debug!(delegation = %previous.id, "delegation unchanged");
                    return Ok(previous.clone());
                }
                self.revoke_edges_in(
                    &tx,
                    std::slice::from_ref(previous),
                    now,
                    RevokeReason::Superseded,
                )
                .await?;
            }

            let delegation = Delegation {
                id: self.db().generate_id(PREFIX_DELEGATION).await?,
                principal_id: principal_id.to_string(),
                agent_id: agent_id.to_string(),
                scope_id: scope.id.clone(),
                created_at: now,
                revoke_time: None,
            };
            tx.execute(
                "INSERT INTO delegations (id, principal_id, agent_id, scope_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                libsql::params![
                    delegation.id.as_str(),
                    principal_id,
                    agent_id,
                    scope.id.as_str(),
                    format_datetime(now)
                ],
            )
            .await?;

            let detail = DelegationCreatedDetail {
                principal_id: principal_id.to_string(),
                agent_id: agent_id.to_string(),
                scope_id: scope.id.clone(),
                supersedes: previous.map(|p| p.id),
            };
            self.append_audit(
                &tx,
                EntityType::Delegation,
                &delegation.id,
                AuditAction::Created,
                Some(to_detail(&detail)?),
                now,
            )
            .await?;
            info!(
                delegation = %delegation.id,
                principal = %principal_id,
                agent = %agent_id,
                scope = %scope.key,
                "delegation created"
            );
            Ok(delegation)
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Withdraw a delegation at `at` (default now).
    ///
    /// Revoking an already revoked edge is a no-op that returns the edge
    /// with its existing revoke time.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` for an unknown delegation and
    /// `DatabaseError::InvalidState` if `at` is before the edge was created
    /// or in the future.
    pub async fn revoke_delegation(
        &self,
        id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Delegation, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<Delegation, DatabaseError> = async {
            let now = now();
            let at = at.unwrap_or(now);
            let edge = self.get_delegation_in(&tx, id).await?;
            if edge.revoke_time.is_some() {
                debug!(delegation = %id, "already revoked");
                return Ok(edge);
            }
            if at < edge.created_at || at > now {
                return Err(DatabaseError::InvalidState(format!(
                    "cannot revoke {id} at {}: outside [{}, now]",
                    format_datetime(at),
                    format_datetime(edge.created_at)
                )));
            }
            self.revoke_edges_in(&tx, std::slice::from_ref(&edge), at, RevokeReason::Withdrawn)
                .await?;
            Ok(Delegation {
                revoke_time: Some(at),
                ..edge
            })
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Get a delegation by ID, revoked or not.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` if no such delegation exists.
    pub async fn get_delegation(&self, id: &str) -> Result<Delegation, DatabaseError> {
        let _gate = self.read_gate().await;
        self.get_delegation_in(self.db().conn(), id).await
    }

    /// Edges from `principal_id` active at `at` (default now), newest first.
    /// With `scope`, only edges whose scope contains it.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` for an unknown scope.
    pub async fn find_active(
        &self,
        principal_id: &str,
        scope: Option<&str>,
        at: Option<DateTime<Utc>>,
    ) -> Result<Vec<Delegation>, DatabaseError> {
        let _gate = self.read_gate().await;
        let conn = self.db().conn();
        let at = at.unwrap_or_else(now);
        let rows = conn
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM delegations
                     WHERE principal_id = ?2 AND {ACTIVE_AT}
                     ORDER BY created_at DESC, id DESC"
                ),
                libsql::params![format_datetime(at), principal_id],
            )
            .await?;
        let edges = collect(rows).await?;
        let Some(scope) = scope else {
            return Ok(edges);
        };

        let target = self.require_scope_in(conn, scope).await?;
        let tree = self.scope_tree_in(conn).await?;
        let mut covering = Vec::new();
        for edge in edges {
            if tree.contains(&edge.scope_id, &target.id)? {
                covering.push(edge);
            }
        }
        Ok(covering)
    }

    /// Edges into `agent_id` active at `at` (default now), newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_incoming(
        &self,
        agent_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Vec<Delegation>, DatabaseError> {
        let _gate = self.read_gate().await;
        let rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM delegations
                     WHERE agent_id = ?2 AND {ACTIVE_AT}
                     ORDER BY created_at DESC, id DESC"
                ),
                libsql::params![format_datetime(at.unwrap_or_else(now)), agent_id],
            )
            .await?;
        collect(rows).await
    }

    /// Revoke every active edge where `user_id` is principal or agent,
    /// limited to scopes inside `instance` when given. Returns the revoked
    /// edges.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` for an unknown instance.
    pub async fn revoke_delegations(
        &self,
        user_id: &str,
        instance: Option<&str>,
    ) -> Result<Vec<Delegation>, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<Vec<Delegation>, DatabaseError> = async {
            let now = now();
            let mut edges = self.active_edges_of_in(&tx, user_id, now).await?;
            if let Some(instance) = instance {
                let instance = self.require_scope_in(&tx, instance).await?;
                let tree = self.scope_tree_in(&tx).await?;
                let mut inside = Vec::new();
                for edge in edges {
                    if tree.contains(&instance.id, &edge.scope_id)? {
                        inside.push(edge);
                    }
                }
                edges = inside;
            }
            self.revoke_edges_in(&tx, &edges, now, RevokeReason::Withdrawn)
                .await?;
            Ok(edges
                .into_iter()
                .map(|e| Delegation {
                    revoke_time: Some(now),
                    ..e
                })
                .collect())
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Every edge `principal_id` ever created, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn delegation_history(
        &self,
        principal_id: &str,
    ) -> Result<Vec<Delegation>, DatabaseError> {
        let _gate = self.read_gate().await;
        let rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM delegations WHERE principal_id = ?1
                     ORDER BY created_at DESC, id DESC"
                ),
                [principal_id],
            )
            .await?;
        collect(rows).await
    }

    /// Snapshot of the delegation graph at `at` (default now).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn graph_snapshot(
        &self,
        at: Option<DateTime<Utc>>,
    ) -> Result<GraphSnapshot, DatabaseError> {
        let _gate = self.read_gate().await;
        self.graph_snapshot_in(self.db().conn(), at.unwrap_or_else(now))
            .await
    }

    pub(crate) async fn graph_snapshot_in(
        &self,
        conn: &libsql::Connection,
        at: DateTime<Utc>,
    ) -> Result<GraphSnapshot, DatabaseError> {
        let rows = conn
            .query(
                &format!("SELECT {SELECT_COLS} FROM delegations WHERE {ACTIVE_AT}"),
                [format_datetime(at)],
            )
            .await?;
        let edges = collect(rows).await?;
        debug!(edges = edges.len(), at = %format_datetime(at), "graph snapshot loaded");
        Ok(GraphSnapshot::new(edges, at))
    }

    /// Active edges with `user_id` on either end.
    pub(crate) async fn active_edges_of_in(
        &self,
        conn: &libsql::Connection,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<Delegation>, DatabaseError> {
        let rows = conn
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM delegations
                     WHERE (principal_id = ?2 OR agent_id = ?2) AND {ACTIVE_AT}
                     ORDER BY created_at, id"
                ),
                libsql::params![format_datetime(at), user_id],
            )
            .await?;
        collect(rows).await
    }

    /// Set `revoke_time` on open edges and audit each. Returns how many
    /// edges were revoked.
    pub(crate) async fn revoke_edges_in(
        &self,
        conn: &libsql::Connection,
        edges: &[Delegation],
        at: DateTime<Utc>,
        reason: RevokeReason,
    ) -> Result<u32, DatabaseError> {
        let action = match reason {
            RevokeReason::Superseded => AuditAction::Superseded,
            _ => AuditAction::Revoked,
        };
        let mut revoked = 0;
        for edge in edges {
            let changed = conn
                .execute(
                    "UPDATE delegations SET revoke_time = ?1 WHERE id = ?2 AND revoke_time IS NULL",
                    libsql::params![format_datetime(at), edge.id.as_str()],
                )
                .await?;
            if changed == 0 {
                continue;
            }
            let detail = DelegationRevokedDetail {
                revoke_time: at,
                reason,
            };
            self.append_audit(
                conn,
                EntityType::Delegation,
                &edge.id,
                action,
                Some(to_detail(&detail)?),
                at,
            )
            .await?;
            info!(delegation = %edge.id, ?reason, "delegation revoked");
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn get_delegation_in(
        &self,
        conn: &libsql::Connection,
        id: &str,
    ) -> Result<Delegation, DatabaseError> {
        let mut rows = conn
            .query(&format!("SELECT {SELECT_COLS} FROM delegations WHERE id = ?1"), [id])
            .await?;
        let row = rows.next().await?.ok_or_else(|| CoreError::NotFound {
            entity_type: "delegation".into(),
            id: id.to_string(),
        })?;
        row_to_delegation(&row)
    }

    async fn open_edge_in(
        &self,
        conn: &libsql::Connection,
        principal_id: &str,
        scope_id: &str,
    ) -> Result<Option<Delegation>, DatabaseError> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM delegations
                     WHERE principal_id = ?1 AND scope_id = ?2 AND revoke_time IS NULL"
                ),
                libsql::params![principal_id, scope_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_delegation(&row)?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn require_scope_in(
        &self,
        conn: &libsql::Connection,
        key_or_id: &str,
    ) -> Result<Scope, DatabaseError> {
        self.find_scope_in(conn, key_or_id)
            .await?
            .ok_or_else(|| DemocracyError::InvalidScope(key_or_id.to_string()).into())
    }
}
