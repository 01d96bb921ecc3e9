//! Membership repository: a user's group per scope, and the access index
//! the engine checks permissions against.
//!
//! Changing a group expires the open membership and inserts a new one. When
//! the change costs the user `vote.cast` somewhere, their delegations there
//! are revoked in the same transaction.

use agora_core::audit_detail::{GroupChangedDetail, RevokeReason};
use agora_core::entities::Membership;
use agora_core::enums::{AuditAction, EntityType, Group, Permission};
use agora_core::ids::PREFIX_MEMBERSHIP;
use agora_democracy::{AccessIndex, DemocracyError};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::DatabaseError;
use crate::helpers::{
    format_datetime, get_opt_datetime, get_opt_string, now, parse_datetime, parse_enum, to_detail,
};
use crate::service::AgoraService;

const SELECT_COLS: &str = "m.id, m.user_id, m.scope_id, m.group_name, m.created_at, m.expire_time";

fn row_to_membership(row: &libsql::Row) -> Result<Membership, DatabaseError> {
    Ok(Membership {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        scope_id: get_opt_string(row, 2)?,
        group: parse_enum(&row.get::<String>(3)?)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
        expire_time: get_opt_datetime(row, 5)?,
    })
}

impl AgoraService {
    /// Put `user` into `group` in `scope` (`None` = global). Setting the
    /// group the user already has is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::UserNotFound` for a missing or deleted user
    /// and `DemocracyError::InvalidScope` for an unknown scope.
    pub async fn set_group(
        &self,
        user_id: &str,
        scope: Option<&str>,
        group: Group,
    ) -> Result<Membership, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<Membership, DatabaseError> = async {
            let now = now();
            self.live_user_in(&tx, user_id, now).await?;
            let scope_id = match scope {
                Some(s) => Some(
                    self.find_scope_in(&tx, s)
                        .await?
                        .ok_or_else(|| DemocracyError::InvalidScope(s.to_string()))?
                        .id,
                ),
                None => None,
            };

            let current = self
                .open_membership_in(&tx, user_id, scope_id.as_deref())
                .await?;
            if let Some(ref current) = current {
                if current.group == group {
                    return Ok(current.clone());
                }
                tx.execute(
                    "UPDATE memberships SET expire_time = ?1 WHERE id = ?2",
                    libsql::params![format_datetime(now), current.id.as_str()],
                )
                .await?;
            }

            let membership = Membership {
                id: self.db().generate_id(PREFIX_MEMBERSHIP).await?,
                user_id: user_id.to_string(),
                scope_id: scope_id.clone(),
                group,
                created_at: now,
                expire_time: None,
            };
            tx.execute(
                "INSERT INTO memberships (id, user_id, scope_id, group_name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                libsql::params![
                    membership.id.as_str(),
                    user_id,
                    scope_id.as_deref(),
                    group.as_str(),
                    format_datetime(now)
                ],
            )
            .await?;

            let from = current.map(|m| m.group);
            let lost_vote = from.is_some_and(|g| g.grants(Permission::VoteCast))
                && !group.grants(Permission::VoteCast);
            let revoked = if lost_vote {
                self.revoke_unvoiced_edges_in(&tx, user_id, scope_id.as_deref(), now)
                    .await?
            } else {
                0
            };

            let detail = GroupChangedDetail {
                scope_id,
                from,
                to: group,
                revoked_delegations: revoked,
            };
            self.append_audit(
                &tx,
                EntityType::Membership,
                &membership.id,
                AuditAction::GroupChanged,
                Some(to_detail(&detail)?),
                now,
            )
            .await?;
            info!(user = %user_id, group = %group, revoked, "group changed");
            Ok(membership)
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Memberships of a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn memberships_for(
        &self,
        user_id: &str,
        include_expired: bool,
    ) -> Result<Vec<Membership>, DatabaseError> {
        let _gate = self.read_gate().await;
        let mut params: Vec<libsql::Value> = vec![user_id.into()];
        let filter = if include_expired {
            ""
        } else {
            params.push(format_datetime(now()).into());
            "AND (m.expire_time IS NULL OR m.expire_time > ?2)"
        };
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM memberships m
                     WHERE m.user_id = ?1 {filter}
                     ORDER BY m.created_at DESC, m.id DESC"
                ),
                libsql::params_from_iter(params),
            )
            .await?;
        let mut memberships = Vec::new();
        while let Some(row) = rows.next().await? {
            memberships.push(row_to_membership(&row)?);
        }
        Ok(memberships)
    }

    /// Whether `user` holds `permission` in `scope` now.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` for an unknown scope.
    pub async fn has_permission(
        &self,
        user_id: &str,
        permission: Permission,
        scope_id: &str,
    ) -> Result<bool, DatabaseError> {
        let _gate = self.read_gate().await;
        let conn = self.db().conn();
        let at = now();
        let tree = self.scope_tree_in(conn).await?;
        let index = self.access_index_in(conn, at).await?;
        Ok(index.can(&tree, user_id, permission, scope_id, at)?)
    }

    /// Memberships in force at `at` for users not deleted by then.
    pub(crate) async fn access_index_in(
        &self,
        conn: &libsql::Connection,
        at: DateTime<Utc>,
    ) -> Result<AccessIndex, DatabaseError> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM memberships m
                     JOIN users u ON u.id = m.user_id
                     WHERE m.created_at <= ?1
                       AND (m.expire_time IS NULL OR m.expire_time > ?1)
                       AND (u.delete_time IS NULL OR u.delete_time > ?1)"
                ),
                [format_datetime(at)],
            )
            .await?;
        let mut memberships = Vec::new();
        while let Some(row) = rows.next().await? {
            memberships.push(row_to_membership(&row)?);
        }
        Ok(AccessIndex::new(memberships))
    }

    async fn open_membership_in(
        &self,
        conn: &libsql::Connection,
        user_id: &str,
        scope_id: Option<&str>,
    ) -> Result<Option<Membership>, DatabaseError> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM memberships m
                     WHERE m.user_id = ?1 AND ifnull(m.scope_id, '') = ?2
                       AND m.expire_time IS NULL"
                ),
                libsql::params![user_id, scope_id.unwrap_or_default()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_membership(&row)?)),
            None => Ok(None),
        }
    }

    /// Revoke the user's active edges (both directions) inside `area`
    /// (`None` = everywhere) in scopes where they no longer hold `vote.cast`.
    async fn revoke_unvoiced_edges_in(
        &self,
        conn: &libsql::Connection,
        user_id: &str,
        area: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<u32, DatabaseError> {
        let tree = self.scope_tree_in(conn).await?;
        let index = self.access_index_in(conn, at).await?;
        let instance = area.map(|s| tree.root_of(s)).transpose()?;

        let mut lost = Vec::new();
        for edge in self.active_edges_of_in(conn, user_id, at).await? {
            let inside = match instance {
                Some(root) => tree.contains(root, &edge.scope_id)?,
                None => true,
            };
            if inside && !index.can(&tree, user_id, Permission::VoteCast, &edge.scope_id, at)? {
                lost.push(edge);
            }
        }
        self.revoke_edges_in(conn, &lost, at, RevokeReason::PermissionLost)
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::helpers::{seed_instance, test_service, voter};
    use agora_core::enums::{Group, Permission};
    use agora_democracy::DemocracyError;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn same_group_is_noop() {
        let svc = test_service().await;
        let city = seed_instance(&svc).await;
        let alice = voter(&svc, "alice", &city.id).await;
        let before = svc.memberships_for(&alice.id, true).await.unwrap();
        let again = svc.set_group(&alice.id, Some(city.id.as_str()), Group::Voter).await.unwrap();
        assert_eq!(again, before[0]);
        assert_eq!(svc.memberships_for(&alice.id, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn group_change_expires_previous_membership() {
        let svc = test_service().await;
        let city = seed_instance(&svc).await;
        let alice = voter(&svc, "alice", &city.id).await;
        svc.set_group(&alice.id, Some("city"), Group::Supervisor).await.unwrap();

        let current = svc.memberships_for(&alice.id, false).await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].group, Group::Supervisor);
        let all = svc.memberships_for(&alice.id, true).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[1].expire_time.is_some());
    }

    #[tokio::test]
    async fn permissions_follow_group() {
        let svc = test_service().await;
        let city = seed_instance(&svc).await;
        let transport = svc
            .create_scope("city/transport", "Transport", Some(city.id.as_str()))
            .await
            .unwrap();
        let alice = voter(&svc, "alice", &city.id).await;
        assert!(svc.has_permission(&alice.id, Permission::VoteCast, &transport.id).await.unwrap());
        assert!(!svc.has_permission(&alice.id, Permission::UserSupervise, &city.id).await.unwrap());

        svc.set_group(&alice.id, Some(city.id.as_str()), Group::Observer).await.unwrap();
        assert!(!svc.has_permission(&alice.id, Permission::VoteCast, &transport.id).await.unwrap());
        assert!(svc.has_permission(&alice.id, Permission::DelegationShow, &transport.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleted_user_loses_permissions() {
        let svc = test_service().await;
        let city = seed_instance(&svc).await;
        let alice = voter(&svc, "alice", &city.id).await;
        svc.delete_user(&alice.id).await.unwrap();
        assert!(!svc.has_permission(&alice.id, Permission::VoteCast, &city.id).await.unwrap());
        let err = svc.set_group(&alice.id, None, Group::Admin).await.unwrap_err();
        assert_eq!(err.as_democracy(), Some(&DemocracyError::UserNotFound(alice.id.clone())));
    }
}
