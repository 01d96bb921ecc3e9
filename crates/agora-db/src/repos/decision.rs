//! Decision records: append-only votes, newest per (user, poll) is current.

use std::collections::HashSet;

use agora_core::audit_detail::VotedDetail;
use agora_core::entities::Decision;
use agora_core::enums::{AuditAction, EntityType, Permission, Position};
use agora_core::ids::PREFIX_DECISION;
use agora_democracy::DecisionSet;
use agora_democracy::decision::{ensure_open, validate_position};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::helpers::{format_datetime, now, parse_datetime, to_detail};
use crate::service::AgoraService;

const SELECT_COLS: &str = "id, user_id, poll_id, position, rating, created_at";

fn row_to_decision(row: &libsql::Row) -> Result<Decision, DatabaseError> {
    Ok(Decision {
        id: row.get::<String>(0)?,
        user_id: row.get::<String>(1)?,
        poll_id: row.get::<String>(2)?,
        position: Position::from_parts(&row.get::<String>(3)?, row.get::<Option<i64>>(4)?)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

async fn collect(mut rows: libsql::Rows) -> Result<Vec<Decision>, DatabaseError> {
    let mut decisions = Vec::new();
    while let Some(row) = rows.next().await? {
        decisions.push(row_to_decision(&row)?);
    }
    Ok(decisions)
}

impl AgoraService {
    /// Record `user_id`'s position on a poll.
    ///
    /// Repeating the current position returns the current decision without
    /// a new record. A changed position appends a record that sorts after
    /// the previous one even within the same microsecond.
    ///
    /// # Errors
    ///
    /// Returns `PollNotFound` for a missing or deleted poll, `PollClosed`
    /// outside its window, `InvalidPosition` outside its domain,
    /// `UserNotFound` for a missing or deleted user, and `PermissionDenied`
    /// without `vote.cast` in the poll scope.
    pub async fn record_decision(
        &self,
        user_id: &str,
        poll_id: &str,
        position: Position,
    ) -> Result<Decision, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<Decision, DatabaseError> = async {
            let now = now();
            let poll = self.active_poll_in(&tx, poll_id, now).await?;
            ensure_open(&poll, now)?;
            validate_position(&poll, position)?;
            self.live_user_in(&tx, user_id, now).await?;
            let tree = self.scope_tree_in(&tx).await?;
            self.access_index_in(&tx, now).await?.require(
                &tree,
                user_id,
                Permission::VoteCast,
                &poll.scope_id,
                now,
            )?;

            let current = self.current_decision_in(&tx, user_id, poll_id).await?;
            if let Some(ref current) = current {
                if current.position == position {
                    debug!(decision = %current.id, "position unchanged");
                    return Ok(current.clone());
                }
            }
            let created_at = current
                .as_ref()
                .map_or(now, |c| now.max(c.created_at + Duration::microseconds(1)));

            let decision = Decision {
                id: self.db().generate_id(PREFIX_DECISION).await?,
                user_id: user_id.to_string(),
                poll_id: poll_id.to_string(),
                position,
                created_at,
            };
            tx.execute(
                &format!("INSERT INTO decisions ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                libsql::params![
                    decision.id.as_str(),
                    user_id,
                    poll_id,
                    position.as_str(),
                    position.rating(),
                    format_datetime(created_at)
                ],
            )
            .await?;

            let detail = VotedDetail {
                poll_id: poll_id.to_string(),
                position,
                previous: current.map(|c| c.position),
            };
            self.append_audit(
                &tx,
                EntityType::Decision,
                &decision.id,
                AuditAction::Voted,
                Some(to_detail(&detail)?),
                created_at,
            )
            .await?;
            info!(user = %user_id, poll = %poll_id, %position, "decision recorded");
            Ok(decision)
        }
        .await;
        Self::finish(tx, result).await
    }

    /// The user's current decision on a poll, if any.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn current_decision(
        &self,
        user_id: &str,
        poll_id: &str,
    ) -> Result<Option<Decision>, DatabaseError> {
        let _gate = self.read_gate().await;
        self.current_decision_in(self.db().conn(), user_id, poll_id)
            .await
    }

    /// The user's current decision on every poll they voted on, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn decisions_for_user(&self, user_id: &str) -> Result<Vec<Decision>, DatabaseError> {
        let _gate = self.read_gate().await;
        let rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM decisions WHERE user_id = ?1
                     ORDER BY created_at DESC, id DESC"
                ),
                [user_id],
            )
            .await?;
        let mut seen = HashSet::new();
        Ok(collect(rows)
            .await?
            .into_iter()
            .filter(|d| seen.insert(d.poll_id.clone()))
            .collect())
    }

    /// Every record the user made on a poll, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn decision_history(
        &self,
        user_id: &str,
        poll_id: &str,
    ) -> Result<Vec<Decision>, DatabaseError> {
        let _gate = self.read_gate().await;
        let rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM decisions WHERE user_id = ?1 AND poll_id = ?2
                     ORDER BY created_at DESC, id DESC"
                ),
                [user_id, poll_id],
            )
            .await?;
        collect(rows).await
    }

    async fn current_decision_in(
        &self,
        conn: &libsql::Connection,
        user_id: &str,
        poll_id: &str,
    ) -> Result<Option<Decision>, DatabaseError> {
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM decisions WHERE user_id = ?1 AND poll_id = ?2
                     ORDER BY created_at DESC, id DESC LIMIT 1"
                ),
                [user_id, poll_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_decision(&row)?)),
            None => Ok(None),
        }
    }

    /// Current decisions on a poll at `at`.
    pub(crate) async fn decision_set_in(
        &self,
        conn: &libsql::Connection,
        poll_id: &str,
        at: DateTime<Utc>,
    ) -> Result<DecisionSet, DatabaseError> {
        let rows = conn
            .query(
                &format!("SELECT {SELECT_COLS} FROM decisions WHERE poll_id = ?1 AND created_at <= ?2"),
                libsql::params![poll_id, format_datetime(at)],
            )
            .await?;
        Ok(DecisionSet::new(poll_id, collect(rows).await?, at))
    }
}

#[cfg(test)]
mod tests {
    use crate::repos::audit::AuditFilter;
    use crate::repos::poll::NewPoll;
    use crate::test_support::helpers::{new_poll, seed_instance, test_service, voter};
    use agora_core::enums::{AuditAction, Permission, PollKind, Position};
    use agora_democracy::DemocracyError;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn same_position_is_noop() {
        let svc = test_service().await;
        let city = seed_instance(&svc).await;
        let alice = voter(&svc, "alice", &city.id).await;
        let poll = svc.create_poll(new_poll(&alice.id, &city.id)).await.unwrap();

        let first = svc.record_decision(&alice.id, &poll.id, Position::Adopt).await.unwrap();
        let again = svc.record_decision(&alice.id, &poll.id, Position::Adopt).await.unwrap();
        assert_eq!(again, first);
        assert_eq!(svc.decision_history(&alice.id, &poll.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn changed_position_appends_and_becomes_current() {
        let svc = test_service().await;
        let city = seed_instance(&svc).await;
        let alice = voter(&svc, "alice", &city.id).await;
        let poll = svc.create_poll(new_poll(&alice.id, &city.id)).await.unwrap();

        let first = svc.record_decision(&alice.id, &poll.id, Position::Adopt).await.unwrap();
        let second = svc.record_decision(&alice.id, &poll.id, Position::Reject).await.unwrap();
        assert!(second.created_at > first.created_at);

        let current = svc.current_decision(&alice.id, &poll.id).await.unwrap().unwrap();
        assert_eq!(current.position, Position::Reject);
        let history = svc.decision_history(&alice.id, &poll.id).await.unwrap();
        assert_eq!(history, vec![second.clone(), first]);

        let voted = svc
            .query_audit(&AuditFilter {
                entity_id: Some(second.id),
                action: Some(AuditAction::Voted),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(voted[0].detail.as_ref().unwrap()["previous"], "adopt");
    }

    #[tokio::test]
    async fn rejects_in_check_order() {
        let svc = test_service().await;
        let city = seed_instance(&svc).await;
        let alice = voter(&svc, "alice", &city.id).await;
        let poll = svc.create_poll(new_poll(&alice.id, &city.id)).await.unwrap();

        let err = svc.record_decision(&alice.id, "pol-00000000", Position::Adopt).await.unwrap_err();
        assert_eq!(err.as_democracy(), Some(&DemocracyError::PollNotFound("pol-00000000".into())));

        let err = svc.record_decision(&alice.id, &poll.id, Position::Rating(3)).await.unwrap_err();
        assert!(matches!(err.as_democracy(), Some(DemocracyError::InvalidPosition { .. })));

        let err = svc.record_decision("usr-00000000", &poll.id, Position::Adopt).await.unwrap_err();
        assert!(matches!(err.as_democracy(), Some(DemocracyError::UserNotFound(_))));

        let outsider = svc.create_user("outsider", None, None).await.unwrap();
        let err = svc.record_decision(&outsider.id, &poll.id, Position::Adopt).await.unwrap_err();
        assert!(matches!(
            err.as_democracy(),
            Some(DemocracyError::PermissionDenied { permission: Permission::VoteCast, .. })
        ));

        svc.close_poll(&poll.id, None).await.unwrap();
        let err = svc.record_decision(&alice.id, &poll.id, Position::Adopt).await.unwrap_err();
        assert_eq!(err.as_democracy(), Some(&DemocracyError::PollClosed(poll.id.clone())));
        assert!(svc.decisions_for_user(&alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn not_yet_open_poll_is_closed() {
        let svc = test_service().await;
        let city = seed_instance(&svc).await;
        let alice = voter(&svc, "alice", &city.id).await;
        let poll = svc
            .create_poll(NewPoll {
                begin_time: Some(crate::helpers::now() + chrono::Duration::days(1)),
                ..new_poll(&alice.id, &city.id)
            })
            .await
            .unwrap();
        let err = svc.record_decision(&alice.id, &poll.id, Position::Adopt).await.unwrap_err();
        assert!(matches!(err.as_democracy(), Some(DemocracyError::PollClosed(_))));
    }

    #[tokio::test]
    async fn ratings_stored_with_value() {
        let svc = test_service().await;
        let city = seed_instance(&svc).await;
        let alice = voter(&svc, "alice", &city.id).await;
        let rate = svc
            .create_poll(NewPoll {
                kind: PollKind::rate(-2, 2).unwrap(),
                ..new_poll(&alice.id, &city.id)
            })
            .await
            .unwrap();
        let adopt = svc.create_poll(new_poll(&alice.id, &city.id)).await.unwrap();

        svc.record_decision(&alice.id, &rate.id, Position::Rating(-2)).await.unwrap();
        svc.record_decision(&alice.id, &adopt.id, Position::Abstain).await.unwrap();
        svc.record_decision(&alice.id, &adopt.id, Position::Reject).await.unwrap();

        let current = svc.decisions_for_user(&alice.id).await.unwrap();
        assert_eq!(current.len(), 2);
        assert_eq!(current[0].position, Position::Reject);
        assert_eq!(current[1].position, Position::Rating(-2));
    }
}
