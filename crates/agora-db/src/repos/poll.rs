//! Poll repository.
//!
//! Polls are soft-deleted. A deleted poll keeps its decisions for the
//! record but no longer takes votes or tallies.

use agora_core::entities::Poll;
use agora_core::enums::{AuditAction, EntityType, Permission, PollKind};
use agora_core::errors::CoreError;
use agora_core::ids::PREFIX_POLL;
use agora_democracy::DemocracyError;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::DatabaseError;
use crate::helpers::{format_datetime, get_opt_datetime, now, parse_datetime};
use crate::service::AgoraService;

const SELECT_COLS: &str = "id, scope_id, subject, kind, rating_min, rating_max, \
                           begin_time, end_time, delete_time, created_at";

/// Input for [`AgoraService::create_poll`].
#[derive(Debug, Clone)]
pub struct NewPoll {
    pub creator_id: String,
    /// Scope ID or key.
    pub scope: String,
    pub subject: String,
    pub kind: PollKind,
    /// Defaults to now.
    pub begin_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

fn row_to_poll(row: &libsql::Row) -> Result<Poll, DatabaseError> {
    let kind = PollKind::from_parts(
        &row.get::<String>(3)?,
        row.get::<Option<i64>>(4)?,
        row.get::<Option<i64>>(5)?,
    )?;
    Ok(Poll {
        id: row.get::<String>(0)?,
        scope_id: row.get::<String>(1)?,
        subject: row.get::<String>(2)?,
        kind,
        begin_time: parse_datetime(&row.get::<String>(6)?)?,
        end_time: get_opt_datetime(row, 7)?,
        delete_time: get_opt_datetime(row, 8)?,
        created_at: parse_datetime(&row.get::<String>(9)?)?,
    })
}

const fn rating_bounds(kind: PollKind) -> (Option<i64>, Option<i64>) {
    match kind {
        PollKind::Rate { min, max } => (Some(min), Some(max)),
        PollKind::Adopt | PollKind::Repeal => (None, None),
    }
}

impl AgoraService {
    /// Open a poll in a scope.
    ///
    /// # Errors
    ///
    /// Returns `InvalidScope`, `UserNotFound` for a missing or deleted
    /// creator, `PermissionDenied` without `poll.create` in the scope, and
    /// `CoreError::Validation` for a blank subject or an end time not after
    /// the begin time.
    pub async fn create_poll(&self, new: NewPoll) -> Result<Poll, DatabaseError> {
        let subject = new.subject.trim();
        if subject.is_empty() {
            return Err(CoreError::Validation("poll subject must not be blank".into()).into());
        }

        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<Poll, DatabaseError> = async {
            let now = now();
            let scope = self.require_scope_in(&tx, &new.scope).await?;
            self.live_user_in(&tx, &new.creator_id, now).await?;
            let tree = self.scope_tree_in(&tx).await?;
            self.access_index_in(&tx, now).await?.require(
                &tree,
                &new.creator_id,
                Permission::PollCreate,
                &scope.id,
                now,
            )?;

            let begin_time = new.begin_time.unwrap_or(now);
            if let Some(end) = new.end_time {
                if end <= begin_time {
                    return Err(CoreError::Validation(format!(
                        "poll must end after it begins ({} <= {})",
                        format_datetime(end),
                        format_datetime(begin_time)
                    ))
                    .into());
                }
            }

            let poll = Poll {
                id: self.db().generate_id(PREFIX_POLL).await?,
                scope_id: scope.id,
                subject: subject.to_string(),
                kind: new.kind,
                begin_time,
                end_time: new.end_time,
                delete_time: None,
                created_at: now,
            };
            let (rating_min, rating_max) = rating_bounds(poll.kind);
            tx.execute(
                "INSERT INTO polls (id, scope_id, subject, kind, rating_min, rating_max,
                                    begin_time, end_time, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                libsql::params![
                    poll.id.as_str(),
                    poll.scope_id.as_str(),
                    poll.subject.as_str(),
                    poll.kind.as_str(),
                    rating_min,
                    rating_max,
                    format_datetime(poll.begin_time),
                    poll.end_time.map(format_datetime),
                    format_datetime(now)
                ],
            )
            .await?;
            self.append_audit(&tx, EntityType::Poll, &poll.id, AuditAction::Created, None, now)
                .await?;
            info!(poll = %poll.id, kind = %poll.kind, "poll created");
            Ok(poll)
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Get a poll by ID, deleted polls included.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::PollNotFound` if no such poll exists.
    pub async fn get_poll(&self, id: &str) -> Result<Poll, DatabaseError> {
        let _gate = self.read_gate().await;
        self.get_poll_in(self.db().conn(), id).await
    }

    /// Polls in `scope` and its sub-scopes (all polls without a scope),
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` for an unknown scope.
    pub async fn list_polls(
        &self,
        scope: Option<&str>,
        include_deleted: bool,
        limit: u32,
    ) -> Result<Vec<Poll>, DatabaseError> {
        let _gate = self.read_gate().await;
        let conn = self.db().conn();
        let within = match scope {
            Some(s) => Some((self.require_scope_in(conn, s).await?, self.scope_tree_in(conn).await?)),
            None => None,
        };
        let filter = if include_deleted {
            ""
        } else {
            "WHERE delete_time IS NULL"
        };
        let mut rows = conn
            .query(
                &format!("SELECT {SELECT_COLS} FROM polls {filter} ORDER BY created_at DESC, id DESC"),
                (),
            )
            .await?;

        let mut polls = Vec::new();
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        while let Some(row) = rows.next().await? {
            if polls.len() >= limit {
                break;
            }
            let poll = row_to_poll(&row)?;
            if let Some((ref outer, ref tree)) = within {
                if !tree.contains(&outer.id, &poll.scope_id)? {
                    continue;
                }
            }
            polls.push(poll);
        }
        Ok(polls)
    }

    /// End voting at `at` (default now). Closing a closed poll is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `PollNotFound` for a missing or deleted poll and
    /// `DatabaseError::InvalidState` if `at` is before the poll begins or in
    /// the future.
    pub async fn close_poll(
        &self,
        id: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<Poll, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<Poll, DatabaseError> = async {
            let now = now();
            let poll = self.active_poll_in(&tx, id, now).await?;
            if poll.is_closed(now) {
                return Ok(poll);
            }
            let at = at.unwrap_or(now);
            if at < poll.begin_time || at > now {
                return Err(DatabaseError::InvalidState(format!(
                    "cannot close {id} at {}: outside [{}, now]",
                    format_datetime(at),
                    format_datetime(poll.begin_time)
                )));
            }
            tx.execute(
                "UPDATE polls SET end_time = ?1 WHERE id = ?2",
                libsql::params![format_datetime(at), id],
            )
            .await?;
            self.append_audit(&tx, EntityType::Poll, id, AuditAction::Closed, None, now)
                .await?;
            info!(poll = %id, "poll closed");
            Ok(Poll {
                end_time: Some(at),
                ..poll
            })
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Soft-delete a poll. Deleting a deleted poll is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::PollNotFound` if no such poll exists.
    pub async fn delete_poll(&self, id: &str) -> Result<Poll, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<Poll, DatabaseError> = async {
            let now = now();
            let poll = self.get_poll_in(&tx, id).await?;
            if poll.is_deleted(now) {
                return Ok(poll);
            }
            tx.execute(
                "UPDATE polls SET delete_time = ?1 WHERE id = ?2",
                libsql::params![format_datetime(now), id],
            )
            .await?;
            self.append_audit(&tx, EntityType::Poll, id, AuditAction::Deleted, None, now)
                .await?;
            info!(poll = %id, "poll deleted");
            Ok(Poll {
                delete_time: Some(now),
                ..poll
            })
        }
        .await;
        Self::finish(tx, result).await
    }

    pub(crate) async fn get_poll_in(
        &self,
        conn: &libsql::Connection,
        id: &str,
    ) -> Result<Poll, DatabaseError> {
        let mut rows = conn
            .query(&format!("SELECT {SELECT_COLS} FROM polls WHERE id = ?1"), [id])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DemocracyError::PollNotFound(id.to_string()))?;
        row_to_poll(&row)
    }

    /// The poll, failing with `PollNotFound` once deleted at `at`.
    pub(crate) async fn active_poll_in(
        &self,
        conn: &libsql::Connection,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<Poll, DatabaseError> {
        let poll = self.get_poll_in(conn, id).await?;
        if poll.is_deleted(at) {
            return Err(DemocracyError::PollNotFound(id.to_string()).into());
        }
        Ok(poll)
    }
}
