//! Scope repository.
//!
//! Parent links are fixed at creation and must point at an existing scope,
//! so the stored tree cannot contain a cycle.

use agora_core::entities::Scope;
use agora_core::enums::{AuditAction, EntityType};
use agora_core::errors::CoreError;
use agora_core::ids::PREFIX_SCOPE;
use agora_democracy::{DemocracyError, ScopeTree};
use tracing::info;

use crate::error::DatabaseError;
use crate::helpers::{format_datetime, get_opt_string, now, parse_datetime};
use crate::service::AgoraService;

const SELECT_COLS: &str = "id, key, title, parent_id, created_at";

fn row_to_scope(row: &libsql::Row) -> Result<Scope, DatabaseError> {
    Ok(Scope {
        id: row.get::<String>(0)?,
        key: row.get::<String>(1)?,
        title: row.get::<String>(2)?,
        parent_id: get_opt_string(row, 3)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
    })
}

impl AgoraService {
    /// Create a scope. `parent` is a scope ID or key; `None` creates an
    /// instance (root) scope.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` for an unknown parent,
    /// `CoreError::Validation` for a blank key or title, and
    /// `DatabaseError::InvalidState` if the key is taken.
    pub async fn create_scope(
        &self,
        key: &str,
        title: &str,
        parent: Option<&str>,
    ) -> Result<Scope, DatabaseError> {
        let key = key.trim();
        let title = title.trim();
        if key.is_empty() || title.is_empty() {
            return Err(CoreError::Validation("scope key and title must not be blank".into()).into());
        }

        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<Scope, DatabaseError> = async {
            if self.find_scope_in(&tx, key).await?.is_some() {
                return Err(DatabaseError::InvalidState(format!("scope key '{key}' is taken")));
            }
            let parent_id = match parent {
                Some(p) => Some(
                    self.find_scope_in(&tx, p)
                        .await?
                        .ok_or_else(|| DemocracyError::InvalidScope(p.to_string()))?
                        .id,
                ),
                None => None,
            };

            let now = now();
            let scope = Scope {
                id: self.db().generate_id(PREFIX_SCOPE).await?,
                key: key.to_string(),
                title: title.to_string(),
                parent_id,
                created_at: now,
            };
            tx.execute(
                &format!("INSERT INTO scopes ({SELECT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                libsql::params![
                    scope.id.as_str(),
                    scope.key.as_str(),
                    scope.title.as_str(),
                    scope.parent_id.as_deref(),
                    format_datetime(now)
                ],
            )
            .await?;
            self.append_audit(&tx, EntityType::Scope, &scope.id, AuditAction::Created, None, now)
                .await?;
            info!(scope = %scope.id, key, "scope created");
            Ok(scope)
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Get a scope by ID.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` if no such scope exists.
    pub async fn get_scope(&self, id: &str) -> Result<Scope, DatabaseError> {
        let _gate = self.read_gate().await;
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM scopes WHERE id = ?1"), [id])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DemocracyError::InvalidScope(id.to_string()))?;
        row_to_scope(&row)
    }

    /// Look a scope up by ID or key.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` if neither matches.
    pub async fn find_scope(&self, key_or_id: &str) -> Result<Scope, DatabaseError> {
        let _gate = self.read_gate().await;
        self.find_scope_in(self.db().conn(), key_or_id)
            .await?
            .ok_or_else(|| DemocracyError::InvalidScope(key_or_id.to_string()).into())
    }

    /// All scopes ordered by key.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_scopes(&self) -> Result<Vec<Scope>, DatabaseError> {
        let _gate = self.read_gate().await;
        self.list_scopes_in(self.db().conn()).await
    }

    /// Snapshot of the scope tree.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` if the stored links are
    /// inconsistent.
    pub async fn scope_tree(&self) -> Result<ScopeTree, DatabaseError> {
        let _gate = self.read_gate().await;
        self.scope_tree_in(self.db().conn()).await
    }

    pub(crate) async fn find_scope_in(
        &self,
        conn: &libsql::Connection,
        key_or_id: &str,
    ) -> Result<Option<Scope>, DatabaseError> {
        let mut rows = conn
            .query(
                &format!("SELECT {SELECT_COLS} FROM scopes WHERE id = ?1 OR key = ?1 LIMIT 1"),
                [key_or_id.trim()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_scope(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_scopes_in(&self, conn: &libsql::Connection) -> Result<Vec<Scope>, DatabaseError> {
        let mut rows = conn
            .query(&format!("SELECT {SELECT_COLS} FROM scopes ORDER BY key"), ())
            .await?;
        let mut scopes = Vec::new();
        while let Some(row) = rows.next().await? {
            scopes.push(row_to_scope(&row)?);
        }
        Ok(scopes)
    }

    pub(crate) async fn scope_tree_in(
        &self,
        conn: &libsql::Connection,
    ) -> Result<ScopeTree, DatabaseError> {
        let scopes = self.list_scopes_in(conn).await?;
        Ok(ScopeTree::from_scopes(&scopes)?)
    }
}
