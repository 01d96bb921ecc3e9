//! # agora-db
//!
//! libSQL persistence for Agora: users, scopes, memberships, delegation
//! edges, polls, decisions, and the audit trail.
//!
//! [`service::AgoraService`] is the entry point. Its repository methods run
//! every mutation in one `BEGIN IMMEDIATE` transaction together with the
//! matching audit entry, and load immutable snapshots for the
//! `agora-democracy` engine in one read.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod service;
pub mod updates;

#[cfg(test)]
mod test_support;

use error::DatabaseError;
use libsql::Builder;

/// Central database handle.
///
/// Holds a single connection: every `connect()` on `:memory:` opens a fresh,
/// empty database.
pub struct AgoraDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl AgoraDb {
    /// Open a local database at the given path. `:memory:` for tests.
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let agora_db = Self { db, conn };
        agora_db.run_migrations().await?;
        Ok(agora_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Generate a prefixed ID via libSQL. Returns e.g., `"dlg-a3f8b2c1"`.
    ///
    /// Uses `randomblob(4)` in SQL to produce 8-char hex, then prepends the prefix.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT '{prefix}-' || lower(hex(randomblob(4)))"),
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }

    /// Generate a random 16-byte hex token (email activation codes).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_token(&self) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query("SELECT lower(hex(randomblob(16)))", ())
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::ids::ALL_PREFIXES;
    use std::collections::HashSet;

    async fn test_db() -> AgoraDb {
        AgoraDb::open_local(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn open_local_creates_schema() {
        let db = test_db().await;
        let tables = [
            "users",
            "scopes",
            "memberships",
            "delegations",
            "polls",
            "decisions",
            "audit_trail",
        ];
        for table in &tables {
            let mut rows = db
                .conn()
                .query(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    [*table],
                )
                .await
                .unwrap();
            let row = rows.next().await.unwrap();
            assert!(row.is_some(), "table '{table}' should exist");
        }
    }

    #[tokio::test]
    async fn generate_id_correct_format() {
        let db = test_db().await;
        let id = db.generate_id("dlg").await.unwrap();
        assert!(id.starts_with("dlg-"), "{id}");
        assert_eq!(id.len(), 12, "3 prefix + dash + 8 hex: {id}");
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn generate_id_all_prefixes() {
        let db = test_db().await;
        for prefix in ALL_PREFIXES {
            let id = db.generate_id(prefix).await.unwrap();
            assert_eq!(agora_core::ids::prefix_of(&id), Some(*prefix));
        }
    }

    #[tokio::test]
    async fn generate_id_uniqueness() {
        let db = test_db().await;
        let mut ids = HashSet::new();
        for _ in 0..200 {
            ids.insert(db.generate_id("usr").await.unwrap());
        }
        assert_eq!(ids.len(), 200);
    }

    #[tokio::test]
    async fn tokens_are_long_and_distinct() {
        let db = test_db().await;
        let a = db.generate_token().await.unwrap();
        let b = db.generate_token().await.unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn idempotent_migrations() {
        let db = test_db().await;
        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn self_delegation_blocked_by_schema() {
        let db = test_db().await;
        db.conn()
            .execute_batch(
                "INSERT INTO users (id, user_name, created_at) VALUES ('usr-1', 'a', '2024-01-01T00:00:00.000000Z');
                 INSERT INTO scopes (id, key, title, created_at) VALUES ('scp-1', 'g', 'G', '2024-01-01T00:00:00.000000Z');",
            )
            .await
            .unwrap();
        let result = db
            .conn()
            .execute(
                "INSERT INTO delegations (id, principal_id, agent_id, scope_id, created_at)
                 VALUES ('dlg-1', 'usr-1', 'usr-1', 'scp-1', '2024-01-01T00:00:00.000000Z')",
                (),
            )
            .await;
        assert!(result.is_err());
    }
}
