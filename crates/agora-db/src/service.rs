//! Service layer orchestrating database mutations and engine snapshots.
//!
//! `AgoraService` wraps `AgoraDb`. All repo methods are implemented as
//! `impl AgoraService` blocks under `repos/`.

use std::path::Path;

use agora_config::{AgoraConfig, DemocracyConfig};
use agora_democracy::TallyPolicy;
use libsql::{Transaction, TransactionBehavior};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::AgoraDb;
use crate::error::DatabaseError;

/// Orchestrates database mutations with the audit trail.
///
/// Every mutation method follows this protocol:
/// 1. Take the write gate (in-process writers are exclusive)
/// 2. `BEGIN IMMEDIATE` (cross-process writers are serialized)
/// 3. Run every check, then every write, then the audit entries
/// 4. Commit, or roll back on the first error
///
/// Read methods take the read gate, so they never observe a mutation that is
/// still in flight on the shared connection.
pub struct AgoraService {
    db: AgoraDb,
    gate: RwLock<()>,
    policy: TallyPolicy,
    rating_range: (i64, i64),
}

impl AgoraService {
    /// Create a new service wrapping a local database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str) -> Result<Self, DatabaseError> {
        let db = AgoraDb::open_local(db_path).await?;
        Ok(Self::from_db(db))
    }

    /// Open the configured database, creating its directory if needed, and
    /// apply the configured voting rules.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the directory cannot be created or the
    /// database cannot be opened.
    pub async fn from_config(config: &AgoraConfig) -> Result<Self, DatabaseError> {
        let path = config.database.path.as_str();
        let parent = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty());
        if let (false, Some(parent)) = (config.database.is_in_memory(), parent) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::InvalidState(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let svc = Self::new_local(path).await?.with_rules(&config.democracy);
        debug!(path, "service opened");
        Ok(svc)
    }

    /// Create from an existing `AgoraDb` with default voting rules.
    #[must_use]
    pub fn from_db(db: AgoraDb) -> Self {
        let defaults = DemocracyConfig::default();
        Self {
            db,
            gate: RwLock::new(()),
            policy: TallyPolicy::default(),
            rating_range: (defaults.default_rating_min, defaults.default_rating_max),
        }
    }

    /// Replace the voting rules.
    #[must_use]
    pub fn with_rules(mut self, rules: &DemocracyConfig) -> Self {
        self.policy = TallyPolicy {
            required_majority: rules.required_majority,
            min_participation: rules.min_participation,
        };
        self.rating_range = (rules.default_rating_min, rules.default_rating_max);
        self
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &AgoraDb {
        &self.db
    }

    #[must_use]
    pub const fn policy(&self) -> &TallyPolicy {
        &self.policy
    }

    /// Rating bounds for rate polls created without explicit bounds.
    #[must_use]
    pub const fn default_rating_range(&self) -> (i64, i64) {
        self.rating_range
    }

    pub(crate) async fn write_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().await
    }

    pub(crate) async fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().await
    }

    /// Start a write transaction that holds the database write lock from the
    /// first statement.
    pub(crate) async fn begin(&self) -> Result<Transaction, DatabaseError> {
        Ok(self
            .db
            .conn()
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?)
    }

    /// Commit on success, roll back on failure.
    pub(crate) async fn finish<T>(
        tx: Transaction,
        result: Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }
}
