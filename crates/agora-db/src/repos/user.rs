//! User repository.
//!
//! Accounts are soft-deleted. Deleting an account revokes every delegation
//! it takes part in, in the same transaction.

use agora_core::audit_detail::{RevokeReason, UpdatedDetail};
use agora_core::credentials::Credential;
use agora_core::entities::User;
use agora_core::enums::{AuditAction, EntityType};
use agora_core::errors::CoreError;
use agora_core::ids::PREFIX_USER;
use agora_core::locale::Locale;
use agora_democracy::DemocracyError;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::DatabaseError;
use crate::helpers::{format_datetime, get_opt_datetime, get_opt_string, now, parse_datetime, to_detail};
use crate::service::AgoraService;
use crate::updates::user::UserUpdate;

const SELECT_COLS: &str = "id, user_name, display_name, bio, email, activation_code, locale, \
                           created_at, access_time, delete_time";

fn row_to_user(row: &libsql::Row) -> Result<User, DatabaseError> {
    let email = get_opt_string(row, 4)?;
    let pending_code = get_opt_string(row, 5)?;
    Ok(User {
        id: row.get::<String>(0)?,
        user_name: row.get::<String>(1)?,
        display_name: get_opt_string(row, 2)?,
        bio: get_opt_string(row, 3)?,
        email_activated: email.is_some() && pending_code.is_none(),
        email,
        locale: get_opt_string(row, 6)?.map(|l| l.parse::<Locale>()).transpose()?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        access_time: get_opt_datetime(row, 8)?,
        delete_time: get_opt_datetime(row, 9)?,
    })
}

fn validate_user_name(user_name: &str) -> Result<&str, CoreError> {
    let trimmed = user_name.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(CoreError::Validation(format!(
            "invalid user name '{user_name}': must be non-empty without spaces"
        )));
    }
    Ok(trimmed)
}

fn normalize_email(email: &str) -> Result<String, CoreError> {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
            Ok(trimmed.to_lowercase())
        }
        _ => Err(CoreError::Validation(format!("invalid email '{email}'"))),
    }
}

impl AgoraService {
    /// Create a user. A password is hashed before it reaches storage; an
    /// email starts unconfirmed with a fresh activation code.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for a malformed name, email or empty
    /// password, `DatabaseError::InvalidState` if the user name is taken.
    pub async fn create_user(
        &self,
        user_name: &str,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<User, DatabaseError> {
        let user_name = validate_user_name(user_name)?;
        let email = email.map(normalize_email).transpose()?;
        let credential = password.map(Credential::new).transpose()?;

        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<User, DatabaseError> = async {
            if self.find_user_in(&tx, user_name).await?.is_some() {
                return Err(DatabaseError::InvalidState(format!(
                    "user name '{user_name}' is taken"
                )));
            }
            let now = now();
            let id = self.db().generate_id(PREFIX_USER).await?;
            let code = match email {
                Some(_) => Some(self.db().generate_token().await?),
                None => None,
            };
            tx.execute(
                "INSERT INTO users (id, user_name, email, activation_code, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                libsql::params![
                    id.as_str(),
                    user_name,
                    email.as_deref(),
                    code.as_deref(),
                    credential.as_ref().map(Credential::as_str),
                    format_datetime(now)
                ],
            )
            .await?;
            let user = self.get_user_in(&tx, &id).await?;
            self.append_audit(&tx, EntityType::User, &id, AuditAction::Created, None, now)
                .await?;
            info!(user = %id, user_name, "user created");
            Ok(user)
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Get a user by ID, deleted accounts included.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::UserNotFound` if no such user exists.
    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        let _gate = self.read_gate().await;
        self.get_user_in(self.db().conn(), id).await
    }

    /// Look a user up by ID or user name.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::UserNotFound` if neither matches.
    pub async fn find_user(&self, name_or_id: &str) -> Result<User, DatabaseError> {
        let _gate = self.read_gate().await;
        self.find_user_in(self.db().conn(), name_or_id)
            .await?
            .ok_or_else(|| DemocracyError::UserNotFound(name_or_id.to_string()).into())
    }

    /// List users ordered by user name.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_users(
        &self,
        include_deleted: bool,
        limit: u32,
    ) -> Result<Vec<User>, DatabaseError> {
        let _gate = self.read_gate().await;
        let filter = if include_deleted {
            ""
        } else {
            "WHERE delete_time IS NULL"
        };
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM users {filter} ORDER BY user_name LIMIT ?1"),
                [i64::from(limit)],
            )
            .await?;
        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(row_to_user(&row)?);
        }
        Ok(users)
    }

    /// Live users whose user name or display name starts with `prefix`,
    /// for autocompletion.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn complete_users(&self, prefix: &str, limit: u32) -> Result<Vec<User>, DatabaseError> {
        let _gate = self.read_gate().await;
        let pattern = format!(
            "{}%",
            prefix.trim().replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
        );
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM users
                     WHERE delete_time IS NULL
                       AND (user_name LIKE ?1 ESCAPE '\\' OR display_name LIKE ?1 ESCAPE '\\')
                     ORDER BY user_name LIMIT ?2"
                ),
                libsql::params![pattern, i64::from(limit)],
            )
            .await?;
        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(row_to_user(&row)?);
        }
        Ok(users)
    }

    /// Apply a profile update. An empty update returns the user unchanged
    /// without an audit entry.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::UserNotFound` for a missing or deleted user.
    pub async fn update_user(&self, id: &str, update: UserUpdate) -> Result<User, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<User, DatabaseError> = async {
            let now = now();
            let current = self.live_user_in(&tx, id, now).await?;
            if update.is_empty() {
                return Ok(current);
            }

            let mut sets = Vec::new();
            let mut params: Vec<libsql::Value> = Vec::new();
            let mut idx = 1;

            if let Some(ref display_name) = update.display_name {
                sets.push(format!("display_name = ?{idx}"));
                params.push(display_name.as_deref().map(str::trim).into());
                idx += 1;
            }
            if let Some(ref bio) = update.bio {
                sets.push(format!("bio = ?{idx}"));
                params.push(bio.as_deref().into());
                idx += 1;
            }
            if let Some(ref locale) = update.locale {
                sets.push(format!("locale = ?{idx}"));
                params.push(locale.as_ref().map(ToString::to_string).into());
                idx += 1;
            }
            params.push(id.into());
            let sql = format!("UPDATE users SET {} WHERE id = ?{idx}", sets.join(", "));
            tx.execute(&sql, libsql::params_from_iter(params)).await?;

            let user = self.get_user_in(&tx, id).await?;
            self.append_audit(
                &tx,
                EntityType::User,
                id,
                AuditAction::Updated,
                Some(to_detail(&update)?),
                now,
            )
            .await?;
            Ok(user)
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Replace the user's password.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an empty password,
    /// `DemocracyError::UserNotFound` for a missing or deleted user.
    pub async fn set_password(&self, id: &str, password: &str) -> Result<(), DatabaseError> {
        let credential = Credential::new(password)?;
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<(), DatabaseError> = async {
            let now = now();
            self.live_user_in(&tx, id, now).await?;
            tx.execute(
                "UPDATE users SET password_hash = ?1 WHERE id = ?2",
                libsql::params![credential.as_str(), id],
            )
            .await?;
            self.append_updated_fields(&tx, id, &["password"], now).await
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Check a password and, on success, record the access time.
    ///
    /// Returns `None` for an unknown or deleted user, a user without a
    /// password, or a wrong password.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the store cannot be read or written.
    pub async fn authenticate(
        &self,
        name_or_id: &str,
        password: &str,
    ) -> Result<Option<User>, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<Option<User>, DatabaseError> = async {
            let now = now();
            let Some(user) = self.find_user_in(&tx, name_or_id).await? else {
                return Ok(None);
            };
            if user.is_deleted(now) {
                return Ok(None);
            }
            let mut rows = tx
                .query("SELECT password_hash FROM users WHERE id = ?1", [user.id.as_str()])
                .await?;
            let stored = match rows.next().await? {
                Some(row) => get_opt_string(&row, 0)?,
                None => None,
            };
            let Some(stored) = stored else {
                return Ok(None);
            };
            if !Credential::from_phc(stored)?.verify(password) {
                return Ok(None);
            }
            tx.execute(
                "UPDATE users SET access_time = ?1 WHERE id = ?2",
                libsql::params![format_datetime(now), user.id.as_str()],
            )
            .await?;
            self.append_updated_fields(&tx, &user.id, &["access_time"], now)
                .await?;
            Ok(Some(User {
                access_time: Some(now),
                ..user
            }))
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Change or clear the email address. A new address needs confirming:
    /// the returned activation code must be passed to [`Self::activate_email`].
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for a malformed address,
    /// `DemocracyError::UserNotFound` for a missing or deleted user.
    pub async fn set_email(
        &self,
        id: &str,
        email: Option<&str>,
    ) -> Result<Option<String>, DatabaseError> {
        let email = email.map(normalize_email).transpose()?;
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<Option<String>, DatabaseError> = async {
            let now = now();
            self.live_user_in(&tx, id, now).await?;
            let code = match email {
                Some(_) => Some(self.db().generate_token().await?),
                None => None,
            };
            tx.execute(
                "UPDATE users SET email = ?1, activation_code = ?2 WHERE id = ?3",
                libsql::params![email.as_deref(), code.as_deref(), id],
            )
            .await?;
            self.append_updated_fields(&tx, id, &["email"], now).await?;
            Ok(code)
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Confirm the pending email address with its activation code.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if no activation is pending or
    /// the code does not match.
    pub async fn activate_email(&self, id: &str, code: &str) -> Result<User, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<User, DatabaseError> = async {
            let now = now();
            self.live_user_in(&tx, id, now).await?;
            let changed = tx
                .execute(
                    "UPDATE users SET activation_code = NULL
                     WHERE id = ?1 AND email IS NOT NULL AND activation_code = ?2",
                    libsql::params![id, code.trim()],
                )
                .await?;
            if changed == 0 {
                return Err(DatabaseError::InvalidState(format!(
                    "no pending activation for {id} with that code"
                )));
            }
            self.append_audit(&tx, EntityType::User, id, AuditAction::EmailActivated, None, now)
                .await?;
            self.get_user_in(&tx, id).await
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Soft-delete an account and revoke every delegation it takes part in.
    /// Deleting an already deleted account is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::UserNotFound` if no such user exists.
    pub async fn delete_user(&self, id: &str) -> Result<User, DatabaseError> {
        let _gate = self.write_gate().await;
        let tx = self.begin().await?;
        let result: Result<User, DatabaseError> = async {
            let now = now();
            let user = self.get_user_in(&tx, id).await?;
            if user.is_deleted(now) {
                return Ok(user);
            }
            tx.execute(
                "UPDATE users SET delete_time = ?1 WHERE id = ?2",
                libsql::params![format_datetime(now), id],
            )
            .await?;
            let edges = self.active_edges_of_in(&tx, id, now).await?;
            let revoked = self
                .revoke_edges_in(&tx, &edges, now, RevokeReason::AccountDeleted)
                .await?;
            self.append_audit(&tx, EntityType::User, id, AuditAction::Deleted, None, now)
                .await?;
            info!(user = %id, revoked, "user deleted");
            Ok(User {
                delete_time: Some(now),
                ..user
            })
        }
        .await;
        Self::finish(tx, result).await
    }

    pub(crate) async fn get_user_in(
        &self,
        conn: &libsql::Connection,
        id: &str,
    ) -> Result<User, DatabaseError> {
        let mut rows = conn
            .query(&format!("SELECT {SELECT_COLS} FROM users WHERE id = ?1"), [id])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DemocracyError::UserNotFound(id.to_string()))?;
        row_to_user(&row)
    }

    pub(crate) async fn find_user_in(
        &self,
        conn: &libsql::Connection,
        name_or_id: &str,
    ) -> Result<Option<User>, DatabaseError> {
        let mut rows = conn
            .query(
                &format!("SELECT {SELECT_COLS} FROM users WHERE id = ?1 OR user_name = ?1 LIMIT 1"),
                [name_or_id.trim()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    /// The user, failing with `UserNotFound` when missing or deleted at `at`.
    pub(crate) async fn live_user_in(
        &self,
        conn: &libsql::Connection,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<User, DatabaseError> {
        let user = self.get_user_in(conn, id).await?;
        if user.is_deleted(at) {
            return Err(DemocracyError::UserNotFound(id.to_string()).into());
        }
        Ok(user)
    }

    async fn append_updated_fields(
        &self,
        conn: &libsql::Connection,
        id: &str,
        fields: &[&str],
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let detail = UpdatedDetail {
            fields: fields.iter().map(ToString::to_string).collect(),
        };
        self.append_audit(
            conn,
            EntityType::User,
            id,
            AuditAction::Updated,
            Some(to_detail(&detail)?),
            at,
        )
        .await?;
        Ok(())
    }
}
