//! Group-based permissions over the scope tree.
//!
//! A membership applies to a target scope when it is global or its scope
//! contains the target. A user holds a permission in a scope when some
//! unexpired applying membership grants it.

use std::collections::BTreeMap;

use agora_core::entities::Membership;
use agora_core::enums::Permission;
use chrono::{DateTime, Utc};

use crate::error::DemocracyError;
use crate::scope::ScopeTree;

/// Whether `membership` covers `scope`.
///
/// # Errors
///
/// Returns `DemocracyError::InvalidScope` if either scope is unknown.
pub fn applies_to(
    membership: &Membership,
    scopes: &ScopeTree,
    scope: &str,
) -> Result<bool, DemocracyError> {
    match &membership.scope_id {
        None => scopes.specificity(scope).map(|_| true),
        Some(own) => scopes.contains(own, scope),
    }
}

/// Memberships of live (not deleted) users, grouped by user.
#[derive(Debug, Clone, Default)]
pub struct AccessIndex {
    by_user: BTreeMap<String, Vec<Membership>>,
}

impl AccessIndex {
    pub fn new(memberships: impl IntoIterator<Item = Membership>) -> Self {
        let mut by_user: BTreeMap<String, Vec<Membership>> = BTreeMap::new();
        for membership in memberships {
            by_user
                .entry(membership.user_id.clone())
                .or_default()
                .push(membership);
        }
        Self { by_user }
    }

    /// Whether `user` holds `permission` in `scope` at `at`.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` for an unknown scope.
    pub fn can(
        &self,
        scopes: &ScopeTree,
        user: &str,
        permission: Permission,
        scope: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DemocracyError> {
        scopes.specificity(scope)?;
        let Some(memberships) = self.by_user.get(user) else {
            return Ok(false);
        };
        for membership in memberships {
            if membership.grants(permission, at) && applies_to(membership, scopes, scope)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Like [`Self::can`], but fails with `PermissionDenied`.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::PermissionDenied` when the permission is
    /// missing, `InvalidScope` for an unknown scope.
    pub fn require(
        &self,
        scopes: &ScopeTree,
        user: &str,
        permission: Permission,
        scope: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DemocracyError> {
        if self.can(scopes, user, permission, scope, at)? {
            Ok(())
        } else {
            Err(DemocracyError::PermissionDenied {
                user_id: user.to_string(),
                permission,
                scope_id: scope.to_string(),
            })
        }
    }

    /// Users with `vote.cast` in `scope` at `at`, in ID order.
    ///
    /// # Errors
    ///
    /// Returns `DemocracyError::InvalidScope` for an unknown scope.
    pub fn eligible(
        &self,
        scopes: &ScopeTree,
        scope: &str,
        at: DateTime<Utc>,
    ) -> Result<Vec<String>, DemocracyError> {
        let mut out = Vec::new();
        for user in self.by_user.keys() {
            if self.can(scopes, user, Permission::VoteCast, scope, at)? {
                out.push(user.clone());
            }
        }
        Ok(out)
    }
}
