use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A scoped, directed edge: `principal` lets `agent` decide for them inside
/// `scope` and every scope it contains.
///
/// Edges are never deleted. Withdrawal and supersession set `revoke_time`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Delegation {
    pub id: String,
    pub principal_id: String,
    pub agent_id: String,
    pub scope_id: String,
    pub created_at: DateTime<Utc>,
    pub revoke_time: Option<DateTime<Utc>>,
}

impl Delegation {
    /// Active iff created at or before `at` and not revoked by `at`.
    #[must_use]
    pub fn is_active(&self, at: DateTime<Utc>) -> bool {
        self.created_at <= at && self.revoke_time.is_none_or(|revoked| revoked > at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn edge(revoke_time: Option<DateTime<Utc>>) -> Delegation {
        Delegation {
            id: "dlg-00000001".into(),
            principal_id: "usr-00000001".into(),
            agent_id: "usr-00000002".into(),
            scope_id: "scp-00000001".into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            revoke_time,
        }
    }

    #[test]
    fn active_window() {
        let d = edge(None);
        assert!(!d.is_active(d.created_at - Duration::seconds(1)));
        assert!(d.is_active(d.created_at));
        assert!(d.is_active(d.created_at + Duration::days(365)));
    }

    #[test]
    fn revoke_time_is_exclusive() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let revoked = created + Duration::hours(1);
        let d = edge(Some(revoked));
        assert!(d.is_active(revoked - Duration::seconds(1)));
        assert!(!d.is_active(revoked));
    }
}
