//! Groups, permissions, poll kinds, positions, entity types, and audit actions.
//!
//! Unit enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`
//! and expose `as_str()` for SQL storage.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// Permission
// ---------------------------------------------------------------------------

/// A capability granted through group membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    VoteCast,
    DelegationCreate,
    DelegationShow,
    PollCreate,
    UserSupervise,
    InstanceAdmin,
}

impl Permission {
    /// Dotted name, as used in permission tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VoteCast => "vote.cast",
            Self::DelegationCreate => "delegation.create",
            Self::DelegationShow => "delegation.show",
            Self::PollCreate => "poll.create",
            Self::UserSupervise => "user.supervise",
            Self::InstanceAdmin => "instance.admin",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// Membership group. Each group grants a fixed permission set.
///
/// ```text
/// default ⊂ observer ⊂ voter ⊂ supervisor ⊂ admin
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    Default,
    Observer,
    Voter,
    Supervisor,
    Admin,
}

impl Group {
    #[must_use]
    pub const fn permissions(self) -> &'static [Permission] {
        use Permission::{
            DelegationCreate, DelegationShow, InstanceAdmin, PollCreate, UserSupervise, VoteCast,
        };
        match self {
            Self::Default => &[],
            Self::Observer => &[DelegationShow],
            Self::Voter => &[VoteCast, DelegationCreate, DelegationShow, PollCreate],
            Self::Supervisor => &[
                VoteCast,
                DelegationCreate,
                DelegationShow,
                PollCreate,
                UserSupervise,
            ],
            Self::Admin => &[
                VoteCast,
                DelegationCreate,
                DelegationShow,
                PollCreate,
                UserSupervise,
                InstanceAdmin,
            ],
        }
    }

    #[must_use]
    pub fn grants(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Observer => "observer",
            Self::Voter => "voter",
            Self::Supervisor => "supervisor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A stance on a poll.
///
/// Adopt/repeal polls take `adopt`, `reject`, or `abstain`; rate polls take a
/// `rating` inside their range or `abstain`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Adopt,
    Reject,
    Abstain,
    Rating(i64),
}

impl Position {
    /// Storage discriminant. The rating value lives in its own column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Adopt => "adopt",
            Self::Reject => "reject",
            Self::Abstain => "abstain",
            Self::Rating(_) => "rating",
        }
    }

    #[must_use]
    pub const fn rating(self) -> Option<i64> {
        match self {
            Self::Rating(value) => Some(value),
            _ => None,
        }
    }

    /// Rebuild a position from its storage columns.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an unknown discriminant or a
    /// `rating` row without a value.
    pub fn from_parts(kind: &str, rating: Option<i64>) -> Result<Self, CoreError> {
        match (kind, rating) {
            ("adopt", _) => Ok(Self::Adopt),
            ("reject", _) => Ok(Self::Reject),
            ("abstain", _) => Ok(Self::Abstain),
            ("rating", Some(value)) => Ok(Self::Rating(value)),
            ("rating", None) => Err(CoreError::Validation(
                "rating position without a value".into(),
            )),
            (other, _) => Err(CoreError::Validation(format!(
                "unknown position kind '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rating(value) => write!(f, "{value}"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for Position {
    type Err = CoreError;

    /// Accepts `adopt`/`yes`/`+`, `reject`/`no`/`-`, `abstain`, and any
    /// integer as a rating.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adopt" | "yes" | "+" => Ok(Self::Adopt),
            "reject" | "no" | "-" => Ok(Self::Reject),
            "abstain" => Ok(Self::Abstain),
            other => other.parse::<i64>().map(Self::Rating).map_err(|_| {
                CoreError::Validation(format!(
                    "invalid position '{s}' (expected adopt, reject, abstain, or an integer rating)"
                ))
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// PollKind
// ---------------------------------------------------------------------------

/// What a poll decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PollKind {
    /// Adopt a proposal (status quo: not adopted).
    Adopt,
    /// Repeal an adopted proposal (status quo: stays in force).
    Repeal,
    /// Rate on an inclusive integer scale.
    Rate { min: i64, max: i64 },
}

impl PollKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Adopt => "adopt",
            Self::Repeal => "repeal",
            Self::Rate { .. } => "rate",
        }
    }

    /// Whether this poll produces a binary adopted/rejected outcome.
    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(self, Self::Adopt | Self::Repeal)
    }

    /// Whether `position` lies in this poll's domain.
    #[must_use]
    pub const fn accepts(self, position: Position) -> bool {
        match (self, position) {
            (_, Position::Abstain) => true,
            (Self::Adopt | Self::Repeal, Position::Adopt | Position::Reject) => true,
            (Self::Rate { min, max }, Position::Rating(value)) => value >= min && value <= max,
            _ => false,
        }
    }

    /// Rebuild a poll kind from its storage columns.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an unknown kind, a rate poll
    /// without bounds, or bounds with `min > max`.
    pub fn from_parts(kind: &str, min: Option<i64>, max: Option<i64>) -> Result<Self, CoreError> {
        match (kind, min, max) {
            ("adopt", _, _) => Ok(Self::Adopt),
            ("repeal", _, _) => Ok(Self::Repeal),
            ("rate", Some(min), Some(max)) => Self::rate(min, max),
            ("rate", _, _) => Err(CoreError::Validation(
                "rate poll requires rating bounds".into(),
            )),
            (other, _, _) => Err(CoreError::Validation(format!(
                "unknown poll kind '{other}'"
            ))),
        }
    }

    /// Build a rate poll kind, checking the bounds.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if `min > max`.
    pub fn rate(min: i64, max: i64) -> Result<Self, CoreError> {
        if min > max {
            return Err(CoreError::Validation(format!(
                "rating range is empty: {min} > {max}"
            )));
        }
        Ok(Self::Rate { min, max })
    }
}

impl fmt::Display for PollKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rate { min, max } => write!(f, "rate[{min}..={max}]"),
            other => f.write_str(other.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// AuditAction
// ---------------------------------------------------------------------------

/// Type of action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
    Revoked,
    Superseded,
    GroupChanged,
    EmailActivated,
    Closed,
    Voted,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Revoked => "revoked",
            Self::Superseded => "superseded",
            Self::GroupChanged => "group_changed",
            Self::EmailActivated => "email_activated",
            Self::Closed => "closed",
            Self::Voted => "voted",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// Type of entity in the system, used in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    User,
    Membership,
    Scope,
    Delegation,
    Poll,
    Decision,
}

impl EntityType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Membership => "membership",
            Self::Scope => "scope",
            Self::Delegation => "delegation",
            Self::Poll => "poll",
            Self::Decision => "decision",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_serde_roundtrip {
        ($name:ident, $ty:ty, $variant:expr, $expected_json:expr) => {
            #[test]
            fn $name() {
                let val = $variant;
                let json = serde_json::to_string(&val).unwrap();
                assert_eq!(json, $expected_json);
                let recovered: $ty = serde_json::from_str(&json).unwrap();
                assert_eq!(recovered, val);
            }
        };
    }

    test_serde_roundtrip!(group_voter, Group, Group::Voter, r#""voter""#);
    test_serde_roundtrip!(
        permission_vote_cast,
        Permission,
        Permission::VoteCast,
        r#""vote_cast""#
    );
    test_serde_roundtrip!(position_adopt, Position, Position::Adopt, r#""adopt""#);
    test_serde_roundtrip!(
        position_rating,
        Position,
        Position::Rating(-1),
        r#"{"rating":-1}"#
    );
    test_serde_roundtrip!(poll_kind_repeal, PollKind, PollKind::Repeal, r#"{"type":"repeal"}"#);
    test_serde_roundtrip!(
        poll_kind_rate,
        PollKind,
        PollKind::Rate { min: 1, max: 5 },
        r#"{"type":"rate","min":1,"max":5}"#
    );
    test_serde_roundtrip!(
        audit_group_changed,
        AuditAction,
        AuditAction::GroupChanged,
        r#""group_changed""#
    );
    test_serde_roundtrip!(
        entity_delegation,
        EntityType,
        EntityType::Delegation,
        r#""delegation""#
    );

    #[test]
    fn groups_are_nested() {
        let order = [
            Group::Default,
            Group::Observer,
            Group::Voter,
            Group::Supervisor,
            Group::Admin,
        ];
        for pair in order.windows(2) {
            for perm in pair[0].permissions() {
                assert!(pair[1].grants(*perm), "{} should include {perm}", pair[1]);
            }
        }
        assert!(!Group::Observer.grants(Permission::VoteCast));
        assert!(Group::Voter.grants(Permission::VoteCast));
    }

    #[test]
    fn position_parses_aliases_and_ratings() {
        assert_eq!("yes".parse::<Position>().unwrap(), Position::Adopt);
        assert_eq!(" Reject ".parse::<Position>().unwrap(), Position::Reject);
        assert_eq!("abstain".parse::<Position>().unwrap(), Position::Abstain);
        assert_eq!("-2".parse::<Position>().unwrap(), Position::Rating(-2));
        assert!("maybe".parse::<Position>().is_err());
    }

    #[test]
    fn position_storage_parts_roundtrip() {
        for pos in [
            Position::Adopt,
            Position::Reject,
            Position::Abstain,
            Position::Rating(4),
        ] {
            assert_eq!(Position::from_parts(pos.as_str(), pos.rating()).unwrap(), pos);
        }
        assert!(Position::from_parts("rating", None).is_err());
    }

    #[test]
    fn poll_kind_domain() {
        assert!(PollKind::Adopt.accepts(Position::Adopt));
        assert!(PollKind::Repeal.accepts(Position::Abstain));
        assert!(!PollKind::Adopt.accepts(Position::Rating(1)));

        let rate = PollKind::rate(-1, 1).unwrap();
        assert!(rate.accepts(Position::Rating(-1)));
        assert!(rate.accepts(Position::Rating(1)));
        assert!(!rate.accepts(Position::Rating(2)));
        assert!(!rate.accepts(Position::Adopt));
        assert!(rate.accepts(Position::Abstain));
    }

    #[test]
    fn poll_kind_rejects_empty_range() {
        assert!(PollKind::rate(3, 1).is_err());
        assert!(PollKind::from_parts("rate", Some(1), None).is_err());
        assert_eq!(
            PollKind::from_parts("rate", Some(0), Some(10)).unwrap(),
            PollKind::Rate { min: 0, max: 10 }
        );
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(format!("{}", Group::Supervisor), "supervisor");
        assert_eq!(format!("{}", Permission::DelegationCreate), "delegation.create");
        assert_eq!(format!("{}", Position::Reject), "reject");
        assert_eq!(format!("{}", Position::Rating(3)), "3");
        assert_eq!(format!("{}", PollKind::Adopt), "adopt");
        assert_eq!(format!("{}", AuditAction::Superseded), "superseded");
        assert_eq!(format!("{}", EntityType::Poll), "poll");
    }
}
