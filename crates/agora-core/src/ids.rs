//! ID prefix constants.
//!
//! Every entity ID is `{prefix}-{8 hex chars}`, e.g. `usr-a3f8b2c1`. The random
//! part is generated by the database (see `AgoraDb::generate_id`).

pub const PREFIX_USER: &str = "usr";
pub const PREFIX_MEMBERSHIP: &str = "mbr";
pub const PREFIX_SCOPE: &str = "scp";
pub const PREFIX_DELEGATION: &str = "dlg";
pub const PREFIX_POLL: &str = "pol";
pub const PREFIX_DECISION: &str = "dec";
pub const PREFIX_AUDIT: &str = "aud";

/// All known prefixes, in declaration order.
pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_USER,
    PREFIX_MEMBERSHIP,
    PREFIX_SCOPE,
    PREFIX_DELEGATION,
    PREFIX_POLL,
    PREFIX_DECISION,
    PREFIX_AUDIT,
];

/// Return the prefix part of an ID, if it has one of the known prefixes.
#[must_use]
pub fn prefix_of(id: &str) -> Option<&'static str> {
    let (prefix, rest) = id.split_once('-')?;
    if rest.is_empty() {
        return None;
    }
    ALL_PREFIXES.iter().copied().find(|p| *p == prefix)
}
