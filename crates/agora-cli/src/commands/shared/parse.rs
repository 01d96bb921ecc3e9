use anyhow::bail;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;

/// Parse a snake_case enum value using serde-deserialization.
///
/// Hyphens and dots are accepted in place of underscores, so both
/// `vote.cast` and `vote-cast` name `Permission::VoteCast`.
pub fn parse_enum<T>(raw: &str, field: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let normalized = raw.trim().replace(['-', '.'], "_");
    let json = format!("\"{normalized}\"");
    serde_json::from_str(&json).map_err(|error| anyhow::anyhow!("invalid {field} '{raw}': {error}"))
}

/// Parse an RFC 3339 instant or a `YYYY-MM-DD` date (midnight UTC).
pub fn parse_instant(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    bail!("invalid instant '{raw}': expected RFC 3339 or YYYY-MM-DD")
}

pub fn parse_optional_instant(raw: Option<&str>) -> anyhow::Result<Option<DateTime<Utc>>> {
    raw.map(parse_instant).transpose()
}

#[cfg(test)]
mod tests {
    use agora_core::enums::{EntityType, Group, Permission};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::{parse_enum, parse_instant, parse_optional_instant};

    #[test]
    fn parses_snake_case_enum() {
        let group: Group = parse_enum("voter", "group").expect("group should parse");
        assert_eq!(group, Group::Voter);
        let entity: EntityType = parse_enum("delegation", "entity type").expect("should parse");
        assert_eq!(entity, EntityType::Delegation);
    }

    #[test]
    fn parses_dotted_permission() {
        let permission: Permission =
            parse_enum("vote.cast", "permission").expect("permission should parse");
        assert_eq!(permission, Permission::VoteCast);
        let permission: Permission =
            parse_enum("delegation-create", "permission").expect("permission should parse");
        assert_eq!(permission, Permission::DelegationCreate);
    }

    #[test]
    fn errors_on_invalid_enum() {
        let err = parse_enum::<Group>("citizen", "group").expect_err("should fail");
        assert!(err.to_string().contains("invalid group 'citizen'"));
    }

    #[test]
    fn parses_rfc3339_and_dates() {
        assert_eq!(
            parse_instant("2024-03-01T12:30:00+01:00").expect("rfc3339"),
            Utc.with_ymd_and_hms(2024, 3, 1, 11, 30, 0).unwrap()
        );
        assert_eq!(
            parse_instant("2024-03-01").expect("date"),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert!(parse_instant("yesterday").is_err());
        assert_eq!(parse_optional_instant(None).expect("none"), None);
    }
}
