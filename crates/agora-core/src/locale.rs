//! Validated user locale.
//!
//! A locale is a lowercase language subtag (2-3 letters) with an optional
//! uppercase region (2 letters), joined by `_`: `de`, `en_GB`, `fra_FR`.
//! Parsing accepts `-` as separator and any letter case.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale {
    language: String,
    region: Option<String>,
}

impl Locale {
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

fn is_alpha(s: &str, lengths: std::ops::RangeInclusive<usize>) -> bool {
    lengths.contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphabetic())
}

impl FromStr for Locale {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::Validation(format!("invalid locale '{s}'"));
        let trimmed = s.trim();
        let mut parts = trimmed.split(['_', '-']);

        let language = parts.next().filter(|l| is_alpha(l, 2..=3)).ok_or_else(invalid)?;
        let region = match parts.next() {
            None => None,
            Some(r) if is_alpha(r, 2..=2) => Some(r.to_ascii_uppercase()),
            Some(_) => return Err(invalid()),
        };
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            language: language.to_ascii_lowercase(),
            region,
        })
    }
}

impl TryFrom<String> for Locale {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.to_string()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}_{region}", self.language),
            None => f.write_str(&self.language),
        }
    }
}

impl JsonSchema for Locale {
    fn schema_name() -> Cow<'static, str> {
        "Locale".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "string",
            "pattern": "^[a-z]{2,3}(_[A-Z]{2})?$"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_separator() {
        let locale: Locale = "DE-de".parse().unwrap();
        assert_eq!(locale.to_string(), "de_DE");
        assert_eq!(locale.language(), "de");
        assert_eq!(locale.region(), Some("DE"));
    }

    #[test]
    fn language_only() {
        let locale: Locale = "fr".parse().unwrap();
        assert_eq!(locale.to_string(), "fr");
        assert_eq!(locale.region(), None);
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "d", "deutsch", "de_DEU", "de_1A", "de_DE_x", "12"] {
            assert!(bad.parse::<Locale>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn serde_uses_string_form() {
        let locale: Locale = "en_gb".parse().unwrap();
        let json = serde_json::to_string(&locale).unwrap();
        assert_eq!(json, r#""en_GB""#);
        let back: Locale = serde_json::from_str(&json).unwrap();
        assert_eq!(back, locale);
        assert!(serde_json::from_str::<Locale>(r#""nope_nope""#).is_err());
    }
}
