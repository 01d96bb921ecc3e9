//! Voting rules.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_required_majority() -> f64 {
    0.5
}

const fn default_rating_min() -> i64 {
    -1
}

const fn default_rating_max() -> i64 {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DemocracyConfig {
    /// Share of adopt votes among adopt + reject that must be exceeded for
    /// an adopt or repeal poll to pass.
    #[serde(default = "default_required_majority")]
    pub required_majority: f64,

    /// Minimum number of participating (adopt + reject + abstain) voters.
    #[serde(default)]
    pub min_participation: u32,

    /// Rating range used when a rate poll is created without bounds.
    #[serde(default = "default_rating_min")]
    pub default_rating_min: i64,

    #[serde(default = "default_rating_max")]
    pub default_rating_max: i64,
}

impl Default for DemocracyConfig {
    fn default() -> Self {
        Self {
            required_majority: default_required_majority(),
            min_participation: 0,
            default_rating_min: default_rating_min(),
            default_rating_max: default_rating_max(),
        }
    }
}

impl DemocracyConfig {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when `required_majority` is outside
    /// `[0, 1)` or the default rating range is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.required_majority) {
            return Err(ConfigError::InvalidValue {
                field: "democracy.required_majority".into(),
                reason: format!("{} is not in [0, 1)", self.required_majority),
            });
        }
        if self.default_rating_min > self.default_rating_max {
            return Err(ConfigError::InvalidValue {
                field: "democracy.default_rating_min".into(),
                reason: format!(
                    "{} is greater than default_rating_max {}",
                    self.default_rating_min, self.default_rating_max
                ),
            });
        }
        Ok(())
    }
}
