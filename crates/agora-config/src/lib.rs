//! # agora-config
//!
//! Layered configuration loading for Agora using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`AGORA_*` prefix, `__` as separator)
//! 2. Project-level `.agora/config.toml`
//! 3. User-level `~/.config/agora/config.toml`
//! 4. Built-in defaults
//!
//! Figment maps `AGORA_DATABASE__PATH` -> `database.path`,
//! `AGORA_DEMOCRACY__REQUIRED_MAJORITY` -> `democracy.required_majority`, etc.
//!
//! ```no_run
//! use agora_config::AgoraConfig;
//!
//! let config = AgoraConfig::load_with_dotenv().expect("config");
//! println!("database: {}", config.database.path);
//! ```

mod database;
mod democracy;
mod error;
mod general;

pub use database::DatabaseConfig;
pub use democracy::DemocracyConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AgoraConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub democracy: DemocracyConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl AgoraConfig {
    /// Load configuration from TOML files and environment variables, then
    /// validate it.
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` on malformed sources and
    /// `ConfigError::InvalidValue` / `NotConfigured` from [`Self::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration after reading `.env` from the current directory.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        // A missing .env is normal.
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests and the CLI can add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(".agora/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("AGORA_").split("__"))
    }

    /// Cross-field checks that serde defaults cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.database.is_configured() {
            return Err(ConfigError::NotConfigured {
                section: "database".into(),
            });
        }
        self.democracy.validate()?;
        if self.general.default_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "general.default_limit".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("agora").join("config.toml"))
    }
}
