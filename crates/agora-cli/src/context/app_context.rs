use agora_config::AgoraConfig;
use agora_db::service::AgoraService;
use anyhow::Context;

use crate::cli::GlobalFlags;

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: AgoraService,
    pub config: AgoraConfig,
}

impl AppContext {
    /// Open the configured database and apply the configured voting rules.
    pub async fn init(config: AgoraConfig) -> anyhow::Result<Self> {
        let service = AgoraService::from_config(&config)
            .await
            .with_context(|| format!("failed to open database at {}", config.database.path))?;
        tracing::debug!(path = %config.database.path, "agora context ready");
        Ok(Self { service, config })
    }

    /// The configured default page size.
    #[must_use]
    pub const fn default_limit(&self) -> u32 {
        self.config.general.default_limit
    }
}

/// Load `.env` and layered config, then apply `--database`.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<AgoraConfig> {
    let mut config = AgoraConfig::load_with_dotenv().context("failed to load agora config")?;
    if let Some(path) = &flags.database {
        config.database.path.clone_from(path);
        config.validate().context("invalid --database")?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use agora_config::{AgoraConfig, DatabaseConfig};

    use super::AppContext;

    #[tokio::test]
    async fn init_opens_in_memory_database() {
        let config = AgoraConfig {
            database: DatabaseConfig {
                path: ":memory:".into(),
            },
            ..AgoraConfig::default()
        };
        let ctx = AppContext::init(config).await.expect("context should open");
        assert_eq!(ctx.default_limit(), 20);
        assert!(ctx.service.list_scopes().await.expect("list").is_empty());
    }
}
