//! Application configuration management.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Cash ledger engine settings.
    #[serde(default)]
    pub ledger: LedgerSettings,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Tunables for the cash ledger engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerSettings {
    /// Upper bound for a single store call, in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// How many times a close is recomputed after losing a race to an append.
    #[serde(default = "default_close_retry_limit")]
    pub close_retry_limit: u32,
    /// Whether payments must reference a customer and sales a product.
    #[serde(default = "default_require_entry_links")]
    pub require_entry_links: bool,
}

fn default_store_timeout_ms() -> u64 {
    5_000
}

fn default_close_retry_limit() -> u32 {
    3
}

fn default_require_entry_links() -> bool {
    true
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            store_timeout_ms: default_store_timeout_ms(),
            close_retry_limit: default_close_retry_limit(),
            require_entry_links: default_require_entry_links(),
        }
    }
}

impl LedgerSettings {
    /// Store timeout as a `Duration`.
    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl AppConfig {
    /// Loads configuration from `.env`, config files, and the environment.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `CAIXA__SECTION__KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(Self::environment())
            .build()?;

        config.try_deserialize()
    }

    /// The `CAIXA__SECTION__KEY` environment source.
    fn environment() -> config::Environment {
        config::Environment::with_prefix("CAIXA")
            .separator("__")
            .try_parsing(true)
    }
}
