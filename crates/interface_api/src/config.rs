//! API configuration

use serde::Deserialize;

use core_kernel::Timezone;
use domain_ledger::LedgerConfig;
use infra_db::DatabaseConfig;

/// Server configuration, read from `LEDGER_`-prefixed environment variables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// Log level
    pub log_level: String,
    /// Apply the schema migrations at startup
    pub run_migrations: bool,
    /// Real-time posting switch passed to the ledger
    pub posting_enabled: bool,
    /// Calendar for accounting dates
    pub timezone: Timezone,
    /// `created_by` label on batches the ledger posts itself
    pub created_by: String,
    /// Seconds between scheduled drift checks; unset disables the timer
    pub drift_check_interval_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/shop_ledger".to_string(),
            max_connections: 10,
            log_level: "info".to_string(),
            run_migrations: false,
            posting_enabled: true,
            timezone: Timezone::shop_default(),
            created_by: "system".to_string(),
            drift_check_interval_secs: None,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment, keeping defaults for unset keys
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("LEDGER").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig::default()
            .with_posting_enabled(self.posting_enabled)
            .with_timezone(self.timezone.clone())
            .with_created_by(self.created_by.clone())
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.database_url.clone()).max_connections(self.max_connections)
    }
}
