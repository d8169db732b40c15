//! Application configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::pool::DbConfig;

/// Back-office configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    pub connect_timeout_secs: u64,

    /// Entries in the best-sellers list
    pub top_products_limit: u32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = AppConfig {
            database_path: env::var("BAZAAR_DB_PATH").unwrap_or_else(|_| "./bazaar.db".to_string()),

            max_connections: env::var("BAZAAR_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BAZAAR_DB_MAX_CONNECTIONS".to_string()))?,

            connect_timeout_secs: env::var("BAZAAR_DB_CONNECT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("BAZAAR_DB_CONNECT_TIMEOUT_SECS".to_string())
                })?,

            top_products_limit: env::var("BAZAAR_TOP_PRODUCTS_LIMIT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("BAZAAR_TOP_PRODUCTS_LIMIT".to_string()))?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("BAZAAR_DB_PATH".to_string()));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue("BAZAAR_DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(())
    }

    /// Pool settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
