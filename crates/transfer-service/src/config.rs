//! Configuration management for Transfer Service

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Redis URL for quote and transfer storage
    pub redis_url: String,

    /// Base URL of the bridge aggregator
    pub bridge_url: String,

    /// Seconds between status poll cycles
    pub poll_interval_secs: u64,

    /// How long an issued quote stays executable
    pub quote_validity_secs: u64,

    /// Use the mock bridge instead of a real aggregator
    pub mock_mode: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            host: env::var("TRANSFER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("TRANSFER_PORT")
                .unwrap_or_else(|_| "8093".to_string())
                .parse()
                .context("Invalid TRANSFER_PORT")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),

            bridge_url: env::var("BRIDGE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8094".to_string()),

            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),

            quote_validity_secs: env::var("QUOTE_VALIDITY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),

            mock_mode: env::var("MOCK_MODE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("TRANSFER_PORT must be greater than 0");
        }

        if self.poll_interval_secs == 0 {
            anyhow::bail!("POLL_INTERVAL_SECS must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::from_env().unwrap();
        assert!(config.port > 0);
        assert!(config.poll_interval_secs > 0);
        assert!(config.quote_validity_secs > 0);
    }
}
