//! Configuration management for Scoring Service
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Redis URL for factor table and score storage
    pub redis_url: String,

    /// Base URL of the funding ledger service (authoritative ceiling source)
    pub ledger_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            host: env::var("SCORING_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("SCORING_PORT")
                .unwrap_or_else(|_| "8091".to_string())
                .parse()
                .context("Invalid SCORING_PORT")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),

            ledger_url: env::var("LEDGER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8092".to_string()),
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("SCORING_PORT must be greater than 0");
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
        assert!(config.redis_url.starts_with("redis://"));
    }
}
