//! Configuration management for Funding Service

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Redis URL for profile and project storage
    pub redis_url: String,

    /// Base URL of the scoring service
    pub scoring_url: String,

    /// Base URL of the stablecoin custody provider
    pub custody_url: String,

    /// Completed/total milestone ratio counted as significant progress
    pub significant_progress_ratio: f64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            host: env::var("FUNDING_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("FUNDING_PORT")
                .unwrap_or_else(|_| "8092".to_string())
                .parse()
                .context("Invalid FUNDING_PORT")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),

            scoring_url: env::var("SCORING_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8091".to_string()),

            custody_url: env::var("CUSTODY_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8095".to_string()),

            significant_progress_ratio: env::var("SIGNIFICANT_PROGRESS_RATIO")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.5),
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("FUNDING_PORT must be greater than 0");
        }

        if !(0.0..=1.0).contains(&self.significant_progress_ratio) {
            anyhow::bail!("SIGNIFICANT_PROGRESS_RATIO must be between 0 and 1");
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
        assert_eq!(config.significant_progress_ratio, 0.5);
    }
}
