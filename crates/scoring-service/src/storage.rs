//! Redis storage for the score factor weight table and latest scores

use crate::models::{DeveloperScore, WeightTable};
use anyhow::{Context, Result};
use devcred_common::DeveloperAddress;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

const FACTORS_KEY: &str = "score:factors";

/// Storage backend for the scoring service
pub struct Storage {
    conn: ConnectionManager,
}

impl Storage {
    /// Create a new storage instance
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }

    /// Read one consistent snapshot of the weight table, seeding the default
    /// factor set on first use.
    pub async fn get_table(&mut self) -> Result<WeightTable> {
        let json: Option<String> = self.conn.get(FACTORS_KEY).await?;

        match json {
            Some(data) => {
                let table: WeightTable = serde_json::from_str(&data)
                    .context("Failed to deserialize weight table")?;
                Ok(table)
            }
            None => {
                let table = WeightTable::seeded();
                self.save_table(&table).await?;
                info!("Seeded default score factor table");
                Ok(table)
            }
        }
    }

    /// Persist the weight table
    pub async fn save_table(&mut self, table: &WeightTable) -> Result<()> {
        let json = serde_json::to_string(table)
            .context("Failed to serialize weight table")?;

        let _: () = self.conn.set(FACTORS_KEY, json).await?;

        debug!("Saved weight table version {}", table.version);
        Ok(())
    }

    /// Store the latest computed score for a developer
    pub async fn save_score(&mut self, score: &DeveloperScore) -> Result<()> {
        let key = format!("score:latest:{}", score.developer);

        let json = serde_json::to_string(score)
            .context("Failed to serialize developer score")?;

        let _: () = self.conn.set(&key, json).await?;

        info!(
            "Stored score {} for developer {} (table v{})",
            score.score, score.developer, score.table_version
        );
        Ok(())
    }

    /// Get the latest computed score for a developer
    pub async fn get_score(&mut self, developer: &DeveloperAddress) -> Result<Option<DeveloperScore>> {
        let key = format!("score:latest:{}", developer);

        let json: Option<String> = self.conn.get(&key).await?;

        match json {
            Some(data) => {
                let score: DeveloperScore = serde_json::from_str(&data)
                    .context("Failed to deserialize developer score")?;
                Ok(Some(score))
            }
            None => Ok(None),
        }
    }
}
