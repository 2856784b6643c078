//! Redis storage for quotes and transfer records

use crate::models::{BridgeQuote, TransferRecord};
use anyhow::{Context, Result};
use devcred_common::DeveloperAddress;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

const INFLIGHT_KEY: &str = "transfers:inflight";

/// Executed-quote markers outlive any realistic retry window
const EXECUTED_MARKER_TTL_SECS: u64 = 86_400;

/// Storage backend for the transfer tracker
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

    /// Store a quote for its validity window
    pub async fn put_quote(&mut self, quote: &BridgeQuote, validity_secs: u64) -> Result<()> {
        let key = format!("quote:{}", quote.id);

        let json = serde_json::to_string(quote)
            .context("Failed to serialize quote")?;

        // expire shortly after the quote itself does
        let _: () = redis::cmd("SET")
            .arg(&key)
            .arg(json)
            .arg("EX")
            .arg(validity_secs + 60)
            .query_async(&mut self.conn)
            .await?;

        debug!("Stored quote {} (valid {}s)", quote.id, validity_secs);
        Ok(())
    }

    /// Get a quote by id; expired quotes may already be gone
    pub async fn get_quote(&mut self, quote_id: &str) -> Result<Option<BridgeQuote>> {
        let key = format!("quote:{}", quote_id);

        let json: Option<String> = self.conn.get(&key).await?;

        match json {
            Some(data) => {
                let quote: BridgeQuote = serde_json::from_str(&data)
                    .context("Failed to deserialize quote")?;
                Ok(Some(quote))
            }
            None => Ok(None),
        }
    }

    /// Atomically mark a quote as executed.
    ///
    /// Returns false when the quote was already executed.
    pub async fn mark_quote_executed(&mut self, quote_id: &str) -> Result<bool> {
        let key = format!("quote:executed:{}", quote_id);

        // SET NX - one execution per quote
        let set_result: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(EXECUTED_MARKER_TTL_SECS)
            .query_async(&mut self.conn)
            .await?;

        Ok(set_result.is_some())
    }

    /// Record a newly executed transfer: store it, prepend it to the
    /// developer's history, and mark it in flight for the poller.
    pub async fn insert_record(&mut self, record: &TransferRecord) -> Result<()> {
        let key = format!("transfer:{}", record.id);

        let json = serde_json::to_string(record)
            .context("Failed to serialize transfer record")?;

        let _: () = self.conn.set(&key, json).await?;

        let history_key = format!("transfers:developer:{}", record.developer);
        let _: () = self.conn.lpush(&history_key, &record.id).await?;

        let _: () = self.conn.sadd(INFLIGHT_KEY, &record.id).await?;

        info!(
            "Recorded transfer {} for {} ({} -> {})",
            record.id, record.developer, record.source_chain, record.dest_chain
        );
        Ok(())
    }

    /// Get a transfer record by id
    pub async fn get_record(&mut self, record_id: &str) -> Result<Option<TransferRecord>> {
        let key = format!("transfer:{}", record_id);

        let json: Option<String> = self.conn.get(&key).await?;

        match json {
            Some(data) => {
                let record: TransferRecord = serde_json::from_str(&data)
                    .context("Failed to deserialize transfer record")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Update a transfer record after a status poll
    pub async fn update_record(&mut self, record: &TransferRecord) -> Result<()> {
        let key = format!("transfer:{}", record.id);

        let json = serde_json::to_string(record)
            .context("Failed to serialize transfer record")?;

        let _: () = self.conn.set(&key, json).await?;

        debug!("Updated transfer {} status: {:?}", record.id, record.status);
        Ok(())
    }

    /// Ids of transfers not yet in a terminal state
    pub async fn inflight_ids(&mut self) -> Result<Vec<String>> {
        let ids: Vec<String> = self.conn.smembers(INFLIGHT_KEY).await?;
        Ok(ids)
    }

    /// Drop a settled transfer from the in-flight set
    pub async fn clear_inflight(&mut self, record_id: &str) -> Result<()> {
        let _: () = self.conn.srem(INFLIGHT_KEY, record_id).await?;
        Ok(())
    }

    /// A developer's transfer history, newest first
    pub async fn developer_transfers(
        &mut self,
        developer: &DeveloperAddress,
    ) -> Result<Vec<TransferRecord>> {
        let history_key = format!("transfers:developer:{}", developer);

        let ids: Vec<String> = self.conn.lrange(&history_key, 0, -1).await?;

        let mut records = Vec::new();
        for id in ids {
            if let Some(record) = self.get_record(&id).await? {
                records.push(record);
            }
        }

        Ok(records)
    }
}
