//! Transfer tracker: quote, execute, and status polling
//!
//! A quote is a non-binding estimate valid for a short window; executing it
//! submits the transfer and records it PENDING. Status advances only through
//! polling, and only records not yet terminal are polled.

use crate::bridge::BridgeApi;
use crate::models::{BridgeQuote, ExecuteRequest, QuoteRequest, TransferRecord};
use crate::storage::Storage;
use chrono::Utc;
use devcred_common::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Tracker configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// How long an issued quote stays executable
    pub quote_validity_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            quote_validity_secs: 60,
        }
    }
}

/// Tracks cross-chain transfers against the bridge aggregator
pub struct Tracker {
    storage: Storage,
    bridge: Arc<dyn BridgeApi>,
    config: TrackerConfig,
}

impl Tracker {
    pub fn new(storage: Storage, bridge: Arc<dyn BridgeApi>, config: TrackerConfig) -> Self {
        Self {
            storage,
            bridge,
            config,
        }
    }

    /// Request a route estimate and issue a time-bounded quote
    pub async fn request_quote(&mut self, request: QuoteRequest) -> Result<BridgeQuote> {
        let estimate = self.bridge.quote(&request).await?;

        let quote = BridgeQuote::new(&request, estimate, self.config.quote_validity_secs);
        self.storage
            .put_quote(&quote, self.config.quote_validity_secs)
            .await?;

        info!(
            "Issued quote {} for {} {} ({} -> {})",
            quote.id, quote.from_amount, quote.from_token, quote.source_chain, quote.dest_chain
        );

        Ok(quote)
    }

    /// Execute a quote and record the transfer.
    ///
    /// An expired or unknown quote, or one already executed, fails with
    /// `StaleQuote` — never a silent re-quote.
    pub async fn execute(&mut self, request: ExecuteRequest) -> Result<TransferRecord> {
        let quote = self
            .storage
            .get_quote(&request.quote_id)
            .await?
            .ok_or_else(|| Error::StaleQuote(request.quote_id.clone()))?;

        if quote.is_expired(Utc::now()) {
            return Err(Error::StaleQuote(quote.id));
        }

        if !self.storage.mark_quote_executed(&quote.id).await? {
            return Err(Error::StaleQuote(quote.id));
        }

        let tx_hash = self.bridge.execute(&quote).await?;

        let record = TransferRecord::new(&quote, request.developer, tx_hash);
        self.storage.insert_record(&record).await?;

        info!(
            "Executed quote {} as transfer {} (tx {})",
            quote.id, record.id, record.tx_hash
        );

        Ok(record)
    }

    /// Get a transfer record by id
    pub async fn record(&mut self, record_id: &str) -> Result<TransferRecord> {
        self.storage
            .get_record(record_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("transfer {}", record_id)))
    }

    /// A developer's transfer history, newest first
    pub async fn developer_transfers(
        &mut self,
        developer: &devcred_common::DeveloperAddress,
    ) -> Result<Vec<TransferRecord>> {
        Ok(self.storage.developer_transfers(developer).await?)
    }

    /// Poll every non-terminal transfer once.
    ///
    /// A transfer that settles leaves the in-flight set; an unreachable
    /// status source keeps the record's last known status for the next
    /// cycle. Returns the number of records still in flight.
    pub async fn poll_cycle(&mut self) -> Result<usize> {
        let ids = self.storage.inflight_ids().await?;
        let mut remaining = 0;

        for id in ids {
            let Some(mut record) = self.storage.get_record(&id).await? else {
                warn!("In-flight transfer {} has no record, dropping", id);
                self.storage.clear_inflight(&id).await?;
                continue;
            };

            if record.is_terminal() {
                self.storage.clear_inflight(&id).await?;
                continue;
            }

            match self.bridge.status(&record.tx_hash).await {
                Ok(status) => {
                    record.apply_status(status);
                    self.storage.update_record(&record).await?;

                    if record.is_terminal() {
                        self.storage.clear_inflight(&id).await?;
                        info!("Transfer {} settled: {:?}", id, record.status);
                    } else {
                        remaining += 1;
                    }
                }
                Err(e) => {
                    // not a state transition; retried next cycle
                    warn!(
                        "Status source unreachable for transfer {} ({}), keeping {:?}",
                        id, e, record.status
                    );
                    remaining += 1;
                }
            }
        }

        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MockBridge;
    use crate::models::TransferStatus;
    use devcred_common::DeveloperAddress;

    async fn get_test_tracker() -> (Tracker, Arc<MockBridge>) {
        let storage = Storage::new("redis://127.0.0.1:6379/15")
            .await
            .expect("Failed to connect to test Redis");
        let bridge = Arc::new(MockBridge::new());
        let tracker = Tracker::new(storage, bridge.clone(), TrackerConfig::default());
        (tracker, bridge)
    }

    fn quote_request() -> QuoteRequest {
        QuoteRequest {
            source_chain: "base".to_string(),
            dest_chain: "arbitrum".to_string(),
            from_token: "USDC".to_string(),
            to_token: "USDC".to_string(),
            from_amount: 250_000,
        }
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_quote_execute_poll_to_done() {
        let (mut tracker, bridge) = get_test_tracker().await;
        let developer = DeveloperAddress::new([8u8; 20]);

        let quote = tracker.request_quote(quote_request()).await.unwrap();
        let record = tracker
            .execute(ExecuteRequest {
                developer,
                quote_id: quote.id.clone(),
            })
            .await
            .unwrap();

        assert_eq!(record.status, TransferStatus::Pending);

        // mock bridge settles on the third poll
        tracker.poll_cycle().await.unwrap();
        tracker.poll_cycle().await.unwrap();
        tracker.poll_cycle().await.unwrap();

        let settled = tracker.record(&record.id).await.unwrap();
        assert!(settled.is_terminal());

        // settled transfers are never polled again
        let polls_at_settlement = bridge.status_calls(&record.tx_hash).await;
        tracker.poll_cycle().await.unwrap();
        tracker.poll_cycle().await.unwrap();
        assert_eq!(
            bridge.status_calls(&record.tx_hash).await,
            polls_at_settlement
        );
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_executing_a_quote_twice_is_stale() {
        let (mut tracker, _bridge) = get_test_tracker().await;
        let developer = DeveloperAddress::new([8u8; 20]);

        let quote = tracker.request_quote(quote_request()).await.unwrap();

        tracker
            .execute(ExecuteRequest {
                developer,
                quote_id: quote.id.clone(),
            })
            .await
            .unwrap();

        let err = tracker
            .execute(ExecuteRequest {
                developer,
                quote_id: quote.id.clone(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StaleQuote(_)));
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_unknown_quote_is_stale() {
        let (mut tracker, _bridge) = get_test_tracker().await;
        let developer = DeveloperAddress::new([8u8; 20]);

        let err = tracker
            .execute(ExecuteRequest {
                developer,
                quote_id: "no-such-quote".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StaleQuote(_)));
    }
}
