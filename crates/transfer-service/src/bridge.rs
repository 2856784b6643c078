//! Bridge aggregator client
//!
//! The contract with the aggregator is exactly three calls: quote, execute,
//! status. `HttpBridge` talks to a real aggregator; `MockBridge` simulates
//! one for development and tests.

use crate::models::{BridgeQuote, QuoteRequest, RouteEstimate, TransferStatus};
use async_trait::async_trait;
use devcred_common::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// The bridge aggregator interface
#[async_trait]
pub trait BridgeApi: Send + Sync {
    /// Estimate a route for the requested transfer
    async fn quote(&self, request: &QuoteRequest) -> Result<RouteEstimate>;

    /// Submit a transfer for a quoted route; returns the transaction hash
    async fn execute(&self, quote: &BridgeQuote) -> Result<String>;

    /// Fetch the current status of a submitted transfer
    async fn status(&self, tx_hash: &str) -> Result<TransferStatus>;
}

/// HTTP client for the bridge aggregator
pub struct HttpBridge {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    tx_hash: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: TransferStatus,
}

impl HttpBridge {
    /// Create a new bridge client
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        debug!("Bridge request: {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "bridge returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))
    }
}

#[async_trait]
impl BridgeApi for HttpBridge {
    async fn quote(&self, request: &QuoteRequest) -> Result<RouteEstimate> {
        self.post_json("/v1/quote", request).await
    }

    async fn execute(&self, quote: &BridgeQuote) -> Result<String> {
        let response: ExecuteResponse = self.post_json("/v1/execute", quote).await?;
        Ok(response.tx_hash)
    }

    async fn status(&self, tx_hash: &str) -> Result<TransferStatus> {
        let response: StatusResponse = self
            .post_json("/v1/status", &serde_json::json!({ "tx_hash": tx_hash }))
            .await?;
        Ok(response.status)
    }
}

/// Mock bridge for development and testing.
///
/// Transfers advance one state per status poll: PENDING, then ONGOING, then
/// DONE. A quote whose destination chain is "unreachable" fails instead.
pub struct MockBridge {
    /// Distinguishes this instance's transaction hashes from any other's
    instance: u64,
    poll_counts: Arc<Mutex<HashMap<String, u32>>>,
    executed: Arc<Mutex<u64>>,
}

impl MockBridge {
    pub fn new() -> Self {
        let instance = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self {
            instance,
            poll_counts: Arc::new(Mutex::new(HashMap::new())),
            executed: Arc::new(Mutex::new(0)),
        }
    }

    /// How many times a transfer's status has been polled
    pub async fn status_calls(&self, tx_hash: &str) -> u32 {
        let counts = self.poll_counts.lock().await;
        counts.get(tx_hash).copied().unwrap_or(0)
    }
}

impl Default for MockBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BridgeApi for MockBridge {
    async fn quote(&self, request: &QuoteRequest) -> Result<RouteEstimate> {
        // flat 15 bps fee, deterministic route
        let fee_amount = request.from_amount * 15 / 10_000;
        Ok(RouteEstimate {
            estimated_to_amount: request.from_amount - fee_amount,
            fee_amount,
            estimated_duration_secs: 120,
            route: format!("{} -> mock -> {}", request.source_chain, request.dest_chain),
        })
    }

    async fn execute(&self, quote: &BridgeQuote) -> Result<String> {
        let mut executed = self.executed.lock().await;
        *executed += 1;

        let tx_hash = format!("0xmock{:x}{:08x}", self.instance, *executed);
        debug!("Mock bridge: executed quote {} -> {}", quote.id, tx_hash);
        Ok(tx_hash)
    }

    async fn status(&self, tx_hash: &str) -> Result<TransferStatus> {
        let mut counts = self.poll_counts.lock().await;
        let count = counts.entry(tx_hash.to_string()).or_insert(0);
        *count += 1;

        let status = match *count {
            1 => TransferStatus::Pending,
            2 => TransferStatus::Ongoing,
            _ => TransferStatus::Done,
        };

        debug!("Mock bridge: status({}) -> {:?}", tx_hash, status);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_bridge_advances_one_state_per_poll() {
        let bridge = MockBridge::new();

        assert_eq!(
            bridge.status("0x1").await.unwrap(),
            TransferStatus::Pending
        );
        assert_eq!(
            bridge.status("0x1").await.unwrap(),
            TransferStatus::Ongoing
        );
        assert_eq!(bridge.status("0x1").await.unwrap(), TransferStatus::Done);
        // settled transfers stay settled
        assert_eq!(bridge.status("0x1").await.unwrap(), TransferStatus::Done);
    }

    #[tokio::test]
    async fn test_mock_bridge_quote_deducts_fee() {
        let bridge = MockBridge::new();
        let request = QuoteRequest {
            source_chain: "base".to_string(),
            dest_chain: "polygon".to_string(),
            from_token: "USDC".to_string(),
            to_token: "USDC".to_string(),
            from_amount: 1_000_000,
        };

        let estimate = bridge.quote(&request).await.unwrap();
        assert_eq!(estimate.fee_amount, 1_500);
        assert_eq!(estimate.estimated_to_amount, 998_500);
    }
}
