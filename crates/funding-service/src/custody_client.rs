//! Client for the stablecoin custody provider
//!
//! The ledger only emits transfer intents (amount, destination, kind); the
//! custody provider performs the actual token movement and hands back a
//! transaction reference.

use async_trait::async_trait;
use devcred_common::{DeveloperAddress, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Direction of a custody intent
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    /// Fund a project's escrow at disbursement time
    Disburse,
    /// Release a completed milestone's reward from escrow to the developer
    Release,
    /// Collect a repayment from the developer
    Collect,
}

/// Sink for custody transfer intents
#[async_trait]
pub trait CustodyApi: Send + Sync {
    /// Emit a transfer intent and return the custody transaction reference
    async fn submit_intent(
        &self,
        developer: &DeveloperAddress,
        amount: u64,
        kind: IntentKind,
        memo: String,
    ) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct IntentRequest {
    developer: DeveloperAddress,
    amount: u64,
    kind: IntentKind,
    memo: String,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    tx_reference: String,
}

/// HTTP client for the custody provider
pub struct HttpCustody {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCustody {
    /// Create a new custody client
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CustodyApi for HttpCustody {
    async fn submit_intent(
        &self,
        developer: &DeveloperAddress,
        amount: u64,
        kind: IntentKind,
        memo: String,
    ) -> Result<String> {
        let url = format!("{}/api/intents", self.base_url);

        debug!(
            "Submitting {:?} intent for {} ({} USDC)",
            kind, developer, amount
        );

        let payload = IntentRequest {
            developer: *developer,
            amount,
            kind,
            memo,
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "custody provider returned {}",
                response.status()
            )));
        }

        let body: IntentResponse = response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        Ok(body.tx_reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custody_client_creation() {
        let client = HttpCustody::new("http://localhost:8095".to_string());
        assert_eq!(client.base_url, "http://localhost:8095");
    }
}
