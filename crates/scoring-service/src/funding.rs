//! Funding ceiling calculation
//!
//! Maps a credit score to an eligible funding ceiling. The authoritative
//! calculation lives with the funding ledger service; a local fallback over
//! the same tier table is used only when the ledger is unreachable, so the
//! two paths cannot drift apart.

use async_trait::async_trait;
use devcred_common::{ceiling_for_score, Error, Result};
use serde::Deserialize;
use tracing::{debug, warn};

/// A source of score-to-ceiling answers
#[async_trait]
pub trait CeilingSource: Send + Sync {
    async fn ceiling(&self, score: u16) -> Result<u64>;
}

/// Authoritative path: ask the funding ledger service
pub struct LedgerCeiling {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CeilingResponse {
    ceiling: u64,
}

impl LedgerCeiling {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CeilingSource for LedgerCeiling {
    async fn ceiling(&self, score: u16) -> Result<u64> {
        let url = format!("{}/api/ceiling/{}", self.base_url, score);

        debug!("Fetching funding ceiling from ledger: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "ledger returned {}",
                response.status()
            )));
        }

        let body: CeilingResponse = response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        Ok(body.ceiling)
    }
}

/// Local fallback: the same step schedule, computed in-process
pub struct LocalCeiling;

#[async_trait]
impl CeilingSource for LocalCeiling {
    async fn ceiling(&self, score: u16) -> Result<u64> {
        Ok(ceiling_for_score(score))
    }
}

/// Resolve a funding ceiling, preferring the authoritative source.
///
/// Falls back to the local schedule only when the ledger is unreachable;
/// any other failure propagates.
pub async fn resolve_ceiling(authoritative: &dyn CeilingSource, score: u16) -> Result<u64> {
    match authoritative.ceiling(score).await {
        Ok(ceiling) => Ok(ceiling),
        Err(Error::UpstreamUnavailable(reason)) => {
            warn!(
                "Ledger ceiling unavailable ({}), using local schedule",
                reason
            );
            Ok(ceiling_for_score(score))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UnreachableLedger;

    #[async_trait]
    impl CeilingSource for UnreachableLedger {
        async fn ceiling(&self, _score: u16) -> Result<u64> {
            Err(Error::UpstreamUnavailable("connection refused".to_string()))
        }
    }

    struct DriftedLedger;

    #[async_trait]
    impl CeilingSource for DriftedLedger {
        async fn ceiling(&self, _score: u16) -> Result<u64> {
            Ok(9_999)
        }
    }

    #[tokio::test]
    async fn test_local_matches_shared_schedule() {
        // the fallback must reproduce the discontinuous schedule exactly
        for score in [0u16, 399, 400, 499, 500, 599, 600, 650, 699, 700, 799, 800, 850] {
            let local = LocalCeiling.ceiling(score).await.unwrap();
            assert_eq!(local, ceiling_for_score(score));
        }
    }

    #[tokio::test]
    async fn test_fallback_on_unreachable_ledger() {
        let ceiling = resolve_ceiling(&UnreachableLedger, 650).await.unwrap();
        assert_eq!(ceiling, 2_000);
    }

    #[tokio::test]
    async fn test_authoritative_answer_wins_when_reachable() {
        let ceiling = resolve_ceiling(&DriftedLedger, 650).await.unwrap();
        assert_eq!(ceiling, 9_999);
    }
}
