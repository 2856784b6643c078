//! Client for the Scoring Service

use async_trait::async_trait;
use devcred_common::{DeveloperAddress, Error, Result};
use serde::Deserialize;
use tracing::debug;

/// Latest score record from the scoring service
#[derive(Debug, Deserialize)]
pub struct LatestScore {
    pub score: u16,

    pub table_version: u64,
}

/// Source of a developer's latest credit score
#[async_trait]
pub trait ScoringApi: Send + Sync {
    /// Get the latest computed score for a developer.
    ///
    /// `None` means no score has been recorded yet; an unreachable scoring
    /// service is an upstream failure, not a missing score.
    async fn latest_score(&self, developer: &DeveloperAddress) -> Result<Option<LatestScore>>;
}

/// HTTP client for the scoring service
pub struct HttpScoring {
    base_url: String,
    client: reqwest::Client,
}

impl HttpScoring {
    /// Create a new scoring client
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ScoringApi for HttpScoring {
    async fn latest_score(&self, developer: &DeveloperAddress) -> Result<Option<LatestScore>> {
        let url = format!("{}/api/scores/{}", self.base_url, developer);

        debug!("Fetching score from scoring service: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(Error::UpstreamUnavailable(format!(
                "scoring service returned {}",
                response.status()
            )));
        }

        let score: LatestScore = response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        Ok(Some(score))
    }
}
