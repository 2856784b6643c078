//! Data models for Scoring Service

use chrono::{DateTime, Utc};
use devcred_common::DeveloperAddress;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named, independently toggleable weight contributing to the credit score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreFactor {
    /// Stable factor identifier; sub-scores are submitted under this key
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Relative weight, renormalized over active factors at scoring time
    pub weight: f64,

    /// Whether the factor currently contributes to the score
    pub active: bool,
}

/// Versioned snapshot of the score factor weight table.
///
/// A scoring run reads exactly one snapshot; every admin write bumps
/// `version`, so a run is reproducible from its inputs alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightTable {
    pub version: u64,

    pub updated_at: DateTime<Utc>,

    pub factors: Vec<ScoreFactor>,
}

impl WeightTable {
    /// Default factor set used when no table has been configured yet
    pub fn seeded() -> Self {
        Self {
            version: 1,
            updated_at: Utc::now(),
            factors: vec![
                ScoreFactor {
                    id: "github_activity".to_string(),
                    name: "Source-control activity".to_string(),
                    weight: 0.40,
                    active: true,
                },
                ScoreFactor {
                    id: "social_attestations".to_string(),
                    name: "Social attestations".to_string(),
                    weight: 0.25,
                    active: true,
                },
                ScoreFactor {
                    id: "onchain_history".to_string(),
                    name: "On-chain history".to_string(),
                    weight: 0.20,
                    active: true,
                },
                ScoreFactor {
                    id: "wallet_age".to_string(),
                    name: "Wallet age".to_string(),
                    weight: 0.15,
                    active: true,
                },
            ],
        }
    }

    /// Insert or replace a factor by id, bumping the table version
    pub fn upsert(&mut self, factor: ScoreFactor) {
        match self.factors.iter_mut().find(|f| f.id == factor.id) {
            Some(existing) => *existing = factor,
            None => self.factors.push(factor),
        }
        self.bump();
    }

    /// Flip a factor's active flag; returns false if the id is unknown
    pub fn toggle(&mut self, factor_id: &str) -> bool {
        match self.factors.iter_mut().find(|f| f.id == factor_id) {
            Some(factor) => {
                factor.active = !factor.active;
                self.bump();
                true
            }
            None => false,
        }
    }

    fn bump(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

/// Latest computed score for a developer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeveloperScore {
    pub developer: DeveloperAddress,

    /// Aggregate credit score, 0-850
    pub score: u16,

    /// Weight table version the score was computed against
    pub table_version: u64,

    pub computed_at: DateTime<Utc>,
}

/// Request to compute a developer's credit score from per-source raw scores
#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub developer: DeveloperAddress,

    /// Raw 0-100 sub-scores keyed by factor id; absent sources score 0
    pub sub_scores: HashMap<String, u32>,
}

/// Response from a scoring run
#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub developer: DeveloperAddress,

    pub score: u16,

    /// Funding ceiling the score maps to, in whole dollars
    pub ceiling: u64,

    pub table_version: u64,
}

/// Request to create or replace a score factor
#[derive(Debug, Deserialize)]
pub struct UpsertFactorRequest {
    pub name: String,

    pub weight: f64,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Weight table response wrapper
#[derive(Debug, Serialize)]
pub struct FactorsResponse {
    pub version: u64,

    pub factors: Vec<ScoreFactor>,
}
