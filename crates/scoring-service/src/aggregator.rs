//! Weighted multi-source score aggregation
//!
//! Combines per-source raw scores (each 0-100) into one 0-850 credit score
//! under a weight table snapshot. Pure function of its inputs.

use crate::models::WeightTable;
use devcred_common::MAX_CREDIT_SCORE;
use std::collections::HashMap;

/// Aggregate per-source raw scores into a single credit score.
///
/// Weights are renormalized over active factors only: an inactive factor
/// contributes nothing and its weight leaves the denominator. A source with
/// no submitted score counts as 0 — absence is scored, not excluded, so
/// non-participation cannot outweigh genuine participation.
pub fn aggregate(sub_scores: &HashMap<String, u32>, table: &WeightTable) -> u16 {
    let active: Vec<_> = table.factors.iter().filter(|f| f.active).collect();

    let total_weight: f64 = active.iter().map(|f| f.weight).sum();
    if total_weight <= 0.0 {
        return 0;
    }

    let mut weighted = 0.0;
    for factor in &active {
        let raw = sub_scores.get(&factor.id).copied().unwrap_or(0).min(100);
        weighted += (raw as f64 / 100.0) * (factor.weight / total_weight);
    }

    let score = (weighted * MAX_CREDIT_SCORE as f64).round() as i64;
    score.clamp(0, MAX_CREDIT_SCORE as i64) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScoreFactor;
    use chrono::Utc;

    fn table(factors: Vec<(&str, f64, bool)>) -> WeightTable {
        WeightTable {
            version: 1,
            updated_at: Utc::now(),
            factors: factors
                .into_iter()
                .map(|(id, weight, active)| ScoreFactor {
                    id: id.to_string(),
                    name: id.to_string(),
                    weight,
                    active,
                })
                .collect(),
        }
    }

    fn scores(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_perfect_scores_hit_ceiling() {
        let table = table(vec![("github", 0.6, true), ("social", 0.4, true)]);
        let score = aggregate(&scores(&[("github", 100), ("social", 100)]), &table);
        assert_eq!(score, MAX_CREDIT_SCORE);
    }

    #[test]
    fn test_missing_source_scores_zero() {
        let table = table(vec![("github", 0.5, true), ("social", 0.5, true)]);
        // social absent: contributes 0, stays in the denominator
        let score = aggregate(&scores(&[("github", 100)]), &table);
        assert_eq!(score, MAX_CREDIT_SCORE / 2);
    }

    #[test]
    fn test_inactive_factor_renormalizes() {
        let active_only = table(vec![("github", 0.5, true), ("social", 0.5, false)]);
        // social disabled: github's weight renormalizes to 1.0
        let score = aggregate(&scores(&[("github", 100), ("social", 0)]), &active_only);
        assert_eq!(score, MAX_CREDIT_SCORE);
    }

    #[test]
    fn test_disabling_a_factor_keeps_score_in_range() {
        let mut table = table(vec![
            ("github", 0.4, true),
            ("social", 0.35, true),
            ("onchain", 0.25, true),
        ]);
        let subs = scores(&[("github", 90), ("social", 10), ("onchain", 70)]);

        let before = aggregate(&subs, &table);
        table.toggle("social");
        let after = aggregate(&subs, &table);

        assert!(before <= MAX_CREDIT_SCORE);
        assert!(after <= MAX_CREDIT_SCORE);
        // the weak source is gone, so the aggregate rises
        assert!(after > before);
    }

    #[test]
    fn test_raw_scores_clamped_to_100() {
        let table = table(vec![("github", 1.0, true)]);
        let score = aggregate(&scores(&[("github", 400)]), &table);
        assert_eq!(score, MAX_CREDIT_SCORE);
    }

    #[test]
    fn test_all_factors_inactive_is_zero() {
        let table = table(vec![("github", 0.5, false), ("social", 0.5, false)]);
        let score = aggregate(&scores(&[("github", 100), ("social", 100)]), &table);
        assert_eq!(score, 0);
    }

    #[test]
    fn test_unknown_sources_are_ignored() {
        let table = table(vec![("github", 1.0, true)]);
        let score = aggregate(&scores(&[("github", 50), ("mystery", 100)]), &table);
        assert_eq!(score, (0.5 * MAX_CREDIT_SCORE as f64).round() as u16);
    }
}
