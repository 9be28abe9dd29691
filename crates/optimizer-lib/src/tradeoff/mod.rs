//! Multi-dimension scoring and ranking of alternative SKUs
//!
//! Every dimension scores independently into `[0, 1]`. Missing pricing,
//! metadata or region data yields the unknown sentinel (score 0.5,
//! confidence 0) instead of an error, so one failed lookup never drops an
//! alternative from the ranking.

mod dimensions;
mod scorer;

pub use dimensions::{score_dimension, sku_family, sla_tier, ScoringInput};
pub use scorer::TradeoffScorer;

use crate::error::{OptimizerError, Result};
use crate::models::{
    DimensionKind, Provider, ResourceAlternative, ResourceType, TenantPreferences,
    TradeoffDimension,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Weights summing within this distance of 1.0 are accepted as-is
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeoffConfig {
    /// Lifetime of memoized dimension scores
    pub score_cache_ttl_hours: i64,
    /// Hourly price to monthly cost
    pub hours_per_month: f64,
    /// Score at or above which a higher-is-better dimension improves
    pub improvement_threshold: f64,
    /// Score at or below which a higher-is-better dimension degrades
    pub degradation_threshold: f64,
}

impl Default for TradeoffConfig {
    fn default() -> Self {
        Self {
            score_cache_ttl_hours: 24,
            hours_per_month: 730.0,
            improvement_threshold: 0.7,
            degradation_threshold: 0.4,
        }
    }
}

/// Output of a single dimension scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub score: f64,
    pub explanation: String,
    pub current_value: String,
    pub alternative_value: String,
    pub confidence: f64,
}

impl DimensionScore {
    pub fn unknown(explanation: impl Into<String>) -> Self {
        Self {
            score: 0.5,
            explanation: explanation.into(),
            current_value: "unknown".to_string(),
            alternative_value: "unknown".to_string(),
            confidence: 0.0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.confidence == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreDirection {
    Improvement,
    Neutral,
    Degradation,
}

impl ScoreDirection {
    pub fn classify(score: f64, higher_is_better: bool, config: &TradeoffConfig) -> Self {
        let (improve, degrade) = if higher_is_better {
            (
                score >= config.improvement_threshold,
                score <= config.degradation_threshold,
            )
        } else {
            (
                score <= 1.0 - config.improvement_threshold,
                score >= 1.0 - config.degradation_threshold,
            )
        };
        if improve {
            ScoreDirection::Improvement
        } else if degrade {
            ScoreDirection::Degradation
        } else {
            ScoreDirection::Neutral
        }
    }
}

/// The resource alternatives are compared against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentResource {
    pub tenant: String,
    pub provider: Provider,
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub sku: String,
    pub sku_family: String,
    pub region: String,
    pub vcpu: Option<u32>,
    pub memory_gb: Option<f64>,
    pub hourly_price: Option<f64>,
    pub monthly_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionResult {
    pub dimension: DimensionKind,
    pub weight: f64,
    pub direction: ScoreDirection,
    #[serde(flatten)]
    pub score: DimensionScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAlternative {
    pub alternative: ResourceAlternative,
    pub hourly_price: Option<f64>,
    pub monthly_cost: Option<f64>,
    /// Zero when either price is unknown
    pub estimated_monthly_savings: f64,
    pub overall_score: f64,
    pub dimensions: Vec<DimensionResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeComparison {
    pub current_resource: CurrentResource,
    pub ranked_alternatives: Vec<RankedAlternative>,
    pub preferences: TenantPreferences,
}

/// Accept weights only if every weight is finite, non-negative, and they sum to 1
pub fn validate_weights(weights: &HashMap<DimensionKind, f64>) -> Result<()> {
    if let Some((kind, w)) = weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
        return Err(OptimizerError::InvalidWeights(format!(
            "weight for {} must be a non-negative number, got {}",
            kind, w
        )));
    }
    let sum: f64 = weights.values().sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(OptimizerError::InvalidWeights(format!(
            "weights sum to {:.6}, expected 1.0",
            sum
        )));
    }
    Ok(())
}

/// Scale weights to sum to 1; an all-zero set is returned unchanged
pub fn renormalize_weights(weights: &HashMap<DimensionKind, f64>) -> HashMap<DimensionKind, f64> {
    let sum: f64 = weights.values().filter(|w| w.is_finite() && **w > 0.0).sum();
    weights
        .iter()
        .map(|(kind, w)| {
            let w = if w.is_finite() { w.max(0.0) } else { 0.0 };
            (*kind, if sum > 0.0 { w / sum } else { w })
        })
        .collect()
}

/// Weight per active dimension: tenant override if set, else the default
///
/// Sets that do not sum to 1 are renormalized before use.
pub fn effective_weights(
    dimensions: &[TradeoffDimension],
    preferences: &TenantPreferences,
) -> HashMap<DimensionKind, f64> {
    let weights: HashMap<DimensionKind, f64> = dimensions
        .iter()
        .filter(|d| d.active)
        .map(|d| {
            let weight = preferences
                .dimension_weights
                .get(&d.kind)
                .copied()
                .unwrap_or(d.default_weight);
            (d.kind, weight)
        })
        .collect();

    match validate_weights(&weights) {
        Ok(()) => weights,
        Err(_) => renormalize_weights(&weights),
    }
}

/// `Σ(score·weight) / Σweight`; 0.5 when no weight applies
pub fn overall_score(scores: &[(f64, f64)]) -> f64 {
    let total_weight: f64 = scores.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return 0.5;
    }
    scores.iter().map(|(s, w)| s * w).sum::<f64>() / total_weight
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_weights() -> HashMap<DimensionKind, f64> {
        TradeoffDimension::defaults()
            .into_iter()
            .map(|d| (d.kind, d.default_weight))
            .collect()
    }

    #[test]
    fn test_default_weights_accepted_without_renormalization() {
        let weights = default_weights();
        assert!(validate_weights(&weights).is_ok());

        let effective =
            effective_weights(&TradeoffDimension::defaults(), &TenantPreferences::new("acme"));
        assert_eq!(effective, weights);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let mut weights = default_weights();
        weights.insert(DimensionKind::Cost, 0.5);
        assert!(matches!(
            validate_weights(&weights),
            Err(OptimizerError::InvalidWeights(_))
        ));

        let negative = HashMap::from([(DimensionKind::Cost, 1.5), (DimensionKind::Performance, -0.5)]);
        assert!(validate_weights(&negative).is_err());
    }

    #[test]
    fn test_renormalize_subset() {
        let subset = HashMap::from([(DimensionKind::Cost, 0.35), (DimensionKind::Performance, 0.25)]);
        let normalized = renormalize_weights(&subset);
        assert!(validate_weights(&normalized).is_ok());
        assert!((normalized[&DimensionKind::Cost] - 0.35 / 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_effective_weights_renormalize_inactive() {
        let mut dims = TradeoffDimension::defaults();
        dims[0].active = false;
        let weights = effective_weights(&dims, &TenantPreferences::new("acme"));
        assert!(!weights.contains_key(&DimensionKind::Cost));
        assert!(validate_weights(&weights).is_ok());
    }

    #[test]
    fn test_overall_score() {
        assert_eq!(overall_score(&[]), 0.5);
        assert_eq!(overall_score(&[(0.9, 0.0), (0.1, 0.0)]), 0.5);
        assert!((overall_score(&[(1.0, 0.75), (0.0, 0.25)]) - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_direction() {
        let config = TradeoffConfig::default();
        assert_eq!(ScoreDirection::classify(0.7, true, &config), ScoreDirection::Improvement);
        assert_eq!(ScoreDirection::classify(0.5, true, &config), ScoreDirection::Neutral);
        assert_eq!(ScoreDirection::classify(0.4, true, &config), ScoreDirection::Degradation);
        assert_eq!(ScoreDirection::classify(0.3, false, &config), ScoreDirection::Improvement);
        assert_eq!(ScoreDirection::classify(0.6, false, &config), ScoreDirection::Degradation);
    }
}
