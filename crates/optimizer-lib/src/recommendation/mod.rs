//! Recommendation generation and lifecycle
//!
//! The engine ties normalization, forecasting and classification together
//! for a single resource, turns the results into threshold-filtered
//! recommendations and persists them through an atomic upsert.

mod cache;
mod engine;
mod lifecycle;
mod rules;

pub use cache::AnalysisCache;
pub use engine::RecommendationEngine;
pub use rules::is_non_production;

use crate::error::{OptimizerError, Result};
use crate::forecast::{CostAnomaly, ForecastResult};
use crate::models::{DetectedConfig, NormalizedResourceCost, Provider, Recommendation};
use crate::utilization::{Classification, RightsizingResult, TrendAnalysis, UtilizationState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thresholds and rates for recommendation rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Smallest monthly saving worth recommending (USD)
    pub min_savings: f64,
    /// Smallest classification confidence for a rightsizing recommendation
    pub min_confidence: f64,
    pub lookback_days: u32,
    pub forecast_horizon_days: usize,
    /// Lifetime of an active recommendation, reset on every refresh
    pub expiry_days: i64,
    pub reservation_savings_rate: f64,
    pub reservation_min_confidence: f64,
    /// Share of monthly cost saved by running 12h/day
    pub scheduling_savings_rate: f64,
    pub scheduling_confidence: f64,
    pub no_history_confidence: f64,
    /// Case-insensitive substrings marking non-production resources
    pub non_production_markers: Vec<String>,
    pub cache_ttl_secs: u64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            min_savings: 10.0,
            min_confidence: 0.6,
            lookback_days: 30,
            forecast_horizon_days: 30,
            expiry_days: 7,
            reservation_savings_rate: 0.3,
            reservation_min_confidence: 0.8,
            scheduling_savings_rate: 0.5,
            scheduling_confidence: 0.7,
            no_history_confidence: 0.5,
            non_production_markers: ["dev", "test", "staging", "qa", "sandbox", "nonprod"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            cache_ttl_secs: 300,
        }
    }
}

impl RecommendationConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Optional input accompanying an analysis request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisRequest {
    /// Configuration seen client-side; enables the no-history path
    pub detected_config: Option<DetectedConfig>,
}

impl AnalysisRequest {
    pub fn with_detected_config(config: DetectedConfig) -> Self {
        Self {
            detected_config: Some(config),
        }
    }
}

/// Which analysis path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Cost history was analyzed
    Analyzed,
    /// No history; only client-detected configuration was available
    NoHistory,
    /// Nothing to analyze
    NoData,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Analyzed => "analyzed",
            AnalysisStatus::NoHistory => "no_history",
            AnalysisStatus::NoData => "no_data",
        }
    }
}

/// Outcome of analyzing one resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub tenant: String,
    pub provider: Provider,
    pub resource_id: String,
    pub status: AnalysisStatus,
    pub classification: UtilizationState,
    pub confidence: f64,
    pub cost_summary: Option<NormalizedResourceCost>,
    pub forecast: Option<ForecastResult>,
    pub utilization: Option<Classification>,
    pub rightsizing: Option<RightsizingResult>,
    pub trend: Option<TrendAnalysis>,
    pub anomalies: Vec<CostAnomaly>,
    pub recommendations: Vec<Recommendation>,
    pub total_monthly_savings: f64,
    pub message: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn no_data(tenant: &str, provider: Provider, resource_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            tenant: tenant.to_string(),
            provider,
            resource_id: resource_id.to_string(),
            status: AnalysisStatus::NoData,
            classification: UtilizationState::InsufficientData,
            confidence: 0.0,
            cost_summary: None,
            forecast: None,
            utilization: None,
            rightsizing: None,
            trend: None,
            anomalies: Vec::new(),
            recommendations: Vec::new(),
            total_monthly_savings: 0.0,
            message: Some("No cost data available for this resource".to_string()),
            analyzed_at: now,
        }
    }
}

/// Reject identifiers that are empty or contain whitespace/control characters
pub fn validate_resource_id(resource_id: &str) -> Result<()> {
    if resource_id.is_empty()
        || resource_id
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(OptimizerError::MalformedResourceId(resource_id.to_string()));
    }
    Ok(())
}
