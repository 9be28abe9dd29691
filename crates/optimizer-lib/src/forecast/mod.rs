//! Cost forecasting engine
//!
//! A statistical trend model is always available. An external backend (for
//! example an ONNX model) can be placed in front of it; any backend failure
//! falls back to the statistical model transparently.

mod anomaly;
mod engine;
mod onnx;
mod statistical;

pub use anomaly::{AnomalyDetector, AnomalyKind, CostAnomaly};
pub use engine::ForecastEngine;
pub use onnx::OnnxForecastBackend;
pub use statistical::{project_trend, StatisticalForecaster};

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Model name reported when no forecast could be produced
pub const MODEL_NONE: &str = "none";

/// Model name reported by the statistical fallback
pub const MODEL_STATISTICAL: &str = "statistical";

/// Trait for external forecasting backends
#[async_trait]
pub trait ForecastBackend: Send + Sync {
    /// Name reported in `ForecastResult::model_used`
    fn name(&self) -> &str;

    /// Predict `horizon_days` daily costs from the historical daily costs
    async fn predict(&self, history: &[f64], horizon_days: usize) -> Result<Vec<f64>>;
}

/// Forecasting coefficients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Hard floor on series length
    pub min_data_points: usize,
    /// Maximum number of trailing points averaged as the recent level
    pub recent_window: usize,
    /// Number of forecast days summed into the monthly figure
    pub monthly_days: usize,
    pub data_confidence_weight: f64,
    pub variance_confidence_weight: f64,
    pub horizon_confidence_weight: f64,
    /// Days of history at which data confidence saturates
    pub full_confidence_days: f64,
    /// Standard deviation (USD/day) at which variance confidence halves
    pub variance_scale: f64,
    /// Horizon (days) at which horizon confidence reaches zero
    pub max_horizon_days: f64,
    /// Half-width of the confidence band per unit of missing confidence
    pub band_factor: f64,
    /// |z| above which a point is an anomaly
    pub anomaly_z_threshold: f64,
    /// Time allowed for the external backend before falling back
    pub backend_timeout_ms: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_data_points: 14,
            recent_window: 30,
            monthly_days: 30,
            data_confidence_weight: 0.4,
            variance_confidence_weight: 0.4,
            horizon_confidence_weight: 0.2,
            full_confidence_days: 90.0,
            variance_scale: 100.0,
            max_horizon_days: 180.0,
            band_factor: 0.5,
            anomaly_z_threshold: 2.5,
            backend_timeout_ms: 2_000,
        }
    }
}

impl ForecastConfig {
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }
}

/// Forecast for a single future day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub cost: f64,
}

/// Result of a forecast request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub success: bool,
    pub monthly_cost_forecast: f64,
    pub daily_forecasts: Vec<DailyForecast>,
    pub confidence: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub model_used: String,
}

impl ForecastResult {
    /// Result for a series below the minimum length
    pub fn insufficient() -> Self {
        Self {
            success: false,
            monthly_cost_forecast: 0.0,
            daily_forecasts: Vec::new(),
            confidence: 0.0,
            lower_bound: 0.0,
            upper_bound: 0.0,
            model_used: MODEL_NONE.to_string(),
        }
    }
}
