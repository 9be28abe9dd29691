//! Utilization classification and rightsizing
//!
//! Each call re-evaluates the series from scratch; no state is kept
//! between calls.

mod classifier;
mod rightsizing;
mod trend;

pub use classifier::{compute_stats, UtilizationClassifier};
pub use rightsizing::{RightsizingAction, RightsizingResult};
pub use trend::{TrendAnalysis, TrendDirection};

use serde::{Deserialize, Serialize};

/// Classification thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Below this many points the result is `InsufficientData`
    pub min_data_points: usize,
    /// CPU ratio below which a day counts as idle
    pub idle_threshold: f64,
    /// Consecutive idle days that make a resource idle regardless of average
    pub idle_days_threshold: usize,
    pub underutilized_threshold: f64,
    pub overutilized_threshold: f64,
    /// Days of history at which data confidence saturates
    pub full_confidence_days: f64,
    pub data_confidence_weight: f64,
    pub clarity_confidence_weight: f64,
    /// Average CPU below `clear_low_cpu` or above `clear_high_cpu` is a clear signal
    pub clear_low_cpu: f64,
    pub clear_high_cpu: f64,
    /// Outer band, inside the clear band, giving a fairly clear signal
    pub fairly_clear_low_cpu: f64,
    pub fairly_clear_high_cpu: f64,
    pub clear_clarity: f64,
    pub fairly_clear_clarity: f64,
    pub ambiguous_clarity: f64,
    /// Smallest capacity fraction a downsize may recommend
    pub min_reduction_factor: f64,
    pub trend_min_points: usize,
    /// Absolute change in half averages treated as stable
    pub trend_stable_delta: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_data_points: 7,
            idle_threshold: 0.05,
            idle_days_threshold: 7,
            underutilized_threshold: 0.20,
            overutilized_threshold: 0.80,
            full_confidence_days: 30.0,
            data_confidence_weight: 0.4,
            clarity_confidence_weight: 0.6,
            clear_low_cpu: 0.1,
            clear_high_cpu: 0.9,
            fairly_clear_low_cpu: 0.2,
            fairly_clear_high_cpu: 0.8,
            clear_clarity: 0.95,
            fairly_clear_clarity: 0.85,
            ambiguous_clarity: 0.7,
            min_reduction_factor: 0.5,
            trend_min_points: 14,
            trend_stable_delta: 0.05,
        }
    }
}

/// Utilization regime of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UtilizationState {
    Idle,
    Underutilized,
    Optimized,
    Overutilized,
    InsufficientData,
}

impl std::fmt::Display for UtilizationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UtilizationState::Idle => write!(f, "IDLE"),
            UtilizationState::Underutilized => write!(f, "UNDERUTILIZED"),
            UtilizationState::Optimized => write!(f, "OPTIMIZED"),
            UtilizationState::Overutilized => write!(f, "OVERUTILIZED"),
            UtilizationState::InsufficientData => write!(f, "INSUFFICIENT_DATA"),
        }
    }
}

/// Utilization statistics over a series; missing samples are ignored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UtilizationStats {
    pub data_points: usize,
    pub avg_cpu: Option<f64>,
    pub max_cpu: Option<f64>,
    pub avg_memory: Option<f64>,
    pub max_memory: Option<f64>,
    pub max_consecutive_idle_days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub state: UtilizationState,
    pub confidence: f64,
    pub stats: UtilizationStats,
    pub reason: String,
}

impl Classification {
    pub fn insufficient(stats: UtilizationStats, reason: impl Into<String>) -> Self {
        Self {
            state: UtilizationState::InsufficientData,
            confidence: 0.0,
            stats,
            reason: reason.into(),
        }
    }
}
