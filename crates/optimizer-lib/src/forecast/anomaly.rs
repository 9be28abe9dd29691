//! Cost anomaly detection
//!
//! Flags days whose cost deviates from the series mean by more than a
//! configurable number of population standard deviations.

use crate::models::TimeSeriesPoint;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default z-score threshold
pub const DEFAULT_Z_THRESHOLD: f64 = 2.5;

/// Direction of an anomalous deviation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    Spike,
    Drop,
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyKind::Spike => write!(f, "SPIKE"),
            AnomalyKind::Drop => write!(f, "DROP"),
        }
    }
}

/// A single anomalous day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostAnomaly {
    pub date: NaiveDate,
    pub cost: f64,
    /// Series mean the day was compared against
    pub expected_cost: f64,
    pub z_score: f64,
    pub kind: AnomalyKind,
    /// |z|
    pub severity: f64,
}

impl CostAnomaly {
    /// Percentage deviation from the expected cost
    pub fn deviation_percent(&self) -> f64 {
        if self.expected_cost.abs() < f64::EPSILON {
            return 0.0;
        }
        (self.cost - self.expected_cost) / self.expected_cost * 100.0
    }
}

/// Z-score anomaly detector over a whole series
pub struct AnomalyDetector {
    pub z_threshold: f64,
}

impl AnomalyDetector {
    pub fn new(z_threshold: f64) -> Self {
        Self { z_threshold }
    }

    /// Classify a single value against known mean and standard deviation
    ///
    /// Returns the anomaly kind and z-score when `|z|` exceeds the threshold.
    pub fn score_point(&self, value: f64, mean: f64, std_dev: f64) -> Option<(AnomalyKind, f64)> {
        if std_dev < f64::EPSILON {
            return None;
        }
        let z = (value - mean) / std_dev;
        if z.abs() <= self.z_threshold {
            return None;
        }
        let kind = if z > 0.0 {
            AnomalyKind::Spike
        } else {
            AnomalyKind::Drop
        };
        Some((kind, z))
    }

    /// Detect anomalous days using the population mean and standard deviation
    pub fn detect(&self, series: &[TimeSeriesPoint]) -> Vec<CostAnomaly> {
        if series.len() < 2 {
            return Vec::new();
        }

        let n = series.len() as f64;
        let mean = series.iter().map(|p| p.cost).sum::<f64>() / n;
        let variance = series.iter().map(|p| (p.cost - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        series
            .iter()
            .filter_map(|point| {
                self.score_point(point.cost, mean, std_dev)
                    .map(|(kind, z)| CostAnomaly {
                        date: point.date,
                        cost: point.cost,
                        expected_cost: mean,
                        z_score: z,
                        kind,
                        severity: z.abs(),
                    })
            })
            .collect()
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(DEFAULT_Z_THRESHOLD)
    }
}
