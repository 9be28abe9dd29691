//! Statistical trend forecaster
//!
//! Extrapolates the difference between the recent and the preceding
//! average level. Used directly when no backend is configured and as the
//! fallback whenever a backend fails.

use super::{DailyForecast, ForecastConfig, ForecastResult, MODEL_STATISTICAL};
use crate::models::TimeSeriesPoint;
use chrono::Duration;

pub struct StatisticalForecaster {
    config: ForecastConfig,
}

impl StatisticalForecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn forecast(&self, series: &[TimeSeriesPoint], horizon_days: usize) -> ForecastResult {
        let n = series.len();
        if n < self.config.min_data_points {
            return ForecastResult::insufficient();
        }

        let costs: Vec<f64> = series.iter().map(|p| p.cost).collect();
        let recent_window = self.config.recent_window.min(n);
        let recent_avg = average(&costs[n - recent_window..]);

        let earlier_window = recent_window.min(n - recent_window);
        let earlier_avg = if earlier_window == 0 {
            recent_avg
        } else {
            let end = n - recent_window;
            average(&costs[end - earlier_window..end])
        };

        let values = project_trend(recent_avg, earlier_avg, recent_window, horizon_days);
        self.assemble(series, values, MODEL_STATISTICAL)
    }

    /// Build a forecast result from daily values produced by any model
    pub(crate) fn assemble(
        &self,
        series: &[TimeSeriesPoint],
        values: Vec<f64>,
        model_used: &str,
    ) -> ForecastResult {
        let horizon_days = values.len();
        let monthly: f64 = values.iter().take(self.config.monthly_days).sum();

        let costs: Vec<f64> = series.iter().map(|p| p.cost).collect();
        let confidence = self.confidence(series.len(), population_variance(&costs), horizon_days);
        let band = (1.0 - confidence) * self.config.band_factor;

        let last_date = series.last().map(|p| p.date);
        let daily_forecasts = match last_date {
            Some(last) => values
                .iter()
                .enumerate()
                .map(|(i, cost)| DailyForecast {
                    date: last + Duration::days(i as i64 + 1),
                    cost: *cost,
                })
                .collect(),
            None => Vec::new(),
        };

        ForecastResult {
            success: true,
            monthly_cost_forecast: monthly,
            daily_forecasts,
            confidence,
            lower_bound: monthly * (1.0 - band),
            upper_bound: monthly * (1.0 + band),
            model_used: model_used.to_string(),
        }
    }

    /// Weighted blend of history length, cost stability and horizon length
    pub fn confidence(&self, data_points: usize, variance: f64, horizon_days: usize) -> f64 {
        let c = &self.config;
        let data = (data_points as f64 / c.full_confidence_days).min(1.0);
        let stability = 1.0 / (1.0 + variance.max(0.0).sqrt() / c.variance_scale);
        let horizon = (1.0 - horizon_days as f64 / c.max_horizon_days).max(0.0);

        (c.data_confidence_weight * data
            + c.variance_confidence_weight * stability
            + c.horizon_confidence_weight * horizon)
            .clamp(0.0, 1.0)
    }
}

impl Default for StatisticalForecaster {
    fn default() -> Self {
        Self::new(ForecastConfig::default())
    }
}

/// Extrapolate `horizon_days` values from the recent and earlier levels
///
/// Values are floored at zero.
pub fn project_trend(
    recent_avg: f64,
    earlier_avg: f64,
    recent_window: usize,
    horizon_days: usize,
) -> Vec<f64> {
    let daily_trend = if recent_window == 0 {
        0.0
    } else {
        (recent_avg - earlier_avg) / recent_window as f64
    };
    (0..horizon_days)
        .map(|i| (recent_avg + daily_trend * (i + 1) as f64).max(0.0))
        .collect()
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = average(values);
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}
