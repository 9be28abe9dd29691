//! Forecast engine: optional backend in front of the statistical model

use super::{
    AnomalyDetector, CostAnomaly, ForecastBackend, ForecastConfig, ForecastResult,
    StatisticalForecaster,
};
use crate::models::TimeSeriesPoint;
use crate::observability::OptimizerMetrics;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ForecastEngine {
    statistical: StatisticalForecaster,
    anomaly_detector: AnomalyDetector,
    backend: Option<Arc<dyn ForecastBackend>>,
    metrics: OptimizerMetrics,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig) -> Self {
        Self {
            anomaly_detector: AnomalyDetector::new(config.anomaly_z_threshold),
            statistical: StatisticalForecaster::new(config),
            backend: None,
            metrics: OptimizerMetrics::new(),
        }
    }

    /// Place an external backend in front of the statistical model
    pub fn with_backend(mut self, backend: Arc<dyn ForecastBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn config(&self) -> &ForecastConfig {
        self.statistical.config()
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Forecast `horizon_days` of daily cost
    ///
    /// Backend errors, timeouts and unusable output all fall back to the
    /// statistical model; only `model_used` reveals which one answered.
    pub async fn forecast(&self, series: &[TimeSeriesPoint], horizon_days: usize) -> ForecastResult {
        if series.len() < self.config().min_data_points {
            return ForecastResult::insufficient();
        }

        if let Some(backend) = &self.backend {
            let history: Vec<f64> = series.iter().map(|p| p.cost).collect();
            let timeout = self.config().backend_timeout();

            match tokio::time::timeout(timeout, backend.predict(&history, horizon_days)).await {
                Ok(Ok(values))
                    if values.len() == horizon_days && values.iter().all(|v| v.is_finite()) =>
                {
                    debug!(model = %backend.name(), horizon_days, "Backend forecast used");
                    let values = values.into_iter().map(|v| v.max(0.0)).collect();
                    return self.statistical.assemble(series, values, backend.name());
                }
                Ok(Ok(values)) => {
                    warn!(
                        model = %backend.name(),
                        returned = values.len(),
                        expected = horizon_days,
                        "Forecast backend returned unusable output, using statistical model"
                    );
                }
                Ok(Err(e)) => {
                    warn!(model = %backend.name(), error = %e, "Forecast backend failed, using statistical model");
                }
                Err(_) => {
                    warn!(
                        model = %backend.name(),
                        timeout_ms = timeout.as_millis() as u64,
                        "Forecast backend timed out, using statistical model"
                    );
                }
            }
            self.metrics.inc_forecast_fallbacks();
        }

        self.statistical.forecast(series, horizon_days)
    }

    /// Flag anomalous days in the series
    pub fn detect_anomalies(&self, series: &[TimeSeriesPoint]) -> Vec<CostAnomaly> {
        let anomalies = self.anomaly_detector.detect(series);
        self.metrics.inc_anomalies_detected(anomalies.len() as u64);
        anomalies
    }
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new(ForecastConfig::default())
    }
}
