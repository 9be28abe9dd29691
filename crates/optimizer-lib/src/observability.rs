//! Observability infrastructure for the cost optimizer
//!
//! Provides:
//! - Prometheus metrics (analysis latency, recommendations, forecast fallbacks, validation outcomes)
//! - Structured JSON logging with tracing

use crate::models::{Recommendation, ValidationStatus};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for analysis latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<OptimizerMetricsInner> = OnceLock::new();

struct OptimizerMetricsInner {
    analysis_latency_seconds: Histogram,
    analyses_total: IntCounterVec,
    recommendations_total: IntCounterVec,
    forecast_fallbacks: IntCounter,
    anomalies_detected: IntCounter,
    validations_total: IntCounterVec,
    validation_errors: IntCounter,
    cache_requests: IntCounterVec,
    upstream_errors: IntCounterVec,
}

impl OptimizerMetricsInner {
    fn new() -> Self {
        Self {
            analysis_latency_seconds: register_histogram!(
                "cost_optimizer_analysis_latency_seconds",
                "Time spent analyzing a single resource",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register analysis_latency_seconds"),

            analyses_total: register_int_counter_vec!(
                "cost_optimizer_analyses_total",
                "Resource analyses by outcome",
                &["outcome"]
            )
            .expect("Failed to register analyses_total"),

            recommendations_total: register_int_counter_vec!(
                "cost_optimizer_recommendations_total",
                "Recommendations persisted, by action and whether a new row was inserted",
                &["action", "operation"]
            )
            .expect("Failed to register recommendations_total"),

            forecast_fallbacks: register_int_counter!(
                "cost_optimizer_forecast_fallbacks_total",
                "Forecasts served by the statistical model after a backend failure"
            )
            .expect("Failed to register forecast_fallbacks"),

            anomalies_detected: register_int_counter!(
                "cost_optimizer_anomalies_detected_total",
                "Total number of cost anomalies detected"
            )
            .expect("Failed to register anomalies_detected"),

            validations_total: register_int_counter_vec!(
                "cost_optimizer_validations_total",
                "Savings validations by resulting status",
                &["status"]
            )
            .expect("Failed to register validations_total"),

            validation_errors: register_int_counter!(
                "cost_optimizer_validation_errors_total",
                "Validation candidates skipped because of an error"
            )
            .expect("Failed to register validation_errors"),

            cache_requests: register_int_counter_vec!(
                "cost_optimizer_analysis_cache_requests_total",
                "Analysis cache lookups by result",
                &["result"]
            )
            .expect("Failed to register cache_requests"),

            upstream_errors: register_int_counter_vec!(
                "cost_optimizer_upstream_errors_total",
                "Collaborator calls that failed and were degraded",
                &["call"]
            )
            .expect("Failed to register upstream_errors"),
        }
    }
}

/// Optimizer metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct OptimizerMetrics {
    _private: (),
}

impl Default for OptimizerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl OptimizerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(OptimizerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &OptimizerMetricsInner {
        GLOBAL_METRICS.get_or_init(OptimizerMetricsInner::new)
    }

    pub fn observe_analysis_latency(&self, duration_secs: f64) {
        self.inner().analysis_latency_seconds.observe(duration_secs);
    }

    /// Count an analysis outcome (`analyzed`, `no_data`, `no_history`, `error`)
    pub fn inc_analyses(&self, outcome: &str) {
        self.inner().analyses_total.with_label_values(&[outcome]).inc();
    }

    pub fn inc_recommendations(&self, action: &str, inserted: bool) {
        let operation = if inserted { "inserted" } else { "updated" };
        self.inner()
            .recommendations_total
            .with_label_values(&[action, operation])
            .inc();
    }

    pub fn inc_forecast_fallbacks(&self) {
        self.inner().forecast_fallbacks.inc();
    }

    pub fn inc_anomalies_detected(&self, count: u64) {
        self.inner().anomalies_detected.inc_by(count);
    }

    pub fn inc_validations(&self, status: ValidationStatus) {
        let status = status.to_string();
        self.inner()
            .validations_total
            .with_label_values(&[status.as_str()])
            .inc();
    }

    pub fn inc_validation_errors(&self) {
        self.inner().validation_errors.inc();
    }

    pub fn inc_cache(&self, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.inner().cache_requests.with_label_values(&[result]).inc();
    }

    pub fn inc_upstream_errors(&self, call: &str) {
        self.inner().upstream_errors.with_label_values(&[call]).inc();
    }
}

/// Structured logger for optimizer events
///
/// Provides consistent JSON-formatted logging for analyses,
/// recommendations, anomalies and validations.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a completed resource analysis
    pub fn log_analysis(
        &self,
        tenant: &str,
        provider: &str,
        resource_id: &str,
        classification: &str,
        recommendations: usize,
        duration_ms: u64,
    ) {
        info!(
            event = "analysis_completed",
            instance = %self.instance,
            tenant = %tenant,
            provider = %provider,
            resource_id = %resource_id,
            classification = %classification,
            recommendations = recommendations,
            duration_ms = duration_ms,
            "Resource analysis completed"
        );
    }

    /// Log a recommendation insert or in-place refresh
    pub fn log_recommendation(&self, recommendation: &Recommendation, inserted: bool) {
        info!(
            event = "recommendation_upserted",
            instance = %self.instance,
            tenant = %recommendation.tenant,
            provider = %recommendation.provider,
            resource_id = %recommendation.resource_id,
            recommendation_id = %recommendation.id,
            action = %recommendation.action,
            risk_level = %recommendation.risk_level,
            estimated_monthly_savings = recommendation.estimated_monthly_savings,
            confidence = recommendation.confidence,
            inserted = inserted,
            "Recommendation persisted"
        );
    }

    /// Log a cost anomaly
    pub fn log_anomaly(
        &self,
        tenant: &str,
        resource_id: &str,
        kind: &str,
        date: &str,
        cost: f64,
        severity: f64,
    ) {
        warn!(
            event = "anomaly_detected",
            instance = %self.instance,
            tenant = %tenant,
            resource_id = %resource_id,
            anomaly_type = %kind,
            date = %date,
            cost = cost,
            severity = severity,
            "Cost anomaly detected"
        );
    }

    /// Log a savings validation outcome
    pub fn log_validation(
        &self,
        tenant: &str,
        resource_id: &str,
        status: ValidationStatus,
        expected_monthly_savings: f64,
        actual_monthly_savings: Option<f64>,
    ) {
        match status {
            ValidationStatus::Failed => warn!(
                event = "validation_completed",
                instance = %self.instance,
                tenant = %tenant,
                resource_id = %resource_id,
                status = %status,
                expected_monthly_savings = expected_monthly_savings,
                actual_monthly_savings = ?actual_monthly_savings,
                "Savings validation failed"
            ),
            _ => info!(
                event = "validation_completed",
                instance = %self.instance,
                tenant = %tenant,
                resource_id = %resource_id,
                status = %status,
                expected_monthly_savings = expected_monthly_savings,
                actual_monthly_savings = ?actual_monthly_savings,
                "Savings validation completed"
            ),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, forecast_model: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            version = %version,
            forecast_model = %forecast_model,
            "Cost optimizer started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Cost optimizer shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimizer_metrics_creation() {
        let metrics = OptimizerMetrics::new();

        metrics.observe_analysis_latency(0.01);
        metrics.inc_analyses("analyzed");
        metrics.inc_recommendations("DOWNSIZE_INSTANCE", true);
        metrics.inc_forecast_fallbacks();
        metrics.inc_anomalies_detected(2);
        metrics.inc_validations(ValidationStatus::Validated);
        metrics.inc_cache(true);
        metrics.inc_upstream_errors("pricing");

        let clone = metrics.clone();
        clone.inc_validation_errors();
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance, "test-instance");
    }
}
