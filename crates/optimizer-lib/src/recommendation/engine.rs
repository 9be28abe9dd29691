//! Per-resource analysis orchestration

use super::rules::{self, RuleContext};
use super::{
    validate_resource_id, AnalysisCache, AnalysisRequest, AnalysisResult, AnalysisStatus,
    RecommendationConfig,
};
use crate::error::{OptimizerError, Result};
use crate::forecast::ForecastEngine;
use crate::ingest::CostIngestor;
use crate::models::{CostRecord, DetectedConfig, NormalizedResourceCost, Provider, Recommendation};
use crate::normalizer::{summarize, to_time_series};
use crate::observability::{OptimizerMetrics, StructuredLogger};
use crate::source::{CostDataSource, DataSourceRegistry};
use crate::storage::{CostRecordStore, RecommendationStore, Repository};
use crate::utilization::{UtilizationClassifier, UtilizationState};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Turns a resource's cost history into persisted recommendations
pub struct RecommendationEngine {
    pub(super) sources: Arc<DataSourceRegistry>,
    pub(super) repo: Arc<dyn Repository>,
    ingestor: CostIngestor,
    forecast: ForecastEngine,
    classifier: UtilizationClassifier,
    pub(super) config: RecommendationConfig,
    pub(super) cache: AnalysisCache,
    logger: StructuredLogger,
    metrics: OptimizerMetrics,
}

impl RecommendationEngine {
    pub fn new(
        sources: Arc<DataSourceRegistry>,
        repo: Arc<dyn Repository>,
        forecast: ForecastEngine,
        classifier: UtilizationClassifier,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            ingestor: CostIngestor::new(Arc::clone(&sources), Arc::clone(&repo)),
            cache: AnalysisCache::new(config.cache_ttl()),
            sources,
            repo,
            forecast,
            classifier,
            config,
            logger: StructuredLogger::new("cost-optimizer"),
            metrics: OptimizerMetrics::new(),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    pub fn forecast_engine(&self) -> &ForecastEngine {
        &self.forecast
    }

    pub fn classifier(&self) -> &UtilizationClassifier {
        &self.classifier
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    pub async fn analyze_resource(
        &self,
        tenant: &str,
        provider: Provider,
        resource_id: &str,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult> {
        self.analyze_resource_at(tenant, provider, resource_id, request, Utc::now())
            .await
    }

    /// `analyze_resource` behind the TTL cache
    pub async fn analyze_resource_cached(
        &self,
        tenant: &str,
        provider: Provider,
        resource_id: &str,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult> {
        self.cache
            .get_or_compute(tenant, provider, resource_id, || {
                self.analyze_resource(tenant, provider, resource_id, request)
            })
            .await
    }

    /// Analyze one resource as of `now`
    pub async fn analyze_resource_at(
        &self,
        tenant: &str,
        provider: Provider,
        resource_id: &str,
        request: &AnalysisRequest,
        now: DateTime<Utc>,
    ) -> Result<AnalysisResult> {
        let started = Instant::now();
        let outcome = self
            .run_analysis(tenant, provider, resource_id, request, now)
            .await;
        let elapsed = started.elapsed();
        self.metrics.observe_analysis_latency(elapsed.as_secs_f64());

        match &outcome {
            Ok(result) => {
                self.metrics.inc_analyses(result.status.as_str());
                self.logger.log_analysis(
                    tenant,
                    provider.as_str(),
                    resource_id,
                    &result.classification.to_string(),
                    result.recommendations.len(),
                    elapsed.as_millis() as u64,
                );
            }
            Err(e) => {
                self.metrics.inc_analyses("error");
                warn!(
                    tenant = %tenant,
                    provider = %provider,
                    resource_id = %resource_id,
                    error = %e,
                    "Resource analysis failed"
                );
            }
        }
        outcome
    }

    async fn run_analysis(
        &self,
        tenant: &str,
        provider: Provider,
        resource_id: &str,
        request: &AnalysisRequest,
        now: DateTime<Utc>,
    ) -> Result<AnalysisResult> {
        validate_resource_id(resource_id)?;
        let source = self.sources.get(provider)?;

        let records = self
            .load_records(tenant, provider, resource_id, now)
            .await?;

        match (summarize(&records), &request.detected_config) {
            (Some(summary), _) => {
                self.analyze_history(&summary, &records, source.as_ref(), now)
                    .await
            }
            (None, Some(detected)) => {
                self.analyze_without_history(tenant, provider, resource_id, detected, now)
                    .await
            }
            (None, None) => Ok(AnalysisResult::no_data(tenant, provider, resource_id, now)),
        }
    }

    /// Records for the lookback window ending today
    ///
    /// The window is re-ingested first; a failing source leaves whatever
    /// is already stored.
    async fn load_records(
        &self,
        tenant: &str,
        provider: Provider,
        resource_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<CostRecord>> {
        let end = now.date_naive();
        let start = end - Duration::days(i64::from(self.config.lookback_days.max(1)) - 1);

        match self
            .ingestor
            .ingest(tenant, provider, resource_id, start, end)
            .await
        {
            Ok(_) => {}
            Err(e @ OptimizerError::Storage(_)) => return Err(e),
            Err(e) => {
                warn!(
                    tenant = %tenant,
                    resource_id = %resource_id,
                    error = %e,
                    "Cost ingestion failed, analyzing stored records"
                );
            }
        }

        self.repo
            .cost_records(tenant, provider, resource_id, start, end)
            .await
    }

    async fn analyze_history(
        &self,
        summary: &NormalizedResourceCost,
        records: &[CostRecord],
        source: &dyn CostDataSource,
        now: DateTime<Utc>,
    ) -> Result<AnalysisResult> {
        let series = to_time_series(records);
        let forecast = self
            .forecast
            .forecast(&series, self.config.forecast_horizon_days)
            .await;
        let classification = self.classifier.classify(&series);

        let (vcpu, memory_gb) = self.resolve_sizes(summary, source).await;
        let rightsizing = self.classifier.analyze_rightsizing(
            &classification,
            summary.avg_daily_cost,
            vcpu,
            memory_gb,
        );
        let trend = self.classifier.detect_trend(&series);

        let anomalies = self.forecast.detect_anomalies(&series);
        for anomaly in &anomalies {
            self.logger.log_anomaly(
                &summary.tenant,
                &summary.resource_id,
                &anomaly.kind.to_string(),
                &anomaly.date.to_string(),
                anomaly.cost,
                anomaly.severity,
            );
        }

        let candidates = rules::generate(&RuleContext {
            tenant: &summary.tenant,
            provider: summary.provider,
            resource_id: &summary.resource_id,
            summary,
            classification: &classification,
            rightsizing: &rightsizing,
            forecast: &forecast,
            vcpu,
            memory_gb,
            now,
            config: &self.config,
        });
        let recommendations = self.persist(candidates).await?;

        let message = match classification.state {
            UtilizationState::InsufficientData => Some(classification.reason.clone()),
            _ if !forecast.success => Some(format!(
                "Forecast needs at least {} days of cost data",
                self.forecast.config().min_data_points
            )),
            _ => None,
        };

        Ok(AnalysisResult {
            tenant: summary.tenant.clone(),
            provider: summary.provider,
            resource_id: summary.resource_id.clone(),
            status: AnalysisStatus::Analyzed,
            classification: classification.state,
            confidence: classification.confidence,
            total_monthly_savings: total_savings(&recommendations),
            cost_summary: Some(summary.clone()),
            forecast: Some(forecast),
            utilization: Some(classification),
            rightsizing: Some(rightsizing),
            trend: Some(trend),
            anomalies,
            recommendations,
            message,
            analyzed_at: now,
        })
    }

    async fn analyze_without_history(
        &self,
        tenant: &str,
        provider: Provider,
        resource_id: &str,
        detected: &DetectedConfig,
        now: DateTime<Utc>,
    ) -> Result<AnalysisResult> {
        debug!(tenant = %tenant, resource_id = %resource_id, "No cost history, using detected config");

        let candidates: Vec<Recommendation> =
            rules::review_sizing(tenant, provider, resource_id, detected, now, &self.config)
                .into_iter()
                .collect();
        let recommendations = self.persist(candidates).await?;

        let message = if detected.resource_type.is_optimizable() {
            "No cost history yet; sizing review suggested from detected configuration"
        } else {
            "No cost history yet and the resource type has no sizing options"
        };

        Ok(AnalysisResult {
            status: AnalysisStatus::NoHistory,
            confidence: self.config.no_history_confidence,
            total_monthly_savings: total_savings(&recommendations),
            recommendations,
            message: Some(message.to_string()),
            ..AnalysisResult::no_data(tenant, provider, resource_id, now)
        })
    }

    /// Sizes from the records, falling back to provider metadata
    async fn resolve_sizes(
        &self,
        summary: &NormalizedResourceCost,
        source: &dyn CostDataSource,
    ) -> (Option<u32>, Option<f64>) {
        if summary.vcpu.is_some() && summary.memory_gb.is_some() {
            return (summary.vcpu, summary.memory_gb);
        }

        match source
            .fetch_resource_metadata(&summary.tenant, &summary.resource_id)
            .await
        {
            Ok(Some(meta)) => (
                summary.vcpu.or(meta.vcpu),
                summary.memory_gb.or(meta.memory_gb),
            ),
            Ok(None) => (summary.vcpu, summary.memory_gb),
            Err(e) => {
                self.metrics.inc_upstream_errors("metadata");
                warn!(resource_id = %summary.resource_id, error = %e, "Metadata lookup failed");
                (summary.vcpu, summary.memory_gb)
            }
        }
    }

    /// Upsert each candidate as the ACTIVE row for its action
    async fn persist(&self, candidates: Vec<Recommendation>) -> Result<Vec<Recommendation>> {
        let mut stored = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let outcome = self.repo.upsert_active(candidate).await?;
            self.metrics
                .inc_recommendations(outcome.recommendation.action.as_str(), outcome.inserted);
            self.logger
                .log_recommendation(&outcome.recommendation, outcome.inserted);
            stored.push(outcome.recommendation);
        }
        Ok(stored)
    }
}

fn total_savings(recommendations: &[Recommendation]) -> f64 {
    recommendations
        .iter()
        .map(|r| r.estimated_monthly_savings)
        .sum()
}
