//! Offline pipeline assembled from a JSON dataset

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use optimizer_lib::{
    normalizer,
    storage::{CostRecordStore, Repository},
    ClassifierConfig, CostIngestor, CostRecord, DataSourceRegistry, Dataset, ForecastConfig,
    ForecastEngine, MemoryRepository, Provider, RecommendationConfig, RecommendationEngine,
    SavingsValidator, TimeSeriesPoint, TradeoffConfig, TradeoffScorer, UtilizationClassifier,
    ValidationConfig,
};
use std::path::Path;
use std::sync::Arc;

/// Data sources and stores seeded from one dataset
pub struct Pipeline {
    dataset: Dataset,
    sources: Arc<DataSourceRegistry>,
    repo: Arc<dyn Repository>,
}

impl Pipeline {
    /// Load and seed a dataset file
    pub async fn load(path: &Path) -> Result<Self> {
        let dataset = Dataset::load(path)?;
        Self::from_dataset(dataset).await
    }

    pub async fn from_dataset(dataset: Dataset) -> Result<Self> {
        let sources = Arc::new(DataSourceRegistry::new());
        let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
        dataset
            .seed(&sources, repo.as_ref())
            .await
            .context("Failed to seed dataset")?;
        Ok(Self {
            dataset,
            sources,
            repo,
        })
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repo
    }

    /// Latest cost date recorded for a resource
    pub fn latest_date(&self, tenant: &str, provider: Provider, resource_id: &str) -> Option<NaiveDate> {
        self.dataset
            .cost_records
            .iter()
            .filter(|r| r.tenant == tenant && r.provider == provider && r.resource_id == resource_id)
            .map(|r| r.date)
            .max()
    }

    /// Analysis instant for a resource: end of its latest recorded day, or now
    pub fn analysis_time(&self, tenant: &str, provider: Provider, resource_id: &str) -> DateTime<Utc> {
        self.latest_date(tenant, provider, resource_id)
            .and_then(|date| date.and_hms_opt(23, 59, 59))
            .map(|at| at.and_utc())
            .unwrap_or_else(Utc::now)
    }

    /// Every record of a resource, ingested and normalized
    pub async fn records(
        &self,
        tenant: &str,
        provider: Provider,
        resource_id: &str,
    ) -> Result<Vec<CostRecord>> {
        let dates = self
            .dataset
            .cost_records
            .iter()
            .filter(|r| r.tenant == tenant && r.provider == provider && r.resource_id == resource_id)
            .map(|r| r.date);
        let (Some(start), Some(end)) = (dates.clone().min(), dates.max()) else {
            return Ok(Vec::new());
        };

        CostIngestor::new(Arc::clone(&self.sources), Arc::clone(&self.repo))
            .ingest(tenant, provider, resource_id, start, end)
            .await?;
        Ok(self
            .repo
            .cost_records(tenant, provider, resource_id, start, end)
            .await?)
    }

    pub async fn time_series(
        &self,
        tenant: &str,
        provider: Provider,
        resource_id: &str,
    ) -> Result<Vec<TimeSeriesPoint>> {
        Ok(normalizer::to_time_series(
            &self.records(tenant, provider, resource_id).await?,
        ))
    }

    pub fn recommendation_engine(&self) -> RecommendationEngine {
        RecommendationEngine::new(
            Arc::clone(&self.sources),
            Arc::clone(&self.repo),
            self.forecast_engine(),
            self.classifier(),
            RecommendationConfig::default(),
        )
        .with_logger(optimizer_lib::StructuredLogger::new("cco"))
    }

    pub fn forecast_engine(&self) -> ForecastEngine {
        ForecastEngine::new(ForecastConfig::default())
    }

    pub fn classifier(&self) -> UtilizationClassifier {
        UtilizationClassifier::new(ClassifierConfig::default())
    }

    pub fn tradeoff_scorer(&self) -> TradeoffScorer {
        TradeoffScorer::new(
            Arc::clone(&self.sources),
            Arc::clone(&self.repo),
            TradeoffConfig::default(),
        )
    }

    pub fn validator(&self) -> SavingsValidator {
        SavingsValidator::new(
            Arc::clone(&self.sources),
            Arc::clone(&self.repo),
            ValidationConfig::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn dataset() -> Dataset {
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let records: Vec<_> = (0..20)
            .map(|i| {
                json!({
                    "tenant": "acme", "provider": "aws", "resource_type": "compute",
                    "resource_id": "i-1", "resource_name": "api", "sku": "m5.xlarge",
                    "vcpu": 4, "avg_cpu_utilization": 1.4,
                    "region": "US_EAST_1", "daily_cost": 10.0,
                    "date": end - Duration::days(i)
                })
            })
            .collect();
        serde_json::from_value(json!({ "cost_records": records })).unwrap()
    }

    #[tokio::test]
    async fn test_records_are_normalized() {
        let pipeline = Pipeline::from_dataset(dataset()).await.unwrap();
        let records = pipeline.records("acme", Provider::Aws, "i-1").await.unwrap();

        assert_eq!(records.len(), 20);
        assert!(records.iter().all(|r| r.region == "us-east"));
        assert!(records.iter().all(|r| r.avg_cpu_utilization == Some(1.0)));

        let series = pipeline.time_series("acme", Provider::Aws, "i-1").await.unwrap();
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[tokio::test]
    async fn test_unknown_resource_is_empty() {
        let pipeline = Pipeline::from_dataset(dataset()).await.unwrap();
        assert!(pipeline
            .records("acme", Provider::Aws, "i-missing")
            .await
            .unwrap()
            .is_empty());
        assert!(pipeline.latest_date("acme", Provider::Aws, "i-missing").is_none());
    }

    #[tokio::test]
    async fn test_analysis_time_is_end_of_latest_day() {
        let pipeline = Pipeline::from_dataset(dataset()).await.unwrap();
        let at = pipeline.analysis_time("acme", Provider::Aws, "i-1");
        assert_eq!(at.date_naive(), NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
    }
}
