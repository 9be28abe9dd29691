//! Provider cost data sources
//!
//! A `CostDataSource` is the per-provider adapter that supplies raw cost
//! records, resource metadata, SKU pricing and utilization. Sources are
//! looked up through a `DataSourceRegistry`; a provider with no registered
//! source is an `UnknownProvider` error for every pipeline operation.

mod dataset;
mod static_source;

pub use dataset::{Dataset, SeedSummary, SkuPrice, TenantResource};
pub use static_source::StaticCostDataSource;

use crate::error::{OptimizerError, Result};
use crate::models::{CostRecord, Provider, ResourceMetadata, UtilizationMetrics};
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Per-provider adapter for cost, metadata and pricing data
#[async_trait]
pub trait CostDataSource: Send + Sync {
    fn provider(&self) -> Provider;

    /// Daily cost records for a resource, `start` and `end` inclusive
    async fn fetch_cost_data(
        &self,
        tenant: &str,
        resource_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CostRecord>>;

    async fn fetch_resource_metadata(
        &self,
        tenant: &str,
        resource_id: &str,
    ) -> Result<Option<ResourceMetadata>>;

    /// Hourly on-demand price in USD
    async fn get_sku_pricing(&self, sku: &str, region: &str) -> Result<Option<f64>>;

    async fn fetch_utilization_metrics(
        &self,
        tenant: &str,
        resource_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<UtilizationMetrics>>;
}

/// Registry of data sources keyed by provider
#[derive(Default)]
pub struct DataSourceRegistry {
    sources: DashMap<Provider, Arc<dyn CostDataSource>>,
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source, replacing any previous source for the same provider
    pub fn register(&self, source: Arc<dyn CostDataSource>) {
        let provider = source.provider();
        debug!(provider = %provider, "Registering cost data source");
        self.sources.insert(provider, source);
    }

    pub fn get(&self, provider: Provider) -> Result<Arc<dyn CostDataSource>> {
        self.sources
            .get(&provider)
            .map(|s| Arc::clone(s.value()))
            .ok_or_else(|| OptimizerError::UnknownProvider(provider.to_string()))
    }

    pub fn contains(&self, provider: Provider) -> bool {
        self.sources.contains_key(&provider)
    }

    /// Registered providers in a stable order
    pub fn providers(&self) -> Vec<Provider> {
        let mut providers: Vec<Provider> = self.sources.iter().map(|e| *e.key()).collect();
        providers.sort();
        providers
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = DataSourceRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(StaticCostDataSource::empty(Provider::Aws)));
        registry.register(Arc::new(StaticCostDataSource::empty(Provider::Gcp)));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(Provider::Aws));
        assert_eq!(registry.providers(), vec![Provider::Aws, Provider::Gcp]);
        assert_eq!(registry.get(Provider::Gcp).unwrap().provider(), Provider::Gcp);
    }

    #[test]
    fn test_unregistered_provider() {
        let registry = DataSourceRegistry::new();
        assert!(matches!(
            registry.get(Provider::Azure),
            Err(OptimizerError::UnknownProvider(p)) if p == "azure"
        ));
    }

    #[test]
    fn test_register_replaces() {
        let registry = DataSourceRegistry::new();
        registry.register(Arc::new(StaticCostDataSource::empty(Provider::Aws)));
        registry.register(Arc::new(StaticCostDataSource::empty(Provider::Aws)));
        assert_eq!(registry.len(), 1);
    }
}
