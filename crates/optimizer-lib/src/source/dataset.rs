//! JSON dataset used to seed data sources and stores

use super::{DataSourceRegistry, StaticCostDataSource};
use crate::error::Result;
use crate::models::{
    CostRecord, ImplementedRecommendation, Provider, ResourceAlternative, ResourceMetadata,
    TenantPreferences, TradeoffDimension,
};
use crate::storage::{
    AlternativeStore, DimensionStore, ImplementedRecommendationStore, PreferencesStore, Repository,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Resource metadata scoped to a tenant and provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantResource {
    pub tenant: String,
    pub provider: Provider,
    #[serde(flatten)]
    pub metadata: ResourceMetadata,
}

/// Hourly on-demand price for a SKU in a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuPrice {
    pub provider: Provider,
    pub sku: String,
    pub region: String,
    pub hourly_usd: f64,
}

/// Everything a data source and repository can be seeded with
///
/// Cost records feed the data sources only; they reach the cost record
/// store through ingestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub cost_records: Vec<CostRecord>,
    pub resources: Vec<TenantResource>,
    pub pricing: Vec<SkuPrice>,
    pub alternatives: Vec<ResourceAlternative>,
    /// Replaces stored dimensions with the same id
    pub dimensions: Vec<TradeoffDimension>,
    pub preferences: Vec<TenantPreferences>,
    pub implemented: Vec<ImplementedRecommendation>,
}

/// Counts of seeded rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSummary {
    pub sources: usize,
    pub alternatives: usize,
    pub dimensions: usize,
    pub preferences: usize,
    pub implemented: usize,
}

impl Dataset {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse dataset JSON")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid dataset {}", path.display()))
    }

    /// Providers referenced anywhere in the dataset
    pub fn providers(&self) -> BTreeSet<Provider> {
        self.cost_records
            .iter()
            .map(|r| r.provider)
            .chain(self.resources.iter().map(|r| r.provider))
            .chain(self.pricing.iter().map(|p| p.provider))
            .chain(self.alternatives.iter().map(|a| a.alternative_provider))
            .collect()
    }

    /// Register one static source per referenced provider
    pub fn register_sources(&self, registry: &DataSourceRegistry) -> usize {
        let providers = self.providers();
        for provider in &providers {
            registry.register(Arc::new(StaticCostDataSource::from_dataset(*provider, self)));
        }
        providers.len()
    }

    /// Seed sources and stores
    pub async fn seed(
        &self,
        registry: &DataSourceRegistry,
        repo: &dyn Repository,
    ) -> Result<SeedSummary> {
        let mut summary = SeedSummary {
            sources: self.register_sources(registry),
            ..Default::default()
        };

        for alternative in &self.alternatives {
            repo.save_alternative(alternative.clone()).await?;
            summary.alternatives += 1;
        }
        for dimension in &self.dimensions {
            repo.save_dimension(dimension.clone()).await?;
            summary.dimensions += 1;
        }
        for preferences in &self.preferences {
            repo.save_preferences(preferences.clone()).await?;
            summary.preferences += 1;
        }
        for item in &self.implemented {
            repo.save_implemented(item.clone()).await?;
            summary.implemented += 1;
        }

        info!(
            sources = summary.sources,
            cost_records = self.cost_records.len(),
            alternatives = summary.alternatives,
            implemented = summary.implemented,
            "Dataset seeded"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryRepository;
    use std::io::Write;

    const DATASET: &str = r#"{
        "cost_records": [{
            "tenant": "acme", "provider": "aws", "resource_type": "compute",
            "resource_id": "i-1", "resource_name": "api", "sku": "m5.xlarge",
            "vcpu": 4, "memory_gb": 16.0, "avg_cpu_utilization": 0.15,
            "region": "us-east-1", "daily_cost": 10.0, "date": "2024-06-01"
        }],
        "resources": [{
            "tenant": "acme", "provider": "aws", "resource_id": "i-1", "name": "api",
            "resource_type": "compute", "sku": "m5.xlarge", "region": "us-east-1"
        }],
        "pricing": [
            {"provider": "aws", "sku": "m5.xlarge", "region": "us-east-1", "hourly_usd": 0.192},
            {"provider": "gcp", "sku": "n2-standard-4", "region": "us-east1", "hourly_usd": 0.194}
        ],
        "alternatives": [{
            "id": 1, "provider": "aws", "resource_type": "compute",
            "current_sku": "m5.xlarge", "alternative_sku": "m5.large",
            "alternative_provider": "aws", "vcpu": 2, "memory_gb": 8.0,
            "sku_family": "m5", "category": "downsize"
        }]
    }"#;

    #[test]
    fn test_parse_with_defaults() {
        let dataset = Dataset::from_json(DATASET).unwrap();
        assert_eq!(dataset.cost_records.len(), 1);
        assert_eq!(dataset.resources[0].metadata.status, "running");
        assert!(dataset.implemented.is_empty());
        assert_eq!(
            dataset.providers().into_iter().collect::<Vec<_>>(),
            vec![Provider::Aws, Provider::Gcp]
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DATASET.as_bytes()).unwrap();
        let dataset = Dataset::load(file.path()).unwrap();
        assert_eq!(dataset.pricing.len(), 2);
    }

    #[test]
    fn test_invalid_json_has_context() {
        let err = Dataset::from_json("{\"cost_records\": 5}").unwrap_err();
        assert!(err.to_string().contains("dataset"));
    }

    #[tokio::test]
    async fn test_seed() {
        let dataset = Dataset::from_json(DATASET).unwrap();
        let registry = DataSourceRegistry::new();
        let repo = MemoryRepository::new();

        let summary = dataset.seed(&registry, &repo).await.unwrap();
        assert_eq!(summary.sources, 2);
        assert_eq!(summary.alternatives, 1);
        assert!(registry.contains(Provider::Gcp));
        assert_eq!(
            repo.alternatives_for(Provider::Aws, "m5.xlarge").await.unwrap().len(),
            1
        );
    }
}
