//! In-memory data source backed by a loaded dataset

use super::{CostDataSource, Dataset};
use crate::error::{OptimizerError, Result};
use crate::models::{CostRecord, Provider, ResourceMetadata, UtilizationMetrics};
use crate::normalizer::{canonical_region, mean};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Serves cost, metadata and pricing for one provider from memory
///
/// Can be switched unavailable to exercise degraded paths.
pub struct StaticCostDataSource {
    provider: Provider,
    records: Vec<CostRecord>,
    metadata: HashMap<(String, String), ResourceMetadata>,
    /// (lowercased sku, canonical region) -> hourly USD
    pricing: HashMap<(String, String), f64>,
    available: AtomicBool,
}

impl StaticCostDataSource {
    pub fn empty(provider: Provider) -> Self {
        Self {
            provider,
            records: Vec::new(),
            metadata: HashMap::new(),
            pricing: HashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Build the source for `provider` from the matching dataset entries
    pub fn from_dataset(provider: Provider, dataset: &Dataset) -> Self {
        let mut source = Self::empty(provider);
        for record in dataset.cost_records.iter().filter(|r| r.provider == provider) {
            source.add_record(record.clone());
        }
        for resource in dataset.resources.iter().filter(|r| r.provider == provider) {
            source.add_metadata(&resource.tenant, resource.metadata.clone());
        }
        for price in dataset.pricing.iter().filter(|p| p.provider == provider) {
            source.add_price(&price.sku, &price.region, price.hourly_usd);
        }
        source
    }

    pub fn add_record(&mut self, record: CostRecord) {
        self.records.push(record);
    }

    pub fn add_metadata(&mut self, tenant: &str, metadata: ResourceMetadata) {
        self.metadata
            .insert((tenant.to_string(), metadata.resource_id.clone()), metadata);
    }

    pub fn add_price(&mut self, sku: &str, region: &str, hourly_usd: f64) {
        let key = (sku.to_ascii_lowercase(), canonical_region(self.provider, region));
        self.pricing.insert(key, hourly_usd);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    fn ensure_available(&self, call: &str) -> Result<()> {
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(OptimizerError::UpstreamUnavailable(format!(
                "{} source unavailable for {}",
                self.provider, call
            )))
        }
    }

    fn records_in_range<'a>(
        &'a self,
        tenant: &'a str,
        resource_id: &'a str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Iterator<Item = &'a CostRecord> + 'a {
        self.records.iter().filter(move |r| {
            r.tenant == tenant && r.resource_id == resource_id && r.date >= start && r.date <= end
        })
    }
}

#[async_trait]
impl CostDataSource for StaticCostDataSource {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn fetch_cost_data(
        &self,
        tenant: &str,
        resource_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CostRecord>> {
        self.ensure_available("cost data")?;
        let mut records: Vec<CostRecord> = self
            .records_in_range(tenant, resource_id, start, end)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    async fn fetch_resource_metadata(
        &self,
        tenant: &str,
        resource_id: &str,
    ) -> Result<Option<ResourceMetadata>> {
        self.ensure_available("metadata")?;
        Ok(self
            .metadata
            .get(&(tenant.to_string(), resource_id.to_string()))
            .cloned())
    }

    async fn get_sku_pricing(&self, sku: &str, region: &str) -> Result<Option<f64>> {
        self.ensure_available("pricing")?;
        let key = (sku.to_ascii_lowercase(), canonical_region(self.provider, region));
        Ok(self.pricing.get(&key).copied())
    }

    async fn fetch_utilization_metrics(
        &self,
        tenant: &str,
        resource_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<UtilizationMetrics>> {
        self.ensure_available("utilization")?;
        let records: Vec<&CostRecord> = self
            .records_in_range(tenant, resource_id, start, end)
            .collect();
        if records.is_empty() {
            return Ok(None);
        }

        let cpu = || records.iter().filter_map(|r| r.avg_cpu_utilization);
        let memory = || records.iter().filter_map(|r| r.avg_memory_utilization);

        Ok(Some(UtilizationMetrics {
            resource_id: resource_id.to_string(),
            start,
            end,
            avg_cpu: mean(cpu()),
            max_cpu: cpu().reduce(f64::max),
            avg_memory: mean(memory()),
            max_memory: memory().reduce(f64::max),
        }))
    }
}
