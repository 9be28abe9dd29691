//! Cost ingestion from data sources into the cost record store

use crate::error::Result;
use crate::models::Provider;
use crate::normalizer::normalize;
use crate::observability::OptimizerMetrics;
use crate::source::DataSourceRegistry;
use crate::storage::{CostRecordStore, Repository};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub fetched: usize,
    pub stored: usize,
    pub duplicates: usize,
}

/// Pulls records from a provider source, normalizes and appends them
#[derive(Clone)]
pub struct CostIngestor {
    sources: Arc<DataSourceRegistry>,
    repo: Arc<dyn Repository>,
    metrics: OptimizerMetrics,
}

impl CostIngestor {
    pub fn new(sources: Arc<DataSourceRegistry>, repo: Arc<dyn Repository>) -> Self {
        Self {
            sources,
            repo,
            metrics: OptimizerMetrics::new(),
        }
    }

    /// Ingest one resource's records for `start..=end`
    ///
    /// Re-ingesting a window is harmless: existing keys are kept.
    pub async fn ingest(
        &self,
        tenant: &str,
        provider: Provider,
        resource_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<IngestSummary> {
        let source = self.sources.get(provider)?;
        let raw = source
            .fetch_cost_data(tenant, resource_id, start, end)
            .await
            .map_err(|e| {
                self.metrics.inc_upstream_errors("cost_data");
                e
            })?;

        let fetched = raw.len();
        let records = raw
            .into_iter()
            .filter(|r| r.tenant == tenant && r.resource_id == resource_id)
            .map(normalize)
            .collect();
        let appended = self.repo.append_cost_records(records).await?;

        debug!(
            tenant = %tenant,
            provider = %provider,
            resource_id = %resource_id,
            fetched,
            stored = appended.stored,
            duplicates = appended.duplicates,
            "Cost records ingested"
        );

        Ok(IngestSummary {
            fetched,
            stored: appended.stored,
            duplicates: appended.duplicates,
        })
    }
}
