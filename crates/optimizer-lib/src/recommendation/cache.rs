//! TTL cache for analysis results with per-key stampede protection

use super::AnalysisResult;
use crate::error::Result;
use crate::models::Provider;
use crate::observability::OptimizerMetrics;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

type CacheKey = (String, Provider, String);

struct CachedAnalysis {
    result: AnalysisResult,
    stored_at: Instant,
}

/// Get-or-compute cache keyed by (tenant, provider, resource_id)
///
/// Concurrent misses for the same key wait on one computation instead of
/// running their own. A failed computation is returned only to its caller
/// and never cached; callers queued behind it then compute in turn.
pub struct AnalysisCache {
    ttl: Duration,
    entries: DashMap<CacheKey, CachedAnalysis>,
    locks: DashMap<CacheKey, Arc<Mutex<()>>>,
    metrics: OptimizerMetrics,
}

impl AnalysisCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            locks: DashMap::new(),
            metrics: OptimizerMetrics::new(),
        }
    }

    fn key(tenant: &str, provider: Provider, resource_id: &str) -> CacheKey {
        (tenant.to_string(), provider, resource_id.to_string())
    }

    fn fresh(&self, key: &CacheKey) -> Option<AnalysisResult> {
        self.entries
            .get(key)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.result.clone())
    }

    pub fn get(&self, tenant: &str, provider: Provider, resource_id: &str) -> Option<AnalysisResult> {
        self.fresh(&Self::key(tenant, provider, resource_id))
    }

    pub async fn get_or_compute<F, Fut>(
        &self,
        tenant: &str,
        provider: Provider,
        resource_id: &str,
        compute: F,
    ) -> Result<AnalysisResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AnalysisResult>>,
    {
        let key = Self::key(tenant, provider, resource_id);
        if let Some(hit) = self.fresh(&key) {
            self.metrics.inc_cache(true);
            return Ok(hit);
        }

        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another waiter may have filled the entry while we queued
        if let Some(hit) = self.fresh(&key) {
            self.metrics.inc_cache(true);
            return Ok(hit);
        }

        self.metrics.inc_cache(false);
        debug!(tenant = %tenant, provider = %provider, resource_id = %resource_id, "Analysis cache miss");
        let result = compute().await;
        if let Ok(result) = &result {
            self.entries.insert(
                key.clone(),
                CachedAnalysis {
                    result: result.clone(),
                    stored_at: Instant::now(),
                },
            );
        }
        self.locks.remove(&key);
        result
    }

    pub fn invalidate(&self, tenant: &str, provider: Provider, resource_id: &str) {
        self.entries
            .remove(&Self::key(tenant, provider, resource_id));
    }

    /// Drop entries older than the TTL, and key locks nobody is holding
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
