//! Persistence boundaries
//!
//! Each store is an async trait so a durable backend can replace the
//! in-memory repository without touching the pipeline. Only per-row
//! atomicity is required, with one exception: `upsert_active` must be a
//! single atomic find-or-insert per active key.

mod memory;

pub use memory::MemoryRepository;

use crate::error::Result;
use crate::models::{
    AlternativeTradeoffScore, CostRecord, ImplementedRecommendation, Provider, Recommendation,
    RecommendationAction, RecommendationStatus, ResourceAlternative, TenantPreferences,
    TradeoffDimension,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of an append batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendSummary {
    pub stored: usize,
    /// Records whose key already existed; the stored row is kept
    pub duplicates: usize,
}

#[async_trait]
pub trait CostRecordStore: Send + Sync {
    /// Append records; existing (tenant, provider, resource_id, date) keys are left untouched
    async fn append_cost_records(&self, records: Vec<CostRecord>) -> Result<AppendSummary>;

    /// Records for a resource between `start` and `end` inclusive, ascending by date
    async fn cost_records(
        &self,
        tenant: &str,
        provider: Provider,
        resource_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CostRecord>>;
}

/// Outcome of an active-recommendation upsert
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub recommendation: Recommendation,
    pub inserted: bool,
}

/// Filter for listing recommendations; `None` fields match everything
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationFilter {
    pub tenant: Option<String>,
    pub provider: Option<Provider>,
    pub resource_id: Option<String>,
    pub action: Option<RecommendationAction>,
    pub status: Option<RecommendationStatus>,
}

impl RecommendationFilter {
    pub fn for_resource(tenant: &str, provider: Provider, resource_id: &str) -> Self {
        Self {
            tenant: Some(tenant.to_string()),
            provider: Some(provider),
            resource_id: Some(resource_id.to_string()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: RecommendationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, rec: &Recommendation) -> bool {
        self.tenant.as_deref().map_or(true, |t| t == rec.tenant)
            && self.provider.map_or(true, |p| p == rec.provider)
            && self.resource_id.as_deref().map_or(true, |r| r == rec.resource_id)
            && self.action.map_or(true, |a| a == rec.action)
            && self.status.map_or(true, |s| s == rec.status)
    }
}

#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Insert `recommendation` as ACTIVE, or refresh the existing ACTIVE row
    /// for the same (tenant, provider, resource_id, action) in place
    ///
    /// The refreshed row keeps its id; every other field is taken from
    /// `recommendation`, including `generated_at` and `expires_at`.
    async fn upsert_active(&self, recommendation: Recommendation) -> Result<UpsertOutcome>;

    async fn get_recommendation(&self, id: Uuid) -> Result<Option<Recommendation>>;

    /// Overwrite an existing row by id (status transitions)
    async fn save_recommendation(&self, recommendation: Recommendation) -> Result<()>;

    /// Matching rows, newest first
    async fn list_recommendations(&self, filter: &RecommendationFilter)
        -> Result<Vec<Recommendation>>;
}

#[async_trait]
pub trait AlternativeStore: Send + Sync {
    async fn save_alternative(&self, alternative: ResourceAlternative) -> Result<()>;

    /// Alternatives seeded for a provider's current SKU (case-insensitive)
    async fn alternatives_for(
        &self,
        provider: Provider,
        current_sku: &str,
    ) -> Result<Vec<ResourceAlternative>>;
}

#[async_trait]
pub trait DimensionStore: Send + Sync {
    /// Insert or replace by id
    async fn save_dimension(&self, dimension: TradeoffDimension) -> Result<()>;

    /// All dimensions ordered by id
    async fn dimensions(&self) -> Result<Vec<TradeoffDimension>>;
}

#[async_trait]
pub trait TradeoffScoreStore: Send + Sync {
    async fn get_score(
        &self,
        alternative_id: u64,
        dimension_id: u32,
    ) -> Result<Option<AlternativeTradeoffScore>>;

    /// Insert or replace by (alternative_id, dimension_id)
    async fn save_score(&self, score: AlternativeTradeoffScore) -> Result<()>;
}

#[async_trait]
pub trait ImplementedRecommendationStore: Send + Sync {
    /// Insert or replace by id
    async fn save_implemented(&self, item: ImplementedRecommendation) -> Result<()>;

    async fn get_implemented(&self, id: Uuid) -> Result<Option<ImplementedRecommendation>>;

    /// PENDING items whose scheduled validation time is at or before `now`
    async fn due_for_validation(&self, now: DateTime<Utc>) -> Result<Vec<ImplementedRecommendation>>;

    async fn list_implemented(&self, tenant: Option<&str>) -> Result<Vec<ImplementedRecommendation>>;
}

#[async_trait]
pub trait PreferencesStore: Send + Sync {
    async fn preferences(&self, tenant: &str) -> Result<Option<TenantPreferences>>;

    async fn save_preferences(&self, preferences: TenantPreferences) -> Result<()>;
}

/// Every store the pipeline depends on
pub trait Repository:
    CostRecordStore
    + RecommendationStore
    + AlternativeStore
    + DimensionStore
    + TradeoffScoreStore
    + ImplementedRecommendationStore
    + PreferencesStore
{
}

impl<T> Repository for T where
    T: CostRecordStore
        + RecommendationStore
        + AlternativeStore
        + DimensionStore
        + TradeoffScoreStore
        + ImplementedRecommendationStore
        + PreferencesStore
{
}
