//! In-memory repository backed by concurrent maps

use super::{
    AlternativeStore, AppendSummary, CostRecordStore, DimensionStore,
    ImplementedRecommendationStore, PreferencesStore, RecommendationFilter, RecommendationStore,
    TradeoffScoreStore, UpsertOutcome,
};
use crate::error::{OptimizerError, Result};
use crate::models::{
    ActiveRecommendationKey, AlternativeTradeoffScore, CostRecord, CostRecordKey,
    ImplementedRecommendation, Provider, Recommendation, RecommendationStatus,
    ResourceAlternative, TenantPreferences, TradeoffDimension, ValidationStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

/// Repository holding every store in process memory
///
/// The active-recommendation index is updated under its entry lock, which
/// makes `upsert_active` atomic per key.
pub struct MemoryRepository {
    cost_records: DashMap<CostRecordKey, CostRecord>,
    recommendations: DashMap<Uuid, Recommendation>,
    active_index: DashMap<ActiveRecommendationKey, Uuid>,
    alternatives: DashMap<u64, ResourceAlternative>,
    dimensions: DashMap<u32, TradeoffDimension>,
    scores: DashMap<(u64, u32), AlternativeTradeoffScore>,
    implemented: DashMap<Uuid, ImplementedRecommendation>,
    preferences: DashMap<String, TenantPreferences>,
}

impl MemoryRepository {
    /// Repository seeded with the default tradeoff dimensions
    pub fn new() -> Self {
        let repo = Self::empty();
        for dimension in TradeoffDimension::defaults() {
            repo.dimensions.insert(dimension.id, dimension);
        }
        repo
    }

    pub fn empty() -> Self {
        Self {
            cost_records: DashMap::new(),
            recommendations: DashMap::new(),
            active_index: DashMap::new(),
            alternatives: DashMap::new(),
            dimensions: DashMap::new(),
            scores: DashMap::new(),
            implemented: DashMap::new(),
            preferences: DashMap::new(),
        }
    }

    pub fn cost_record_count(&self) -> usize {
        self.cost_records.len()
    }

    pub fn recommendation_count(&self) -> usize {
        self.recommendations.len()
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CostRecordStore for MemoryRepository {
    async fn append_cost_records(&self, records: Vec<CostRecord>) -> Result<AppendSummary> {
        let mut summary = AppendSummary::default();
        for record in records {
            match self.cost_records.entry(record.key()) {
                Entry::Vacant(entry) => {
                    entry.insert(record);
                    summary.stored += 1;
                }
                Entry::Occupied(_) => summary.duplicates += 1,
            }
        }
        Ok(summary)
    }

    async fn cost_records(
        &self,
        tenant: &str,
        provider: Provider,
        resource_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CostRecord>> {
        let mut records: Vec<CostRecord> = self
            .cost_records
            .iter()
            .filter(|e| {
                let k = e.key();
                k.provider == provider
                    && k.tenant == tenant
                    && k.resource_id == resource_id
                    && k.date >= start
                    && k.date <= end
            })
            .map(|e| e.value().clone())
            .collect();
        records.sort_by_key(|r| r.date);
        Ok(records)
    }
}

#[async_trait]
impl RecommendationStore for MemoryRepository {
    async fn upsert_active(&self, recommendation: Recommendation) -> Result<UpsertOutcome> {
        match self.active_index.entry(recommendation.active_key()) {
            Entry::Occupied(mut entry) => {
                let id = *entry.get();
                if let Some(mut row) = self.recommendations.get_mut(&id) {
                    if row.status == RecommendationStatus::Active {
                        let refreshed = Recommendation {
                            id,
                            status: RecommendationStatus::Active,
                            ..recommendation
                        };
                        *row = refreshed.clone();
                        return Ok(UpsertOutcome {
                            recommendation: refreshed,
                            inserted: false,
                        });
                    }
                }
                // Index pointed at a row that is no longer active
                debug!(stale_id = %id, "Replacing stale active index entry");
                let row = Recommendation {
                    status: RecommendationStatus::Active,
                    ..recommendation
                };
                self.recommendations.insert(row.id, row.clone());
                entry.insert(row.id);
                Ok(UpsertOutcome {
                    recommendation: row,
                    inserted: true,
                })
            }
            Entry::Vacant(entry) => {
                let row = Recommendation {
                    status: RecommendationStatus::Active,
                    ..recommendation
                };
                self.recommendations.insert(row.id, row.clone());
                entry.insert(row.id);
                Ok(UpsertOutcome {
                    recommendation: row,
                    inserted: true,
                })
            }
        }
    }

    async fn get_recommendation(&self, id: Uuid) -> Result<Option<Recommendation>> {
        Ok(self.recommendations.get(&id).map(|r| r.clone()))
    }

    async fn save_recommendation(&self, recommendation: Recommendation) -> Result<()> {
        let id = recommendation.id;
        if !self.recommendations.contains_key(&id) {
            return Err(OptimizerError::NotFound {
                entity: "recommendation",
                id: id.to_string(),
            });
        }
        if recommendation.status != RecommendationStatus::Active {
            self.active_index
                .remove_if(&recommendation.active_key(), |_, active_id| *active_id == id);
        }
        self.recommendations.insert(id, recommendation);
        Ok(())
    }

    async fn list_recommendations(
        &self,
        filter: &RecommendationFilter,
    ) -> Result<Vec<Recommendation>> {
        let mut recs: Vec<Recommendation> = self
            .recommendations
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        recs.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        Ok(recs)
    }
}

#[async_trait]
impl AlternativeStore for MemoryRepository {
    async fn save_alternative(&self, alternative: ResourceAlternative) -> Result<()> {
        self.alternatives.insert(alternative.id, alternative);
        Ok(())
    }

    async fn alternatives_for(
        &self,
        provider: Provider,
        current_sku: &str,
    ) -> Result<Vec<ResourceAlternative>> {
        let mut alternatives: Vec<ResourceAlternative> = self
            .alternatives
            .iter()
            .filter(|e| {
                e.provider == provider && e.current_sku.eq_ignore_ascii_case(current_sku)
            })
            .map(|e| e.value().clone())
            .collect();
        alternatives.sort_by_key(|a| a.id);
        Ok(alternatives)
    }
}

#[async_trait]
impl DimensionStore for MemoryRepository {
    async fn save_dimension(&self, dimension: TradeoffDimension) -> Result<()> {
        self.dimensions.insert(dimension.id, dimension);
        Ok(())
    }

    async fn dimensions(&self) -> Result<Vec<TradeoffDimension>> {
        let mut dims: Vec<TradeoffDimension> =
            self.dimensions.iter().map(|e| e.value().clone()).collect();
        dims.sort_by_key(|d| d.id);
        Ok(dims)
    }
}

#[async_trait]
impl TradeoffScoreStore for MemoryRepository {
    async fn get_score(
        &self,
        alternative_id: u64,
        dimension_id: u32,
    ) -> Result<Option<AlternativeTradeoffScore>> {
        Ok(self
            .scores
            .get(&(alternative_id, dimension_id))
            .map(|s| s.clone()))
    }

    async fn save_score(&self, score: AlternativeTradeoffScore) -> Result<()> {
        self.scores
            .insert((score.alternative_id, score.dimension_id), score);
        Ok(())
    }
}

#[async_trait]
impl ImplementedRecommendationStore for MemoryRepository {
    async fn save_implemented(&self, item: ImplementedRecommendation) -> Result<()> {
        self.implemented.insert(item.id, item);
        Ok(())
    }

    async fn get_implemented(&self, id: Uuid) -> Result<Option<ImplementedRecommendation>> {
        Ok(self.implemented.get(&id).map(|i| i.clone()))
    }

    async fn due_for_validation(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ImplementedRecommendation>> {
        let mut due: Vec<ImplementedRecommendation> = self
            .implemented
            .iter()
            .filter(|e| {
                e.validation_status == ValidationStatus::Pending && e.scheduled_validation_at <= now
            })
            .map(|e| e.value().clone())
            .collect();
        due.sort_by_key(|i| i.scheduled_validation_at);
        Ok(due)
    }

    async fn list_implemented(
        &self,
        tenant: Option<&str>,
    ) -> Result<Vec<ImplementedRecommendation>> {
        let mut items: Vec<ImplementedRecommendation> = self
            .implemented
            .iter()
            .filter(|e| tenant.map_or(true, |t| e.tenant == t))
            .map(|e| e.value().clone())
            .collect();
        items.sort_by_key(|i| i.implemented_at);
        Ok(items)
    }
}

#[async_trait]
impl PreferencesStore for MemoryRepository {
    async fn preferences(&self, tenant: &str) -> Result<Option<TenantPreferences>> {
        Ok(self.preferences.get(tenant).map(|p| p.clone()))
    }

    async fn save_preferences(&self, preferences: TenantPreferences) -> Result<()> {
        self.preferences
            .insert(preferences.tenant.clone(), preferences);
        Ok(())
    }
}
