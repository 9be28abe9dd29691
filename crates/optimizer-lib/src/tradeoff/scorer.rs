//! Alternative comparison against a tenant's preferences

use super::dimensions::{score_dimension, sku_family, ScoringInput};
use super::{
    effective_weights, overall_score, validate_weights, AlternativeComparison, CurrentResource,
    DimensionResult, DimensionScore, RankedAlternative, ScoreDirection, TradeoffConfig,
};
use crate::error::{OptimizerError, Result};
use crate::models::{
    AlternativeTradeoffScore, DimensionKind, Provider, ResourceAlternative, ResourceMetadata,
    ResourceType, TenantPreferences, TradeoffDimension,
};
use crate::normalizer::canonical_region;
use crate::observability::OptimizerMetrics;
use crate::recommendation::validate_resource_id;
use crate::source::{CostDataSource, DataSourceRegistry};
use crate::storage::{
    AlternativeStore, DimensionStore, PreferencesStore, Repository, TradeoffScoreStore,
};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Ranks seeded alternatives for a resource
pub struct TradeoffScorer {
    sources: Arc<DataSourceRegistry>,
    repo: Arc<dyn Repository>,
    config: TradeoffConfig,
    metrics: OptimizerMetrics,
}

impl TradeoffScorer {
    pub fn new(
        sources: Arc<DataSourceRegistry>,
        repo: Arc<dyn Repository>,
        config: TradeoffConfig,
    ) -> Self {
        Self {
            sources,
            repo,
            config,
            metrics: OptimizerMetrics::new(),
        }
    }

    pub fn config(&self) -> &TradeoffConfig {
        &self.config
    }

    pub async fn compare_alternatives(
        &self,
        tenant: &str,
        provider: Provider,
        resource_id: &str,
        current_sku: &str,
        region: &str,
    ) -> Result<AlternativeComparison> {
        self.compare_alternatives_at(tenant, provider, resource_id, current_sku, region, Utc::now())
            .await
    }

    /// Score and rank every alternative seeded for `current_sku`
    pub async fn compare_alternatives_at(
        &self,
        tenant: &str,
        provider: Provider,
        resource_id: &str,
        current_sku: &str,
        region: &str,
        now: DateTime<Utc>,
    ) -> Result<AlternativeComparison> {
        validate_resource_id(resource_id)?;
        let source = self.sources.get(provider)?;
        let region = canonical_region(provider, region);

        let alternatives = self.repo.alternatives_for(provider, current_sku).await?;
        let metadata = self.metadata(source.as_ref(), tenant, resource_id).await;
        let current = CurrentResource {
            tenant: tenant.to_string(),
            provider,
            resource_id: resource_id.to_string(),
            resource_type: metadata
                .as_ref()
                .map(|m| m.resource_type)
                .or_else(|| alternatives.first().map(|a| a.resource_type))
                .unwrap_or(ResourceType::Other),
            sku: current_sku.to_string(),
            sku_family: sku_family(provider, current_sku),
            vcpu: metadata.as_ref().and_then(|m| m.vcpu),
            memory_gb: metadata.as_ref().and_then(|m| m.memory_gb),
            hourly_price: self.price(provider, current_sku, &region).await,
            monthly_cost: None,
            region,
        };
        let current = CurrentResource {
            monthly_cost: current.hourly_price.map(|h| h * self.config.hours_per_month),
            ..current
        };

        let preferences = self.preferences(tenant).await?;
        let dimensions: Vec<TradeoffDimension> = self
            .repo
            .dimensions()
            .await?
            .into_iter()
            .filter(|d| d.active)
            .collect();
        let weights = effective_weights(&dimensions, &preferences);

        let mut ranked = Vec::with_capacity(alternatives.len());
        for alternative in alternatives {
            let candidate = self
                .rank(&current, alternative, &dimensions, &weights, now)
                .await?;
            if candidate.estimated_monthly_savings >= preferences.minimum_savings_threshold {
                ranked.push(candidate);
            }
        }
        ranked.sort_by(|a, b| {
            b.overall_score
                .partial_cmp(&a.overall_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    b.estimated_monthly_savings
                        .partial_cmp(&a.estimated_monthly_savings)
                        .unwrap_or(Ordering::Equal)
                })
        });

        debug!(
            tenant = %tenant,
            resource_id = %resource_id,
            sku = %current_sku,
            alternatives = ranked.len(),
            "Alternatives ranked"
        );

        Ok(AlternativeComparison {
            current_resource: current,
            ranked_alternatives: ranked,
            preferences,
        })
    }

    async fn rank(
        &self,
        current: &CurrentResource,
        alternative: ResourceAlternative,
        dimensions: &[TradeoffDimension],
        weights: &HashMap<DimensionKind, f64>,
        now: DateTime<Utc>,
    ) -> Result<RankedAlternative> {
        let hourly_price = self
            .price(
                alternative.alternative_provider,
                &alternative.alternative_sku,
                &current.region,
            )
            .await;
        let monthly_cost = hourly_price.map(|h| h * self.config.hours_per_month);
        let estimated_monthly_savings = match (current.monthly_cost, monthly_cost) {
            (Some(c), Some(a)) => ((c - a) * 100.0).round() / 100.0,
            _ => 0.0,
        };

        let input = ScoringInput {
            current,
            alternative: &alternative,
            alternative_hourly: hourly_price,
            config: &self.config,
        };

        let mut results = Vec::with_capacity(dimensions.len());
        for dimension in dimensions {
            let score = self.memoized_score(dimension, &input, now).await?;
            results.push(DimensionResult {
                dimension: dimension.kind,
                weight: weights.get(&dimension.kind).copied().unwrap_or(0.0),
                direction: ScoreDirection::classify(
                    score.score,
                    dimension.higher_is_better,
                    &self.config,
                ),
                score,
            });
        }

        let weighted: Vec<(f64, f64)> = results.iter().map(|r| (r.score.score, r.weight)).collect();
        Ok(RankedAlternative {
            overall_score: overall_score(&weighted),
            alternative,
            hourly_price,
            monthly_cost,
            estimated_monthly_savings,
            dimensions: results,
        })
    }

    /// Fresh stored score for the same inputs, or compute and store one
    /// with non-zero confidence
    async fn memoized_score(
        &self,
        dimension: &TradeoffDimension,
        input: &ScoringInput<'_>,
        now: DateTime<Utc>,
    ) -> Result<DimensionScore> {
        let alternative_id = input.alternative.id;
        let ttl = Duration::hours(self.config.score_cache_ttl_hours);
        let inputs = input.fingerprint();

        if let Some(stored) = self.repo.get_score(alternative_id, dimension.id).await? {
            if stored.inputs == inputs && now - stored.last_updated < ttl {
                return Ok(DimensionScore {
                    score: stored.score,
                    explanation: stored.explanation,
                    current_value: stored.current_value,
                    alternative_value: stored.alternative_value,
                    confidence: stored.confidence,
                });
            }
        }

        let score = score_dimension(dimension.kind, input);
        if score.confidence > 0.0 {
            self.repo
                .save_score(AlternativeTradeoffScore {
                    alternative_id,
                    dimension_id: dimension.id,
                    score: score.score,
                    explanation: score.explanation.clone(),
                    current_value: score.current_value.clone(),
                    alternative_value: score.alternative_value.clone(),
                    confidence: score.confidence,
                    inputs,
                    last_updated: now,
                })
                .await?;
        }
        Ok(score)
    }

    /// Hourly price, or `None` if the provider or price is unavailable
    async fn price(&self, provider: Provider, sku: &str, region: &str) -> Option<f64> {
        let source = self.sources.get(provider).ok()?;
        match source.get_sku_pricing(sku, region).await {
            Ok(price) => price,
            Err(e) => {
                self.metrics.inc_upstream_errors("pricing");
                warn!(provider = %provider, sku = %sku, error = %e, "Pricing lookup failed");
                None
            }
        }
    }

    async fn metadata(
        &self,
        source: &dyn CostDataSource,
        tenant: &str,
        resource_id: &str,
    ) -> Option<ResourceMetadata> {
        match source.fetch_resource_metadata(tenant, resource_id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                self.metrics.inc_upstream_errors("metadata");
                warn!(resource_id = %resource_id, error = %e, "Metadata lookup failed");
                None
            }
        }
    }

    /// Stored preferences, or defaults when the tenant has none
    pub async fn preferences(&self, tenant: &str) -> Result<TenantPreferences> {
        Ok(self
            .repo
            .preferences(tenant)
            .await?
            .unwrap_or_else(|| TenantPreferences::new(tenant)))
    }

    /// Validate and store tenant preferences
    ///
    /// An empty weight map means "use the dimension defaults".
    pub async fn update_preferences(
        &self,
        mut preferences: TenantPreferences,
    ) -> Result<TenantPreferences> {
        if !preferences.dimension_weights.is_empty() {
            validate_weights(&preferences.dimension_weights)?;
        }
        let threshold = preferences.minimum_savings_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(OptimizerError::InvalidWeights(format!(
                "minimum savings threshold must be non-negative, got {}",
                threshold
            )));
        }

        preferences.updated_at = Utc::now();
        self.repo.save_preferences(preferences.clone()).await?;
        info!(tenant = %preferences.tenant, "Tenant preferences updated");
        Ok(preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlternativeCategory;
    use crate::source::StaticCostDataSource;
    use crate::storage::MemoryRepository;

    fn alternative(
        id: u64,
        provider: Provider,
        sku: &str,
        vcpu: u32,
        memory_gb: f64,
    ) -> ResourceAlternative {
        ResourceAlternative {
            id,
            provider: Provider::Aws,
            resource_type: ResourceType::Compute,
            current_sku: "m5.xlarge".to_string(),
            alternative_sku: sku.to_string(),
            alternative_provider: provider,
            vcpu,
            memory_gb,
            sku_family: String::new(),
            category: if provider == Provider::Aws {
                AlternativeCategory::Downsize
            } else {
                AlternativeCategory::CrossCloud
            },
        }
    }

    async fn setup() -> (TradeoffScorer, Arc<MemoryRepository>, Arc<StaticCostDataSource>) {
        let mut aws = StaticCostDataSource::empty(Provider::Aws);
        aws.add_price("m5.xlarge", "us-east-1", 0.192);
        aws.add_price("m5.large", "us-east-1", 0.096);
        aws.add_price("t3.large", "us-east-1", 0.0832);
        aws.add_price("m5.xlarge", "eu-north-1", 0.2);
        aws.add_price("m5.large", "eu-north-1", 0.1375);
        aws.add_metadata(
            "acme",
            ResourceMetadata {
                resource_id: "i-1".to_string(),
                name: "api".to_string(),
                resource_type: ResourceType::Compute,
                sku: "m5.xlarge".to_string(),
                region: "us-east-1".to_string(),
                vcpu: Some(4),
                memory_gb: Some(16.0),
                storage_gb: None,
                tags: HashMap::new(),
                status: "running".to_string(),
            },
        );
        let mut gcp = StaticCostDataSource::empty(Provider::Gcp);
        gcp.add_price("n2-standard-2", "us-east", 0.097);

        let aws = Arc::new(aws);
        let registry = Arc::new(DataSourceRegistry::new());
        registry.register(aws.clone());
        registry.register(Arc::new(gcp));

        let repo = Arc::new(MemoryRepository::new());
        repo.save_alternative(alternative(1, Provider::Aws, "m5.large", 2, 8.0)).await.unwrap();
        repo.save_alternative(alternative(2, Provider::Aws, "t3.large", 2, 8.0)).await.unwrap();
        repo.save_alternative(alternative(3, Provider::Gcp, "n2-standard-2", 2, 8.0)).await.unwrap();

        let scorer = TradeoffScorer::new(registry, repo.clone(), TradeoffConfig::default());
        (scorer, repo, aws)
    }

    #[tokio::test]
    async fn test_ranks_alternatives() {
        let (scorer, _, _) = setup().await;
        let comparison = scorer
            .compare_alternatives("acme", Provider::Aws, "i-1", "m5.xlarge", "us-east-1")
            .await
            .unwrap();

        assert_eq!(comparison.current_resource.region, "us-east");
        assert_eq!(comparison.current_resource.vcpu, Some(4));
        assert_eq!(comparison.ranked_alternatives.len(), 3);
        assert_eq!(comparison.ranked_alternatives[0].alternative.alternative_sku, "m5.large");

        let scores: Vec<f64> = comparison
            .ranked_alternatives
            .iter()
            .map(|a| a.overall_score)
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));

        let top = &comparison.ranked_alternatives[0];
        assert_eq!(top.dimensions.len(), 6);
        assert!((top.estimated_monthly_savings - 70.08).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_minimum_savings_threshold_filters() {
        let (scorer, _, _) = setup().await;
        let mut prefs = TenantPreferences::new("acme");
        prefs.minimum_savings_threshold = 75.0;
        scorer.update_preferences(prefs).await.unwrap();

        let comparison = scorer
            .compare_alternatives("acme", Provider::Aws, "i-1", "m5.xlarge", "us-east-1")
            .await
            .unwrap();
        let skus: Vec<&str> = comparison
            .ranked_alternatives
            .iter()
            .map(|a| a.alternative.alternative_sku.as_str())
            .collect();
        assert_eq!(skus, vec!["t3.large"]);
        assert_eq!(comparison.preferences.minimum_savings_threshold, 75.0);
    }

    #[tokio::test]
    async fn test_default_weights_accepted() {
        let (scorer, _, _) = setup().await;
        let mut prefs = TenantPreferences::new("acme");
        prefs.dimension_weights = HashMap::from([
            (DimensionKind::Cost, 0.35),
            (DimensionKind::Performance, 0.25),
            (DimensionKind::Availability, 0.15),
            (DimensionKind::MigrationEffort, 0.15),
            (DimensionKind::VendorLockIn, 0.05),
            (DimensionKind::EnvironmentalImpact, 0.05),
        ]);
        let stored = scorer.update_preferences(prefs.clone()).await.unwrap();
        assert_eq!(stored.dimension_weights, prefs.dimension_weights);

        prefs.dimension_weights.remove(&DimensionKind::Cost);
        let err = scorer.update_preferences(prefs).await.unwrap_err();
        assert!(matches!(err, OptimizerError::InvalidWeights(_)));
    }

    #[tokio::test]
    async fn test_zero_weight_removes_dimension() {
        let (scorer, _, _) = setup().await;
        let mut prefs = TenantPreferences::new("acme");
        prefs.dimension_weights = DimensionKind::ALL
            .iter()
            .map(|k| (*k, if *k == DimensionKind::Performance { 1.0 } else { 0.0 }))
            .collect();
        scorer.update_preferences(prefs).await.unwrap();

        let comparison = scorer
            .compare_alternatives("acme", Provider::Aws, "i-1", "m5.xlarge", "us-east-1")
            .await
            .unwrap();
        for ranked in &comparison.ranked_alternatives {
            let performance = ranked
                .dimensions
                .iter()
                .find(|d| d.dimension == DimensionKind::Performance)
                .unwrap();
            assert!((ranked.overall_score - performance.score.score).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_pricing_outage_degrades_to_unknown() {
        let (scorer, repo, aws) = setup().await;
        aws.set_available(false);

        let comparison = scorer
            .compare_alternatives("acme", Provider::Aws, "i-1", "m5.xlarge", "us-east-1")
            .await
            .unwrap();
        assert_eq!(comparison.ranked_alternatives.len(), 3);
        for ranked in &comparison.ranked_alternatives {
            assert_eq!(ranked.estimated_monthly_savings, 0.0);
            let cost = &ranked.dimensions[0];
            assert_eq!(cost.dimension, DimensionKind::Cost);
            assert_eq!(cost.score.score, 0.5);
            assert_eq!(cost.score.confidence, 0.0);
        }
        // Unknown scores are never memoized
        assert!(repo.get_score(1, 1).await.unwrap().is_none());
        assert!(repo.get_score(1, 3).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_scores_memoized_within_ttl() {
        let (scorer, repo, _) = setup().await;
        let now = Utc::now();
        scorer
            .compare_alternatives_at("acme", Provider::Aws, "i-1", "m5.xlarge", "us-east-1", now)
            .await
            .unwrap();

        let stored = repo.get_score(1, 1).await.unwrap().unwrap();
        assert_eq!(stored.last_updated, now);

        scorer
            .compare_alternatives_at(
                "acme",
                Provider::Aws,
                "i-1",
                "m5.xlarge",
                "us-east-1",
                now + Duration::hours(1),
            )
            .await
            .unwrap();
        assert_eq!(repo.get_score(1, 1).await.unwrap().unwrap().last_updated, now);

        let later = now + Duration::hours(25);
        scorer
            .compare_alternatives_at("acme", Provider::Aws, "i-1", "m5.xlarge", "us-east-1", later)
            .await
            .unwrap();
        assert_eq!(repo.get_score(1, 1).await.unwrap().unwrap().last_updated, later);
    }

    #[tokio::test]
    async fn test_memoized_scores_not_shared_across_regions() {
        let (scorer, _, _) = setup().await;
        let now = Utc::now();
        let us = scorer
            .compare_alternatives_at("acme", Provider::Aws, "i-1", "m5.xlarge", "us-east-1", now)
            .await
            .unwrap();

        let eu = scorer
            .compare_alternatives_at(
                "acme",
                Provider::Aws,
                "i-1",
                "m5.xlarge",
                "eu-north-1",
                now + Duration::minutes(5),
            )
            .await
            .unwrap();

        let score = |comparison: &AlternativeComparison, kind: DimensionKind| {
            comparison
                .ranked_alternatives
                .iter()
                .find(|a| a.alternative.alternative_sku == "m5.large")
                .and_then(|a| a.dimensions.iter().find(|d| d.dimension == kind))
                .map(|d| d.score.score)
                .unwrap()
        };
        assert!((score(&us, DimensionKind::Cost) - 0.75).abs() < 1e-9);
        assert!((score(&eu, DimensionKind::Cost) - 0.65625).abs() < 1e-9);
        assert!((score(&us, DimensionKind::EnvironmentalImpact) - 0.65).abs() < 1e-9);
        assert!((score(&eu, DimensionKind::EnvironmentalImpact) - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let (scorer, _, _) = setup().await;
        let err = scorer
            .compare_alternatives("acme", Provider::Azure, "vm-1", "Standard_D4s_v3", "eastus")
            .await
            .unwrap_err();
        assert!(matches!(err, OptimizerError::UnknownProvider(_)));
    }
}
