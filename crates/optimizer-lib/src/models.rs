//! Core data models for the cost optimizer

use crate::error::OptimizerError;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Days between implementation and scheduled savings validation
pub const VALIDATION_DELAY_DAYS: i64 = 30;

/// Cloud provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Azure,
    Gcp,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
            Provider::Gcp => "gcp",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" | "amazon" => Ok(Provider::Aws),
            "azure" | "microsoft" => Ok(Provider::Azure),
            "gcp" | "google" => Ok(Provider::Gcp),
            other => Err(OptimizerError::UnknownProvider(other.to_string())),
        }
    }
}

/// Broad resource category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Compute,
    Database,
    Storage,
    Container,
    Serverless,
    Network,
    Other,
}

impl ResourceType {
    /// Resource types whose sizing can be adjusted
    pub fn is_optimizable(&self) -> bool {
        matches!(
            self,
            ResourceType::Compute | ResourceType::Database | ResourceType::Container
        )
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceType::Compute => "compute",
            ResourceType::Database => "database",
            ResourceType::Storage => "storage",
            ResourceType::Container => "container",
            ResourceType::Serverless => "serverless",
            ResourceType::Network => "network",
            ResourceType::Other => "other",
        };
        f.write_str(s)
    }
}

/// One day of cost and utilization for a single resource
///
/// Append-only; identified by (tenant, provider, resource_id, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub tenant: String,
    pub provider: Provider,
    pub resource_type: ResourceType,
    pub resource_id: String,
    pub resource_name: String,
    pub sku: String,
    #[serde(default)]
    pub vcpu: Option<u32>,
    #[serde(default)]
    pub memory_gb: Option<f64>,
    #[serde(default)]
    pub storage_gb: Option<f64>,
    #[serde(default)]
    pub avg_cpu_utilization: Option<f64>,
    #[serde(default)]
    pub avg_memory_utilization: Option<f64>,
    pub region: String,
    pub daily_cost: f64,
    pub date: NaiveDate,
    #[serde(default = "Utc::now")]
    pub ingested_at: DateTime<Utc>,
}

impl CostRecord {
    pub fn key(&self) -> CostRecordKey {
        CostRecordKey {
            tenant: self.tenant.clone(),
            provider: self.provider,
            resource_id: self.resource_id.clone(),
            date: self.date,
        }
    }
}

/// Unique identity of a cost record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CostRecordKey {
    pub tenant: String,
    pub provider: Provider,
    pub resource_id: String,
    pub date: NaiveDate,
}

/// Projection of a cost record used by forecasting and classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub cost: f64,
    pub cpu_utilization: Option<f64>,
    pub memory_utilization: Option<f64>,
}

/// Aggregate cost summary for a resource over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResourceCost {
    pub tenant: String,
    pub provider: Provider,
    pub resource_id: String,
    pub resource_name: String,
    pub resource_type: ResourceType,
    pub sku: String,
    pub canonical_region: String,
    pub vcpu: Option<u32>,
    pub memory_gb: Option<f64>,
    pub storage_gb: Option<f64>,
    pub total_cost: f64,
    pub avg_daily_cost: f64,
    pub avg_cpu_utilization: Option<f64>,
    pub avg_memory_utilization: Option<f64>,
    pub data_point_count: usize,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

impl NormalizedResourceCost {
    pub fn monthly_cost(&self) -> f64 {
        self.avg_daily_cost * 30.0
    }
}

/// Action proposed by a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationAction {
    DeleteResource,
    DownsizeInstance,
    UpsizeInstance,
    ChangeRegion,
    PurchaseReservation,
    ScheduleShutdown,
    ReviewSizing,
}

impl RecommendationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationAction::DeleteResource => "DELETE_RESOURCE",
            RecommendationAction::DownsizeInstance => "DOWNSIZE_INSTANCE",
            RecommendationAction::UpsizeInstance => "UPSIZE_INSTANCE",
            RecommendationAction::ChangeRegion => "CHANGE_REGION",
            RecommendationAction::PurchaseReservation => "PURCHASE_RESERVATION",
            RecommendationAction::ScheduleShutdown => "SCHEDULE_SHUTDOWN",
            RecommendationAction::ReviewSizing => "REVIEW_SIZING",
        }
    }

    /// Static risk associated with carrying out the action
    pub fn risk_level(&self) -> RiskLevel {
        match self {
            RecommendationAction::DeleteResource => RiskLevel::High,
            RecommendationAction::DownsizeInstance
            | RecommendationAction::UpsizeInstance
            | RecommendationAction::ChangeRegion => RiskLevel::Medium,
            RecommendationAction::PurchaseReservation
            | RecommendationAction::ScheduleShutdown
            | RecommendationAction::ReviewSizing => RiskLevel::Low,
        }
    }

    /// Deleted resources stop reporting cost data entirely
    pub fn is_deletion(&self) -> bool {
        matches!(self, RecommendationAction::DeleteResource)
    }
}

impl fmt::Display for RecommendationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationStatus {
    Active,
    Implemented,
    Dismissed,
    Expired,
    Validating,
}

impl fmt::Display for RecommendationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationStatus::Active => write!(f, "ACTIVE"),
            RecommendationStatus::Implemented => write!(f, "IMPLEMENTED"),
            RecommendationStatus::Dismissed => write!(f, "DISMISSED"),
            RecommendationStatus::Expired => write!(f, "EXPIRED"),
            RecommendationStatus::Validating => write!(f, "VALIDATING"),
        }
    }
}

/// Actionable cost-optimization recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub tenant: String,
    pub provider: Provider,
    pub resource_id: String,
    pub resource_name: String,
    pub resource_type: ResourceType,
    pub action: RecommendationAction,
    pub summary: String,
    pub details: String,
    pub current_config: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_config: Option<serde_json::Value>,
    pub estimated_monthly_savings: f64,
    pub savings_percentage: f64,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub status: RecommendationStatus,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Recommendation {
    pub fn active_key(&self) -> ActiveRecommendationKey {
        ActiveRecommendationKey {
            tenant: self.tenant.clone(),
            provider: self.provider,
            resource_id: self.resource_id.clone(),
            action: self.action,
        }
    }
}

/// Key under which at most one ACTIVE recommendation may exist
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActiveRecommendationKey {
    pub tenant: String,
    pub provider: Provider,
    pub resource_id: String,
    pub action: RecommendationAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlternativeCategory {
    Downsize,
    Upsize,
    DifferentFamily,
    CrossCloud,
}

/// Seeded mapping from a current SKU to a candidate SKU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAlternative {
    pub id: u64,
    pub provider: Provider,
    pub resource_type: ResourceType,
    pub current_sku: String,
    pub alternative_sku: String,
    pub alternative_provider: Provider,
    pub vcpu: u32,
    pub memory_gb: f64,
    pub sku_family: String,
    pub category: AlternativeCategory,
}

impl ResourceAlternative {
    pub fn is_cross_cloud(&self) -> bool {
        self.alternative_provider != self.provider
            || self.category == AlternativeCategory::CrossCloud
    }
}

/// Independent axis along which alternatives are scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    Cost,
    Performance,
    Availability,
    MigrationEffort,
    VendorLockIn,
    EnvironmentalImpact,
}

impl DimensionKind {
    pub const ALL: [DimensionKind; 6] = [
        DimensionKind::Cost,
        DimensionKind::Performance,
        DimensionKind::Availability,
        DimensionKind::MigrationEffort,
        DimensionKind::VendorLockIn,
        DimensionKind::EnvironmentalImpact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionKind::Cost => "cost",
            DimensionKind::Performance => "performance",
            DimensionKind::Availability => "availability",
            DimensionKind::MigrationEffort => "migration_effort",
            DimensionKind::VendorLockIn => "vendor_lock_in",
            DimensionKind::EnvironmentalImpact => "environmental_impact",
        }
    }
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeoffDimension {
    pub id: u32,
    pub kind: DimensionKind,
    pub name: String,
    pub default_weight: f64,
    pub higher_is_better: bool,
    pub active: bool,
}

impl TradeoffDimension {
    /// Seeded dimension set; default weights sum to 1.0
    pub fn defaults() -> Vec<TradeoffDimension> {
        let weights = [0.35, 0.25, 0.15, 0.15, 0.05, 0.05];
        DimensionKind::ALL
            .iter()
            .zip(weights)
            .enumerate()
            .map(|(i, (kind, weight))| TradeoffDimension {
                id: i as u32 + 1,
                kind: *kind,
                name: kind.as_str().to_string(),
                default_weight: weight,
                higher_is_better: true,
                active: true,
            })
            .collect()
    }
}

/// Memoized output of a dimension scorer for one alternative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeTradeoffScore {
    pub alternative_id: u64,
    pub dimension_id: u32,
    pub score: f64,
    pub explanation: String,
    pub current_value: String,
    pub alternative_value: String,
    pub confidence: f64,
    /// Scoring inputs the score is valid for
    #[serde(default)]
    pub inputs: String,
    pub last_updated: DateTime<Utc>,
}

/// Per-tenant ranking preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantPreferences {
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub dimension_weights: HashMap<DimensionKind, f64>,
    #[serde(default)]
    pub minimum_savings_threshold: f64,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl TenantPreferences {
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            dimension_weights: HashMap::new(),
            minimum_savings_threshold: 0.0,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Pending,
    Validated,
    Partial,
    Failed,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStatus::Pending => write!(f, "PENDING"),
            ValidationStatus::Validated => write!(f, "VALIDATED"),
            ValidationStatus::Partial => write!(f, "PARTIAL"),
            ValidationStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Record of a recommendation that was acted upon, awaiting savings validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementedRecommendation {
    pub id: Uuid,
    pub recommendation_id: Uuid,
    pub tenant: String,
    pub resource_id: String,
    pub provider: Provider,
    pub resource_type: ResourceType,
    pub action: RecommendationAction,
    pub implemented_at: DateTime<Utc>,
    pub expected_monthly_savings: f64,
    pub actual_monthly_savings: Option<f64>,
    pub cost_before_daily: Option<f64>,
    pub cost_after_daily: Option<f64>,
    pub scheduled_validation_at: DateTime<Utc>,
    pub validation_status: ValidationStatus,
    pub validated_at: Option<DateTime<Utc>>,
    pub validation_note: Option<String>,
}

impl ImplementedRecommendation {
    /// Create a pending record for a recommendation implemented at `implemented_at`
    pub fn from_recommendation(rec: &Recommendation, implemented_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            recommendation_id: rec.id,
            tenant: rec.tenant.clone(),
            resource_id: rec.resource_id.clone(),
            provider: rec.provider,
            resource_type: rec.resource_type,
            action: rec.action,
            implemented_at,
            expected_monthly_savings: rec.estimated_monthly_savings,
            actual_monthly_savings: None,
            cost_before_daily: None,
            cost_after_daily: None,
            scheduled_validation_at: implemented_at + Duration::days(VALIDATION_DELAY_DAYS),
            validation_status: ValidationStatus::Pending,
            validated_at: None,
            validation_note: None,
        }
    }
}

/// Resource description returned by a provider adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub resource_id: String,
    pub name: String,
    pub resource_type: ResourceType,
    pub sku: String,
    pub region: String,
    #[serde(default)]
    pub vcpu: Option<u32>,
    #[serde(default)]
    pub memory_gb: Option<f64>,
    #[serde(default)]
    pub storage_gb: Option<f64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default = "default_resource_status")]
    pub status: String,
}

fn default_resource_status() -> String {
    "running".to_string()
}

/// Aggregated utilization reported by a provider adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtilizationMetrics {
    pub resource_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub avg_cpu: Option<f64>,
    pub max_cpu: Option<f64>,
    pub avg_memory: Option<f64>,
    pub max_memory: Option<f64>,
}

/// Configuration observed client-side for a resource without cost history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedConfig {
    #[serde(default)]
    pub resource_name: Option<String>,
    pub resource_type: ResourceType,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub vcpu: Option<u32>,
    #[serde(default)]
    pub memory_gb: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("AWS".parse::<Provider>().unwrap(), Provider::Aws);
        assert_eq!(" google ".parse::<Provider>().unwrap(), Provider::Gcp);
        assert!(matches!(
            "oracle".parse::<Provider>(),
            Err(OptimizerError::UnknownProvider(p)) if p == "oracle"
        ));
    }

    #[test]
    fn test_action_risk_levels() {
        assert_eq!(RecommendationAction::DeleteResource.risk_level(), RiskLevel::High);
        assert_eq!(RecommendationAction::DownsizeInstance.risk_level(), RiskLevel::Medium);
        assert_eq!(RecommendationAction::UpsizeInstance.risk_level(), RiskLevel::Medium);
        assert_eq!(RecommendationAction::ChangeRegion.risk_level(), RiskLevel::Medium);
        assert_eq!(RecommendationAction::PurchaseReservation.risk_level(), RiskLevel::Low);
        assert_eq!(RecommendationAction::ScheduleShutdown.risk_level(), RiskLevel::Low);
    }

    #[test]
    fn test_default_dimension_weights_sum_to_one() {
        let dims = TradeoffDimension::defaults();
        assert_eq!(dims.len(), 6);
        let total: f64 = dims.iter().map(|d| d.default_weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_action_serde_format() {
        let json = serde_json::to_string(&RecommendationAction::DownsizeInstance).unwrap();
        assert_eq!(json, "\"DOWNSIZE_INSTANCE\"");
        let kind: DimensionKind = serde_json::from_str("\"vendor_lock_in\"").unwrap();
        assert_eq!(kind, DimensionKind::VendorLockIn);
    }
}
