//! Cost analysis and recommendation pipeline
//!
//! This crate provides the core functionality for:
//! - Normalizing provider cost records into a canonical schema
//! - Cost forecasting and anomaly detection
//! - Utilization classification and rightsizing
//! - Deduplicated recommendation generation
//! - Multi-dimension ranking of alternative SKUs
//! - Validation of realized savings
//! - Health checks and observability

pub mod error;
pub mod forecast;
pub mod health;
pub mod ingest;
pub mod models;
pub mod normalizer;
pub mod observability;
pub mod recommendation;
pub mod source;
pub mod storage;
pub mod tradeoff;
pub mod utilization;
pub mod validation;

pub use error::{OptimizerError, Result};
pub use forecast::{ForecastConfig, ForecastEngine, ForecastResult};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use ingest::{CostIngestor, IngestSummary};
pub use models::*;
pub use observability::{OptimizerMetrics, StructuredLogger};
pub use recommendation::{
    AnalysisRequest, AnalysisResult, AnalysisStatus, RecommendationConfig, RecommendationEngine,
};
pub use source::{CostDataSource, DataSourceRegistry, Dataset, StaticCostDataSource};
pub use storage::{MemoryRepository, Repository};
pub use tradeoff::{AlternativeComparison, TradeoffConfig, TradeoffScorer};
pub use utilization::{ClassifierConfig, UtilizationClassifier, UtilizationState};
pub use validation::{SavingsValidator, ValidationConfig, ValidationRunSummary, ValidationScheduler};
