//! Error taxonomy for the optimizer pipeline
//!
//! Data-related conditions (too few samples, validation not yet due) are
//! modelled as result values, not errors. Only conditions the caller must
//! act on surface here.

use crate::models::RecommendationStatus;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by optimizer components
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// No cost data source is registered for the provider
    #[error("no cost data source registered for provider '{0}'")]
    UnknownProvider(String),

    /// Resource identifier is empty or contains whitespace/control characters
    #[error("malformed resource id: {0:?}")]
    MalformedResourceId(String),

    /// Pricing, metadata, or metrics fetch failed
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Tenant dimension weights rejected at write time
    #[error("invalid dimension weights: {0}")]
    InvalidWeights(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("recommendation {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: RecommendationStatus,
        to: RecommendationStatus,
    },

    #[error("storage error: {0}")]
    Storage(String),

    /// External forecast backend failure (always recovered by the statistical model)
    #[error("forecast backend error: {0}")]
    Forecast(String),
}

impl OptimizerError {
    /// True for errors caused by the caller's input rather than infrastructure
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            OptimizerError::UnknownProvider(_)
                | OptimizerError::MalformedResourceId(_)
                | OptimizerError::InvalidWeights(_)
                | OptimizerError::InvalidTransition { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, OptimizerError>;
