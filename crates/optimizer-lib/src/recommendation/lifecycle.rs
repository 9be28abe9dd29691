//! Status transitions for persisted recommendations

use super::RecommendationEngine;
use crate::error::{OptimizerError, Result};
use crate::models::{ImplementedRecommendation, Recommendation, RecommendationStatus};
use crate::storage::{ImplementedRecommendationStore, RecommendationFilter, RecommendationStore};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

impl RecommendationEngine {
    /// Mark an ACTIVE recommendation implemented and schedule its validation
    pub async fn implement_recommendation(
        &self,
        id: Uuid,
        implemented_at: DateTime<Utc>,
    ) -> Result<ImplementedRecommendation> {
        let rec = self
            .transition(id, RecommendationStatus::Implemented)
            .await?;

        let implemented = ImplementedRecommendation::from_recommendation(&rec, implemented_at);
        self.repo.save_implemented(implemented.clone()).await?;

        info!(
            recommendation_id = %id,
            resource_id = %rec.resource_id,
            action = %rec.action,
            validation_at = %implemented.scheduled_validation_at,
            "Recommendation implemented"
        );
        Ok(implemented)
    }

    pub async fn dismiss_recommendation(&self, id: Uuid) -> Result<Recommendation> {
        let rec = self.transition(id, RecommendationStatus::Dismissed).await?;
        info!(recommendation_id = %id, resource_id = %rec.resource_id, "Recommendation dismissed");
        Ok(rec)
    }

    /// Expire every ACTIVE recommendation past its expiry time
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> Result<usize> {
        let active = self
            .repo
            .list_recommendations(&RecommendationFilter {
                status: Some(RecommendationStatus::Active),
                ..Default::default()
            })
            .await?;

        let mut expired = 0;
        for mut rec in active.into_iter().filter(|r| r.expires_at <= now) {
            rec.status = RecommendationStatus::Expired;
            self.repo.save_recommendation(rec).await?;
            expired += 1;
        }
        if expired > 0 {
            info!(expired, "Expired stale recommendations");
        }
        Ok(expired)
    }

    pub async fn list_recommendations(
        &self,
        filter: &RecommendationFilter,
    ) -> Result<Vec<Recommendation>> {
        self.repo.list_recommendations(filter).await
    }

    /// Only ACTIVE recommendations may change status
    async fn transition(&self, id: Uuid, to: RecommendationStatus) -> Result<Recommendation> {
        let mut rec = self
            .repo
            .get_recommendation(id)
            .await?
            .ok_or_else(|| OptimizerError::NotFound {
                entity: "recommendation",
                id: id.to_string(),
            })?;

        if rec.status != RecommendationStatus::Active {
            return Err(OptimizerError::InvalidTransition {
                id,
                from: rec.status,
                to,
            });
        }

        rec.status = to;
        self.repo.save_recommendation(rec.clone()).await?;
        self.cache
            .invalidate(&rec.tenant, rec.provider, &rec.resource_id);
        Ok(rec)
    }
}
