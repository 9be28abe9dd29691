//! Daily savings validation job

use super::{evaluate, ValidationConfig, ValidationRunSummary, ValidationWindows};
use crate::error::{OptimizerError, Result};
use crate::ingest::CostIngestor;
use crate::models::{ImplementedRecommendation, ValidationStatus};
use crate::observability::{OptimizerMetrics, StructuredLogger};
use crate::source::DataSourceRegistry;
use crate::storage::{CostRecordStore, ImplementedRecommendationStore, Repository};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Validates implemented recommendations whose validation date has passed
pub struct SavingsValidator {
    repo: Arc<dyn Repository>,
    ingestor: CostIngestor,
    config: ValidationConfig,
    logger: StructuredLogger,
    metrics: OptimizerMetrics,
}

impl SavingsValidator {
    pub fn new(
        sources: Arc<DataSourceRegistry>,
        repo: Arc<dyn Repository>,
        config: ValidationConfig,
    ) -> Self {
        Self {
            ingestor: CostIngestor::new(sources, Arc::clone(&repo)),
            repo,
            config,
            logger: StructuredLogger::new("savings-validator"),
            metrics: OptimizerMetrics::new(),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub async fn run_daily_validation(&self) -> Result<ValidationRunSummary> {
        self.run_at(Utc::now()).await
    }

    /// Validate every PENDING item due at `now`
    ///
    /// Items are processed one at a time and saved individually; a failing
    /// item is counted and skipped.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<ValidationRunSummary> {
        let due = self.repo.due_for_validation(now).await?;
        let mut summary = ValidationRunSummary {
            candidates: due.len(),
            ..Default::default()
        };

        for item in due {
            let id = item.id;
            match self.validate_item(item, now).await {
                Ok(status) => summary.record(status),
                Err(e) => {
                    summary.errors += 1;
                    self.metrics.inc_validation_errors();
                    warn!(implemented_id = %id, error = %e, "Savings validation failed for item");
                }
            }
        }

        info!(
            candidates = summary.candidates,
            validated = summary.validated,
            partial = summary.partial,
            failed = summary.failed,
            deferred = summary.deferred,
            errors = summary.errors,
            "Savings validation run completed"
        );
        Ok(summary)
    }

    /// Returns `Pending` when the item was deferred
    async fn validate_item(
        &self,
        mut item: ImplementedRecommendation,
        now: DateTime<Utc>,
    ) -> Result<ValidationStatus> {
        let windows = ValidationWindows::new(
            item.implemented_at.date_naive(),
            now.date_naive(),
            &self.config,
        );
        if windows.after_days() < self.config.min_after_days {
            debug!(
                implemented_id = %item.id,
                after_days = windows.after_days(),
                "Not enough post-implementation data, deferring"
            );
            return Ok(ValidationStatus::Pending);
        }

        self.refresh(&item, &windows).await?;
        let before = self
            .daily_costs(&item, windows.before_start, windows.before_end)
            .await?;
        let after = self
            .daily_costs(&item, windows.after_start, windows.after_end)
            .await?;

        let evaluation = evaluate(
            item.action,
            item.expected_monthly_savings,
            &before,
            &after,
            &self.config,
        );

        item.validation_status = evaluation.status;
        item.cost_before_daily = evaluation.cost_before_daily;
        item.cost_after_daily = evaluation.cost_after_daily;
        item.actual_monthly_savings = evaluation.actual_monthly_savings;
        item.validated_at = Some(now);
        item.validation_note = Some(evaluation.note);

        self.metrics.inc_validations(item.validation_status);
        self.logger.log_validation(
            &item.tenant,
            &item.resource_id,
            item.validation_status,
            item.expected_monthly_savings,
            item.actual_monthly_savings,
        );

        let status = item.validation_status;
        self.repo.save_implemented(item).await?;
        Ok(status)
    }

    /// Pull both windows from the provider; stored data is used if that fails
    async fn refresh(
        &self,
        item: &ImplementedRecommendation,
        windows: &ValidationWindows,
    ) -> Result<()> {
        match self
            .ingestor
            .ingest(
                &item.tenant,
                item.provider,
                &item.resource_id,
                windows.before_start,
                windows.after_end,
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(e @ OptimizerError::Storage(_)) => Err(e),
            Err(e) => {
                debug!(resource_id = %item.resource_id, error = %e, "Cost refresh skipped");
                Ok(())
            }
        }
    }

    async fn daily_costs(
        &self,
        item: &ImplementedRecommendation,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<f64>> {
        if end < start {
            return Ok(Vec::new());
        }
        Ok(self
            .repo
            .cost_records(&item.tenant, item.provider, &item.resource_id, start, end)
            .await?
            .into_iter()
            .map(|r| r.daily_cost)
            .collect())
    }
}
