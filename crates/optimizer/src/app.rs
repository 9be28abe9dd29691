//! Component wiring shared by the binary and integration tests

use crate::api::AppState;
use crate::config::OptimizerConfig;
use anyhow::{Context, Result};
use optimizer_lib::{
    forecast::{ForecastBackend, OnnxForecastBackend, MODEL_STATISTICAL},
    health::{Component, HealthRegistry},
    DataSourceRegistry, Dataset, ForecastEngine, MemoryRepository, RecommendationEngine,
    Repository, SavingsValidator, StructuredLogger, TradeoffScorer, UtilizationClassifier,
    ValidationScheduler,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// How often expired recommendations and cached analyses are swept
pub const EXPIRY_INTERVAL: Duration = Duration::from_secs(3600);

/// Fully wired optimizer components
pub struct Services {
    pub state: Arc<AppState>,
    pub scheduler: Arc<ValidationScheduler>,
    pub logger: StructuredLogger,
    /// Name of the forecast model in use
    pub forecast_model: String,
}

/// Build every component from configuration
///
/// The dataset, when given, seeds the data sources and stores. Without
/// one the service starts with no providers and reports `data_sources`
/// as degraded.
pub async fn build(config: &OptimizerConfig, dataset: Option<&Dataset>) -> Result<Services> {
    let health = HealthRegistry::new();
    health.register_all().await;

    let logger = StructuredLogger::new(&config.instance);
    let sources = Arc::new(DataSourceRegistry::new());
    let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());

    if let Some(dataset) = dataset {
        let summary = dataset
            .seed(&sources, repo.as_ref())
            .await
            .context("Failed to seed dataset")?;
        info!(sources = summary.sources, "Data sources registered");
    }
    if sources.is_empty() {
        health
            .set_degraded(Component::DataSources, "No cost data sources registered")
            .await;
    }

    let (forecast, forecast_model) = forecast_engine(config, &health).await;

    let engine = RecommendationEngine::new(
        Arc::clone(&sources),
        Arc::clone(&repo),
        forecast,
        UtilizationClassifier::new(config.classifier.clone()),
        config.recommendation.clone(),
    )
    .with_logger(logger.clone());

    let scorer = TradeoffScorer::new(
        Arc::clone(&sources),
        Arc::clone(&repo),
        config.tradeoff.clone(),
    );

    let validator = Arc::new(
        SavingsValidator::new(sources, repo, config.validation.clone())
            .with_logger(logger.clone()),
    );
    let scheduler = Arc::new(
        ValidationScheduler::new(Arc::clone(&validator)).with_health(health.clone()),
    );

    let state = Arc::new(AppState::new(
        health,
        Arc::new(engine),
        Arc::new(scorer),
        validator,
    ));

    Ok(Services {
        state,
        scheduler,
        logger,
        forecast_model,
    })
}

/// Statistical engine, plus the ONNX backend when one is configured and loads
async fn forecast_engine(config: &OptimizerConfig, health: &HealthRegistry) -> (ForecastEngine, String) {
    let engine = ForecastEngine::new(config.forecast.clone());
    let Some(path) = &config.forecast_model else {
        return (engine, MODEL_STATISTICAL.to_string());
    };

    match OnnxForecastBackend::from_file(
        path,
        config.forecast_input_window,
        config.forecast_model_sha256.as_deref(),
    ) {
        Ok(backend) => {
            let name = backend.name().to_string();
            (engine.with_backend(Arc::new(backend)), name)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Forecast model unavailable, using statistical forecasts");
            health
                .set_degraded(
                    Component::ForecastBackend,
                    format!("Model failed to load: {}", e),
                )
                .await;
            (engine, MODEL_STATISTICAL.to_string())
        }
    }
}

/// Periodically expire stale recommendations until shutdown
pub async fn run_expiry(
    engine: Arc<RecommendationEngine>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.expire_stale(chrono::Utc::now()).await {
                    Ok(0) => debug!("No recommendations expired"),
                    Ok(expired) => info!(expired, "Expired stale recommendations"),
                    Err(e) => warn!(error = %e, "Recommendation expiry failed"),
                }
                let purged = engine.cache().purge_expired();
                if purged > 0 {
                    debug!(purged, "Purged expired analysis cache entries");
                }
            }
            _ = shutdown.recv() => {
                info!("Shutting down recommendation expiry");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optimizer_lib::health::ComponentStatus;
    use optimizer_lib::{AnalysisResult, Provider};

    #[tokio::test]
    async fn test_build_without_dataset_degrades_sources() {
        let services = build(&OptimizerConfig::default(), None).await.unwrap();
        let health = services.state.health_registry.health().await;

        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[&Component::DataSources].status,
            ComponentStatus::Degraded
        );
        assert_eq!(services.forecast_model, MODEL_STATISTICAL);
    }

    #[tokio::test]
    async fn test_missing_model_falls_back() {
        let config = OptimizerConfig {
            forecast_model: Some("/nonexistent/forecast.onnx".into()),
            ..Default::default()
        };
        let services = build(&config, Some(&Dataset::default())).await.unwrap();
        let health = services.state.health_registry.health().await;

        assert_eq!(services.forecast_model, MODEL_STATISTICAL);
        assert!(!services.state.engine.forecast_engine().has_backend());
        assert_eq!(
            health.components[&Component::ForecastBackend].status,
            ComponentStatus::Degraded
        );
    }

    #[tokio::test]
    async fn test_expiry_stops_on_shutdown() {
        let services = build(&OptimizerConfig::default(), None).await.unwrap();
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(run_expiry(
            Arc::clone(&services.state.engine),
            Duration::from_millis(10),
            rx,
        ));

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_expiry_purges_analysis_cache() {
        let mut config = OptimizerConfig::default();
        config.recommendation.cache_ttl_secs = 0;
        let services = build(&config, None).await.unwrap();
        let engine = Arc::clone(&services.state.engine);

        for id in ["i-1", "i-2"] {
            engine
                .cache()
                .get_or_compute("acme", Provider::Aws, id, || async {
                    Ok(AnalysisResult::no_data("acme", Provider::Aws, id, chrono::Utc::now()))
                })
                .await
                .unwrap();
        }
        assert_eq!(engine.cache().len(), 2);

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(run_expiry(
            Arc::clone(&engine),
            Duration::from_millis(10),
            rx,
        ));
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();

        assert!(engine.cache().is_empty());
    }
}
