//! Cost Optimizer - cloud cost analysis and recommendation service
//!
//! Serves resource analyses, alternative rankings and savings
//! validation over HTTP, and validates implemented recommendations daily.

use anyhow::Result;
use cost_optimizer::{api, app, config::OptimizerConfig};
use optimizer_lib::Dataset;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const OPTIMIZER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting cost-optimizer");

    let config = OptimizerConfig::load()?;
    info!(instance = %config.instance, api_port = config.api_port, "Optimizer configured");

    let dataset = match &config.data_file {
        Some(path) => Some(Dataset::load(path)?),
        None => None,
    };
    let services = app::build(&config, dataset.as_ref()).await?;
    services
        .logger
        .log_startup(OPTIMIZER_VERSION, &services.forecast_model);

    let (shutdown_tx, _) = broadcast::channel(1);

    let scheduler_handle = tokio::spawn(
        Arc::clone(&services.scheduler).run(shutdown_tx.subscribe()),
    );
    let expiry_handle = tokio::spawn(app::run_expiry(
        Arc::clone(&services.state.engine),
        app::EXPIRY_INTERVAL,
        shutdown_tx.subscribe(),
    ));

    services.state.health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(
        config.api_port,
        Arc::clone(&services.state),
        shutdown_tx.subscribe(),
    ));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    services.logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    services.state.health_registry.set_ready(false).await;
    let _ = shutdown_tx.send(());

    if let Ok(Err(e)) = api_handle.await {
        error!(error = %e, "API server exited with error");
    }
    let _ = scheduler_handle.await;
    let _ = expiry_handle.await;

    Ok(())
}
