//! Periodic savings validation loop

use super::SavingsValidator;
use crate::health::{Component, HealthRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Runs the savings validator on a fixed interval until shutdown
pub struct ValidationScheduler {
    validator: Arc<SavingsValidator>,
    interval: Duration,
    health: Option<HealthRegistry>,
}

impl ValidationScheduler {
    pub fn new(validator: Arc<SavingsValidator>) -> Self {
        let interval = validator.config().interval();
        Self {
            validator,
            interval,
            health: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Report run outcomes as the validator component's health
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Run the validation loop
    ///
    /// The first run starts immediately.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting savings validation scheduler"
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down savings validation scheduler");
                    break;
                }
            }
        }
    }

    async fn run_once(&self) {
        match self.validator.run_daily_validation().await {
            Ok(summary) => {
                if let Some(health) = &self.health {
                    if summary.errors > 0 {
                        health
                            .set_degraded(
                                Component::Validator,
                                format!("{} validation items failed", summary.errors),
                            )
                            .await;
                    } else {
                        health.set_healthy(Component::Validator).await;
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Savings validation run failed");
                if let Some(health) = &self.health {
                    health
                        .set_degraded(Component::Validator, format!("Last run failed: {}", e))
                        .await;
                }
            }
        }
    }
}
