//! Service configuration

use anyhow::{Context, Result};
use optimizer_lib::{
    ClassifierConfig, ForecastConfig, RecommendationConfig, TradeoffConfig, ValidationConfig,
};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable naming an optional configuration file
pub const CONFIG_FILE_ENV: &str = "OPTIMIZER_CONFIG";

/// Service configuration
///
/// Every field has a default. Nested sections map onto the library
/// configuration structs, e.g. `OPTIMIZER_FORECAST__MIN_DATA_POINTS=21`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Instance name attached to structured log events
    pub instance: String,

    /// API server port
    pub api_port: u16,

    /// JSON dataset seeding data sources and stores
    pub data_file: Option<PathBuf>,

    /// Optional ONNX forecast model
    pub forecast_model: Option<PathBuf>,
    pub forecast_model_sha256: Option<String>,
    /// Days of history fed to the ONNX model
    pub forecast_input_window: usize,

    pub forecast: ForecastConfig,
    pub classifier: ClassifierConfig,
    pub recommendation: RecommendationConfig,
    pub validation: ValidationConfig,
    pub tradeoff: TradeoffConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            instance: std::env::var("HOSTNAME").unwrap_or_else(|_| "cost-optimizer".to_string()),
            api_port: 8080,
            data_file: None,
            forecast_model: None,
            forecast_model_sha256: None,
            forecast_input_window: 30,
            forecast: ForecastConfig::default(),
            classifier: ClassifierConfig::default(),
            recommendation: RecommendationConfig::default(),
            validation: ValidationConfig::default(),
            tradeoff: TradeoffConfig::default(),
        }
    }
}

impl OptimizerConfig {
    /// Load configuration from the optional file and `OPTIMIZER_*` environment
    ///
    /// Environment values override the file.
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.add_source(config::File::with_name(&path));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("OPTIMIZER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid optimizer configuration")
    }
}
