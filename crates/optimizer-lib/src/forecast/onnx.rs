//! ONNX forecast backend using tract
//!
//! The model takes the last `input_window` daily costs as a `[1, window]`
//! f32 tensor and returns `[1, horizon]` daily cost predictions.

use super::ForecastBackend;
use crate::error::{OptimizerError, Result};
use anyhow::Context;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, info};

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Forecast backend running a quantized ONNX model in-process
pub struct OnnxForecastBackend {
    model: Arc<TractModel>,
    input_window: usize,
    name: String,
}

impl std::fmt::Debug for OnnxForecastBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxForecastBackend")
            .field("input_window", &self.input_window)
            .field("name", &self.name)
            .finish()
    }
}

impl OnnxForecastBackend {
    /// Load a model from bytes
    pub fn from_bytes(model_bytes: &[u8], input_window: usize, version: &str) -> Result<Self> {
        let model = Self::load_model(model_bytes, input_window)
            .map_err(|e| OptimizerError::Forecast(format!("{:#}", e)))?;
        Ok(Self {
            model: Arc::new(model),
            input_window,
            name: format!("onnx:{}", version),
        })
    }

    /// Load a model from disk, verifying its SHA-256 checksum when given
    pub fn from_file(
        path: &Path,
        input_window: usize,
        expected_sha256: Option<&str>,
    ) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            OptimizerError::Forecast(format!("failed to read model {}: {}", path.display(), e))
        })?;

        let checksum = sha256_hex(&bytes);
        if let Some(expected) = expected_sha256 {
            if !checksum.eq_ignore_ascii_case(expected) {
                return Err(OptimizerError::Forecast(format!(
                    "model checksum mismatch: expected {}, got {}",
                    expected, checksum
                )));
            }
        }

        let version = checksum.get(..12).unwrap_or(&checksum).to_string();
        let backend = Self::from_bytes(&bytes, input_window, &version)?;
        info!(path = %path.display(), model = %backend.name, "Loaded forecast model");
        Ok(backend)
    }

    fn load_model(model_bytes: &[u8], input_window: usize) -> anyhow::Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, input_window]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn run(model: &TractModel, window: Vec<f32>) -> anyhow::Result<Vec<f32>> {
        let len = window.len();
        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, len), window)
            .context("Failed to shape input tensor")?
            .into();
        let result = model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        let view = output.to_array_view::<f32>()?;
        Ok(view.iter().copied().collect())
    }
}

#[async_trait]
impl ForecastBackend for OnnxForecastBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn predict(&self, history: &[f64], horizon_days: usize) -> Result<Vec<f64>> {
        if history.len() < self.input_window {
            return Err(OptimizerError::Forecast(format!(
                "model needs {} points, got {}",
                self.input_window,
                history.len()
            )));
        }

        let window: Vec<f32> = history[history.len() - self.input_window..]
            .iter()
            .map(|v| *v as f32)
            .collect();
        let model = Arc::clone(&self.model);
        let start = Instant::now();

        let values = tokio::task::spawn_blocking(move || Self::run(&model, window))
            .await
            .map_err(|e| OptimizerError::Forecast(format!("inference task failed: {}", e)))?
            .map_err(|e| OptimizerError::Forecast(format!("{:#}", e)))?;

        debug!(elapsed_us = start.elapsed().as_micros() as u64, "Forecast inference completed");

        if values.len() < horizon_days {
            return Err(OptimizerError::Forecast(format!(
                "model produced {} values, need {}",
                values.len(),
                horizon_days
            )));
        }
        Ok(values
            .into_iter()
            .take(horizon_days)
            .map(f64::from)
            .collect())
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_invalid_model_bytes_rejected() {
        let result = OnnxForecastBackend::from_bytes(b"not an onnx model", 30, "test");
        assert!(matches!(result, Err(OptimizerError::Forecast(_))));
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"model bytes").unwrap();

        let result = OnnxForecastBackend::from_file(file.path(), 30, Some("deadbeef"));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("checksum mismatch"), "{}", err);
    }

    #[test]
    fn test_missing_model_file() {
        let result = OnnxForecastBackend::from_file(Path::new("/nonexistent/model.onnx"), 30, None);
        assert!(matches!(result, Err(OptimizerError::Forecast(_))));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
