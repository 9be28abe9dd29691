//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// Tenant used when neither the flag nor the config file names one
pub const DEFAULT_TENANT: &str = "default";

/// CLI defaults read from `~/.config/cco/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Dataset used when `--data` is not given
    pub data_file: Option<PathBuf>,
    /// Tenant used when `--tenant` is not given
    pub default_tenant: Option<String>,
    /// Output format used when `--format` is not given
    pub default_format: Option<OutputFormat>,
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Resolve the dataset path, preferring the command-line value
    pub fn data_file(&self, flag: Option<PathBuf>) -> Result<PathBuf> {
        flag.or_else(|| self.data_file.clone()).context(
            "No dataset given: pass --data, set CCO_DATA, or add data_file to the config file",
        )
    }

    pub fn tenant(&self, flag: Option<String>) -> String {
        flag.or_else(|| self.default_tenant.clone())
            .unwrap_or_else(|| DEFAULT_TENANT.to_string())
    }

    pub fn format(&self, flag: Option<OutputFormat>) -> OutputFormat {
        flag.or(self.default_format).unwrap_or_default()
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("cco").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert!(config.data_file.is_none());
        assert_eq!(config.tenant(None), DEFAULT_TENANT);
        assert_eq!(config.format(None), OutputFormat::Table);
        assert!(config.data_file(None).is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"data_file": "/data/costs.json", "default_tenant": "acme", "default_format": "json"}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.tenant(None), "acme");
        assert_eq!(config.tenant(Some("globex".to_string())), "globex");
        assert_eq!(config.format(None), OutputFormat::Json);
        assert_eq!(config.format(Some(OutputFormat::Table)), OutputFormat::Table);
        assert_eq!(
            config.data_file(None).unwrap(),
            PathBuf::from("/data/costs.json")
        );
        assert_eq!(
            config.data_file(Some("local.json".into())).unwrap(),
            PathBuf::from("local.json")
        );
    }

    #[test]
    fn test_invalid_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
