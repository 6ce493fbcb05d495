//! Pipeline configuration.
//!
//! Loaded once from TOML at process start:
//!
//! ```toml
//! [hopsworks]
//! project_name = "crypto_features"
//! host = "c.app.hopsworks.ai"   # optional
//!
//! [stock_api_params]
//! symbol = "BTC/USD"
//! days_before = 30              # optional
//!
//! [paths]
//! base_dir = "."                # optional, relative to the config file
//! ```
//!
//! The feature store credential is not part of the file; it is read from
//! `HOPSWORKS_API_KEY` by the caller and attached with `with_api_key`.

use featurepipe_core::data::DEFAULT_DAYS_BEFORE;
use featurepipe_core::domain::{DataLayout, Symbol, SymbolError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::feature_store::FeatureStoreTarget;

/// Environment variable holding the feature store API key.
pub const API_KEY_ENV: &str = "HOPSWORKS_API_KEY";

pub const DEFAULT_HOPSWORKS_HOST: &str = "c.app.hopsworks.ai";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("invalid symbol: {0}")]
    Symbol(#[from] SymbolError),
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    hopsworks: HopsworksSection,
    stock_api_params: StockApiParams,
    #[serde(default)]
    paths: PathsSection,
}

#[derive(Debug, Deserialize)]
struct HopsworksSection {
    project_name: String,
    host: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StockApiParams {
    symbol: String,
    days_before: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct PathsSection {
    base_dir: Option<PathBuf>,
}

/// Validated configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub project_name: String,
    pub hopsworks_host: String,
    pub symbol: Symbol,
    pub days_before: u32,
    pub base_dir: PathBuf,
    pub api_key: Option<String>,
}

impl PipelineConfig {
    /// Load from a TOML file. A relative `paths.base_dir` resolves against the
    /// file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::from_toml_in(&content, config_dir)
    }

    /// Parse from a TOML string; relative paths resolve against the current directory.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Self::from_toml_in(content, Path::new("."))
    }

    fn from_toml_in(content: &str, config_dir: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;

        let project_name = file.hopsworks.project_name.trim().to_string();
        if project_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "hopsworks.project_name",
                reason: "must not be empty".into(),
            });
        }

        let symbol = Symbol::parse(&file.stock_api_params.symbol)?;

        let days_before = file
            .stock_api_params
            .days_before
            .unwrap_or(DEFAULT_DAYS_BEFORE);
        if days_before == 0 {
            return Err(ConfigError::InvalidValue {
                key: "stock_api_params.days_before",
                reason: "must be at least 1".into(),
            });
        }

        let hopsworks_host = file
            .hopsworks
            .host
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOPSWORKS_HOST.to_string());

        let base_dir = match file.paths.base_dir {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => config_dir.join(dir),
            None => config_dir.to_path_buf(),
        };

        Ok(Self {
            project_name,
            hopsworks_host,
            symbol,
            days_before,
            base_dir,
            api_key: None,
        })
    }

    /// Attach the credential. Empty strings count as absent.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.base_dir)
    }

    /// Publish target for the configured symbol. Built fresh per run.
    pub fn feature_store_target(&self) -> FeatureStoreTarget {
        FeatureStoreTarget::for_symbol(
            &self.project_name,
            &self.symbol,
            self.api_key.clone(),
            &self.layout(),
        )
    }
}

/// Read the credential from the process environment.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty())
}
