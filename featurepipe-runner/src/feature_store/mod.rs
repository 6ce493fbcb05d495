//! Feature store publishing.
//!
//! `FeatureStore` is the seam: `HopsworksStore` talks to the real REST API,
//! tests plug in recording mocks. `FeatureStorePublisher` owns the ordering:
//! credential check, table read, upload.

pub mod hopsworks;
pub mod publisher;

pub use hopsworks::HopsworksStore;
pub use publisher::FeatureStorePublisher;

use featurepipe_core::domain::{DataLayout, Symbol};
use featurepipe_core::features::FeatureError;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Feature group version written by this pipeline.
pub const FEATURE_GROUP_VERSION: u32 = 1;

/// Where and as whom to publish. Built fresh each run, never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct FeatureStoreTarget {
    pub project_name: String,
    pub feature_group: String,
    pub version: u32,
    pub api_key: Option<String>,
    pub source_path: PathBuf,
}

impl FeatureStoreTarget {
    pub fn for_symbol(
        project_name: &str,
        symbol: &Symbol,
        api_key: Option<String>,
        layout: &DataLayout,
    ) -> Self {
        Self {
            project_name: project_name.to_string(),
            feature_group: symbol.feature_group_name(),
            version: FEATURE_GROUP_VERSION,
            api_key,
            source_path: layout.engineered_table_path(symbol),
        }
    }

    /// The credential, if present and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

// Manual Debug so the key never ends up in logs.
impl std::fmt::Debug for FeatureStoreTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureStoreTarget")
            .field("project_name", &self.project_name)
            .field("feature_group", &self.feature_group)
            .field("version", &self.version)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("source_path", &self.source_path)
            .finish()
    }
}

/// Acknowledgement of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub project_name: String,
    pub feature_group: String,
    pub version: u32,
    pub rows: usize,
    /// Remote ingestion job name, when the store reports one.
    pub job: Option<String>,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("feature store credential missing (set HOPSWORKS_API_KEY)")]
    MissingCredential,

    #[error("engineered table not found at {}", path.display())]
    MissingTable { path: PathBuf },

    #[error("feature store rejected the credential: {0}")]
    Unauthorized(String),

    #[error("feature store rejected the request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("table error: {0}")]
    Table(#[from] FeatureError),
}

/// Remote feature store client.
pub trait FeatureStore {
    /// Insert `table` into the target's feature group under its project.
    fn upload(
        &self,
        target: &FeatureStoreTarget,
        table: &DataFrame,
    ) -> Result<PublishReceipt, PublishError>;
}
