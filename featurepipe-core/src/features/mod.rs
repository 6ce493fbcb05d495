//! Feature engineering: raw snapshot → engineered table.
//!
//! The stage reads the symbol's raw snapshot, converts it into a polars
//! `DataFrame`, appends derived indicator columns, and writes the result as
//! CSV. An absent or empty snapshot is not an error: the stage reports
//! `Ok(None)` and nothing is written.

pub mod csv_io;
pub mod engineer;
pub mod schema;
pub mod table;

pub use csv_io::{read_engineered_table, write_table_atomic};
pub use engineer::{EngineeredArtifact, FeatureEngineer, FeatureStage};
pub use schema::{FeatureSchema, SchemaError};
pub use table::{EngineeredTable, RawTable};

use crate::data::DataError;
use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("malformed snapshot {}: {reason}", path.display())]
    MalformedSnapshot { path: PathBuf, reason: String },

    #[error("snapshot error: {0}")]
    Snapshot(DataError),

    #[error("table error: {0}")]
    Table(String),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<DataError> for FeatureError {
    fn from(e: DataError) -> Self {
        match e {
            DataError::MalformedSnapshot { path, reason } => {
                FeatureError::MalformedSnapshot { path, reason }
            }
            other => FeatureError::Snapshot(other),
        }
    }
}

impl From<PolarsError> for FeatureError {
    fn from(e: PolarsError) -> Self {
        FeatureError::Table(e.to_string())
    }
}
