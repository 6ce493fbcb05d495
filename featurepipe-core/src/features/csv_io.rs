//! CSV persistence for engineered tables.
//!
//! Writes are atomic (write to .tmp, rename into place). Reads apply the
//! engineered schema as dtype overrides so nulls and integer columns come back
//! exactly as written.

use super::schema::FeatureSchema;
use super::FeatureError;
use polars::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Write a frame as CSV with a header row, replacing any existing file.
pub fn write_table_atomic(df: &DataFrame, path: &Path) -> Result<(), FeatureError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .map_err(|e| FeatureError::Io(format!("failed to create dir: {e}")))?;
    }

    let tmp_path = path.with_extension("csv.tmp");
    let mut file = fs::File::create(&tmp_path)
        .map_err(|e| FeatureError::Io(format!("create {}: {e}", tmp_path.display())))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df.clone())
        .map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            FeatureError::Table(format!("write csv: {e}"))
        })?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        FeatureError::Io(format!("atomic rename failed: {e}"))
    })
}

/// Read an engineered table CSV and validate it against the engineered schema.
pub fn read_engineered_table(path: &Path) -> Result<DataFrame, FeatureError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_schema_overwrite(Some(Arc::new(FeatureSchema::engineered())))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    FeatureSchema::validate(&df, &FeatureSchema::engineered())?;
    Ok(df)
}
