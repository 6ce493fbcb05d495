//! Column contract for raw and engineered tables.

use polars::prelude::*;

/// Logical column type, mapped onto a polars dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Float,
    Integer,
}

impl ColumnType {
    pub fn dtype(self) -> DataType {
        match self {
            ColumnType::Text => DataType::String,
            ColumnType::Float => DataType::Float64,
            ColumnType::Integer => DataType::Int64,
        }
    }
}

/// Raw columns, in table order.
pub const RAW_COLUMNS: &[(&str, ColumnType)] = &[
    ("timestamp", ColumnType::Text),
    ("open", ColumnType::Float),
    ("high", ColumnType::Float),
    ("low", ColumnType::Float),
    ("close", ColumnType::Float),
    ("volume", ColumnType::Float),
];

/// Derived columns appended by feature engineering, in table order.
pub const DERIVED_COLUMNS: &[(&str, ColumnType)] = &[
    ("hour_of_day", ColumnType::Integer),
    ("day_of_week", ColumnType::Integer),
    ("return_1h", ColumnType::Float),
    ("log_return_1h", ColumnType::Float),
    ("price_range_pct", ColumnType::Float),
    ("sma_6", ColumnType::Float),
    ("sma_24", ColumnType::Float),
    ("ema_12", ColumnType::Float),
    ("ema_26", ColumnType::Float),
    ("macd", ColumnType::Float),
    ("rsi_14", ColumnType::Float),
    ("atr_14", ColumnType::Float),
    ("volatility_24", ColumnType::Float),
    ("volume_change", ColumnType::Float),
];

/// Primary key of every table: one row per bar.
pub const PRIMARY_KEY: &str = "timestamp";

pub struct FeatureSchema;

impl FeatureSchema {
    pub fn raw() -> Schema {
        Self::from_columns(RAW_COLUMNS.iter())
    }

    pub fn engineered() -> Schema {
        Self::from_columns(RAW_COLUMNS.iter().chain(DERIVED_COLUMNS.iter()))
    }

    fn from_columns(cols: impl Iterator<Item = &'static (&'static str, ColumnType)>) -> Schema {
        Schema::from_iter(
            cols.map(|(name, ty)| Field::new((*name).into(), ty.dtype())),
        )
    }

    /// Validate a DataFrame against a schema: every column present with the
    /// expected dtype. Extra columns are allowed.
    pub fn validate(df: &DataFrame, expected: &Schema) -> Result<(), SchemaError> {
        let actual = df.schema();
        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
            if actual_dtype != field.dtype() {
                return Err(SchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: actual_dtype.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engineered_extends_raw() {
        let raw = FeatureSchema::raw();
        let eng = FeatureSchema::engineered();
        assert_eq!(raw.len(), RAW_COLUMNS.len());
        assert_eq!(eng.len(), RAW_COLUMNS.len() + DERIVED_COLUMNS.len());
        for field in raw.iter_fields() {
            assert!(eng.contains(field.name()));
        }
    }

    #[test]
    fn validate_reports_missing_column() {
        let df = DataFrame::new(vec![Column::new("timestamp".into(), vec!["x"])]).unwrap();
        let err = FeatureSchema::validate(&df, &FeatureSchema::raw()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn(ref c) if c == "open"));
    }

    #[test]
    fn validate_reports_type_mismatch() {
        let df = DataFrame::new(vec![
            Column::new("timestamp".into(), vec!["x"]),
            Column::new("open".into(), vec![1i64]),
        ])
        .unwrap();
        let err = FeatureSchema::validate(&df, &FeatureSchema::raw()).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { ref column, .. } if column == "open"));
    }
}
