//! Feature engineer: the snapshot → engineered table stage.
//!
//! Operations, in the order the stage runs them:
//! 1. `locate_snapshot`: pure path derivation
//! 2. `load`: `Ok(None)` on absent/empty, `Err` on malformed (the only branch)
//! 3. `to_table`: bars → `RawTable`, chronological order kept
//! 4. `engineer`: deterministic derived columns
//! 5. `persist`: atomic CSV write to the engineered path

use super::csv_io::write_table_atomic;
use super::schema::FeatureSchema;
use super::table::{EngineeredTable, RawTable};
use super::FeatureError;
use crate::data::read_snapshot_file;
use crate::domain::{Bar, DataLayout, Symbol};
use crate::indicators::{
    Atr, Ema, Indicator, LogReturn, PctChange, PriceField, RollingVolatility, Rsi, Sma,
};
use chrono::{Datelike, Timelike};
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// What a successful feature stage produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineeredArtifact {
    pub symbol: Symbol,
    pub path: PathBuf,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// The feature stage as seen by the orchestrator.
pub trait FeatureStage {
    /// Engineer and persist features for a symbol. `Ok(None)` means there was
    /// no raw data to work from and nothing was written.
    fn run(&self, symbol: &Symbol) -> Result<Option<EngineeredArtifact>, FeatureError>;
}

#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    layout: DataLayout,
}

impl FeatureEngineer {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    pub fn locate_snapshot(&self, symbol: &Symbol) -> PathBuf {
        self.layout.raw_snapshot_path(symbol)
    }

    pub fn engineered_path(&self, symbol: &Symbol) -> PathBuf {
        self.layout.engineered_table_path(symbol)
    }

    pub fn load(&self, path: &Path) -> Result<Option<Vec<Bar>>, FeatureError> {
        Ok(read_snapshot_file(path)?.map(|snapshot| snapshot.bars))
    }

    pub fn to_table(&self, bars: &[Bar]) -> Result<RawTable, FeatureError> {
        RawTable::from_bars(bars)
    }

    /// Append the derived feature columns. Deterministic given identical input.
    pub fn engineer(&self, raw: &RawTable) -> Result<EngineeredTable, FeatureError> {
        let bars = raw.to_bars()?;
        let mut columns: Vec<Column> = raw.frame().get_columns().to_vec();

        let hours: Vec<i64> = bars.iter().map(|b| i64::from(b.timestamp.hour())).collect();
        let weekdays: Vec<i64> = bars
            .iter()
            .map(|b| i64::from(b.timestamp.weekday().num_days_from_monday()))
            .collect();
        columns.push(Column::new("hour_of_day".into(), hours));
        columns.push(Column::new("day_of_week".into(), weekdays));

        let mut push = |name: &str, values: Vec<f64>| {
            columns.push(Column::new(name.into(), nan_to_null(values)));
        };
        let mut push_indicator = |ind: &dyn Indicator| -> Vec<f64> {
            let values = compute_or_warmup(ind, &bars);
            push(ind.name(), values.clone());
            values
        };

        push_indicator(&PctChange::new(PriceField::Close));
        push_indicator(&LogReturn::new());
        let range: Vec<f64> = bars.iter().map(|b| (b.high - b.low) / b.close).collect();
        push_indicator(&Sma::new(6));
        push_indicator(&Sma::new(24));
        let ema_fast = push_indicator(&Ema::new(12));
        let ema_slow = push_indicator(&Ema::new(26));
        push_indicator(&Rsi::new(14));
        push_indicator(&Atr::new(14));
        push_indicator(&RollingVolatility::new(24));
        push_indicator(&PctChange::new(PriceField::Volume));

        let macd: Vec<f64> = ema_fast
            .iter()
            .zip(&ema_slow)
            .map(|(fast, slow)| fast - slow)
            .collect();
        columns.push(Column::new("price_range_pct".into(), nan_to_null(range)));
        columns.push(Column::new("macd".into(), nan_to_null(macd)));

        let df = DataFrame::new(columns)?;
        EngineeredTable::from_frame(df)
    }

    /// Write the table to the symbol's engineered path, replacing any prior file.
    pub fn persist(
        &self,
        table: &EngineeredTable,
        symbol: &Symbol,
    ) -> Result<PathBuf, FeatureError> {
        FeatureSchema::validate(table.frame(), &FeatureSchema::engineered())?;
        let path = self.engineered_path(symbol);
        write_table_atomic(table.frame(), &path)?;
        Ok(path)
    }
}

impl FeatureStage for FeatureEngineer {
    fn run(&self, symbol: &Symbol) -> Result<Option<EngineeredArtifact>, FeatureError> {
        let snapshot_path = self.locate_snapshot(symbol);
        let Some(bars) = self.load(&snapshot_path)? else {
            tracing::info!(
                symbol = %symbol,
                path = %snapshot_path.display(),
                "no raw data to engineer"
            );
            return Ok(None);
        };

        let raw = self.to_table(&bars)?;
        let engineered = self.engineer(&raw)?;
        let path = self.persist(&engineered, symbol)?;
        tracing::info!(
            symbol = %symbol,
            rows = engineered.height(),
            path = %path.display(),
            "engineered table written"
        );

        Ok(Some(EngineeredArtifact {
            symbol: symbol.clone(),
            path,
            rows: engineered.height(),
            columns: engineered.column_names(),
        }))
    }
}

/// Series too short to get past the warmup are all warmup.
fn compute_or_warmup(ind: &dyn Indicator, bars: &[Bar]) -> Vec<f64> {
    if bars.len() <= ind.lookback() {
        return vec![f64::NAN; bars.len()];
    }
    ind.compute(bars)
}

/// Warmup NaNs and non-finite values become nulls so they serialize as empty
/// CSV cells.
fn nan_to_null(values: Vec<f64>) -> Vec<Option<f64>> {
    values
        .into_iter()
        .map(|v| if v.is_finite() { Some(v) } else { None })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SnapshotStore;
    use crate::features::read_engineered_table;
    use crate::features::schema::{DERIVED_COLUMNS, RAW_COLUMNS};
    use crate::indicators::make_bars;
    use std::fs;

    fn hourly_closes(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + (i as f64 * 0.5).sin() * 3.0 + i as f64 * 0.1).collect()
    }

    fn setup() -> (tempfile::TempDir, FeatureEngineer, Symbol) {
        let dir = tempfile::tempdir().unwrap();
        let engineer = FeatureEngineer::new(DataLayout::new(dir.path()));
        (dir, engineer, Symbol::parse("BTC/USD").unwrap())
    }

    #[test]
    fn engineered_table_has_raw_plus_derived_columns() {
        let (_dir, engineer, _) = setup();
        let raw = engineer.to_table(&make_bars(&hourly_closes(30))).unwrap();
        let table = engineer.engineer(&raw).unwrap();
        assert_eq!(table.height(), 30);
        assert_eq!(
            table.column_names().len(),
            RAW_COLUMNS.len() + DERIVED_COLUMNS.len()
        );
    }

    #[test]
    fn warmup_rows_are_null_not_nan() {
        let (_dir, engineer, _) = setup();
        let raw = engineer.to_table(&make_bars(&hourly_closes(30))).unwrap();
        let table = engineer.engineer(&raw).unwrap();
        let sma24 = table.frame().column("sma_24").unwrap().f64().unwrap();
        assert_eq!(sma24.null_count(), 23);
        assert!(sma24.get(23).is_some());
        let macd = table.frame().column("macd").unwrap().f64().unwrap();
        assert_eq!(macd.null_count(), 25);
    }

    #[test]
    fn indicator_columns_carry_indicator_names() {
        let (_dir, engineer, _) = setup();
        let raw = engineer.to_table(&make_bars(&hourly_closes(30))).unwrap();
        let table = engineer.engineer(&raw).unwrap();
        let names = table.column_names();
        let indicators: Vec<Box<dyn Indicator>> = vec![
            Box::new(Sma::new(24)),
            Box::new(Ema::new(26)),
            Box::new(Rsi::new(14)),
            Box::new(Atr::new(14)),
            Box::new(RollingVolatility::new(24)),
            Box::new(LogReturn::new()),
        ];
        for ind in &indicators {
            assert!(names.iter().any(|n| n == ind.name()), "missing {}", ind.name());
            let col = table.frame().column(ind.name()).unwrap().f64().unwrap();
            assert!(col.null_count() >= ind.lookback(), "{}", ind.name());
        }
    }

    #[test]
    fn series_shorter_than_warmup_is_all_null() {
        let (_dir, engineer, _) = setup();
        let raw = engineer.to_table(&make_bars(&hourly_closes(5))).unwrap();
        let table = engineer.engineer(&raw).unwrap();
        assert_eq!(table.height(), 5);
        for name in ["sma_24", "ema_26", "rsi_14", "atr_14", "volatility_24", "macd"] {
            let col = table.frame().column(name).unwrap().f64().unwrap();
            assert_eq!(col.null_count(), 5, "{name}");
        }
        let sma6 = table.frame().column("sma_6").unwrap().f64().unwrap();
        assert_eq!(sma6.null_count(), 5);
    }

    #[test]
    fn calendar_columns() {
        let (_dir, engineer, _) = setup();
        // 2024-01-01 is a Monday
        let raw = engineer.to_table(&make_bars(&hourly_closes(26))).unwrap();
        let table = engineer.engineer(&raw).unwrap();
        let hours = table.frame().column("hour_of_day").unwrap().i64().unwrap();
        let days = table.frame().column("day_of_week").unwrap().i64().unwrap();
        assert_eq!(hours.get(0), Some(0));
        assert_eq!(hours.get(25), Some(1));
        assert_eq!(days.get(0), Some(0));
        assert_eq!(days.get(25), Some(1));
    }

    #[test]
    fn engineer_is_deterministic() {
        let (_dir, engineer, _) = setup();
        let raw = engineer.to_table(&make_bars(&hourly_closes(40))).unwrap();
        let a = engineer.engineer(&raw).unwrap();
        let b = engineer.engineer(&raw).unwrap();
        assert!(a.frame().equals_missing(b.frame()));
    }

    #[test]
    fn run_without_snapshot_writes_nothing() {
        let (_dir, engineer, sym) = setup();
        assert!(engineer.run(&sym).unwrap().is_none());
        assert!(!engineer.engineered_path(&sym).exists());
    }

    #[test]
    fn run_with_empty_snapshot_writes_nothing() {
        let (_dir, engineer, sym) = setup();
        let path = engineer.locate_snapshot(&sym);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
        assert!(engineer.run(&sym).unwrap().is_none());
        assert!(!engineer.engineered_path(&sym).exists());
    }

    #[test]
    fn run_with_malformed_snapshot_fails_fast() {
        let (_dir, engineer, sym) = setup();
        let path = engineer.locate_snapshot(&sym);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            engineer.run(&sym),
            Err(FeatureError::MalformedSnapshot { .. })
        ));
        assert!(!engineer.engineered_path(&sym).exists());
    }

    #[test]
    fn run_persists_readable_table() {
        let (dir, engineer, sym) = setup();
        let store = SnapshotStore::new(DataLayout::new(dir.path()));
        store.write(&sym, make_bars(&hourly_closes(30))).unwrap();

        let artifact = engineer.run(&sym).unwrap().unwrap();
        assert_eq!(artifact.rows, 30);
        assert_eq!(artifact.path, engineer.engineered_path(&sym));
        let path_str = artifact.path.to_string_lossy();
        assert!(path_str.contains("BTC") && path_str.contains("engineered"));

        let raw = engineer.to_table(&make_bars(&hourly_closes(30))).unwrap();
        let expected = engineer.engineer(&raw).unwrap();
        let read_back = read_engineered_table(&artifact.path).unwrap();
        assert!(read_back.equals_missing(expected.frame()));
    }
}
