//! Tabular representations of the two feature-stage artifacts.
//!
//! `RawTable` is the in-memory form of a raw snapshot, one row per bar in
//! chronological order. `EngineeredTable` is the raw table plus derived columns.
//! Both wrap a polars `DataFrame` so the stage boundaries stay typed.

use super::schema::FeatureSchema;
use super::FeatureError;
use crate::domain::Bar;
use chrono::{DateTime, SecondsFormat, Utc};
use polars::prelude::*;

#[derive(Debug, Clone)]
pub struct RawTable {
    df: DataFrame,
}

#[derive(Debug, Clone)]
pub struct EngineeredTable {
    df: DataFrame,
}

impl RawTable {
    /// Build from bars, preserving their order.
    pub fn from_bars(bars: &[Bar]) -> Result<Self, FeatureError> {
        let timestamps: Vec<String> = bars
            .iter()
            .map(|b| b.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
            .collect();
        let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let df = DataFrame::new(vec![
            Column::new("timestamp".into(), timestamps),
            Column::new("open".into(), opens),
            Column::new("high".into(), highs),
            Column::new("low".into(), lows),
            Column::new("close".into(), closes),
            Column::new("volume".into(), volumes),
        ])?;
        Ok(Self { df })
    }

    /// Wrap an existing frame after checking the raw column contract.
    pub fn from_frame(df: DataFrame) -> Result<Self, FeatureError> {
        FeatureSchema::validate(&df, &FeatureSchema::raw())?;
        Ok(Self { df })
    }

    /// Convert back into bars (used to drive the indicators).
    pub fn to_bars(&self) -> Result<Vec<Bar>, FeatureError> {
        let df = &self.df;
        let ts = df.column("timestamp")?.str()?;
        let open = df.column("open")?.f64()?;
        let high = df.column("high")?.f64()?;
        let low = df.column("low")?.f64()?;
        let close = df.column("close")?.f64()?;
        let volume = df.column("volume")?.f64()?;

        (0..df.height())
            .map(|i| {
                let raw_ts = ts
                    .get(i)
                    .ok_or_else(|| FeatureError::Table(format!("null timestamp at row {i}")))?;
                let timestamp = DateTime::parse_from_rfc3339(raw_ts)
                    .map_err(|e| {
                        FeatureError::Table(format!("bad timestamp '{raw_ts}' at row {i}: {e}"))
                    })?
                    .with_timezone(&Utc);
                Ok(Bar {
                    timestamp,
                    open: open.get(i).unwrap_or(f64::NAN),
                    high: high.get(i).unwrap_or(f64::NAN),
                    low: low.get(i).unwrap_or(f64::NAN),
                    close: close.get(i).unwrap_or(f64::NAN),
                    volume: volume.get(i).unwrap_or(f64::NAN),
                })
            })
            .collect()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }
}

impl EngineeredTable {
    /// Wrap a frame after checking the engineered column contract.
    pub fn from_frame(df: DataFrame) -> Result<Self, FeatureError> {
        FeatureSchema::validate(&df, &FeatureSchema::engineered())?;
        Ok(Self { df })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect()
    }
}
