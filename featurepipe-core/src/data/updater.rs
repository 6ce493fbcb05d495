//! Incremental updater for raw snapshots.
//!
//! Two entry points:
//! - `initialize()`: bulk backfill of `days_before` days of hourly bars.
//!   Overwrites the snapshot. Errors are returned, never swallowed.
//! - `update()`: fetch complete bars since the last stored bar. Never errors;
//!   every failure collapses into `UpdateStatus::Failed` with a reason and a
//!   logged error.

use super::canonicalize::merge_bars;
use super::provider::{DataError, DataProvider};
use super::snapshot::SnapshotStore;
use crate::domain::bar::{bar_interval, floor_hour};
use crate::domain::Symbol;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default backfill window for `initialize`.
pub const DEFAULT_DAYS_BEFORE: u32 = 30;

/// Outcome of one incremental update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateStatus {
    /// No complete new bar was available; the snapshot is unchanged.
    UpToDate,
    /// New bars were merged and written.
    Updated,
    /// The update could not be performed.
    Failed { reason: String },
}

/// Per-symbol data source: backfill or incremental update.
pub trait DataUpdater {
    /// Backfill `days_before` days of hourly bars ending at the current hour.
    /// Returns the number of bars written.
    fn initialize(&self, symbol: &Symbol, days_before: u32) -> Result<usize, DataError>;

    /// Fetch from the last known bar to now.
    fn update(&self, symbol: &Symbol) -> UpdateStatus;
}

/// Updater backed by a provider and the on-disk snapshot store.
pub struct SnapshotUpdater {
    provider: Box<dyn DataProvider>,
    store: SnapshotStore,
    clock: fn() -> DateTime<Utc>,
}

impl SnapshotUpdater {
    pub fn new(provider: Box<dyn DataProvider>, store: SnapshotStore) -> Self {
        Self {
            provider,
            store,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock (tests pin "now" to a fixed instant).
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Exclusive end of the window of complete bars.
    fn complete_until(&self) -> DateTime<Utc> {
        floor_hour((self.clock)())
    }

    fn try_update(&self, symbol: &Symbol) -> Result<UpdateStatus, DataError> {
        let snapshot = self.store.read(symbol)?.ok_or_else(|| DataError::NoSnapshot {
            symbol: symbol.to_string(),
            path: self.store.locate(symbol),
        })?;
        let last = snapshot
            .last_timestamp()
            .ok_or_else(|| DataError::ValidationError("snapshot has no bars".into()))?;

        let start = last + bar_interval();
        let end = self.complete_until();
        if start >= end {
            tracing::info!(symbol = %symbol, %last, "no complete bar since last update");
            return Ok(UpdateStatus::UpToDate);
        }

        if !self.provider.is_available() {
            return Err(DataError::CircuitBreakerTripped);
        }
        let fetched = self.provider.fetch(symbol, start, end)?;
        let (fresh, insane): (Vec<_>, Vec<_>) = fetched
            .bars
            .into_iter()
            .filter(|b| b.timestamp > last && b.timestamp < end)
            .partition(|b| b.is_sane());
        if !insane.is_empty() {
            tracing::warn!(symbol = %symbol, dropped = insane.len(), "discarding insane bars");
        }
        if fresh.is_empty() {
            tracing::info!(symbol = %symbol, %start, %end, "provider returned no new bars");
            return Ok(UpdateStatus::UpToDate);
        }

        let added = fresh.len();
        let merged = merge_bars(snapshot.bars, fresh);
        let written = self.store.write(symbol, merged.bars)?;
        tracing::info!(
            symbol = %symbol,
            added,
            total = written.bar_count,
            "snapshot updated"
        );
        Ok(UpdateStatus::Updated)
    }
}

impl DataUpdater for SnapshotUpdater {
    fn initialize(&self, symbol: &Symbol, days_before: u32) -> Result<usize, DataError> {
        if days_before == 0 {
            return Err(DataError::ValidationError(
                "days_before must be at least 1".into(),
            ));
        }
        let end = self.complete_until();
        let start = end - Duration::days(i64::from(days_before));

        let fetched = self.provider.fetch(symbol, start, end)?;
        if fetched.bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let snapshot = self.store.write(symbol, fetched.bars)?;
        tracing::info!(
            symbol = %symbol,
            days_before,
            bars = snapshot.bar_count,
            "snapshot initialized"
        );
        Ok(snapshot.bar_count)
    }

    fn update(&self, symbol: &Symbol) -> UpdateStatus {
        match self.try_update(symbol) {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(symbol = %symbol, error = %e, "data update failed");
                UpdateStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
