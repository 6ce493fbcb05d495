//! Raw snapshot store.
//!
//! One JSON document per symbol at `data/raw/stockdata_{BASE}.json`:
//!
//! ```json
//! { "symbol": "BTC/USD", "timeframe": "1Hour", "updated_at": "...",
//!   "bar_count": 720, "data_hash": "<blake3>", "bars": [ ... ] }
//! ```
//!
//! A bare JSON array of bars is also accepted on read. Writes are atomic
//! (write to .tmp, rename into place). Reads distinguish three outcomes:
//! absent or empty (`Ok(None)`), valid (`Ok(Some)`), and malformed (`Err`).

use super::canonicalize::canonicalize;
use super::provider::DataError;
use crate::domain::{Bar, DataLayout, Symbol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Bar width label written into every snapshot.
pub const SNAPSHOT_TIMEFRAME: &str = "1Hour";

/// Raw snapshot document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub symbol: String,
    pub timeframe: String,
    pub updated_at: DateTime<Utc>,
    pub bar_count: usize,
    pub data_hash: String,
    pub bars: Vec<Bar>,
}

impl Snapshot {
    fn from_bars(symbol: &Symbol, bars: Vec<Bar>) -> Result<Self, DataError> {
        Ok(Self {
            symbol: symbol.to_string(),
            timeframe: SNAPSHOT_TIMEFRAME.to_string(),
            updated_at: Utc::now(),
            bar_count: bars.len(),
            data_hash: hash_bars(&bars)?,
            bars,
        })
    }

    /// Open time of the most recent bar.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars.last().map(|b| b.timestamp)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotDocument {
    Full(Snapshot),
    Records(Vec<Bar>),
}

/// BLAKE3 over the JSON serialization of the bars.
pub fn hash_bars(bars: &[Bar]) -> Result<String, DataError> {
    let bytes = serde_json::to_vec(bars)
        .map_err(|e| DataError::SnapshotIo(format!("hash serialization: {e}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Read and validate a snapshot file.
///
/// Returns `Ok(None)` when the file does not exist, is blank, or holds zero bars.
/// Anything unparseable, out of order, or failing its hash is an error.
pub fn read_snapshot_file(path: &Path) -> Result<Option<Snapshot>, DataError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| DataError::SnapshotIo(format!("read {}: {e}", path.display())))?;
    if content.trim().is_empty() {
        return Ok(None);
    }

    let malformed = |reason: String| DataError::MalformedSnapshot {
        path: path.to_path_buf(),
        reason,
    };

    let doc: SnapshotDocument =
        serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;

    let snapshot = match doc {
        SnapshotDocument::Full(snapshot) => {
            let actual = hash_bars(&snapshot.bars)?;
            if actual != snapshot.data_hash {
                return Err(malformed(format!(
                    "data hash mismatch (recorded {}, computed {actual})",
                    snapshot.data_hash
                )));
            }
            snapshot
        }
        SnapshotDocument::Records(bars) => Snapshot {
            symbol: String::new(),
            timeframe: SNAPSHOT_TIMEFRAME.to_string(),
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
            bar_count: bars.len(),
            data_hash: hash_bars(&bars)?,
            bars,
        },
    };

    if let Some(pair) = snapshot
        .bars
        .windows(2)
        .find(|w| w[1].timestamp <= w[0].timestamp)
    {
        return Err(malformed(format!(
            "bars not strictly ascending at {}",
            pair[1].timestamp
        )));
    }

    if snapshot.bars.is_empty() {
        return Ok(None);
    }

    Ok(Some(snapshot))
}

/// Snapshot store rooted at a data layout.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    layout: DataLayout,
}

impl SnapshotStore {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn locate(&self, symbol: &Symbol) -> PathBuf {
        self.layout.raw_snapshot_path(symbol)
    }

    pub fn read(&self, symbol: &Symbol) -> Result<Option<Snapshot>, DataError> {
        read_snapshot_file(&self.locate(symbol))
    }

    /// Canonicalize and write bars for a symbol, replacing any existing snapshot.
    pub fn write(&self, symbol: &Symbol, bars: Vec<Bar>) -> Result<Snapshot, DataError> {
        let canonical = canonicalize(bars);
        if canonical.dropped_insane > 0 {
            tracing::warn!(
                symbol = %symbol,
                dropped = canonical.dropped_insane,
                "dropped bars failing OHLCV sanity check"
            );
        }
        if canonical.bars.is_empty() {
            return Err(DataError::ValidationError(format!(
                "no valid bars to write for {symbol}"
            )));
        }

        let snapshot = Snapshot::from_bars(symbol, canonical.bars)?;
        let path = self.locate(symbol);
        write_atomic(&path, &snapshot)?;
        tracing::debug!(
            path = %path.display(),
            bars = snapshot.bar_count,
            "snapshot written"
        );
        Ok(snapshot)
    }
}

fn write_atomic(path: &Path, snapshot: &Snapshot) -> Result<(), DataError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .map_err(|e| DataError::SnapshotIo(format!("failed to create dir: {e}")))?;
    }

    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| DataError::SnapshotIo(format!("snapshot serialization: {e}")))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json)
        .map_err(|e| DataError::SnapshotIo(format!("write {}: {e}", tmp_path.display())))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::SnapshotIo(format!("atomic rename failed: {e}"))
    })
}
