//! Canonicalization of bar series: sort, dedupe, drop insane bars.
//!
//! Every series that reaches the snapshot store goes through here, so a
//! snapshot is always strictly ascending by timestamp with one bar per hour.

use crate::domain::Bar;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Output of canonicalization, with counts of what was removed.
#[derive(Debug, Clone, Default)]
pub struct Canonicalized {
    pub bars: Vec<Bar>,
    pub dropped_insane: usize,
    pub dropped_duplicates: usize,
}

/// Sort ascending, keep the last bar seen for each timestamp, drop bars that
/// fail the OHLCV sanity check.
pub fn canonicalize(bars: Vec<Bar>) -> Canonicalized {
    let total = bars.len();
    let mut dropped_insane = 0;
    let mut by_ts: BTreeMap<DateTime<Utc>, Bar> = BTreeMap::new();

    for bar in bars {
        if !bar.is_sane() {
            dropped_insane += 1;
            continue;
        }
        by_ts.insert(bar.timestamp, bar);
    }

    let bars: Vec<Bar> = by_ts.into_values().collect();
    let dropped_duplicates = total - dropped_insane - bars.len();
    Canonicalized {
        bars,
        dropped_insane,
        dropped_duplicates,
    }
}

/// Merge freshly fetched bars into an existing series. Fresh bars win on
/// timestamp collisions (providers revise the most recent bar).
pub fn merge_bars(existing: Vec<Bar>, fresh: Vec<Bar>) -> Canonicalized {
    let mut combined = existing;
    combined.extend(fresh);
    canonicalize(combined)
}
