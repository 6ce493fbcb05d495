//! Bar: one hour of OHLCV market data.

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

/// Width of a single bar.
pub fn bar_interval() -> Duration {
    Duration::hours(1)
}

/// Truncate a timestamp to the start of its hour.
///
/// A bar opening at `t` is complete once `floor_hour(now) > t`.
pub fn floor_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(bar_interval()).unwrap_or(ts)
}

/// Hourly OHLCV bar. `timestamp` is the bar's open time in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLCV field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Basic OHLCV sanity check: high bounds the body, low bounds the body,
    /// prices are positive and volume is non-negative.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_bar() -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 12.5,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.volume = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_inverted_range() {
        let mut bar = sample_bar();
        bar.high = 97.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn floor_hour_truncates_minutes_and_seconds() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 14, 37, 12).unwrap();
        assert_eq!(
            floor_hour(ts),
            Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn timestamp_serializes_as_rfc3339() {
        let json = serde_json::to_string(&sample_bar()).unwrap();
        assert!(json.contains("2024-03-01T14:00:00Z"), "got {json}");
        let back: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample_bar());
    }
}
