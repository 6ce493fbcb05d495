//! Indicators computed over hourly bar history.
//!
//! Every indicator is a pure function: bar series in, numeric series of the
//! same length out. Warmup positions are `f64::NAN`; the feature layer turns
//! them into nulls before anything is written.

pub mod atr;
pub mod ema;
pub mod returns;
pub mod rsi;
pub mod sma;
pub mod volatility;

pub use atr::Atr;
pub use ema::Ema;
pub use returns::{LogReturn, PctChange, PriceField};
pub use rsi::Rsi;
pub use sma::Sma;
pub use volatility::RollingVolatility;

use crate::domain::Bar;

/// Trait for indicators.
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on bars after t. Every indicator must pass the
/// truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Column name the value is written under (e.g. "sma_24").
    fn name(&self) -> &str;

    /// Number of leading NaN values.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Rolling mean over an arbitrary series. NaN anywhere in the window yields NaN.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = window.iter().sum::<f64>() / period as f64;
    }
    result
}

/// Create hourly bars from close prices for testing.
///
/// open = previous close (or close for the first bar), high/low = body ± 1.0,
/// volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
