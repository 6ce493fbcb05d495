//! One-bar returns.
//!
//! - `PctChange`: x[t] / x[t-1] - 1 for a chosen price field
//! - `LogReturn`: ln(close[t] / close[t-1])
//!
//! Lookback: 1. A zero denominator yields NaN.

use super::Indicator;
use crate::domain::Bar;

/// Which bar field a percent change is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Close,
    Volume,
}

impl PriceField {
    fn get(self, bar: &Bar) -> f64 {
        match self {
            PriceField::Close => bar.close,
            PriceField::Volume => bar.volume,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PctChange {
    field: PriceField,
    name: String,
}

impl PctChange {
    pub fn new(field: PriceField) -> Self {
        let name = match field {
            PriceField::Close => "return_1h",
            PriceField::Volume => "volume_change",
        };
        Self {
            field,
            name: name.to_string(),
        }
    }
}

impl Indicator for PctChange {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = vec![f64::NAN; bars.len()];
        for i in 1..bars.len() {
            let prev = self.field.get(&bars[i - 1]);
            if prev != 0.0 {
                out[i] = self.field.get(&bars[i]) / prev - 1.0;
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogReturn;

impl LogReturn {
    pub fn new() -> Self {
        Self
    }
}

impl Indicator for LogReturn {
    fn name(&self) -> &str {
        "log_return_1h"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        log_returns(bars)
    }
}

/// ln(close[t] / close[t-1]); NaN at 0 and wherever either close is non-positive.
pub fn log_returns(bars: &[Bar]) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    for i in 1..bars.len() {
        let (prev, curr) = (bars[i - 1].close, bars[i].close);
        if prev > 0.0 && curr > 0.0 {
            out[i] = (curr / prev).ln();
        }
    }
    out
}
