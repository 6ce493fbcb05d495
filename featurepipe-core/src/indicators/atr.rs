//! Average True Range (ATR).
//!
//! TR[t] = max(high-low, |high-prev_close|, |low-prev_close|) for t >= 1.
//! ATR seeds with the mean of TR[1..=period], then applies Wilder smoothing.
//! Lookback: period.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True range series. Index 0 is NaN (no previous close).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];
    for i in 1..bars.len() {
        let (h, l, pc) = (bars[i].high, bars[i].low, bars[i - 1].close);
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period + 1 {
            return result;
        }

        let tr = true_range(bars);
        let seed = &tr[1..=self.period];
        if seed.iter().any(|v| v.is_nan()) {
            return result;
        }
        let mut atr = seed.iter().sum::<f64>() / self.period as f64;
        result[self.period] = atr;

        let p = self.period as f64;
        for i in (self.period + 1)..n {
            if tr[i].is_nan() {
                break;
            }
            atr = (atr * (p - 1.0) + tr[i]) / p;
            result[i] = atr;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn true_range_uses_prev_close_gap() {
        let mut bars = make_bars(&[100.0, 100.0]);
        bars[1].high = 106.0;
        bars[1].low = 104.0;
        let tr = true_range(&bars);
        assert!(tr[0].is_nan());
        // gap up: |106 - 100| dominates high - low
        assert_approx(tr[1], 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_constant_range() {
        // make_bars on a flat series: high - low = 2.0 every bar
        let bars = make_bars(&[50.0; 10]);
        let out = Atr::new(3).compute(&bars);
        assert!(out[2].is_nan());
        for v in &out[3..] {
            assert_approx(*v, 2.0, DEFAULT_EPSILON);
        }
    }
}
