//! Rolling volatility: sample standard deviation of hourly log returns.
//!
//! Lookback: period (log returns start at bar 1, then `period` of them).

use super::returns::log_returns;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct RollingVolatility {
    period: usize,
    name: String,
}

impl RollingVolatility {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "volatility period must be >= 2");
        Self {
            period,
            name: format!("volatility_{period}"),
        }
    }
}

impl Indicator for RollingVolatility {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let rets = log_returns(bars);
        let n = rets.len();
        let mut out = vec![f64::NAN; n];
        for i in self.period..n {
            let window = &rets[(i + 1 - self.period)..=i];
            if window.iter().any(|v| v.is_nan()) {
                continue;
            }
            let mean = window.iter().sum::<f64>() / self.period as f64;
            let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                / (self.period - 1) as f64;
            out[i] = var.sqrt();
        }
        out
    }
}
