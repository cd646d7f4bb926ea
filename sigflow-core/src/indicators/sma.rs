//! Simple Moving Average (SMA).
//!
//! Mean of the trailing `period` closes. Windows shorter than `period` at the
//! start of the series are averaged over the rows available, so the output has
//! no warm-up gap. A NaN close poisons every window containing it.

use super::Indicator;
use crate::domain::PricePoint;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        // Each window is summed from scratch so equal windows give bit-equal
        // means regardless of period.
        (0..points.len())
            .map(|i| {
                let start = (i + 1).saturating_sub(self.period);
                let window = &points[start..=i];
                window.iter().map(|p| p.close).sum::<f64>() / window.len() as f64
            })
            .collect()
    }
}
