//! Relative Strength Index (RSI).
//!
//! Simple rolling means of gains and of losses over the last `period` close
//! deltas. RSI = 100 - 100 / (1 + avg_gain / max(avg_loss, ε)).
//! Lookback: period (the first delta needs two closes).
//! Edge cases: no losses in the window → RSI near 100; no movement → 0.

use super::Indicator;
use crate::domain::PricePoint;

/// Floor for the loss average, so a pure uptrend saturates instead of dividing by zero.
pub const LOSS_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, points: &[PricePoint]) -> Vec<f64> {
        let n = points.len();
        let mut result = vec![f64::NAN; n];

        for i in self.period..n {
            let mut gain = 0.0;
            let mut loss = 0.0;
            for j in (i + 1 - self.period)..=i {
                let change = points[j].close - points[j - 1].close;
                if change > 0.0 {
                    gain += change;
                } else if change < 0.0 {
                    loss -= change;
                } else if change.is_nan() {
                    gain = f64::NAN;
                }
            }
            if gain.is_nan() {
                continue;
            }
            let avg_gain = gain / self.period as f64;
            let avg_loss = (loss / self.period as f64).max(LOSS_EPSILON);
            result[i] = (100.0 - 100.0 / (1.0 + avg_gain / avg_loss)).clamp(0.0, 100.0);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_points};

    #[test]
    fn warmup_is_nan() {
        let points = make_points(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        let result = Rsi::new(3).compute(&points);
        assert!(result[..3].iter().all(|v| v.is_nan()));
        assert!(!result[3].is_nan());
    }

    #[test]
    fn all_gains_saturate_at_100() {
        let points = make_points(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let result = Rsi::new(3).compute(&points);
        assert_approx(result[3], 100.0, 1e-6);
        assert_approx(result[5], 100.0, 1e-6);
    }

    #[test]
    fn all_losses_are_zero() {
        let points = make_points(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0]);
        let result = Rsi::new(3).compute(&points);
        assert_approx(result[3], 0.0, 1e-9);
    }

    #[test]
    fn mixed_window_matches_hand_calculation() {
        // Deltas over the window ending at index 3: +0.34, -0.25, -0.48
        // avg_gain = 0.34/3, avg_loss = 0.73/3 → RSI = 100 - 100/(1 + 0.34/0.73)
        let points = make_points(&[44.0, 44.34, 44.09, 43.61, 44.33]);
        let result = Rsi::new(3).compute(&points);
        let expected = 100.0 - 100.0 / (1.0 + 0.34 / 0.73);
        assert_approx(result[3], expected, 1e-9);

        // Window ending at index 4 drops +0.34 and adds +0.72.
        let expected = 100.0 - 100.0 / (1.0 + 0.72 / 0.73);
        assert_approx(result[4], expected, 1e-9);
    }

    #[test]
    fn flat_series_reads_zero() {
        let points = make_points(&[50.0; 20]);
        let result = Rsi::new(14).compute(&points);
        assert_approx(result[14], 0.0, 1e-12);
    }

    #[test]
    fn nan_only_affects_windows_containing_it() {
        let mut points = make_points(&[100.0, 101.0, 102.0, 101.0, 103.0, 104.0, 105.0]);
        points[1].close = f64::NAN;
        let result = Rsi::new(2).compute(&points);
        assert!(result[2].is_nan());
        assert!(!result[4].is_nan());
    }

    #[test]
    fn rsi_lookback() {
        assert_eq!(Rsi::new(14).lookback(), 14);
    }
}
