//! Indicator engine.
//!
//! Indicators are pure functions: a date-ordered price series in, a numeric
//! series of the same length out, `f64::NAN` where the value is not available.
//! `add_indicators` runs the pipeline's three indicators per symbol and exposes
//! the results as `Option`s.

pub mod rsi;
pub mod sma;

pub use rsi::Rsi;
pub use sma::Sma;

use crate::domain::PricePoint;
use serde::{Deserialize, Serialize};

/// Trait for indicators.
///
/// # Look-ahead guard
/// No value at row t may depend on rows after t. Truncating the series must
/// not change any value already computed.
pub trait Indicator: Send + Sync {
    /// Name such as "sma_20" or "rsi_14".
    fn name(&self) -> &str;

    /// Number of leading rows whose value is NaN.
    fn lookback(&self) -> usize;

    /// Compute over a single symbol's rows, ordered by date ascending.
    fn compute(&self, points: &[PricePoint]) -> Vec<f64>;
}

pub const SMA_FAST: usize = 20;
pub const SMA_SLOW: usize = 50;
pub const RSI_PERIOD: usize = 14;

/// A price row with its indicator frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub point: PricePoint,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub rsi_14: Option<f64>,
}

fn defined(v: f64) -> Option<f64> {
    (!v.is_nan()).then_some(v)
}

/// Add SMA(20), SMA(50), and RSI(14) to every row.
///
/// Rows are grouped by symbol in first-seen order and sorted by date within
/// each group; the output follows that order.
pub fn add_indicators(points: &[PricePoint]) -> Vec<IndicatorRow> {
    let sma_fast = Sma::new(SMA_FAST);
    let sma_slow = Sma::new(SMA_SLOW);
    let rsi = Rsi::new(RSI_PERIOD);

    let mut out = Vec::with_capacity(points.len());
    for mut group in group_by_symbol(points) {
        group.sort_by_key(|p| p.date);

        let fast = sma_fast.compute(&group);
        let slow = sma_slow.compute(&group);
        let strength = rsi.compute(&group);

        out.extend(group.into_iter().enumerate().map(|(i, point)| IndicatorRow {
            point,
            sma_20: defined(fast[i]),
            sma_50: defined(slow[i]),
            rsi_14: defined(strength[i]),
        }));
    }
    out
}

fn group_by_symbol(points: &[PricePoint]) -> Vec<Vec<PricePoint>> {
    let mut groups: Vec<Vec<PricePoint>> = Vec::new();
    for p in points {
        match groups.iter_mut().find(|g| g[0].symbol == p.symbol) {
            Some(g) => g.push(p.clone()),
            None => groups.push(vec![p.clone()]),
        }
    }
    groups
}

/// Create rows from close prices for testing.
///
/// open = prev close (or close for the first row),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_points(closes: &[f64]) -> Vec<PricePoint> {
    make_points_for("TEST", closes)
}

#[cfg(test)]
pub fn make_points_for(symbol: &str, closes: &[f64]) -> Vec<PricePoint> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PricePoint {
                symbol: symbol.to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
                is_stale: false,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_series_has_smas_but_no_rsi() {
        let rows = add_indicators(&make_points(&[150.0, 151.0, 152.0, 151.5, 152.5]));
        assert_eq!(rows.len(), 5);
        for row in &rows {
            assert!(row.sma_20.is_some());
            assert_eq!(row.sma_20, row.sma_50);
            assert!(row.rsi_14.is_none());
        }
        assert_approx(rows[4].sma_20.unwrap(), 151.4, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_appears_after_fourteen_deltas() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let rows = add_indicators(&make_points(&closes));
        assert!(rows[13].rsi_14.is_none());
        assert!(rows[14].rsi_14.is_some());
    }

    #[test]
    fn groups_by_symbol_and_sorts_by_date() {
        let mut a = make_points_for("AAA", &[1.0, 2.0, 3.0]);
        let b = make_points_for("BBB", &[10.0, 20.0]);
        a.reverse();
        let mixed = vec![a[0].clone(), b[0].clone(), a[1].clone(), b[1].clone(), a[2].clone()];

        let rows = add_indicators(&mixed);
        let order: Vec<(&str, f64)> = rows
            .iter()
            .map(|r| (r.point.symbol.as_str(), r.point.close))
            .collect();
        assert_eq!(
            order,
            vec![("AAA", 1.0), ("AAA", 2.0), ("AAA", 3.0), ("BBB", 10.0), ("BBB", 20.0)]
        );
        // Groups never mix: BBB's first SMA is its own close.
        assert_eq!(rows[3].sma_20, Some(10.0));
    }

    #[test]
    fn deterministic() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let points = make_points(&closes);
        assert_eq!(add_indicators(&points), add_indicators(&points));
    }

    #[test]
    fn truncation_does_not_change_past_values() {
        let closes: Vec<f64> = (0..70).map(|i| 100.0 + (i as f64 * 1.3).cos() * 4.0).collect();
        let full = add_indicators(&make_points(&closes));
        let cut = add_indicators(&make_points(&closes[..40]));
        assert_eq!(&full[..40], &cut[..]);
    }

    #[test]
    fn empty_input() {
        assert!(add_indicators(&[]).is_empty());
    }
}
