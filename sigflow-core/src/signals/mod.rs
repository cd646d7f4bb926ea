//! Signal classification.
//!
//! The classifier is a pure decision table over three precomputed values.
//! It keeps no state between rows.
//!
//! | trend (sma_20 - sma_50) | rsi < 30 | 30 ≤ rsi ≤ 70 | rsi > 70 |
//! |-------------------------|----------|---------------|----------|
//! | > 0                     | buy      | buy           | hold     |
//! | < 0                     | hold     | sell          | sell     |
//! | == 0                    | hold     | hold          | hold     |
//!
//! Any missing input (warm-up) is `hold`.

use crate::domain::{Signal, SignalKind};
use crate::indicators::IndicatorRow;
use std::cmp::Ordering;

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;

/// Signals emitted per symbol per run by default.
pub const DEFAULT_SIGNALS_PER_SYMBOL: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsiZone {
    Oversold,
    Neutral,
    Overbought,
}

impl RsiZone {
    pub fn of(rsi: f64) -> Self {
        if rsi < RSI_OVERSOLD {
            RsiZone::Oversold
        } else if rsi > RSI_OVERBOUGHT {
            RsiZone::Overbought
        } else {
            RsiZone::Neutral
        }
    }
}

/// Map indicator state to a signal.
pub fn classify(sma_20: Option<f64>, sma_50: Option<f64>, rsi_14: Option<f64>) -> SignalKind {
    let (Some(fast), Some(slow), Some(rsi)) = (sma_20, sma_50, rsi_14) else {
        return SignalKind::Hold;
    };

    let Some(trend) = (fast - slow).partial_cmp(&0.0) else {
        return SignalKind::Hold;
    };
    if rsi.is_nan() {
        return SignalKind::Hold;
    }

    match (trend, RsiZone::of(rsi)) {
        (Ordering::Greater, RsiZone::Overbought) => SignalKind::Hold,
        (Ordering::Greater, _) => SignalKind::Buy,
        (Ordering::Less, RsiZone::Oversold) => SignalKind::Hold,
        (Ordering::Less, _) => SignalKind::Sell,
        (Ordering::Equal, _) => SignalKind::Hold,
    }
}

pub fn classify_row(row: &IndicatorRow) -> Signal {
    Signal {
        symbol: row.point.symbol.clone(),
        ts: row.point.date,
        signal: classify(row.sma_20, row.sma_50, row.rsi_14),
        rsi: row.rsi_14,
        sma20: row.sma_20,
        sma50: row.sma_50,
        close: row.point.close,
        is_stale: row.point.is_stale,
    }
}

/// Classify the most recent `per_symbol` rows of each symbol.
///
/// `rows` must be grouped by symbol and date-ordered within each group, as
/// `add_indicators` produces them. Warm-up rows among the tail classify as hold.
pub fn generate_signals(rows: &[IndicatorRow], per_symbol: usize) -> Vec<Signal> {
    let mut signals = Vec::new();
    let mut start = 0;
    while start < rows.len() {
        let symbol = &rows[start].point.symbol;
        let end = rows[start..]
            .iter()
            .position(|r| &r.point.symbol != symbol)
            .map_or(rows.len(), |off| start + off);

        let tail_start = end.saturating_sub(per_symbol).max(start);
        signals.extend(rows[tail_start..end].iter().map(classify_row));
        start = end;
    }
    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{add_indicators, make_points, make_points_for};

    #[test]
    fn decision_table() {
        use SignalKind::*;
        let cases = [
            ((101.0, 100.0), 25.0, Buy),
            ((101.0, 100.0), 50.0, Buy),
            ((101.0, 100.0), 75.0, Hold),
            ((99.0, 100.0), 25.0, Hold),
            ((99.0, 100.0), 50.0, Sell),
            ((99.0, 100.0), 75.0, Sell),
            ((100.0, 100.0), 25.0, Hold),
            ((100.0, 100.0), 50.0, Hold),
            ((100.0, 100.0), 75.0, Hold),
        ];
        for ((fast, slow), rsi, expected) in cases {
            assert_eq!(
                classify(Some(fast), Some(slow), Some(rsi)),
                expected,
                "fast={fast} slow={slow} rsi={rsi}"
            );
        }
    }

    #[test]
    fn zone_boundaries_are_neutral() {
        assert_eq!(RsiZone::of(30.0), RsiZone::Neutral);
        assert_eq!(RsiZone::of(70.0), RsiZone::Neutral);
        assert_eq!(classify(Some(2.0), Some(1.0), Some(70.0)), SignalKind::Buy);
        assert_eq!(classify(Some(1.0), Some(2.0), Some(30.0)), SignalKind::Sell);
    }

    #[test]
    fn missing_inputs_hold() {
        assert_eq!(classify(None, Some(1.0), Some(10.0)), SignalKind::Hold);
        assert_eq!(classify(Some(2.0), None, Some(10.0)), SignalKind::Hold);
        assert_eq!(classify(Some(2.0), Some(1.0), None), SignalKind::Hold);
        assert_eq!(classify(Some(f64::NAN), Some(1.0), Some(50.0)), SignalKind::Hold);
        assert_eq!(classify(Some(2.0), Some(1.0), Some(f64::NAN)), SignalKind::Hold);
    }

    #[test]
    fn sample_series_is_all_hold() {
        let rows = add_indicators(&make_points(&[150.0, 151.0, 152.0, 151.5, 152.5]));
        let signals = generate_signals(&rows, DEFAULT_SIGNALS_PER_SYMBOL);
        assert_eq!(signals.len(), 5);
        assert!(signals.iter().all(|s| s.signal == SignalKind::Hold));
        assert!(signals.iter().all(|s| s.rsi.is_none()));
    }

    #[test]
    fn keeps_only_recent_rows_per_symbol() {
        let mut points = make_points_for("AAA", &(0..30).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        points.extend(make_points_for("BBB", &[10.0, 11.0]));
        let rows = add_indicators(&points);

        let signals = generate_signals(&rows, 5);
        let per: Vec<&str> = signals.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(per, vec!["AAA", "AAA", "AAA", "AAA", "AAA", "BBB", "BBB"]);
        assert_eq!(signals[4].ts, rows[29].point.date);
        assert_eq!(signals[0].ts, rows[25].point.date);
    }

    #[test]
    fn uptrend_near_saturated_rsi_holds() {
        // Rising closes: sma_20 > sma_50 and RSI ≈ 100, so overbought in an uptrend.
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let rows = add_indicators(&make_points(&closes));
        let signals = generate_signals(&rows, 1);
        assert_eq!(signals[0].signal, SignalKind::Hold);
        assert!(signals[0].rsi.unwrap() > 99.0);
    }

    #[test]
    fn downtrend_with_relief_rally_sells() {
        // Falling for 50 days, then a choppy stretch: trend negative, RSI mid-range.
        let mut closes: Vec<f64> = (0..50).map(|i| 200.0 - i as f64).collect();
        for i in 0..14 {
            closes.push(if i % 2 == 0 { 152.0 } else { 151.0 });
        }
        let rows = add_indicators(&make_points(&closes));
        let last = generate_signals(&rows, 1).remove(0);
        let rsi = last.rsi.unwrap();
        assert!((RSI_OVERSOLD..=RSI_OVERBOUGHT).contains(&rsi), "rsi={rsi}");
        assert!(last.sma20.unwrap() < last.sma50.unwrap());
        assert_eq!(last.signal, SignalKind::Sell);
    }

    #[test]
    fn zero_per_symbol_emits_nothing() {
        let rows = add_indicators(&make_points(&[1.0, 2.0]));
        assert!(generate_signals(&rows, 0).is_empty());
    }
}
