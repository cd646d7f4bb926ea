//! Fixed fallback series used when neither the provider nor the cache has data.
//!
//! The series is small and deterministic: five daily closes ending on the
//! requested end date. It is always flagged stale by the ingestor.

use super::provider::RawBar;
use chrono::{Duration, NaiveDate};

/// Symbol used when the fallback sample is returned for an empty request.
pub const SAMPLE_SYMBOL: &str = "TEST";

/// Closing prices of the fallback sample, oldest first.
pub const SAMPLE_CLOSES: [f64; 5] = [150.0, 151.0, 152.0, 151.5, 152.5];

const SAMPLE_VOLUME: u64 = 1_000_000;

/// Build the fallback bars, one per calendar day, the last one dated `end`.
///
/// open = previous close (or close for the first bar),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0.
pub fn sample_bars(end: NaiveDate) -> Vec<RawBar> {
    let n = SAMPLE_CLOSES.len() as i64;
    SAMPLE_CLOSES
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { SAMPLE_CLOSES[i - 1] };
            RawBar {
                date: end - Duration::days(n - 1 - i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: SAMPLE_VOLUME,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_ends_on_requested_day() {
        let end = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let bars = sample_bars(end);
        assert_eq!(bars.len(), 5);
        assert_eq!(bars.last().unwrap().date, end);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        for w in bars.windows(2) {
            assert!(w[0].date < w[1].date);
        }
    }

    #[test]
    fn sample_closes_and_ranges() {
        let bars = sample_bars(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap());
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, SAMPLE_CLOSES.to_vec());
        for b in &bars {
            assert!(b.high >= b.open.max(b.close));
            assert!(b.low <= b.open.min(b.close));
            assert!(b.low > 0.0);
        }
    }
}
