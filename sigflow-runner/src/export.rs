//! Signal export as CSV or JSON.
//!
//! Missing indicator values are empty CSV fields and JSON `null`s.

use anyhow::{Context, Result};
use sigflow_core::domain::Signal;

pub const CSV_HEADER: [&str; 8] = ["symbol", "ts", "signal", "rsi", "sma20", "sma50", "close", "is_stale"];

fn opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// One row per signal, in the order given.
pub fn signals_to_csv(signals: &[Signal]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for s in signals {
        wtr.write_record(&[
            s.symbol.clone(),
            s.ts.format("%Y-%m-%d").to_string(),
            s.signal.to_string(),
            opt(s.rsi),
            opt(s.sma20),
            opt(s.sma50),
            s.close.to_string(),
            s.is_stale.to_string(),
        ])?;
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Pretty JSON array of signals.
pub fn signals_to_json(signals: &[Signal]) -> Result<String> {
    serde_json::to_string_pretty(signals).context("failed to serialize signals to JSON")
}
