//! Signal records produced by the classifier.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete trading decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Buy => "buy",
            SignalKind::Sell => "sell",
            SignalKind::Hold => "hold",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal kind '{0}'")]
pub struct ParseSignalKindError(pub String);

impl FromStr for SignalKind {
    type Err = ParseSignalKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(SignalKind::Buy),
            "sell" => Ok(SignalKind::Sell),
            "hold" => Ok(SignalKind::Hold),
            other => Err(ParseSignalKindError(other.to_string())),
        }
    }
}

/// One decision record per `(symbol, ts)`.
///
/// Indicator fields are `None` when the row was still inside the warm-up window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub ts: NaiveDate,
    pub signal: SignalKind,
    pub rsi: Option<f64>,
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub close: f64,
    pub is_stale: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_its_own_display() {
        for kind in [SignalKind::Buy, SignalKind::Sell, SignalKind::Hold] {
            assert_eq!(kind.to_string().parse::<SignalKind>().unwrap(), kind);
        }
    }

    #[test]
    fn kind_rejects_unknown() {
        let err = "short".parse::<SignalKind>().unwrap_err();
        assert_eq!(err.0, "short");
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SignalKind::Sell).unwrap(), "\"sell\"");
    }
}
