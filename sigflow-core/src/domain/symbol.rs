//! Request validation for ticker symbols and lookback windows.

use thiserror::Error;

/// Longest accepted ticker.
pub const MAX_SYMBOL_LEN: usize = 5;

/// Longest accepted lookback, in calendar days.
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid symbol '{0}': expected 1-{MAX_SYMBOL_LEN} upper-case letters")]
    InvalidSymbol(String),

    #[error("too many symbols: {count} requested, at most {max} allowed")]
    TooManySymbols { count: usize, max: usize },

    #[error("lookback_days must be between 1 and {MAX_LOOKBACK_DAYS}, got {0}")]
    LookbackOutOfRange(u32),
}

/// Check that a ticker is 1-5 ASCII upper-case letters.
pub fn validate_symbol(symbol: &str) -> Result<(), ValidationError> {
    let ok = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol.bytes().all(|b| b.is_ascii_uppercase());
    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidSymbol(symbol.to_string()))
    }
}

pub fn validate_lookback(days: u32) -> Result<(), ValidationError> {
    if (1..=MAX_LOOKBACK_DAYS).contains(&days) {
        Ok(())
    } else {
        Err(ValidationError::LookbackOutOfRange(days))
    }
}
