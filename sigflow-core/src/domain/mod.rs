//! Domain types for SigFlow

pub mod price;
pub mod signal;
pub mod symbol;

pub use price::PricePoint;
pub use signal::{Signal, SignalKind};
pub use symbol::{validate_lookback, validate_symbol, ValidationError};
