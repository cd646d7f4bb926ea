//! SigFlow Core: price ingestion, indicators, signal classification, storage.
//!
//! - Domain types (price points, signals, symbol validation)
//! - Data layer: providers, JSON cache, circuit breaker, rate limiter, ingestor
//! - Indicators: SMA(20), SMA(50), RSI(14)
//! - Decision-table classifier
//! - SQLite store with idempotent upserts
//! - Retry policies shared by the ingestor and the store

pub mod data;
pub mod domain;
pub mod indicators;
pub mod retry;
pub mod signals;
pub mod store;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types that cross thread boundaries are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::PricePoint>();
        require_sync::<domain::PricePoint>();
        require_send::<domain::Signal>();
        require_sync::<domain::Signal>();
        require_send::<indicators::IndicatorRow>();
        require_sync::<indicators::IndicatorRow>();

        require_send::<data::FileCache>();
        require_sync::<data::FileCache>();
        require_send::<data::MemoryCache>();
        require_sync::<data::MemoryCache>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::PriceIngestor>();
        require_sync::<data::PriceIngestor>();

        require_send::<store::SignalStore>();
    }
}
