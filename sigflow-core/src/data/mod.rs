//! Price data: providers, cache, and ingestion

pub mod cache;
pub mod circuit_breaker;
pub mod ingest;
pub mod provider;
pub mod rate_limit;
pub mod synthetic;
pub mod yahoo;

pub use cache::{CacheLookup, CacheStatus, FileCache, MemoryCache, PriceCache, DEFAULT_TTL};
pub use circuit_breaker::{CircuitBreaker, DEFAULT_COOLDOWN, DEFAULT_THRESHOLD};
pub use ingest::{default_fetch_policy, PriceIngestor, PriceTable, DEFAULT_RATE_LIMIT};
pub use provider::{DataError, DataSource, PriceProvider, RawBar};
pub use rate_limit::RateLimiter;
pub use yahoo::YahooProvider;
