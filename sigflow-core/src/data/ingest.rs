//! Price ingestion with cache, retry, and fallback.
//!
//! For each symbol, in order:
//! 1. Fresh cache entry → use it, no network
//! 2. Live fetch through the retry policy (rate limited across symbols)
//! 3. Success → normalize, write the cache, emit rows with `is_stale = false`
//! 4. Failure → stale cache entry if one exists, flagged stale
//! 5. Otherwise → the fixed synthetic sample for that symbol, flagged stale
//!
//! The ingestor never fails a batch: every requested symbol yields rows.

use super::cache::{CacheLookup, PriceCache};
use super::provider::{DataError, DataSource, PriceProvider, RawBar};
use super::rate_limit::RateLimiter;
use super::synthetic::{sample_bars, SAMPLE_SYMBOL};
use crate::domain::PricePoint;
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use chrono::{Days, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Default minimum delay between live fetches.
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(200);

/// Fetch policy: 5 attempts, 2s backoff doubling to at most 10s, transient errors only.
pub fn default_fetch_policy() -> RetryPolicy<DataError> {
    RetryPolicy::new(5, Duration::from_secs(2), DataError::is_transient)
        .exponential(2, Duration::from_secs(10))
}

/// Normalized rows for a batch plus where each symbol's rows came from.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    pub rows: Vec<PricePoint>,
    pub sources: Vec<(String, DataSource)>,
}

impl PriceTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Symbols whose rows are flagged stale.
    pub fn stale_symbols(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|(_, src)| src.is_stale())
            .map(|(sym, _)| sym.as_str())
            .collect()
    }

    fn push(&mut self, symbol: &str, bars: &[RawBar], source: DataSource) {
        let stale = source.is_stale();
        self.rows
            .extend(bars.iter().map(|b| PricePoint::from_raw(symbol, b, stale)));
        self.sources.push((symbol.to_string(), source));
    }
}

pub struct PriceIngestor {
    cache: Arc<dyn PriceCache>,
    provider: Option<Arc<dyn PriceProvider>>,
    retry: RetryPolicy<DataError>,
    rate_limiter: RateLimiter,
    sleeper: Arc<dyn Sleeper>,
}

impl PriceIngestor {
    /// Offline ingestor: cache and fallback only, until a provider is attached.
    pub fn new(cache: Arc<dyn PriceCache>) -> Self {
        Self {
            cache,
            provider: None,
            retry: default_fetch_policy(),
            rate_limiter: RateLimiter::new(DEFAULT_RATE_LIMIT),
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn PriceProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy<DataError>) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rate_limit(mut self, min_interval: Duration) -> Self {
        self.rate_limiter = RateLimiter::new(min_interval);
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn is_offline(&self) -> bool {
        self.provider.is_none()
    }

    /// Fetch `lookback_days` of history ending today for each symbol.
    pub fn fetch_prices(&self, symbols: &[&str], lookback_days: u32) -> PriceTable {
        self.fetch_prices_until(symbols, lookback_days, Utc::now().date_naive())
    }

    /// Same as [`fetch_prices`](Self::fetch_prices) with an explicit end date.
    ///
    /// An empty symbol list yields the synthetic sample under `TEST`.
    pub fn fetch_prices_until(&self, symbols: &[&str], lookback_days: u32, end: NaiveDate) -> PriceTable {
        let mut table = PriceTable::default();

        if symbols.is_empty() {
            table.push(SAMPLE_SYMBOL, &sample_bars(end), DataSource::Synthetic);
            return table;
        }

        let start = end
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        for symbol in symbols {
            let (bars, source) = self.fetch_symbol(symbol, start, end);
            tracing::info!(symbol, rows = bars.len(), ?source, "prices resolved");
            table.push(symbol, &bars, source);
        }
        table
    }

    fn fetch_symbol(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> (Vec<RawBar>, DataSource) {
        let cached = match self.cache.load(symbol) {
            Ok(lookup) => lookup,
            Err(e) => {
                tracing::warn!(symbol, error = %e, "cache read failed, treating as absent");
                CacheLookup::Absent
            }
        };

        let stale = match cached {
            CacheLookup::Fresh(bars) => return (bars, DataSource::FreshCache),
            CacheLookup::Stale(bars) => Some(bars),
            CacheLookup::Absent => None,
        };

        match self.fetch_live(symbol, start, end) {
            Ok(bars) => {
                if let Err(e) = self.cache.save(symbol, &bars) {
                    tracing::warn!(symbol, error = %e, "cache write failed");
                }
                return (bars, DataSource::Live);
            }
            Err(e) => tracing::warn!(symbol, error = %e, "live fetch failed"),
        }

        match stale {
            Some(bars) => {
                tracing::warn!(symbol, "using expired cache entry");
                (bars, DataSource::StaleCache)
            }
            None => {
                tracing::warn!(symbol, "no cache available, substituting synthetic sample");
                (sample_bars(end), DataSource::Synthetic)
            }
        }
    }

    fn fetch_live(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<RawBar>, DataError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| DataError::Other("offline: no provider configured".into()))?;

        let bars = self.retry.run(self.sleeper.as_ref(), |attempt| {
            self.rate_limiter.acquire(self.sleeper.as_ref());
            tracing::debug!(symbol, attempt, provider = provider.name(), "live fetch");
            provider.history(symbol, start, end)
        })?;

        let bars = normalize(bars);
        if bars.is_empty() {
            return Err(DataError::EmptyResponse {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }
}

/// Sort by date, keep the last row per date, drop rows with unusable closes.
pub fn normalize(mut bars: Vec<RawBar>) -> Vec<RawBar> {
    bars.retain(|b| b.close.is_finite() && b.close > 0.0);
    // Stable sort keeps provider order within a date; the later row wins below.
    bars.sort_by_key(|b| b.date);
    let mut out: Vec<RawBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(prev) if prev.date == bar.date => *prev = bar,
            _ => out.push(bar),
        }
    }
    out
}
