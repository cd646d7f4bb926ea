//! Process-wide pipeline context.
//!
//! Built once at startup from a [`PipelineConfig`] and passed explicitly to
//! everything that needs the ingestor or the store. Nothing here is global.

use crate::config::PipelineConfig;
use sigflow_core::data::{CircuitBreaker, DataError, FileCache, PriceCache, PriceIngestor, YahooProvider};
use sigflow_core::store::{SignalStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to build price provider: {0}")]
    Provider(#[from] DataError),

    #[error("failed to open store: {0}")]
    Store(#[from] StoreError),
}

pub struct PipelineContext {
    pub config: PipelineConfig,
    pub ingestor: PriceIngestor,
    pub store: SignalStore,
}

impl PipelineContext {
    /// Wire the file cache, the Yahoo provider (unless offline), and the
    /// SQLite store described by `config`.
    pub fn from_config(config: PipelineConfig) -> Result<Self, ContextError> {
        let cache = Arc::new(FileCache::with_ttl(&config.cache_dir, config.cache_ttl()));
        let mut ingestor = PriceIngestor::new(cache)
            .with_retry(config.fetch_retry.fetch_policy())
            .with_rate_limit(config.rate_limit());

        if config.offline {
            tracing::info!("offline mode: live provider disabled");
        } else {
            let breaker = Arc::new(CircuitBreaker::for_retry_budget(config.fetch_retry.max_attempts));
            ingestor = ingestor.with_provider(Arc::new(YahooProvider::new(breaker)?));
        }

        let store = SignalStore::open(&config.db_path)?.with_retry(config.store_retry.store_policy());
        tracing::debug!(
            cache_dir = %config.cache_dir.display(),
            db_path = %config.db_path.display(),
            "pipeline context ready"
        );

        Ok(Self { config, ingestor, store })
    }

    /// Assemble a context from prebuilt parts (custom caches, fake providers).
    pub fn from_parts(config: PipelineConfig, ingestor: PriceIngestor, store: SignalStore) -> Self {
        Self { config, ingestor, store }
    }

    /// Offline context over an arbitrary cache and an in-memory store.
    pub fn in_memory(config: PipelineConfig, cache: Arc<dyn PriceCache>) -> Result<Self, ContextError> {
        let ingestor = PriceIngestor::new(cache).with_retry(config.fetch_retry.fetch_policy());
        let store = SignalStore::open_in_memory()?.with_retry(config.store_retry.store_policy());
        Ok(Self { config, ingestor, store })
    }
}
