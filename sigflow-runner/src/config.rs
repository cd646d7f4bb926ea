//! Pipeline configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid config.
//!
//! ```toml
//! cache_dir = "data/cache"
//! db_path = "data/sigflow.db"
//! lookback_days = 120
//! offline = false
//!
//! [fetch_retry]
//! max_attempts = 5
//! initial_backoff_ms = 2000
//! max_backoff_ms = 10000
//! multiplier = 2
//! ```

use serde::{Deserialize, Serialize};
use sigflow_core::data::DataError;
use sigflow_core::domain::symbol::MAX_LOOKBACK_DAYS;
use sigflow_core::retry::RetryPolicy;
use sigflow_core::store::StoreError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Retry schedule as it appears in config files. A partial table keeps the
/// preset of the table it appears in for the keys it leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: u32,
}

impl RetrySettings {
    pub const FETCH: Self = Self {
        max_attempts: 5,
        initial_backoff_ms: 2_000,
        max_backoff_ms: 10_000,
        multiplier: 2,
    };

    pub const STORE: Self = Self {
        max_attempts: 3,
        initial_backoff_ms: 500,
        max_backoff_ms: 500,
        multiplier: 1,
    };

    /// Build a policy that retries errors matching `retryable`.
    pub fn policy<E>(&self, retryable: fn(&E) -> bool) -> RetryPolicy<E> {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            retryable,
        )
        .exponential(self.multiplier, Duration::from_millis(self.max_backoff_ms))
    }

    pub fn fetch_policy(&self) -> RetryPolicy<DataError> {
        self.policy(DataError::is_transient)
    }

    pub fn store_policy(&self) -> RetryPolicy<StoreError> {
        self.policy(StoreError::is_transient)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RetryOverrides {
    max_attempts: Option<u32>,
    initial_backoff_ms: Option<u64>,
    max_backoff_ms: Option<u64>,
    multiplier: Option<u32>,
}

impl RetryOverrides {
    fn over(self, preset: RetrySettings) -> RetrySettings {
        RetrySettings {
            max_attempts: self.max_attempts.unwrap_or(preset.max_attempts),
            initial_backoff_ms: self.initial_backoff_ms.unwrap_or(preset.initial_backoff_ms),
            max_backoff_ms: self.max_backoff_ms.unwrap_or(preset.max_backoff_ms),
            multiplier: self.multiplier.unwrap_or(preset.multiplier),
        }
    }
}

fn fetch_retry<'de, D: serde::Deserializer<'de>>(d: D) -> Result<RetrySettings, D::Error> {
    RetryOverrides::deserialize(d).map(|o| o.over(RetrySettings::FETCH))
}

fn store_retry<'de, D: serde::Deserializer<'de>>(d: D) -> Result<RetrySettings, D::Error> {
    RetryOverrides::deserialize(d).map(|o| o.over(RetrySettings::STORE))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory holding one JSON cache file per symbol.
    pub cache_dir: PathBuf,
    /// SQLite database file.
    pub db_path: PathBuf,
    pub cache_ttl_secs: u64,
    pub lookback_days: u32,
    /// Upper bound on symbols per run.
    pub max_symbols: usize,
    /// Most recent signals emitted per symbol per run.
    pub signals_per_symbol: usize,
    /// Minimum delay between live fetches.
    pub rate_limit_ms: u64,
    #[serde(deserialize_with = "fetch_retry")]
    pub fetch_retry: RetrySettings,
    #[serde(deserialize_with = "store_retry")]
    pub store_retry: RetrySettings,
    /// Skip the live provider: cache and fallback only.
    pub offline: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data/cache"),
            db_path: PathBuf::from("data/sigflow.db"),
            cache_ttl_secs: 600,
            lookback_days: 120,
            max_symbols: 50,
            signals_per_symbol: 5,
            rate_limit_ms: 200,
            fetch_retry: RetrySettings::FETCH,
            store_retry: RetrySettings::STORE,
            offline: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lookback_days == 0 || self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(ConfigError::Invalid {
                field: "lookback_days",
                reason: format!("must be in 1..={MAX_LOOKBACK_DAYS}, got {}", self.lookback_days),
            });
        }
        if self.max_symbols == 0 {
            return Err(ConfigError::Invalid {
                field: "max_symbols",
                reason: "must be at least 1".into(),
            });
        }
        for (field, retry) in [("fetch_retry", &self.fetch_retry), ("store_retry", &self.store_retry)] {
            if retry.max_attempts == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "max_attempts must be at least 1".into(),
                });
            }
            if retry.max_backoff_ms < retry.initial_backoff_ms {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "max_backoff_ms is below initial_backoff_ms".into(),
                });
            }
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }
}
