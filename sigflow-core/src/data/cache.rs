//! Per-symbol price cache with a time-to-live.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}.json`
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Freshness derived from the `saved_at` stamp; expired entries are still
//!   returned, tagged stale, so callers can use them as a last resort
//! - Integrity check on load (BLAKE3 hash of the bars); corrupt entries are
//!   quarantined as `{filename}.quarantined` and reported absent

use super::provider::{DataError, RawBar};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Default freshness window.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Fresh(Vec<RawBar>),
    Stale(Vec<RawBar>),
    Absent,
}

impl CacheLookup {
    fn classify(bars: Vec<RawBar>, saved_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> Self {
        if is_fresh(saved_at, now, ttl) {
            CacheLookup::Fresh(bars)
        } else {
            CacheLookup::Stale(bars)
        }
    }
}

/// Fresh iff `now - saved_at < ttl`. Entries stamped in the future count as fresh.
fn is_fresh(saved_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match (now - saved_at).to_std() {
        Ok(age) => age < ttl,
        Err(_) => true,
    }
}

/// Key-value view of the price cache used by the ingestor.
pub trait PriceCache: Send + Sync {
    fn load(&self, symbol: &str) -> Result<CacheLookup, DataError>;

    /// Replace the entry for `symbol`. Empty series are rejected.
    fn save(&self, symbol: &str, bars: &[RawBar]) -> Result<(), DataError>;
}

/// On-disk cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub symbol: String,
    pub saved_at: DateTime<Utc>,
    pub data_hash: String,
    pub bars: Vec<RawBar>,
}

impl CacheEntry {
    fn new(symbol: &str, bars: &[RawBar], saved_at: DateTime<Utc>) -> Result<Self, DataError> {
        Ok(Self {
            symbol: symbol.to_string(),
            saved_at,
            data_hash: hash_bars(bars)?,
            bars: bars.to_vec(),
        })
    }
}

fn hash_bars(bars: &[RawBar]) -> Result<String, DataError> {
    let bytes = serde_json::to_vec(bars)
        .map_err(|e| DataError::CacheError(format!("hash serialization: {e}")))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// File-backed cache, one JSON document per symbol.
pub struct FileCache {
    cache_dir: PathBuf,
    ttl: Duration,
}

impl FileCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self::with_ttl(cache_dir, DEFAULT_TTL)
    }

    pub fn with_ttl(cache_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ttl,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entry_path(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("symbol={symbol}.json"))
    }

    /// Read and verify an entry. `Some(Err(reason))` is an entry that exists
    /// but failed parsing or its hash check.
    fn read_verified(&self, symbol: &str) -> Result<Option<Result<CacheEntry, String>>, DataError> {
        let path = self.entry_path(symbol);
        let content = match fs::read(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DataError::CacheError(format!("read {}: {e}", path.display()))),
        };

        let verified = serde_json::from_slice::<CacheEntry>(&content)
            .map_err(|e| format!("parse: {e}"))
            .and_then(|entry| match hash_bars(&entry.bars) {
                Ok(h) if h == entry.data_hash && !entry.bars.is_empty() => Ok(entry),
                Ok(_) => Err("hash mismatch or empty series".to_string()),
                Err(e) => Err(e.to_string()),
            });
        Ok(Some(verified))
    }

    /// Read an entry for use, moving a corrupt file aside.
    fn read_entry(&self, symbol: &str) -> Result<Option<CacheEntry>, DataError> {
        match self.read_verified(symbol)? {
            Some(Ok(entry)) => Ok(Some(entry)),
            Some(Err(reason)) => {
                let path = self.entry_path(symbol);
                let quarantine = path.with_extension("json.quarantined");
                tracing::warn!(
                    path = %path.display(),
                    %reason,
                    "quarantining corrupt cache entry"
                );
                let _ = fs::rename(&path, &quarantine);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Read an entry for reporting. Corrupt files are left where they are.
    fn peek_entry(&self, symbol: &str) -> Result<Option<CacheEntry>, DataError> {
        Ok(match self.read_verified(symbol)? {
            Some(Ok(entry)) => Some(entry),
            Some(Err(reason)) => {
                tracing::debug!(symbol, %reason, "unreadable cache entry");
                None
            }
            None => None,
        })
    }

    /// Load relative to an explicit clock reading.
    pub fn load_at(&self, symbol: &str, now: DateTime<Utc>) -> Result<CacheLookup, DataError> {
        Ok(match self.read_entry(symbol)? {
            Some(entry) => CacheLookup::classify(entry.bars, entry.saved_at, now, self.ttl),
            None => CacheLookup::Absent,
        })
    }

    /// Write with an explicit `saved_at` stamp.
    pub fn save_at(&self, symbol: &str, bars: &[RawBar], saved_at: DateTime<Utc>) -> Result<(), DataError> {
        if bars.is_empty() {
            return Err(DataError::CacheError("no bars to cache".into()));
        }

        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let entry = CacheEntry::new(symbol, bars, saved_at)?;
        let json = serde_json::to_vec(&entry)
            .map_err(|e| DataError::CacheError(format!("entry serialization: {e}")))?;

        let path = self.entry_path(symbol);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| DataError::CacheError(format!("write {}: {e}", tmp_path.display())))?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        tracing::debug!(symbol, bars = bars.len(), "cache entry written");
        Ok(())
    }

    /// Cache status for each symbol. Read-only: corrupt entries report as
    /// absent and stay on disk.
    pub fn status(&self, symbols: &[&str]) -> Result<Vec<CacheStatus>, DataError> {
        let now = Utc::now();
        symbols
            .iter()
            .map(|sym| {
                let entry = self.peek_entry(sym)?;
                Ok(CacheStatus {
                    symbol: sym.to_string(),
                    saved_at: entry.as_ref().map(|e| e.saved_at),
                    bar_count: entry.as_ref().map_or(0, |e| e.bars.len()),
                    fresh: entry
                        .as_ref()
                        .is_some_and(|e| is_fresh(e.saved_at, now, self.ttl)),
                })
            })
            .collect()
    }

    /// Symbols that currently have an entry on disk, sorted.
    pub fn cached_symbols(&self) -> Result<Vec<String>, DataError> {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DataError::CacheError(format!("read dir: {e}"))),
        };

        let mut symbols: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                name.strip_prefix("symbol=")
                    .and_then(|rest| rest.strip_suffix(".json"))
                    .map(str::to_string)
            })
            .collect();
        symbols.sort();
        Ok(symbols)
    }

    /// Remove a symbol's entry. Returns false if there was none.
    pub fn clear(&self, symbol: &str) -> Result<bool, DataError> {
        match fs::remove_file(self.entry_path(symbol)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DataError::CacheError(format!("remove: {e}"))),
        }
    }
}

impl PriceCache for FileCache {
    fn load(&self, symbol: &str) -> Result<CacheLookup, DataError> {
        self.load_at(symbol, Utc::now())
    }

    fn save(&self, symbol: &str, bars: &[RawBar]) -> Result<(), DataError> {
        self.save_at(symbol, bars, Utc::now())
    }
}

/// Cache status for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol: String,
    pub saved_at: Option<DateTime<Utc>>,
    pub bar_count: usize,
    pub fresh: bool,
}

/// In-memory cache, for tests and offline tooling.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (DateTime<Utc>, Vec<RawBar>)>>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Insert with an explicit `saved_at` stamp, e.g. to seed an expired entry.
    pub fn insert_at(&self, symbol: &str, bars: Vec<RawBar>, saved_at: DateTime<Utc>) {
        self.entries
            .lock()
            .unwrap()
            .insert(symbol.to_string(), (saved_at, bars));
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.lock().unwrap().contains_key(symbol)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl PriceCache for MemoryCache {
    fn load(&self, symbol: &str) -> Result<CacheLookup, DataError> {
        let entries = self.entries.lock().unwrap();
        Ok(match entries.get(symbol) {
            Some((saved_at, bars)) => CacheLookup::classify(bars.clone(), *saved_at, Utc::now(), self.ttl),
            None => CacheLookup::Absent,
        })
    }

    fn save(&self, symbol: &str, bars: &[RawBar]) -> Result<(), DataError> {
        if bars.is_empty() {
            return Err(DataError::CacheError("no bars to cache".into()));
        }
        self.insert_at(symbol, bars.to_vec(), Utc::now());
        Ok(())
    }
}
