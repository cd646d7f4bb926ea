//! SQLite store for prices and signals.
//!
//! Both tables are keyed by their natural key (`symbol, date` for prices,
//! `symbol, ts` for signals). Every write is an `INSERT ... ON CONFLICT DO
//! UPDATE` inside one transaction per batch: re-running a day overwrites its
//! rows, and a failing batch commits nothing.

mod schema;

use crate::domain::{PricePoint, Signal, SignalKind};
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use chrono::{NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, ErrorCode, Transaction};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Lock contention that may clear on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => {
                matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Store policy: 3 attempts, fixed 500 ms delay, lock contention only.
pub fn default_store_policy() -> RetryPolicy<StoreError> {
    RetryPolicy::new(3, Duration::from_millis(500), StoreError::is_transient)
}

impl ToSql for SignalKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SignalKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

pub struct SignalStore {
    conn: Connection,
    retry: RetryPolicy<StoreError>,
    sleeper: Arc<dyn Sleeper>,
}

impl SignalStore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(schema::SCHEMA_SQL)?;
        Ok(Self {
            conn,
            retry: default_store_policy(),
            sleeper: Arc::new(ThreadSleeper),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy<StoreError>) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// How long SQLite itself waits on a locked database before reporting busy.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
        self.conn.busy_timeout(timeout)?;
        Ok(())
    }

    pub fn upsert_prices(&mut self, rows: &[PricePoint]) -> Result<usize> {
        self.persist_batch(rows, &[])
    }

    pub fn upsert_signals(&mut self, rows: &[Signal]) -> Result<usize> {
        self.persist_batch(&[], rows)
    }

    /// Upsert prices and signals in a single transaction.
    ///
    /// Returns the number of rows written. Lock contention is retried per the
    /// store policy; any other failure, or exhaustion, rolls the batch back and
    /// is returned to the caller.
    pub fn persist_batch(&mut self, prices: &[PricePoint], signals: &[Signal]) -> Result<usize> {
        if prices.is_empty() && signals.is_empty() {
            return Ok(0);
        }

        let conn = &mut self.conn;
        let written = self.retry.run(self.sleeper.as_ref(), |attempt| {
            let tx = conn.transaction()?;
            let n = write_prices(&tx, prices)? + write_signals(&tx, signals)?;
            tx.commit()?;
            if attempt > 1 {
                tracing::info!(attempt, "store write succeeded after retry");
            }
            Ok(n)
        });

        match &written {
            Ok(n) => tracing::debug!(rows = n, "batch committed"),
            Err(e) => tracing::error!(error = %e, "batch rolled back"),
        }
        written
    }

    /// Most recent signals, newest first, at most `limit` rows.
    pub fn get_latest_signals(&self, limit: usize) -> Result<Vec<Signal>> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol, ts, signal, rsi, sma20, sma50, close, is_stale
             FROM signals ORDER BY ts DESC, symbol ASC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit_param(limit)], signal_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_signals_for_symbol(&self, symbol: &str, limit: usize) -> Result<Vec<Signal>> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol, ts, signal, rsi, sma20, sma50, close, is_stale
             FROM signals WHERE symbol = ?1 ORDER BY ts DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![symbol, limit_param(limit)], signal_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// All stored prices for a symbol, oldest first.
    pub fn get_prices(&self, symbol: &str) -> Result<Vec<PricePoint>> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol, date, open, high, low, close, volume, is_stale
             FROM prices WHERE symbol = ?1 ORDER BY date ASC",
        )?;
        let rows = stmt
            .query_map(params![symbol], |row| {
                Ok(PricePoint {
                    symbol: row.get(0)?,
                    date: row.get::<_, NaiveDate>(1)?,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    volume: row.get::<_, i64>(6)?.max(0) as u64,
                    is_stale: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn count_prices(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM prices")
    }

    pub fn count_signals(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM signals")
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n.max(0) as usize)
    }
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn signal_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Signal> {
    Ok(Signal {
        symbol: row.get(0)?,
        ts: row.get(1)?,
        signal: row.get(2)?,
        rsi: row.get(3)?,
        sma20: row.get(4)?,
        sma50: row.get(5)?,
        close: row.get(6)?,
        is_stale: row.get(7)?,
    })
}

fn write_prices(tx: &Transaction<'_>, rows: &[PricePoint]) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }
    let now = Utc::now();
    let mut stmt = tx.prepare_cached(
        "INSERT INTO prices (symbol, date, open, high, low, close, volume, is_stale, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(symbol, date) DO UPDATE SET
             open = excluded.open,
             high = excluded.high,
             low = excluded.low,
             close = excluded.close,
             volume = excluded.volume,
             is_stale = excluded.is_stale,
             updated_at = excluded.updated_at",
    )?;
    for p in rows {
        stmt.execute(params![
            p.symbol,
            p.date,
            p.open,
            p.high,
            p.low,
            p.close,
            i64::try_from(p.volume).unwrap_or(i64::MAX),
            p.is_stale,
            now,
        ])?;
    }
    Ok(rows.len())
}

fn write_signals(tx: &Transaction<'_>, rows: &[Signal]) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }
    let now = Utc::now();
    let mut stmt = tx.prepare_cached(
        "INSERT INTO signals (symbol, ts, signal, rsi, sma20, sma50, close, is_stale, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(symbol, ts) DO UPDATE SET
             signal = excluded.signal,
             rsi = excluded.rsi,
             sma20 = excluded.sma20,
             sma50 = excluded.sma50,
             close = excluded.close,
             is_stale = excluded.is_stale,
             updated_at = excluded.updated_at",
    )?;
    for s in rows {
        stmt.execute(params![
            s.symbol, s.ts, s.signal, s.rsi, s.sma20, s.sma50, s.close, s.is_stale, now,
        ])?;
    }
    Ok(rows.len())
}
