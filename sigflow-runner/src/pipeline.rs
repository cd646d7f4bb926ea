//! Pipeline orchestrator: validate, ingest, compute, classify, persist.
//!
//! One call to [`Pipeline::run`] processes one batch synchronously under a
//! fresh correlation id. Fetch problems degrade to stale or synthetic rows
//! inside the ingestor; only validation and storage failures fail a run.

use crate::context::PipelineContext;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sigflow_core::domain::{validate_lookback, validate_symbol, ValidationError};
use sigflow_core::indicators::add_indicators;
use sigflow_core::signals::generate_signals;
use sigflow_core::store::StoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid request: {source}")]
    Validation {
        correlation_id: String,
        #[source]
        source: ValidationError,
    },

    #[error("storage failed: {source}")]
    Storage {
        correlation_id: String,
        #[source]
        source: StoreError,
    },
}

impl RunError {
    pub fn correlation_id(&self) -> &str {
        match self {
            RunError::Validation { correlation_id, .. } | RunError::Storage { correlation_id, .. } => {
                correlation_id
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Tickers in processing order. Duplicates are processed once.
    pub symbols: Vec<String>,
    /// Calendar days of history; the config value when absent.
    #[serde(default)]
    pub lookback_days: Option<u32>,
    /// Last day of the window; today (UTC) when absent.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl RunRequest {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = Some(days);
        self
    }

    pub fn end_date(mut self, end: NaiveDate) -> Self {
        self.end_date = Some(end);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub correlation_id: String,
    pub symbols_processed: usize,
    pub signals_generated: usize,
    /// Symbols served from a stale cache entry or the synthetic sample.
    pub stale_symbols: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct Pipeline {
    ctx: PipelineContext,
}

impl Pipeline {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    pub fn into_context(self) -> PipelineContext {
        self.ctx
    }

    pub fn run(&mut self, request: &RunRequest) -> Result<RunSummary, RunError> {
        let correlation_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("run", correlation_id = %correlation_id);
        let _guard = span.enter();

        let result = self.run_inner(request, &correlation_id);
        match &result {
            Ok(summary) => tracing::info!(
                symbols = summary.symbols_processed,
                signals = summary.signals_generated,
                stale = summary.stale_symbols.len(),
                "run complete"
            ),
            Err(e) => tracing::error!(error = %e, "run failed"),
        }
        result
    }

    fn run_inner(&mut self, request: &RunRequest, correlation_id: &str) -> Result<RunSummary, RunError> {
        let lookback = request.lookback_days.unwrap_or(self.ctx.config.lookback_days);
        let symbols = validate_request(&request.symbols, lookback, self.ctx.config.max_symbols).map_err(
            |source| RunError::Validation {
                correlation_id: correlation_id.to_string(),
                source,
            },
        )?;

        let mut summary = RunSummary {
            status: RunStatus::Success,
            correlation_id: correlation_id.to_string(),
            symbols_processed: 0,
            signals_generated: 0,
            stale_symbols: Vec::new(),
            timestamp: Utc::now(),
        };
        if symbols.is_empty() {
            tracing::info!("empty batch, nothing to do");
            return Ok(summary);
        }

        let end = request.end_date.unwrap_or_else(|| Utc::now().date_naive());
        tracing::info!(count = symbols.len(), lookback, %end, "ingesting prices");
        let table = self.ctx.ingestor.fetch_prices_until(&symbols, lookback, end);

        let rows = add_indicators(&table.rows);
        let signals = generate_signals(&rows, self.ctx.config.signals_per_symbol);
        tracing::debug!(prices = table.rows.len(), signals = signals.len(), "signals computed");

        self.ctx
            .store
            .persist_batch(&table.rows, &signals)
            .map_err(|source| RunError::Storage {
                correlation_id: correlation_id.to_string(),
                source,
            })?;

        summary.symbols_processed = table.sources.len();
        summary.signals_generated = signals.len();
        summary.stale_symbols = table.stale_symbols().into_iter().map(String::from).collect();
        summary.timestamp = Utc::now();
        Ok(summary)
    }
}

/// Check every symbol and the lookback, dropping repeated symbols (first wins).
pub fn validate_request(
    symbols: &[String],
    lookback_days: u32,
    max_symbols: usize,
) -> Result<Vec<&str>, ValidationError> {
    validate_lookback(lookback_days)?;

    let mut unique: Vec<&str> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        validate_symbol(symbol)?;
        if !unique.contains(&symbol.as_str()) {
            unique.push(symbol);
        }
    }
    if unique.len() > max_symbols {
        return Err(ValidationError::TooManySymbols {
            count: unique.len(),
            max: max_symbols,
        });
    }
    Ok(unique)
}
