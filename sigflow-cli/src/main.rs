//! SigFlow CLI: run the pipeline and inspect what it stored.
//!
//! Commands:
//! - `run`: ingest, compute, classify and persist a batch of symbols
//! - `signals`: print stored signals as a table, CSV or JSON
//! - `prices`: print stored prices for one symbol
//! - `cache status`: report cache entries, bar counts and freshness
//! - `cache clear`: remove cache entries

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use sigflow_core::data::FileCache;
use sigflow_core::domain::Signal;
use sigflow_core::store::SignalStore;
use sigflow_runner::{
    signals_to_csv, signals_to_json, Pipeline, PipelineConfig, PipelineContext, RunRequest,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sigflow", about = "SigFlow: daily price ingestion and signal generation")]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the cache directory.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Override the SQLite database path.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Debug-level logging for sigflow crates (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for a batch of symbols and print the JSON summary.
    Run {
        /// Tickers (1-5 upper-case letters). An empty list is a no-op run.
        symbols: Vec<String>,

        /// Calendar days of history to request.
        #[arg(long)]
        lookback: Option<u32>,

        /// Last day of the window (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Offline mode: cache and fallback only, no network access.
        #[arg(long, default_value_t = false)]
        offline: bool,
    },
    /// Print stored signals, newest first.
    Signals {
        /// Only this symbol.
        #[arg(long)]
        symbol: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Print stored prices for a symbol, oldest first.
    Prices {
        symbol: String,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report entries, bar counts and freshness.
    Status {
        /// Symbols to report. Defaults to every cached symbol.
        symbols: Vec<String>,
    },
    /// Remove cache entries.
    Clear {
        /// Symbols to clear. Defaults to every cached symbol.
        symbols: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Csv,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => {
            let config = PipelineConfig::from_file(path)?;
            tracing::debug!(path = %path.display(), "config loaded");
            config
        }
        None => PipelineConfig::default(),
    };
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }
    if let Some(path) = cli.db_path {
        config.db_path = path;
    }

    match cli.command {
        Commands::Run {
            symbols,
            lookback,
            end,
            offline,
        } => run_pipeline(config, symbols, lookback, end, offline),
        Commands::Signals {
            symbol,
            limit,
            format,
        } => run_signals(&config, symbol.as_deref(), limit, format),
        Commands::Prices { symbol } => run_prices(&config, &symbol),
        Commands::Cache { action } => match action {
            CacheAction::Status { symbols } => run_cache_status(&config, symbols),
            CacheAction::Clear { symbols } => run_cache_clear(&config, symbols),
        },
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sigflow=debug" } else { "sigflow=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_pipeline(
    mut config: PipelineConfig,
    symbols: Vec<String>,
    lookback: Option<u32>,
    end: Option<String>,
    offline: bool,
) -> Result<()> {
    config.offline |= offline;
    let end_date = end
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--end must be YYYY-MM-DD")?;

    let mut request = RunRequest::new(symbols);
    request.lookback_days = lookback;
    request.end_date = end_date;

    let mut pipeline = Pipeline::new(PipelineContext::from_config(config)?);
    match pipeline.run(&request) {
        Ok(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Err(e) => {
            let body = serde_json::json!({
                "status": "error",
                "correlation_id": e.correlation_id(),
                "error": e.to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            std::process::exit(1);
        }
    }
}

fn open_store(config: &PipelineConfig) -> Result<SignalStore> {
    SignalStore::open(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))
}

fn run_signals(config: &PipelineConfig, symbol: Option<&str>, limit: usize, format: Format) -> Result<()> {
    let store = open_store(config)?;
    let signals = match symbol {
        Some(sym) => store.get_signals_for_symbol(sym, limit)?,
        None => store.get_latest_signals(limit)?,
    };

    match format {
        Format::Csv => print!("{}", signals_to_csv(&signals)?),
        Format::Json => println!("{}", signals_to_json(&signals)?),
        Format::Table => print_signal_table(&signals),
    }
    Ok(())
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |x| format!("{x:.2}"))
}

fn print_signal_table(signals: &[Signal]) {
    if signals.is_empty() {
        println!("No signals stored.");
        return;
    }
    println!(
        "{:<6} {:<10} {:<5} {:>8} {:>10} {:>10} {:>10} {}",
        "Symbol", "Date", "Sig", "RSI", "SMA20", "SMA50", "Close", "Stale"
    );
    println!("{}", "-".repeat(70));
    for s in signals {
        println!(
            "{:<6} {:<10} {:<5} {:>8} {:>10} {:>10} {:>10.2} {}",
            s.symbol,
            s.ts,
            s.signal,
            fmt_opt(s.rsi),
            fmt_opt(s.sma20),
            fmt_opt(s.sma50),
            s.close,
            if s.is_stale { "yes" } else { "" }
        );
    }
}

fn run_prices(config: &PipelineConfig, symbol: &str) -> Result<()> {
    let prices = open_store(config)?.get_prices(symbol)?;
    if prices.is_empty() {
        println!("No prices stored for {symbol}.");
        return Ok(());
    }
    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>10} {:>12} {}",
        "Date", "Open", "High", "Low", "Close", "Volume", "Stale"
    );
    println!("{}", "-".repeat(72));
    for p in &prices {
        println!(
            "{:<10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12} {}",
            p.date,
            p.open,
            p.high,
            p.low,
            p.close,
            p.volume,
            if p.is_stale { "yes" } else { "" }
        );
    }
    Ok(())
}

fn target_symbols(cache: &FileCache, symbols: Vec<String>) -> Result<Vec<String>> {
    if symbols.is_empty() {
        Ok(cache.cached_symbols()?)
    } else {
        Ok(symbols)
    }
}

fn run_cache_status(config: &PipelineConfig, symbols: Vec<String>) -> Result<()> {
    let cache = FileCache::with_ttl(&config.cache_dir, config.cache_ttl());
    let symbols = target_symbols(&cache, symbols)?;
    if symbols.is_empty() {
        println!("Cache is empty ({})", cache.cache_dir().display());
        return Ok(());
    }

    let refs: Vec<&str> = symbols.iter().map(String::as_str).collect();
    println!("Cache directory: {}", cache.cache_dir().display());
    println!("TTL: {}s", cache.ttl().as_secs());
    println!();
    println!("{:<8} {:>6} {:<25} {}", "Symbol", "Bars", "Saved at", "State");
    println!("{}", "-".repeat(50));
    for status in cache.status(&refs)? {
        let saved = status
            .saved_at
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string());
        let state = match (status.saved_at, status.fresh) {
            (None, _) => "absent",
            (Some(_), true) => "fresh",
            (Some(_), false) => "stale",
        };
        println!("{:<8} {:>6} {:<25} {}", status.symbol, status.bar_count, saved, state);
    }
    Ok(())
}

fn run_cache_clear(config: &PipelineConfig, symbols: Vec<String>) -> Result<()> {
    let cache = FileCache::new(&config.cache_dir);
    let symbols = target_symbols(&cache, symbols)?;

    let mut removed = 0;
    for symbol in &symbols {
        if cache.clear(symbol)? {
            removed += 1;
            println!("  removed {symbol}");
        }
    }
    println!("Cleared {removed} cache entr{}.", if removed == 1 { "y" } else { "ies" });
    Ok(())
}
