//! SigFlow Runner: configuration, pipeline context, orchestration, export.
//!
//! This crate builds on `sigflow-core` to provide:
//! - `PipelineConfig` loaded from TOML
//! - `PipelineContext` wiring cache, provider, ingestor and store
//! - `Pipeline::run`, the single entry point for a batch
//! - CSV and JSON export of stored signals

pub mod config;
pub mod context;
pub mod export;
pub mod pipeline;

pub use config::{ConfigError, PipelineConfig, RetrySettings};
pub use context::{ContextError, PipelineContext};
pub use export::{signals_to_csv, signals_to_json};
pub use pipeline::{validate_request, Pipeline, RunError, RunRequest, RunStatus, RunSummary};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn summary_and_config_are_send_sync() {
        assert_send::<RunSummary>();
        assert_sync::<RunSummary>();
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }

    #[test]
    fn pipeline_is_send() {
        assert_send::<Pipeline>();
    }
}
