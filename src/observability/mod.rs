//! Structured logging and metrics initialization.
//!
//! Follows the teacher's convention of a `tracing`-subscriber-based logging
//! layer plus a `metrics`-facade exporter, initialized once at process start;
//! every other module just calls `tracing::info!`/`metrics::counter!` directly.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, for local development.
    Pretty,
    /// Newline-delimited JSON, for production log shipping.
    #[default]
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive (e.g. `"info"`, `"chronograph=debug"`).
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Initializes the global `tracing` subscriber. Idempotent: later calls are
/// no-ops, matching the teacher's once-per-process observability setup.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.get_or_init(|| {
        let env_filter =
            EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));
        let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
        match config.format {
            LogFormat::Json => {
                let _ = builder.json().try_init();
            },
            LogFormat::Pretty => {
                let _ = builder.pretty().try_init();
            },
        }
    });
}

static METRICS_INIT: OnceLock<()> = OnceLock::new();

/// Installs the Prometheus metrics recorder.
///
/// # Errors
///
/// Returns an error if the recorder fails to bind/install.
pub fn init_metrics() -> crate::Result<()> {
    let mut result = Ok(());
    METRICS_INIT.get_or_init(|| {
        result = metrics_exporter_prometheus::PrometheusBuilder::new()
            .install()
            .map_err(|e| crate::Error::BackendUnavailable(format!("init_metrics: {e}")));
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_config_default_is_json_info() {
        let cfg = LoggingConfig::default();
        assert_eq!(cfg.filter, "info");
        assert_eq!(cfg.format, LogFormat::Json);
    }
}
