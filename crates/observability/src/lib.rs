//! # Observability
//!
//! Tracing and Prometheus metrics for the compressor.
//!
//! ## Features
//!
//! - tracing initialisation (JSON / Pretty / Compact)
//! - Prometheus exporter
//! - run-level compression metrics and an in-memory aggregator
//!
//! ## Usage
//!
//! ```ignore
//! use observability::{init, metrics};
//!
//! observability::init()?;
//!
//! let output = compressor.finish();
//! metrics::record_compression_output(&output, "squish");
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use ::metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_compression_output, record_replay_error,
    CompressionMetricsAggregator, MetricsSummary, RunningStats, StatsSummary,
};

/// Initialise tracing and Prometheus with defaults
///
/// - tracing: JSON, `RUST_LOG` override
/// - Prometheus: disabled
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log format
    pub log_format: LogFormat,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
    /// Default log level
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

/// Log format
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// Structured JSON
    #[default]
    Json,
    /// Human readable
    Pretty,
    /// Single line
    Compact,
}

/// Initialise with a custom configuration
///
/// Logs go to stderr; stdout is left to the binaries' own output.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    // 1. tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    // 2. Prometheus exporter (if enabled)
    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// Install only the Prometheus exporter
///
/// For binaries that set up tracing themselves.
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;
    describe_metrics();

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}

/// Register help text for the engine's metrics
pub fn describe_metrics() {
    describe_counter!(
        "bwc_samples_received_total",
        Unit::Count,
        "Samples pushed into the compressor"
    );
    describe_counter!(
        "bwc_samples_rejected_total",
        Unit::Count,
        "Samples discarded by the admission filter"
    );
    describe_counter!(
        "bwc_evictions_total",
        Unit::Count,
        "Points popped from the eviction queue"
    );
    describe_counter!("bwc_window_flushes_total", Unit::Count, "Window closes");
    describe_counter!(
        "bwc_points_committed_total",
        Unit::Count,
        "Points committed to the output"
    );
    describe_counter!(
        "bwc_data_quality_issues_total",
        Unit::Count,
        "Non-fatal data-quality defects by kind"
    );
    describe_gauge!("bwc_queue_depth", Unit::Count, "Eviction queue size");
    describe_histogram!(
        "bwc_commit_delay_seconds",
        Unit::Seconds,
        "Time between a point's arrival and its commitment"
    );
}
