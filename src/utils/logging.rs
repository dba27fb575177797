//! Logging initialization
//!
//! One subscriber per process, set up by the binaries:
//! - `RUST_LOG` wins when set
//! - otherwise the filter from the `[logging]` config section
//! - otherwise `info`
//!
//! # Usage
//! ```rust,no_run
//! use tenant_modules::utils::init_logging;
//!
//! init_logging(None); // Uses RUST_LOG or defaults to "info"
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "info";

/// Pick the filter directive: `RUST_LOG`, then `configured`, then `info`
pub fn resolve_filter(rust_log: Option<&str>, configured: Option<&str>) -> String {
    rust_log
        .filter(|f| !f.trim().is_empty())
        .or(configured.filter(|f| !f.trim().is_empty()))
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

fn env_filter(filter: Option<&str>) -> EnvFilter {
    let rust_log = std::env::var("RUST_LOG").ok();
    EnvFilter::new(resolve_filter(rust_log.as_deref(), filter))
}

/// Human-readable logging to stderr
///
/// ANSI colors are disabled when `NO_COLOR` is set.
pub fn init_logging(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(env_filter(filter))
        .init();
}

/// JSON logging for log aggregation
#[cfg(feature = "json-logging")]
pub fn init_json_logging(filter: Option<&str>) {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(env_filter(filter))
        .init();
}

/// Initialize logging from the `[logging]` config section
///
/// `json_format` falls back to human-readable output when the crate is built
/// without the `json-logging` feature.
pub fn init_logging_from_config(config: Option<&LoggingConfig>) {
    let filter = config.and_then(|c| c.filter.as_deref());

    if config.map(|c| c.json_format).unwrap_or(false) {
        #[cfg(feature = "json-logging")]
        {
            init_json_logging(filter);
        }
        #[cfg(not(feature = "json-logging"))]
        {
            init_logging(filter);
        }
    } else {
        init_logging(filter);
    }
}
