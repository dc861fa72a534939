//! Structured logging
//!
//! Console output through `tracing-subscriber`. The level follows the
//! environment unless `RUST_LOG` says otherwise, and
//! `PETITIONS_LOG_FORMAT=json` switches to one JSON object per line.
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialises the global subscriber once; later calls are no-ops.
pub fn init_structured_logging(environment: &str) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_log_level(environment)));
        let json = std::env::var("PETITIONS_LOG_FORMAT").is_ok_and(|format| format == "json");

        let registry = tracing_subscriber::registry().with(filter);
        let result = if json {
            registry
                .with(fmt::layer().json().with_target(true))
                .try_init()
        } else {
            registry.with(fmt::layer().with_target(true)).try_init()
        };

        // A subscriber may already be installed, e.g. by a test harness
        if result.is_err() {
            tracing::debug!("global tracing subscriber already set");
        }

        tracing::info!(environment = %environment, json, "logging initialised");
    });
}

fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        "test" => "warn",
        _ => "debug",
    }
}
