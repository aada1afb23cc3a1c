//! Logging setup
//!
//! Installs the global tracing subscriber. `RUST_LOG` overrides the level
//! passed in.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Build the level filter, preferring `RUST_LOG` when it is set
pub fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Initialize the tracing subscriber with JSON or human-readable output
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = build_filter(log_level);

    let console_layer = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    };

    tracing_subscriber::registry().with(console_layer).init();
}
