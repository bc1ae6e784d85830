//! Tracing setup shared by all binaries.
//!
//! Logs go to stderr; stdout carries the MCP stdio protocol.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber. `RUST_LOG` overrides `log_level`.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
