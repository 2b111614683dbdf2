//! Diagnostic tracing for sheetlink processes.
//!
//! Startup warnings (config fallback, schema introspection, call log sink
//! problems) and per-call events go to stderr through `tracing`. The durable
//! call log is a separate sink owned by the core crate.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "SHEETLINK_LOG";

pub const DEFAULT_DIRECTIVE: &str = "info";

/// Build the stderr filter: `SHEETLINK_LOG`, then `RUST_LOG`, then `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global stderr subscriber. Safe to call more than once; later
/// calls are ignored.
pub fn init_tracing(default: &str) {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter(default))
        .with(stderr_layer)
        .try_init()
        .ok();
}
