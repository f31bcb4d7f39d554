//! Logging setup.
//!
//! Library crates log through `tracing`; the binary installs a single fmt
//! subscriber here. `RUST_LOG` wins over the configured default level.

use tracing_subscriber::EnvFilter;

/// Initialise logging with the given default filter directive.
/// Call this once at process startup.
pub fn init_logging(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
