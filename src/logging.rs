//! Tracing setup for the binaries.
//!
//! `RUST_LOG` takes precedence over the configured level, e.g.
//! `RUST_LOG=university=debug university course list`.

use tracing_subscriber::EnvFilter;

/// Installs a compact console subscriber. Calling it twice is harmless.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
