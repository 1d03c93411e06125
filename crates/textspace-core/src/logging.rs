//! Logging setup for TextSpace components.
//!
//! The library itself only emits `tracing` events; embedding applications
//! call [`init`] once at startup to get them printed.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Result, TextSpaceError};

/// `RUST_LOG` if set and valid, `default_filter` otherwise.
fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Print pipeline events to stderr in compact form.
///
/// Fails with a configuration error if a global subscriber is already
/// installed.
pub fn init(default_filter: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| TextSpaceError::Configuration(format!("logging already initialised: {}", e)))
}

/// Test variant of [`init`]: output goes through the test writer so it is
/// captured by `cargo test`, and a second call just returns `false`.
pub fn try_init(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt::layer().compact().with_test_writer())
        .try_init()
        .is_ok()
}
