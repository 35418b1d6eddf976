//! # Log output.
//!
//! Installs a `tracing-subscriber` fmt layer. `RUST_LOG` wins when set;
//! otherwise the configured level (`LOG_LEVEL`) is used as the filter.

use anyhow::{Context, anyhow};
use tracing_subscriber::EnvFilter;

/// Builds the filter: `RUST_LOG` if present and valid, else `level`.
pub fn env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log level: {level}")),
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = env_filter(level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
