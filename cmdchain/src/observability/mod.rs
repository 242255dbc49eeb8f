//! Observability utilities.
//!
//! The engine itself only emits `tracing` events. These helpers install a
//! global subscriber for binaries and tests that want to see them.

use tracing_subscriber::EnvFilter;

/// Installs a human-readable `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter` when it is set.
///
/// # Errors
///
/// Returns an error if the filter does not parse or a global subscriber is
/// already installed.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter)?)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
}

/// Installs a JSON `fmt` subscriber, one object per event.
///
/// # Errors
///
/// See [`init_tracing`].
pub fn init_json_tracing(default_filter: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(default_filter)?)
        .with_current_span(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
}

fn env_filter(default_filter: &str) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(default_filter)?),
    }
}

