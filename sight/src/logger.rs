//! Log output setup.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// Filtering follows `RUST_LOG` and defaults to `info`. Records emitted through
/// the `log` facade by the library crates are forwarded to the same subscriber.
pub fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}
