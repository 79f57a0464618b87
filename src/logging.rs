//! Diagnostic tracing on stderr.
//!
//! Diagnostics are controlled by `RUST_LOG` (default `info`) and never persisted. The
//! per-task run log and events file under `logs_dir` are separate product artifacts,
//! written whatever the filter says.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `verbose` raises the default level to `debug`.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
