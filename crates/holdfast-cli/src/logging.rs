//! Log output
//!
//! Logs go to stderr so `--format json` output on stdout stays parseable.
//! `RUST_LOG` takes precedence over the `-v`/`-q` flags.

use crate::config::Verbosity;
use tracing_subscriber::EnvFilter;

/// Build the filter for `verbosity`, preferring `RUST_LOG` when set
#[must_use]
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(verbosity: Verbosity) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(verbosity != Verbosity::Normal)
        .try_init();
}
