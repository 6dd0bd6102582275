//! Diagnostic logging to stderr.
//!
//! Records never reach the log: events carry counts, sizes and ids only.

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive, e.g. `keyshelf=debug`.
pub const LOG_ENV: &str = "KEYSHELF_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// Install the global subscriber. Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
