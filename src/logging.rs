//! Diagnostic logging setup.
//!
//! Logs go to stderr so they never mix with tables printed on stdout.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive
pub const LOG_ENV: &str = "VAULTPROF_LOG";

/// Install the global subscriber.
///
/// The filter comes from `VAULTPROF_LOG`, then `RUST_LOG`, then defaults to
/// `warn`. `verbose` forces `debug` for this crate.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("vaultprof=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // a subscriber may already be installed (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
