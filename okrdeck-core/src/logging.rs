//! Logging setup on top of `tracing-subscriber`

use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber.
///
/// The filter comes from `RUST_LOG` (default `info`), e.g.
/// `RUST_LOG=okrdeck_core=debug`. Output goes to stderr so that JSON
/// written to stdout stays clean.
///
/// ```no_run
/// okrdeck_core::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .try_init();
}

/// Subscriber for tests: debug level, captured by the test harness
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
