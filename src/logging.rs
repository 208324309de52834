// Log setup for the binary and the test suite.
//
// Library code only emits `tracing` events; installing a subscriber is left
// to whoever owns the process.
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// The level comes from `RUST_LOG` (e.g. `RUST_LOG=pm_dashboard=debug`) and
/// defaults to `info`. Events go to stderr so they never interleave with the
/// report tables printed on stdout.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Verbose subscriber for tests; safe to call from every test.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
