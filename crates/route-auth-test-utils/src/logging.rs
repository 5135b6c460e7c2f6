//! Log capture for tests.

use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness.
///
/// Safe to call from every test; only the first call installs a subscriber.
/// Honors `RUST_LOG`, defaulting to `route_auth=debug`.
pub fn init_test_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("route_auth=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
