//! Shared helpers for integration tests.

use tracing_subscriber::EnvFilter;

/// Install a test-friendly log subscriber, controlled by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
