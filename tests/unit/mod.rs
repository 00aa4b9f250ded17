mod config_tests;
mod lifecycle_tests;

/// Installs a test-friendly subscriber so engine logs show up in failing tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
