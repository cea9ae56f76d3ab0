use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Route coordinator logs through the test harness's captured output.
///
/// Honors `RUST_LOG` and falls back to `warn`, which is enough to see
/// stranded calls. Safe to call from every test; only the first call installs
/// a subscriber.
pub fn init_test_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_test_writer())
        .with(env_filter)
        .try_init();

    if installed.is_ok() {
        tracing::debug!("Test logging initialized");
    }
}
