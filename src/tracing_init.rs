//! Tracing setup for tests and binaries
//!
//! Filtering comes from `RUST_LOG`, for example:
//! - `RUST_LOG=qreadout=debug` - receiver and non-convergence detail
//! - `RUST_LOG=qreadout::ldpc=trace` - per-iteration syndrome weights

#[cfg(test)]
use once_cell::sync::Lazy;

/// Initialize tracing once for the whole test binary
///
/// Falls back to `qreadout=warn` and writes through the test harness so
/// output is captured per test.
#[cfg(test)]
pub fn init_test_tracing() {
    static TRACING: Lazy<()> = Lazy::new(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("qreadout=warn"));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .with_test_writer()
            .init();
    });

    Lazy::force(&TRACING);
}

/// Initialize tracing for binaries; call early in `main()`
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qreadout=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();
}
