//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events; embedders that have no
//! subscriber of their own can call [`init`].

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global formatting subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`, e.g.
/// `RUST_LOG=u_timetable=debug`.
///
/// # Panics
/// Panics if a global subscriber is already installed.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// Installs a debug-level subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
