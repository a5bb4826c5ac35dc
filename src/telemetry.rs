//! Tracing setup helper for binaries, examples, and integration tests.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `tracing` subscriber honoring `RUST_LOG`, defaulting to
/// `info`. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
