//! Logging setup
//!
//! Explicit, opt-in tracing-subscriber init for binaries and tests.
//! Library code only emits `tracing` events and never installs a
//! subscriber on its own.

use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber honoring `RUST_LOG`, defaulting to
/// `warn`. Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
