//! Tracing setup
//!
//! Library code only emits `tracing` events. Binaries and tests install a
//! subscriber once through [`init_tracing`].

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static INIT: OnceLock<bool> = OnceLock::new();

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"eventwait=info"`).
///
/// Safe to call more than once; only the first call installs anything.
/// Returns `false` when another global subscriber was already set.
pub fn init_tracing(default_directive: &str) -> bool {
    *INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_names(true)
            .try_init()
            .is_ok()
    })
}
