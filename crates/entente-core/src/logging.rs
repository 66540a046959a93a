//! Tracing initialisation for binaries and tests embedding the library.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Reads `RUST_LOG` when set, otherwise defaults to `info` with debug output
/// for the entente crates.  Safe to call more than once; later calls are
/// no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,entente_core=debug,entente_store=debug")
        }))
        .try_init();
}
