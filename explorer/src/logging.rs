//! Diagnostic tracing for the explorer.
//!
//! Tracing goes to stderr, filtered by `RUST_LOG`. It is separate from the
//! product output: CLI summary lines on stdout and run artifacts written by
//! [`crate::io::mission_log`], which `RUST_LOG` never affects.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Defaults to `warn` when `RUST_LOG` is unset.
///
/// ```bash
/// RUST_LOG=explorer=debug explorer run --world .explorer/world.toml
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
