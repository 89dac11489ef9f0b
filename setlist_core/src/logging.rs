//! Tracing setup for the `setlist` binary.
//!
//! Log lines go to stderr; stdout belongs to the set prompts and summaries.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the subscriber at WARN unless `RUST_LOG` says otherwise
///
/// Session transitions log at INFO and per-set records at DEBUG, so the
/// default keeps a live workout quiet.
pub fn init() {
    init_with_level("warn")
}

/// Install the subscriber with `level` as the fallback filter
///
/// `level` takes any `EnvFilter` directive, e.g. `"setlist_core=debug"`.
/// A set `RUST_LOG` always wins.
pub fn init_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Route session logs through the test harness at DEBUG
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
