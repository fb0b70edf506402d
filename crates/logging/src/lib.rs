//! RelayCraft Logging
//!
//! Installs the global tracing subscriber. `RUST_LOG` wins over the
//! default directive passed in.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directive used when neither `RUST_LOG` nor settings provide one.
pub const DEFAULT_FILTER: &str = "info,relaycraft=debug";

fn filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the subscriber. Panics if one is already installed.
pub fn init_logging(default_filter: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter(default_filter))
        .init();
}

/// Like `init_logging` but returns an error on a second call, for tests.
pub fn try_init_logging(default_filter: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(filter(default_filter))
        .try_init()
}
