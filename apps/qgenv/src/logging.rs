//! Tracing initialization.
//!
//! Diagnostics go to stderr so they never mix with report output on stdout.
//! `QGENV_LOG` holds an `EnvFilter` directive, e.g. `QGENV_LOG=qgenv=debug`.

use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "QGENV_LOG";

static INIT: Once = Once::new();

/// Install the global subscriber. Calling it more than once is a no-op.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("qgenv=warn"));
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .try_init();
    });
}
