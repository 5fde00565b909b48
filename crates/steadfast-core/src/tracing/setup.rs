//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "STEADFAST_LOG";

/// Filter used when `STEADFAST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "steadfast=info";

/// Initialize human-readable logging.
///
/// Reads `STEADFAST_LOG` for per-target levels, e.g.
/// `STEADFAST_LOG=steadfast_mutation=debug,steadfast_pagination=warn`.
/// Idempotent: only the first call installs a subscriber.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(env_filter())
            .try_init();
    });
}

/// Initialize JSON-lines logging. Idempotent, shares the guard with
/// [`init_tracing`] so at most one subscriber is ever installed.
pub fn init_tracing_json() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .with(env_filter())
            .try_init();
    });
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
