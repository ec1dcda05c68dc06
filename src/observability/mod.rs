//! Tracing initialization.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` controls the filter;
/// `LOG_FORMAT=json` switches to JSON lines for machine consumers.
/// Re-initialization (tests) is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));

    let result = if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    };
    // Err means a subscriber is already installed.
    let _ = result;
}
