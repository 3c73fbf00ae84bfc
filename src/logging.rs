//! Logging initialization.
//!
//! Configures the `tracing` subscriber with level filtering via the `ASB_LOG`
//! environment variable, falling back to the configured level when it is
//! unset or invalid. Logs go to stderr so stdout carries only the rendered
//! view.
//!
//! ```bash
//! ASB_LOG=debug asb watch
//! ASB_LOG=agent_sidebar::client=trace,warn asb watch
//! ```

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV_VAR: &str = "ASB_LOG";

/// Builds the filter from `ASB_LOG`, or from `fallback`.
pub fn env_filter(fallback: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(fallback.as_str()))
}

/// Initialize the tracing subscriber.
///
/// Does nothing if a global subscriber is already installed.
pub fn init(fallback: LogLevel) {
    let _ = fmt()
        .with_env_filter(env_filter(fallback))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
