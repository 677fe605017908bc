//! Logging setup for applications built on the client.
//!
//! The library crates only emit `tracing` events. Nothing is printed until
//! the application installs a subscriber, either its own or the one
//! [`init_logging`] sets up.

use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Environment variable holding the log filter (`EnvFilter` syntax, e.g.
/// `stagelinq_statemap=debug,info`).
pub const LOG_ENV: &str = "STAGELINQ_LOG";

/// Logging setup error.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Installs a compact stderr subscriber.
///
/// The filter comes from [`LOG_ENV`], then `RUST_LOG`, then `info`.
/// Fails if a global subscriber is already set.
///
/// ```rust,ignore
/// stagelinq::logging::init_logging()?;
/// ```
pub fn init_logging() -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let subscriber = Registry::default()
        .with(fmt::layer().with_target(true).compact())
        .with(env_filter("info"));

    subscriber
        .try_init()
        .map_err(|e| LoggingError::TracingInit(e.to_string()))
}

/// Returns `true` if a global subscriber has been installed.
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

fn env_filter(default_level: &str) -> EnvFilter {
    if let Ok(filter) = std::env::var(LOG_ENV) {
        EnvFilter::new(filter)
    } else if let Ok(rust_log) = std::env::var("RUST_LOG") {
        EnvFilter::new(rust_log)
    } else {
        EnvFilter::new(default_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // Whichever call comes first in this process wins; any later call
        // must report the conflict rather than panic.
        let _ = init_logging();
        assert!(is_initialized());
        assert!(matches!(init_logging(), Err(LoggingError::TracingInit(_))));
    }
}
