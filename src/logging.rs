use crate::app_env;
use std::env;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, prelude::*, registry};

/// Constructs a filter which uses [app_env::LOG_LEVEL] to configure per-module logging. Filters
/// to the "info" level by default, and falls back to that default if the variable can't be parsed.
pub fn init_env_filter() -> EnvFilter {
    env_filter_from(env::var(app_env::LOG_LEVEL).ok().as_deref())
}

fn env_filter_from(directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives.unwrap_or_default())
}

/// Sets up the global logging sink: a JSON logger printing to stdout with [env_filter] applied.
/// Though the logger is set up with the "tracing" crate, it also provides a bridge for libraries
/// still using "log" for logging.
///
/// Returns false if a global subscriber was already installed.
pub fn setup_logging(env_filter: EnvFilter) -> bool {
    registry()
        .with(LevelFilter::DEBUG)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_filter(env_filter),
        )
        .try_init()
        .is_ok()
}
