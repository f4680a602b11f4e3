//! Subscriber installation for applications using the facade.

use std::error::Error;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "KESTREL_LOG";
pub const FALLBACK_LOG_ENV: &str = "RUST_LOG";
pub const DEFAULT_LOG_DIRECTIVE: &str = "info";

/// Filter directive from `KESTREL_LOG`, then `RUST_LOG`, then `info`.
pub fn log_directive_with<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    read(LOG_ENV)
        .or_else(|| read(FALLBACK_LOG_ENV))
        .unwrap_or_else(|| DEFAULT_LOG_DIRECTIVE.to_string())
}

/// Installs a global fmt subscriber. Fails if the directive is invalid or a
/// subscriber is already installed.
pub fn init_logging() -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    let directive = log_directive_with(|name| std::env::var(name).ok());
    let filter = EnvFilter::try_new(&directive)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
}
