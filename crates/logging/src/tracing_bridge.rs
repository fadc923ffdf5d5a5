//! crates/logging/src/tracing_bridge.rs
//! Installs the process-wide `tracing` subscriber.
//!
//! # Architecture
//!
//! - An [`EnvFilter`] decides which events pass: `RUST_LOG` when set (unless
//!   `-q` was given), otherwise the level from [`VerbosityConfig`]
//! - A `fmt` layer renders the events that pass to stderr
//!
//! # Usage
//!
//! ```rust,no_run
//! use logging::{VerbosityConfig, init_tracing};
//!
//! init_tracing(VerbosityConfig::from_verbose_level(2)).expect("first subscriber");
//! tracing::debug!("chunk done");
//! ```

use std::env;
use std::io::IsTerminal;

use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use super::config::VerbosityConfig;

/// Environment variable holding filter directives.
pub const ENV_FILTER_VAR: &str = "RUST_LOG";

/// Builds the filter for `config`, consulting `env_directives` when allowed.
///
/// Invalid or empty directives fall back to the flag-derived level.
pub fn build_filter(config: VerbosityConfig, env_directives: Option<&str>) -> EnvFilter {
    let fallback = || EnvFilter::default().add_directive(config.level().into());
    if !config.allows_env_override() {
        return fallback();
    }
    match env_directives.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|_| fallback()),
        None => fallback(),
    }
}

/// Subscriber writing formatted events to `writer`.
pub fn subscriber_with_writer<W>(
    config: VerbosityConfig,
    env_directives: Option<&str>,
    writer: W,
) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(config.verbose >= 2)
        .with_ansi(std::io::stderr().is_terminal())
        .without_time();

    tracing_subscriber::registry()
        .with(build_filter(config, env_directives))
        .with(layer)
}

/// Installs a stderr subscriber for `config` as the global default.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: VerbosityConfig) -> Result<(), TryInitError> {
    let directives = env::var(ENV_FILTER_VAR).ok();
    subscriber_with_writer(config, directives.as_deref(), std::io::stderr).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_drive_the_filter_without_env() {
        let filter = build_filter(VerbosityConfig::from_verbose_level(1), None);
        assert_eq!(filter.max_level_hint(), Some(tracing::level_filters::LevelFilter::INFO));
    }

    #[test]
    fn env_overrides_verbose_count() {
        let filter = build_filter(VerbosityConfig::default(), Some("trace"));
        assert_eq!(filter.max_level_hint(), Some(tracing::level_filters::LevelFilter::TRACE));
    }

    #[test]
    fn env_is_ignored_when_quiet() {
        let filter = build_filter(VerbosityConfig::quiet(), Some("trace"));
        assert_eq!(filter.max_level_hint(), Some(tracing::level_filters::LevelFilter::ERROR));
    }

    #[test]
    fn blank_env_falls_back() {
        let filter = build_filter(VerbosityConfig::from_verbose_level(2), Some("  "));
        assert_eq!(filter.max_level_hint(), Some(tracing::level_filters::LevelFilter::DEBUG));
    }
}
