// src/logging.rs

//! Logging setup for `sitepipe` using `tracing` + `tracing-subscriber`.
//!
//! The filter is chosen in this order:
//! 1. `--log-level` applies to sitepipe's own targets.
//! 2. `SITEPIPE_LOG` is read as a full filter directive
//!    (e.g. `"debug"` or `"sitepipe=debug,tower_http=info"`).
//! 3. [`DEFAULT_DIRECTIVE`].
//!
//! Logs go to STDERR so the plan printed by `--dry-run` stays on stdout.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "SITEPIPE_LOG";

/// Chatty dependencies stay at `warn` unless asked for.
pub const DEFAULT_DIRECTIVE: &str = "info,tower_http=warn,notify=warn";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV).ok().as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    let directive = match (cli_level, env) {
        (Some(lvl), _) => format!("warn,sitepipe={}", level_name(lvl)),
        (None, Some(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => DEFAULT_DIRECTIVE.to_string(),
    };
    EnvFilter::try_new(&directive).with_context(|| format!("invalid log filter `{directive}`"))
}

fn level_name(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn cli_level_wins_over_env() {
        let filter = build_filter(Some(LogLevel::Debug), Some("error")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn env_directive_is_used() {
        let filter = build_filter(None, Some(" sitepipe=trace ")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn blank_env_falls_back_to_default() {
        let filter = build_filter(None, Some("  ")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn bad_level_in_env_is_an_error() {
        assert!(build_filter(None, Some("sitepipe=loud")).is_err());
    }
}
