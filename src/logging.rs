//! Diagnostics for `wp-schedule`.
//!
//! Scheduling output (change-sets, `check` reports) owns stdout, so the
//! subscriber writes to stderr. `--log-level` sets one level for everything;
//! without it, `WP_SCHEDULER_LOG` takes full filter directives such as
//! `wp_scheduler::graph=debug,info`.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_ENV: &str = "WP_SCHEDULER_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn filter_for(cli_level: Option<LogLevel>, env_value: Option<&str>) -> Result<EnvFilter> {
    let directives = match (cli_level, env_value) {
        (Some(level), _) => level.directive(),
        (None, Some(value)) if !value.trim().is_empty() => value,
        (None, _) => "info",
    };
    EnvFilter::try_new(directives).map_err(|err| anyhow!("invalid {LOG_ENV} filter '{directives}': {err}"))
}

/// Installs the global subscriber. Call once, at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let filter = filter_for(cli_level, env_value.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_environment() {
        let filter = filter_for(Some(LogLevel::Debug), Some("error")).unwrap();
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn environment_accepts_per_module_directives() {
        let filter = filter_for(None, Some("wp_scheduler::graph=debug,info")).unwrap();
        assert!(filter.to_string().contains("wp_scheduler::graph=debug"));
        assert_eq!(filter_for(None, Some("  ")).unwrap().to_string(), "info");
        assert_eq!(filter_for(None, None).unwrap().to_string(), "info");
    }

    #[test]
    fn malformed_environment_filter_is_reported() {
        assert!(filter_for(None, Some("wp_scheduler=loud")).is_err());
    }
}
