//! Tracing subscriber setup.
//!
//! Development prints pretty, span-annotated output to stdout. Production
//! writes JSON to a daily rolling file and a compact copy to stdout.

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Selects the logging mode; `production` enables file output.
pub const ENVIRONMENT_ENV: &str = "BEACON_ENV";

/// Filter directive used when `RUST_LOG` is unset. Defaults to `info`.
pub const LOG_LEVEL_ENV: &str = "BEACON_LOG_LEVEL";

/// Overrides the directory production logs are written to.
pub const LOG_DIR_ENV: &str = "BEACON_LOG_DIR";

const LOG_FILE_PREFIX: &str = "beacon-locator";

// Dropping a guard stops its background writer.
static GUARDS: OnceLock<(WorkerGuard, WorkerGuard)> = OnceLock::new();

/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// Pretty stdout with span enter/exit timing.
    Development,
    /// JSON file plus compact stdout.
    Production,
}

impl LogMode {
    /// Mode named by `BEACON_ENV`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(std::env::var(ENVIRONMENT_ENV).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("production") => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the filter directive cannot be parsed.
pub fn init(mode: LogMode) -> anyhow::Result<()> {
    let filter = env_filter()?;
    match mode {
        LogMode::Production => init_production(filter),
        LogMode::Development => init_development(filter),
    }
    Ok(())
}

fn env_filter() -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
    Ok(EnvFilter::try_new(directive)?)
}

fn init_production(filter: EnvFilter) {
    let dir = log_directory();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("cannot create log directory {}: {e}", dir.display());
    }

    let (file_writer, file_guard) = tracing_appender::non_blocking(RollingFileAppender::new(
        Rotation::DAILY,
        &dir,
        LOG_FILE_PREFIX,
    ));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(file_writer)
                .with_current_span(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(stdout_writer)
                .with_ansi(false),
        )
        .init();

    let _ = GUARDS.set((file_guard, stdout_guard));
}

fn init_development(filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE),
        )
        .init();
}

fn log_directory() -> PathBuf {
    if let Some(dir) = std::env::var_os(LOG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    default_log_directory()
}

#[cfg(target_os = "linux")]
fn default_log_directory() -> PathBuf {
    PathBuf::from("/var/log/beacon-locator")
}

#[cfg(not(target_os = "linux"))]
fn default_log_directory() -> PathBuf {
    directories::ProjectDirs::from("", "", "beacon-locator")
        .map_or_else(|| PathBuf::from("./logs"), |dirs| dirs.data_dir().join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_mode_parse() {
        assert_eq!(LogMode::parse(Some("production")), LogMode::Production);
        assert_eq!(LogMode::parse(Some(" PRODUCTION ")), LogMode::Production);
        assert_eq!(LogMode::parse(Some("staging")), LogMode::Development);
        assert_eq!(LogMode::parse(None), LogMode::Development);
    }

    #[test]
    fn test_default_log_directory_is_named_for_the_service() {
        let dir = default_log_directory();
        assert!(dir.to_string_lossy().contains("beacon-locator") || dir.ends_with("logs"));
    }
}
