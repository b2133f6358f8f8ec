//! Logging bootstrap for the itinerary engine.
//!
//! # Responsibility
//! - Initialize file-based rolling logs exactly once per process.
//! - Emit single-line `key=value` diagnostic events from core.
//!
//! # Events
//! - `core_init`: backend started; carries `build_mode`, `level`, `log_dir`.
//! - `config_resolved`: planner settings in effect; carries `db_path`,
//!   `api_key_set` and `log_level`. The key itself is never written.
//! - `panic_captured`: sanitized panic payload and location.
//!
//! Values containing whitespace or quotes are quoted by [`field_value`] so
//! every line stays splittable on spaces.
//!
//! # Invariants
//! - Initialization is idempotent for identical level and directory.
//! - Reconfiguration with a different level or directory is rejected.
//! - Initialization never panics.

use crate::config::PlannerConfig;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::fmt::Display;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "tripplan";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

/// Level and directory a logger was (or would be) started with.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    level: &'static str,
    log_dir: PathBuf,
}

struct LoggingState {
    settings: LogSettings,
    _logger: LoggerHandle,
}

/// Initializes core logging with level and absolute directory.
///
/// # Errors
/// - Unsupported `level`, empty or relative `log_dir`.
/// - Log directory cannot be created or the backend fails to start.
/// - Logging is already active with a different level or directory.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    start(LogSettings {
        level: normalize_level(level)?,
        log_dir: normalize_log_dir(log_dir)?,
    })
}

/// Initializes logging from resolved configuration and records the
/// settings the planner will run with.
///
/// Returns `Ok(false)` when no log directory is configured; nothing is
/// started or written in that case.
pub fn init_from_config(config: &PlannerConfig) -> Result<bool, String> {
    let Some(log_dir) = &config.log_dir else {
        return Ok(false);
    };
    start(LogSettings {
        level: config.log_level,
        log_dir: log_dir.clone(),
    })?;

    info!(
        "event=config_resolved module=config status=ok db_path={} api_key_set={} log_level={}",
        field_value(config.db_path.display()),
        config.api_key.is_some(),
        config.log_level
    );
    Ok(true)
}

fn start(settings: LogSettings) -> Result<(), String> {
    let state = LOGGING_STATE.get_or_try_init(|| launch(settings.clone()))?;
    ensure_same_settings(&state.settings, &settings)
}

fn launch(settings: LogSettings) -> Result<LoggingState, String> {
    let LogSettings { level, log_dir } = &settings;
    std::fs::create_dir_all(log_dir).map_err(|err| {
        format!("failed to create log directory `{}`: {err}", log_dir.display())
    })?;

    let logger = Logger::try_with_str(level)
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    install_panic_hook_once();

    info!(
        "event=core_init module=core status=ok build_mode={} platform={} version={} level={} log_dir={}",
        build_mode(),
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION"),
        level,
        field_value(log_dir.display())
    );

    Ok(LoggingState {
        settings,
        _logger: logger,
    })
}

fn ensure_same_settings(active: &LogSettings, requested: &LogSettings) -> Result<(), String> {
    if active.log_dir != requested.log_dir {
        return Err(format!(
            "logging already initialized at `{}`; refusing to switch to `{}`",
            active.log_dir.display(),
            requested.log_dir.display()
        ));
    }
    if active.level != requested.level {
        return Err(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            active.level, requested.level
        ));
    }
    Ok(())
}

/// Returns `(level, log_dir)` when logging is active.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.settings.level, state.settings.log_dir.clone()))
}

/// `debug` or `release`, from `debug_assertions`.
pub fn build_mode() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    match build_mode() {
        "debug" => "debug",
        _ => "info",
    }
}

/// Renders a value for a `key=value` event line.
///
/// Plain values pass through; values with whitespace, quotes or `=` are
/// wrapped in double quotes with inner quotes and backslashes escaped.
/// Newlines are flattened first.
pub fn field_value(value: impl Display) -> String {
    let raw = value.to_string().replace(['\n', '\r'], " ");
    if raw.is_empty() {
        return "\"\"".to_string();
    }
    if !raw
        .chars()
        .any(|ch| ch.is_whitespace() || ch == '"' || ch == '=')
    {
        return raw;
    }
    let escaped = raw.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

pub(crate) fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

pub(crate) fn normalize_log_dir(log_dir: &str) -> Result<PathBuf, String> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err("log_dir cannot be empty".to_string());
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(format!("log_dir must be an absolute path, got `{trimmed}`"));
    }
    Ok(path.to_path_buf())
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.set(()).is_err() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_summary(panic_info);
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location, payload
        );
        previous_hook(panic_info);
    }));
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

/// Flattens newlines and caps length at `max_chars`.
fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::{
        build_mode, default_log_level, ensure_same_settings, field_value, init_from_config,
        init_logging, logging_status, normalize_level, normalize_log_dir, sanitize_message,
        LogSettings,
    };
    use crate::config::PlannerConfig;
    use std::path::PathBuf;

    #[test]
    fn normalize_level_accepts_known_values() {
        assert_eq!(normalize_level("INFO").unwrap(), "info");
        assert_eq!(normalize_level(" warning ").unwrap(), "warn");
        assert!(normalize_level("verbose").is_err());
    }

    #[test]
    fn normalize_log_dir_rejects_relative_path() {
        let error = normalize_log_dir("logs/dev").expect_err("relative paths must be rejected");
        assert!(error.contains("absolute"));
    }

    #[test]
    fn sanitize_message_removes_newlines_and_truncates() {
        let sanitized = sanitize_message("line1\nline2\rline3", 8);
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn init_logging_is_idempotent_and_rejects_conflicts() {
        let log_dir = tempfile::tempdir().unwrap();
        let other_dir = tempfile::tempdir().unwrap();
        let log_dir_str = log_dir.path().to_str().unwrap().to_string();
        let other_dir_str = other_dir.path().to_str().unwrap().to_string();

        init_logging("info", &log_dir_str).expect("first init should succeed");
        init_logging("info", &log_dir_str).expect("same config should be idempotent");

        let level_error = init_logging("debug", &log_dir_str).unwrap_err();
        assert!(level_error.contains("refusing to switch"));

        let dir_error = init_logging("info", &other_dir_str).unwrap_err();
        assert!(dir_error.contains("refusing to switch"));

        let (active_level, active_dir) = logging_status().expect("logging should be active");
        assert_eq!(active_level, "info");
        assert_eq!(active_dir, log_dir.path());
    }

    #[test]
    fn init_from_config_without_log_dir_starts_nothing() {
        let config = PlannerConfig::from_source(|key| match key {
            "DB" => Some("trip.db".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.log_dir, None);

        assert_eq!(init_from_config(&config), Ok(false));
    }

    #[test]
    fn field_value_quotes_only_when_needed() {
        assert_eq!(field_value("tokyo.db"), "tokyo.db");
        assert_eq!(field_value(42), "42");
        assert_eq!(field_value(""), "\"\"");
        assert_eq!(
            field_value("/home/me/My Trips/tokyo.db"),
            "\"/home/me/My Trips/tokyo.db\""
        );
        assert_eq!(field_value("a=b"), "\"a=b\"");
        assert_eq!(field_value("say \"hi\"\nnow"), "\"say \\\"hi\\\" now\"");
    }

    #[test]
    fn conflicting_settings_name_both_sides() {
        let active = LogSettings {
            level: "info",
            log_dir: PathBuf::from("/var/log/tripplan"),
        };
        assert_eq!(ensure_same_settings(&active, &active.clone()), Ok(()));

        let moved = LogSettings {
            log_dir: PathBuf::from("/tmp/elsewhere"),
            ..active.clone()
        };
        let error = ensure_same_settings(&active, &moved).unwrap_err();
        assert!(error.contains("/var/log/tripplan"));
        assert!(error.contains("/tmp/elsewhere"));

        let louder = LogSettings {
            level: "trace",
            ..active.clone()
        };
        let error = ensure_same_settings(&active, &louder).unwrap_err();
        assert!(error.contains("`info`") && error.contains("`trace`"));
    }

    #[test]
    fn default_level_follows_build_mode() {
        let expected = if build_mode() == "debug" { "debug" } else { "info" };
        assert_eq!(default_log_level(), expected);
    }
}
