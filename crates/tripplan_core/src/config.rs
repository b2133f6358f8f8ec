//! Runtime configuration resolved from the process environment and `.env`.
//!
//! # Responsibility
//! - Resolve database path, provider key and logging settings.
//! - Layer an optional dotenv file under the process environment.
//! - Keep lookups injectable so resolution is testable without touching
//!   the real environment.
//!
//! # Invariants
//! - Resolution never panics; bad values surface as `ConfigError`.
//! - Logging stays disabled unless a log directory is configured.
//! - Process environment wins over the dotenv file; a missing file is empty.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DB_ENV: &str = "DB";
pub const API_KEY_ENV: &str = "API_KEY";
pub const LOG_LEVEL_ENV: &str = "TRIPPLAN_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "TRIPPLAN_LOG_DIR";

/// Dotenv file read from the working directory by [`PlannerConfig::from_env`].
pub const DOTENV_FILE: &str = ".env";

const DEFAULT_DB_PATH: &str = "tokyo.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyValue(&'static str),
    InvalidValue { key: &'static str, message: String },
    /// Dotenv file exists but cannot be read or parsed.
    EnvFile { path: PathBuf, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyValue(key) => write!(f, "`{key}` is set but empty"),
            Self::InvalidValue { key, message } => write!(f, "invalid `{key}`: {message}"),
            Self::EnvFile { path, message } => {
                write!(f, "failed to load `{}`: {message}", path.display())
            }
        }
    }
}

impl Error for ConfigError {}

/// Resolved planner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    pub db_path: PathBuf,
    /// Key handed to provider adapters; core never reads it.
    pub api_key: Option<String>,
    pub log_level: &'static str,
    pub log_dir: Option<PathBuf>,
}

impl PlannerConfig {
    /// Resolves from the process environment layered over `./.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_file(Path::new(DOTENV_FILE))
    }

    /// Resolves from the process environment layered over `env_file`.
    pub fn from_env_with_file(env_file: &Path) -> Result<Self, ConfigError> {
        Self::from_source_with_file(|key| std::env::var(key).ok(), env_file)
    }

    /// Resolves from `source`, falling back to entries of `env_file`.
    pub fn from_source_with_file<F>(mut source: F, env_file: &Path) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let file_values = read_env_file(env_file)?;
        Self::from_source(|key| source(key).or_else(|| file_values.get(key).cloned()))
    }

    pub fn from_source<F>(mut source: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let db_path = match source(DB_ENV) {
            Some(value) if value.trim().is_empty() => return Err(ConfigError::EmptyValue(DB_ENV)),
            Some(value) => PathBuf::from(value.trim()),
            None => PathBuf::from(DEFAULT_DB_PATH),
        };

        let api_key = source(API_KEY_ENV).filter(|value| !value.trim().is_empty());

        let log_level = match source(LOG_LEVEL_ENV) {
            Some(value) => normalize_level(&value).map_err(|message| ConfigError::InvalidValue {
                key: LOG_LEVEL_ENV,
                message,
            })?,
            None => default_log_level(),
        };

        let log_dir = match source(LOG_DIR_ENV) {
            Some(value) => Some(normalize_log_dir(&value).map_err(|message| {
                ConfigError::InvalidValue {
                    key: LOG_DIR_ENV,
                    message,
                }
            })?),
            None => None,
        };

        Ok(Self {
            db_path,
            api_key,
            log_level,
            log_dir,
        })
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let env_file_error = |err: dotenvy::Error| ConfigError::EnvFile {
        path: path.to_path_buf(),
        message: err.to_string(),
    };

    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(err) if err.not_found() => return Ok(HashMap::new()),
        Err(err) => return Err(env_file_error(err)),
    };

    entries
        .map(|entry| entry.map_err(env_file_error))
        .collect()
}
