//! Environment-derived bot configuration.
//!
//! # Invariants
//! - Empty variables are treated as unset.
//! - `log_dir` is always absolute after loading.
//! - Secrets never appear in `Debug` output.

use crate::completion::CompletionConfig;
use crate::logging::default_log_level;
use crate::repo::StorageBackend;
use crate::supervisor::{RestartPolicy, DEFAULT_RESTART_DELAY};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable names.
pub mod env_vars {
    pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const COMPLETION_URL: &str = "NOTEBOT_COMPLETION_URL";
    pub const COMPLETION_MODEL: &str = "NOTEBOT_COMPLETION_MODEL";
    pub const COMPLETION_TIMEOUT_SECS: &str = "NOTEBOT_COMPLETION_TIMEOUT_SECS";
    pub const STORAGE: &str = "NOTEBOT_STORAGE";
    pub const DB_PATH: &str = "NOTEBOT_DB_PATH";
    pub const LOG_LEVEL: &str = "NOTEBOT_LOG_LEVEL";
    pub const LOG_DIR: &str = "NOTEBOT_LOG_DIR";
    pub const RESTART_DELAY_SECS: &str = "NOTEBOT_RESTART_DELAY_SECS";
}

const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
    WorkingDirectory(std::io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingVar(var) => write!(f, "required environment variable `{var}` is not set"),
            Self::InvalidValue { var, value, reason } => {
                write!(f, "invalid value `{value}` for `{var}`: {reason}")
            }
            Self::WorkingDirectory(err) => {
                write!(f, "cannot resolve working directory for relative paths: {err}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::WorkingDirectory(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub telegram_token: String,
    /// `None` disables `/summary` and `/question`.
    pub completion: Option<CompletionConfig>,
    pub storage_backend: StorageBackend,
    pub storage_path: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub restart_policy: RestartPolicy,
}

impl Debug for BotConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("telegram_token", &"<redacted>")
            .field("completion", &self.completion)
            .field("storage_backend", &self.storage_backend)
            .field("storage_path", &self.storage_path)
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .field("restart_policy", &self.restart_policy)
            .finish()
    }
}

impl BotConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let telegram_token =
            get(env_vars::TELEGRAM_BOT_TOKEN).ok_or(ConfigError::MissingVar(env_vars::TELEGRAM_BOT_TOKEN))?;

        let completion = match get(env_vars::OPENAI_API_KEY) {
            Some(api_key) => {
                let mut config = CompletionConfig::new(api_key);
                if let Some(url) = get(env_vars::COMPLETION_URL) {
                    config.base_url = url;
                }
                if let Some(model) = get(env_vars::COMPLETION_MODEL) {
                    config.model = model;
                }
                if let Some(raw) = get(env_vars::COMPLETION_TIMEOUT_SECS) {
                    config.timeout = parse_secs(env_vars::COMPLETION_TIMEOUT_SECS, &raw)?;
                }
                Some(config)
            }
            None => None,
        };

        let storage_backend = match get(env_vars::STORAGE) {
            Some(raw) => raw.parse::<StorageBackend>().map_err(|reason| ConfigError::InvalidValue {
                var: env_vars::STORAGE,
                value: raw.clone(),
                reason,
            })?,
            None => StorageBackend::default(),
        };
        let storage_path = get(env_vars::DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(storage_backend.default_path()));

        let log_level = match get(env_vars::LOG_LEVEL) {
            Some(raw) => crate::logging::normalize_level(&raw)
                .map_err(|reason| ConfigError::InvalidValue {
                    var: env_vars::LOG_LEVEL,
                    value: raw.clone(),
                    reason,
                })?
                .to_string(),
            None => default_log_level().to_string(),
        };
        let log_dir = absolutize(
            get(env_vars::LOG_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
        )?;

        let delay = match get(env_vars::RESTART_DELAY_SECS) {
            Some(raw) => parse_secs(env_vars::RESTART_DELAY_SECS, &raw)?,
            None => DEFAULT_RESTART_DELAY,
        };

        Ok(Self {
            telegram_token,
            completion,
            storage_backend,
            storage_path,
            log_level,
            log_dir,
            restart_policy: RestartPolicy {
                delay,
                max_restarts: None,
            },
        })
    }
}

fn parse_secs(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|err| ConfigError::InvalidValue {
            var,
            value: raw.to_string(),
            reason: err.to_string(),
        })
}

fn absolutize(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().map_err(ConfigError::WorkingDirectory)?;
    Ok(cwd.join(path))
}
