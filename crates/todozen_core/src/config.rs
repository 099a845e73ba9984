//! Runtime configuration.
//!
//! # Responsibility
//! - Resolve data directory, log level and scoring settings from the
//!   environment.
//!
//! # Invariants
//! - Resolution never touches the file system.
//! - The API key is optional until prioritization is requested.

use crate::logging::default_log_level;
use crate::notify::NotificationPermission;
use crate::prioritize::gemini::GeminiConfig;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DATA_DIR: &str = "TODOZEN_DATA_DIR";
pub const ENV_LOG_LEVEL: &str = "TODOZEN_LOG_LEVEL";
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_MODEL: &str = "TODOZEN_MODEL";
pub const ENV_SCORING_TIMEOUT_SECS: &str = "TODOZEN_SCORING_TIMEOUT_SECS";
pub const ENV_NOTIFICATIONS: &str = "TODOZEN_NOTIFICATIONS";

const DATA_DIR_NAME: &str = ".todozen";
const DB_FILE_NAME: &str = "todozen.sqlite3";
const LOG_DIR_NAME: &str = "logs";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidTimeout(String),
    InvalidPermission(String),
    MissingApiKey,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTimeout(value) => write!(
                f,
                "{ENV_SCORING_TIMEOUT_SECS} must be a positive integer, got `{value}`"
            ),
            Self::InvalidPermission(value) => write!(
                f,
                "{ENV_NOTIFICATIONS} must be default|granted|denied, got `{value}`"
            ),
            Self::MissingApiKey => write!(f, "{ENV_API_KEY} is not set"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub struct TodoConfig {
    pub data_dir: PathBuf,
    pub log_level: String,
    pub api_key: Option<String>,
    pub model: String,
    pub scoring_timeout: Duration,
    pub notifications: NotificationPermission,
}

impl TodoConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let data_dir = get(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir(get("HOME")));

        let scoring_timeout = match get(ENV_SCORING_TIMEOUT_SECS) {
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
        };

        let notifications = match get(ENV_NOTIFICATIONS) {
            None => NotificationPermission::Default,
            Some(raw) => NotificationPermission::parse(&raw)
                .ok_or(ConfigError::InvalidPermission(raw))?,
        };

        Ok(Self {
            data_dir,
            log_level: get(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            api_key: get(ENV_API_KEY),
            model: get(ENV_MODEL).unwrap_or_else(|| GeminiConfig::default().model),
            scoring_timeout,
            notifications,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join(LOG_DIR_NAME)
    }

    /// Builds the Gemini client configuration.
    ///
    /// # Errors
    /// [`ConfigError::MissingApiKey`] when no key is configured.
    pub fn gemini(&self) -> Result<GeminiConfig, ConfigError> {
        let api_key = self.api_key.clone().ok_or(ConfigError::MissingApiKey)?;
        Ok(GeminiConfig {
            api_key,
            model: self.model.clone(),
            timeout: self.scoring_timeout,
            ..GeminiConfig::default()
        })
    }
}

fn default_data_dir(home: Option<String>) -> PathBuf {
    home.map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join(DATA_DIR_NAME)
}
