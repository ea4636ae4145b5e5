use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use thiserror::Error;

use crate::constants::DEFAULT_API_BASE_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
    #[error("failed to parse {name} as date: {value} (expected YYYY-MM-DD or an integer number of days)")]
    ParseDate { name: String, value: String },
    #[error("failed to read topics file {path}: {source}")]
    TopicsFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Crawl scope
    pub topics: Vec<String>,
    pub only_originals: bool,
    pub since_date: NaiveDate,
    pub since_cutoff_enabled: bool,

    // Credentials
    pub cookie: String,

    // Output
    pub write_modes: Vec<WriteMode>,
    pub output_dir: PathBuf,
    pub database_path: PathBuf,
    pub pic_download: bool,
    pub video_download: bool,

    // API endpoint (overridden in tests)
    pub api_base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Append to a per-topic CSV file.
    Csv,
    /// Upsert into a SQLite database.
    Sqlite,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Topics come from `TOPICS` (comma-separated) or, when that is unset,
    /// one per line from the file named by `TOPICS_FILE`.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            topics: load_topics()?,
            only_originals: parse_env_bool("ONLY_ORIGINALS", false)?,
            since_date: parse_since_date(
                "SINCE_DATE",
                &env_or_default("SINCE_DATE", "0"),
                Local::now().date_naive(),
            )?,
            since_cutoff_enabled: parse_env_bool("SINCE_CUTOFF_ENABLED", false)?,

            cookie: required_env("COOKIE")?,

            write_modes: parse_write_modes(&env_or_default("WRITE_MODES", "csv"))?,
            output_dir: PathBuf::from(env_or_default("OUTPUT_DIR", "./weibo")),
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/weibo.sqlite")),
            pic_download: parse_env_bool("PIC_DOWNLOAD", false)?,
            video_download: parse_env_bool("VIDEO_DOWNLOAD", false)?,

            api_base_url: env_or_default("API_BASE_URL", DEFAULT_API_BASE_URL),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topics.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "TOPICS".to_string(),
                message: "at least one topic is required".to_string(),
            });
        }
        if self.topics.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                name: "TOPICS".to_string(),
                message: "topics cannot be blank".to_string(),
            });
        }
        if self.write_modes.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "WRITE_MODES".to_string(),
                message: "at least one write mode is required".to_string(),
            });
        }
        if self.cookie.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "COOKIE".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Configuration with test-friendly defaults, for integration tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            topics: vec!["测试话题".to_string()],
            only_originals: false,
            since_date: NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date"),
            since_cutoff_enabled: false,
            cookie: "test-cookie".to_string(),
            write_modes: vec![WriteMode::Csv],
            output_dir: PathBuf::from("./weibo"),
            database_path: PathBuf::from("./data/weibo.sqlite"),
            pic_download: false,
            video_download: false,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

fn load_topics() -> Result<Vec<String>, ConfigError> {
    if let Some(list) = optional_env("TOPICS") {
        return Ok(split_topics(&list));
    }
    if let Some(path) = optional_env("TOPICS_FILE") {
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::TopicsFile {
            path: path.clone(),
            source,
        })?;
        return Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect());
    }
    Err(ConfigError::MissingEnvVar("TOPICS".to_string()))
}

fn split_topics(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Parse a since-date value: either `YYYY-MM-DD`, or an integer meaning
/// "that many days before `today`".
fn parse_since_date(name: &str, value: &str, today: NaiveDate) -> Result<NaiveDate, ConfigError> {
    let value = value.trim();
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        let days: i64 = value.parse().map_err(|_| ConfigError::ParseDate {
            name: name.to_string(),
            value: value.to_string(),
        })?;
        return today
            .checked_sub_signed(chrono::Duration::days(days))
            .ok_or_else(|| ConfigError::ParseDate {
                name: name.to_string(),
                value: value.to_string(),
            });
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ConfigError::ParseDate {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn parse_write_modes(value: &str) -> Result<Vec<WriteMode>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(|mode| match mode.to_lowercase().as_str() {
            "csv" => Ok(WriteMode::Csv),
            "sqlite" => Ok(WriteMode::Sqlite),
            _ => Err(ConfigError::InvalidValue {
                name: "WRITE_MODES".to_string(),
                message: format!("must be 'csv' or 'sqlite', got '{mode}'"),
            }),
        })
        .collect()
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}
