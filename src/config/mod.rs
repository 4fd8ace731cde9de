//! Typed configuration from environment variables.
//!
//! Loaded once at startup. Values that fail to parse are errors rather than
//! silent defaults. The Pushbullet token is wrapped in
//! `secrecy::SecretString` so it never shows up in logs.

use secrecy::SecretString;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::notifier::Status;

#[derive(Debug)]
pub struct Config {
    pub bot_name: String,
    pub pushbullet_api_token: Option<SecretString>,
    pub notification_level: Status,
    /// `0` means unlimited.
    pub max_concurrency: usize,
    pub tasks_file: PathBuf,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let notification_level = match optional_var("NOTIFICATION_LEVEL") {
            Some(level) => level.parse()?,
            None => Status::Info,
        };

        let max_concurrency = match optional_var("MAX_CONCURRENCY") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                Error::Config(format!(
                    "MAX_CONCURRENCY must be a non-negative integer, got '{raw}': {e}"
                ))
            })?,
            None => 0,
        };

        Ok(Self {
            bot_name: optional_var("BOT_NAME").unwrap_or_else(|| "taskbot".to_string()),
            pushbullet_api_token: optional_var("PUSHBULLET_API_TOKEN").map(SecretString::from),
            notification_level,
            max_concurrency,
            tasks_file: optional_var("TASKS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("tasks.toml")),
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

/// An unset or blank variable is `None`.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
