use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use x121_console_core::credentials::StaticCredentials;
use x121_console_core::session::{FileSessionStore, MemorySessionStore, SessionStore};

use crate::retry::RetryPolicy;
use crate::telemetry::LogFormat;

/// Errors while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Console configuration loaded from environment variables.
///
/// All fields except the admin secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Backend base URL (default: `http://localhost:3000`).
    pub api_url: String,
    /// Identifier pair that unlocks the console and signs gated queries.
    pub credentials: StaticCredentials,
    /// HTTP transport timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Backoff for failed queries.
    pub retry: RetryPolicy,
    /// Where to persist the unlocked flag. `None` keeps it in memory.
    pub session_file: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl ConsoleConfig {
    /// Load `.env` if present, then read the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                 |
    /// |----------------------------------|-------------------------|
    /// | `CONSOLE_API_URL`                | `http://localhost:3000` |
    /// | `CONSOLE_ADMIN_ID`               | `admin`                 |
    /// | `CONSOLE_ADMIN_SECRET`           | required                |
    /// | `CONSOLE_REQUEST_TIMEOUT_SECS`   | `30`                    |
    /// | `CONSOLE_RETRY_MAX_ATTEMPTS`     | `3`                     |
    /// | `CONSOLE_RETRY_INITIAL_DELAY_MS` | `250`                   |
    /// | `CONSOLE_SESSION_FILE`           | unset                   |
    /// | `CONSOLE_LOG_FORMAT`             | `pretty`                |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ConsoleConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = var("CONSOLE_API_URL").unwrap_or_else(|| "http://localhost:3000".into());
        let admin_id = var("CONSOLE_ADMIN_ID").unwrap_or_else(|| "admin".into());
        let admin_secret =
            var("CONSOLE_ADMIN_SECRET").ok_or(ConfigError::Missing("CONSOLE_ADMIN_SECRET"))?;

        let request_timeout_secs =
            parse_or("CONSOLE_REQUEST_TIMEOUT_SECS", var("CONSOLE_REQUEST_TIMEOUT_SECS"), 30)?;

        let max_attempts: u32 =
            parse_or("CONSOLE_RETRY_MAX_ATTEMPTS", var("CONSOLE_RETRY_MAX_ATTEMPTS"), 3)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "CONSOLE_RETRY_MAX_ATTEMPTS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        let initial_delay_ms: u64 = parse_or(
            "CONSOLE_RETRY_INITIAL_DELAY_MS",
            var("CONSOLE_RETRY_INITIAL_DELAY_MS"),
            250,
        )?;

        let log_format = match var("CONSOLE_LOG_FORMAT") {
            None => LogFormat::default(),
            Some(raw) => LogFormat::from_str_value(&raw).ok_or(ConfigError::Invalid {
                var: "CONSOLE_LOG_FORMAT",
                value: raw,
                reason: "expected 'pretty' or 'json'".into(),
            })?,
        };

        Ok(Self {
            api_url,
            credentials: StaticCredentials::new(admin_id, admin_secret),
            request_timeout_secs,
            retry: RetryPolicy {
                max_attempts,
                initial_delay: Duration::from_millis(initial_delay_ms),
                ..Default::default()
            },
            session_file: var("CONSOLE_SESSION_FILE").map(PathBuf::from),
            log_format,
        })
    }

    /// The session store selected by `CONSOLE_SESSION_FILE`.
    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        match &self.session_file {
            Some(path) => Arc::new(FileSessionStore::new(path)),
            None => Arc::new(MemorySessionStore::new()),
        }
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}
