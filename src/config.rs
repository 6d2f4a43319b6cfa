use crate::error::AppError;
use directories::ProjectDirs;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 4 * 60 * 60;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_STALE_TIME_SECS: u64 = 60;
pub const DEFAULT_QUERY_RETRIES: u32 = 3;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Runtime settings for the client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL every endpoint path is appended to.
    pub api_base_url: String,
    /// Time without user interaction after which the session is logged out.
    pub idle_timeout: Duration,
    /// Session lifetime used when the token carries no readable expiry.
    pub session_ttl: Duration,
    /// How long a cached query result is served without refetching.
    pub stale_time: Duration,
    /// Retry attempts for failed queries. Mutations never retry.
    pub query_retries: u32,
    pub request_timeout: Duration,
    /// Directory holding the persisted session.
    pub storage_dir: PathBuf,
}

impl Config {
    /// Settings with defaults for everything but the API location and storage directory.
    pub fn new(api_base_url: impl Into<String>, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            stale_time: Duration::from_secs(DEFAULT_STALE_TIME_SECS),
            query_retries: DEFAULT_QUERY_RETRIES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            storage_dir: storage_dir.into(),
        }
    }

    /// Reads the configuration from `TASKFORGE_*` environment variables.
    ///
    /// Callers are expected to have loaded `.env` beforehand.
    pub fn from_env() -> Result<Self, AppError> {
        let storage_dir = match env::var("TASKFORGE_STORAGE_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => default_storage_dir()?,
        };

        Ok(Self {
            api_base_url: env::var("TASKFORGE_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            idle_timeout: Duration::from_secs(env_or(
                "TASKFORGE_IDLE_TIMEOUT_SECS",
                DEFAULT_IDLE_TIMEOUT_SECS,
            )?),
            session_ttl: Duration::from_secs(env_or(
                "TASKFORGE_SESSION_TTL_SECS",
                DEFAULT_SESSION_TTL_SECS,
            )?),
            stale_time: Duration::from_secs(env_or(
                "TASKFORGE_STALE_TIME_SECS",
                DEFAULT_STALE_TIME_SECS,
            )?),
            query_retries: env_or("TASKFORGE_QUERY_RETRIES", DEFAULT_QUERY_RETRIES)?,
            request_timeout: Duration::from_secs(env_or(
                "TASKFORGE_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            storage_dir,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a number, got '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}

fn default_storage_dir() -> Result<PathBuf, AppError> {
    ProjectDirs::from("com", "taskforge", "taskforge")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| AppError::Config("Could not determine a data directory".into()))
}
