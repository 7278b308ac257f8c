use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::{DEFAULT_BASE_URL, status};
use crate::engine::load::LoadOptions;
use crate::engine::retry::RetryPolicy;
use crate::error::{CadError, Result};

pub const ENV_BASE_URL: &str = "CAD_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "CAD_TIMEOUT_MS";
pub const ENV_RETRY_ATTEMPTS: &str = "CAD_RETRY_ATTEMPTS";
pub const ENV_RETRY_DELAY_MS: &str = "CAD_RETRY_DELAY_MS";
pub const ENV_LOAD_WORKERS: &str = "CAD_LOAD_WORKERS";
pub const ENV_LOAD_TIMEOUT_MS: &str = "CAD_LOAD_TIMEOUT_MS";
pub const ENV_LOG_DIR: &str = "CAD_LOG_DIR";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub load: LoadConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_expected_success")]
    pub expected_success: u16,
    #[serde(default = "default_expected_failure")]
    pub expected_failure: u16,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2_000
}

fn default_workers() -> usize {
    20
}

fn default_expected_success() -> u16 {
    status::OK
}

fn default_expected_failure() -> u16 {
    status::SERVICE_UNAVAILABLE
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            expected_success: default_expected_success(),
            expected_failure: default_expected_failure(),
            timeout_ms: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            filter: default_filter(),
        }
    }
}

impl SuiteConfig {
    pub fn from_json(input: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|err| CadError::Config(format!("Invalid suite config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with `CAD_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_BASE_URL) {
            config.http.base_url = value;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            config.http.timeout_ms = parse_var(ENV_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_RETRY_ATTEMPTS) {
            config.retry.max_attempts = parse_var(ENV_RETRY_ATTEMPTS, &value)?;
        }
        if let Some(value) = lookup(ENV_RETRY_DELAY_MS) {
            config.retry.delay_ms = parse_var(ENV_RETRY_DELAY_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_LOAD_WORKERS) {
            config.load.workers = parse_var(ENV_LOAD_WORKERS, &value)?;
        }
        if let Some(value) = lookup(ENV_LOAD_TIMEOUT_MS) {
            config.load.timeout_ms = Some(parse_var(ENV_LOAD_TIMEOUT_MS, &value)?);
        }
        if let Some(value) = lookup(ENV_LOG_DIR).filter(|value| !value.trim().is_empty()) {
            config.log.log_dir = Some(PathBuf::from(value));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.http.base_url.trim().is_empty() {
            return Err(CadError::Config("Base URL cannot be empty".to_string()));
        }
        self.retry_policy().validate()?;
        self.load_options().validate()?;
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.delay_ms),
        )
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            workers: self.load.workers,
            expected_success: self.load.expected_success,
            expected_failure: self.load.expected_failure,
            timeout: self.load.timeout_ms.map(Duration::from_millis),
        }
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| CadError::Config(format!("{key}=`{value}`: {err}")))
}
