use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Semaphore;
use ::config::{Config as ConfigLoader, Environment};
use crate::error::{AppError, Result};

pub const DEFAULT_API_URL: &str = "https://ismp.crpt.ru/api/v3/lk/documents/create";
pub const DEFAULT_REQUEST_LIMIT: usize = 50;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

const ENV_PREFIX: &str = "CRPT";

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn to_duration(self, amount: u64) -> Duration {
        match self {
            TimeUnit::Milliseconds => Duration::from_millis(amount),
            TimeUnit::Seconds => Duration::from_secs(amount),
            TimeUnit::Minutes => Duration::from_secs(amount.saturating_mul(60)),
            TimeUnit::Hours => Duration::from_secs(amount.saturating_mul(3_600)),
            TimeUnit::Days => Duration::from_secs(amount.saturating_mul(86_400)),
        }
    }
}

/// What `invoke` does with preparation and transport failures.
///
/// `Silent` logs and swallows them, so callers cannot tell a dropped
/// submission from a successful one. `Surface` hands them back.
/// Cancellation is returned under both.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    #[default]
    Silent,
    Surface,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Immutable window settings for a limiter: `capacity` permits per `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterConfig {
    capacity: usize,
    interval: Duration,
}

impl LimiterConfig {
    pub fn new(capacity: usize, interval: Duration) -> Result<Self> {
        if capacity == 0 {
            return Err(AppError::InvalidConfig(
                "request limit must be at least 1".into(),
            ));
        }
        if capacity > Semaphore::MAX_PERMITS {
            return Err(AppError::InvalidConfig(format!(
                "request limit {} exceeds the maximum of {}",
                capacity,
                Semaphore::MAX_PERMITS
            )));
        }
        if interval.is_zero() {
            return Err(AppError::InvalidConfig(
                "replenish interval must be longer than zero".into(),
            ));
        }
        Ok(Self { capacity, interval })
    }

    /// `limit` requests per `amount` of `unit`, e.g. 50 per 1 minute.
    pub fn per(unit: TimeUnit, amount: u64, limit: usize) -> Result<Self> {
        Self::new(limit, unit.to_duration(amount))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_REQUEST_LIMIT,
            interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // General
    pub log_level: String,
    pub log_format: LogFormat,

    // Endpoint
    pub api_url: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,

    // Rate limiting
    pub request_limit: usize,
    pub time_unit: TimeUnit,
    pub duration: u64,
    pub error_policy: ErrorPolicy,
}

impl Config {
    /// Loads `.env` (if present), then `CRPT_*` variables over the defaults.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Self::from_environment(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn from_environment(env: Environment) -> Result<Self> {
        let settings = ConfigLoader::builder()
            .set_default("log_level", "info")?
            .set_default("log_format", "text")?
            .set_default("api_url", DEFAULT_API_URL)?
            .set_default("connect_timeout_ms", DEFAULT_CONNECT_TIMEOUT_MS as i64)?
            .set_default("request_timeout_ms", DEFAULT_REQUEST_TIMEOUT_MS as i64)?
            .set_default("request_limit", DEFAULT_REQUEST_LIMIT as i64)?
            .set_default("time_unit", "minutes")?
            .set_default("duration", 1)?
            .set_default("error_policy", "silent")?
            .add_source(env)
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn limiter(&self) -> Result<LimiterConfig> {
        LimiterConfig::per(self.time_unit, self.duration, self.request_limit)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            api_url: DEFAULT_API_URL.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            request_limit: DEFAULT_REQUEST_LIMIT,
            time_unit: TimeUnit::Minutes,
            duration: 1,
            error_policy: ErrorPolicy::Silent,
        }
    }
}
