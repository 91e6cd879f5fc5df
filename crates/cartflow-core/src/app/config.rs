//! Runtime configuration.
//!
//! Every value has a default; the environment (and a `.env` file, if any)
//! overrides it. The result is validated before anything is wired.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::impls::SimulationConfig;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Retry policy and pool size of the reservation worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Attempt budget per job, including the first one.
    pub max_attempts: u32,

    /// Visibility delay of a job re-enqueued after a failed attempt.
    pub retry_delay: Duration,

    /// Number of worker loops to run.
    pub concurrency: usize,

    /// Pause after a queue transport error before dequeuing again.
    pub error_pause: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
            concurrency: 1,
            error_pause: Duration::from_secs(1),
        }
    }
}

impl WorkerConfig {
    /// Same policy with `extra` more attempts per job.
    ///
    /// Swept jobs keep their attempt count, so a pass after
    /// `retry_failed_jobs` needs a larger budget to reach the provider again.
    pub fn with_extra_attempts(&self, extra: u32) -> Self {
        Self {
            max_attempts: self.max_attempts.saturating_add(extra),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Validation(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            _ => Err(ConfigError::Invalid {
                key: "CARTFLOW_ENV",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: Environment,

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,

    pub worker: WorkerConfig,

    pub provider: SimulationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: Environment::default(),
            log_filter: "info".to_string(),
            worker: WorkerConfig::default(),
            provider: SimulationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `CARTFLOW_*` environment variables (after reading `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let env = match get("CARTFLOW_ENV") {
            Some(raw) => raw.parse()?,
            None => defaults.env,
        };
        let log_filter = get("CARTFLOW_LOG").unwrap_or(defaults.log_filter);

        let worker = WorkerConfig {
            max_attempts: parse_or(&get, "CARTFLOW_MAX_ATTEMPTS", defaults.worker.max_attempts)?,
            retry_delay: millis_or(&get, "CARTFLOW_RETRY_DELAY_MS", defaults.worker.retry_delay)?,
            concurrency: parse_or(
                &get,
                "CARTFLOW_WORKER_CONCURRENCY",
                defaults.worker.concurrency,
            )?,
            error_pause: millis_or(&get, "CARTFLOW_ERROR_PAUSE_MS", defaults.worker.error_pause)?,
        };

        let provider = SimulationConfig {
            max_latency: millis_or(
                &get,
                "CARTFLOW_MOCK_LATENCY_MS",
                defaults.provider.max_latency,
            )?,
            failure_rate: parse_or(
                &get,
                "CARTFLOW_MOCK_FAILURE_RATE",
                defaults.provider.failure_rate,
            )?,
            seed: get("CARTFLOW_MOCK_SEED")
                .map(|raw| parse_value("CARTFLOW_MOCK_SEED", &raw))
                .transpose()?,
        };

        let config = Self {
            env,
            log_filter,
            worker,
            provider,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.worker.validate()?;
        let rate = self.provider.failure_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::Validation(format!(
                "failure_rate must be within 0.0..=1.0, got {rate}"
            )));
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn parse_or<T: FromStr>(
    get: impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn millis_or(
    get: impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match get(key) {
        Some(raw) => parse_value::<u64>(key, &raw).map(Duration::from_millis),
        None => Ok(default),
    }
}
