use crate::shared::application::outbox_drainer::{DrainerConfig, DrainerConfigError};
use crate::shared::core::primitives::Environment;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct EventLogConfig {
    pub url: String,
    pub table: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub database_url: String,
    pub database_max_connections: u32,
    pub event_log: EventLogConfig,
    pub drainer: DrainerConfig,
    pub drain_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = Environment::new(
            lookup("APP_ENVIRONMENT").unwrap_or_else(|| Environment::default().to_string()),
        );
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let defaults = DrainerConfig::default();
        let drainer = DrainerConfig {
            batch_size: parse_or(&lookup, "OUTBOX_BATCH_SIZE", defaults.batch_size)?,
            lease: secs_or(&lookup, "OUTBOX_LEASE_SECS", defaults.lease)?,
            sink_timeout: secs_or(&lookup, "OUTBOX_SINK_TIMEOUT_SECS", defaults.sink_timeout)?,
            max_batches_per_run: parse_or(
                &lookup,
                "OUTBOX_MAX_BATCHES_PER_RUN",
                defaults.max_batches_per_run,
            )?,
            run_budget: secs_or(&lookup, "OUTBOX_RUN_BUDGET_SECS", defaults.run_budget)?,
        };
        drainer.validate().map_err(|error| invalid_drainer_setting(&drainer, error))?;

        let drain_interval =
            secs_or(&lookup, "OUTBOX_DRAIN_INTERVAL_SECS", Duration::from_secs(5))?;
        if drain_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "OUTBOX_DRAIN_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            environment,
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            event_log: EventLogConfig {
                url: lookup("EVENT_LOG_URL").unwrap_or_else(|| "http://localhost:8123".to_string()),
                table: lookup("EVENT_LOG_TABLE").unwrap_or_else(|| "default.event_log".to_string()),
                user: lookup("EVENT_LOG_USER"),
                password: lookup("EVENT_LOG_PASSWORD"),
            },
            drainer,
            drain_interval,
        })
    }
}

fn invalid_drainer_setting(drainer: &DrainerConfig, error: DrainerConfigError) -> ConfigError {
    let (key, value) = match error {
        DrainerConfigError::ZeroBatchSize => ("OUTBOX_BATCH_SIZE", drainer.batch_size.to_string()),
        DrainerConfigError::ZeroMaxBatchesPerRun => (
            "OUTBOX_MAX_BATCHES_PER_RUN",
            drainer.max_batches_per_run.to_string(),
        ),
        DrainerConfigError::ZeroSinkTimeout => (
            "OUTBOX_SINK_TIMEOUT_SECS",
            drainer.sink_timeout.as_secs().to_string(),
        ),
        DrainerConfigError::ZeroRunBudget => (
            "OUTBOX_RUN_BUDGET_SECS",
            drainer.run_budget.as_secs().to_string(),
        ),
        DrainerConfigError::LeaseNotLongerThanSinkTimeout { lease, .. } => {
            ("OUTBOX_LEASE_SECS", lease.as_secs().to_string())
        }
    };
    ConfigError::Invalid { key, value }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn secs_or<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default.as_secs()).map(Duration::from_secs)
}
