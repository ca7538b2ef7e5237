// Run configuration from the environment (and an optional .env file).
// Command-line flags override what is found here.

use crate::error::ConfigError;
use crate::parser::timestamp::{Reconciler, DEFAULT_EPOCH_OFFSET_SECS};
use crate::store::StoreConfig;
use chrono::FixedOffset;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DATABASE: &str = "POPULATE_DATABASE";
pub const ENV_BUSY_TIMEOUT_MS: &str = "POPULATE_BUSY_TIMEOUT_MS";
pub const ENV_EPOCH_UTC_OFFSET: &str = "POPULATE_EPOCH_UTC_OFFSET";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database: Option<PathBuf>,
    pub busy_timeout: Duration,
    /// Seconds east of UTC used to render epoch timestamps.
    pub epoch_offset_secs: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            epoch_offset_secs: DEFAULT_EPOCH_OFFSET_SECS,
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset or blank keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(db) = get(ENV_DATABASE) {
            config.database = Some(PathBuf::from(db));
        }
        if let Some(ms) = get(ENV_BUSY_TIMEOUT_MS) {
            let ms: u64 = ms.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_BUSY_TIMEOUT_MS,
                value: ms.clone(),
            })?;
            config.busy_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = get(ENV_EPOCH_UTC_OFFSET) {
            config.epoch_offset_secs = secs
                .trim()
                .parse()
                .ok()
                .filter(|s: &i32| FixedOffset::east_opt(*s).is_some())
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: ENV_EPOCH_UTC_OFFSET,
                    value: secs.clone(),
                })?;
        }
        Ok(config)
    }

    /// Connection settings; fails when no database was configured.
    pub fn store(&self) -> Result<StoreConfig, ConfigError> {
        let database = self.database.clone().ok_or(ConfigError::MissingDatabase)?;
        Ok(StoreConfig {
            database,
            busy_timeout: self.busy_timeout,
        })
    }

    pub fn reconciler(&self) -> Reconciler {
        // Offsets are validated when read; fall back to the default otherwise.
        FixedOffset::east_opt(self.epoch_offset_secs)
            .map(Reconciler::new)
            .unwrap_or_default()
    }
}
