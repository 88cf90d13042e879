//! Runtime configuration assembled from defaults, JSON and the environment.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hooks::PollingOptions;
use crate::logging::DEFAULT_LOG_FILTER;
use crate::retry::FetchOptions;
use crate::storage::StorageOptions;
use crate::{Error, Result};

pub const ENV_RETRY_COUNT: &str = "NOTIFY_RETRY_COUNT";
pub const ENV_RETRY_DELAY_MS: &str = "NOTIFY_RETRY_DELAY_MS";
/// `0` disables the per-attempt timeout.
pub const ENV_TIMEOUT_MS: &str = "NOTIFY_TIMEOUT_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "NOTIFY_POLL_INTERVAL_MS";
pub const ENV_POLLING_ENABLED: &str = "NOTIFY_POLLING_ENABLED";
pub const ENV_STORAGE_KEY: &str = "NOTIFY_STORAGE_KEY";
pub const ENV_STORAGE_DIR: &str = "NOTIFY_STORAGE_DIR";
pub const ENV_SESSION_STORAGE: &str = "NOTIFY_SESSION_STORAGE";
pub const ENV_LOG_FILTER: &str = "NOTIFY_LOG_FILTER";

/// Everything needed to run a provider with its hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationCenterConfig {
    pub fetch: FetchOptions,
    pub polling: PollingOptions,
    pub storage: StorageOptions,
    pub log_filter: String,
}

impl Default for NotificationCenterConfig {
    fn default() -> Self {
        Self {
            fetch: FetchOptions::default(),
            polling: PollingOptions::default(),
            storage: StorageOptions::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl NotificationCenterConfig {
    /// Defaults overridden by `NOTIFY_*` variables, after loading `.env`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Invalid configuration document: {}", e)))
    }

    /// Apply overrides looked up by variable name.
    ///
    /// Blank values are ignored. A value that does not parse fails the whole
    /// call and leaves `self` partially updated.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get(ENV_RETRY_COUNT) {
            let count = parse(ENV_RETRY_COUNT, &v)?;
            self.fetch.retry_count = count;
            self.polling.retry_count = count;
        }
        if let Some(v) = get(ENV_RETRY_DELAY_MS) {
            let delay = parse(ENV_RETRY_DELAY_MS, &v)?;
            self.fetch.retry_delay_ms = delay;
            self.polling.retry_delay_ms = delay;
        }
        if let Some(v) = get(ENV_TIMEOUT_MS) {
            let timeout: u64 = parse(ENV_TIMEOUT_MS, &v)?;
            self.fetch.timeout_ms = (timeout > 0).then_some(timeout);
        }
        if let Some(v) = get(ENV_POLL_INTERVAL_MS) {
            self.polling.interval_ms = parse(ENV_POLL_INTERVAL_MS, &v)?;
        }
        if let Some(v) = get(ENV_POLLING_ENABLED) {
            self.polling.enabled = parse_bool(ENV_POLLING_ENABLED, &v)?;
        }
        if let Some(v) = get(ENV_STORAGE_KEY) {
            self.storage.storage_key = v;
        }
        if let Some(v) = get(ENV_STORAGE_DIR) {
            self.storage.storage_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_SESSION_STORAGE) {
            self.storage.use_session_storage = parse_bool(ENV_SESSION_STORAGE, &v)?;
        }
        if let Some(v) = get(ENV_LOG_FILTER) {
            self.log_filter = v;
        }

        debug!(config = ?self, "Applied configuration overrides");
        Ok(())
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| Error::config(format!("Invalid {}='{}': {}", key, value, e)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::config(format!(
            "Invalid {}='{}': expected a boolean",
            key, value
        ))),
    }
}
