use std::path::PathBuf;

use clap::Parser;
use notification_center::NotificationCenterConfig;

/// Watch a JSON notification feed and keep a local copy of it.
#[derive(Parser, Debug)]
#[command(name = "notify-watch", version, about)]
pub struct Args {
    /// Endpoint returning the notification list as JSON
    pub url: String,

    /// Polling interval in milliseconds
    #[arg(short, long)]
    pub interval_ms: Option<u64>,

    /// Retries per fetch
    #[arg(long)]
    pub retries: Option<u32>,

    /// Base retry delay in milliseconds
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Per-attempt timeout in milliseconds, 0 disables it
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Directory for the persisted notification list
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    /// Key the list is stored under
    #[arg(long)]
    pub storage_key: Option<String>,

    /// Log filter directive, e.g. "notification_center=debug"
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Also write daily-rotated log files to this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

impl Args {
    /// Layer explicitly passed flags over `config`.
    pub fn apply(&self, config: &mut NotificationCenterConfig) {
        if let Some(interval_ms) = self.interval_ms {
            config.polling.interval_ms = interval_ms;
        }
        if let Some(retries) = self.retries {
            config.fetch.retry_count = retries;
            config.polling.retry_count = retries;
        }
        if let Some(delay) = self.retry_delay_ms {
            config.fetch.retry_delay_ms = delay;
            config.polling.retry_delay_ms = delay;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.fetch.timeout_ms = (timeout_ms > 0).then_some(timeout_ms);
        }
        if let Some(dir) = &self.storage_dir {
            config.storage.storage_dir = Some(dir.clone());
        }
        if let Some(key) = &self.storage_key {
            config.storage.storage_key = key.clone();
        }
        if let Some(filter) = &self.log_filter {
            config.log_filter = filter.clone();
        }
    }
}
