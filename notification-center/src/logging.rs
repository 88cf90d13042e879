//! Tracing subscriber setup with a reloadable filter.
//!
//! Console output always uses local-time timestamps. When a log directory is
//! given, a daily-rotated file receives the same events without ANSI colors.

use std::path::Path;

use chrono::Local;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
};

use crate::{Error, Result};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "notification_center=info,notify_watch=info";

/// File name prefix for rotated log files.
const LOG_FILE_PREFIX: &str = "notify-watch.log";

/// Timer that renders timestamps in the local timezone.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

pub type FilterHandle = Handle<EnvFilter, tracing_subscriber::Registry>;

/// Runtime control over the installed subscriber.
///
/// Keep it alive for the lifetime of the program: it owns the file writer's
/// flush guard.
pub struct LoggingHandle {
    handle: FilterHandle,
    _guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    fn new(handle: FilterHandle, guard: Option<WorkerGuard>) -> Self {
        Self {
            handle,
            _guard: guard,
        }
    }

    /// Current filter directive.
    pub fn get_filter(&self) -> String {
        self.handle
            .with_current(|filter| filter.to_string())
            .unwrap_or_default()
    }

    /// Replace the filter, e.g. `"notification_center=debug"`.
    pub fn set_filter(&self, directive: &str) -> Result<()> {
        let new_filter = parse_filter(directive)?;
        self.handle
            .reload(new_filter)
            .map_err(|e| Error::Other(format!("Failed to reload filter: {}", e)))?;

        info!(directive = %directive, "Log filter updated");
        Ok(())
    }
}

fn parse_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| Error::config(format!("Invalid filter directive '{}': {}", directive, e)))
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `directive` when set; an empty `directive` means
/// [`DEFAULT_LOG_FILTER`].
pub fn init_logging(directive: &str, log_dir: Option<&Path>) -> Result<LoggingHandle> {
    let initial_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if directive.trim().is_empty() => EnvFilter::new(DEFAULT_LOG_FILTER),
        Err(_) => parse_filter(directive)?,
    };
    let (filter_layer, filter_handle) = reload::Layer::new(initial_filter);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTimer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_ansi(true).with_timer(LocalTimer))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to set global default subscriber: {}", e)))?;

    Ok(LoggingHandle::new(filter_handle, guard))
}

/// Log targets worth tuning individually.
pub fn available_modules() -> Vec<(&'static str, &'static str)> {
    vec![
        ("notification_center", "Notification store and hooks"),
        ("notification_center::hooks::polling", "Polling scheduler"),
        ("notification_center::hooks::storage", "Persistence hook"),
        ("notification_center::retry", "Fetch retries"),
        ("notify_watch", "Command line watcher"),
        ("reqwest", "HTTP requests"),
    ]
}
