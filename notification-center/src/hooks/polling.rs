//! Periodic refresh of the notification list.
//!
//! Each tick spawns its own refresh task, so stopping the schedule never
//! cancels a fetch that is already in flight; its result still lands in the
//! store.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::provider::NotificationContext;
use crate::retry::FetchOptions;
use crate::{Error, Result};

/// Callback receiving refresh failures once retries are exhausted.
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

/// Configuration for the poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingOptions {
    /// Whether [`NotificationPoller::spawn`] starts the schedule.
    pub enabled: bool,
    /// Interval between refreshes in milliseconds.
    #[serde(alias = "interval")]
    pub interval_ms: u64,
    /// Retries of a failed refresh.
    #[serde(alias = "retryCount")]
    pub retry_count: u32,
    /// Base backoff delay in milliseconds.
    #[serde(alias = "retryDelay")]
    pub retry_delay_ms: u64,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 60_000,
            retry_count: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl PollingOptions {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Retry settings for one refresh, keeping the provider's per-attempt
    /// `timeout_ms`.
    pub fn retry_options(&self, timeout_ms: Option<u64>) -> FetchOptions {
        FetchOptions {
            retry_count: self.retry_count,
            retry_delay_ms: self.retry_delay_ms,
            timeout_ms,
        }
    }
}

struct Schedule {
    token: CancellationToken,
}

/// Fixed-interval refresher bound to a provider.
///
/// At most one schedule is armed at a time. Dropping the poller or
/// unmounting the provider stops it.
pub struct NotificationPoller {
    context: NotificationContext,
    options: PollingOptions,
    on_error: Option<ErrorCallback>,
    schedule: Mutex<Option<Schedule>>,
}

impl NotificationPoller {
    /// Create a poller without starting it.
    pub fn new(context: NotificationContext, options: PollingOptions) -> Self {
        Self {
            context,
            options,
            on_error: None,
            schedule: Mutex::new(None),
        }
    }

    pub fn with_on_error(mut self, on_error: impl Fn(&Error) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(on_error));
        self
    }

    /// Create a poller and start it when `options.enabled` is set.
    pub fn spawn(context: NotificationContext, options: PollingOptions) -> Result<Self> {
        let poller = Self::new(context, options);
        if poller.options.enabled {
            poller.start_polling()?;
        }
        Ok(poller)
    }

    pub fn options(&self) -> &PollingOptions {
        &self.options
    }

    /// Cancel any existing schedule, refresh now, then every interval.
    pub fn start_polling(&self) -> Result<()> {
        self.arm(true)
    }

    /// Like [`start_polling`](Self::start_polling), but the first refresh
    /// waits one interval. For callers that just loaded the list, e.g. after
    /// [`NotificationProvider::ready`](crate::provider::NotificationProvider::ready).
    pub fn start_polling_deferred(&self) -> Result<()> {
        self.arm(false)
    }

    fn arm(&self, immediate: bool) -> Result<()> {
        if self.options.interval_ms == 0 {
            return Err(Error::config("polling interval must be greater than zero"));
        }
        let store = self.context.store()?;

        let mut schedule = self.schedule.lock();
        if let Some(previous) = schedule.take() {
            previous.token.cancel();
        }

        let token = store.shutdown_token().child_token();
        if immediate {
            self.spawn_refresh();
        }

        let interval = self.options.interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let poller = self.refresher();
        let loop_token = token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = loop_token.cancelled() => {
                        debug!("Notification polling schedule cancelled");
                        break;
                    }
                    _ = ticker.tick() => poller.spawn(),
                }
            }
        });

        *schedule = Some(Schedule { token });
        info!(
            interval_ms = self.options.interval_ms,
            immediate,
            "Notification polling started"
        );
        Ok(())
    }

    /// Cancel the schedule. In-flight refreshes run to completion.
    pub fn stop_polling(&self) {
        if let Some(schedule) = self.schedule.lock().take() {
            schedule.token.cancel();
            info!("Notification polling stopped");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.schedule
            .lock()
            .as_ref()
            .is_some_and(|s| !s.token.is_cancelled())
    }

    /// Refresh once, right now, and return the outcome.
    pub async fn refresh(&self) -> Result<()> {
        self.context.store()?.refresh_notifications().await
    }

    fn spawn_refresh(&self) {
        self.refresher().spawn();
    }

    fn refresher(&self) -> Refresher {
        Refresher {
            context: self.context.clone(),
            options: self.options.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) {
        if let Some(schedule) = self.schedule.get_mut().take() {
            schedule.token.cancel();
        }
    }
}

/// Everything one detached refresh needs.
#[derive(Clone)]
struct Refresher {
    context: NotificationContext,
    options: PollingOptions,
    on_error: Option<ErrorCallback>,
}

impl Refresher {
    fn spawn(&self) {
        let refresher = self.clone();
        tokio::spawn(async move {
            if let Err(e) = refresher.run().await {
                match &refresher.on_error {
                    Some(on_error) => on_error(&e),
                    None => error!(error = %e, "Error polling notifications"),
                }
            }
        });
    }

    async fn run(&self) -> Result<()> {
        let store = self.context.store()?;
        let retry = self.options.retry_options(store.fetch_options().timeout_ms);
        store.refresh_with(&retry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Notification;
    use crate::provider::{NotificationProvider, ProviderConfig, fetch_fn};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_provider(calls: Arc<AtomicU32>) -> NotificationProvider {
        let config = ProviderConfig::new().with_fetcher(fetch_fn(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(Vec::new()) }
        }));
        NotificationProvider::mount(config)
    }

    fn options(interval_ms: u64) -> PollingOptions {
        PollingOptions {
            interval_ms,
            retry_count: 0,
            retry_delay_ms: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_polling_options_default() {
        let options = PollingOptions::default();
        assert!(options.enabled);
        assert_eq!(options.interval_ms, 60_000);
        let retry = options.retry_options(Some(10_000));
        assert_eq!(retry.retry_count, 3);
        assert_eq!(retry.retry_delay_ms, 1000);
        assert_eq!(retry.timeout_ms, Some(10_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_immediately_then_every_interval() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut provider = counting_provider(calls.clone());
        provider.ready().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let poller = NotificationPoller::spawn(provider.context(), options(100)).unwrap();
        assert!(poller.is_polling());

        tokio::time::sleep(Duration::from_millis(350)).await;
        // mount + immediate + ticks at 100, 200, 300
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_start_skips_immediate_refresh() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut provider = counting_provider(calls.clone());
        provider.ready().await;

        let poller = NotificationPoller::new(provider.context(), options(100));
        poller.start_polling_deferred().unwrap();
        assert!(poller.is_polling());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_polling_cancels_schedule() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut provider = counting_provider(calls.clone());
        provider.ready().await;

        let poller = NotificationPoller::spawn(provider.context(), options(100)).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        poller.stop_polling();
        assert!(!poller.is_polling());

        let after_stop = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_does_not_leak_schedules() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut provider = counting_provider(calls.clone());
        provider.ready().await;

        let poller = NotificationPoller::new(provider.context(), options(100));
        poller.start_polling().unwrap();
        poller.start_polling().unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        // mount + two immediate refreshes + ticks at 100 and 200 of one schedule
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_error_after_retries_exhausted() {
        let attempts = Arc::new(AtomicU32::new(0));
        let fetch_attempts = attempts.clone();
        let config = ProviderConfig::new()
            .with_fetcher(fetch_fn(move || {
                fetch_attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::fetch("offline")) }
            }))
            .with_fetch_options(FetchOptions {
                retry_count: 0,
                ..Default::default()
            });
        let mut provider = NotificationProvider::mount(config);
        provider.ready().await;

        let reported = Arc::new(AtomicU32::new(0));
        let reported_in_cb = reported.clone();
        let poller = NotificationPoller::new(
            provider.context(),
            PollingOptions {
                interval_ms: 10_000,
                retry_count: 1,
                retry_delay_ms: 10,
                ..Default::default()
            },
        )
        .with_on_error(move |e| {
            assert!(matches!(e, Error::Fetch(_)));
            reported_in_cb.fetch_add(1, Ordering::SeqCst);
        });
        poller.start_polling().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(reported.load(Ordering::SeqCst), 1);
        // mount + first try + one retry from the poller's settings
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(
            provider.store().error().as_deref(),
            Some("Fetch error: offline")
        );
        assert!(poller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_tick_runs_one_retry_loop() {
        let attempts = Arc::new(AtomicU32::new(0));
        let fetch_attempts = attempts.clone();
        let config = ProviderConfig::new().with_fetcher(fetch_fn(move || {
            fetch_attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::fetch("offline")) }
        }));
        let mut provider = NotificationProvider::mount(config);
        provider.ready().await;
        assert_eq!(attempts.load(Ordering::SeqCst), 4);

        let loading_flips = Arc::new(AtomicU32::new(0));
        let mut rx = provider.store().subscribe();
        let flips = loading_flips.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                if rx.borrow_and_update().is_loading {
                    flips.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        let reported = Arc::new(AtomicU32::new(0));
        let reported_in_cb = reported.clone();
        let poller = NotificationPoller::new(provider.context(), PollingOptions::default())
            .with_on_error(move |_| {
                reported_in_cb.fetch_add(1, Ordering::SeqCst);
            });
        poller.start_polling().unwrap();

        // backoff 1s + 2s + 4s, well inside the 60s interval
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 4 + 4);
        assert_eq!(loading_flips.load(Ordering::SeqCst), 1);
        assert_eq!(reported.load(Ordering::SeqCst), 1);
        assert!(!provider.store().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_refresh_lands_after_stop() {
        let calls = Arc::new(AtomicU32::new(0));
        let fetch_calls = calls.clone();
        let config = ProviderConfig::new().with_fetcher(fetch_fn(move || {
            let n = fetch_calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    return Ok(Vec::new());
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(vec![Notification::new("late", "arrived after stop").with_id("late")])
            }
        }));
        let mut provider = NotificationProvider::mount(config);
        provider.ready().await;

        let poller = NotificationPoller::spawn(provider.context(), options(1_000)).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        poller.stop_polling();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(provider.store().notifications()[0].id, "late");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_stops_polling() {
        let calls = Arc::new(AtomicU32::new(0));
        let provider = counting_provider(calls.clone());
        let context = provider.context();

        let poller = NotificationPoller::spawn(context.clone(), options(100)).unwrap();
        assert!(poller.is_polling());

        provider.unmount();
        assert!(!poller.is_polling());
        assert!(matches!(poller.refresh().await, Err(Error::Configuration(_))));
        assert!(matches!(
            poller.start_polling(),
            Err(Error::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_poller_is_idle() {
        let provider = NotificationProvider::mount(ProviderConfig::new());
        let poller = NotificationPoller::spawn(
            provider.context(),
            PollingOptions {
                enabled: false,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!poller.is_polling());
        assert!(poller.refresh().await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let provider = NotificationProvider::mount(ProviderConfig::new());
        let poller = NotificationPoller::new(provider.context(), options(0));
        assert!(matches!(
            poller.start_polling(),
            Err(Error::Configuration(_))
        ));
    }
}
